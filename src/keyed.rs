/// Records that carry their own identifier.
///
/// Implement by hand, or derive with `#[derive(Keyed)]` and mark the key
/// field with `#[key]` (a field named `id` is used when nothing is marked).
pub trait Keyed {
    type Key;

    fn key(&self) -> Self::Key;
}
