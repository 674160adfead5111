mod keyed;

use proc_macro::TokenStream;

// ============================================================================
// #[derive(Keyed)]
// ============================================================================

/// Derive macro that implements `datasource_rust::Keyed` for a struct whose
/// identifier is stored inside the record.
///
/// The key field is the one marked `#[key]`, or a field named `id` when no
/// field is marked.
///
/// # Usage
///
/// ```ignore
/// #[derive(Clone, Keyed)]
/// struct User {
///     #[key]
///     email: String,
///     name: String,
/// }
///
/// // expands to
/// impl datasource_rust::Keyed for User {
///     type Key = String;
///     fn key(&self) -> String { self.email.clone() }
/// }
/// ```
#[proc_macro_derive(Keyed, attributes(key))]
pub fn derive_keyed(input: TokenStream) -> TokenStream {
    keyed::derive_keyed(input)
}
