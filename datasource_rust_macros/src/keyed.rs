use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields};

pub fn derive_keyed(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let field = match extract_key_field(&input) {
        Ok(field) => field,
        Err(err) => return err.to_compile_error().into(),
    };
    let field_name = &field.ident;
    let field_ty = &field.ty;

    let expanded = quote! {
        impl #impl_generics datasource_rust::Keyed for #name #ty_generics #where_clause {
            type Key = #field_ty;

            fn key(&self) -> Self::Key {
                ::core::clone::Clone::clone(&self.#field_name)
            }
        }
    };

    TokenStream::from(expanded)
}

fn extract_key_field(input: &DeriveInput) -> syn::Result<&Field> {
    let fields = match &input.data {
        Data::Struct(data_struct) => match &data_struct.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "Keyed derive: only structs with named fields are supported",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Keyed derive: only structs are supported",
            ))
        }
    };

    let marked: Vec<&Field> = fields
        .iter()
        .filter(|field| field.attrs.iter().any(|attr| attr.path().is_ident("key")))
        .collect();

    match marked.as_slice() {
        [field] => return Ok(field),
        [_, second, ..] => {
            return Err(syn::Error::new_spanned(
                second,
                "Keyed derive: only one field may be marked #[key]",
            ))
        }
        [] => {}
    }

    // Default: look for a field named "id"
    fields
        .iter()
        .find(|field| field.ident.as_ref().is_some_and(|ident| ident == "id"))
        .ok_or_else(|| {
            syn::Error::new_spanned(
                &input.ident,
                "Keyed derive: no field marked with #[key] and no field named `id`",
            )
        })
}
