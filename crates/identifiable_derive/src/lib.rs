//! `#[derive(Identifiable)]` for the `quill_stable_type_id` crate.
//!
//! The generated identifier hashes the package name, the module path and the
//! type name. The package version is deliberately left out: the identifier is
//! written on the wire, and peers running different releases of the same
//! crate must still agree on it.
//!
//! Generic types fold in the identifier of every type parameter, so
//! `Wrapper<A>` and `Wrapper<B>` are distinct. Lifetime and const parameters
//! are rejected.
//!
//! ```ignore
//! use quill_stable_type_id::Identifiable;
//!
//! #[derive(Identifiable)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! // point to a re-export when the crate is not a direct dependency
//! #[derive(Identifiable)]
//! #[stable_type_id(my_facade::stable_type_id)]
//! struct Line(Point, Point);
//! ```

use proc_macro::TokenStream;

/// Derives `Identifiable`, giving the type a compile-time `StableTypeID`.
///
/// The optional `#[stable_type_id(path)]` attribute names the crate that
/// defines `Identifiable` and `StableTypeID`; it defaults to
/// `::quill_stable_type_id`.
#[proc_macro_derive(Identifiable, attributes(stable_type_id))]
pub fn derive_identifiable(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);

    let crate_path: syn::Path = match input
        .attrs
        .iter()
        .find(|attr| attr.path().is_ident("stable_type_id"))
    {
        Some(attr) => match attr.parse_args::<syn::Path>() {
            Ok(path) => path,
            Err(_) => {
                return syn::Error::new_spanned(
                    attr,
                    "expected `#[stable_type_id(path::to::crate)]`",
                )
                .to_compile_error()
                .into();
            }
        },
        None => syn::parse_quote!(::quill_stable_type_id),
    };

    implement(&input.ident, input.generics, &crate_path).into()
}

fn implement(
    name: &syn::Ident,
    mut generics: syn::Generics,
    crate_path: &syn::Path,
) -> proc_macro2::TokenStream {
    if let Some(lifetime) = generics.lifetimes().next() {
        return syn::Error::new_spanned(
            lifetime,
            "lifetime parameters are not allowed on identifiable types",
        )
        .to_compile_error();
    }
    if let Some(constant) = generics.const_params().next() {
        return syn::Error::new_spanned(
            constant,
            "const parameters are not allowed on identifiable types",
        )
        .to_compile_error();
    }

    let identifiable: syn::Path = syn::parse_quote!(#crate_path::Identifiable);
    let stable_type_id: syn::Path =
        syn::parse_quote!(#crate_path::StableTypeID);

    for param in generics.type_params_mut() {
        param.bounds.push(syn::parse_quote!(#identifiable));
    }
    let type_params = generics.type_params().map(|param| &param.ident);

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    quote::quote! {
        #[allow(clippy::trait_duplication_in_bounds)]
        impl #impl_generics #identifiable for #name #ty_generics
            #where_clause
        {
            const STABLE_TYPE_ID: #stable_type_id = {
                let mut id = #stable_type_id::from_unique_type_name(concat!(
                    env!("CARGO_PKG_NAME"),
                    "::",
                    module_path!(),
                    "::",
                    stringify!(#name),
                ));

                #(
                    id = <#type_params as #identifiable>::STABLE_TYPE_ID
                        .combine(id);
                )*

                id
            };
        }
    }
}
