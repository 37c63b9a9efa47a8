//! `#[derive(H5Type)]` for records.
//!
//! The derive emits an `unsafe impl h5x::dtype::H5Type` that describes the record as a compound
//! type with one field per struct field, in declaration order, at sequential offsets. The real
//! offsets are taken from `offset_of!` and checked at resolution time, so a record whose layout
//! has padding fails with a layout mismatch instead of silently transferring garbage.
//!
//! It also makes the record usable as a dataset element through `h5x::H5Element`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, parse_macro_input};

/// Derive `H5Type` and `H5Element` for a `#[repr(C)]` or `#[repr(C, packed)]` struct with named
/// fields. Every field type must itself implement `H5Type`, and the struct must be `Copy`.
#[proc_macro_derive(H5Type)]
pub fn derive_h5type(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match impl_h5type(&input) {
        Ok(ts) => ts.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn impl_h5type(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "H5Type cannot be derived for generic types",
        ));
    }
    if !has_repr_c(&input.attrs)? {
        return Err(syn::Error::new_spanned(
            name,
            "H5Type can only be derived for #[repr(C)] structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "H5Type can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "H5Type can only be derived for structs",
            ));
        }
    };

    let name_str = name.to_string();
    let field_stmts = fields
        .iter()
        .filter_map(|field| field.ident.as_ref().map(|ident| (ident, &field.ty)))
        .map(|(ident, ty)| {
            let field_name = ident.to_string();
            quote! {
                let builder = builder.field(
                    #field_name,
                    ::core::mem::offset_of!(Self, #ident),
                    <#ty as ::h5x::dtype::H5Type>::type_descriptor()?,
                )?;
            }
        });

    Ok(quote! {
        unsafe impl ::h5x::dtype::H5Type for #name {
            fn type_descriptor() -> ::h5x::error::H5xResult<::h5x::dtype::TypeDescriptor> {
                let builder = ::h5x::dtype::CompoundType::builder(
                    #name_str,
                    ::core::mem::size_of::<Self>(),
                );
                #(#field_stmts)*
                builder.finish()
            }
        }

        ::h5x::impl_value_element!(#name);
    })
}

fn has_repr_c(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut repr_c = false;
    for attr in attrs.iter().filter(|a| a.path().is_ident("repr")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("C") {
                repr_c = true;
            } else if meta.input.peek(syn::token::Paren) {
                // packed(N) and align(N)
                let _content;
                syn::parenthesized!(_content in meta.input);
            }
            Ok(())
        })?;
    }
    Ok(repr_c)
}
