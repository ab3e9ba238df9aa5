//! `#[derive(ExportRecord)]` for `recordsheet_xlsx`.
//!
//! Field attributes:
//! - `#[export(display_name = "...")]` : column label used verbatim
//! - `#[export(skip)]`                 : field is not exported

use proc_macro::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, LitStr, parse_macro_input};

#[proc_macro_derive(ExportRecord, attributes(export))]
pub fn derive_export_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_export_record(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

struct SpecFieldExport {
    ident: syn::Ident,
    ty: syn::Type,
    display_name: Option<String>,
}

fn expand_export_record(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "ExportRecord cannot be derived for generic types",
        ));
    }

    let fields_named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "ExportRecord requires a struct with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "ExportRecord can only be derived for structs",
            ));
        }
    };

    let mut l_fields = Vec::new();
    for field in fields_named {
        let mut if_skip = false;
        let mut display_name = None;
        for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("export")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    if_skip = true;
                    Ok(())
                } else if meta.path.is_ident("display_name") {
                    let lit: LitStr = meta.value()?.parse()?;
                    display_name = Some(lit.value());
                    Ok(())
                } else {
                    Err(meta.error("expected `skip` or `display_name = \"...\"`"))
                }
            })?;
        }
        if if_skip {
            continue;
        }
        if let Some(ident) = &field.ident {
            l_fields.push(SpecFieldExport {
                ident: ident.clone(),
                ty: field.ty.clone(),
                display_name,
            });
        }
    }

    let name = &input.ident;
    let schema_tokens = l_fields.iter().map(|field| {
        let key = field.ident.unraw().to_string();
        let ty = &field.ty;
        let display_name = match &field.display_name {
            Some(val) => quote! { ::core::option::Option::Some(#val) },
            None => quote! { ::core::option::Option::None },
        };
        quote! {
            ::recordsheet_xlsx::SpecFieldSchema::new::<#ty>(#key, #display_name)
        }
    });
    let value_arms = l_fields.iter().map(|field| {
        let key = field.ident.unraw().to_string();
        let ident = &field.ident;
        quote! {
            #key => ::recordsheet_xlsx::ToCellValue::to_cell_value(&self.#ident),
        }
    });

    Ok(quote! {
        impl ::recordsheet_xlsx::ExportRecord for #name {
            fn fields() -> &'static [::recordsheet_xlsx::SpecFieldSchema] {
                static FIELDS: ::std::sync::OnceLock<
                    ::std::vec::Vec<::recordsheet_xlsx::SpecFieldSchema>,
                > = ::std::sync::OnceLock::new();
                FIELDS.get_or_init(|| ::std::vec![#(#schema_tokens),*])
            }

            fn field_value(&self, key: &str) -> ::recordsheet_xlsx::EnumCellValue {
                match key {
                    #(#value_arms)*
                    _ => ::recordsheet_xlsx::EnumCellValue::None,
                }
            }
        }
    })
}
