//! Entity derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity can only be derived for structs",
            ));
        }
    };

    let mut attributes = Vec::with_capacity(fields.len());
    let mut values = Vec::with_capacity(fields.len());
    let mut assigns = Vec::with_capacity(fields.len());

    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let attr_name = ident.unraw().to_string();
        let ty = &field.ty;
        let type_name = quote!(#ty).to_string().replace(' ', "");
        let public = matches!(field.vis, syn::Visibility::Public(_));
        let tag = match get_tag(field)? {
            Some(tag) => quote!(::core::option::Option::Some(#tag)),
            None => quote!(::core::option::Option::None),
        };

        attributes.push(quote! {
            ::entorm::AttributeShape {
                name: #attr_name,
                type_name: #type_name,
                semantic: ::core::option::Option::Some(
                    <#ty as ::entorm::FieldValue>::SEMANTIC
                ),
                public: #public,
                tag: #tag,
            }
        });
        values.push(quote! {
            ::entorm::FieldValue::to_value(&self.#ident)
        });
        assigns.push(quote! {
            #attr_name => {
                self.#ident = ::entorm::FieldValue::from_value(value)
                    .map_err(|message| ::entorm::OrmError::decode(attribute, message))?;
            }
        });
    }

    let struct_name = name.unraw().to_string();

    Ok(quote! {
        impl #impl_generics ::entorm::Entity for #name #ty_generics #where_clause {
            fn shape() -> ::entorm::EntityShape {
                ::entorm::EntityShape {
                    name: #struct_name,
                    kind: ::entorm::ShapeKind::Struct,
                    attributes: ::std::vec![#(#attributes),*],
                }
            }

            fn values(&self) -> ::std::vec::Vec<::entorm::Value> {
                ::std::vec![#(#values),*]
            }

            fn assign(
                &mut self,
                attribute: &str,
                value: ::entorm::Value,
            ) -> ::entorm::OrmResult<()> {
                match attribute {
                    #(#assigns)*
                    _ => {}
                }
                ::core::result::Result::Ok(())
            }
        }
    })
}

/// Value of `#[orm(tag = "...")]`, if present.
fn get_tag(field: &syn::Field) -> Result<Option<String>> {
    let mut tag = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("tag") {
                let value: syn::LitStr = meta.value()?.parse()?;
                tag = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported orm attribute, expected `tag = \"...\"`"))
            }
        })?;
    }
    Ok(tag)
}
