use crate::decode_field::{FieldKind, FieldMetadata};
use proc_macro2::{Literal, TokenStream};
use quote::{format_ident, quote};
use syn::ItemStruct;

pub(crate) fn record_trait(item: &ItemStruct, table: &str, fields: &[FieldMetadata]) -> TokenStream {
    let name = &item.ident;
    let (impl_generics, ty_generics, where_clause) = item.generics.split_for_impl();
    let mut describe = Vec::new();
    let mut value_at = Vec::new();
    let mut assign_at = Vec::new();
    for (i, field) in fields.iter().enumerate() {
        let index = Literal::usize_unsuffixed(i);
        let ident = &field.ident;
        let ty = &field.ty;
        match &field.kind {
            FieldKind::Column { tag, ddl_hook } => {
                let ident_str = ident.to_string();
                let hook = if *ddl_hook {
                    let hook = format_ident!("ddl_{}", ident);
                    quote!(::std::option::Option::Some(Self::#hook as fn() -> ::keel::FieldDefinition))
                } else {
                    quote!(::std::option::Option::None)
                };
                describe.push(quote! {
                    builder.field(::keel::FieldDecl {
                        index: #index,
                        ident: #ident_str,
                        tag: #tag,
                        prototype: <#ty as ::keel::AsValue>::as_empty_value(),
                        nullable: <#ty as ::keel::AsValue>::NULLABLE,
                        ddl_hook: #hook,
                    })?;
                });
                value_at.push(quote! {
                    [#index] => ::std::result::Result::Ok(::keel::AsValue::as_value(
                        ::std::clone::Clone::clone(&self.#ident),
                    )),
                });
                assign_at.push(quote! {
                    [#index] => {
                        self.#ident = <#ty as ::keel::AsValue>::try_from_value(value)?;
                        ::std::result::Result::Ok(())
                    }
                });
            }
            FieldKind::Flatten => {
                describe.push(quote! {
                    builder.flatten::<#ty>(#index)?;
                });
                value_at.push(quote! {
                    [#index, rest @ ..] => ::keel::Record::value_at(&self.#ident, rest),
                });
                assign_at.push(quote! {
                    [#index, rest @ ..] => ::keel::Record::assign_at(&mut self.#ident, rest, value),
                });
            }
            FieldKind::Skip => {}
        }
    }
    quote! {
        impl #impl_generics ::keel::Record for #name #ty_generics #where_clause {
            fn table_name() -> &'static str {
                #table
            }
            fn describe(builder: &mut ::keel::SchemaBuilder) -> ::keel::Result<()> {
                #(#describe)*
                ::std::result::Result::Ok(())
            }
            fn value_at(&self, path: &[usize]) -> ::keel::Result<::keel::Value> {
                match path {
                    #(#value_at)*
                    _ => ::std::result::Result::Err(::keel::bad_path::<Self>(path)),
                }
            }
            #[allow(unused_variables)]
            fn assign_at(&mut self, path: &[usize], value: ::keel::Value) -> ::keel::Result<()> {
                match path {
                    #(#assign_at)*
                    _ => ::std::result::Result::Err(::keel::bad_path::<Self>(path)),
                }
            }
        }

        impl #impl_generics ::keel::Decode for #name #ty_generics #where_clause {
            fn decode(
                row: ::keel::RowLabeled,
                registry: &::keel::Registry,
            ) -> ::keel::Result<Self> {
                ::keel::decode_record::<Self>(row, registry)
            }
        }

        impl #impl_generics ::keel::Params for #name #ty_generics #where_clause {
            fn param_values(
                &self,
                keys: ::std::option::Option<&[::std::string::String]>,
                registry: &::keel::Registry,
            ) -> ::keel::Result<::std::vec::Vec<::keel::Value>> {
                ::keel::record_params(self, keys, registry)
            }
        }
    }
}
