use crate::utils::parse_path_list;
use proc_macro::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Member, Path, Type, parse_macro_input};

/// #[derive(Event)] 实现
/// - 结构体可用 `#[event(parent)]` 标注一个父事件字段（具名或元组字段皆可）
/// - 结构体与枚举均可用 `#[event(implements(..))]` 声明能力接口
pub(crate) fn expand(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let mut capabilities: Vec<Path> = Vec::new();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("event")) {
        let parsed = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("implements") {
                capabilities.extend(parse_path_list(meta.input)?);
                Ok(())
            } else {
                Err(meta.error("unsupported event option, expected `implements(..)`"))
            }
        });
        if let Err(err) = parsed {
            return err.to_compile_error().into();
        }
    }

    let parent = match find_parent(&input) {
        Ok(parent) => parent,
        Err(err) => return err.to_compile_error().into(),
    };

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let parent_fn = parent.as_ref().map(|(_, ty)| {
        quote! {
            fn parent() -> ::std::option::Option<::chidori::EventType> {
                ::std::option::Option::Some(::chidori::EventType::of::<#ty>())
            }
        }
    });

    let capabilities_fn = (!capabilities.is_empty()).then(|| {
        quote! {
            fn capabilities() -> ::std::vec::Vec<::chidori::EventType> {
                ::std::vec![#(::chidori::EventType::of::<dyn #capabilities>()),*]
            }
        }
    });

    let ancestor_fn = parent.as_ref().map(|(member, _)| {
        quote! {
            fn ancestor(
                &self,
                id: ::std::any::TypeId,
            ) -> ::std::option::Option<&dyn ::std::any::Any> {
                if id == ::std::any::TypeId::of::<Self>() {
                    return ::std::option::Option::Some(self);
                }
                ::chidori::Event::ancestor(&self.#member, id)
            }
        }
    });

    let expanded = quote! {
        impl #impl_generics ::chidori::EventKind for #name #ty_generics #where_clause {
            #parent_fn
            #capabilities_fn
        }

        impl #impl_generics ::chidori::Event for #name #ty_generics #where_clause {
            fn event_type(&self) -> ::chidori::EventType {
                ::chidori::EventType::of::<Self>()
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn into_any(
                self: ::std::sync::Arc<Self>,
            ) -> ::std::sync::Arc<dyn ::std::any::Any + ::std::marker::Send + ::std::marker::Sync> {
                self
            }

            #ancestor_fn
        }
    };

    TokenStream::from(expanded)
}

// 查找 `#[event(parent)]` 字段；至多一个
fn find_parent(input: &DeriveInput) -> syn::Result<Option<(Member, Type)>> {
    let fields = match &input.data {
        Data::Struct(st) => &st.fields,
        Data::Enum(en) => {
            for variant in &en.variants {
                for field in variant.fields.iter() {
                    if field.attrs.iter().any(|a| a.path().is_ident("event")) {
                        return Err(syn::Error::new(
                            field.span(),
                            "#[event(parent)] is only supported on struct fields",
                        ));
                    }
                }
            }
            return Ok(None);
        }
        Data::Union(u) => {
            return Err(syn::Error::new(
                u.union_token.span(),
                "#[derive(Event)] does not support unions",
            ));
        }
    };

    let mut parent: Option<(Member, Type)> = None;
    for (index, field) in fields.iter().enumerate() {
        let mut is_parent = false;
        for attr in field.attrs.iter().filter(|a| a.path().is_ident("event")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("parent") {
                    is_parent = true;
                    Ok(())
                } else {
                    Err(meta.error("unsupported field option, expected `parent`"))
                }
            })?;
        }
        if !is_parent {
            continue;
        }

        if parent.is_some() {
            return Err(syn::Error::new(
                field.span(),
                "duplicate #[event(parent)]: an event has at most one parent",
            ));
        }
        let member = match &field.ident {
            Some(ident) => Member::Named(ident.clone()),
            None => Member::Unnamed(index.into()),
        };
        parent = Some((member, field.ty.clone()));
    }
    Ok(parent)
}
