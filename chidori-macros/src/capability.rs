use crate::utils::{compile_error, parse_path_list};
use proc_macro::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{ItemTrait, Path, parse::Parser, parse_macro_input};

/// #[capability] 宏实现
/// - 仅支持非泛型 trait
/// - 原样保留 trait 定义，并追加 `impl ::chidori::EventKind for dyn Trait`
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut extends: Vec<Path> = Vec::new();
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("extends") {
            extends.extend(parse_path_list(meta.input)?);
            Ok(())
        } else {
            Err(meta.error("unsupported capability option, expected `extends(..)`"))
        }
    });
    if let Err(err) = parser.parse(attr) {
        return err.to_compile_error().into();
    }

    let item_trait = parse_macro_input!(item as ItemTrait);
    if !item_trait.generics.params.is_empty() {
        return compile_error(
            item_trait.generics.span(),
            "#[capability] does not support generic traits",
        );
    }

    let name = &item_trait.ident;
    let capabilities_fn = (!extends.is_empty()).then(|| {
        quote! {
            fn capabilities() -> ::std::vec::Vec<::chidori::EventType> {
                ::std::vec![#(::chidori::EventType::of::<dyn #extends>()),*]
            }
        }
    });

    let expanded = quote! {
        #item_trait

        impl ::chidori::EventKind for dyn #name {
            #capabilities_fn
        }
    };

    TokenStream::from(expanded)
}
