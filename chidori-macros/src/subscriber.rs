use crate::utils::{compile_error, take_attrs};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, quote};
use syn::spanned::Spanned;
use syn::{
    Attribute, Expr, FnArg, Ident, ImplItem, ImplItemFn, ItemImpl, Meta, Result, Type,
    parse_macro_input,
};

const THREAD_MODES: [&str; 4] = ["PostThread", "MainThread", "BackgroundThread", "Async"];

/// #[subscriber] 宏实现
/// - 仅支持固有 impl 块；`#[subscribe]` 方法签名须为 `fn(&self, &T) -> ()|Result<(), E>`
/// - 处理器标识为 `模块路径::类型::方法名`，用于重复注册检测
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return compile_error(
            proc_macro2::Span::call_site(),
            "#[subscriber] takes no arguments",
        );
    }

    let mut item_impl = parse_macro_input!(item as ItemImpl);
    if let Some((_, path, _)) = &item_impl.trait_ {
        return compile_error(path.span(), "#[subscriber] only on inherent impl blocks");
    }

    let mut descriptors: Vec<TokenStream2> = Vec::new();
    for impl_item in item_impl.items.iter_mut() {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };

        let (subscribe, retained) = take_attrs(&method.attrs, "subscribe");
        if subscribe.is_empty() {
            continue;
        }
        if subscribe.len() > 1 {
            return compile_error(subscribe[1].span(), "duplicate #[subscribe] on this method");
        }
        method.attrs = retained;

        match descriptor_for(&item_impl.self_ty, method, &subscribe[0]) {
            Ok(tokens) => descriptors.push(tokens),
            Err(err) => return err.to_compile_error().into(),
        }
    }

    if descriptors.is_empty() {
        return compile_error(
            item_impl.self_ty.span(),
            "#[subscriber] requires at least one #[subscribe] method",
        );
    }

    let self_ty = &item_impl.self_ty;
    let (impl_generics, _, where_clause) = item_impl.generics.split_for_impl();

    let expanded = quote! {
        #item_impl

        impl #impl_generics ::chidori::Subscriber for #self_ty #where_clause {
            fn handlers(
                self: ::std::sync::Arc<Self>,
            ) -> ::std::vec::Vec<::chidori::SubscriberDescriptor> {
                ::std::vec![#(#descriptors),*]
            }
        }
    };

    TokenStream::from(expanded)
}

struct SubscribeConfig {
    thread_mode: Ident,
    priority: Expr,
    on: Option<Type>,
}

fn parse_subscribe(attr: &Attribute) -> Result<SubscribeConfig> {
    let mut config = SubscribeConfig {
        thread_mode: Ident::new("PostThread", attr.span()),
        priority: syn::parse_quote!(0),
        on: None,
    };

    // 允许无参数的 `#[subscribe]`
    if matches!(attr.meta, Meta::Path(_)) {
        return Ok(config);
    }

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("thread_mode") {
            let mode: Ident = meta.value()?.parse()?;
            if !THREAD_MODES.iter().any(|m| mode == *m) {
                return Err(syn::Error::new(
                    mode.span(),
                    "thread_mode must be one of PostThread, MainThread, BackgroundThread, Async",
                ));
            }
            config.thread_mode = mode;
        } else if meta.path.is_ident("priority") {
            config.priority = meta.value()?.parse()?;
        } else if meta.path.is_ident("on") {
            config.on = Some(meta.value()?.parse()?);
        } else {
            return Err(meta.error("unsupported subscribe option"));
        }
        Ok(())
    })?;

    Ok(config)
}

fn descriptor_for(self_ty: &Type, method: &ImplItemFn, attr: &Attribute) -> Result<TokenStream2> {
    let config = parse_subscribe(attr)?;
    let sig = &method.sig;
    let method_name = &sig.ident;

    let mut inputs = sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(r)) if r.reference.is_some() && r.mutability.is_none() => {}
        _ => {
            return Err(syn::Error::new(
                sig.span(),
                "#[subscribe] methods must take `&self`",
            ));
        }
    }
    let event_ty = match (inputs.next(), inputs.next()) {
        (Some(FnArg::Typed(arg)), None) => match arg.ty.as_ref() {
            Type::Reference(r) if r.mutability.is_none() => r.elem.as_ref().clone(),
            other => {
                return Err(syn::Error::new(
                    other.span(),
                    "the event parameter must be a shared reference `&T`",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new(
                sig.span(),
                "#[subscribe] methods take exactly one event parameter",
            ));
        }
    };

    let mode = &config.thread_mode;
    let priority = &config.priority;
    let key = quote! {
        ::std::concat!(
            ::std::module_path!(),
            "::",
            ::std::stringify!(#self_ty),
            "::",
            ::std::stringify!(#method_name)
        )
    };

    let constructor = match &config.on {
        Some(kind) => quote! {
            ::chidori::SubscriberDescriptor::on_kind::<#kind, _, _>(
                ::chidori::ThreadMode::#mode,
                #priority,
                move |event: &dyn ::chidori::Event| this.#method_name(event),
            )
        },
        None => {
            let event_ty = event_ty.to_token_stream();
            quote! {
                ::chidori::SubscriberDescriptor::on::<#event_ty, _, _>(
                    ::chidori::ThreadMode::#mode,
                    #priority,
                    move |event: &#event_ty| this.#method_name(event),
                )
            }
        }
    };

    Ok(quote! {
        {
            let this = ::std::sync::Arc::clone(&self);
            #constructor.named(#key)
        }
    })
}
