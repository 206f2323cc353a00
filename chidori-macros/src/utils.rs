use proc_macro::TokenStream;
use syn::punctuated::Punctuated;
use syn::{Attribute, Path, Token, parse::ParseStream};

// 统一的编译期错误输出
pub(crate) fn compile_error(span: proc_macro2::Span, message: &str) -> TokenStream {
    syn::Error::new(span, message).to_compile_error().into()
}

// 按名称拆出属性：返回 (匹配的属性, 其余属性)
pub(crate) fn take_attrs(attrs: &[Attribute], name: &str) -> (Vec<Attribute>, Vec<Attribute>) {
    attrs
        .iter()
        .cloned()
        .partition(|attr| attr.path().is_ident(name))
}

// 解析 `(A, b::C)` 形式的路径列表
pub(crate) fn parse_path_list(input: ParseStream) -> syn::Result<Vec<Path>> {
    let content;
    syn::parenthesized!(content in input);
    let list = Punctuated::<Path, Token![,]>::parse_terminated(&content)?;
    Ok(list.into_iter().collect())
}
