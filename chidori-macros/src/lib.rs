use proc_macro::TokenStream;

mod capability;
mod event;
mod subscriber;
mod utils;

/// 事件派生宏
/// - 生成 `::chidori::EventKind` 与 `::chidori::Event` 实现
/// - 容器参数：`#[event(implements(TraitA, TraitB))]` 声明能力接口（需先以 `#[capability]` 标注）
/// - 字段参数：`#[event(parent)]` 标注父事件字段，父类型订阅者可借用该字段
#[proc_macro_derive(Event, attributes(event))]
pub fn derive_event(input: TokenStream) -> TokenStream {
    event::expand(input)
}

/// 能力接口宏
/// - 为 `dyn Trait` 实现 `::chidori::EventKind`，使其可作为订阅目标
/// - 参数：`#[capability(extends(OtherTrait))]` 声明被继承的能力
#[proc_macro_attribute]
pub fn capability(attr: TokenStream, item: TokenStream) -> TokenStream {
    capability::expand(attr, item)
}

/// 订阅者宏
/// - 标注在固有 `impl` 块上，收集其中带 `#[subscribe(..)]` 的方法
/// - 生成 `::chidori::Subscriber` 实现（每个方法一个 `SubscriberDescriptor`）
/// - 方法参数：`thread_mode = PostThread|MainThread|BackgroundThread|Async`、
///   `priority = N`、`on = dyn Capability`（此时方法接收 `&dyn ::chidori::Event`）
#[proc_macro_attribute]
pub fn subscriber(attr: TokenStream, item: TokenStream) -> TokenStream {
    subscriber::expand(attr, item)
}
