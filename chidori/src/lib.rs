//! 进程内事件总线（chidori）
//!
//! 把带类型的事件从生产者路由到已注册的处理器：
//! - 处理器声明执行上下文（投递线程、主线程、串行后台、并发线程池）与优先级；
//! - 处理器可在同步投递中途取消当前事件对后续订阅者的投递；
//! - 粘性事件（`post_sticky`）按类型保留最近一次的值，新订阅者注册时重放；
//! - 层级分发：订阅祖先类型或能力接口的处理器同样能收到子类型事件；
//! - 处理器失败不影响其它订阅者，按配置记录、重新抛出或合成失败事件。
//!
//! 处理器发现不依赖运行时反射：调用方直接提供 `SubscriberDescriptor`，
//! 或使用 `chidori-macros` 的 `#[subscriber]` 在编译期生成。
//!
//! 典型用法：
//! 1. 用 `EventBus::builder()` 构建总线（可选主线程支持与线程池）；
//! 2. 为订阅者实现 `Subscriber`，调用 `register` / `register_sticky`；
//! 3. 任意线程调用 `post` / `post_sticky` 投递事件；
//! 4. 不再需要时调用 `unregister`，已排队的异步投递随之失效。
//!
pub mod bus;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod main_thread;
pub mod registry;
pub mod resolver;
pub mod sticky;
pub mod subscriber;
pub mod subscription;

mod posting;

pub use bus::EventBus;
pub use config::EventBusConfig;
pub use dispatch::WorkerPool;
pub use error::{BusError, BusResult};
pub use event::{
    Event, EventKind, EventRef, EventType, NoSubscriberEvent, SubscriberFailureEvent,
    downcast_event,
};
pub use main_thread::{LooperThread, MainThreadSupport};
pub use subscriber::{
    HandlerOutcome, Subscriber, SubscriberDescriptor, SubscriberInfo, SubscriberKey, ThreadMode,
};
pub use subscription::Subscription;

// 允许在本 crate 内部通过 ::chidori 进行自引用，
// 以便过程宏在本 crate 的测试中也能解析到 ::chidori 路径。
extern crate self as chidori;
