//! 订阅者与处理器描述（Subscriber / SubscriberDescriptor）
//!
//! 处理器发现不在引擎内完成：调用方（或 `#[subscriber]` 宏生成的代码）在注册时
//! 直接提供 `{事件类型, 线程模式, 优先级, 处理闭包}` 描述，引擎只消费描述。
//!
use crate::event::{Event, EventKind, EventType};
use std::any::{Any, type_name};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

// 未命名处理器的默认标识：闭包类型名 + 构建序号，每次构建各不相同
fn anonymous_key<F>() -> Cow<'static, str> {
    let id = NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed);
    Cow::Owned(format!("{}#{id}", type_name::<F>()))
}

/// 处理器声明的执行上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ThreadMode {
    /// 在投递线程上同步执行
    #[default]
    PostThread,
    /// 在 UI 主线程执行；投递方已在主线程时同步执行
    MainThread,
    /// 在串行后台线程执行；投递方已不在主线程时同步执行
    BackgroundThread,
    /// 总是交给并发线程池执行，无顺序保证
    Async,
}

/// 处理器返回值：`()` 或 `Result<(), E>`
pub trait HandlerOutcome {
    fn into_outcome(self) -> anyhow::Result<()>;
}

impl HandlerOutcome for () {
    fn into_outcome(self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<E> HandlerOutcome for Result<(), E>
where
    E: Into<anyhow::Error>,
{
    fn into_outcome(self) -> anyhow::Result<()> {
        self.map_err(Into::into)
    }
}

type HandlerFn = Arc<dyn Fn(&dyn Event) -> anyhow::Result<()> + Send + Sync>;

/// 单个处理器的不可变描述
#[derive(Clone)]
pub struct SubscriberDescriptor {
    event_type: EventType,
    thread_mode: ThreadMode,
    priority: i32,
    handler_key: Cow<'static, str>,
    handler: HandlerFn,
}

impl SubscriberDescriptor {
    /// 订阅具体类型 `T`；层级分发时 `T` 也可以是所投递事件的祖先类型
    pub fn on<T, F, R>(thread_mode: ThreadMode, priority: i32, handler: F) -> Self
    where
        T: EventKind,
        F: Fn(&T) -> R + Send + Sync + 'static,
        R: HandlerOutcome,
    {
        let handler: HandlerFn =
            Arc::new(move |event: &dyn Event| handler(event.view::<T>()?).into_outcome());

        Self {
            event_type: EventType::of::<T>(),
            thread_mode,
            priority,
            handler_key: anonymous_key::<F>(),
            handler,
        }
    }

    /// 订阅任意类型（通常是能力接口 `dyn Trait`），处理器接收类型擦除的事件
    pub fn on_kind<K, F, R>(thread_mode: ThreadMode, priority: i32, handler: F) -> Self
    where
        K: ?Sized + EventKind,
        F: Fn(&dyn Event) -> R + Send + Sync + 'static,
        R: HandlerOutcome,
    {
        Self {
            event_type: EventType::of::<K>(),
            thread_mode,
            priority,
            handler_key: anonymous_key::<F>(),
            handler: Arc::new(move |event: &dyn Event| handler(event).into_outcome()),
        }
    }

    /// 覆写处理器标识，用于重复注册检测
    ///
    /// 未命名的描述只与自身的克隆相同；`#[subscriber]` 以方法路径命名。
    pub fn named(mut self, key: impl Into<Cow<'static, str>>) -> Self {
        self.handler_key = key.into();
        self
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn thread_mode(&self) -> ThreadMode {
        self.thread_mode
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn handler_key(&self) -> &str {
        &self.handler_key
    }

    pub(crate) fn invoke(&self, event: &dyn Event) -> anyhow::Result<()> {
        (self.handler)(event)
    }

    /// 描述身份：同一事件类型下的同一处理器
    pub(crate) fn same_handler(&self, other: &Self) -> bool {
        self.event_type == other.event_type && self.handler_key == other.handler_key
    }
}

impl fmt::Debug for SubscriberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberDescriptor")
            .field("event_type", &self.event_type)
            .field("thread_mode", &self.thread_mode)
            .field("priority", &self.priority)
            .field("handler_key", &self.handler_key)
            .finish()
    }
}

/// 订阅者：注册时提供全部处理器描述
///
/// 返回的闭包通常持有 `self` 的克隆；注册表在注册期间持有订阅者的强引用。
pub trait Subscriber: Send + Sync + 'static {
    fn handlers(self: Arc<Self>) -> Vec<SubscriberDescriptor>;
}

/// 订阅者身份：注册时 `Arc` 的地址（引用相等）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberKey(usize);

/// 订阅者身份与类型名，用于日志与失败事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberInfo {
    key: SubscriberKey,
    type_name: &'static str,
}

impl SubscriberInfo {
    pub fn of<S: Send + Sync + 'static>(subscriber: &Arc<S>) -> Self {
        Self {
            key: SubscriberKey(Arc::as_ptr(subscriber) as *const () as usize),
            type_name: type_name::<S>(),
        }
    }

    pub fn key(&self) -> SubscriberKey {
        self.key
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// 注册表持有的订阅者强引用，保证注册期间地址不被复用
pub(crate) type SubscriberHandle = Arc<dyn Any + Send + Sync>;
