//! 事件总线（EventBus）
//!
//! 对外的唯一入口，负责编排一次投递的完整流程：
//! - 每线程一个可重入的投递队列：处理器内再次 `post` 只入队，由最外层调用按 FIFO 排空；
//! - 解析事件类型（可选层级分发）→ 查询订阅快照 → 按优先级依次路由；
//! - 处理器失败按配置记录、重新抛出或合成 `SubscriberFailureEvent`；
//! - 粘性事件的缓存与注册时重放；
//! - 进程级默认实例（只能安装一次）。
//!
use crate::config::EventBusConfig;
use crate::dispatch::{
    AsyncPoster, BackgroundPoster, MainThreadPoster, PendingPost, PendingPostPool, Poster, Route,
    WorkerPool, route,
};
use crate::error::{BusError, BusResult};
use crate::event::{
    Event, EventKind, EventRef, EventType, NoSubscriberEvent, SubscriberFailureEvent,
    downcast_event, is_notification,
};
use crate::main_thread::MainThreadSupport;
use crate::posting::{self, PostingKey, PostingState};
use crate::registry::SubscriptionRegistry;
use crate::resolver::EventTypeResolver;
use crate::sticky::StickyEventStore;
use crate::subscriber::{
    Subscriber, SubscriberDescriptor, SubscriberHandle, SubscriberInfo, ThreadMode,
};
use crate::subscription::Subscription;
use bon::bon;
use std::any::{Any, TypeId};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, warn};

static NEXT_BUS_ID: AtomicU64 = AtomicU64::new(1);
static DEFAULT_BUS: OnceLock<EventBus> = OnceLock::new();

/// 进程内发布/订阅事件总线；克隆共享同一实例
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

pub(crate) struct BusInner {
    id: u64,
    posting_key: PostingKey,
    config: EventBusConfig,
    registry: SubscriptionRegistry,
    sticky: StickyEventStore,
    resolver: &'static EventTypeResolver,
    pool: PendingPostPool,
    main_thread: Option<Arc<dyn MainThreadSupport>>,
    main_poster: Option<MainThreadPoster>,
    background_poster: BackgroundPoster,
    async_poster: AsyncPoster,
    worker_pool: WorkerPool,
}

#[bon]
impl EventBus {
    #[builder]
    pub fn new(
        #[builder(default)] config: EventBusConfig,
        worker_pool: Option<WorkerPool>,
        main_thread: Option<Arc<dyn MainThreadSupport>>,
    ) -> Self {
        let main_poster = main_thread
            .clone()
            .map(|support| MainThreadPoster::new(support, config.main_thread_budget));

        let id = NEXT_BUS_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            inner: Arc::new(BusInner {
                id,
                posting_key: PostingKey::new(id),
                config,
                registry: SubscriptionRegistry::new(),
                sticky: StickyEventStore::new(),
                resolver: EventTypeResolver::global(),
                pool: PendingPostPool::new(),
                main_thread,
                main_poster,
                background_poster: BackgroundPoster::default(),
                async_poster: AsyncPoster,
                worker_pool: worker_pool.unwrap_or_default(),
            }),
        }
    }
}

impl<S: event_bus_builder::IsComplete> EventBusBuilder<S> {
    /// 完成构建并安装为进程级默认实例
    pub fn install_default(self) -> BusResult<EventBus> {
        let bus = self.build();
        EventBus::install_default(bus.clone())?;
        Ok(bus)
    }
}

impl EventBus {
    /// 进程级默认实例；首次访问时以默认配置创建
    pub fn get_default() -> EventBus {
        DEFAULT_BUS.get_or_init(EventBus::default).clone()
    }

    /// 安装进程级默认实例；已存在（含已被 `get_default` 惰性创建）时失败
    pub fn install_default(bus: EventBus) -> BusResult<()> {
        DEFAULT_BUS.set(bus).map_err(|_| BusError::AlreadyInstalled)
    }

    pub fn config(&self) -> &EventBusConfig {
        &self.inner.config
    }

    // --- 订阅 ---

    pub fn register<S: Subscriber>(&self, subscriber: &Arc<S>) -> BusResult<()> {
        let descriptors = subscriber.clone().handlers();
        self.register_with(subscriber, descriptors, false)
    }

    /// 注册并立即重放已缓存的粘性事件
    pub fn register_sticky<S: Subscriber>(&self, subscriber: &Arc<S>) -> BusResult<()> {
        let descriptors = subscriber.clone().handlers();
        self.register_with(subscriber, descriptors, true)
    }

    /// 以显式描述注册任意订阅者
    pub fn register_with<S>(
        &self,
        subscriber: &Arc<S>,
        descriptors: Vec<SubscriberDescriptor>,
        sticky: bool,
    ) -> BusResult<()>
    where
        S: Send + Sync + 'static,
    {
        let info = SubscriberInfo::of(subscriber);
        let owner: SubscriberHandle = subscriber.clone();
        let added = self.inner.registry.register(owner, info, descriptors)?;
        debug!(
            subscriber = info.type_name(),
            handlers = added.len(),
            sticky,
            "subscriber registered"
        );

        if sticky {
            for subscription in &added {
                self.inner.deliver_sticky(subscription)?;
            }
        }
        Ok(())
    }

    pub fn unregister<S: Send + Sync + 'static>(&self, subscriber: &Arc<S>) {
        let info = SubscriberInfo::of(subscriber);
        if self.inner.registry.unregister(info.key()) {
            debug!(subscriber = info.type_name(), "subscriber unregistered");
        } else {
            warn!(
                subscriber = info.type_name(),
                "subscriber to unregister was not registered before"
            );
        }
    }

    pub fn is_registered<S: Send + Sync + 'static>(&self, subscriber: &Arc<S>) -> bool {
        self.inner
            .registry
            .is_registered(SubscriberInfo::of(subscriber).key())
    }

    /// 投递该具体类型的事件时是否会有订阅者接收
    pub fn has_subscriber_for_event(&self, event_type: EventType) -> bool {
        let types = self.inner.target_types(event_type);
        self.inner.registry.has_subscribers(&types)
    }

    // --- 投递 ---

    pub fn post<E: Event>(&self, event: E) -> BusResult<()> {
        self.post_ref(Arc::new(event))
    }

    pub fn post_ref(&self, event: EventRef) -> BusResult<()> {
        self.inner.post(event)
    }

    /// 写入粘性缓存后再投递，注册中的订阅者不会错过“无 → 有”的转变
    pub fn post_sticky<E: Event>(&self, event: E) -> BusResult<()> {
        self.post_sticky_ref(Arc::new(event))
    }

    pub fn post_sticky_ref(&self, event: EventRef) -> BusResult<()> {
        self.inner.sticky.put(event.clone());
        self.post_ref(event)
    }

    /// 在 PostThread 处理器内取消当前事件对后续订阅者的投递
    ///
    /// `event` 必须是处理器正在处理的那个事件（或其祖先视角）。
    pub fn cancel_delivery<T: ?Sized + 'static>(&self, event: &T) -> BusResult<()> {
        let state = posting::current(&self.inner.posting_key);
        if !state.is_posting() {
            return Err(BusError::IllegalCancellation {
                reason: "may only be called from inside a handler on the posting thread",
            });
        }

        let current = state.current_event().ok_or(BusError::IllegalCancellation {
            reason: "no event is being delivered",
        })?;
        if !is_same_event(&current, event) {
            return Err(BusError::IllegalCancellation {
                reason: "only the currently handled event may be canceled",
            });
        }

        let mode = state
            .current_subscription()
            .map(|s| s.thread_mode())
            .ok_or(BusError::InvalidPostingState {
                reason: "current event without subscription",
            })?;
        if mode != ThreadMode::PostThread {
            return Err(BusError::IllegalCancellation {
                reason: "only PostThread handlers may cancel delivery",
            });
        }

        state.cancel();
        Ok(())
    }

    // --- 粘性事件 ---

    pub fn sticky_event<T: Event + EventKind>(&self) -> Option<Arc<T>> {
        self.inner
            .sticky
            .get(&EventType::of::<T>())
            .and_then(downcast_event::<T>)
    }

    pub fn remove_sticky_event<T: Event + EventKind>(&self) -> Option<Arc<T>> {
        self.inner
            .sticky
            .remove(&EventType::of::<T>())
            .and_then(downcast_event::<T>)
    }

    /// 仅当缓存的正是该实例时移除
    pub fn remove_sticky(&self, event: &EventRef) -> bool {
        self.inner.sticky.remove_if_equal(event)
    }

    pub fn remove_all_sticky_events(&self) {
        self.inner.sticky.clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("id", &self.inner.id)
            .field("config", &self.inner.config)
            .field("worker_pool", &self.inner.worker_pool)
            .field("main_thread", &self.inner.main_thread.is_some())
            .finish()
    }
}

impl BusInner {
    pub(crate) fn main_poster(&self) -> Option<&MainThreadPoster> {
        self.main_poster.as_ref()
    }

    pub(crate) fn background_poster(&self) -> &BackgroundPoster {
        &self.background_poster
    }

    pub(crate) fn worker_pool(&self) -> &WorkerPool {
        &self.worker_pool
    }

    fn is_main_thread(&self) -> bool {
        self.main_thread
            .as_ref()
            .is_some_and(|support| support.is_main_thread())
    }

    fn target_types(&self, concrete: EventType) -> Arc<[EventType]> {
        if self.config.hierarchy_dispatch {
            self.resolver.resolve(concrete)
        } else {
            Arc::from(vec![concrete])
        }
    }

    fn post(self: &Arc<Self>, event: EventRef) -> BusResult<()> {
        let state = posting::current(&self.posting_key);
        state.enqueue(event);
        if state.is_posting() {
            return Ok(());
        }

        let _posting = state.begin(self.is_main_thread())?;
        while let Some(event) = state.dequeue() {
            if let Err(err) = self.post_single(&state, event) {
                let dropped = state.clear_queue();
                if dropped > 0 {
                    warn!(dropped, "discarding queued events after rethrown handler failure");
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn post_single(self: &Arc<Self>, state: &PostingState, event: EventRef) -> BusResult<()> {
        let concrete = event.event_type();

        let mut found = false;
        for ty in self.target_types(concrete).iter() {
            found |= self.post_for_type(state, &event, ty)?;
        }

        if !found {
            if self.config.log_no_subscriber {
                debug!(event_type = concrete.name(), "no subscribers registered for event");
            }
            if self.config.emit_no_subscriber_event && !is_notification(&concrete) {
                self.post(Arc::new(NoSubscriberEvent {
                    original_event: event,
                }))?;
            }
        }
        Ok(())
    }

    // 取消只终止当前类型的剩余订阅，其余解析类型照常投递
    fn post_for_type(
        self: &Arc<Self>,
        state: &PostingState,
        event: &EventRef,
        event_type: &EventType,
    ) -> BusResult<bool> {
        let Some(subscriptions) = self.registry.lookup(event_type) else {
            return Ok(false);
        };

        for subscription in subscriptions.iter() {
            if !subscription.is_active() {
                continue;
            }

            state.set_current(event.clone(), subscription.clone());
            let delivered = self.post_to_subscription(subscription, event, state.is_main_thread());
            let canceled = state.is_canceled();
            state.reset_current();

            delivered?;
            if canceled {
                break;
            }
        }
        Ok(true)
    }

    fn post_to_subscription(
        self: &Arc<Self>,
        subscription: &Arc<Subscription>,
        event: &EventRef,
        on_main_thread: bool,
    ) -> BusResult<()> {
        let lane: &dyn Poster = match route(
            subscription.thread_mode(),
            on_main_thread,
            self.main_poster.is_some(),
        ) {
            Route::Invoke => return self.invoke(subscription, event),
            Route::MainThread => match &self.main_poster {
                Some(poster) => poster as &dyn Poster,
                None => return self.invoke(subscription, event),
            },
            Route::Background => &self.background_poster,
            Route::Async => &self.async_poster,
        };

        lane.enqueue(self, self.pool.obtain(event.clone(), subscription.clone()));
        Ok(())
    }

    /// 通道执行入口：先取出字段并归还信封，再检查订阅是否仍活跃
    pub(crate) fn invoke_pending(self: &Arc<Self>, post: Box<PendingPost>) {
        let Some((event, subscription)) = self.pool.release(post) else {
            return;
        };
        if !subscription.is_active() {
            return;
        }

        if let Err(e) = self.invoke(&subscription, &event) {
            error!(
                error = %e,
                event_type = event.event_type().name(),
                subscriber = subscription.subscriber().type_name(),
                "handler failure could not be rethrown from an asynchronous lane"
            );
        }
    }

    fn invoke(self: &Arc<Self>, subscription: &Arc<Subscription>, event: &EventRef) -> BusResult<()> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            subscription.descriptor().invoke(event.as_ref())
        }))
        .unwrap_or_else(|payload| Err(panic_cause(payload)));

        match outcome {
            Ok(()) => Ok(()),
            Err(cause) => self.handle_failure(subscription, event, cause),
        }
    }

    fn handle_failure(
        self: &Arc<Self>,
        subscription: &Arc<Subscription>,
        event: &EventRef,
        cause: anyhow::Error,
    ) -> BusResult<()> {
        let subscriber = subscription.subscriber();

        if let Some(failure) = event.downcast_ref::<SubscriberFailureEvent>() {
            if self.config.log_failures {
                error!(
                    subscriber = subscriber.type_name(),
                    error = %cause,
                    original_subscriber = failure.failing_subscriber.type_name(),
                    original_error = %failure.cause,
                    "subscriber failed while handling a failure event"
                );
            }
            return Ok(());
        }

        if self.config.rethrow_failures {
            return Err(BusError::HandlerInvocation {
                event_type: event.event_type().name(),
                subscriber: subscriber.type_name(),
                source: cause,
            });
        }

        if self.config.log_failures {
            error!(
                event_type = event.event_type().name(),
                subscriber = subscriber.type_name(),
                error = %cause,
                "could not dispatch event to subscriber"
            );
        }

        if self.config.emit_failure_event {
            self.post(Arc::new(SubscriberFailureEvent {
                cause: Arc::new(cause),
                failing_event: event.clone(),
                failing_subscriber: *subscriber,
            }))?;
        }
        Ok(())
    }

    fn deliver_sticky(self: &Arc<Self>, subscription: &Arc<Subscription>) -> BusResult<()> {
        let target = subscription.event_type();
        let cached: Vec<EventRef> = if self.config.hierarchy_dispatch {
            self.sticky
                .entries()
                .into_iter()
                .filter(|(ty, _)| self.resolver.is_assignable(&target, *ty))
                .map(|(_, event)| event)
                .collect()
        } else {
            self.sticky.get(&target).into_iter().collect()
        };

        let on_main_thread = self.is_main_thread();
        for event in cached {
            self.post_to_subscription(subscription, &event, on_main_thread)?;
        }
        Ok(())
    }
}

impl Drop for BusInner {
    fn drop(&mut self) {
        posting::forget(self.id);
    }
}

fn is_same_event<T: ?Sized + 'static>(current: &EventRef, candidate: &T) -> bool {
    let candidate = candidate as *const T as *const ();
    if Arc::as_ptr(current) as *const () == candidate {
        return true;
    }
    current
        .ancestor(TypeId::of::<T>())
        .is_some_and(|view| view as *const dyn Any as *const () == candidate)
}

fn panic_cause(payload: Box<dyn Any + Send>) -> anyhow::Error {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    anyhow::anyhow!("handler panicked: {message}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn quiet() -> EventBusConfig {
        EventBusConfig::builder()
            .log_failures(false)
            .log_no_subscriber(false)
            .build()
    }

    fn bus() -> EventBus {
        EventBus::builder()
            .config(quiet())
            .worker_pool(WorkerPool::Threads)
            .build()
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn push(&self, s: impl Into<String>) {
            self.seen.lock().unwrap().push(s.into());
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[test]
    fn reentrant_post_is_breadth_first() {
        let bus = bus();
        let rec = Arc::new(Recorder::default());

        let (r, b) = (rec.clone(), bus.clone());
        let first = SubscriberDescriptor::on::<String, _, _>(ThreadMode::PostThread, 1, move |s: &String| {
            r.push(format!("a:{s}"));
            if s == "x" {
                b.post("y".to_string()).unwrap();
            }
        })
        .named("first");
        let r = rec.clone();
        let second = SubscriberDescriptor::on::<String, _, _>(ThreadMode::PostThread, 0, move |s: &String| {
            r.push(format!("b:{s}"));
        })
        .named("second");

        bus.register_with(&rec, vec![first, second], false).unwrap();
        bus.post("x".to_string()).unwrap();

        assert_eq!(rec.seen(), vec!["a:x", "b:x", "a:y", "b:y"]);
    }

    #[test]
    fn no_subscriber_event_is_emitted_once() {
        let bus = bus();
        let rec = Arc::new(Recorder::default());
        let r = rec.clone();
        bus.register_with(
            &rec,
            vec![SubscriberDescriptor::on::<NoSubscriberEvent, _, _>(
                ThreadMode::PostThread,
                0,
                move |e: &NoSubscriberEvent| r.push(format!("{:?}", e.original_event)),
            )],
            false,
        )
        .unwrap();

        bus.post(42_i64).unwrap();
        assert_eq!(rec.seen(), vec!["42"]);
    }

    #[test]
    fn cancel_outside_handler_is_illegal() {
        let bus = bus();
        let err = bus.cancel_delivery(&"x".to_string()).unwrap_err();
        assert!(matches!(err, BusError::IllegalCancellation { .. }));
    }

    #[test]
    fn panicking_handler_becomes_failure_event() {
        let bus = bus();
        let rec = Arc::new(Recorder::default());
        let r = rec.clone();
        bus.register_with(
            &rec,
            vec![
                SubscriberDescriptor::on::<i32, _, ()>(ThreadMode::PostThread, 0, |_: &i32| {
                    panic!("bad input")
                })
                .named("explode"),
                SubscriberDescriptor::on::<SubscriberFailureEvent, _, _>(
                    ThreadMode::PostThread,
                    0,
                    move |e: &SubscriberFailureEvent| r.push(e.cause.to_string()),
                )
                .named("observe"),
            ],
            false,
        )
        .unwrap();

        bus.post(1_i32).unwrap();
        assert_eq!(rec.seen(), vec!["handler panicked: bad input"]);
    }

    #[test]
    fn unregister_unknown_subscriber_is_not_an_error() {
        let bus = bus();
        let stranger = Arc::new(());
        bus.unregister(&stranger);
        assert!(!bus.is_registered(&stranger));
    }
}
