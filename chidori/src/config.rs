use bon::Builder;
use std::time::Duration;

/// 事件总线配置；总线构建后不可变
#[derive(Debug, Clone, Builder)]
pub struct EventBusConfig {
    /// 记录处理器失败
    #[builder(default = true)]
    pub log_failures: bool,
    /// 记录无人订阅的事件
    #[builder(default = true)]
    pub log_no_subscriber: bool,
    /// 处理器失败时投递 `SubscriberFailureEvent`
    #[builder(default = true)]
    pub emit_failure_event: bool,
    /// 无人订阅时投递 `NoSubscriberEvent`
    #[builder(default = true)]
    pub emit_no_subscriber_event: bool,
    /// 处理器失败时终止本次 `post` 并返回错误
    #[builder(default = false)]
    pub rethrow_failures: bool,
    /// 同时投递给祖先类型与能力接口的订阅者
    #[builder(default = true)]
    pub hierarchy_dispatch: bool,
    /// 主线程通道单次调度的时间预算
    #[builder(default = Duration::from_millis(10))]
    pub main_thread_budget: Duration,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
