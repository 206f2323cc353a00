use super::{Event, EventKind, EventRef, EventType};
use crate::subscriber::SubscriberInfo;
use std::any::Any;
use std::sync::Arc;

/// 某事件没有任何订阅者时由总线合成的通知事件
#[derive(Debug, Clone)]
pub struct NoSubscriberEvent {
    pub original_event: EventRef,
}

/// 订阅者处理事件失败时由总线合成的通知事件
#[derive(Debug, Clone)]
pub struct SubscriberFailureEvent {
    pub cause: Arc<anyhow::Error>,
    pub failing_event: EventRef,
    pub failing_subscriber: SubscriberInfo,
}

impl EventKind for NoSubscriberEvent {}

impl Event for NoSubscriberEvent {
    fn event_type(&self) -> EventType {
        EventType::of::<Self>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl EventKind for SubscriberFailureEvent {}

impl Event for SubscriberFailureEvent {
    fn event_type(&self) -> EventType {
        EventType::of::<Self>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// 总线自身合成的通知不再触发新的通知，避免递归
pub(crate) fn is_notification(ty: &EventType) -> bool {
    ty.is::<NoSubscriberEvent>() || ty.is::<SubscriberFailureEvent>()
}
