use crate::event::EventType;
use crate::subscriber::{SubscriberDescriptor, SubscriberHandle, SubscriberInfo, ThreadMode};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// 订阅：订阅者 + 处理器描述 + 活跃标记
///
/// `active` 在注销时恰好翻转一次；已排队的异步投递在执行前读取它，
/// 从而在注销之后不再调用处理器。
pub struct Subscription {
    subscriber: SubscriberInfo,
    _owner: SubscriberHandle,
    descriptor: SubscriberDescriptor,
    active: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(
        owner: SubscriberHandle,
        subscriber: SubscriberInfo,
        descriptor: SubscriberDescriptor,
    ) -> Self {
        Self {
            subscriber,
            _owner: owner,
            descriptor,
            active: AtomicBool::new(true),
        }
    }

    pub fn subscriber(&self) -> &SubscriberInfo {
        &self.subscriber
    }

    pub fn descriptor(&self) -> &SubscriberDescriptor {
        &self.descriptor
    }

    pub fn event_type(&self) -> EventType {
        self.descriptor.event_type()
    }

    pub fn thread_mode(&self) -> ThreadMode {
        self.descriptor.thread_mode()
    }

    pub fn priority(&self) -> i32 {
        self.descriptor.priority()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }
}

impl PartialEq for Subscription {
    fn eq(&self, other: &Self) -> bool {
        self.subscriber.key() == other.subscriber.key()
            && self.descriptor.same_handler(&other.descriptor)
    }
}

impl Eq for Subscription {}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("subscriber", &self.subscriber.type_name())
            .field("descriptor", &self.descriptor)
            .field("active", &self.is_active())
            .finish()
    }
}
