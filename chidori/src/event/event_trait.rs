use super::{EventKind, EventType};
use crate::error::{BusError, BusResult};
use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

/// 可投递的事件值
///
/// 事件的具体运行时类型驱动分发；层级（父类型/能力）由 `EventKind` 声明，
/// 通常通过 `#[derive(Event)]` 生成实现。
pub trait Event: Any + Send + Sync + fmt::Debug + 'static {
    /// 具体运行时类型
    fn event_type(&self) -> EventType;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// 以自身或父链上某一祖先类型的视角借用事件
    fn ancestor(&self, id: TypeId) -> Option<&dyn Any> {
        let this = self.as_any();
        (this.type_id() == id).then_some(this)
    }
}

/// 在队列、延迟投递与粘性缓存之间共享的事件引用
pub type EventRef = Arc<dyn Event>;

impl dyn Event {
    /// 借用为 `T`（自身类型或父链上的祖先类型）
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.ancestor(TypeId::of::<T>())
            .and_then(|any| any.downcast_ref::<T>())
    }

    pub fn is<T: Any>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub(crate) fn view<T: Any>(&self) -> BusResult<&T> {
        self.downcast_ref::<T>().ok_or_else(|| BusError::TypeMismatch {
            expected: type_name::<T>(),
            found: self.event_type().name(),
        })
    }
}

/// 将共享事件还原为具体类型的 `Arc`（仅匹配具体类型，不做祖先视角）
pub fn downcast_event<T: Event>(event: EventRef) -> Option<Arc<T>> {
    event.into_any().downcast::<T>().ok()
}

macro_rules! plain_event {
    ($($ty:ty),* $(,)?) => {
        $(
            impl EventKind for $ty {}

            impl Event for $ty {
                fn event_type(&self) -> EventType {
                    EventType::of::<$ty>()
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }

                fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
                    self
                }
            }
        )*
    };
}

// 原生载荷：与远端通道支持的基础类型保持一致
plain_event!(String, &'static str, bool, char, i32, i64, u32, u64, f32, f64);
