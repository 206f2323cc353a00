//! 事件模型（event）
//!
//! 以 `TypeId` 表达事件的运行时类型，并用静态声明补足层级关系：
//! - `EventType`：类型描述，可查询父类型与能力接口；
//! - `EventKind`：为事件或能力类型声明层级；
//! - `Event`：可投递的事件值（对象安全），支持以祖先类型视角借用；
//! - `NoSubscriberEvent` / `SubscriberFailureEvent`：总线合成的通知事件。
//!
mod event_trait;
mod event_type;
mod notification;

pub use event_trait::{Event, EventRef, downcast_event};
pub use event_type::{EventKind, EventType};
pub use notification::{NoSubscriberEvent, SubscriberFailureEvent};

pub(crate) use notification::is_notification;
