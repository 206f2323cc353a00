use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

/// 事件类型的静态层级声明
///
/// - `parent`：单一父类型（继承链），默认无；
/// - `capabilities`：直接声明的能力接口，能力自身也可以再声明能力。
///
/// 既可为具体事件实现，也可为能力类型（如 `dyn Flagged`）实现。
pub trait EventKind: 'static {
    fn parent() -> Option<EventType> {
        None
    }

    fn capabilities() -> Vec<EventType> {
        Vec::new()
    }
}

/// 运行时事件类型描述：以 `TypeId` 判等，附带层级查询入口
#[derive(Clone, Copy)]
pub struct EventType {
    id: TypeId,
    name: &'static str,
    parent: fn() -> Option<EventType>,
    capabilities: fn() -> Vec<EventType>,
}

impl EventType {
    pub fn of<T: ?Sized + EventKind>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            parent: T::parent,
            capabilities: T::capabilities,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parent(&self) -> Option<EventType> {
        (self.parent)()
    }

    pub fn capabilities(&self) -> Vec<EventType> {
        (self.capabilities)()
    }

    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for EventType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventType {}

impl Hash for EventType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventType").field(&self.name).finish()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
