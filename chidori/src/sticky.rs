//! 粘性事件缓存（StickyEventStore）
//!
//! 事件类型 → 最近一次粘性投递的事件实例；每类型至多一条，新值覆盖旧值。
//! 所有操作在同一互斥区内完成，与注册表的锁相互独立。
//!
use crate::event::{EventRef, EventType};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
pub struct StickyEventStore {
    entries: Mutex<HashMap<EventType, EventRef>>,
}

impl StickyEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以事件的具体类型为键写入，返回被覆盖的旧值
    pub fn put(&self, event: EventRef) -> Option<EventRef> {
        let ty = event.event_type();
        self.lock().insert(ty, event)
    }

    pub fn get(&self, event_type: &EventType) -> Option<EventRef> {
        self.lock().get(event_type).cloned()
    }

    pub fn remove(&self, event_type: &EventType) -> Option<EventRef> {
        self.lock().remove(event_type)
    }

    /// 仅当缓存的正是这一实例（引用相等）时移除
    pub fn remove_if_equal(&self, event: &EventRef) -> bool {
        let mut entries = self.lock();
        let ty = event.event_type();
        match entries.get(&ty) {
            Some(cached) if Arc::ptr_eq(cached, event) => {
                entries.remove(&ty);
                true
            }
            _ => false,
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// 当前全部缓存的快照
    pub fn entries(&self) -> Vec<(EventType, EventRef)> {
        self.lock()
            .iter()
            .map(|(ty, event)| (*ty, event.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<EventType, EventRef>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
