//! 订阅注册表（SubscriptionRegistry）
//!
//! 维护两张目录，且是它们唯一的修改者：
//! - 事件类型 → 按优先级降序排列的订阅列表（写时复制，查询返回稳定快照）；
//! - 订阅者 → 其订阅的事件类型列表（用于注销）。
//!
//! 所有登记/注销/查询都在同一互斥区内完成；遍历快照时无需持锁，
//! 并发注销只会把快照中的订阅标记为非活跃。
//!
use crate::error::{BusError, BusResult};
use crate::event::EventType;
use crate::subscriber::{SubscriberDescriptor, SubscriberHandle, SubscriberInfo, SubscriberKey};
use crate::subscription::Subscription;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// 某一事件类型的订阅快照
pub type Subscriptions = Arc<[Arc<Subscription>]>;

#[derive(Default)]
struct Directories {
    by_event_type: HashMap<EventType, Subscriptions>,
    types_by_subscriber: HashMap<SubscriberKey, Vec<EventType>>,
}

#[derive(Default)]
pub struct SubscriptionRegistry {
    dirs: Mutex<Directories>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记订阅者的全部处理器，返回新建的订阅（按描述顺序）
    ///
    /// 任一描述与已有订阅重复时整体失败，不做部分登记。
    pub fn register(
        &self,
        owner: SubscriberHandle,
        subscriber: SubscriberInfo,
        descriptors: Vec<SubscriberDescriptor>,
    ) -> BusResult<Vec<Arc<Subscription>>> {
        if descriptors.is_empty() {
            return Err(BusError::NoHandlers {
                subscriber: subscriber.type_name(),
            });
        }

        let mut guard = self.lock();
        let dirs = &mut *guard;

        for (i, descriptor) in descriptors.iter().enumerate() {
            let registered = dirs
                .by_event_type
                .get(&descriptor.event_type())
                .is_some_and(|list| {
                    list.iter().any(|s| {
                        s.subscriber().key() == subscriber.key()
                            && s.descriptor().same_handler(descriptor)
                    })
                });
            let repeated = descriptors[..i].iter().any(|d| d.same_handler(descriptor));

            if registered || repeated {
                return Err(BusError::DuplicateSubscription {
                    subscriber: subscriber.type_name(),
                    event_type: descriptor.event_type().name(),
                });
            }
        }

        let mut added = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let event_type = descriptor.event_type();
            let subscription = Arc::new(Subscription::new(owner.clone(), subscriber, descriptor));

            let list = dirs
                .by_event_type
                .entry(event_type)
                .or_insert_with(|| Vec::new().into());
            let next = insert_by_priority(list, subscription.clone());
            *list = next;

            let types = dirs.types_by_subscriber.entry(subscriber.key()).or_default();
            if !types.contains(&event_type) {
                types.push(event_type);
            }

            added.push(subscription);
        }

        Ok(added)
    }

    /// 注销订阅者：移除并停用其全部订阅；未登记过时返回 `false`
    pub fn unregister(&self, key: SubscriberKey) -> bool {
        let mut guard = self.lock();
        let dirs = &mut *guard;

        let Some(types) = dirs.types_by_subscriber.remove(&key) else {
            return false;
        };

        for event_type in types {
            let Some(list) = dirs.by_event_type.get(&event_type) else {
                continue;
            };

            let mut kept = Vec::with_capacity(list.len());
            for subscription in list.iter() {
                if subscription.subscriber().key() == key {
                    subscription.deactivate();
                } else {
                    kept.push(subscription.clone());
                }
            }

            if kept.is_empty() {
                dirs.by_event_type.remove(&event_type);
            } else {
                dirs.by_event_type.insert(event_type, kept.into());
            }
        }

        true
    }

    /// 查询某事件类型的订阅快照（按优先级降序）
    pub fn lookup(&self, event_type: &EventType) -> Option<Subscriptions> {
        self.lock()
            .by_event_type
            .get(event_type)
            .filter(|list| !list.is_empty())
            .cloned()
    }

    pub fn is_registered(&self, key: SubscriberKey) -> bool {
        self.lock().types_by_subscriber.contains_key(&key)
    }

    /// 任一给定类型存在订阅即为真
    pub fn has_subscribers(&self, event_types: &[EventType]) -> bool {
        let dirs = self.lock();
        event_types.iter().any(|ty| {
            dirs.by_event_type
                .get(ty)
                .is_some_and(|list| !list.is_empty())
        })
    }

    /// 订阅者当前订阅的事件类型
    pub fn subscribed_types(&self, key: SubscriberKey) -> Vec<EventType> {
        self.lock()
            .types_by_subscriber
            .get(&key)
            .cloned()
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, Directories> {
        self.dirs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// 降序插入；同优先级的新订阅排在已有订阅之后
fn insert_by_priority(list: &[Arc<Subscription>], subscription: Arc<Subscription>) -> Subscriptions {
    let at = list
        .iter()
        .position(|s| subscription.priority() > s.priority())
        .unwrap_or(list.len());

    let mut next = Vec::with_capacity(list.len() + 1);
    next.extend_from_slice(&list[..at]);
    next.push(subscription);
    next.extend_from_slice(&list[at..]);
    next.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriber::ThreadMode;

    fn owner<S: Send + Sync + 'static>(s: &Arc<S>) -> (SubscriberHandle, SubscriberInfo) {
        let handle: SubscriberHandle = s.clone();
        (handle, SubscriberInfo::of(s))
    }

    fn on_string(priority: i32, key: &'static str) -> SubscriberDescriptor {
        SubscriberDescriptor::on::<String, _, _>(ThreadMode::PostThread, priority, |_: &String| {})
            .named(key)
    }

    fn order(registry: &SubscriptionRegistry) -> Vec<i32> {
        registry
            .lookup(&EventType::of::<String>())
            .map(|list| list.iter().map(|s| s.priority()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn higher_priority_first_and_stable_among_equals() {
        let registry = SubscriptionRegistry::new();
        let a = Arc::new("a");
        let b = Arc::new("b");
        let c = Arc::new("c");

        for (s, p) in [(&a, 5), (&b, 1), (&c, 5)] {
            let (h, info) = owner(s);
            registry.register(h, info, vec![on_string(p, "on")]).unwrap();
        }

        let list = registry.lookup(&EventType::of::<String>()).unwrap();
        let keys: Vec<_> = list.iter().map(|s| s.subscriber().key()).collect();
        assert_eq!(
            keys,
            vec![
                SubscriberInfo::of(&a).key(),
                SubscriberInfo::of(&c).key(),
                SubscriberInfo::of(&b).key(),
            ]
        );
        assert_eq!(order(&registry), vec![5, 5, 1]);
    }

    #[test]
    fn duplicate_handler_is_rejected_without_partial_registration() {
        let registry = SubscriptionRegistry::new();
        let s = Arc::new(());
        let (h, info) = owner(&s);
        registry.register(h.clone(), info, vec![on_string(0, "on")]).unwrap();

        let err = registry
            .register(
                h,
                info,
                vec![
                    SubscriberDescriptor::on::<i32, _, _>(ThreadMode::PostThread, 0, |_: &i32| {})
                        .named("on_i32"),
                    on_string(0, "on"),
                ],
            )
            .unwrap_err();

        assert!(matches!(err, BusError::DuplicateSubscription { .. }));
        assert!(registry.lookup(&EventType::of::<i32>()).is_none());
        assert_eq!(registry.subscribed_types(info.key()), vec![EventType::of::<String>()]);
    }

    #[test]
    fn empty_descriptor_list_is_rejected() {
        let registry = SubscriptionRegistry::new();
        let s = Arc::new(());
        let (h, info) = owner(&s);

        let err = registry.register(h, info, Vec::new()).unwrap_err();
        assert!(matches!(err, BusError::NoHandlers { .. }));
        assert!(!registry.is_registered(info.key()));
    }

    #[test]
    fn unregister_deactivates_and_keeps_snapshots_stable() {
        let registry = SubscriptionRegistry::new();
        let s1 = Arc::new(1_u8);
        let s2 = Arc::new(2_u8);
        let (h1, i1) = owner(&s1);
        let (h2, i2) = owner(&s2);
        let added = registry.register(h1, i1, vec![on_string(0, "on")]).unwrap();
        registry.register(h2, i2, vec![on_string(0, "on")]).unwrap();

        let snapshot = registry.lookup(&EventType::of::<String>()).unwrap();
        assert!(registry.unregister(i1.key()));

        assert_eq!(snapshot.len(), 2);
        assert!(!added[0].is_active());
        assert!(!registry.is_registered(i1.key()));
        assert_eq!(registry.lookup(&EventType::of::<String>()).unwrap().len(), 1);
        assert!(!registry.unregister(i1.key()));
    }

    #[test]
    fn last_unregister_clears_event_type() {
        let registry = SubscriptionRegistry::new();
        let s = Arc::new(());
        let (h, info) = owner(&s);
        registry.register(h, info, vec![on_string(0, "on")]).unwrap();
        assert!(registry.has_subscribers(&[EventType::of::<i32>(), EventType::of::<String>()]));

        registry.unregister(info.key());
        assert!(!registry.has_subscribers(&[EventType::of::<String>()]));
        assert!(registry.lookup(&EventType::of::<String>()).is_none());
    }
}
