//! 事件类型解析（EventTypeResolver）
//!
//! 计算某具体事件类型可匹配的全部类型：自身 → 其能力接口（深度优先、每个只访问一次）
//! → 父类型，沿父链重复直至没有父类型。结果按具体类型缓存，缓存只增不减。
//!
use crate::event::EventType;
use dashmap::DashMap;
use std::sync::{Arc, LazyLock};

static GLOBAL: LazyLock<EventTypeResolver> = LazyLock::new(EventTypeResolver::new);

#[derive(Default)]
pub struct EventTypeResolver {
    cache: DashMap<EventType, Arc<[EventType]>>,
}

impl EventTypeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 进程级共享实例
    pub fn global() -> &'static EventTypeResolver {
        &GLOBAL
    }

    pub fn resolve(&self, concrete: EventType) -> Arc<[EventType]> {
        if let Some(hit) = self.cache.get(&concrete) {
            return hit.value().clone();
        }

        let mut types = Vec::new();
        let mut current = Some(concrete);
        while let Some(ty) = current {
            // 父链成环时终止
            if types.contains(&ty) {
                break;
            }
            types.push(ty);
            add_capabilities(&mut types, ty.capabilities());
            current = ty.parent();
        }

        self.cache
            .entry(concrete)
            .or_insert_with(|| types.into())
            .value()
            .clone()
    }

    /// `target` 是否可由 `candidate` 赋值（`candidate` 是其自身或子类型/实现者）
    pub fn is_assignable(&self, target: &EventType, candidate: EventType) -> bool {
        self.resolve(candidate).contains(target)
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

fn add_capabilities(types: &mut Vec<EventType>, capabilities: Vec<EventType>) {
    for capability in capabilities {
        if !types.contains(&capability) {
            types.push(capability);
            add_capabilities(types, capability.capabilities());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    trait Marker {}
    trait Flagged {}
    trait Loud {}

    struct Base;
    struct Middle;
    struct Leaf;

    impl EventKind for dyn Marker {}

    impl EventKind for dyn Flagged {
        fn capabilities() -> Vec<EventType> {
            vec![EventType::of::<dyn Marker>()]
        }
    }

    impl EventKind for dyn Loud {
        fn capabilities() -> Vec<EventType> {
            vec![EventType::of::<dyn Marker>()]
        }
    }

    impl EventKind for Base {
        fn capabilities() -> Vec<EventType> {
            vec![EventType::of::<dyn Loud>()]
        }
    }

    impl EventKind for Middle {
        fn parent() -> Option<EventType> {
            Some(EventType::of::<Base>())
        }
    }

    impl EventKind for Leaf {
        fn parent() -> Option<EventType> {
            Some(EventType::of::<Middle>())
        }

        fn capabilities() -> Vec<EventType> {
            vec![EventType::of::<dyn Flagged>()]
        }
    }

    #[test]
    fn resolves_self_capabilities_then_parents_depth_first() {
        let resolver = EventTypeResolver::new();
        let names: Vec<_> = resolver
            .resolve(EventType::of::<Leaf>())
            .iter()
            .copied()
            .collect();

        assert_eq!(
            names,
            vec![
                EventType::of::<Leaf>(),
                EventType::of::<dyn Flagged>(),
                EventType::of::<dyn Marker>(),
                EventType::of::<Middle>(),
                EventType::of::<Base>(),
                EventType::of::<dyn Loud>(),
            ]
        );
    }

    #[test]
    fn caches_by_concrete_type() {
        let resolver = EventTypeResolver::new();
        let first = resolver.resolve(EventType::of::<Middle>());
        let second = resolver.resolve(EventType::of::<Middle>());

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(resolver.cached(), 1);
    }

    #[test]
    fn assignability_follows_hierarchy() {
        let resolver = EventTypeResolver::new();

        assert!(resolver.is_assignable(&EventType::of::<Base>(), EventType::of::<Leaf>()));
        assert!(resolver.is_assignable(&EventType::of::<dyn Marker>(), EventType::of::<Base>()));
        assert!(!resolver.is_assignable(&EventType::of::<Leaf>(), EventType::of::<Base>()));
    }
}
