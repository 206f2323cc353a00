use chidori::{Event, EventBus, EventBusConfig, EventRef, EventType, ThreadMode, WorkerPool};
use chidori_macros::{Event, capability, subscriber};
use std::sync::{Arc, Mutex};

#[capability]
trait Flagged {}

#[derive(Debug, Clone, Event)]
struct Base {
    id: u32,
}

#[derive(Debug, Clone, Event)]
#[event(implements(Flagged))]
struct Derived {
    #[event(parent)]
    base: Base,
    note: &'static str,
}

fn bus(hierarchy: bool) -> EventBus {
    EventBus::builder()
        .config(
            EventBusConfig::builder()
                .hierarchy_dispatch(hierarchy)
                .log_no_subscriber(false)
                .log_failures(false)
                .build(),
        )
        .worker_pool(WorkerPool::Threads)
        .build()
}

#[derive(Default)]
struct Observer {
    seen: Mutex<Vec<String>>,
}

#[subscriber]
impl Observer {
    #[subscribe(priority = 1)]
    fn on_derived(&self, event: &Derived) {
        self.push(format!("derived:{}", event.note));
    }

    #[subscribe]
    fn on_base(&self, event: &Base) {
        self.push(format!("base:{}", event.id));
    }

    #[subscribe(on = dyn Flagged)]
    fn on_flagged(&self, event: &dyn Event) {
        self.push(format!("flagged:{}", event.event_type()));
    }
}

impl Observer {
    fn push(&self, entry: String) {
        self.seen.lock().unwrap().push(entry);
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.seen.lock().unwrap())
    }
}

fn derived(note: &'static str) -> Derived {
    Derived {
        base: Base { id: 7 },
        note,
    }
}

#[test]
fn hierarchy_on_reaches_ancestor_and_capability_subscribers() {
    let bus = bus(true);
    let observer = Arc::new(Observer::default());
    bus.register(&observer).unwrap();

    bus.post(derived("x")).unwrap();

    let seen = observer.take();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0], "derived:x");
    assert!(seen.contains(&"base:7".to_string()));
    assert!(seen.contains(&format!("flagged:{}", EventType::of::<Derived>())));
    assert!(bus.has_subscriber_for_event(EventType::of::<Derived>()));
}

#[test]
fn hierarchy_off_reaches_exact_type_only() {
    let bus = bus(false);
    let observer = Arc::new(Observer::default());
    bus.register(&observer).unwrap();

    bus.post(derived("x")).unwrap();
    assert_eq!(observer.take(), vec!["derived:x"]);

    bus.post(Base { id: 1 }).unwrap();
    assert_eq!(observer.take(), vec!["base:1"]);
}

struct Canceller {
    bus: EventBus,
    seen: Mutex<Vec<String>>,
}

#[subscriber]
impl Canceller {
    #[subscribe(priority = 10)]
    fn first(&self, event: &Base) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push("first".into());
        self.bus.cancel_delivery(event)?;
        Ok(())
    }

    #[subscribe(priority = 1)]
    fn second(&self, _event: &Base) {
        self.seen.lock().unwrap().push("second".into());
    }

    #[subscribe]
    fn exact(&self, _event: &Derived) {
        self.seen.lock().unwrap().push("exact".into());
    }
}

#[test]
fn cancel_through_ancestor_view_stops_only_that_type() {
    let bus = bus(true);
    let canceller = Arc::new(Canceller {
        bus: bus.clone(),
        seen: Mutex::new(Vec::new()),
    });
    bus.register(&canceller).unwrap();

    bus.post(derived("y")).unwrap();

    // Derived 先于 Base 解析：exact 已投递；Base 上的 second 被取消
    assert_eq!(*canceller.seen.lock().unwrap(), vec!["exact", "first"]);
}

#[test]
fn sticky_event_is_replayed_on_registration() {
    let bus = bus(false);
    bus.post_sticky(Base { id: 1 }).unwrap();
    bus.post_sticky(Base { id: 2 }).unwrap();

    let observer = Arc::new(Observer::default());
    bus.register_sticky(&observer).unwrap();
    assert_eq!(observer.take(), vec!["base:2"]);

    let late = Arc::new(Observer::default());
    bus.register(&late).unwrap();
    assert!(late.take().is_empty());

    assert_eq!(bus.sticky_event::<Base>().map(|b| b.id), Some(2));
}

#[test]
fn sticky_replay_honours_hierarchy() {
    let bus = bus(true);
    bus.post_sticky(derived("cached")).unwrap();

    let observer = Arc::new(Observer::default());
    bus.register_sticky(&observer).unwrap();

    let mut seen = observer.take();
    seen.sort();
    assert_eq!(
        seen,
        vec![
            "base:7".to_string(),
            "derived:cached".to_string(),
            format!("flagged:{}", EventType::of::<Derived>()),
        ]
    );
}

#[test]
fn sticky_removal() {
    let bus = bus(true);
    bus.post_sticky(7_i64).unwrap();
    bus.post_sticky("keep".to_string()).unwrap();

    let removed = bus.remove_sticky_event::<i64>();
    assert_eq!(removed.as_deref(), Some(&7));
    assert!(bus.sticky_event::<i64>().is_none());

    let other: EventRef = Arc::new("keep".to_string());
    assert!(!bus.remove_sticky(&other));
    assert!(bus.sticky_event::<String>().is_some());

    let cached: EventRef = Arc::new(3_u8 as u32);
    bus.post_sticky_ref(cached.clone()).unwrap();
    assert!(bus.remove_sticky(&cached));

    bus.remove_all_sticky_events();
    assert!(bus.sticky_event::<String>().is_none());
}

#[test]
fn sticky_delivery_respects_thread_mode() {
    let bus = bus(false);
    bus.post_sticky(5_u64).unwrap();

    let owner = Arc::new(());
    let (tx, rx) = std::sync::mpsc::channel();
    let tx = Mutex::new(tx);
    bus.register_with(
        &owner,
        vec![chidori::SubscriberDescriptor::on::<u64, _, _>(
            ThreadMode::Async,
            0,
            move |n: &u64| {
                let _ = tx.lock().unwrap().send(*n);
            },
        )],
        true,
    )
    .unwrap();

    assert_eq!(
        rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap(),
        5
    );
}
