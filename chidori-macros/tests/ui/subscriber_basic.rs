use chidori::{Event, EventBus, Subscriber, ThreadMode, WorkerPool};
use chidori_macros::{Event, capability, subscriber};
use std::sync::{Arc, Mutex};

#[capability]
trait Flagged {}

#[derive(Debug, Event)]
#[event(implements(Flagged))]
struct Alarm {
    level: u8,
}

#[derive(Default)]
struct Panel {
    seen: Mutex<Vec<String>>,
}

#[subscriber]
impl Panel {
    #[subscribe(thread_mode = PostThread, priority = 5)]
    fn on_alarm(&self, alarm: &Alarm) {
        self.seen.lock().unwrap().push(format!("alarm:{}", alarm.level));
    }

    #[subscribe(on = dyn Flagged, priority = -1)]
    fn on_flagged(&self, event: &dyn Event) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push(format!("flagged:{}", event.event_type()));
        Ok(())
    }

    #[subscribe]
    fn on_text(&self, text: &String) {
        self.seen.lock().unwrap().push(text.clone());
    }

    fn helper(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

fn main() {
    let panel = Arc::new(Panel::default());
    let handlers = panel.clone().handlers();
    assert_eq!(handlers.len(), 3);
    assert_eq!(handlers[0].priority(), 5);
    assert_eq!(handlers[1].thread_mode(), ThreadMode::PostThread);
    assert!(handlers[0].handler_key().ends_with("Panel::on_alarm"));

    let bus = EventBus::builder().worker_pool(WorkerPool::Threads).build();
    bus.register(&panel).unwrap();
    bus.post(Alarm { level: 3 }).unwrap();
    bus.post("hi".to_string()).unwrap();

    assert_eq!(panel.helper(), 3);
    assert!(bus.register(&panel).is_err());
}
