use chidori::{Event, EventKind, EventRef, EventType};
use chidori_macros::{Event, capability};
use std::sync::Arc;

#[capability]
trait Auditable {}

#[capability(extends(Auditable))]
trait Flagged {}

#[derive(Debug, Clone, Event)]
struct Opened {
    account: String,
}

#[derive(Debug, Clone, Event)]
#[event(implements(Flagged))]
struct Frozen {
    #[event(parent)]
    base: Opened,
    reason: String,
}

#[derive(Debug, Event)]
struct Wrapped(u8, #[event(parent)] Frozen);

#[derive(Debug, Event)]
#[event(implements(Auditable))]
enum Command {
    Start,
    Stop { code: i32 },
}

fn main() {
    assert_eq!(Frozen::parent(), Some(EventType::of::<Opened>()));
    assert_eq!(Frozen::capabilities(), vec![EventType::of::<dyn Flagged>()]);
    assert_eq!(
        <dyn Flagged as EventKind>::capabilities(),
        vec![EventType::of::<dyn Auditable>()]
    );

    let frozen = Frozen {
        base: Opened { account: "acc-1".into() },
        reason: "audit".into(),
    };
    let event: EventRef = Arc::new(Wrapped(1, frozen));
    assert_eq!(event.event_type(), EventType::of::<Wrapped>());
    assert_eq!(event.downcast_ref::<Opened>().unwrap().account, "acc-1");
    assert_eq!(event.downcast_ref::<Frozen>().unwrap().reason, "audit");

    let command: EventRef = Arc::new(Command::Stop { code: 2 });
    assert!(command.is::<Command>());
    let _ = Command::Start.event_type();
}
