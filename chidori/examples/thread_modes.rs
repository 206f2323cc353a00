use chidori::{EventBus, LooperThread, Subscriber, SubscriberFailureEvent, WorkerPool};
use chidori_macros::{Event, subscriber};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Event)]
struct Download {
    url: String,
}

#[derive(Debug, Clone, Event)]
struct Progress {
    percent: u8,
}

struct Screen {
    bus: EventBus,
}

#[subscriber]
impl Screen {
    #[subscribe(thread_mode = MainThread)]
    fn render(&self, progress: &Progress) {
        info!(percent = progress.percent, thread = ?std::thread::current().name(), "render");
    }

    #[subscribe(thread_mode = BackgroundThread)]
    fn download(&self, job: &Download) -> anyhow::Result<()> {
        info!(url = %job.url, thread = ?std::thread::current().name(), "downloading");
        for percent in [25, 50, 100] {
            self.bus.post(Progress { percent })?;
        }
        if job.url.ends_with(".bad") {
            anyhow::bail!("checksum mismatch for {}", job.url);
        }
        Ok(())
    }

    #[subscribe(thread_mode = Async, priority = -1)]
    fn audit(&self, job: &Download) {
        info!(url = %job.url, thread = ?std::thread::current().name(), "audited");
    }

    #[subscribe]
    fn on_failure(&self, failure: &SubscriberFailureEvent) {
        info!(cause = %failure.cause, subscriber = failure.failing_subscriber.type_name(), "failure observed");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let ui = Arc::new(LooperThread::spawn("ui")?);
    let bus = EventBus::builder()
        .main_thread(ui.clone())
        .worker_pool(WorkerPool::current())
        .build();

    let screen = Arc::new(Screen { bus: bus.clone() });
    info!(handlers = screen.clone().handlers().len(), "registering screen");
    bus.register(&screen)?;

    // 从主线程投递：BackgroundThread 处理器被交给后台通道
    let b = bus.clone();
    ui.run_and_wait(move || -> chidori::BusResult<()> {
        b.post(Download { url: "https://example.org/a.zip".into() })?;
        b.post(Download { url: "https://example.org/b.bad".into() })
    })??;

    tokio::time::sleep(Duration::from_millis(200)).await;
    ui.flush()?;

    bus.unregister(&screen);
    Ok(())
}
