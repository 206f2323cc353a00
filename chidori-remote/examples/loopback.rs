use chidori::EventBus;
use chidori_macros::{Event, subscriber};
use chidori_remote::{ChannelTransport, EventCodecs, RemotePoster, RemoteReceiver};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Serialize, Deserialize, Event)]
struct Greeting {
    from: String,
    text: String,
}

struct Console;

#[subscriber]
impl Console {
    #[subscribe]
    fn on_greeting(&self, greeting: &Greeting) {
        info!(from = %greeting.from, text = %greeting.text, "greeting received");
    }

    #[subscribe]
    fn on_text(&self, text: &String) {
        info!(%text, "text received");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    let codecs = EventCodecs::with_primitives();
    codecs.register::<Greeting>("greeting")?;
    let codecs = Arc::new(codecs);

    let transport = Arc::new(ChannelTransport::new());

    let bus = EventBus::builder().build();
    let console = Arc::new(Console);
    bus.register(&console)?;

    let handle = transport.attach(
        RemoteReceiver::builder()
            .package("com.example.console")
            .bus(bus)
            .codecs(codecs.clone())
            .build(),
    );

    let poster = RemotePoster::new(transport.clone(), codecs);
    poster
        .post_remote(
            "com.example.console",
            &Greeting {
                from: "loopback".to_string(),
                text: "hello over the wire".to_string(),
            },
        )
        .await?;
    poster.post_remote("Com.Example.Console", &"plain text".to_string()).await?;

    // 发给未挂接的端点，接收方会过滤掉
    poster
        .connect(["audit"])
        .post_remote("com.example.console", &"ignored".to_string())
        .await?;

    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.shutdown();
    handle.join().await;
    Ok(())
}
