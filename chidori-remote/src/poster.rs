use crate::codec::EventCodecs;
use crate::envelope::RemoteEnvelope;
use crate::error::RemoteResult;
use crate::transport::Transport;
use chidori::{Event, EventRef};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// 出站投递：编码事件并交给传输层
pub struct RemotePoster {
    transport: Arc<dyn Transport>,
    codecs: Arc<EventCodecs>,
    servers: Mutex<Vec<String>>,
}

impl RemotePoster {
    pub fn new(transport: Arc<dyn Transport>, codecs: Arc<EventCodecs>) -> Self {
        Self {
            transport,
            codecs,
            servers: Mutex::new(Vec::new()),
        }
    }

    /// 指定下一次投递的接收端点；投递后即清空
    pub fn connect<I, S>(&self, servers: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.servers.lock().unwrap_or_else(PoisonError::into_inner) =
            servers.into_iter().map(Into::into).collect();
        self
    }

    pub async fn post_remote<T>(&self, target: &str, event: &T) -> RemoteResult<()>
    where
        T: Event + Serialize,
    {
        let (event_type, payload) = self.codecs.encode(event)?;
        self.send(target, event_type, payload).await
    }

    pub async fn post_remote_ref(&self, target: &str, event: &EventRef) -> RemoteResult<()> {
        let (event_type, payload) = self.codecs.encode_ref(event)?;
        self.send(target, event_type, payload).await
    }

    async fn send(&self, target: &str, event_type: String, payload: Value) -> RemoteResult<()> {
        let servers = std::mem::take(&mut *self.servers.lock().unwrap_or_else(PoisonError::into_inner));
        let envelope = RemoteEnvelope {
            target: target.to_string(),
            servers,
            event_type,
            payload,
        };

        debug!(
            remote_target = %envelope.target,
            event_type = %envelope.event_type,
            servers = ?envelope.servers,
            "posting remote event"
        );
        self.transport.send_to_target(envelope).await
    }
}
