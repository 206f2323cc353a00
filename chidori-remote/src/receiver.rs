use crate::codec::EventCodecs;
use crate::envelope::RemoteEnvelope;
use crate::error::RemoteResult;
use bon::Builder;
use chidori::EventBus;
use std::sync::Arc;
use tracing::debug;

/// 未指定接收端点时接收信封的端点名
pub const DEFAULT_ENDPOINT: &str = "chidori.server";

/// 入站接收：过滤信封、解码事件并投递到本地总线
#[derive(Builder)]
pub struct RemoteReceiver {
    #[builder(into)]
    package: String,
    #[builder(into, default = DEFAULT_ENDPOINT.to_string())]
    endpoint: String,
    bus: EventBus,
    codecs: Arc<EventCodecs>,
}

impl RemoteReceiver {
    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 信封是否发给本接收方：包名一致（忽略 ASCII 大小写），
    /// 且未指定端点时本方为默认端点，指定端点时本方在列表中
    pub fn accepts(&self, envelope: &RemoteEnvelope) -> bool {
        if !envelope.target.eq_ignore_ascii_case(&self.package) {
            return false;
        }
        if envelope.servers.is_empty() {
            self.endpoint == DEFAULT_ENDPOINT
        } else {
            envelope.servers.iter().any(|s| *s == self.endpoint)
        }
    }

    /// 接收信封；被过滤时返回 `Ok(false)`
    pub fn receive(&self, envelope: RemoteEnvelope) -> RemoteResult<bool> {
        if !self.accepts(&envelope) {
            debug!(
                remote_target = %envelope.target,
                endpoint = %self.endpoint,
                "remote envelope not addressed to this receiver"
            );
            return Ok(false);
        }

        let event = self.codecs.decode(&envelope.event_type, envelope.payload)?;
        self.bus.post_ref(event)?;
        Ok(true)
    }
}
