//! 进程内传输（ChannelTransport）
//!
//! 以包名（小写）为路由键，把信封分发给 `attach` 的所有接收方。
//! 每个接收方独占一个后台任务；`ReceiverHandle` 负责关闭与等待。
//!
use crate::envelope::RemoteEnvelope;
use crate::error::{RemoteError, RemoteResult};
use crate::receiver::RemoteReceiver;
use crate::transport::Transport;
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Default)]
pub struct ChannelTransport {
    routes: DashMap<String, Vec<mpsc::UnboundedSender<RemoteEnvelope>>>,
}

impl ChannelTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 挂接接收方；需在 tokio 运行时内调用
    pub fn attach(&self, receiver: RemoteReceiver) -> ReceiverHandle {
        let (tx, mut rx) = mpsc::unbounded_channel::<RemoteEnvelope>();
        self.routes
            .entry(receiver.package().to_ascii_lowercase())
            .or_default()
            .push(tx);

        let token = CancellationToken::new();
        let child = token.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = child.cancelled() => {
                        break;
                    }
                    maybe_envelope = rx.recv() => {
                        let Some(envelope) = maybe_envelope else { break };
                        if let Err(err) = receiver.receive(envelope) {
                            warn!(
                                package = receiver.package(),
                                endpoint = receiver.endpoint(),
                                error = %err,
                                "remote receive failed"
                            );
                        }
                    }
                }
            }
            debug!(package = receiver.package(), "remote receiver stopped");
        });

        ReceiverHandle { token, task: Some(task) }
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send_to_target(&self, envelope: RemoteEnvelope) -> RemoteResult<()> {
        let key = envelope.target.to_ascii_lowercase();
        let mut delivered = false;

        if let Some(mut senders) = self.routes.get_mut(&key) {
            senders.retain(|tx| !tx.is_closed());
            for tx in senders.iter() {
                delivered |= tx.send(envelope.clone()).is_ok();
            }
        }

        if delivered {
            Ok(())
        } else {
            Err(RemoteError::Transport {
                target: envelope.target,
                reason: "no receiver attached".to_string(),
            })
        }
    }
}

/// 接收任务句柄：用于关闭与等待任务结束
pub struct ReceiverHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ReceiverHandle {
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ReceiverHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
