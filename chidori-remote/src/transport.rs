use crate::envelope::RemoteEnvelope;
use crate::error::RemoteResult;
use async_trait::async_trait;

/// 远端传输（Transport）
///
/// - 把信封送往 `envelope.target` 所指的接收方；
/// - 只投不等：返回 `Ok` 仅表示已交给传输层，不代表对端已处理；
/// - 框架提供进程内实现 `ChannelTransport`，其余实现（套接字、消息中间件等）由宿主提供。
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_to_target(&self, envelope: RemoteEnvelope) -> RemoteResult<()>;
}
