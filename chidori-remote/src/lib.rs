//! 跨进程事件投递（chidori-remote）
//!
//! 把本地事件编码为 JSON 信封，经 `Transport` 送往另一进程的总线：
//! - 发送端：`RemotePoster::post_remote(target, &event)`，可先 `connect` 指定接收端点；
//! - 接收端：`RemoteReceiver` 按包名与端点过滤信封，解码后投递到本地 `EventBus`；
//! - 两端通过 `EventCodecs` 以相同的事件名登记类型。
//!
//! `ChannelTransport` 是进程内实现，便于测试与演示。
//!
pub mod channel;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod poster;
pub mod receiver;
pub mod transport;

pub use channel::{ChannelTransport, ReceiverHandle};
pub use codec::EventCodecs;
pub use envelope::RemoteEnvelope;
pub use error::{RemoteError, RemoteResult};
pub use poster::RemotePoster;
pub use receiver::{DEFAULT_ENDPOINT, RemoteReceiver};
pub use transport::Transport;
