use chidori::BusError;
use thiserror::Error;

/// 跨进程边界的错误
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("bus: {0}")]
    Bus(#[from] BusError),

    #[error("serde: {0}")]
    Serde(#[from] serde_json::Error),

    // --- 编解码 ---
    #[error("unknown remote event type: {name}")]
    UnknownEventType { name: String },

    #[error("codec already registered: {name}")]
    CodecAlreadyRegistered { name: String },

    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    // --- 传输 ---
    #[error("transport to {target} failed: {reason}")]
    Transport { target: String, reason: String },
}

pub type RemoteResult<T> = Result<T, RemoteError>;
