//! 事件总线统一错误定义
//!
//! 聚焦订阅登记、投递取消、处理器失败与全局实例安装等最小必要集合；
//! 处理器自身的业务错误以 `anyhow::Error` 承载，仅在“重新抛出”策略下包装为 `BusError`。
//!
use thiserror::Error;

/// 统一错误类型（事件总线最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BusError {
    // --- 订阅登记 ---
    #[error("subscriber {subscriber} already registered to event {event_type}")]
    DuplicateSubscription {
        subscriber: &'static str,
        event_type: &'static str,
    },
    #[error("subscriber {subscriber} has no event handlers")]
    NoHandlers { subscriber: &'static str },

    // --- 投递 ---
    #[error("illegal cancellation: {reason}")]
    IllegalCancellation { reason: &'static str },
    #[error("invoking subscriber failed: event={event_type}, subscriber={subscriber}")]
    HandlerInvocation {
        event_type: &'static str,
        subscriber: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("internal posting state error: {reason}")]
    InvalidPostingState { reason: &'static str },

    // --- 运行环境 ---
    #[error("default event bus already installed")]
    AlreadyInstalled,
    #[error("failed to spawn worker thread: {reason}")]
    WorkerSpawn { reason: String },
    #[error("main thread looper has stopped")]
    LooperStopped,
}

/// 统一 Result 类型别名
pub type BusResult<T> = Result<T, BusError>;

impl From<std::io::Error> for BusError {
    fn from(err: std::io::Error) -> Self {
        BusError::WorkerSpawn {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn handler_invocation_keeps_cause_as_source() {
        let err = BusError::HandlerInvocation {
            event_type: "alloc::string::String",
            subscriber: "demo::Screen",
            source: anyhow::anyhow!("boom"),
        };

        assert_eq!(
            err.to_string(),
            "invoking subscriber failed: event=alloc::string::String, subscriber=demo::Screen"
        );
        assert_eq!(err.source().map(|s| s.to_string()), Some("boom".to_string()));
    }
}
