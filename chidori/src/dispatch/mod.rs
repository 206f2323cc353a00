//! 线程模式路由与异步通道（dispatch）
//!
//! - `router`：按 `(线程模式, 调用方是否在主线程)` 决定同步执行或交给哪条通道；
//! - `MainThreadPoster`：主线程通道，按入队顺序执行，单次调度受时间预算约束；
//! - `BackgroundPoster`：串行后台通道，同一时刻至多一个消费者；
//! - `AsyncPoster`：并发通道，每次投递一个线程池任务，无顺序保证；
//! - `PendingPostPool`：跨上下文信封的有界复用池。
//!
//! 所有通道在执行前都遵循同一顺序：取出信封字段 → 归还信封 → 检查订阅是否仍活跃 → 调用。
//!
mod async_poster;
mod background_poster;
mod main_poster;
mod pending_post;
mod router;
mod worker_pool;

pub use pending_post::{MAX_POOLED, PendingPost, PendingPostPool, PendingPostQueue};
pub use router::{Route, route};
pub use worker_pool::{Job, WorkerPool};

pub(crate) use async_poster::AsyncPoster;
pub(crate) use background_poster::BackgroundPoster;
pub(crate) use main_poster::MainThreadPoster;

use crate::bus::BusInner;
use std::sync::Arc;

/// 异步通道：接收一个待投递信封，稍后在自身的执行上下文中调用处理器
pub(crate) trait Poster: Send + Sync {
    fn enqueue(&self, bus: &Arc<BusInner>, post: Box<PendingPost>);
}
