use super::{PendingPost, Poster};
use crate::bus::BusInner;
use std::sync::Arc;
use tracing::error;

/// 并发通道：每个信封一个线程池任务
#[derive(Default)]
pub(crate) struct AsyncPoster;

impl Poster for AsyncPoster {
    fn enqueue(&self, bus: &Arc<BusInner>, post: Box<PendingPost>) {
        let worker = bus.clone();
        let spawned = bus
            .worker_pool()
            .execute(Box::new(move || worker.invoke_pending(post)));

        if let Err(e) = spawned {
            error!(error = %e, "failed to start async delivery");
        }
    }
}
