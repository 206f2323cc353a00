use super::{PendingPost, PendingPostQueue, Poster};
use crate::bus::BusInner;
use crate::main_thread::MainThreadSupport;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::error;

#[derive(Default)]
struct Lane {
    queue: PendingPostQueue,
    active: bool,
}

/// 主线程通道
///
/// 队列非空时保持恰好一个已调度的排空任务；单次排空超出时间预算后
/// 让出主线程并重新调度自身，剩余信封留待下一轮，不丢弃。
pub(crate) struct MainThreadPoster {
    support: Arc<dyn MainThreadSupport>,
    budget: Duration,
    lane: Mutex<Lane>,
}

impl MainThreadPoster {
    pub(crate) fn new(support: Arc<dyn MainThreadSupport>, budget: Duration) -> Self {
        Self {
            support,
            budget,
            lane: Mutex::new(Lane::default()),
        }
    }

    // 调度失败时复位 active，信封留在队列中，下一次入队会重新调度
    fn schedule(&self, bus: Arc<BusInner>) {
        let scheduled = self.support.schedule(Box::new(move || {
            if let Some(poster) = bus.main_poster() {
                poster.drain(&bus);
            }
        }));

        if let Err(e) = scheduled {
            let pending = {
                let mut lane = self.lock();
                lane.active = false;
                lane.queue.len()
            };
            error!(error = %e, pending, "failed to schedule main thread lane");
        }
    }

    fn drain(&self, bus: &Arc<BusInner>) {
        let started = Instant::now();
        loop {
            let post = {
                let mut lane = self.lock();
                match lane.queue.poll() {
                    Some(post) => post,
                    None => {
                        lane.active = false;
                        return;
                    }
                }
            };

            bus.invoke_pending(post);

            if started.elapsed() >= self.budget {
                self.schedule(bus.clone());
                return;
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Lane> {
        self.lane.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Poster for MainThreadPoster {
    fn enqueue(&self, bus: &Arc<BusInner>, post: Box<PendingPost>) {
        let schedule = {
            let mut lane = self.lock();
            lane.queue.enqueue(post);
            !std::mem::replace(&mut lane.active, true)
        };

        if schedule {
            self.schedule(bus.clone());
        }
    }
}
