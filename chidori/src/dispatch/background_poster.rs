use super::{PendingPost, PendingPostQueue, Poster};
use crate::bus::BusInner;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::error;

#[derive(Default)]
struct Lane {
    queue: PendingPostQueue,
    running: bool,
}

/// 串行后台通道：同一时刻至多一个消费者在线程池上按入队顺序排空队列
#[derive(Default)]
pub(crate) struct BackgroundPoster {
    lane: Mutex<Lane>,
}

impl BackgroundPoster {
    fn drain(&self, bus: &Arc<BusInner>) {
        loop {
            let post = {
                let mut lane = self.lock();
                match lane.queue.poll() {
                    Some(post) => post,
                    None => {
                        lane.running = false;
                        return;
                    }
                }
            };
            bus.invoke_pending(post);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Lane> {
        self.lane.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Poster for BackgroundPoster {
    fn enqueue(&self, bus: &Arc<BusInner>, post: Box<PendingPost>) {
        let start = {
            let mut lane = self.lock();
            lane.queue.enqueue(post);
            !std::mem::replace(&mut lane.running, true)
        };
        if !start {
            return;
        }

        let mut drainer = Drainer(Some(bus.clone()));
        if let Err(e) = bus.worker_pool().execute(Box::new(move || drainer.run())) {
            error!(error = %e, "failed to start background lane");
        }
    }
}

/// 交给线程池的消费者；未运行即被丢弃时复位 running，下一次入队会重试
struct Drainer(Option<Arc<BusInner>>);

impl Drainer {
    fn run(&mut self) {
        if let Some(bus) = self.0.take() {
            bus.background_poster().drain(&bus);
        }
    }
}

impl Drop for Drainer {
    fn drop(&mut self) {
        if let Some(bus) = self.0.take() {
            bus.background_poster().lock().running = false;
        }
    }
}
