use crate::event::EventRef;
use crate::subscription::Subscription;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// 空闲池上限
pub const MAX_POOLED: usize = 1000;

/// 跨执行上下文投递的信封：`{事件, 订阅}`
#[derive(Default)]
pub struct PendingPost {
    event: Option<EventRef>,
    subscription: Option<Arc<Subscription>>,
}

/// 有界空闲表：复用信封以避免热路径上的分配
///
/// 回收前先把字段取出交给调用方，槽位里不残留任何引用。
#[derive(Default)]
pub struct PendingPostPool {
    free: Mutex<Vec<Box<PendingPost>>>,
}

impl PendingPostPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn obtain(&self, event: EventRef, subscription: Arc<Subscription>) -> Box<PendingPost> {
        let recycled = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();

        let mut post = recycled.unwrap_or_default();
        post.event = Some(event);
        post.subscription = Some(subscription);
        post
    }

    /// 取出信封字段并归还槽位；信封为空时返回 `None`
    pub fn release(&self, mut post: Box<PendingPost>) -> Option<(EventRef, Arc<Subscription>)> {
        let event = post.event.take();
        let subscription = post.subscription.take();

        {
            let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
            if free.len() < MAX_POOLED {
                free.push(post);
            }
        }

        event.zip(subscription)
    }

    /// 池中空闲信封数量
    pub fn idle(&self) -> usize {
        self.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// 先进先出的信封队列；由各通道在自身锁内使用
#[derive(Default)]
pub struct PendingPostQueue {
    posts: VecDeque<Box<PendingPost>>,
}

impl PendingPostQueue {
    pub fn enqueue(&mut self, post: Box<PendingPost>) {
        self.posts.push_back(post);
    }

    pub fn poll(&mut self) -> Option<Box<PendingPost>> {
        self.posts.pop_front()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}
