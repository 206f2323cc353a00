//! 投递线程状态（PostingState）
//!
//! 每个线程、每条总线各一份，首次投递时惰性创建：待排空的事件队列、是否正在排空、
//! 本轮排空是否在主线程、当前正在同步投递的事件与订阅、取消标记。
//! 仅由所属线程访问，无需加锁。
//!
//! 各线程的表以总线的存活令牌（弱引用）登记；总线释放后，
//! 该线程下一次为新总线建状态时清理失效条目。
//!
use crate::error::{BusError, BusResult};
use crate::event::EventRef;
use crate::subscription::Subscription;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::{Arc, Weak};

struct Slot {
    alive: Weak<()>,
    state: Rc<PostingState>,
}

thread_local! {
    static POSTING_STATES: RefCell<HashMap<u64, Slot>> = RefCell::new(HashMap::new());
}

/// 总线在各线程状态表中的键；随总线一同释放
pub(crate) struct PostingKey {
    id: u64,
    alive: Arc<()>,
}

impl PostingKey {
    pub(crate) fn new(id: u64) -> Self {
        Self {
            id,
            alive: Arc::new(()),
        }
    }
}

/// 当前线程在指定总线上的投递状态
pub(crate) fn current(key: &PostingKey) -> Rc<PostingState> {
    POSTING_STATES.with(|states| {
        let mut states = states.borrow_mut();
        if let Some(slot) = states.get(&key.id) {
            return slot.state.clone();
        }

        states.retain(|_, slot| slot.alive.strong_count() > 0);
        let state = Rc::new(PostingState::default());
        states.insert(
            key.id,
            Slot {
                alive: Arc::downgrade(&key.alive),
                state: state.clone(),
            },
        );
        state
    })
}

#[cfg(test)]
fn tracked() -> usize {
    POSTING_STATES.with(|states| states.borrow().len())
}

/// 丢弃当前线程上已关闭总线的状态
pub(crate) fn forget(bus_id: u64) {
    let _ = POSTING_STATES.try_with(|states| states.borrow_mut().remove(&bus_id));
}

#[derive(Default)]
pub(crate) struct PostingState {
    queue: RefCell<VecDeque<EventRef>>,
    is_posting: Cell<bool>,
    is_main_thread: Cell<bool>,
    subscription: RefCell<Option<Arc<Subscription>>>,
    event: RefCell<Option<EventRef>>,
    canceled: Cell<bool>,
}

impl PostingState {
    pub(crate) fn enqueue(&self, event: EventRef) {
        self.queue.borrow_mut().push_back(event);
    }

    pub(crate) fn dequeue(&self) -> Option<EventRef> {
        self.queue.borrow_mut().pop_front()
    }

    /// 清空队列，返回被丢弃的事件数
    pub(crate) fn clear_queue(&self) -> usize {
        let mut queue = self.queue.borrow_mut();
        let dropped = queue.len();
        queue.clear();
        dropped
    }

    pub(crate) fn is_posting(&self) -> bool {
        self.is_posting.get()
    }

    pub(crate) fn is_main_thread(&self) -> bool {
        self.is_main_thread.get()
    }

    /// Idle → Posting；守卫释放时回到 Idle（含处理器 panic 穿透的情形）
    pub(crate) fn begin(&self, on_main_thread: bool) -> BusResult<PostingGuard<'_>> {
        if self.canceled.get() {
            return Err(BusError::InvalidPostingState {
                reason: "cancel flag was not reset",
            });
        }
        self.is_posting.set(true);
        self.is_main_thread.set(on_main_thread);
        Ok(PostingGuard { state: self })
    }

    pub(crate) fn set_current(&self, event: EventRef, subscription: Arc<Subscription>) {
        *self.event.borrow_mut() = Some(event);
        *self.subscription.borrow_mut() = Some(subscription);
        self.canceled.set(false);
    }

    pub(crate) fn reset_current(&self) {
        self.event.borrow_mut().take();
        self.subscription.borrow_mut().take();
        self.canceled.set(false);
    }

    pub(crate) fn current_event(&self) -> Option<EventRef> {
        self.event.borrow().clone()
    }

    pub(crate) fn current_subscription(&self) -> Option<Arc<Subscription>> {
        self.subscription.borrow().clone()
    }

    pub(crate) fn cancel(&self) {
        self.canceled.set(true);
    }

    pub(crate) fn is_canceled(&self) -> bool {
        self.canceled.get()
    }
}

pub(crate) struct PostingGuard<'a> {
    state: &'a PostingState,
}

impl Drop for PostingGuard<'_> {
    fn drop(&mut self) {
        self.state.is_posting.set(false);
        self.state.is_main_thread.set(false);
    }
}
