//! 主线程协作者（MainThreadSupport）
//!
//! 宿主的 UI 调度器只需回答“当前是否在主线程”，并能把回调按提交顺序送到主线程执行。
//! `LooperThread` 是一个现成实现：独占一个具名 OS 线程，逐个执行提交的回调。
//!
use crate::error::{BusError, BusResult};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use tracing::error;

pub type MainThreadTask = Box<dyn FnOnce() + Send + 'static>;

pub trait MainThreadSupport: Send + Sync + 'static {
    fn is_main_thread(&self) -> bool;

    /// 最终在主线程上执行 `task`，保持与其他 `schedule` 调用的提交顺序
    ///
    /// 无法接收时返回错误，`task` 随之丢弃。
    fn schedule(&self, task: MainThreadTask) -> BusResult<()>;
}

/// 专用的主线程实现
pub struct LooperThread {
    thread_id: ThreadId,
    sender: Mutex<Option<Sender<MainThreadTask>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl LooperThread {
    pub fn spawn(name: impl Into<String>) -> BusResult<Self> {
        let (tx, rx) = mpsc::channel::<MainThreadTask>();
        let handle = thread::Builder::new().name(name.into()).spawn(move || {
            for task in rx {
                if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                    error!("main thread task panicked");
                }
            }
        })?;

        Ok(Self {
            thread_id: handle.thread().id(),
            sender: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// 在主线程执行 `f` 并等待结果；已在主线程时直接执行
    pub fn run_and_wait<R, F>(&self, f: F) -> BusResult<R>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        if self.is_main_thread() {
            return Ok(f());
        }

        let (tx, rx) = mpsc::sync_channel(1);
        self.schedule(Box::new(move || {
            let _ = tx.send(f());
        }))?;
        rx.recv().map_err(|_| BusError::LooperStopped)
    }

    /// 等待此前提交的回调全部执行完毕
    pub fn flush(&self) -> BusResult<()> {
        self.run_and_wait(|| ())
    }

    /// 停止接收新回调，执行完已提交的回调后退出线程
    pub fn shutdown(&self) {
        self.sender_lock().take();

        if self.is_main_thread() {
            return;
        }
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    fn sender_lock(&self) -> MutexGuard<'_, Option<Sender<MainThreadTask>>> {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MainThreadSupport for LooperThread {
    fn is_main_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    fn schedule(&self, task: MainThreadTask) -> BusResult<()> {
        match self.sender_lock().as_ref() {
            Some(tx) => tx.send(task).map_err(|_| BusError::LooperStopped),
            None => Err(BusError::LooperStopped),
        }
    }
}

impl Drop for LooperThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}
