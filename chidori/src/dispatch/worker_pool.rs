use crate::error::BusResult;
use std::fmt;
use std::thread;
#[cfg(feature = "tokio")]
use tracing::{error, warn};

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// 异步通道与后台通道使用的并发线程池
///
/// 默认为 `Threads`，不随构建时所在的运行时而变；复用 tokio 需显式选择。
#[derive(Clone, Default)]
pub enum WorkerPool {
    /// 交给 tokio 的阻塞线程池（按需扩容、空闲回收）
    ///
    /// 运行时关闭后被丢弃的任务改由独立线程执行。
    #[cfg(feature = "tokio")]
    Tokio(tokio::runtime::Handle),
    /// 每个任务一个具名 OS 线程
    #[default]
    Threads,
}

impl WorkerPool {
    /// 当前线程处于 tokio 运行时内时复用之，否则退化为独立线程
    ///
    /// 运行时的生命周期应覆盖总线。
    pub fn current() -> Self {
        #[cfg(feature = "tokio")]
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            return WorkerPool::Tokio(handle);
        }
        WorkerPool::Threads
    }

    pub fn execute(&self, job: Job) -> BusResult<()> {
        match self {
            #[cfg(feature = "tokio")]
            WorkerPool::Tokio(handle) => {
                let mut job = Unrun(Some(job));
                handle.spawn_blocking(move || job.run());
            }
            WorkerPool::Threads => spawn_thread(job)?,
        }
        Ok(())
    }
}

fn spawn_thread(job: Job) -> BusResult<()> {
    thread::Builder::new()
        .name("chidori-worker".into())
        .spawn(job)?;
    Ok(())
}

#[cfg(feature = "tokio")]
/// 尚未执行的任务；未执行即被丢弃时（运行时已关闭）转交独立线程
struct Unrun(Option<Job>);

#[cfg(feature = "tokio")]
impl Unrun {
    fn run(&mut self) {
        if let Some(job) = self.0.take() {
            job();
        }
    }
}

#[cfg(feature = "tokio")]
impl Drop for Unrun {
    fn drop(&mut self) {
        let Some(job) = self.0.take() else {
            return;
        };
        warn!("worker pool dropped a job, running it on a dedicated thread");
        if let Err(e) = spawn_thread(job) {
            error!(error = %e, "job lost: no thread could be started");
        }
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "tokio")]
            WorkerPool::Tokio(_) => f.write_str("WorkerPool::Tokio"),
            WorkerPool::Threads => f.write_str("WorkerPool::Threads"),
        }
    }
}
