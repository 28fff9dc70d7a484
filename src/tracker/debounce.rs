//! # 去抖工具
//!
//! ## 设计思路
//!
//! 合并窗口语义是**后写胜出**：新任务登记时取消尚未触发的旧任务，
//! 不排队、不补发过期请求。实现只依赖 tokio 定时器与取消令牌，
//! 不绑定任何 UI 框架的副作用系统。

use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// 后写胜出的去抖器。
#[derive(Default)]
pub struct Debouncer {
    pending: Mutex<Option<CancellationToken>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("去抖器锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }

    /// 延迟 `delay` 后执行 `task`；再次调用会取消未触发的前一个任务。
    ///
    /// 需要运行中的 tokio 运行时。
    pub fn schedule<F>(&self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        if let Some(previous) = self.lock().replace(token.clone()) {
            previous.cancel();
        }

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => task.await,
            }
        });
    }

    /// 取消尚未触发的任务。无挂起任务时为空操作。
    pub fn cancel(&self) {
        if let Some(token) = self.lock().take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Debouncer;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn later_schedule_supersedes_earlier() {
        let debouncer = Debouncer::new();
        let fired = Arc::new(AtomicU32::new(0));

        for _ in 0..3 {
            let fired = Arc::clone(&fired);
            debouncer.schedule(Duration::from_millis(1000), async move {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_suppresses_pending_task() {
        let debouncer = Debouncer::new();
        let fired = Arc::new(AtomicU32::new(0));

        {
            let fired = Arc::clone(&fired);
            debouncer.schedule(Duration::from_millis(300), async move {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        }
        debouncer.cancel();

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn task_fires_after_quiet_window() {
        let debouncer = Debouncer::new();
        let fired = Arc::new(AtomicU32::new(0));

        {
            let fired = Arc::clone(&fired);
            debouncer.schedule(Duration::from_millis(300), async move {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_millis(299)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
