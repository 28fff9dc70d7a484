//! # 通用发布-订阅状态容器
//!
//! ## 设计思路
//!
//! 界面刷新靠订阅回调驱动。这里抽象成一个与框架无关的 [`Store`]：
//! 持有一份状态，变更后同步通知所有订阅者。
//!
//! ## 实现思路
//!
//! - 监听器以 `Arc` 存放，通知前先把监听器列表克隆出锁外再逐个调用，
//!   允许监听器内再次读取 store 而不会死锁。
//! - 锁中毒按恢复处理：记一条警告日志后继续使用恢复数据。

use std::sync::{Arc, Mutex, MutexGuard};

/// 订阅句柄，用于退订。
pub type SubscriptionId = u64;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct StoreInner<T> {
    state: T,
    listeners: Vec<(SubscriptionId, Listener<T>)>,
    next_id: SubscriptionId,
}

/// 发布-订阅状态容器。克隆得到的是同一份共享状态的新句柄。
pub struct Store<T> {
    inner: Arc<Mutex<StoreInner<T>>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone> Store<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner {
                state: initial,
                listeners: Vec::new(),
                next_id: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner<T>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("状态容器锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }

    /// 读取状态快照。
    pub fn get_state(&self) -> T {
        self.lock().state.clone()
    }

    /// 在最新状态上就地应用变更，随后同步通知所有订阅者。
    pub fn set_state(&self, mutate: impl FnOnce(&mut T)) {
        let (snapshot, listeners) = {
            let mut inner = self.lock();
            mutate(&mut inner.state);
            let listeners: Vec<Listener<T>> = inner
                .listeners
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect();
            (inner.state.clone(), listeners)
        };

        for listener in listeners {
            listener(&snapshot);
        }
    }

    /// 注册订阅者，返回可用于退订的句柄。
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, Arc::new(listener)));
        id
    }

    /// 退订。句柄不存在时为空操作。
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut inner = self.lock();
        inner.listeners.retain(|(listener_id, _)| *listener_id != id);
    }
}

#[cfg(test)]
mod tests {
    use super::Store;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn set_state_mutates_latest_snapshot() {
        let store = Store::new(0u32);
        store.set_state(|n| *n += 1);
        store.set_state(|n| *n += 2);
        assert_eq!(store.get_state(), 3);
    }

    #[test]
    fn subscribers_observe_every_change() {
        let store = Store::new(0u32);
        let seen = Arc::new(AtomicU32::new(0));
        let seen_by_listener = Arc::clone(&seen);
        store.subscribe(move |state| {
            seen_by_listener.store(*state, Ordering::SeqCst);
        });

        store.set_state(|n| *n = 7);
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let store = Store::new(0u32);
        let calls = Arc::new(AtomicU32::new(0));
        let calls_by_listener = Arc::clone(&calls);
        let id = store.subscribe(move |_| {
            calls_by_listener.fetch_add(1, Ordering::SeqCst);
        });

        store.set_state(|n| *n = 1);
        store.unsubscribe(id);
        store.set_state(|n| *n = 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listener_may_reenter_store_for_reads() {
        let store = Store::new(1u32);
        let reentrant = store.clone();
        let seen = Arc::new(AtomicU32::new(0));
        let seen_by_listener = Arc::clone(&seen);
        store.subscribe(move |_| {
            // 通知发生在锁外，重入读取不应死锁。
            seen_by_listener.store(reentrant.get_state(), Ordering::SeqCst);
        });

        store.set_state(|n| *n = 5);
        assert_eq!(seen.load(Ordering::SeqCst), 5);
    }
}
