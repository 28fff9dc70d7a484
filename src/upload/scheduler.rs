//! # 通道调度接口（scheduler）
//!
//! ## 设计思路
//!
//! 通道**何时**执行由外部节奏控制，登记簿只管理通道**是否存在**。
//! 这里约定调度方需要实现的最小接口，并提供一个显式触发的
//! [`ManualScheduler`]：嵌入方（或测试）决定何时把所有通道各跑一轮。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;

use super::registry::UploadPass;

/// 通道执行节奏的所有者。
pub trait PassScheduler: Send + Sync {
    /// 登记一条通道。同键重复登记由登记簿负责先注销旧通道。
    fn register(&self, key: &str, pass: Arc<UploadPass>);

    /// 注销通道。键不存在时为空操作。
    fn unregister(&self, key: &str);

    /// 清空全部调度登记（批量取消路径）。
    fn clear(&self);
}

/// 显式触发的调度器：不自带节奏，由嵌入方调用
/// [`ManualScheduler::run_all_once`] 让所有通道各执行一轮。
#[derive(Default)]
pub struct ManualScheduler {
    passes: Mutex<HashMap<String, Arc<UploadPass>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<UploadPass>>> {
        match self.passes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("调度登记锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }

    /// 当前登记的通道数量。
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// 指定键是否已登记。
    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// 让当前登记的每条通道各执行一轮采集-上传。
    ///
    /// 执行的是调用时刻的通道快照；执行途中新登记的通道等下一轮。
    pub async fn run_all_once(&self, cancel: &CancellationToken) {
        let passes: Vec<Arc<UploadPass>> = self.lock().values().cloned().collect();
        for pass in passes {
            pass.run_once(cancel).await;
        }
    }
}

impl PassScheduler for ManualScheduler {
    fn register(&self, key: &str, pass: Arc<UploadPass>) {
        self.lock().insert(key.to_string(), pass);
    }

    fn unregister(&self, key: &str) {
        self.lock().remove(key);
    }

    fn clear(&self) {
        self.lock().clear();
    }
}
