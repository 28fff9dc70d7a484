//! # 上传取消控制器登记簿
//!
//! ## 设计思路
//!
//! 每次上传都持有一个独立的取消令牌，既支持单个上传被精确取消，
//! 也支持"全部取消"（清空图像列表、表单卸载）一次性中止所有在途上传。
//!
//! ## 实现思路
//!
//! - 以 `uploadId` 为键登记 [`CancellationToken`]，完成（无论成败）后注销。
//! - `cancel_all` 先逐个触发再清空登记簿；已完成的上传不受影响，
//!   这是协作式取消，不会回退已落地的结果。

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;

/// 在途上传的取消令牌登记簿。
#[derive(Default)]
pub struct UploadCanceller {
    tokens: Mutex<HashMap<String, CancellationToken>>,
}

impl UploadCanceller {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CancellationToken>> {
        match self.tokens.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("取消登记簿锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }

    /// 为一次上传登记新的取消令牌。
    ///
    /// 同一 `uploadId` 重复登记会覆盖旧令牌（正常流程中不会发生，
    /// 关联键由 UUID 生成）。
    pub fn register(&self, upload_id: &str) -> CancellationToken {
        let token = CancellationToken::new();
        self.lock().insert(upload_id.to_string(), token.clone());
        token
    }

    /// 注销一次上传。键不存在时为空操作。
    pub fn done(&self, upload_id: &str) {
        self.lock().remove(upload_id);
    }

    /// 取消单个在途上传。键不存在时为空操作。
    pub fn cancel(&self, upload_id: &str) {
        if let Some(token) = self.lock().get(upload_id) {
            token.cancel();
        }
    }

    /// 取消所有在途上传并清空登记簿。
    pub fn cancel_all(&self) {
        let mut tokens = self.lock();
        let count = tokens.len();
        for token in tokens.values() {
            token.cancel();
        }
        tokens.clear();
        if count > 0 {
            log::info!("🛑 已取消 {} 个在途上传", count);
        }
    }

    /// 当前在途上传数量。
    pub fn outstanding(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::UploadCanceller;

    #[test]
    fn cancel_all_fires_every_token_and_clears() {
        let canceller = UploadCanceller::new();
        let t1 = canceller.register("u-1");
        let t2 = canceller.register("u-2");
        assert_eq!(canceller.outstanding(), 2);

        canceller.cancel_all();
        assert!(t1.is_cancelled());
        assert!(t2.is_cancelled());
        assert_eq!(canceller.outstanding(), 0);
    }

    #[test]
    fn done_unregisters_without_cancelling() {
        let canceller = UploadCanceller::new();
        let token = canceller.register("u-1");
        canceller.done("u-1");
        assert!(!token.is_cancelled());
        assert_eq!(canceller.outstanding(), 0);

        // 幂等：重复注销、注销不存在的键都是空操作。
        canceller.done("u-1");
        canceller.cancel("missing");
    }

    #[test]
    fn cancel_targets_single_upload() {
        let canceller = UploadCanceller::new();
        let t1 = canceller.register("u-1");
        let t2 = canceller.register("u-2");

        canceller.cancel("u-1");
        assert!(t1.is_cancelled());
        assert!(!t2.is_cancelled());
    }
}
