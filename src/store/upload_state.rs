//! # 上传状态仓（UploadStateStore）
//!
//! ## 设计思路
//!
//! 一个表单实例对应一个状态仓，集中管理：
//!
//! - 引用计数式 `uploading` 标志（多路并发上传共用一个布尔）；
//! - 最近一次错误消息 `upload_error`；
//! - 当前缩略图与按通道键分组的缩略图表；
//! - "最近一次图像列表"引用，作为失败回滚的快照来源。
//!
//! 图像列表的所有权在表单侧：这里只缓存最近提议的数组，并通过
//! 注入的回调把新数组交还给表单持久化。
//!
//! ## 实现思路
//!
//! - 不变量：任何 mutator 返回后 `uploading == (计数 > 0)`，计数下限为零。
//! - `clear_images` 先通过 [`UploadCanceller`] 中止所有在途上传，
//!   再清空并向表单传播，防止被清掉的占位条目稍后"复活"。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::detail::ImageDetail;
use crate::upload::UploadCanceller;

use super::Store;

/// 表单可见的上传状态。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadState {
    /// 是否存在在途上传（引用计数 > 0）。
    pub uploading: bool,
    /// 最近一次上传错误的用户可读消息，空串表示无错误。
    pub upload_error: String,
    /// 最近一次采集的缩略图。
    pub current_thumbnail: String,
    /// 按通道键分组的缩略图表（多通道控件各显示自己的预览）。
    pub current_thumbnails: HashMap<String, String>,
    /// 在途上传引用计数。`uploading` 是它的派生视图。
    pub upload_count: u32,
}

/// 表单收到新图像列表时的回调。
pub type ImagesCallback = Arc<dyn Fn(&[ImageDetail]) + Send + Sync>;

/// 表单作用域的上传状态仓。
pub struct UploadStateStore {
    state: Store<UploadState>,
    images: Mutex<Vec<ImageDetail>>,
    canceller: Arc<UploadCanceller>,
    on_set_images: ImagesCallback,
    on_value_change: ImagesCallback,
}

impl UploadStateStore {
    /// 创建状态仓。
    ///
    /// # 参数
    /// * `canceller` - 与执行器共享的在途上传登记簿
    /// * `on_set_images` - 图像列表刷新回调（不触发表单值变更）
    /// * `on_value_change` - 图像列表提议回调（触发表单值变更与持久化）
    pub fn new(
        canceller: Arc<UploadCanceller>,
        on_set_images: ImagesCallback,
        on_value_change: ImagesCallback,
    ) -> Self {
        Self {
            state: Store::new(UploadState::default()),
            images: Mutex::new(Vec::new()),
            canceller,
            on_set_images,
            on_value_change,
        }
    }

    fn lock_images(&self) -> MutexGuard<'_, Vec<ImageDetail>> {
        match self.images.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("图像列表锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }

    /// 底层状态容器，供界面侧订阅。
    pub fn state(&self) -> &Store<UploadState> {
        &self.state
    }

    /// 状态快照。
    pub fn snapshot(&self) -> UploadState {
        self.state.get_state()
    }

    /// 最近一次图像列表的快照（回滚与占位插入的基准）。
    pub fn images_snapshot(&self) -> Vec<ImageDetail> {
        self.lock_images().clone()
    }

    /// 在途上传 +1。
    pub fn increment_upload_count(&self) {
        self.state.set_state(|state| {
            state.upload_count += 1;
            state.uploading = state.upload_count > 0;
        });
    }

    /// 在途上传 -1，下限为零。
    pub fn decrement_upload_count(&self) {
        self.state.set_state(|state| {
            state.upload_count = state.upload_count.saturating_sub(1);
            state.uploading = state.upload_count > 0;
        });
    }

    /// 刷新图像列表（回滚、恢复路径），不触发表单值变更。
    pub fn set_images(&self, images: Vec<ImageDetail>) {
        *self.lock_images() = images.clone();
        (self.on_set_images)(&images);
    }

    /// 向表单提议新的图像列表，触发值变更与持久化。
    pub fn call_on_value_change(&self, images: Vec<ImageDetail>) {
        *self.lock_images() = images.clone();
        (self.on_value_change)(&images);
    }

    /// 清空图像列表：先中止所有在途上传，再清空并传播。
    pub fn clear_images(&self) {
        self.canceller.cancel_all();
        self.call_on_value_change(Vec::new());
    }

    /// 记录用户可读的上传错误消息。
    pub fn set_upload_error(&self, message: impl Into<String>) {
        let message = message.into();
        if !message.is_empty() {
            log::warn!("⚠️ 上传链路错误: {}", message);
        }
        self.state.set_state(|state| state.upload_error = message);
    }

    /// 更新当前缩略图。
    pub fn set_current_thumbnail(&self, thumbnail: impl Into<String>) {
        let thumbnail = thumbnail.into();
        self.state
            .set_state(|state| state.current_thumbnail = thumbnail);
    }

    /// 更新指定通道键的缩略图。
    pub fn set_thumbnail_for(&self, key: &str, thumbnail: impl Into<String>) {
        let thumbnail = thumbnail.into();
        let key = key.to_string();
        self.state.set_state(|state| {
            state.current_thumbnails.insert(key, thumbnail);
        });
    }
}
