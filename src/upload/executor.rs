//! # 上传执行器（executor）
//!
//! ## 设计思路
//!
//! 执行器编排**单次**"采集 → 占位 → 传输 → 替换/回滚"周期，不关心
//! 调度节奏。处理链路固定为：
//!
//! 1. 快照当前图像列表（失败回滚的基准）
//! 2. 宿主采集；失败即恢复快照并上报用户可读错误
//! 3. 生成关联键 `uploadId`，插入占位条目（多图追加、单图替换）
//! 4. 在途计数 +1（守卫持有，任何退出路径都保证归还）
//! 5. 在"调用方令牌 + 本次上传专属令牌"的组合信号下执行传输
//! 6. 成功：按 `uploadId` 在**最新**列表中原地替换；找不到则降级追加
//! 7. 取消：只归还计数——不回滚、不上报（取消不是失败）
//! 8. 其它错误：恢复快照并上报 `error.message`
//!
//! ## 实现思路
//!
//! - 同一控件的多次上传**不串行**，乱序完成靠 `uploadId` 关联收敛；
//!   任何写回都基于 `images_snapshot()` 读到的最新列表，绝不用闭包
//!   里捕获的过期数组。
//! - 取消是协作式的：每个挂起点前后设检查点；传输段用 `select!`
//!   同时监听两路令牌。
//! - 公开入口永不向外抛错，一切失败都转化为状态仓更新。

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::detail::ImageDetail;
use crate::error::UploadError;
use crate::source::{ImageCaptureConfig, MaskCaptureConfig};
use crate::store::UploadStateStore;

use super::canceller::UploadCanceller;
use super::host::HostBridge;
use super::transport::{UploadFile, UploadPayload, UploadTransport};

/// 一次上传的采集配方。
#[derive(Debug, Clone)]
pub enum CaptureRecipe {
    Image(ImageCaptureConfig),
    Mask(MaskCaptureConfig),
}

impl CaptureRecipe {
    /// 配方的通道身份键（图像/蒙版各占一个前缀命名空间）。
    pub fn pass_key(&self) -> String {
        match self {
            Self::Image(config) => config.pass_key(),
            Self::Mask(config) => config.pass_key(),
        }
    }

    fn capture_error(&self, message: String) -> UploadError {
        match self {
            Self::Image(_) => UploadError::ImageCapture(message),
            Self::Mask(_) => UploadError::MaskCapture(message),
        }
    }
}

/// 一次上传操作的完整描述。
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub recipe: CaptureRecipe,
    /// 多图控件追加占位，单图控件替换。
    pub multi: bool,
    /// 单图替换时的目标下标；越界或缺省时整表替换。
    pub target_index: Option<usize>,
    /// 条目是否随配方保持实时同步（自动通道为 true）。
    pub auto: bool,
}

impl UploadRequest {
    pub fn new(recipe: CaptureRecipe) -> Self {
        Self {
            recipe,
            multi: false,
            target_index: None,
            auto: false,
        }
    }

    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    pub fn auto(mut self) -> Self {
        self.auto = true;
        self
    }

    pub fn at_index(mut self, index: usize) -> Self {
        self.target_index = Some(index);
        self
    }
}

/// 在途计数守卫：构造即 +1，析构必 -1。
///
/// 相当于 `finally`，保证传输段任何退出路径（成功、失败、取消、
/// `select!` 丢弃）都归还计数。
struct UploadCountGuard {
    store: Arc<UploadStateStore>,
}

impl UploadCountGuard {
    fn acquire(store: &Arc<UploadStateStore>) -> Self {
        store.increment_upload_count();
        Self {
            store: Arc::clone(store),
        }
    }
}

impl Drop for UploadCountGuard {
    fn drop(&mut self) {
        self.store.decrement_upload_count();
    }
}

/// 上传执行器。
pub struct UploadExecutor {
    host: Arc<dyn HostBridge>,
    transport: Arc<dyn UploadTransport>,
    store: Arc<UploadStateStore>,
    canceller: Arc<UploadCanceller>,
}

impl UploadExecutor {
    pub fn new(
        host: Arc<dyn HostBridge>,
        transport: Arc<dyn UploadTransport>,
        store: Arc<UploadStateStore>,
        canceller: Arc<UploadCanceller>,
    ) -> Self {
        Self {
            host,
            transport,
            store,
            canceller,
        }
    }

    pub fn store(&self) -> &Arc<UploadStateStore> {
        &self.store
    }

    /// 驱动一次"采集 + 上传"周期。永不向外抛错。
    pub async fn run_capture_upload(&self, request: &UploadRequest, cancel: &CancellationToken) {
        let original_images = self.store.images_snapshot();

        if cancel.is_cancelled() {
            return;
        }

        // 宿主采集（挂起点）。
        let captured = match &request.recipe {
            CaptureRecipe::Image(config) => self.host.get_image(config).await,
            CaptureRecipe::Mask(config) => self.host.get_mask(config).await,
        };

        // 采集期间被取消：此刻尚未触碰任何共享状态，直接退出。
        if cancel.is_cancelled() {
            return;
        }

        let outcome = match captured {
            Ok(outcome) => outcome,
            Err(err) if err.is_abort() => return,
            Err(err) => {
                self.fail_capture(original_images, err.to_string());
                return;
            }
        };

        let accepted = match outcome.accept() {
            Ok(accepted) => accepted,
            Err(reason) => {
                let message = request.recipe.capture_error(reason).to_string();
                self.fail_capture(original_images, message);
                return;
            }
        };

        self.finish_upload(
            request,
            original_images,
            accepted.payload,
            &accepted.source,
            &accepted.thumbnail_url,
            Some(&request.recipe.pass_key()),
            None,
            cancel,
        )
        .await;
    }

    /// 手动磁盘/批量上传路径：跳过宿主采集，直接传输给定字节。
    ///
    /// 条目 `source` 固定为 `"disk"`，多文件并发调用互不排序。
    pub async fn run_buffer_upload(
        &self,
        bytes: bytes::Bytes,
        file_name: &str,
        multi: bool,
        cancel: &CancellationToken,
    ) {
        if cancel.is_cancelled() {
            return;
        }

        let original_images = self.store.images_snapshot();
        let request = UploadRequest {
            recipe: CaptureRecipe::Image(placeholder_recipe()),
            multi,
            target_index: None,
            auto: false,
        };

        self.finish_upload(
            &request,
            original_images,
            UploadPayload::Buffer(bytes),
            "disk",
            "",
            None,
            Some(file_name),
            cancel,
        )
        .await;
    }

    /// 占位插入 + 计数 + 传输 + 替换/回滚的共享后半段。
    ///
    /// `file_name` 缺省时按 `{uploadId}.png` 命名（采集路径）；
    /// 磁盘路径保留调用方给定的文件名。
    #[allow(clippy::too_many_arguments)]
    async fn finish_upload(
        &self,
        request: &UploadRequest,
        original_images: Vec<ImageDetail>,
        payload: UploadPayload,
        source: &str,
        thumbnail: &str,
        thumbnail_key: Option<&str>,
        file_name: Option<&str>,
        cancel: &CancellationToken,
    ) {
        let upload_id = Uuid::new_v4().to_string();
        let placeholder = ImageDetail::placeholder(source, thumbnail, &upload_id, request.auto);

        // 基于最新列表插入占位，不复用进入前的快照。
        let mut images = self.store.images_snapshot();
        if request.multi {
            images.push(placeholder);
        } else if let Some(index) = request.target_index.filter(|i| *i < images.len()) {
            images[index] = placeholder;
        } else {
            images = vec![placeholder];
        }
        self.store.call_on_value_change(images);

        if !thumbnail.is_empty() {
            self.store.set_current_thumbnail(thumbnail);
            if let Some(key) = thumbnail_key {
                self.store.set_thumbnail_for(key, thumbnail);
            }
        }

        let _count_guard = UploadCountGuard::acquire(&self.store);
        let upload_token = self.canceller.register(&upload_id);

        let file = UploadFile {
            payload,
            file_name: file_name
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}.png", upload_id)),
        };

        log::debug!("📤 上传开始 - uploadId: {}", upload_id);

        // 组合信号：调用方令牌或本次上传专属令牌任一触发即中止。
        let result = tokio::select! {
            _ = cancel.cancelled() => Err(UploadError::Aborted),
            _ = upload_token.cancelled() => Err(UploadError::Aborted),
            result = self.transport.upload(file, &upload_token) => result,
        };
        self.canceller.done(&upload_id);

        match result {
            Ok(url) => {
                let final_detail = ImageDetail::uploaded(&url, source, thumbnail, request.auto);
                let mut latest = self.store.images_snapshot();
                match latest
                    .iter_mut()
                    .find(|detail| detail.matches_upload_id(&upload_id))
                {
                    Some(slot) => *slot = final_detail,
                    None => {
                        // 占位条目被并发清除（列表已清空/重建），降级为追加。
                        log::debug!("占位条目已不在列表中，追加为新条目 - uploadId: {}", upload_id);
                        latest.push(final_detail);
                    }
                }
                self.store.call_on_value_change(latest);
                log::info!("✅ 上传完成 - uploadId: {} url: {}", upload_id, url);
            }
            Err(err) if err.is_abort() => {
                // 取消不是失败：不回滚、不上报，计数由守卫归还。
                log::debug!("⏭️  上传已取消 - uploadId: {}", upload_id);
            }
            Err(err) => {
                self.store.set_images(original_images);
                self.store.set_upload_error(err.to_string());
            }
        }
    }

    /// 采集失败：恢复快照并上报，不进入传输阶段。
    fn fail_capture(&self, original_images: Vec<ImageDetail>, message: String) {
        self.store.set_images(original_images);
        self.store.set_upload_error(message);
    }
}

/// `run_buffer_upload` 不经过宿主采集，配方只为复用共享后半段；
/// 其 `source` 与缩略图均由调用方显式给定，配方内容不会被读取。
fn placeholder_recipe() -> ImageCaptureConfig {
    ImageCaptureConfig {
        content: crate::source::CaptureContent::Canvas,
        boundary: crate::source::BoundaryRect::whole_canvas(),
        image_size: None,
        image_quality: None,
        crop_by_selection: None,
    }
}
