//! # 表单上传上下文（context）
//!
//! ## 设计思路
//!
//! 不做任何隐式的上下文注入，上传能力靠**显式依赖装配**获得：
//! 拥有表单的一方构造 [`UploadContext`]，由它把状态仓、执行器、
//! 取消登记簿、调度器与通道登记簿按固定方式接好，再对外暴露
//! 手动上传、清空、批量取消等入口。
//!
//! ## 实现思路
//!
//! - 一个表单实例一个上下文；全部状态都在内存中，随上下文一同消亡。
//! - 手动操作直接走执行器；自动通道经绑定落到登记簿，由嵌入方按
//!   自己的节奏调用 [`UploadContext::run_passes_once`] 触发。
//! - 多文件批量上传并发执行、互不排序，收敛依赖 `uploadId` 关联。

use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::source::{ImageCaptureConfig, MaskCaptureConfig};
use crate::store::{ImagesCallback, UploadStateStore};
use crate::upload::{
    AutoCaptureBinding, CaptureRecipe, HostBridge, ManualScheduler, PassScheduler,
    UploadCanceller, UploadExecutor, UploadPassRegistry, UploadRequest, UploadTransport,
};

/// 表单作用域的上传上下文。
pub struct UploadContext {
    store: Arc<UploadStateStore>,
    executor: Arc<UploadExecutor>,
    registry: Arc<UploadPassRegistry>,
    canceller: Arc<UploadCanceller>,
    scheduler: Arc<ManualScheduler>,
}

impl UploadContext {
    /// 装配一个表单的完整上传链路。
    ///
    /// # 参数
    /// * `host` - Photoshop 宿主桥
    /// * `transport` - 上传传输层
    /// * `on_set_images` - 图像列表刷新回调（回滚路径，不触发表单值变更）
    /// * `on_value_change` - 图像列表提议回调（触发表单值变更与持久化）
    pub fn new(
        host: Arc<dyn HostBridge>,
        transport: Arc<dyn UploadTransport>,
        on_set_images: ImagesCallback,
        on_value_change: ImagesCallback,
    ) -> Self {
        let canceller = Arc::new(UploadCanceller::new());
        let store = Arc::new(UploadStateStore::new(
            Arc::clone(&canceller),
            on_set_images,
            on_value_change,
        ));
        let executor = Arc::new(UploadExecutor::new(
            host,
            transport,
            Arc::clone(&store),
            Arc::clone(&canceller),
        ));
        let scheduler = Arc::new(ManualScheduler::new());
        let registry = Arc::new(UploadPassRegistry::new(
            Arc::clone(&executor),
            Arc::clone(&canceller),
            Arc::clone(&scheduler) as Arc<dyn PassScheduler>,
        ));

        Self {
            store,
            executor,
            registry,
            canceller,
            scheduler,
        }
    }

    pub fn store(&self) -> &Arc<UploadStateStore> {
        &self.store
    }

    pub fn executor(&self) -> &Arc<UploadExecutor> {
        &self.executor
    }

    pub fn registry(&self) -> &Arc<UploadPassRegistry> {
        &self.registry
    }

    pub fn canceller(&self) -> &Arc<UploadCanceller> {
        &self.canceller
    }

    /// 为一个控件创建自动采集绑定。
    pub fn binding(&self, target_index: Option<usize>) -> AutoCaptureBinding {
        AutoCaptureBinding::new(Arc::clone(&self.registry), target_index)
    }

    /// 手动触发一次图像采集上传（单图控件语义）。
    pub async fn upload_image(&self, config: ImageCaptureConfig, cancel: &CancellationToken) {
        let request = UploadRequest::new(CaptureRecipe::Image(config));
        self.executor.run_capture_upload(&request, cancel).await;
    }

    /// 手动触发一次蒙版采集上传（单图控件语义）。
    pub async fn upload_mask(&self, config: MaskCaptureConfig, cancel: &CancellationToken) {
        let request = UploadRequest::new(CaptureRecipe::Mask(config));
        self.executor.run_capture_upload(&request, cancel).await;
    }

    /// 按完整描述触发一次上传（多图/槽位语义由调用方指定）。
    pub async fn upload(&self, request: UploadRequest, cancel: &CancellationToken) {
        self.executor.run_capture_upload(&request, cancel).await;
    }

    /// 批量上传本地文件字节，并发执行、互不排序。
    pub async fn upload_buffers(
        &self,
        files: Vec<(Bytes, String)>,
        cancel: &CancellationToken,
    ) {
        let mut tasks = tokio::task::JoinSet::new();
        for (bytes, file_name) in files {
            let executor = Arc::clone(&self.executor);
            let cancel = cancel.clone();
            tasks.spawn(async move {
                executor
                    .run_buffer_upload(bytes, &file_name, true, &cancel)
                    .await;
            });
        }
        while tasks.join_next().await.is_some() {}
    }

    /// 让当前登记的自动通道各执行一轮。节奏由嵌入方决定。
    pub async fn run_passes_once(&self, cancel: &CancellationToken) {
        self.scheduler.run_all_once(cancel).await;
    }

    /// 清空图像列表（先中止所有在途上传）。
    pub fn clear_images(&self) {
        self.store.clear_images();
    }

    /// 批量取消：中止所有在途上传并清空通道登记。
    pub fn cancel_all_uploads(&self) {
        self.registry.cancel_all_uploads();
    }
}
