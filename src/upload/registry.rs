//! # 上传通道登记簿（registry）
//!
//! ## 设计思路
//!
//! 一条"通道"是绑定到控件实时同步配置的循环采集-上传配方。登记簿
//! 按规范化身份键管理通道的创建、替换与移除；图像与蒙版键各带前缀，
//! 两个命名空间永不相撞。
//!
//! ## 实现思路
//!
//! - 同键重建即替换：先把旧通道从调度方注销（其回调不再被触发），
//!   再登记新通道。**替换本身不取消旧通道的在途上传**——只有显式
//!   取消才会中止传输。
//! - 移除是幂等的，不存在的键为空操作。
//! - 批量取消：中止所有在途上传的控制器，并清空调度与登记簿；
//!   已完成的上传不受影响。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;

use crate::source::{ImageCaptureConfig, MaskCaptureConfig};

use super::canceller::UploadCanceller;
use super::executor::{CaptureRecipe, UploadExecutor, UploadRequest};
use super::scheduler::PassScheduler;

/// 一条已登记的采集-上传通道。
pub struct UploadPass {
    key: String,
    request: UploadRequest,
    executor: Arc<UploadExecutor>,
}

impl UploadPass {
    /// 通道身份键。
    pub fn key(&self) -> &str {
        &self.key
    }

    /// 通道绑定的上传描述。
    pub fn request(&self) -> &UploadRequest {
        &self.request
    }

    /// 执行一轮采集-上传。由调度方按节奏调用。
    pub async fn run_once(&self, cancel: &CancellationToken) {
        log::debug!("🔁 通道执行 - key: {}", self.key);
        self.executor.run_capture_upload(&self.request, cancel).await;
    }
}

/// 上传通道登记簿。
pub struct UploadPassRegistry {
    executor: Arc<UploadExecutor>,
    canceller: Arc<UploadCanceller>,
    scheduler: Arc<dyn PassScheduler>,
    passes: Mutex<HashMap<String, Arc<UploadPass>>>,
}

impl UploadPassRegistry {
    pub fn new(
        executor: Arc<UploadExecutor>,
        canceller: Arc<UploadCanceller>,
        scheduler: Arc<dyn PassScheduler>,
    ) -> Self {
        Self {
            executor,
            canceller,
            scheduler,
            passes: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<UploadPass>>> {
        match self.passes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("通道登记锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }

    /// 创建（或替换）一条图像通道，返回其身份键。
    pub fn create_image_pass(
        &self,
        config: ImageCaptureConfig,
        widget_target_index: Option<usize>,
    ) -> String {
        let recipe = CaptureRecipe::Image(config);
        self.create_pass(recipe, widget_target_index)
    }

    /// 创建（或替换）一条蒙版通道，返回其身份键。
    pub fn create_mask_pass(
        &self,
        config: MaskCaptureConfig,
        widget_target_index: Option<usize>,
    ) -> String {
        let recipe = CaptureRecipe::Mask(config);
        self.create_pass(recipe, widget_target_index)
    }

    fn create_pass(&self, recipe: CaptureRecipe, widget_target_index: Option<usize>) -> String {
        let key = recipe.pass_key();

        let mut request = UploadRequest::new(recipe).auto();
        request.target_index = widget_target_index;

        let pass = Arc::new(UploadPass {
            key: key.clone(),
            request,
            executor: Arc::clone(&self.executor),
        });

        let mut passes = self.lock();
        if passes.remove(&key).is_some() {
            // 旧通道先从执行层注销；其在途上传不被替换行为打断。
            self.scheduler.unregister(&key);
            log::debug!("♻️ 通道已替换 - key: {}", key);
        } else {
            log::debug!("➕ 通道已创建 - key: {}", key);
        }
        passes.insert(key.clone(), Arc::clone(&pass));
        self.scheduler.register(&key, pass);

        key
    }

    /// 移除一条图像通道。幂等。
    pub fn remove_image_pass(&self, config: &ImageCaptureConfig) {
        self.remove_key(&config.pass_key());
    }

    /// 移除一条蒙版通道。幂等。
    pub fn remove_mask_pass(&self, config: &MaskCaptureConfig) {
        self.remove_key(&config.pass_key());
    }

    /// 按身份键移除通道。键不存在时为空操作。
    pub fn remove_key(&self, key: &str) {
        if self.lock().remove(key).is_some() {
            self.scheduler.unregister(key);
            log::debug!("➖ 通道已移除 - key: {}", key);
        }
    }

    /// 批量取消：中止所有在途上传，清空调度与登记簿。
    ///
    /// 已完成的上传不会被追溯撤销。
    pub fn cancel_all_uploads(&self) {
        self.canceller.cancel_all();
        self.scheduler.clear();
        self.lock().clear();
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{BoundaryRect, CaptureContent};
    use crate::store::UploadStateStore;
    use crate::upload::host::CaptureOutcome;
    use crate::upload::scheduler::ManualScheduler;
    use crate::upload::transport::{UploadFile, UploadTransport};
    use crate::upload::HostBridge;
    use crate::error::UploadError;
    use async_trait::async_trait;

    struct NullHost;

    #[async_trait]
    impl HostBridge for NullHost {
        async fn get_image(
            &self,
            _params: &ImageCaptureConfig,
        ) -> Result<CaptureOutcome, UploadError> {
            Ok(CaptureOutcome::default())
        }

        async fn get_mask(
            &self,
            _params: &MaskCaptureConfig,
        ) -> Result<CaptureOutcome, UploadError> {
            Ok(CaptureOutcome::default())
        }
    }

    struct NullTransport;

    #[async_trait]
    impl UploadTransport for NullTransport {
        async fn upload(
            &self,
            _file: UploadFile,
            _cancel: &CancellationToken,
        ) -> Result<String, UploadError> {
            Ok("https://x/none.png".to_string())
        }
    }

    /// 总能给出齐备采集结果的宿主替身。
    struct ReadyHost;

    #[async_trait]
    impl HostBridge for ReadyHost {
        async fn get_image(
            &self,
            _params: &ImageCaptureConfig,
        ) -> Result<CaptureOutcome, UploadError> {
            Ok(ready_outcome())
        }

        async fn get_mask(
            &self,
            _params: &MaskCaptureConfig,
        ) -> Result<CaptureOutcome, UploadError> {
            Ok(ready_outcome())
        }
    }

    fn ready_outcome() -> CaptureOutcome {
        CaptureOutcome {
            thumbnail_url: "t".to_string(),
            file_token: Some("f".to_string()),
            buffer: None,
            source: "disk".to_string(),
            error: None,
        }
    }

    /// 进入传输后停在门闸上的替身，由测试决定何时放行。
    struct GatedTransport {
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait]
    impl UploadTransport for GatedTransport {
        async fn upload(
            &self,
            _file: UploadFile,
            _cancel: &CancellationToken,
        ) -> Result<String, UploadError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok("https://x/done.png".to_string())
        }
    }

    fn image_config(content: CaptureContent) -> ImageCaptureConfig {
        ImageCaptureConfig {
            content,
            boundary: BoundaryRect::whole_canvas(),
            image_size: None,
            image_quality: None,
            crop_by_selection: None,
        }
    }

    fn mask_config(content: CaptureContent) -> MaskCaptureConfig {
        MaskCaptureConfig {
            content,
            reverse: None,
            image_size: None,
        }
    }

    fn registry_fixture() -> (UploadPassRegistry, Arc<ManualScheduler>, Arc<UploadCanceller>) {
        let canceller = Arc::new(UploadCanceller::new());
        let store = Arc::new(UploadStateStore::new(
            Arc::clone(&canceller),
            Arc::new(|_| {}),
            Arc::new(|_| {}),
        ));
        let executor = Arc::new(UploadExecutor::new(
            Arc::new(NullHost),
            Arc::new(NullTransport),
            store,
            Arc::clone(&canceller),
        ));
        let scheduler = Arc::new(ManualScheduler::new());
        let registry = UploadPassRegistry::new(
            executor,
            Arc::clone(&canceller),
            Arc::clone(&scheduler) as Arc<dyn PassScheduler>,
        );
        (registry, scheduler, canceller)
    }

    #[test]
    fn same_key_replaces_instead_of_accumulating() {
        let (registry, scheduler, _) = registry_fixture();
        let key1 = registry.create_image_pass(image_config(CaptureContent::Canvas), None);
        let key2 = registry.create_image_pass(image_config(CaptureContent::Canvas), Some(0));
        assert_eq!(key1, key2);
        assert_eq!(registry.len(), 1);
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn image_and_mask_passes_coexist_in_separate_namespaces() {
        let (registry, scheduler, _) = registry_fixture();
        registry.create_image_pass(image_config(CaptureContent::Canvas), None);
        registry.create_mask_pass(mask_config(CaptureContent::Canvas), None);
        assert_eq!(registry.len(), 2);
        assert_eq!(scheduler.len(), 2);
    }

    #[test]
    fn remove_is_idempotent() {
        let (registry, scheduler, _) = registry_fixture();
        let config = image_config(CaptureContent::Selection);
        registry.create_image_pass(config.clone(), None);

        registry.remove_image_pass(&config);
        registry.remove_image_pass(&config);
        assert!(registry.is_empty());
        assert!(scheduler.is_empty());
    }

    #[test]
    fn cancel_all_aborts_controllers_and_clears_bookkeeping() {
        let (registry, scheduler, canceller) = registry_fixture();
        registry.create_image_pass(image_config(CaptureContent::Canvas), None);
        let inflight = canceller.register("u-1");

        registry.cancel_all_uploads();
        assert!(inflight.is_cancelled());
        assert!(registry.is_empty());
        assert!(scheduler.is_empty());
        assert_eq!(canceller.outstanding(), 0);
    }

    #[tokio::test]
    async fn recreating_a_pass_keeps_inflight_upload_alive() {
        let canceller = Arc::new(UploadCanceller::new());
        let store = Arc::new(UploadStateStore::new(
            Arc::clone(&canceller),
            Arc::new(|_| {}),
            Arc::new(|_| {}),
        ));
        let transport = Arc::new(GatedTransport {
            entered: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        });
        let executor = Arc::new(UploadExecutor::new(
            Arc::new(ReadyHost),
            Arc::clone(&transport) as Arc<dyn UploadTransport>,
            Arc::clone(&store),
            Arc::clone(&canceller),
        ));
        let scheduler = Arc::new(ManualScheduler::new());
        let registry = UploadPassRegistry::new(
            executor,
            Arc::clone(&canceller),
            Arc::clone(&scheduler) as Arc<dyn PassScheduler>,
        );

        let config = image_config(CaptureContent::Canvas);
        registry.create_image_pass(config.clone(), None);

        let cancel = CancellationToken::new();
        let run = {
            let scheduler = Arc::clone(&scheduler);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                scheduler.run_all_once(&cancel).await;
            })
        };

        transport.entered.notified().await;
        // 在途上传尚未完成时用同键重建通道。
        registry.create_image_pass(config, None);
        transport.release.notify_one();
        run.await.expect("任务未正常结束");

        // 替换只换登记，不中止在途上传：上传照常落地。
        let images = store.images_snapshot();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].url, "https://x/done.png");
        assert!(store.snapshot().upload_error.is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registry_holds_at_most_one_pass_per_identity() {
        let (registry, _, _) = registry_fixture();
        let config = image_config(CaptureContent::Canvas);
        for _ in 0..5 {
            registry.create_image_pass(config.clone(), None);
        }
        registry.create_mask_pass(mask_config(CaptureContent::Canvas), None);
        registry.remove_mask_pass(&mask_config(CaptureContent::Canvas));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&config.pass_key()));
    }
}
