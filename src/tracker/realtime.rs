//! # 实时缩略图追踪器
//!
//! ## 设计思路
//!
//! 按文档维护一个两态状态机：*空闲*（无追踪项）→ *追踪中*（至少一个
//! `{图像,蒙版} × {canvas,curlayer,selection}` 组合被登记）。追踪集合的
//! 任何变更、或宿主侧画布/选区/边界变化的提示，都会按对应的合并窗口
//! 安排一次去抖后的预览采集。
//!
//! ## 实现思路
//!
//! - 合并窗口：画布/文档 1000ms，选区/当前图层 500ms，边界编辑 300ms；
//!   后写胜出，不补发过期请求。
//! - 采集结果只写入独立的预览缩略图表（按 文档/类型/内容 键控），
//!   与上传传输完全无关。
//! - 预览是尽力而为：采集失败只记 debug 日志，绝不写表单错误。

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::source::{BoundaryRect, CaptureContent, ImageCaptureConfig, MaskCaptureConfig};
use crate::store::Store;
use crate::upload::HostBridge;

use super::debounce::Debouncer;

/// 预览内容类型：图像或蒙版。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreviewKind {
    Image,
    Mask,
}

/// 预览缩略图表的键：文档 / 类型 / 内容。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewKey {
    pub document_id: i64,
    pub kind: PreviewKind,
    pub content: CaptureContent,
}

/// 宿主侧变化提示，决定合并窗口的宽度。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeHint {
    /// 画布内容变化。
    Canvas,
    /// 活动文档切换。
    Document,
    /// 选区变化。
    Selection,
    /// 当前图层切换。
    CurrentLayer,
    /// 边界编辑。
    Boundary,
}

/// 追踪器可调参数。
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// 画布/文档变化的合并窗口（毫秒）。
    pub canvas_debounce_ms: u64,
    /// 选区/当前图层变化的合并窗口（毫秒）。
    pub selection_debounce_ms: u64,
    /// 边界编辑的合并窗口（毫秒）。
    pub boundary_debounce_ms: u64,
    /// 预览采集的目标尺寸（单边像素）。
    pub preview_size: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            canvas_debounce_ms: 1000,
            selection_debounce_ms: 500,
            boundary_debounce_ms: 300,
            preview_size: 512,
        }
    }
}

/// 预览缩略图追踪器。
///
/// 与上传执行器互不往来：只读宿主、只写预览表。
pub struct RealtimeThumbnailTracker {
    host: Arc<dyn HostBridge>,
    config: TrackerConfig,
    tracked: Mutex<HashSet<(PreviewKind, CaptureContent)>>,
    thumbnails: Store<HashMap<PreviewKey, String>>,
    debouncer: Debouncer,
}

impl RealtimeThumbnailTracker {
    pub fn new(host: Arc<dyn HostBridge>, config: TrackerConfig) -> Self {
        Self {
            host,
            config,
            tracked: Mutex::new(HashSet::new()),
            thumbnails: Store::new(HashMap::new()),
            debouncer: Debouncer::new(),
        }
    }

    fn lock_tracked(&self) -> MutexGuard<'_, HashSet<(PreviewKind, CaptureContent)>> {
        match self.tracked.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("追踪集合锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }

    /// 预览缩略图表，供界面侧订阅。
    pub fn thumbnails(&self) -> &Store<HashMap<PreviewKey, String>> {
        &self.thumbnails
    }

    /// 是否处于*追踪中*状态（至少一个追踪项）。
    pub fn is_tracking(&self) -> bool {
        !self.lock_tracked().is_empty()
    }

    /// 登记一个追踪项；集合发生变化时安排一次去抖采集。
    pub fn add_tracking(self: &Arc<Self>, kind: PreviewKind, content: CaptureContent) {
        let inserted = self.lock_tracked().insert((kind, content));
        if inserted {
            self.schedule_refresh(self.window_for(ChangeHint::Canvas));
        }
    }

    /// 移除一个追踪项；集合仍非空时安排一次去抖采集，
    /// 否则回到*空闲*并取消未触发的采集。
    pub fn remove_tracking(self: &Arc<Self>, kind: PreviewKind, content: CaptureContent) {
        let removed = self.lock_tracked().remove(&(kind, content));
        if removed {
            if self.is_tracking() {
                self.schedule_refresh(self.window_for(ChangeHint::Canvas));
            } else {
                self.debouncer.cancel();
            }
        }
    }

    /// 清空追踪集合并回到*空闲*状态，取消未触发的采集。
    pub fn clear_tracking(&self) {
        self.lock_tracked().clear();
        self.debouncer.cancel();
    }

    /// 宿主侧变化提示。*空闲*状态下为空操作。
    pub fn notify_change(self: &Arc<Self>, hint: ChangeHint) {
        if !self.is_tracking() {
            return;
        }
        self.schedule_refresh(self.window_for(hint));
    }

    fn window_for(&self, hint: ChangeHint) -> Duration {
        let ms = match hint {
            ChangeHint::Canvas | ChangeHint::Document => self.config.canvas_debounce_ms,
            ChangeHint::Selection | ChangeHint::CurrentLayer => self.config.selection_debounce_ms,
            ChangeHint::Boundary => self.config.boundary_debounce_ms,
        };
        Duration::from_millis(ms)
    }

    fn schedule_refresh(self: &Arc<Self>, delay: Duration) {
        let tracker = Arc::clone(self);
        self.debouncer.schedule(delay, async move {
            tracker.refresh_now().await;
        });
    }

    /// 立即刷新所有追踪项的预览缩略图。
    ///
    /// 尽力而为：单项失败跳过，整体失败静默。
    pub async fn refresh_now(&self) {
        let Some(document_id) = self.host.active_document_id() else {
            log::debug!("无活动文档，跳过预览刷新");
            return;
        };
        let boundary = self
            .host
            .work_boundary(document_id)
            .unwrap_or_else(BoundaryRect::whole_canvas);

        let entries: Vec<(PreviewKind, CaptureContent)> =
            self.lock_tracked().iter().copied().collect();

        for (kind, content) in entries {
            let captured = match kind {
                PreviewKind::Image => {
                    self.host
                        .get_image(&ImageCaptureConfig {
                            content,
                            boundary,
                            image_size: Some(self.config.preview_size),
                            image_quality: None,
                            crop_by_selection: None,
                        })
                        .await
                }
                PreviewKind::Mask => {
                    self.host
                        .get_mask(&MaskCaptureConfig {
                            content,
                            reverse: None,
                            image_size: Some(self.config.preview_size),
                        })
                        .await
                }
            };

            match captured {
                Ok(outcome) if outcome.error.is_none() && !outcome.thumbnail_url.is_empty() => {
                    let key = PreviewKey {
                        document_id,
                        kind,
                        content,
                    };
                    let thumbnail = outcome.thumbnail_url;
                    self.thumbnails.set_state(move |map| {
                        map.insert(key, thumbnail);
                    });
                }
                Ok(_) => {
                    log::debug!("预览采集未返回缩略图 - {:?}/{:?}", kind, content);
                }
                Err(err) => {
                    log::debug!("预览采集失败（忽略）- {:?}/{:?}: {}", kind, content, err);
                }
            }
        }
    }
}
