//! # Photoshop 采集上传编排内核 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │              插件宿主 (Photoshop UXP / 表单层)             │
//! │                                                          │
//! │   控件 source 字符串 ── enabled 开关 ── 手动上传按钮       │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↕ 显式依赖装配（UploadContext）
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕               本库 (Rust)                         │
//! │                                                          │
//! │  ┌─ source ───── SourceDescriptor 解析/序列化（往返律）     │
//! │  │                                                       │
//! │  ├─ detail ───── ImageDetail 条目模型（uploadId 关联）      │
//! │  │                                                       │
//! │  ├─ store ────── 发布-订阅容器 + 上传状态仓（引用计数）      │
//! │  │                                                       │
//! │  ├─ upload ───── 执行器·通道登记·取消·ComfyUI 传输          │
//! │  │   ├─ binding        控件 source ↔ 通道 自动绑定         │
//! │  │   └─ scheduler      外部节奏触发的通道调度               │
//! │  │                                                       │
//! │  ├─ tracker ──── 去抖预览缩略图追踪（与上传链路解耦）        │
//! │  └─ context ──── 表单级装配入口                            │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `UploadError`（取消单列，不算失败） |
//! | [`source`] | `source` 字符串 ↔ 类型化采集描述符，通道身份键规范化 |
//! | [`detail`] | 图像条目模型：占位条目与最终条目的构造 |
//! | [`store`] | 发布-订阅状态容器与表单作用域上传状态仓 |
//! | [`upload`] | 采集-上传周期编排、通道登记、协作式取消、ComfyUI 传输 |
//! | [`tracker`] | 去抖的实时预览缩略图追踪 |
//! | [`context`] | 把上述组件按固定方式装配给一个表单实例 |
//!
//! ## 并发模型
//!
//! 并发指单运行时上多路异步操作的交错，不是并行线程语义。并发上传
//! 之间不保证完成顺序，最终状态的正确性完全依赖 `uploadId` 关联；
//! 取消是协作式的，在每个挂起点前后设检查点。

pub mod context;
pub mod detail;
pub mod error;
pub mod source;
pub mod store;
pub mod tracker;
pub mod upload;

pub use context::UploadContext;
pub use detail::ImageDetail;
pub use error::UploadError;
pub use source::{
    BoundaryRect, CaptureContent, ImageCaptureConfig, MaskCaptureConfig, SourceDescriptor,
};
pub use store::{ImagesCallback, Store, UploadState, UploadStateStore};
pub use tracker::{
    ChangeHint, PreviewKey, PreviewKind, RealtimeThumbnailTracker, TrackerConfig,
};
pub use upload::{
    AcceptedCapture, AutoCaptureBinding, CaptureOutcome, CaptureRecipe, ComfyUploadTransport,
    HostBridge,
    ManualScheduler, PassScheduler, UploadCanceller, UploadConfig, UploadExecutor, UploadFile,
    UploadPass, UploadPassRegistry, UploadPayload, UploadRequest, UploadTransport,
};
