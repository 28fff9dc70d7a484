//! # 实时缩略图追踪模块（tracker）
//!
//! ## 设计思路
//!
//! 预览缩略图的保鲜与上传链路完全解耦：追踪器只观察宿主侧变化
//! （画布、选区、边界），按去抖窗口合并后做尽力而为的预览采集，
//! 结果写入独立的预览缩略图表，失败静默吞掉，永不污染表单错误。
//!
//! - [`debounce`]：与 UI 框架无关的去抖工具（任务 + 取消令牌）
//! - [`realtime`]：按文档维护"空闲 → 追踪中"状态机的追踪器本体

mod debounce;
mod realtime;

pub use debounce::Debouncer;
pub use realtime::{
    ChangeHint, PreviewKey, PreviewKind, RealtimeThumbnailTracker, TrackerConfig,
};
