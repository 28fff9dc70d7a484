//! # 上传编排模块（upload）
//!
//! ## 设计思路
//!
//! 将"采集 → 占位 → 传输 → 替换/回滚"的完整生命周期按职责拆分为
//! 多个子模块，避免单文件膨胀与耦合：
//!
//! - `host`：宿主桥接口（`get_image` / `get_mask`，不透明异步调用）
//! - `transport`：传输层接口与载荷模型
//! - `comfy`：面向 ComfyUI 后端的默认传输实现
//! - `executor`：编排单次采集-上传周期（快照、占位、取消、回滚）
//! - `canceller`：在途上传的取消令牌登记簿
//! - `registry` / `scheduler`：自动同步通道的登记与外部调度
//! - `binding`：控件 `source` 与通道登记之间的自动绑定
//! - `config`：传输层可调参数
//!
//! ## 实现思路
//!
//! 手动上传与自动通道走同一个执行器；区别只在入口——手动操作直接
//! 调用执行器，自动通道由外部调度器按节奏触发。并发上传互不排序，
//! 最终一致性完全依赖 `uploadId` 关联。

mod binding;
mod canceller;
mod comfy;
mod config;
mod executor;
mod host;
mod registry;
mod scheduler;
mod transport;

pub use binding::AutoCaptureBinding;
pub use canceller::UploadCanceller;
pub use comfy::ComfyUploadTransport;
pub use config::UploadConfig;
pub use executor::{CaptureRecipe, UploadExecutor, UploadRequest};
pub use host::{AcceptedCapture, CaptureOutcome, HostBridge};
pub use registry::{UploadPass, UploadPassRegistry};
pub use scheduler::{ManualScheduler, PassScheduler};
pub use transport::{UploadFile, UploadPayload, UploadTransport};
