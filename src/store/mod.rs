//! # 状态存储模块（store）
//!
//! ## 设计思路
//!
//! 表单作用域内的共享可变状态集中在两层：
//!
//! - [`observable`]：通用的发布-订阅状态容器 [`Store`]，
//!   `get_state / set_state / subscribe` 三件套，不绑定任何 UI 框架。
//! - [`upload_state`]：建立在 [`Store`] 之上的上传状态仓
//!   [`UploadStateStore`]，承载引用计数式 `uploading` 标志、
//!   错误消息、缩略图与用于回滚的"最近一次图像列表"。
//!
//! ## 实现思路
//!
//! 所有变更都"读最新、改最新"：mutator 在锁内对最新状态就地修改，
//! 绝不基于闭包捕获的过期快照写回，避免并发上传乱序完成时丢失更新。

mod observable;
mod upload_state;

pub use observable::{Store, SubscriptionId};
pub use upload_state::{ImagesCallback, UploadState, UploadStateStore};
