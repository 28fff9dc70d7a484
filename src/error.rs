//! # 统一错误类型模块
//!
//! ## 设计思路
//!
//! 上传链路中的失败来源很多（宿主采集、网络传输、来源字符串解析、
//! 主动取消），用单一枚举承载，避免各处 `.map_err(|e| e.to_string())`
//! 的字符串拼接式错误处理。
//!
//! ## 实现思路
//!
//! - 使用 `thiserror` 派生人类可读错误消息。
//! - **取消不是失败**：`Aborted` 单独成枚举分支，上层通过
//!   [`UploadError::is_abort`] 判断后静默返回，绝不写入 `upload_error`。
//! - 公开入口（执行器）从不向外抛错，错误最终都转化为状态更新；
//!   该类型只在内部 `Result` 管道中流转。

/// 采集/上传链路统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// 宿主图像采集失败（`get_image` 返回 error 字段或缺少关键输出）。
    #[error("获取图片失败: {0}")]
    ImageCapture(String),

    /// 宿主蒙版采集失败。
    #[error("获取蒙版失败: {0}")]
    MaskCapture(String),

    /// 传输层上传失败。
    #[error("上传失败: {0}")]
    Transport(String),

    /// 网络错误（reqwest 层）。
    #[error("网络错误: {0}")]
    Network(String),

    /// 来源字符串无法用于当前操作。
    #[error("来源格式错误: {0}")]
    InvalidSource(String),

    /// 操作被主动取消。不是失败，不回滚、不上报。
    #[error("操作已取消")]
    Aborted,
}

impl UploadError {
    /// 是否为主动取消。
    ///
    /// 对应宿主侧按 `error.name === "AbortError"` 的判定习惯。
    pub fn is_abort(&self) -> bool {
        matches!(self, UploadError::Aborted)
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(error: reqwest::Error) -> Self {
        UploadError::Network(error.to_string())
    }
}

impl From<UploadError> for String {
    /// 兼容仍使用字符串错误的调用点（表单侧的 `upload_error` 字段）。
    fn from(error: UploadError) -> Self {
        error.to_string()
    }
}
