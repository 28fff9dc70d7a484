//! # 传输层配置模块
//!
//! ## 设计思路
//!
//! 将传输层的可调参数集中到 [`UploadConfig`]，保证运行时行为可观测、
//! 可调整、可测试。`Default` 提供生产可用的配置。

use crate::error::UploadError;

/// 上传传输层配置。
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// 执行后端（ComfyUI）服务地址，不带结尾斜杠。
    pub base_url: String,
    /// 建立连接（TCP/TLS）超时时间（秒）。
    pub connect_timeout: u64,
    /// 单次上传请求总超时时间（秒）。
    pub upload_timeout: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8188".to_string(),
            connect_timeout: 8,
            upload_timeout: 120,
        }
    }
}

impl UploadConfig {
    /// 校验配置合法性。
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.base_url.is_empty() {
            return Err(UploadError::InvalidSource("base_url 不能为空".to_string()));
        }
        if !(1..=120).contains(&self.connect_timeout) {
            return Err(UploadError::InvalidSource(
                "connect_timeout 必须在 1~120 秒之间".to_string(),
            ));
        }
        if !(1..=3_600).contains(&self.upload_timeout) {
            return Err(UploadError::InvalidSource(
                "upload_timeout 必须在 1~3600 秒之间".to_string(),
            ));
        }
        Ok(())
    }

    /// 去掉结尾斜杠后的服务地址。
    pub(crate) fn trimmed_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
