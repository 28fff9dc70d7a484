//! # 宿主桥接口（host）
//!
//! ## 设计思路
//!
//! Photoshop 宿主的采集调用对本核心是不透明的异步 RPC：只约定输入
//! 输出，不关心内部实现。宿主侧失败有两种表达——`Err` 返回，或在
//! 成功返回里携带 `error` 字段；两者在执行器里统一按采集失败处理。

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;

use crate::error::UploadError;
use crate::source::{BoundaryRect, ImageCaptureConfig, MaskCaptureConfig};

use super::transport::UploadPayload;

/// 一次宿主采集调用的输出。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaptureOutcome {
    /// 采集结果的缩略图地址。
    #[serde(default)]
    pub thumbnail_url: String,
    /// 宿主侧文件令牌，传输层可凭此换取最终 URL。
    #[serde(default)]
    pub file_token: Option<String>,
    /// 采集到的原始字节（与 `file_token` 二选一）。
    #[serde(skip)]
    pub buffer: Option<Bytes>,
    /// 本次采集对应的 `source` 字符串，回填到图像条目。
    #[serde(default)]
    pub source: String,
    /// 宿主侧错误描述。存在即视为采集失败。
    #[serde(default)]
    pub error: Option<String>,
}

/// 通过校验的采集结果：载荷、缩略图与来源保证齐备。
#[derive(Debug)]
pub struct AcceptedCapture {
    pub payload: UploadPayload,
    pub thumbnail_url: String,
    pub source: String,
}

impl CaptureOutcome {
    /// 校验采集结果并提取可上传内容，字节优先于令牌。
    ///
    /// 拒绝条件：宿主报 `error`，或缺少缩略图/来源，或既无令牌也无字节；
    /// 返回的 `Err` 是用户可读的原因。这是采集失败判定的唯一入口。
    pub fn accept(self) -> Result<AcceptedCapture, String> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if self.thumbnail_url.is_empty() || self.source.is_empty() {
            return Err("宿主未返回缩略图或来源".to_string());
        }
        let payload = if let Some(buffer) = self.buffer {
            UploadPayload::Buffer(buffer)
        } else if let Some(token) = self.file_token {
            UploadPayload::Token(token)
        } else {
            return Err("宿主未返回可上传的内容".to_string());
        };
        Ok(AcceptedCapture {
            payload,
            thumbnail_url: self.thumbnail_url,
            source: self.source,
        })
    }
}

/// Photoshop 宿主桥。
///
/// 实现方是插件宿主环境；测试里用脚本化的替身。
#[async_trait]
pub trait HostBridge: Send + Sync {
    /// 按配置采集图像。
    async fn get_image(&self, params: &ImageCaptureConfig) -> Result<CaptureOutcome, UploadError>;

    /// 按配置采集蒙版。
    async fn get_mask(&self, params: &MaskCaptureConfig) -> Result<CaptureOutcome, UploadError>;

    /// 当前活动文档 ID，无打开文档时为 `None`。
    fn active_document_id(&self) -> Option<i64> {
        None
    }

    /// 指定文档的工作边界，未设置时为 `None`。
    fn work_boundary(&self, _document_id: i64) -> Option<BoundaryRect> {
        None
    }
}
