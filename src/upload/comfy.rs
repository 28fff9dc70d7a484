//! # ComfyUI 传输实现
//!
//! ## 设计思路
//!
//! 面向 ComfyUI 后端的默认传输层：
//!
//! - 字节载荷走 `POST {base}/upload/image` 的 multipart 表单（字段
//!   `image`），响应里的 `{name, subfolder, type}` 拼成 `/view` URL；
//! - 令牌载荷表示内容已在后端输入目录，直接拼 `/view` URL，无需再传。
//!
//! ## 实现思路
//!
//! - 复用单个 reqwest 客户端，连接与总超时来自 [`UploadConfig`]。
//! - 取消在"发请求—收响应"整段上用 `select!` 协作：令牌触发即以
//!   [`UploadError::Aborted`] 返回，响应被丢弃。

use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::UploadError;

use super::config::UploadConfig;
use super::transport::{UploadFile, UploadPayload, UploadTransport};

/// `POST /upload/image` 的响应体。
#[derive(Debug, Deserialize)]
struct ComfyUploadResponse {
    name: String,
    #[serde(default)]
    subfolder: String,
    #[serde(default = "default_upload_type", rename = "type")]
    kind: String,
}

fn default_upload_type() -> String {
    "input".to_string()
}

/// ComfyUI 上传传输层。
pub struct ComfyUploadTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ComfyUploadTransport {
    /// 按配置构建传输层与复用型 HTTP 客户端。
    pub fn new(config: &UploadConfig) -> Result<Self, UploadError> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .timeout(Duration::from_secs(config.upload_timeout))
            .build()
            .map_err(|e| UploadError::Network(format!("构建 HTTP 客户端失败: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.trimmed_base_url().to_string(),
        })
    }

    /// 把上传响应（或令牌）解析为可引用的 `/view` URL。
    fn view_url(&self, name: &str, subfolder: &str, kind: &str) -> Result<String, UploadError> {
        let mut params: Vec<(&str, &str)> = vec![("filename", name)];
        if !subfolder.is_empty() {
            params.push(("subfolder", subfolder));
        }
        params.push(("type", kind));

        Url::parse_with_params(&format!("{}/view", self.base_url), &params)
            .map(|url| url.to_string())
            .map_err(|e| UploadError::Transport(format!("拼接内容地址失败: {}", e)))
    }

    async fn upload_buffer(&self, file: &UploadFile, bytes: Vec<u8>) -> Result<String, UploadError> {
        let size = bytes.len();
        let part = Part::bytes(bytes)
            .file_name(file.file_name.clone())
            .mime_str("application/octet-stream")
            .map_err(|e| UploadError::Transport(format!("构建表单分片失败: {}", e)))?;
        let form = Form::new()
            .part("image", part)
            .text("type", "input")
            .text("overwrite", "true");

        log::info!("📤 开始上传 - 文件: {} 大小: {} 字节", file.file_name, size);

        let response = self
            .client
            .post(format!("{}/upload/image", self.base_url))
            .multipart(form)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| UploadError::Transport(format!("后端拒绝上传: {}", e)))?;

        let body: ComfyUploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError::Transport(format!("解析上传响应失败: {}", e)))?;

        self.view_url(&body.name, &body.subfolder, &body.kind)
    }
}

#[async_trait::async_trait]
impl UploadTransport for ComfyUploadTransport {
    async fn upload(
        &self,
        file: UploadFile,
        cancel: &CancellationToken,
    ) -> Result<String, UploadError> {
        if cancel.is_cancelled() {
            return Err(UploadError::Aborted);
        }

        match &file.payload {
            // 令牌载荷：内容已在后端，直接解析地址，无挂起点。
            UploadPayload::Token(token) => self.view_url(token, "", "input"),
            UploadPayload::Buffer(bytes) => {
                let bytes = bytes.to_vec();
                tokio::select! {
                    _ = cancel.cancelled() => Err(UploadError::Aborted),
                    result = self.upload_buffer(&file, bytes) => result,
                }
            }
        }
    }
}
