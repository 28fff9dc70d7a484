//! # 传输层接口（transport）
//!
//! ## 设计思路
//!
//! 传输层把"令牌或字节"换成最终可引用的 URL，是上传周期里唯一
//! 接触网络的环节。接口保持最小：一个异步方法加一个取消令牌，
//! 取消在请求与响应之间协作式生效。

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::error::UploadError;

/// 待上传载荷：宿主文件令牌，或采集到的原始字节。
#[derive(Debug, Clone)]
pub enum UploadPayload {
    /// 宿主侧文件令牌。
    Token(String),
    /// 原始字节。
    Buffer(Bytes),
}

/// 一次上传的完整输入。
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub payload: UploadPayload,
    pub file_name: String,
}

/// 上传传输层。
#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// 执行上传，成功时返回最终内容 URL。
    ///
    /// 实现必须尊重 `cancel`：令牌触发后尽快以
    /// [`UploadError::Aborted`] 返回，不得继续产生副作用。
    async fn upload(
        &self,
        file: UploadFile,
        cancel: &CancellationToken,
    ) -> Result<String, UploadError>;
}
