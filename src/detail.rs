//! # 图像条目模型（detail）
//!
//! ## 设计思路
//!
//! [`ImageDetail`] 是表单值数组中的一个元素，描述一张已采集或被引用的
//! 图像/蒙版。上传子系统从不跨边界原地修改表单持有的数组，只通过回调
//! **提议**一个新数组；占位条目与最终条目的构造集中在这里，保证
//! `uploadId` 关联字段的写入方式全仓一致。

use serde::{Deserialize, Serialize};

/// 一张已采集或被引用的图像/蒙版条目。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDetail {
    /// 最终内容地址（磁盘 blob、远端 URL，上传未完成时为空串）。
    pub url: String,
    /// 不透明来源字符串，见 [`crate::source::SourceDescriptor`]。
    pub source: String,
    /// 小图预览，与 `url` 相互独立。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// 是否随采集配方保持实时同步。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto: Option<bool>,
    /// 上传关联键，占位条目凭此被最终结果找到并替换。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_id: Option<String>,
    /// 渲染期临时标记：正在上传，控件应置灰。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_uploading: Option<bool>,
}

impl ImageDetail {
    /// 构造占位条目：缩略图可见、最终 URL 未知。
    pub fn placeholder(source: &str, thumbnail: &str, upload_id: &str, auto: bool) -> Self {
        Self {
            url: String::new(),
            source: source.to_string(),
            thumbnail: Some(thumbnail.to_string()),
            auto: auto.then_some(true),
            upload_id: Some(upload_id.to_string()),
            is_uploading: Some(true),
        }
    }

    /// 上传完成后的最终条目，保留占位条目的 `auto` 语义。
    pub fn uploaded(url: &str, source: &str, thumbnail: &str, auto: bool) -> Self {
        Self {
            url: url.to_string(),
            source: source.to_string(),
            thumbnail: Some(thumbnail.to_string()),
            auto: auto.then_some(true),
            upload_id: None,
            is_uploading: None,
        }
    }

    /// 该条目是否匹配给定关联键。
    pub fn matches_upload_id(&self, upload_id: &str) -> bool {
        self.upload_id.as_deref() == Some(upload_id)
    }
}

#[cfg(test)]
mod tests {
    use super::ImageDetail;

    #[test]
    fn placeholder_has_no_url_but_visible_thumbnail() {
        let detail = ImageDetail::placeholder("disk", "thumb://1", "u-1", false);
        assert!(detail.url.is_empty());
        assert_eq!(detail.thumbnail.as_deref(), Some("thumb://1"));
        assert_eq!(detail.is_uploading, Some(true));
        assert!(detail.matches_upload_id("u-1"));
        assert!(!detail.matches_upload_id("u-2"));
    }

    #[test]
    fn wire_form_uses_camel_case() {
        let detail = ImageDetail::placeholder("disk", "t", "u-1", true);
        let json = serde_json::to_string(&detail).expect("序列化失败");
        assert!(json.contains("\"uploadId\""));
        assert!(json.contains("\"isUploading\""));
        assert!(!json.contains("upload_id"));
    }

    #[test]
    fn uploaded_entry_drops_correlation_key() {
        let detail = ImageDetail::uploaded("https://x/1.png", "remote", "t", false);
        assert!(detail.upload_id.is_none());
        assert!(detail.is_uploading.is_none());
        assert_eq!(detail.auto, None);
    }
}
