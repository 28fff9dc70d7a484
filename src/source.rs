//! # 来源描述符模块（source）
//!
//! ## 设计思路
//!
//! 控件值里的 `source` 字段是一个不透明字符串：可能是字面量
//! （`"disk"` / `"remote"`），也可能是描述 Photoshop 采集配方的 JSON。
//! 本模块负责在字符串与强类型描述符之间做确定性、无损的互转，
//! 让上层（通道注册、自动绑定）只面对类型化的配方。
//!
//! ## 实现思路
//!
//! - 解析是**全函数**：任何输入都能得到一个描述符，失败一律退化为
//!   [`SourceDescriptor::Unknown`]，绝不向上抛错。
//! - 显式判别字段 `__psType`（`"image"` / `"mask"`）优先；缺失时按
//!   字段形状推断：`{content, boundary}` → 图像，`{content, reverse}` → 蒙版。
//! - 两个 Photoshop 变体满足往返律：`parse(serialize(d)) == d`。
//! - 通道身份键（`pass_key`）在这里统一规范化，图像/蒙版各占一个
//!   前缀命名空间，保证两类通道永不相撞。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 整画布哨兵：宽高同时达到该值视为"整个画布"。
pub const WHOLE_CANVAS_SENTINEL: f64 = 999_999.0;

/// 采集边界矩形。
///
/// 由宿主按活动文档提供，本核心只透传、不修改。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryRect {
    pub left_distance: f64,
    pub top_distance: f64,
    pub right_distance: f64,
    pub bottom_distance: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundaryRect {
    /// 构造"整个画布"哨兵边界。
    pub fn whole_canvas() -> Self {
        Self {
            left_distance: 0.0,
            top_distance: 0.0,
            right_distance: 0.0,
            bottom_distance: 0.0,
            width: WHOLE_CANVAS_SENTINEL,
            height: WHOLE_CANVAS_SENTINEL,
        }
    }

    /// 是否为"整个画布"哨兵。
    pub fn is_whole_canvas(&self) -> bool {
        self.width >= WHOLE_CANVAS_SENTINEL && self.height >= WHOLE_CANVAS_SENTINEL
    }
}

/// 采集内容类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureContent {
    /// 整个画布合成结果。
    Canvas,
    /// 当前图层。
    Curlayer,
    /// 当前选区。
    Selection,
}

impl CaptureContent {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Canvas => "canvas",
            Self::Curlayer => "curlayer",
            Self::Selection => "selection",
        }
    }
}

/// Photoshop 图像采集配置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageCaptureConfig {
    pub content: CaptureContent,
    pub boundary: BoundaryRect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_quality: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop_by_selection: Option<bool>,
}

/// Photoshop 蒙版采集配置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskCaptureConfig {
    pub content: CaptureContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_size: Option<u32>,
}

/// `source` 字符串的类型化视图。
#[derive(Debug, Clone, PartialEq)]
pub enum SourceDescriptor {
    /// Photoshop 图像采集配方。
    PhotoshopImage(ImageCaptureConfig),
    /// Photoshop 蒙版采集配方。
    PhotoshopMask(MaskCaptureConfig),
    /// 本地磁盘文件。
    Disk,
    /// 远端 URL 引用。
    Remote,
    /// 无法识别的来源，不携带任何元数据。
    Unknown,
}

/// JSON 判别字段名。
const PS_TYPE_KEY: &str = "__psType";
const PS_TYPE_IMAGE: &str = "image";
const PS_TYPE_MASK: &str = "mask";

impl SourceDescriptor {
    /// 从不透明 `source` 字符串解析描述符。
    ///
    /// 永不失败：JSON 解不开就按字面量匹配，字面量也不认识则返回
    /// [`SourceDescriptor::Unknown`]。
    pub fn parse(source: &str) -> Self {
        match serde_json::from_str::<Value>(source) {
            Ok(Value::Object(map)) => Self::parse_object(map),
            // 合法 JSON 但不是对象（数字、数组、带引号字符串等）：
            // 与解析失败同样处理，回落到字面量匹配。
            Ok(_) | Err(_) => Self::parse_literal(source),
        }
    }

    fn parse_object(map: serde_json::Map<String, Value>) -> Self {
        let tag = map.get(PS_TYPE_KEY).and_then(Value::as_str);
        let value = Value::Object(map.clone());

        match tag {
            Some(PS_TYPE_IMAGE) => serde_json::from_value::<ImageCaptureConfig>(value)
                .map(Self::PhotoshopImage)
                .unwrap_or(Self::Unknown),
            Some(PS_TYPE_MASK) => serde_json::from_value::<MaskCaptureConfig>(value)
                .map(Self::PhotoshopMask)
                .unwrap_or(Self::Unknown),
            Some(_) => Self::Unknown,
            // 无显式判别字段：按字段形状推断。
            None => {
                if map.contains_key("content") && map.contains_key("boundary") {
                    serde_json::from_value::<ImageCaptureConfig>(value)
                        .map(Self::PhotoshopImage)
                        .unwrap_or(Self::Unknown)
                } else if map.contains_key("content") && map.contains_key("reverse") {
                    serde_json::from_value::<MaskCaptureConfig>(value)
                        .map(Self::PhotoshopMask)
                        .unwrap_or(Self::Unknown)
                } else {
                    Self::Unknown
                }
            }
        }
    }

    fn parse_literal(source: &str) -> Self {
        match source.trim().trim_matches('"') {
            "disk" => Self::Disk,
            "remote" => Self::Remote,
            _ => Self::Unknown,
        }
    }

    /// 序列化为 `source` 字符串，是 [`SourceDescriptor::parse`] 的逆。
    ///
    /// 两个 Photoshop 变体输出带 `__psType` 判别字段的 JSON；
    /// `Disk` / `Remote` 输出字面量；`Unknown` 输出空字符串。
    pub fn serialize(&self) -> String {
        match self {
            Self::PhotoshopImage(config) => serialize_tagged(config, PS_TYPE_IMAGE),
            Self::PhotoshopMask(config) => serialize_tagged(config, PS_TYPE_MASK),
            Self::Disk => "disk".to_string(),
            Self::Remote => "remote".to_string(),
            Self::Unknown => String::new(),
        }
    }

    /// 是否为 Photoshop 采集配方（图像或蒙版）。
    pub fn is_photoshop(&self) -> bool {
        matches!(self, Self::PhotoshopImage(_) | Self::PhotoshopMask(_))
    }
}

fn serialize_tagged<T: Serialize>(config: &T, tag: &str) -> String {
    match serde_json::to_value(config) {
        Ok(Value::Object(mut map)) => {
            map.insert(PS_TYPE_KEY.to_string(), Value::String(tag.to_string()));
            Value::Object(map).to_string()
        }
        // 配置结构体序列化只会产出对象；此分支仅为穷尽性兜底。
        _ => String::new(),
    }
}

impl ImageCaptureConfig {
    /// 通道身份键：content + boundary + cropBySelection。
    ///
    /// 注意 `image_size` / `image_quality` 不参与身份，只影响采集质量，
    /// 同一配方换分辨率不应产生第二条通道。
    pub fn pass_key(&self) -> String {
        let b = &self.boundary;
        format!(
            "image:{}:{},{},{},{},{},{}:{}",
            self.content.as_str(),
            b.left_distance,
            b.top_distance,
            b.right_distance,
            b.bottom_distance,
            b.width,
            b.height,
            self.crop_by_selection.unwrap_or(false),
        )
    }
}

impl MaskCaptureConfig {
    /// 通道身份键：content + reverse + imageSize。
    pub fn pass_key(&self) -> String {
        format!(
            "mask:{}:{}:{}",
            self.content.as_str(),
            self.reverse.unwrap_or(false),
            self.image_size.map_or(-1i64, i64::from),
        )
    }
}
