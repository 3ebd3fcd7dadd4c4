//! 多媒体附件

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 附件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Video,
    Audio,
    Pdf,
    Document,
}

impl MediaType {
    /// 获取显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            MediaType::Image => "图片",
            MediaType::Video => "视频",
            MediaType::Audio => "音频",
            MediaType::Pdf => "PDF",
            MediaType::Document => "文档",
        }
    }
}

/// 消息附件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaContent {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    /// 原始字节，序列化为 base64；克隆只增加引用计数
    #[serde(with = "base64_bytes")]
    pub data: Bytes,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl MediaContent {
    pub fn new(media_type: MediaType, data: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            media_type,
            data: data.into(),
            mime_type: mime_type.into(),
            file_name: None,
        }
    }

    /// 图片附件
    pub fn image(data: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self::new(MediaType::Image, data, mime_type)
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// `data:<mime>;base64,<data>` 形式的内联地址
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}
