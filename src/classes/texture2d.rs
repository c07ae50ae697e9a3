use serde::Deserialize;

use super::TypelessData;
use crate::error::UnityResult;
use crate::texture::TextureFormat;

/// Location of texture bytes kept outside the serialized file (`.resS`).
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamingInfo {
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub path: String,
}

impl StreamingInfo {
    pub fn is_empty(&self) -> bool {
        self.size == 0 || self.path.is_empty()
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Texture2D {
    #[serde(rename = "m_Name", default)]
    pub name: String,
    #[serde(rename = "m_Width")]
    pub width: i32,
    #[serde(rename = "m_Height")]
    pub height: i32,
    #[serde(rename = "m_CompleteImageSize", default)]
    pub complete_image_size: u64,
    #[serde(rename = "m_TextureFormat")]
    pub texture_format: i32,
    #[serde(rename = "m_MipCount", default)]
    pub mip_count: Option<i32>,
    #[serde(rename = "m_MipMap", default)]
    pub mip_map: Option<bool>,
    #[serde(rename = "m_IsReadable", default)]
    pub is_readable: bool,
    #[serde(rename = "m_ImageCount", default)]
    pub image_count: i32,
    #[serde(rename = "m_TextureDimension", default)]
    pub texture_dimension: i32,
    #[serde(rename = "image data", default)]
    pub image_data: TypelessData,
    #[serde(rename = "m_StreamData", default)]
    pub stream_data: Option<StreamingInfo>,
}

impl Texture2D {
    pub fn format(&self) -> UnityResult<TextureFormat> {
        TextureFormat::from_raw(self.texture_format)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width.max(0) as u32, self.height.max(0) as u32)
    }

    /// The streamed payload location, if the pixels are not stored inline.
    pub fn streamed(&self) -> Option<&StreamingInfo> {
        match &self.stream_data {
            Some(info) if self.image_data.0.is_empty() && !info.is_empty() => Some(info),
            _ => None,
        }
    }
}
