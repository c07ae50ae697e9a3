//! Pixel codecs between unity texture payloads and RGBA images.
mod decode;
mod encode;

pub use decode::decode;
pub use encode::encode;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::{UnityError, UnityResult};

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum TextureFormat {
    Alpha8 = 1,
    ARGB4444 = 2,
    RGB24 = 3,
    RGBA32 = 4,
    ARGB32 = 5,
    ARGBFloat = 6,
    RGB565 = 7,
    BGR24 = 8,
    R16 = 9,
    DXT1 = 10,
    DXT3 = 11,
    DXT5 = 12,
    RGBA4444 = 13,
    BGRA32 = 14,
    RHalf = 15,
    RGHalf = 16,
    RGBAHalf = 17,
    RFloat = 18,
    RGFloat = 19,
    RGBAFloat = 20,
    YUY2 = 21,
    RGB9e5Float = 22,
    RGBFloat = 23,
    BC6H = 24,
    BC7 = 25,
    BC4 = 26,
    BC5 = 27,
    DXT1Crunched = 28,
    DXT5Crunched = 29,
    PVRTC_RGB2 = 30,
    PVRTC_RGBA2 = 31,
    PVRTC_RGB4 = 32,
    PVRTC_RGBA4 = 33,
    ETC_RGB4 = 34,
    ATC_RGB4 = 35,
    ATC_RGBA8 = 36,
    EAC_R = 41,
    EAC_R_SIGNED = 42,
    EAC_RG = 43,
    EAC_RG_SIGNED = 44,
    ETC2_RGB = 45,
    ETC2_RGBA1 = 46,
    ETC2_RGBA8 = 47,
    ASTC_RGB_4x4 = 48,
    ASTC_RGB_5x5 = 49,
    ASTC_RGB_6x6 = 50,
    ASTC_RGB_8x8 = 51,
    ASTC_RGB_10x10 = 52,
    ASTC_RGB_12x12 = 53,
    ASTC_RGBA_4x4 = 54,
    ASTC_RGBA_5x5 = 55,
    ASTC_RGBA_6x6 = 56,
    ASTC_RGBA_8x8 = 57,
    ASTC_RGBA_10x10 = 58,
    ASTC_RGBA_12x12 = 59,
    ETC_RGB4_3DS = 60,
    ETC_RGBA8_3DS = 61,
    RG16 = 62,
    R8 = 63,
    ETC_RGB4Crunched = 64,
    ETC2_RGBA8Crunched = 65,
    ASTC_HDR_4x4 = 66,
    ASTC_HDR_5x5 = 67,
    ASTC_HDR_6x6 = 68,
    ASTC_HDR_8x8 = 69,
    ASTC_HDR_10x10 = 70,
    ASTC_HDR_12x12 = 71,
    RG32 = 72,
    RGB48 = 73,
    RGBA64 = 74,
}

impl TextureFormat {
    pub fn from_raw(raw: i32) -> UnityResult<Self> {
        Self::try_from(raw).map_err(|_| UnityError::UnknownTextureFormat(raw))
    }

    /// Bytes per pixel of the uncompressed formats.
    pub fn pixel_size(&self) -> Option<usize> {
        use TextureFormat::*;
        Some(match self {
            Alpha8 | R8 => 1,
            ARGB4444 | RGBA4444 | RGB565 | R16 | RG16 | RHalf => 2,
            RGB24 | BGR24 => 3,
            RGBA32 | ARGB32 | BGRA32 | RGHalf | RFloat | RG32 => 4,
            RGB48 => 6,
            RGBAHalf | RGFloat | RGBA64 => 8,
            RGBFloat => 12,
            RGBAFloat | ARGBFloat => 16,
            _ => return None,
        })
    }

    /// Block footprint and byte size of block compressed formats.
    pub fn block_info(&self) -> Option<(u32, u32, usize)> {
        use TextureFormat::*;
        Some(match self {
            DXT1 | BC4 | ETC_RGB4 | ETC_RGB4_3DS | ETC2_RGB | ETC2_RGBA1 | EAC_R | EAC_R_SIGNED | ATC_RGB4 => (4, 4, 8),
            DXT3 | DXT5 | BC5 | BC6H | BC7 | ETC2_RGBA8 | ETC_RGBA8_3DS | EAC_RG | EAC_RG_SIGNED | ATC_RGBA8 => (4, 4, 16),
            ASTC_RGB_4x4 | ASTC_RGBA_4x4 | ASTC_HDR_4x4 => (4, 4, 16),
            ASTC_RGB_5x5 | ASTC_RGBA_5x5 | ASTC_HDR_5x5 => (5, 5, 16),
            ASTC_RGB_6x6 | ASTC_RGBA_6x6 | ASTC_HDR_6x6 => (6, 6, 16),
            ASTC_RGB_8x8 | ASTC_RGBA_8x8 | ASTC_HDR_8x8 => (8, 8, 16),
            ASTC_RGB_10x10 | ASTC_RGBA_10x10 | ASTC_HDR_10x10 => (10, 10, 16),
            ASTC_RGB_12x12 | ASTC_RGBA_12x12 | ASTC_HDR_12x12 => (12, 12, 16),
            _ => return None,
        })
    }

    /// Size of the top mip level, when the format has a fixed layout.
    pub fn level_size(&self, width: u32, height: u32) -> Option<usize> {
        if let Some(size) = self.pixel_size() {
            return Some(width as usize * height as usize * size);
        }
        let (bw, bh, size) = self.block_info()?;
        Some(width.div_ceil(bw) as usize * height.div_ceil(bh) as usize * size)
    }
}
