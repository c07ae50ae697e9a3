use half::f16;
use image::{imageops, RgbaImage};

use super::TextureFormat;
use crate::error::{UnityError, UnityResult};

type BlockDecoder = fn(&[u8], usize, usize, &mut [u32]) -> Result<(), &'static str>;

/// Decodes the top mip level of `data` into a top-down image.
pub fn decode(format: TextureFormat, data: &[u8], width: u32, height: u32) -> UnityResult<RgbaImage> {
    use TextureFormat::*;

    if width == 0 || height == 0 {
        return Err(UnityError::Decode(format!("texture has no pixels ({width}x{height})")));
    }
    if let Some(expected) = format.level_size(width, height) {
        if data.len() < expected {
            return Err(UnityError::Decode(format!("{format:?} {width}x{height} needs {expected} bytes, got {}", data.len())));
        }
    }

    let decoder: BlockDecoder = match format {
        DXT1 => return Ok(texture_decoder::DXT1::decode(data, width, height)?),
        DXT5 => return Ok(texture_decoder::DXT5::decode(data, width, height)?),
        BC4 => texture2ddecoder::decode_bc4,
        BC5 => texture2ddecoder::decode_bc5,
        BC7 => texture2ddecoder::decode_bc7,
        ETC_RGB4 | ETC_RGB4_3DS => texture2ddecoder::decode_etc1,
        ETC2_RGB => texture2ddecoder::decode_etc2_rgb,
        ETC2_RGBA1 => texture2ddecoder::decode_etc2_rgba1,
        ETC2_RGBA8 | ETC_RGBA8_3DS => texture2ddecoder::decode_etc2_rgba8,
        EAC_R => texture2ddecoder::decode_eacr,
        EAC_R_SIGNED => texture2ddecoder::decode_eacr_signed,
        EAC_RG => texture2ddecoder::decode_eacrg,
        EAC_RG_SIGNED => texture2ddecoder::decode_eacrg_signed,
        ATC_RGB4 => texture2ddecoder::decode_atc_rgb4,
        ATC_RGBA8 => texture2ddecoder::decode_atc_rgba8,
        ASTC_RGB_4x4 | ASTC_RGBA_4x4 => |d, w, h, img| texture2ddecoder::decode_astc(d, w, h, 4, 4, img),
        ASTC_RGB_5x5 | ASTC_RGBA_5x5 => |d, w, h, img| texture2ddecoder::decode_astc(d, w, h, 5, 5, img),
        ASTC_RGB_6x6 | ASTC_RGBA_6x6 => |d, w, h, img| texture2ddecoder::decode_astc(d, w, h, 6, 6, img),
        ASTC_RGB_8x8 | ASTC_RGBA_8x8 => |d, w, h, img| texture2ddecoder::decode_astc(d, w, h, 8, 8, img),
        ASTC_RGB_10x10 | ASTC_RGBA_10x10 => |d, w, h, img| texture2ddecoder::decode_astc(d, w, h, 10, 10, img),
        ASTC_RGB_12x12 | ASTC_RGBA_12x12 => |d, w, h, img| texture2ddecoder::decode_astc(d, w, h, 12, 12, img),
        _ if format.pixel_size().is_some() => return decode_raw(format, data, width, height),
        _ => return Err(UnityError::UnsupportedTextureFormat(format)),
    };
    decode_blocks(decoder, data, width, height)
}

/// texture2ddecoder writes BGRA words in stored row order.
fn decode_blocks(decoder: BlockDecoder, data: &[u8], width: u32, height: u32) -> UnityResult<RgbaImage> {
    let mut pixels = vec![0u32; width as usize * height as usize];
    decoder(data, width as usize, height as usize, &mut pixels).map_err(|e| UnityError::Decode(e.to_string()))?;

    let mut buffer = Vec::with_capacity(pixels.len() * 4);
    for p in pixels {
        let [b, g, r, a] = p.to_le_bytes();
        buffer.extend_from_slice(&[r, g, b, a]);
    }
    let image = RgbaImage::from_raw(width, height, buffer).ok_or_else(|| UnityError::Decode("pixel buffer size mismatch".to_string()))?;
    Ok(imageops::flip_vertical(&image))
}

#[inline]
fn unorm(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[inline]
fn u16_le(p: &[u8], i: usize) -> u16 {
    u16::from_le_bytes([p[i], p[i + 1]])
}

#[inline]
fn f16_le(p: &[u8], i: usize) -> f32 {
    f16::from_bits(u16_le(p, i)).to_f32()
}

#[inline]
fn f32_le(p: &[u8], i: usize) -> f32 {
    f32::from_le_bytes([p[i], p[i + 1], p[i + 2], p[i + 3]])
}

fn decode_raw(format: TextureFormat, data: &[u8], width: u32, height: u32) -> UnityResult<RgbaImage> {
    use TextureFormat::*;

    let size = format.pixel_size().ok_or(UnityError::UnsupportedTextureFormat(format))?;
    let count = width as usize * height as usize;
    let mut buffer = Vec::with_capacity(count * 4);

    for p in data.chunks_exact(size).take(count) {
        let rgba: [u8; 4] = match format {
            Alpha8 => [255, 255, 255, p[0]],
            R8 => [p[0], 0, 0, 255],
            ARGB4444 => {
                let v = u16_le(p, 0);
                [((v >> 8) & 0xf) as u8 * 17, ((v >> 4) & 0xf) as u8 * 17, (v & 0xf) as u8 * 17, (v >> 12) as u8 * 17]
            }
            RGBA4444 => {
                let v = u16_le(p, 0);
                [(v >> 12) as u8 * 17, ((v >> 8) & 0xf) as u8 * 17, ((v >> 4) & 0xf) as u8 * 17, (v & 0xf) as u8 * 17]
            }
            RGB565 => {
                let v = u16_le(p, 0);
                let r = ((v >> 11) & 0x1f) as u8;
                let g = ((v >> 5) & 0x3f) as u8;
                let b = (v & 0x1f) as u8;
                [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2), 255]
            }
            R16 => [(u16_le(p, 0) >> 8) as u8, 0, 0, 255],
            RG16 => [p[0], p[1], 0, 255],
            RHalf => [unorm(f16_le(p, 0)), 0, 0, 255],
            RGB24 => [p[0], p[1], p[2], 255],
            BGR24 => [p[2], p[1], p[0], 255],
            RGBA32 => [p[0], p[1], p[2], p[3]],
            ARGB32 => [p[1], p[2], p[3], p[0]],
            BGRA32 => [p[2], p[1], p[0], p[3]],
            RGHalf => [unorm(f16_le(p, 0)), unorm(f16_le(p, 2)), 0, 255],
            RFloat => [unorm(f32_le(p, 0)), 0, 0, 255],
            RG32 => [(u16_le(p, 0) >> 8) as u8, (u16_le(p, 2) >> 8) as u8, 0, 255],
            RGB48 => [(u16_le(p, 0) >> 8) as u8, (u16_le(p, 2) >> 8) as u8, (u16_le(p, 4) >> 8) as u8, 255],
            RGBAHalf => [unorm(f16_le(p, 0)), unorm(f16_le(p, 2)), unorm(f16_le(p, 4)), unorm(f16_le(p, 6))],
            RGFloat => [unorm(f32_le(p, 0)), unorm(f32_le(p, 4)), 0, 255],
            RGBA64 => [(u16_le(p, 0) >> 8) as u8, (u16_le(p, 2) >> 8) as u8, (u16_le(p, 4) >> 8) as u8, (u16_le(p, 6) >> 8) as u8],
            RGBFloat => [unorm(f32_le(p, 0)), unorm(f32_le(p, 4)), unorm(f32_le(p, 8)), 255],
            RGBAFloat => [unorm(f32_le(p, 0)), unorm(f32_le(p, 4)), unorm(f32_le(p, 8)), unorm(f32_le(p, 12))],
            ARGBFloat => [unorm(f32_le(p, 4)), unorm(f32_le(p, 8)), unorm(f32_le(p, 12)), unorm(f32_le(p, 0))],
            _ => return Err(UnityError::UnsupportedTextureFormat(format)),
        };
        buffer.extend_from_slice(&rgba);
    }

    let image = RgbaImage::from_raw(width, height, buffer).ok_or_else(|| UnityError::Decode("pixel buffer size mismatch".to_string()))?;
    Ok(imageops::flip_vertical(&image))
}
