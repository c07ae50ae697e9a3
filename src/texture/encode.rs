use half::f16;
use image::{imageops, RgbaImage};

use super::TextureFormat;
use crate::error::{UnityError, UnityResult};

#[inline]
fn unit(v: u8) -> f32 {
    v as f32 / 255.0
}

#[inline]
fn wide(v: u8) -> [u8; 2] {
    (v as u16 * 257).to_le_bytes()
}

#[inline]
fn half(v: u8) -> [u8; 2] {
    f16::from_f32(unit(v)).to_bits().to_le_bytes()
}

#[inline]
fn nibble(v: u8) -> u16 {
    ((v as u16 * 15 + 127) / 255) & 0xf
}

/// Encodes a top-down image as the top mip level of `format`.
/// Formats without an encoder return [`UnityError::UnsupportedTextureFormat`].
pub fn encode(format: TextureFormat, image: &RgbaImage) -> UnityResult<Vec<u8>> {
    use TextureFormat::*;

    match format {
        DXT1 => return Ok(texture_decoder::DXT1::encode(image)),
        DXT5 => return Ok(texture_decoder::DXT5::encode(image)),
        _ => {}
    }

    let size = format.pixel_size().ok_or(UnityError::UnsupportedTextureFormat(format))?;
    let flipped = imageops::flip_vertical(image);
    let mut out = Vec::with_capacity(flipped.width() as usize * flipped.height() as usize * size);

    for pixel in flipped.pixels() {
        let [r, g, b, a] = pixel.0;
        match format {
            Alpha8 => out.push(a),
            R8 => out.push(r),
            R16 => out.extend_from_slice(&wide(r)),
            RG16 => out.extend_from_slice(&[r, g]),
            RG32 => {
                out.extend_from_slice(&wide(r));
                out.extend_from_slice(&wide(g));
            }
            RGB24 => out.extend_from_slice(&[r, g, b]),
            BGR24 => out.extend_from_slice(&[b, g, r]),
            RGB48 => {
                for c in [r, g, b] {
                    out.extend_from_slice(&wide(c));
                }
            }
            RGBA32 => out.extend_from_slice(&[r, g, b, a]),
            ARGB32 => out.extend_from_slice(&[a, r, g, b]),
            BGRA32 => out.extend_from_slice(&[b, g, r, a]),
            RGBA64 => {
                for c in [r, g, b, a] {
                    out.extend_from_slice(&wide(c));
                }
            }
            RGB565 => {
                let v = ((r as u16 * 31 + 127) / 255) << 11 | ((g as u16 * 63 + 127) / 255) << 5 | (b as u16 * 31 + 127) / 255;
                out.extend_from_slice(&v.to_le_bytes());
            }
            ARGB4444 => {
                let v = nibble(a) << 12 | nibble(r) << 8 | nibble(g) << 4 | nibble(b);
                out.extend_from_slice(&v.to_le_bytes());
            }
            RGBA4444 => {
                let v = nibble(r) << 12 | nibble(g) << 8 | nibble(b) << 4 | nibble(a);
                out.extend_from_slice(&v.to_le_bytes());
            }
            RHalf => out.extend_from_slice(&half(r)),
            RGHalf => {
                out.extend_from_slice(&half(r));
                out.extend_from_slice(&half(g));
            }
            RGBAHalf => {
                for c in [r, g, b, a] {
                    out.extend_from_slice(&half(c));
                }
            }
            RFloat => out.extend_from_slice(&unit(r).to_le_bytes()),
            RGFloat => {
                for c in [r, g] {
                    out.extend_from_slice(&unit(c).to_le_bytes());
                }
            }
            RGBFloat => {
                for c in [r, g, b] {
                    out.extend_from_slice(&unit(c).to_le_bytes());
                }
            }
            RGBAFloat => {
                for c in [r, g, b, a] {
                    out.extend_from_slice(&unit(c).to_le_bytes());
                }
            }
            ARGBFloat => {
                for c in [a, r, g, b] {
                    out.extend_from_slice(&unit(c).to_le_bytes());
                }
            }
            _ => return Err(UnityError::UnsupportedTextureFormat(format)),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::decode;
    use image::Rgba;

    fn sample() -> RgbaImage {
        let mut image = RgbaImage::new(3, 2);
        image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        image.put_pixel(2, 1, Rgba([0, 0, 255, 0]));
        image.put_pixel(1, 1, Rgba([255, 255, 255, 255]));
        image
    }

    #[test]
    fn rgba32_is_stored_bottom_up() {
        let data = encode(TextureFormat::RGBA32, &sample()).unwrap();
        assert_eq!(data.len(), 24);
        // stored row 0 is the bottom image row
        assert_eq!(&data[8..12], &[0, 0, 255, 0]);
        assert_eq!(&data[12..16], &[255, 0, 0, 255]);
    }

    #[test]
    fn exact_formats_decode_to_the_same_image() {
        for format in [TextureFormat::RGBA32, TextureFormat::ARGB32, TextureFormat::BGRA32, TextureFormat::RGBA64, TextureFormat::RGBAFloat] {
            let data = encode(format, &sample()).unwrap();
            assert_eq!(decode(format, &data, 3, 2).unwrap(), sample(), "{format:?}");
        }
    }

    #[test]
    fn lossy_formats_keep_extremes() {
        for format in [TextureFormat::RGB565, TextureFormat::ARGB4444, TextureFormat::RGBA4444, TextureFormat::RGBAHalf] {
            let data = encode(format, &sample()).unwrap();
            let decoded = decode(format, &data, 3, 2).unwrap();
            assert_eq!(decoded.get_pixel(0, 0)[0], 255, "{format:?}");
            assert_eq!(decoded.get_pixel(1, 1)[2], 255, "{format:?}");
        }
    }

    #[test]
    fn compressed_formats_without_encoder_are_rejected() {
        let err = encode(TextureFormat::ASTC_RGB_4x4, &sample()).unwrap_err();
        assert!(matches!(err, UnityError::UnsupportedTextureFormat(TextureFormat::ASTC_RGB_4x4)));
        assert!(encode(TextureFormat::BC7, &sample()).is_err());
    }

    #[test]
    fn dxt_output_sizes() {
        assert_eq!(encode(TextureFormat::DXT1, &sample()).unwrap().len(), 8);
        assert_eq!(encode(TextureFormat::DXT5, &sample()).unwrap().len(), 16);
    }
}
