use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use image::RgbaImage;
use std::io::{Cursor, Read};

use super::{color_endpoints, nearest, put_block, rgb565_to_rgb888, take_block};
use crate::error::DecodeImageError;

pub struct DXT5;

impl DXT5 {
    pub const BLOCK_SIZE: usize = 16;

    pub fn decode(data: &[u8], width: u32, height: u32) -> Result<RgbaImage, DecodeImageError> {
        let expected = crate::block_data_size(width, height, Self::BLOCK_SIZE);
        if data.len() < expected {
            return Err(DecodeImageError::NotEnoughData { expected, actual: data.len() });
        }

        let mut buffer = vec![0u8; width as usize * height as usize * 4];
        let blocks_x = width.div_ceil(4);

        for (i, chunk) in data[..expected].chunks(Self::BLOCK_SIZE).enumerate() {
            let pixels_in_block = Self::decode_block(chunk)?;

            let block_x = (i as u32 % blocks_x) * 4;
            let block_y = (i as u32 / blocks_x) * 4;
            put_block(&mut buffer, width, height, block_x, block_y, &pixels_in_block);
        }
        RgbaImage::from_raw(width, height, buffer).ok_or(DecodeImageError::ImageDecode)
    }

    pub fn encode(image: &RgbaImage) -> Vec<u8> {
        let (width, height) = image.dimensions();
        let mut out = Vec::with_capacity(crate::block_data_size(width, height, Self::BLOCK_SIZE));
        for block_y in (0..height).step_by(4) {
            for block_x in (0..width).step_by(4) {
                Self::encode_block(&take_block(image, block_x, block_y), &mut out);
            }
        }
        out
    }

    fn alpha_palette(alpha0: u8, alpha1: u8) -> [u8; 8] {
        let mut alphas = [0u8; 8];
        alphas[0] = alpha0;
        alphas[1] = alpha1;
        if alpha0 > alpha1 {
            for (i, alpha) in alphas.iter_mut().enumerate().skip(2) {
                *alpha = (((8 - i) as u16 * alpha0 as u16 + (i - 1) as u16 * alpha1 as u16) / 7) as u8;
            }
        } else {
            for (i, alpha) in alphas.iter_mut().enumerate().take(6).skip(2) {
                *alpha = (((6 - i) as u16 * alpha0 as u16 + (i - 1) as u16 * alpha1 as u16) / 5) as u8;
            }
            alphas[6] = 0;
            alphas[7] = 255;
        }
        alphas
    }

    fn color_palette(c0: u16, c1: u16) -> [[u8; 3]; 4] {
        let (r0, g0, b0) = rgb565_to_rgb888(c0);
        let (r1, g1, b1) = rgb565_to_rgb888(c1);
        [
            [r0, g0, b0],
            [r1, g1, b1],
            [((2 * r0 as u16 + r1 as u16) / 3) as u8, ((2 * g0 as u16 + g1 as u16) / 3) as u8, ((2 * b0 as u16 + b1 as u16) / 3) as u8],
            [((r0 as u16 + 2 * r1 as u16) / 3) as u8, ((g0 as u16 + 2 * g1 as u16) / 3) as u8, ((b0 as u16 + 2 * b1 as u16) / 3) as u8],
        ]
    }

    fn encode_block(pixels: &[[u8; 4]; 16], out: &mut Vec<u8>) {
        let alpha0 = pixels.iter().map(|p| p[3]).max().unwrap_or(255);
        let alpha1 = pixels.iter().map(|p| p[3]).min().unwrap_or(255);
        let alphas = Self::alpha_palette(alpha0, alpha1);

        let mut alpha_bits = 0u64;
        for (i, p) in pixels.iter().enumerate() {
            let index = alphas
                .iter()
                .enumerate()
                .min_by_key(|(_, a)| (**a as i16 - p[3] as i16).abs())
                .map(|(index, _)| index as u64)
                .unwrap_or(0);
            alpha_bits |= index << (3 * i);
        }

        let (c0, c1) = color_endpoints(pixels, false);
        let palette = Self::color_palette(c0, c1);
        let mut indices = 0u32;
        for (i, p) in pixels.iter().enumerate() {
            indices |= nearest(&palette, p) << (2 * i);
        }

        out.push(alpha0);
        out.push(alpha1);
        out.extend_from_slice(&alpha_bits.to_le_bytes()[..6]);
        // writes into a Vec cannot fail
        let _ = out.write_u16::<LittleEndian>(c0);
        let _ = out.write_u16::<LittleEndian>(c1);
        let _ = out.write_u32::<LittleEndian>(indices);
    }

    fn decode_block(data: &[u8]) -> std::io::Result<[[u8; 4]; 16]> {
        let mut reader = Cursor::new(data);

        let alpha0 = reader.read_u8()?;
        let alpha1 = reader.read_u8()?;

        let mut alpha_indices_buf = [0u8; 6];
        reader.read_exact(&mut alpha_indices_buf)?;
        let mut alpha_idx_u64 = 0u64;
        for (i, &b) in alpha_indices_buf.iter().enumerate() {
            alpha_idx_u64 |= (b as u64) << (8 * i);
        }
        let alphas = Self::alpha_palette(alpha0, alpha1);

        let c0 = reader.read_u16::<LittleEndian>()?;
        let c1 = reader.read_u16::<LittleEndian>()?;
        let color_idx = reader.read_u32::<LittleEndian>()?;
        let colors = Self::color_palette(c0, c1);

        let mut block_pixels = [[0u8; 4]; 16];
        for (i, pixel) in block_pixels.iter_mut().enumerate() {
            let ai = ((alpha_idx_u64 >> (3 * i)) & 0x7) as usize;
            let ci = ((color_idx >> (2 * i)) & 0x3) as usize;

            let rgb = colors[ci];
            *pixel = [rgb[0], rgb[1], rgb[2], alphas[ai]];
        }

        Ok(block_pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn alpha_gradient_keeps_endpoints() {
        let mut image = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        image.put_pixel(0, 0, Rgba([10, 20, 30, 0]));
        let data = DXT5::encode(&image);
        assert_eq!(data.len(), 16);
        assert_eq!(&data[..2], &[255, 0]);

        let decoded = DXT5::decode(&data, 4, 4).unwrap();
        assert_eq!(decoded.get_pixel(0, 0)[3], 0);
        assert_eq!(decoded.get_pixel(3, 3)[3], 255);
    }

    #[test]
    fn huge_sizes_are_rejected_without_overflow() {
        let err = DXT5::decode(&[0u8; 16], 0x1_0000, 0x1_0000).unwrap_err();
        assert!(matches!(err, DecodeImageError::NotEnoughData { expected, actual: 16 } if expected == 1 << 32));
    }

    #[test]
    fn non_multiple_of_four_sizes_decode() {
        let image = RgbaImage::from_pixel(5, 3, Rgba([200, 100, 50, 128]));
        let data = DXT5::encode(&image);
        assert_eq!(data.len(), 2 * 16);

        let decoded = DXT5::decode(&data, 5, 3).unwrap();
        assert_eq!(decoded.dimensions(), (5, 3));
        let p = decoded.get_pixel(4, 2);
        assert_eq!(p[3], 128);
        assert!((p[0] as i16 - 200).abs() <= 8);
    }
}
