use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use image::RgbaImage;

use super::{color_endpoints, nearest, put_block, rgb565_to_rgb888, take_block};
use crate::error::DecodeImageError;

pub struct DXT1;

impl DXT1 {
    pub const BLOCK_SIZE: usize = 8;

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

    /// Encodes a top-down image. Pixels with alpha below 128 use the
    /// transparent black entry of the three color palette.
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

    fn encode_block(pixels: &[[u8; 4]; 16], out: &mut Vec<u8>) {
        let has_alpha = pixels.iter().any(|p| p[3] < 128);
        let (max, min) = color_endpoints(pixels, has_alpha);

        // c0 > c1 selects the four color palette, c0 <= c1 the one with transparency
        let (c0, c1) = if has_alpha { (min, max) } else { (max, min) };
        let palette = Self::palette(c0, c1);

        let mut indices = 0u32;
        for (i, p) in pixels.iter().enumerate() {
            let index = if has_alpha && p[3] < 128 {
                3
            } else if c0 == c1 {
                0
            } else {
                let colors = if has_alpha { &palette[..3] } else { &palette[..] };
                nearest(colors, p)
            };
            indices |= index << (2 * i);
        }

        // writes into a Vec cannot fail
        let _ = out.write_u16::<LittleEndian>(c0);
        let _ = out.write_u16::<LittleEndian>(c1);
        let _ = out.write_u32::<LittleEndian>(indices);
    }

    fn palette(c0: u16, c1: u16) -> [[u8; 3]; 4] {
        let (r0, g0, b0) = rgb565_to_rgb888(c0);
        let (r1, g1, b1) = rgb565_to_rgb888(c1);
        let mix = |a: u8, b: u8, wa: u16, wb: u16| ((wa * a as u16 + wb * b as u16) / (wa + wb)) as u8;

        if c0 > c1 {
            [
                [r0, g0, b0],
                [r1, g1, b1],
                [mix(r0, r1, 2, 1), mix(g0, g1, 2, 1), mix(b0, b1, 2, 1)],
                [mix(r0, r1, 1, 2), mix(g0, g1, 1, 2), mix(b0, b1, 1, 2)],
            ]
        } else {
            [
                [r0, g0, b0],
                [r1, g1, b1],
                [mix(r0, r1, 1, 1), mix(g0, g1, 1, 1), mix(b0, b1, 1, 1)],
                [0, 0, 0],
            ]
        }
    }

    fn decode_block(data: &[u8]) -> std::io::Result<[[u8; 4]; 16]> {
        let mut reader = Cursor::new(data);
        let c0 = reader.read_u16::<LittleEndian>()?;
        let c1 = reader.read_u16::<LittleEndian>()?;
        let color_idx = reader.read_u32::<LittleEndian>()?;

        let palette = Self::palette(c0, c1);
        let mut colors = [[0u8; 4]; 4];
        for (color, rgb) in colors.iter_mut().zip(palette.iter()) {
            *color = [rgb[0], rgb[1], rgb[2], 255];
        }
        if c0 <= c1 {
            colors[3] = [0, 0, 0, 0];
        }

        let mut block_pixels = [[0u8; 4]; 16];
        for (i, pixel) in block_pixels.iter_mut().enumerate() {
            let ci = ((color_idx >> (2 * i)) & 0x3) as usize;
            *pixel = colors[ci];
        }
        Ok(block_pixels)
    }
}
