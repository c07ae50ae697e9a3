pub mod dxt1;
pub mod dxt5;

use image::RgbaImage;

/// Copies a decoded 4x4 block into a top-down RGBA buffer. `block_x` and
/// `block_y` are in stored (bottom-up) pixel coordinates.
pub(crate) fn put_block(buffer: &mut [u8], width: u32, height: u32, block_x: u32, block_y: u32, pixels: &[[u8; 4]; 16]) {
    for row in 0..4 {
        for col in 0..4 {
            let x = block_x + col;
            let y = block_y + row;

            if x >= width || y >= height {
                continue;
            }

            let flipped_y = height - 1 - y;
            let global_idx = ((flipped_y * width + x) * 4) as usize;
            buffer[global_idx..global_idx + 4].copy_from_slice(&pixels[(row * 4 + col) as usize]);
        }
    }
}

/// Gathers the 4x4 block at stored coordinates from a top-down image.
/// Blocks hanging over the right or top edge repeat the last pixel.
pub(crate) fn take_block(image: &RgbaImage, block_x: u32, block_y: u32) -> [[u8; 4]; 16] {
    let (width, height) = image.dimensions();
    let mut pixels = [[0u8; 4]; 16];
    for row in 0..4 {
        for col in 0..4 {
            let x = (block_x + col).min(width - 1);
            let y = (block_y + row).min(height - 1);
            pixels[(row * 4 + col) as usize] = image.get_pixel(x, height - 1 - y).0;
        }
    }
    pixels
}

#[inline]
pub(crate) fn rgb565_to_rgb888(c: u16) -> (u8, u8, u8) {
    let r = ((c >> 11) & 0x1f) as u8;
    let g = ((c >> 5) & 0x3f) as u8;
    let b = (c & 0x1f) as u8;
    ((r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2))
}

#[inline]
pub(crate) fn rgb888_to_rgb565(r: u8, g: u8, b: u8) -> u16 {
    let r = (r as u16 * 31 + 127) / 255;
    let g = (g as u16 * 63 + 127) / 255;
    let b = (b as u16 * 31 + 127) / 255;
    (r << 11) | (g << 5) | b
}

/// Bounding box endpoints of the opaque-enough pixels, as rgb565 (max, min).
pub(crate) fn color_endpoints(pixels: &[[u8; 4]; 16], skip_transparent: bool) -> (u16, u16) {
    let mut min = [255u8; 3];
    let mut max = [0u8; 3];
    let mut seen = false;
    for p in pixels.iter() {
        if skip_transparent && p[3] < 128 {
            continue;
        }
        seen = true;
        for c in 0..3 {
            min[c] = min[c].min(p[c]);
            max[c] = max[c].max(p[c]);
        }
    }
    if !seen {
        return (0, 0);
    }
    // pull both ends in by 1/16 of the range so the interpolated colors land on the data
    for c in 0..3 {
        let inset = (max[c] - min[c]) / 16;
        min[c] = min[c].saturating_add(inset);
        max[c] = max[c].saturating_sub(inset);
    }
    (rgb888_to_rgb565(max[0], max[1], max[2]), rgb888_to_rgb565(min[0], min[1], min[2]))
}

#[inline]
pub(crate) fn nearest(palette: &[[u8; 3]], pixel: &[u8; 4]) -> u32 {
    let mut best = 0;
    let mut best_dist = u32::MAX;
    for (i, c) in palette.iter().enumerate() {
        let dist: u32 = (0..3).map(|k| (c[k] as i32 - pixel[k] as i32).pow(2) as u32).sum();
        if dist < best_dist {
            best_dist = dist;
            best = i as u32;
        }
    }
    best
}
