//! Block codecs for the DXT family used by unity textures.
//!
//! Unity stores texture rows bottom-up. Decoders return a top-down
//! [`RgbaImage`](image::RgbaImage) and encoders take one, so callers never
//! flip by hand.

pub mod error;
mod implements;

pub use error::DecodeImageError;
pub use implements::dxt1::DXT1;
pub use implements::dxt5::DXT5;

/// Number of bytes a block compressed level of `width` x `height` occupies.
pub fn block_data_size(width: u32, height: u32, block_size: usize) -> usize {
    let blocks_x = width.div_ceil(4) as usize;
    let blocks_y = height.div_ceil(4) as usize;
    blocks_x * blocks_y * block_size
}
