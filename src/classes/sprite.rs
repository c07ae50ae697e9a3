use image::{imageops, RgbaImage};
use serde::Deserialize;

use super::PPtr;
use crate::math::{Rectf, Vector2f};

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SpriteRenderData {
    pub texture: PPtr,
    #[serde(rename = "alphaTexture", default)]
    pub alpha_texture: PPtr,
    #[serde(rename = "textureRect")]
    pub texture_rect: Rectf,
    #[serde(rename = "textureRectOffset", default)]
    pub texture_rect_offset: Vector2f,
    #[serde(rename = "settingsRaw", default)]
    pub settings_raw: u32,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Sprite {
    #[serde(rename = "m_Name", default)]
    pub name: String,
    #[serde(rename = "m_Rect")]
    pub rect: Rectf,
    #[serde(rename = "m_Offset", default)]
    pub offset: Vector2f,
    #[serde(rename = "m_PixelsToUnits", default)]
    pub pixels_to_units: f32,
    #[serde(rename = "m_RD")]
    pub rd: SpriteRenderData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackingRotation {
    None,
    FlipHorizontal,
    FlipVertical,
    Rotate180,
    Rotate90,
}

impl Sprite {
    pub fn is_packed(&self) -> bool {
        self.rd.settings_raw & 1 != 0
    }

    pub fn packing_rotation(&self) -> PackingRotation {
        if !self.is_packed() {
            return PackingRotation::None;
        }
        match (self.rd.settings_raw >> 2) & 0xf {
            1 => PackingRotation::FlipHorizontal,
            2 => PackingRotation::FlipVertical,
            3 => PackingRotation::Rotate180,
            4 => PackingRotation::Rotate90,
            _ => PackingRotation::None,
        }
    }

    /// Region of the atlas in top-down pixel coordinates, clipped to the atlas.
    pub fn atlas_region(&self, atlas_width: u32, atlas_height: u32) -> (u32, u32, u32, u32) {
        let (x, y, width, height) = self.rd.texture_rect.to_pixels();
        let x = x.min(atlas_width.saturating_sub(1));
        let width = width.min(atlas_width - x);
        let bottom = y.min(atlas_height.saturating_sub(1));
        let height = height.min(atlas_height - bottom);
        (x, atlas_height - bottom - height, width, height)
    }

    /// Cuts the sprite out of its decoded atlas and undoes packing rotation.
    pub fn crop(&self, atlas: &RgbaImage) -> RgbaImage {
        let (x, y, width, height) = self.atlas_region(atlas.width(), atlas.height());
        let region = imageops::crop_imm(atlas, x, y, width, height).to_image();
        match self.packing_rotation() {
            PackingRotation::None => region,
            PackingRotation::FlipHorizontal => imageops::flip_vertical(&region),
            PackingRotation::FlipVertical => imageops::flip_horizontal(&region),
            PackingRotation::Rotate180 => imageops::rotate180(&region),
            PackingRotation::Rotate90 => imageops::rotate270(&region),
        }
    }

    /// Inverse of [`crop`](Self::crop): writes `image` (sized like the
    /// sprite) back into the atlas region.
    pub fn paste(&self, atlas: &mut RgbaImage, image: &RgbaImage) {
        let packed = match self.packing_rotation() {
            PackingRotation::None => image.clone(),
            PackingRotation::FlipHorizontal => imageops::flip_vertical(image),
            PackingRotation::FlipVertical => imageops::flip_horizontal(image),
            PackingRotation::Rotate180 => imageops::rotate180(image),
            PackingRotation::Rotate90 => imageops::rotate90(image),
        };
        let (x, y, width, height) = self.atlas_region(atlas.width(), atlas.height());
        for (px, py, pixel) in packed.enumerate_pixels() {
            if px < width && py < height {
                atlas.put_pixel(x + px, y + py, *pixel);
            }
        }
    }

    /// Size of the sprite image as extracted, after undoing rotation.
    pub fn image_size(&self, atlas_width: u32, atlas_height: u32) -> (u32, u32) {
        let (_, _, width, height) = self.atlas_region(atlas_width, atlas_height);
        match self.packing_rotation() {
            PackingRotation::Rotate90 => (height, width),
            _ => (width, height),
        }
    }
}
