use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector2f {
    pub x: f32,
    pub y: f32,
}

/// Rectangle in texture space, origin at the bottom left.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct Rectf {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rectf {
    /// Pixel bounds as (x, y, width, height), rounded like Unity's sprite packer.
    pub fn to_pixels(&self) -> (u32, u32, u32, u32) {
        let x = self.x.round().max(0.0) as u32;
        let y = self.y.round().max(0.0) as u32;
        let width = self.width.round().max(1.0) as u32;
        let height = self.height.round().max(1.0) as u32;
        (x, y, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_bounds_round_and_clamp() {
        let rect = Rectf { x: 1.4, y: -0.2, width: 15.6, height: 0.1 };
        assert_eq!(rect.to_pixels(), (1, 0, 16, 1));
    }
}
