/// sRGB-encoded RGB in `[0, 1]`, as written in hex literals.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Color(pub [f32; 3]);

impl Color {
    pub const WHITE: Color = Color([1.0, 1.0, 1.0]);

    /// `0xRRGGBB` to channel floats.
    pub fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xff) as f32 / 255.0;
        let g = ((hex >> 8) & 0xff) as f32 / 255.0;
        let b = (hex & 0xff) as f32 / 255.0;
        Color([r, g, b])
    }

    /// Decodes to linear RGB for shading.
    pub fn to_linear(self) -> [f32; 3] {
        self.0.map(|c| {
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        })
    }
}

/// Which faces of a closed surface are drawn and hit by rays.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Side {
    #[default]
    Front,
    Back,
    Double,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Blending {
    #[default]
    Normal,
    Additive,
}

/// Surface description consumed by the renderer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Material {
    pub color: Color,
    pub opacity: f32,
    pub emissive: Color,
    pub emissive_intensity: f32,
    pub roughness: f32,
    pub metalness: f32,
    /// Sample the globe texture, tinted by `color`.
    pub textured: bool,
    /// Ignore scene lights.
    pub unlit: bool,
    pub side: Side,
    pub blending: Blending,
    /// Point sprite size in world units (points only).
    pub point_size: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            opacity: 1.0,
            emissive: Color([0.0, 0.0, 0.0]),
            emissive_intensity: 0.0,
            roughness: 1.0,
            metalness: 0.0,
            textured: false,
            unlit: false,
            side: Side::Front,
            blending: Blending::Normal,
            point_size: 1.0,
        }
    }
}

impl Material {
    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0 || self.blending == Blending::Additive
    }
}
