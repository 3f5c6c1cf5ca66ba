use foundation::math::Vec3;

use super::Color;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AmbientLight {
    pub color: Color,
    pub intensity: f32,
}

/// Light arriving from `position` towards the origin.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DirectionalLight {
    pub color: Color,
    pub intensity: f32,
    pub position: Vec3,
}

impl DirectionalLight {
    /// Unit vector pointing from the surface towards the light.
    pub fn direction_to_light(&self) -> Vec3 {
        self.position.normalized().unwrap_or(Vec3::new(0.0, 1.0, 0.0))
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Lighting {
    pub ambient: AmbientLight,
    pub directional: DirectionalLight,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            ambient: AmbientLight {
                color: Color::WHITE,
                intensity: 0.6,
            },
            directional: DirectionalLight {
                color: Color::WHITE,
                intensity: 0.8,
                position: Vec3::new(5.0, 3.0, 5.0),
            },
        }
    }
}
