use foundation::math::{Mat4, Vec2, Vec3};

use crate::picking::Ray;

/// Right-handed perspective camera looking at `target`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_y_deg: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl PerspectiveCamera {
    /// Camera on the +Z axis at `distance`, looking at the origin.
    pub fn orbiting_origin(
        fov_y_deg: f64,
        aspect: f64,
        near: f64,
        far: f64,
        distance: f64,
    ) -> Self {
        Self {
            fov_y_deg,
            aspect,
            near,
            far,
            position: Vec3::new(0.0, 0.0, distance),
            target: Vec3::ZERO,
            up: Vec3::new(0.0, 1.0, 0.0),
        }
    }

    /// Ignores degenerate sizes so a zero-height canvas keeps the last aspect.
    pub fn set_aspect(&mut self, width: f64, height: f64) {
        if width > 0.0 && height > 0.0 {
            self.aspect = width / height;
        }
    }

    pub fn set_distance(&mut self, distance: f64) {
        self.position.z = distance;
    }

    pub fn distance(&self) -> f64 {
        self.position.z
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y_deg.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World point to normalized device coordinates.
    ///
    /// Points behind the camera produce flipped or non-finite values; callers
    /// clamp the result before using it for layout.
    pub fn project(&self, world: Vec3) -> Vec3 {
        let [x, y, z, w] = self.view_projection().transform_vec4(world);
        Vec3::new(x / w, y / w, z / w)
    }

    /// Ray through an NDC position, starting at the camera.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let forward = (self.target - self.position)
            .normalized()
            .unwrap_or(Vec3::new(0.0, 0.0, -1.0));
        let right = forward
            .cross(self.up)
            .normalized()
            .unwrap_or(Vec3::new(1.0, 0.0, 0.0));
        let up = right.cross(forward);

        let half_h = (0.5 * self.fov_y_deg.to_radians()).tan();
        let half_w = half_h * self.aspect;
        let dir = forward + right * (ndc.x * half_w) + up * (ndc.y * half_h);

        Ray::new(self.position, dir.normalized().unwrap_or(forward))
    }
}

/// Pixel position inside a `width x height` element to NDC (`y` up).
pub fn pixel_to_ndc(px: Vec2, width: f64, height: f64) -> Vec2 {
    if width <= 0.0 || height <= 0.0 {
        return Vec2::new(0.0, 0.0);
    }
    Vec2::new((px.x / width) * 2.0 - 1.0, -(px.y / height) * 2.0 + 1.0)
}

pub fn ndc_to_pixel(ndc: Vec2, width: f64, height: f64) -> Vec2 {
    Vec2::new((ndc.x * 0.5 + 0.5) * width, (-ndc.y * 0.5 + 0.5) * height)
}
