//! Column-major 4x4 matrices in `f64`.
//!
//! Conventions:
//! - `cols[c][r]` is the element at column `c`, row `r` (WGSL layout).
//! - Vectors are columns; `a * b` applies `b` first.
//! - Projection matrices use OpenGL clip depth `[-1, 1]`; renderers targeting
//!   `[0, 1]` depth premultiply by [`Mat4::OPENGL_TO_WGPU`].

use super::Vec3;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat4 {
    pub cols: [[f64; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Remaps OpenGL clip depth `[-1, 1]` to `[0, 1]`.
    pub const OPENGL_TO_WGPU: Mat4 = Mat4 {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 0.5, 0.0],
            [0.0, 0.0, 0.5, 1.0],
        ],
    };

    pub fn from_translation(t: Vec3) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[3] = [t.x, t.y, t.z, 1.0];
        m
    }

    pub fn from_scale(s: f64) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[0][0] = s;
        m.cols[1][1] = s;
        m.cols[2][2] = s;
        m
    }

    pub fn rotation_x(angle_rad: f64) -> Self {
        let (s, c) = angle_rad.sin_cos();
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, c, s, 0.0],
                [0.0, -s, c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    pub fn rotation_y(angle_rad: f64) -> Self {
        let (s, c) = angle_rad.sin_cos();
        Self {
            cols: [
                [c, 0.0, -s, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [s, 0.0, c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    pub fn rotation_z(angle_rad: f64) -> Self {
        let (s, c) = angle_rad.sin_cos();
        Self {
            cols: [
                [c, s, 0.0, 0.0],
                [-s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Intrinsic X, then Y, then Z Euler rotation: `Rx * Ry * Rz`.
    pub fn from_euler_xyz(euler_rad: Vec3) -> Self {
        Self::rotation_x(euler_rad.x)
            * Self::rotation_y(euler_rad.y)
            * Self::rotation_z(euler_rad.z)
    }

    /// `T * R * S`, the usual local transform composition.
    pub fn from_trs(translation: Vec3, euler_rad: Vec3, scale: f64) -> Self {
        Self::from_translation(translation)
            * Self::from_euler_xyz(euler_rad)
            * Self::from_scale(scale)
    }

    /// Right-handed perspective projection with OpenGL clip depth.
    pub fn perspective_rh_gl(fov_y_rad: f64, aspect: f64, near: f64, far: f64) -> Self {
        let f = 1.0 / (0.5 * fov_y_rad).tan();
        let aspect = if aspect > 0.0 { aspect } else { 1.0 };
        Self {
            cols: [
                [f / aspect, 0.0, 0.0, 0.0],
                [0.0, f, 0.0, 0.0],
                [0.0, 0.0, (far + near) / (near - far), -1.0],
                [0.0, 0.0, (2.0 * far * near) / (near - far), 0.0],
            ],
        }
    }

    pub fn look_at_rh(eye: Vec3, target: Vec3, up: Vec3) -> Self {
        let f = (target - eye).normalized().unwrap_or(Vec3::new(0.0, 0.0, -1.0));
        let s = f.cross(up).normalized().unwrap_or(Vec3::new(1.0, 0.0, 0.0));
        let u = s.cross(f);

        Self {
            cols: [
                [s.x, u.x, -f.x, 0.0],
                [s.y, u.y, -f.y, 0.0],
                [s.z, u.z, -f.z, 0.0],
                [-s.dot(eye), -u.dot(eye), f.dot(eye), 1.0],
            ],
        }
    }

    /// Full homogeneous transform of `(p, 1)`.
    pub fn transform_vec4(&self, p: Vec3) -> [f64; 4] {
        let v = [p.x, p.y, p.z, 1.0];
        let mut out = [0.0; 4];
        for (row, slot) in out.iter_mut().enumerate() {
            *slot = (0..4).map(|col| self.cols[col][row] * v[col]).sum();
        }
        out
    }

    /// Affine point transform (ignores the projective row).
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        let v = self.transform_vec4(p);
        Vec3::new(v[0], v[1], v[2])
    }

    /// Direction transform (no translation).
    pub fn transform_vector(&self, d: Vec3) -> Vec3 {
        let c = &self.cols;
        Vec3::new(
            c[0][0] * d.x + c[1][0] * d.y + c[2][0] * d.z,
            c[0][1] * d.x + c[1][1] * d.y + c[2][1] * d.z,
            c[0][2] * d.x + c[1][2] * d.y + c[2][2] * d.z,
        )
    }

    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.cols[3][0], self.cols[3][1], self.cols[3][2])
    }

    /// Length of the first basis column; exact for uniform scale.
    pub fn max_scale(&self) -> f64 {
        (0..3)
            .map(|c| Vec3::new(self.cols[c][0], self.cols[c][1], self.cols[c][2]).length())
            .fold(0.0, f64::max)
    }

    pub fn to_f32_cols(&self) -> [[f32; 4]; 4] {
        let mut out = [[0.0f32; 4]; 4];
        for (col, out_col) in out.iter_mut().enumerate() {
            for (row, v) in out_col.iter_mut().enumerate() {
                *v = self.cols[col][row] as f32;
            }
        }
        out
    }
}

impl std::ops::Mul for Mat4 {
    type Output = Mat4;

    fn mul(self, b: Mat4) -> Mat4 {
        let a = &self.cols;
        let mut c = [[0.0f64; 4]; 4];
        for col in 0..4 {
            for row in 0..4 {
                c[col][row] = a[0][row] * b.cols[col][0]
                    + a[1][row] * b.cols[col][1]
                    + a[2][row] * b.cols[col][2]
                    + a[3][row] * b.cols[col][3];
            }
        }
        Mat4 { cols: c }
    }
}

#[cfg(test)]
mod tests {
    use super::Mat4;
    use crate::math::Vec3;
    use std::f64::consts::FRAC_PI_2;

    fn assert_vec_close(a: Vec3, b: Vec3, eps: f64) {
        let d = (a - b).length();
        assert!(d <= eps, "expected {a:?} ~= {b:?} (diff {d})");
    }

    #[test]
    fn rotation_y_quarter_turn_maps_x_to_minus_z() {
        let p = Mat4::rotation_y(FRAC_PI_2).transform_point(Vec3::new(1.0, 0.0, 0.0));
        assert_vec_close(p, Vec3::new(0.0, 0.0, -1.0), 1e-12);
    }

    #[test]
    fn rotation_x_quarter_turn_maps_y_to_z() {
        let p = Mat4::rotation_x(FRAC_PI_2).transform_point(Vec3::new(0.0, 1.0, 0.0));
        assert_vec_close(p, Vec3::new(0.0, 0.0, 1.0), 1e-12);
    }

    #[test]
    fn euler_applies_y_before_x() {
        // Rx * Ry: a point is rotated about Y first, then about X.
        let m = Mat4::from_euler_xyz(Vec3::new(FRAC_PI_2, FRAC_PI_2, 0.0));
        let p = m.transform_point(Vec3::new(1.0, 0.0, 0.0));
        // Ry: (1,0,0) -> (0,0,-1); Rx: (0,0,-1) -> (0,1,0).
        assert_vec_close(p, Vec3::new(0.0, 1.0, 0.0), 1e-12);
    }

    #[test]
    fn trs_translates_after_rotating_and_scaling() {
        let m = Mat4::from_trs(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, 2.0);
        let moved = m.transform_point(Vec3::new(1.0, 0.0, 0.0));
        assert_vec_close(moved, Vec3::new(3.0, 2.0, 3.0), 1e-12);
        assert!((m.max_scale() - 2.0).abs() < 1e-12);
        assert_eq!(m.translation(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn look_at_from_positive_z_is_a_pure_translation() {
        let eye = Vec3::new(0.0, 0.0, 12.0);
        let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0));
        assert_vec_close(view.transform_point(Vec3::ZERO), Vec3::new(0.0, 0.0, -12.0), 1e-12);
        assert_vec_close(
            view.transform_vector(Vec3::new(1.0, 1.0, 0.0)),
            Vec3::new(1.0, 1.0, 0.0),
            1e-12,
        );
    }

    #[test]
    fn perspective_maps_near_and_far_to_clip_bounds() {
        let proj = Mat4::perspective_rh_gl(60f64.to_radians(), 1.5, 0.1, 1000.0);
        let near = proj.transform_vec4(Vec3::new(0.0, 0.0, -0.1));
        let far = proj.transform_vec4(Vec3::new(0.0, 0.0, -1000.0));
        assert!((near[2] / near[3] + 1.0).abs() < 1e-9);
        assert!((far[2] / far[3] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn identity_is_neutral_for_mul() {
        let m = Mat4::from_trs(Vec3::new(1.0, -2.0, 0.5), Vec3::new(0.3, 0.2, 0.1), 1.5);
        assert_eq!(m * Mat4::IDENTITY, m);
        assert_eq!(Mat4::IDENTITY * m, m);
    }
}
