//! Screen placement for the HTML popup that follows a marker.

use foundation::math::precision::clamp_lenient;
use foundation::math::{Vec2, Vec3};
use scene::camera::{PerspectiveCamera, ndc_to_pixel};

/// `left`/`top` in CSS pixels, relative to the render surface.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PopupPlacement {
    pub left_px: f64,
    pub top_px: f64,
}

impl PopupPlacement {
    pub fn left_style(&self) -> String {
        format!("{}px", self.left_px)
    }

    pub fn top_style(&self) -> String {
        format!("{}px", self.top_px)
    }
}

/// Clamps each axis to `[margin, extent - margin]` as
/// `max(margin, min(extent - margin, v))`.
///
/// Viewports narrower than two margins pin to `margin`; non-finite input
/// lands on a bound.
pub fn clamp_to_viewport(px: Vec2, width: f64, height: f64, margin: f64) -> Vec2 {
    Vec2::new(
        clamp_lenient(px.x, margin, width - margin),
        clamp_lenient(px.y, margin, height - margin),
    )
}

/// Projects `world` through `camera` and clamps the pixel result into the
/// viewport.
///
/// Points behind the camera project mirrored; they still end up inside the
/// margins.
pub fn place_popup(
    camera: &PerspectiveCamera,
    world: Vec3,
    width: f64,
    height: f64,
    margin: f64,
) -> PopupPlacement {
    let ndc = camera.project(world);
    let px = ndc_to_pixel(Vec2::new(ndc.x, ndc.y), width, height);
    let clamped = clamp_to_viewport(px, width, height, margin);
    PopupPlacement {
        left_px: clamped.x,
        top_px: clamped.y,
    }
}

#[cfg(test)]
mod tests {
    use super::{PopupPlacement, clamp_to_viewport, place_popup};
    use foundation::math::{Vec2, Vec3};
    use scene::camera::PerspectiveCamera;

    const MARGIN: f64 = 16.0;

    fn camera(aspect: f64) -> PerspectiveCamera {
        PerspectiveCamera::orbiting_origin(60.0, aspect, 0.1, 1000.0, 12.0)
    }

    fn assert_inside(p: PopupPlacement, w: f64, h: f64) {
        assert!(p.left_px >= MARGIN && p.left_px <= w - MARGIN, "left {}", p.left_px);
        assert!(p.top_px >= MARGIN && p.top_px <= h - MARGIN, "top {}", p.top_px);
    }

    #[test]
    fn centre_of_the_globe_maps_to_centre_of_the_screen() {
        let p = place_popup(&camera(2.0), Vec3::ZERO, 1000.0, 500.0, MARGIN);
        assert!((p.left_px - 500.0).abs() < 1e-9);
        assert!((p.top_px - 250.0).abs() < 1e-9);
    }

    #[test]
    fn off_screen_points_clamp_to_the_margin() {
        let p = place_popup(&camera(1.0), Vec3::new(500.0, 500.0, 0.0), 800.0, 800.0, MARGIN);
        assert_eq!(p, PopupPlacement { left_px: 784.0, top_px: 16.0 });
    }

    #[test]
    fn points_behind_the_camera_stay_inside() {
        let cases = [
            Vec3::new(0.0, 0.0, 20.0),
            Vec3::new(3.0, -2.0, 12.0),
            Vec3::new(-40.0, 10.0, 13.0),
        ];
        for world in cases {
            let p = place_popup(&camera(1.5), world, 900.0, 600.0, MARGIN);
            assert_inside(p, 900.0, 600.0);
        }
    }

    #[test]
    fn non_finite_and_tiny_viewports_never_panic() {
        let v = clamp_to_viewport(Vec2::new(f64::NAN, f64::INFINITY), 400.0, 300.0, MARGIN);
        assert!(v.x.is_finite() && v.y.is_finite());
        assert_eq!(v.y, 284.0);

        let tiny = clamp_to_viewport(Vec2::new(10.0, 10.0), 20.0, 20.0, MARGIN);
        assert_eq!(tiny, Vec2::new(16.0, 16.0));
    }

    #[test]
    fn styles_are_pixel_strings() {
        let p = PopupPlacement { left_px: 120.5, top_px: 16.0 };
        assert_eq!(p.left_style(), "120.5px");
        assert_eq!(p.top_style(), "16px");
    }
}
