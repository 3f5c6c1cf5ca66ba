//! Drag-to-rotate, wheel-to-zoom globe controller with an eased focus
//! transition.
//!
//! The controller owns only numbers: globe yaw/pitch, camera distance and
//! pointer bookkeeping. The host copies them into the scene each frame.
//!
//! - Press/move/release rotate the globe; a release with no recorded move
//!   is reported as a click.
//! - The wheel steps the camera distance by a fixed amount per event.
//! - A focus transition eases the globe so a given point faces the camera.
//!   While it runs, presses and moves are ignored.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use foundation::math::precision::clamp_lenient;
use foundation::math::{Vec2, Vec3};

/// Tunables, usually taken from `ViewerConfig`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ControllerSettings {
    /// Radians per pixel of drag.
    pub rotate_speed: f64,
    /// Distance change per wheel event.
    pub zoom_step: f64,
    pub min_distance: f64,
    pub max_distance: f64,
    pub focus_duration_s: f64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            rotate_speed: 0.005,
            zoom_step: 0.6,
            min_distance: 6.0,
            max_distance: 30.0,
            focus_duration_s: 0.8,
        }
    }
}

/// Globe rotation: `pitch` about X, then `yaw` about Y.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Orientation {
    pub yaw_rad: f64,
    pub pitch_rad: f64,
}

impl Orientation {
    /// Euler angles for the globe node's transform.
    pub fn as_euler(&self) -> Vec3 {
        Vec3::new(self.pitch_rad, self.yaw_rad, 0.0)
    }

    /// Rotation that brings the globe-local point `p` onto the +Z axis,
    /// choosing the yaw closest to `near_yaw`.
    pub fn facing(p: Vec3, near_yaw: f64) -> Self {
        let horizontal = (p.x * p.x + p.z * p.z).sqrt();
        let yaw = (-p.x).atan2(p.z);
        let pitch = p.y.atan2(horizontal);
        Self {
            yaw_rad: nearest_equivalent_angle(yaw, near_yaw),
            pitch_rad: pitch.clamp(-FRAC_PI_2, FRAC_PI_2),
        }
    }

    fn lerp(a: Self, b: Self, t: f64) -> Self {
        Self {
            yaw_rad: a.yaw_rad + (b.yaw_rad - a.yaw_rad) * t,
            pitch_rad: a.pitch_rad + (b.pitch_rad - a.pitch_rad) * t,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub enum TransitionState {
    #[default]
    Idle,
    Transitioning {
        from: Orientation,
        to: Orientation,
        elapsed_s: f64,
        duration_s: f64,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PressOutcome {
    Started,
    /// A focus transition is running.
    Ignored,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Rotated,
    Ignored,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ReleaseOutcome {
    /// Press and release with no move in between; hit-test here.
    Click(Vec2),
    DragEnded,
    Ignored,
}

#[derive(Debug, Clone)]
pub struct GlobeController {
    settings: ControllerSettings,
    orientation: Orientation,
    distance: f64,
    pointer_down: bool,
    moved: bool,
    last_px: Vec2,
    globe_ready: bool,
    transition: TransitionState,
}

impl Default for GlobeController {
    fn default() -> Self {
        Self::new(ControllerSettings::default(), 12.0)
    }
}

impl GlobeController {
    pub fn new(settings: ControllerSettings, initial_distance: f64) -> Self {
        Self {
            settings,
            orientation: Orientation::default(),
            distance: clamp_lenient(initial_distance, settings.min_distance, settings.max_distance),
            pointer_down: false,
            moved: false,
            last_px: Vec2::default(),
            globe_ready: false,
            transition: TransitionState::Idle,
        }
    }

    /// Drags only rotate once the globe exists.
    pub fn set_globe_ready(&mut self, ready: bool) {
        self.globe_ready = ready;
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn transition(&self) -> TransitionState {
        self.transition
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self.transition, TransitionState::Transitioning { .. })
    }

    /// `pos_px` is relative to the render surface's top-left corner.
    /// Non-finite positions are ignored here and in the other pointer
    /// handlers.
    pub fn on_pointer_down(&mut self, pos_px: Vec2) -> PressOutcome {
        if self.is_transitioning() || !is_finite(pos_px) {
            return PressOutcome::Ignored;
        }
        self.pointer_down = true;
        self.moved = false;
        self.last_px = pos_px;
        PressOutcome::Started
    }

    pub fn on_pointer_move(&mut self, pos_px: Vec2) -> MoveOutcome {
        if self.is_transitioning() || !self.pointer_down || !self.globe_ready {
            return MoveOutcome::Ignored;
        }
        if !is_finite(pos_px) {
            return MoveOutcome::Ignored;
        }
        self.moved = true;
        let delta = pos_px - self.last_px;
        self.orientation.yaw_rad += delta.x * self.settings.rotate_speed;
        self.orientation.pitch_rad = (self.orientation.pitch_rad
            + delta.y * self.settings.rotate_speed)
            .clamp(-FRAC_PI_2, FRAC_PI_2);
        self.last_px = pos_px;
        MoveOutcome::Rotated
    }

    pub fn on_pointer_up(&mut self, pos_px: Vec2) -> ReleaseOutcome {
        if !self.pointer_down {
            return ReleaseOutcome::Ignored;
        }
        self.pointer_down = false;
        // A release at an unusable position still ends the press, but
        // cannot hit-test.
        if self.moved || !is_finite(pos_px) {
            ReleaseOutcome::DragEnded
        } else {
            ReleaseOutcome::Click(pos_px)
        }
    }

    /// Only the sign of `delta_y` matters; zero (or NaN) is a no-op.
    pub fn on_wheel(&mut self, delta_y: f64) {
        let direction = if delta_y > 0.0 {
            1.0
        } else if delta_y < 0.0 {
            -1.0
        } else {
            return;
        };
        self.distance = clamp_lenient(
            self.distance + direction * self.settings.zoom_step,
            self.settings.min_distance,
            self.settings.max_distance,
        );
    }

    /// Starts easing the globe so the globe-local point `target` faces the
    /// camera. A zero duration snaps immediately.
    pub fn focus_on(&mut self, target: Vec3) -> Orientation {
        let to = Orientation::facing(target, self.orientation.yaw_rad);
        let duration_s = self.settings.focus_duration_s;
        if duration_s <= 0.0 {
            self.orientation = to;
            self.transition = TransitionState::Idle;
        } else {
            self.transition = TransitionState::Transitioning {
                from: self.orientation,
                to,
                elapsed_s: 0.0,
                duration_s,
            };
        }
        // A focus takes over any drag in progress.
        self.pointer_down = false;
        to
    }

    /// Advances the transition. Returns `true` on the frame it completes.
    pub fn update(&mut self, dt_s: f64) -> bool {
        let TransitionState::Transitioning {
            from,
            to,
            elapsed_s,
            duration_s,
        } = self.transition
        else {
            return false;
        };

        let elapsed_s = elapsed_s + dt_s.max(0.0);
        if elapsed_s >= duration_s {
            self.orientation = to;
            self.transition = TransitionState::Idle;
            return true;
        }

        self.orientation = Orientation::lerp(from, to, ease_in_out_cubic(elapsed_s / duration_s));
        self.transition = TransitionState::Transitioning {
            from,
            to,
            elapsed_s,
            duration_s,
        };
        false
    }
}

fn is_finite(p: Vec2) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

fn ease_in_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// `angle + k * TAU` closest to `reference`.
fn nearest_equivalent_angle(angle: f64, reference: f64) -> f64 {
    let diff = (angle - reference).rem_euclid(TAU);
    if diff > PI {
        reference + diff - TAU
    } else {
        reference + diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundation::math::{Mat4, lat_lng_to_vector3};

    fn ready() -> GlobeController {
        let mut c = GlobeController::default();
        c.set_globe_ready(true);
        c
    }

    fn drag(c: &mut GlobeController, from: (f64, f64), to: (f64, f64)) -> ReleaseOutcome {
        c.on_pointer_down(Vec2::new(from.0, from.1));
        c.on_pointer_move(Vec2::new(to.0, to.1));
        c.on_pointer_up(Vec2::new(to.0, to.1))
    }

    #[test]
    fn drag_rotates_by_pixel_delta() {
        let mut c = ready();
        assert_eq!(drag(&mut c, (100.0, 100.0), (140.0, 110.0)), ReleaseOutcome::DragEnded);
        assert!((c.orientation().yaw_rad - 0.2).abs() < 1e-12);
        assert!((c.orientation().pitch_rad - 0.05).abs() < 1e-12);
    }

    #[test]
    fn pitch_is_clamped_for_any_drag() {
        let mut c = ready();
        drag(&mut c, (0.0, 0.0), (0.0, 10_000.0));
        assert_eq!(c.orientation().pitch_rad, FRAC_PI_2);
        drag(&mut c, (0.0, 10_000.0), (0.0, -50_000.0));
        assert_eq!(c.orientation().pitch_rad, -FRAC_PI_2);
    }

    #[test]
    fn release_without_move_is_a_click() {
        let mut c = ready();
        c.on_pointer_down(Vec2::new(5.0, 6.0));
        assert_eq!(
            c.on_pointer_up(Vec2::new(5.0, 6.0)),
            ReleaseOutcome::Click(Vec2::new(5.0, 6.0))
        );
        assert_eq!(c.on_pointer_up(Vec2::new(5.0, 6.0)), ReleaseOutcome::Ignored);
    }

    #[test]
    fn any_move_suppresses_the_click() {
        let mut c = ready();
        c.on_pointer_down(Vec2::new(5.0, 6.0));
        c.on_pointer_move(Vec2::new(5.0, 6.0));
        assert_eq!(c.on_pointer_up(Vec2::new(5.0, 6.0)), ReleaseOutcome::DragEnded);
    }

    #[test]
    fn moves_are_inert_until_the_globe_is_ready() {
        let mut c = GlobeController::default();
        c.on_pointer_down(Vec2::new(0.0, 0.0));
        assert_eq!(c.on_pointer_move(Vec2::new(50.0, 0.0)), MoveOutcome::Ignored);
        assert_eq!(c.orientation(), Orientation::default());
        assert!(matches!(c.on_pointer_up(Vec2::new(50.0, 0.0)), ReleaseOutcome::Click(_)));
    }

    #[test]
    fn non_finite_positions_leave_the_orientation_alone() {
        let mut c = ready();
        assert_eq!(c.on_pointer_down(Vec2::new(f64::NAN, 0.0)), PressOutcome::Ignored);

        c.on_pointer_down(Vec2::new(0.0, 0.0));
        assert_eq!(c.on_pointer_move(Vec2::new(0.0, f64::NAN)), MoveOutcome::Ignored);
        assert_eq!(c.on_pointer_move(Vec2::new(f64::INFINITY, 0.0)), MoveOutcome::Ignored);
        assert_eq!(c.orientation(), Orientation::default());

        // Later valid moves still rotate from the last good position.
        assert_eq!(c.on_pointer_move(Vec2::new(0.0, 20.0)), MoveOutcome::Rotated);
        assert!((c.orientation().pitch_rad - 0.1).abs() < 1e-12);
        assert_eq!(c.on_pointer_up(Vec2::new(0.0, 20.0)), ReleaseOutcome::DragEnded);

        c.on_pointer_down(Vec2::new(3.0, 3.0));
        assert_eq!(c.on_pointer_up(Vec2::new(f64::NAN, 3.0)), ReleaseOutcome::DragEnded);
    }

    #[test]
    fn wheel_steps_and_clamps_distance() {
        let mut c = ready();
        c.on_wheel(120.0);
        assert!((c.distance() - 12.6).abs() < 1e-12);
        c.on_wheel(0.0);
        assert!((c.distance() - 12.6).abs() < 1e-12);
        c.on_wheel(f64::NAN);
        assert!((c.distance() - 12.6).abs() < 1e-12);

        for _ in 0..100 {
            c.on_wheel(1.0);
        }
        assert_eq!(c.distance(), 30.0);
        for _ in 0..100 {
            c.on_wheel(-3.0);
            assert!((6.0..=30.0).contains(&c.distance()));
        }
        assert_eq!(c.distance(), 6.0);
    }

    #[test]
    fn focus_brings_the_point_to_face_the_camera() {
        let mut c = ready();
        let target = lat_lng_to_vector3(-41.29, 174.78, 5.1);
        c.focus_on(target);
        assert!(c.is_transitioning());

        let mut finished = false;
        for _ in 0..100 {
            finished |= c.update(1.0 / 60.0);
        }
        assert!(finished);
        assert!(!c.is_transitioning());

        let o = c.orientation();
        assert!(o.pitch_rad.abs() <= FRAC_PI_2);
        let world = Mat4::from_euler_xyz(o.as_euler()).transform_point(target);
        assert!(world.x.abs() < 1e-9, "{world:?}");
        assert!(world.y.abs() < 1e-9, "{world:?}");
        assert!((world.z - 5.1).abs() < 1e-9, "{world:?}");
    }

    #[test]
    fn transition_blocks_press_and_move_but_not_wheel() {
        let mut c = ready();
        c.focus_on(Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(c.on_pointer_down(Vec2::new(1.0, 1.0)), PressOutcome::Ignored);
        assert_eq!(c.on_pointer_move(Vec2::new(9.0, 9.0)), MoveOutcome::Ignored);
        c.on_wheel(-1.0);
        assert!((c.distance() - 11.4).abs() < 1e-12);
    }

    #[test]
    fn focus_takes_the_short_way_round() {
        let mut c = ready();
        drag(&mut c, (0.0, 0.0), (3.0 * TAU / 0.005, 0.0));
        let start = c.orientation().yaw_rad;
        let to = c.focus_on(Vec3::new(0.0, 0.0, 5.0));
        assert!((to.yaw_rad - start).abs() <= PI + 1e-9);
        assert!((to.yaw_rad.rem_euclid(TAU)).min(TAU - to.yaw_rad.rem_euclid(TAU)) < 1e-6);
    }

    #[test]
    fn easing_is_monotonic_with_fixed_ends() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-12);
        let mut prev = 0.0;
        for i in 1..=20 {
            let v = ease_in_out_cubic(i as f64 / 20.0);
            assert!(v >= prev);
            prev = v;
        }
    }
}
