use foundation::time::Time;

/// Upper bound on a single frame step. Background tabs pause
/// `requestAnimationFrame`; the first frame after resuming must not jump.
pub const MAX_FRAME_DT_S: f64 = 0.1;

/// Frame metadata handed to per-frame systems.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Clamped delta time (seconds).
    pub dt_s: f64,
    /// Host timestamp at the start of the frame.
    pub time: Time,
}

impl Frame {
    pub fn new(index: u64, dt_s: f64, time: Time) -> Self {
        Self { index, dt_s, time }
    }
}

/// Turns host animation-frame timestamps into [`Frame`]s.
///
/// The first tick has `dt_s == 0`. Timestamps that go backwards also yield a
/// zero step.
#[derive(Debug, Default, Clone)]
pub struct FrameClock {
    next_index: u64,
    last: Option<Time>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, timestamp_ms: f64) -> Frame {
        let now = Time::from_millis(timestamp_ms);
        let dt_s = match self.last {
            Some(prev) => (now.seconds() - prev.seconds()).clamp(0.0, MAX_FRAME_DT_S),
            None => 0.0,
        };
        self.last = Some(now);

        let frame = Frame::new(self.next_index, dt_s, now);
        self.next_index = self.next_index.wrapping_add(1);
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::{FrameClock, MAX_FRAME_DT_S};
    use foundation::time::Time;

    #[test]
    fn first_tick_has_zero_dt() {
        let mut clock = FrameClock::new();
        let f0 = clock.tick(1000.0);
        assert_eq!(f0.index, 0);
        assert_eq!(f0.dt_s, 0.0);
        assert_eq!(f0.time, Time(1.0));
    }

    #[test]
    fn dt_follows_timestamps() {
        let mut clock = FrameClock::new();
        clock.tick(0.0);
        let f1 = clock.tick(16.0);
        assert_eq!(f1.index, 1);
        assert!((f1.dt_s - 0.016).abs() < 1e-12);
    }

    #[test]
    fn long_pauses_and_rewinds_are_clamped() {
        let mut clock = FrameClock::new();
        clock.tick(0.0);
        assert_eq!(clock.tick(5_000.0).dt_s, MAX_FRAME_DT_S);
        assert_eq!(clock.tick(4_000.0).dt_s, 0.0);
    }
}
