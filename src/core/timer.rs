/// Throttled timer - minimum interval between fires
#[derive(Debug, Clone, Copy)]
pub struct Throttled {
    min_interval: f32,
    time_since_last: f32,
}

impl Throttled {
    /// Create throttled timer with minimum interval
    pub fn new(min_interval: f32) -> Self {
        Self {
            min_interval,
            time_since_last: 0.0,
        }
    }

    /// Attempt to fire, returns true if enough time has passed
    pub fn try_tick(&mut self, delta: f32) -> bool {
        self.time_since_last += delta;

        if self.time_since_last >= self.min_interval {
            self.time_since_last = 0.0;
            true
        } else {
            false
        }
    }

    /// Time accumulated since the last fire
    pub fn pending(&self) -> f32 {
        self.time_since_last
    }
}

/// Frames-per-second meter, refreshed once per interval
#[derive(Debug, Clone, Copy)]
pub struct FpsCounter {
    window: Throttled,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    pub fn new(interval: f32) -> Self {
        Self {
            window: Throttled::new(interval),
            frames: 0,
            fps: 0.0,
        }
    }

    /// Count one frame. Returns the new reading when the interval elapsed.
    pub fn frame(&mut self, delta: f32) -> Option<f32> {
        self.frames += 1;
        let span = self.window.pending() + delta;

        if self.window.try_tick(delta) {
            self.fps = if span > 0.0 {
                self.frames as f32 / span
            } else {
                0.0
            };
            self.frames = 0;
            Some(self.fps)
        } else {
            None
        }
    }

    /// Last completed reading
    pub fn fps(&self) -> f32 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttled_enforces_minimum() {
        let mut timer = Throttled::new(0.1);

        assert!(!timer.try_tick(0.05));
        assert!(timer.try_tick(0.06));
        assert!(!timer.try_tick(0.05));
    }

    #[test]
    fn fps_counter_reports_once_per_interval() {
        let mut counter = FpsCounter::new(1.0);

        for _ in 0..59 {
            assert!(counter.frame(1.0 / 60.0).is_none());
        }
        let reading = counter.frame(1.0 / 60.0 + 0.001).expect("interval elapsed");

        assert!((reading - 60.0).abs() < 1.0);
        assert_eq!(counter.fps(), reading);
    }

    #[test]
    fn fps_counter_starts_at_zero() {
        let counter = FpsCounter::new(1.0);
        assert_eq!(counter.fps(), 0.0);
    }
}
