use std::time::Instant;

/// Monotonic frame clock
///
/// The single time source for shader uniforms. Each `tick` returns the
/// seconds since the previous one; the first tick measures from creation.
#[derive(Debug, Clone)]
pub struct Clock {
    last_tick: Instant,
}

impl Clock {
    /// Create new clock starting now
    pub fn new() -> Self {
        Self {
            last_tick: Instant::now(),
        }
    }

    /// Get delta time since last tick and advance clock
    /// Returns delta in seconds
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let delta = now.duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;
        delta
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn clock_measures_delta() {
        let mut clock = Clock::new();

        thread::sleep(Duration::from_millis(10));
        let delta = clock.tick();

        assert!(delta >= 0.009);
    }

    #[test]
    fn tick_restarts_measurement() {
        let mut clock = Clock::new();
        thread::sleep(Duration::from_millis(20));
        let first = clock.tick();
        let second = clock.tick();

        assert!(first >= 0.019);
        assert!(second >= 0.0);
        assert!(second < first);
    }
}
