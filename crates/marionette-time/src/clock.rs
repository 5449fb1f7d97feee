//! Animation clock

use serde::{Deserialize, Serialize};

/// Clock configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Frame-rate cap (None = every callback is processed)
    pub max_fps: Option<f32>,
    /// Slowdown rate (1.0 = real time, 2.0 = half speed)
    pub slowdown_rate: f64,
    /// Largest wall-clock step accepted in one tick (e.g. after the host was suspended)
    pub max_step_ms: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        ClockConfig {
            max_fps: None,
            slowdown_rate: 1.0,
            max_step_ms: 1000.0,
        }
    }
}

impl ClockConfig {
    /// Minimum interval between processed frames
    pub fn min_frame_interval_ms(&self) -> f64 {
        match self.max_fps {
            Some(fps) if fps > 0.0 => 1000.0 / fps as f64,
            _ => 0.0,
        }
    }
}

/// Result of a clock tick
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClockTick {
    /// Frame accepted; logical time advanced by `dt_ms`
    Advanced { now_ms: f64, dt_ms: f64 },
    /// Frame arrived before the minimum frame interval elapsed
    Skipped,
}

/// Logical animation clock.
/// INVARIANT: logical time is monotonically non-decreasing.
#[derive(Clone, Debug)]
pub struct AnimClock {
    /// Current logical time (ms)
    now_ms: f64,
    /// Wall time of the last accepted frame
    last_wall_ms: Option<f64>,
    config: ClockConfig,
}

impl AnimClock {
    pub fn new() -> Self {
        Self::with_config(ClockConfig::default())
    }

    pub fn with_config(mut config: ClockConfig) -> Self {
        config.slowdown_rate = Self::sanitize_rate(config.slowdown_rate);
        AnimClock {
            now_ms: 0.0,
            last_wall_ms: None,
            config,
        }
    }

    /// Feed one render callback timestamp (wall ms).
    /// The first callback only anchors the wall clock.
    pub fn tick(&mut self, wall_ms: f64) -> ClockTick {
        let Some(last) = self.last_wall_ms else {
            self.last_wall_ms = Some(wall_ms);
            return ClockTick::Advanced {
                now_ms: self.now_ms,
                dt_ms: 0.0,
            };
        };

        let dt = wall_ms - last;
        if dt < self.config.min_frame_interval_ms() {
            tracing::trace!(dt, "frame skipped by frame-rate cap");
            return ClockTick::Skipped;
        }
        self.last_wall_ms = Some(wall_ms);

        // Clamp to prevent large jumps and never run backwards
        let dt = dt.clamp(0.0, self.config.max_step_ms);
        let logical_dt = dt / self.config.slowdown_rate;
        self.now_ms += logical_dt;

        ClockTick::Advanced {
            now_ms: self.now_ms,
            dt_ms: logical_dt,
        }
    }

    /// Current logical time (ms)
    pub fn now(&self) -> f64 {
        self.now_ms
    }

    /// Set slowdown rate (clamped to at least 0.1)
    pub fn set_slowdown_rate(&mut self, rate: f64) {
        self.config.slowdown_rate = Self::sanitize_rate(rate);
    }

    pub fn slowdown_rate(&self) -> f64 {
        self.config.slowdown_rate
    }

    pub fn set_max_fps(&mut self, fps: Option<f32>) {
        self.config.max_fps = fps;
    }

    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    /// Forget the wall-clock anchor (e.g. after the host paused rendering)
    pub fn reset_anchor(&mut self) {
        self.last_wall_ms = None;
    }

    fn sanitize_rate(rate: f64) -> f64 {
        if rate.is_finite() {
            rate.max(0.1)
        } else {
            1.0
        }
    }
}

impl Default for AnimClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_tick_anchors() {
        let mut clock = AnimClock::new();
        assert_eq!(
            clock.tick(5000.0),
            ClockTick::Advanced { now_ms: 0.0, dt_ms: 0.0 }
        );
        clock.tick(5016.0);
        assert!((clock.now() - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_frame_rate_cap() {
        let mut clock = AnimClock::with_config(ClockConfig {
            max_fps: Some(30.0),
            ..Default::default()
        });
        clock.tick(0.0);
        assert_eq!(clock.tick(16.0), ClockTick::Skipped);
        assert!(matches!(clock.tick(34.0), ClockTick::Advanced { .. }));
        assert!((clock.now() - 34.0).abs() < 1e-9);
    }

    #[test]
    fn test_slowdown() {
        let mut clock = AnimClock::with_config(ClockConfig {
            slowdown_rate: 2.0,
            ..Default::default()
        });
        clock.tick(0.0);
        clock.tick(100.0);
        assert!((clock.now() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_large_jump_clamped() {
        let mut clock = AnimClock::new();
        clock.tick(0.0);
        clock.tick(60_000.0);
        assert!((clock.now() - 1000.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_clock_monotonic(steps in proptest::collection::vec(-50.0f64..200.0, 1..50)) {
            let mut clock = AnimClock::new();
            let mut wall = 0.0;
            let mut prev = clock.now();
            clock.tick(wall);
            for s in steps {
                wall += s;
                clock.tick(wall);
                prop_assert!(clock.now() >= prev);
                prev = clock.now();
            }
        }
    }
}
