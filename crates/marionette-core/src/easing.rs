//! Easing - the slow-fast-slow curve shared by every interpolator

/// Default steepness of the sigmoid
pub const DEFAULT_STEEPNESS: f32 = 5.0;

/// Sigmoid easing curve, normalized so that `ease(0) = 0` and `ease(1) = 1`
#[derive(Debug, Clone, Copy)]
pub struct Sigmoid {
    k: f32,
    corr: f32,
}

impl Sigmoid {
    pub fn new(k: f32) -> Self {
        let k = k.max(0.01);
        let corr = 0.5 / Self::base(k, 1.0);
        Self { k, corr }
    }

    fn base(k: f32, t: f32) -> f32 {
        1.0 / (1.0 + (-k * t).exp()) - 0.5
    }

    /// Evaluate at `t`, clamped to [0, 1]. The endpoints are exact.
    pub fn ease(&self, t: f32) -> f32 {
        if t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }
        (self.corr * Self::base(self.k, 2.0 * t - 1.0) + 0.5).clamp(0.0, 1.0)
    }
}

impl Default for Sigmoid {
    fn default() -> Self {
        Self::new(DEFAULT_STEEPNESS)
    }
}

/// Ease with the default steepness
#[inline]
pub fn ease(t: f32) -> f32 {
    Sigmoid::default().ease(t)
}

/// Interpolation fraction of `now` inside `[start, start + duration]`
#[inline]
pub fn alpha(now: f64, start: f64, duration: f64) -> f32 {
    if duration <= 0.0 {
        return 1.0;
    }
    ((now - start) / duration).clamp(0.0, 1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ease_endpoints() {
        assert_eq!(ease(0.0), 0.0);
        assert_eq!(ease(1.0), 1.0);
        assert!((ease(0.5) - 0.5).abs() < 1e-6);
        assert_eq!(ease(-3.0), 0.0);
        assert_eq!(ease(7.0), 1.0);

        let steep = Sigmoid::new(12.0);
        assert_eq!(steep.ease(0.0), 0.0);
        assert_eq!(steep.ease(1.0), 1.0);
        assert!(steep.ease(1e-4) >= 0.0 && steep.ease(1.0 - 1e-4) <= 1.0);
    }

    #[test]
    fn test_ease_monotonic_and_steep_in_middle() {
        let mut prev = 0.0;
        for i in 1..=100 {
            let v = ease(i as f32 / 100.0);
            assert!(v >= prev);
            prev = v;
        }
        // Slow at the ends, fast in the middle
        let edge = ease(0.1) - ease(0.0);
        let mid = ease(0.55) - ease(0.45);
        assert!(mid > edge);
    }

    #[test]
    fn test_alpha() {
        assert_eq!(alpha(50.0, 0.0, 100.0), 0.5);
        assert_eq!(alpha(500.0, 0.0, 100.0), 1.0);
        assert_eq!(alpha(-10.0, 0.0, 100.0), 0.0);
        assert_eq!(alpha(0.0, 0.0, 0.0), 1.0);
    }
}
