//! Deadline timers on the logical clock
//!
//! Host timeouts (gesture expiry, speech breaks, pose continuations) are
//! modelled as deadlines polled from the tick, so they are serialized with
//! everything else and can be driven by a manual clock in tests.

/// One-shot timer
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Deadline {
    due_ms: Option<f64>,
}

impl Deadline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) to fire at `due_ms`
    pub fn arm(&mut self, due_ms: f64) {
        self.due_ms = Some(due_ms);
    }

    /// Arm to fire `delay_ms` after `now_ms`
    pub fn arm_after(&mut self, now_ms: f64, delay_ms: f64) {
        self.arm(now_ms + delay_ms.max(0.0));
    }

    pub fn cancel(&mut self) {
        self.due_ms = None;
    }

    pub fn is_armed(&self) -> bool {
        self.due_ms.is_some()
    }

    pub fn due(&self) -> Option<f64> {
        self.due_ms
    }

    /// Returns true exactly once when `now_ms` reaches the deadline
    pub fn poll(&mut self, now_ms: f64) -> bool {
        match self.due_ms {
            Some(due) if now_ms >= due => {
                self.due_ms = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_fires_once() {
        let mut d = Deadline::new();
        d.arm_after(100.0, 500.0);
        assert!(!d.poll(599.0));
        assert!(d.poll(600.0));
        assert!(!d.poll(700.0));
        assert!(!d.is_armed());
    }

    #[test]
    fn test_cancel() {
        let mut d = Deadline::new();
        d.arm(10.0);
        d.cancel();
        assert!(!d.poll(100.0));
    }
}
