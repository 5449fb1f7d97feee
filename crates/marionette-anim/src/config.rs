//! Scheduler configuration

use serde::{Deserialize, Serialize};

use crate::template::{BodyForm, View};

/// Amplitude factor for channels whose name starts with `prefix`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DampingRule {
    pub prefix: String,
    pub factor: f32,
}

impl DampingRule {
    pub fn new(prefix: impl Into<String>, factor: f32) -> Self {
        Self {
            prefix: prefix.into(),
            factor,
        }
    }
}

/// Per-channel damping applied while the avatar speaks, to respawned idle
/// animations and to baseline values. First matching prefix wins.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DampingConfig {
    pub rules: Vec<DampingRule>,
}

impl Default for DampingConfig {
    fn default() -> Self {
        Self {
            rules: vec![
                DampingRule::new("headRotate", 0.25),
                DampingRule::new("eyes", 0.25),
                DampingRule::new("eyeLook", 0.25),
                DampingRule::new("mouth", 0.33),
            ],
        }
    }
}

impl DampingConfig {
    /// No damping at all
    pub fn none() -> Self {
        Self { rules: Vec::new() }
    }

    /// Factor for a channel (1.0 when no rule matches)
    pub fn factor(&self, channel: &str) -> f32 {
        self.rules
            .iter()
            .find(|r| channel.starts_with(r.prefix.as_str()))
            .map(|r| r.factor)
            .unwrap_or(1.0)
    }
}

/// Scheduler configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Time for an unowned channel to settle on its baseline
    pub baseline_approach_ms: f64,
    /// Damping while speaking
    pub damping: DampingConfig,
    pub view: View,
    pub body: BodyForm,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            baseline_approach_ms: 1000.0,
            damping: DampingConfig::default(),
            view: View::Full,
            body: BodyForm::M,
        }
    }
}
