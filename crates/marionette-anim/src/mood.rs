//! Moods - baseline expressions plus the idle animations they run

use std::collections::BTreeMap;

use marionette_core::{AnimError, AnimResult, TemplateKind};

/// Idle animations every awake mood runs
const AWAKE: [&str; 6] = ["breathing", "blink", "eyes", "head", "pose", "talkinghands"];

/// Named mood
#[derive(Debug, Clone, PartialEq)]
pub struct Mood {
    pub name: String,
    /// Channel values the baseline layer settles on; absent channels settle on 0
    pub baseline: BTreeMap<String, f32>,
    /// Pose taken when the mood is set
    pub pose: Option<String>,
    /// Animation templates spawned as endless loops
    pub anims: Vec<String>,
}

impl Mood {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            baseline: BTreeMap::new(),
            pose: None,
            anims: AWAKE.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_baseline(mut self, channel: &str, value: f32) -> Self {
        self.baseline.insert(channel.to_string(), value);
        self
    }

    /// Same value on both `Left`/`Right` suffixed channels
    pub fn with_pair(self, channel: &str, value: f32) -> Self {
        self.with_baseline(&format!("{channel}Left"), value)
            .with_baseline(&format!("{channel}Right"), value)
    }

    pub fn with_pose(mut self, pose: &str) -> Self {
        self.pose = Some(pose.to_string());
        self
    }

    pub fn with_anims(mut self, anims: &[&str]) -> Self {
        self.anims = anims.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// Catalog of moods
#[derive(Debug, Clone, Default)]
pub struct MoodLibrary {
    moods: BTreeMap<String, Mood>,
}

impl MoodLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        Self::new()
            .with(Mood::new("neutral"))
            .with(
                Mood::new("happy")
                    .with_pair("mouthSmile", 0.2)
                    .with_baseline("eyesLookDown", 0.1),
            )
            .with(
                Mood::new("angry")
                    .with_pair("browDown", 0.4)
                    .with_pair("mouthPress", 0.3)
                    .with_pair("eyeSquint", 0.3)
                    .with_baseline("headRotateX", 0.05)
                    .with_pose("wide"),
            )
            .with(
                Mood::new("sad")
                    .with_baseline("browInnerUp", 0.6)
                    .with_pair("mouthFrown", 0.3)
                    .with_pair("eyeSquint", 0.1)
                    .with_baseline("headRotateX", 0.12)
                    .with_pose("side"),
            )
            .with(
                Mood::new("fear")
                    .with_baseline("browInnerUp", 0.4)
                    .with_pair("eyeWide", 0.5)
                    .with_pair("mouthStretch", 0.2)
                    .with_baseline("headRotateX", -0.05),
            )
            .with(
                Mood::new("disgust")
                    .with_pair("noseSneer", 0.5)
                    .with_pair("mouthUpperUp", 0.3)
                    .with_pair("browDown", 0.2),
            )
            .with(
                Mood::new("love")
                    .with_pair("mouthSmile", 0.3)
                    .with_pair("eyeSquint", 0.3)
                    .with_baseline("browInnerUp", 0.2)
                    .with_baseline("headRotateZ", 0.05),
            )
            .with(
                Mood::new("sleep")
                    .with_pair("eyeBlink", 1.0)
                    .with_baseline("headRotateX", 0.25)
                    .with_baseline("jawOpen", 0.05)
                    .with_anims(&["breathing", "pose"]),
            )
    }

    pub fn with(mut self, mood: Mood) -> Self {
        self.moods.insert(mood.name.clone(), mood);
        self
    }

    pub fn get(&self, name: &str) -> AnimResult<&Mood> {
        self.moods.get(name).ok_or_else(|| AnimError::unknown(TemplateKind::Mood, name))
    }

    pub fn names(&self) -> Vec<&str> {
        self.moods.keys().map(String::as_str).collect()
    }
}
