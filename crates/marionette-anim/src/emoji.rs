//! Emoji animations
//!
//! Short facial timelines keyed by emoji. Hand emojis also name a gesture
//! template; aliases point at another emoji through `link`.

use std::collections::BTreeMap;

use marionette_core::{AnimError, AnimResult, Scalar, TemplateKind};

use crate::template::AnimSpec;

/// One emoji's timeline
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EmojiAnimation {
    pub name: String,
    /// Alias target (resolved one level)
    pub link: Option<String>,
    /// Gesture template played alongside
    pub gesture: Option<String>,
    pub dt: Vec<f32>,
    pub vs: BTreeMap<String, Vec<f32>>,
    /// Per-segment weights used when stretching to a longer duration
    pub rescale: Option<Vec<f32>>,
}

impl EmojiAnimation {
    pub fn new(name: &str, dt: &[f32]) -> Self {
        Self {
            name: name.to_string(),
            dt: dt.to_vec(),
            ..Default::default()
        }
    }

    pub fn alias(name: &str, link: &str) -> Self {
        Self {
            name: name.to_string(),
            link: Some(link.to_string()),
            ..Default::default()
        }
    }

    pub fn channel(mut self, name: &str, values: &[f32]) -> Self {
        self.vs.insert(name.to_string(), values.to_vec());
        self
    }

    pub fn gesture(mut self, gesture: &str) -> Self {
        self.gesture = Some(gesture.to_string());
        self
    }

    pub fn rescale(mut self, weights: &[f32]) -> Self {
        self.rescale = Some(weights.to_vec());
        self
    }

    /// Authored length in ms
    pub fn duration_ms(&self) -> f64 {
        self.dt.iter().map(|&d| d.max(0.0) as f64).sum()
    }

    /// Leaf timeline starting immediately
    pub fn to_spec(&self) -> AnimSpec {
        let mut spec = AnimSpec::new(0.0f32).steps(self.dt.iter().copied().map(Scalar::Fixed));
        for (channel, values) in &self.vs {
            spec = spec.channel(channel, values.iter().copied());
        }
        spec
    }
}

/// Catalog of emoji animations
#[derive(Debug, Clone, Default)]
pub struct EmojiLibrary {
    emojis: BTreeMap<String, EmojiAnimation>,
}

impl EmojiLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let smile = |name: &str, v: f32| {
            EmojiAnimation::new(name, &[300.0, 2000.0])
                .channel("mouthSmileLeft", &[v])
                .channel("mouthSmileRight", &[v])
                .rescale(&[0.0, 1.0])
        };
        Self::new()
            .with(
                smile("😀", 0.8)
                    .channel("jawOpen", &[0.2])
                    .channel("browInnerUp", &[0.3]),
            )
            .with(smile("😊", 0.6).channel("eyeSquintLeft", &[0.4]).channel("eyeSquintRight", &[0.4]))
            .with(EmojiAnimation::alias("😁", "😀"))
            .with(
                EmojiAnimation::new("😐", &[300.0, 2000.0])
                    .channel("mouthPressLeft", &[0.3])
                    .channel("mouthPressRight", &[0.3])
                    .rescale(&[0.0, 1.0]),
            )
            .with(
                EmojiAnimation::new("😢", &[500.0, 2000.0])
                    .channel("browInnerUp", &[0.8])
                    .channel("mouthFrownLeft", &[0.6])
                    .channel("mouthFrownRight", &[0.6])
                    .channel("eyesLookDown", &[0.4])
                    .rescale(&[0.0, 1.0]),
            )
            .with(
                EmojiAnimation::new("😮", &[200.0, 1500.0])
                    .channel("jawOpen", &[0.5])
                    .channel("mouthFunnel", &[0.4])
                    .channel("browInnerUp", &[0.6])
                    .channel("eyeWideLeft", &[0.5])
                    .channel("eyeWideRight", &[0.5])
                    .rescale(&[0.0, 1.0]),
            )
            .with(
                EmojiAnimation::new("😉", &[100.0, 500.0, 300.0])
                    .channel("eyeBlinkRight", &[1.0, 1.0, 0.0])
                    .channel("mouthSmileLeft", &[0.4, 0.4, 0.2])
                    .rescale(&[0.0, 1.0, 0.0]),
            )
            .with(
                EmojiAnimation::new("👍", &[500.0, 2000.0])
                    .channel("mouthSmileLeft", &[0.3])
                    .channel("mouthSmileRight", &[0.3])
                    .gesture("thumbup")
                    .rescale(&[0.0, 1.0]),
            )
            .with(
                EmojiAnimation::new("👎", &[500.0, 2000.0])
                    .channel("mouthFrownLeft", &[0.4])
                    .channel("mouthFrownRight", &[0.4])
                    .gesture("thumbdown")
                    .rescale(&[0.0, 1.0]),
            )
            .with(
                EmojiAnimation::new("👌", &[500.0, 2000.0])
                    .channel("mouthSmileLeft", &[0.2])
                    .channel("mouthSmileRight", &[0.2])
                    .gesture("ok")
                    .rescale(&[0.0, 1.0]),
            )
            .with(
                EmojiAnimation::new("☝️", &[500.0, 2000.0])
                    .channel("browInnerUp", &[0.4])
                    .gesture("index")
                    .rescale(&[0.0, 1.0]),
            )
            .with(
                EmojiAnimation::new("🤷", &[1000.0, 2000.0])
                    .channel("browInnerUp", &[0.7])
                    .channel("mouthPressLeft", &[0.4])
                    .channel("mouthPressRight", &[0.4])
                    .channel("headRotateZ", &[0.1])
                    .gesture("shrug")
                    .rescale(&[0.0, 1.0]),
            )
            .with(
                EmojiAnimation::new("👋", &[500.0, 2000.0])
                    .channel("mouthSmileLeft", &[0.5])
                    .channel("mouthSmileRight", &[0.5])
                    .gesture("handup")
                    .rescale(&[0.0, 1.0]),
            )
    }

    pub fn with(mut self, emoji: EmojiAnimation) -> Self {
        self.emojis.insert(emoji.name.clone(), emoji);
        self
    }

    /// Look up an emoji, following a link one level
    pub fn get(&self, name: &str) -> Option<&EmojiAnimation> {
        let emoji = self.emojis.get(name)?;
        match &emoji.link {
            Some(link) => self.emojis.get(link),
            None => Some(emoji),
        }
    }

    pub fn require(&self, name: &str) -> AnimResult<&EmojiAnimation> {
        self.get(name).ok_or_else(|| AnimError::unknown(TemplateKind::Emoji, name))
    }

    pub fn names(&self) -> Vec<&str> {
        self.emojis.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marionette_pose::PoseTemplateLibrary;

    #[test]
    fn test_link_resolves_one_level() {
        let lib = EmojiLibrary::builtin();
        assert_eq!(lib.get("😁").unwrap().name, "😀");
        let chained = lib.clone().with(EmojiAnimation::alias("x", "😁"));
        // The alias target is itself an alias: not followed further
        assert_eq!(chained.get("x").unwrap().name, "😁");
        assert!(lib.get("🦄").is_none());
        assert!(lib.require("🦄").is_err());
    }

    #[test]
    fn test_builtin_set() {
        let lib = EmojiLibrary::builtin();
        assert_eq!(lib.names().len(), 13);
        let poses = PoseTemplateLibrary::builtin();
        for name in lib.names() {
            if let Some(gesture) = &lib.get(name).unwrap().gesture {
                assert!(poses.has_gesture(gesture), "{name} -> {gesture}");
            }
        }
    }

    #[test]
    fn test_to_spec() {
        let lib = EmojiLibrary::builtin();
        let wink = lib.get("😉").unwrap();
        assert_eq!(wink.duration_ms(), 900.0);
        let spec = wink.to_spec();
        assert_eq!(spec.dt.len(), 3);
        assert_eq!(spec.vs["eyeBlinkRight"].len(), 3);
    }
}
