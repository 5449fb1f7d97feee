//! Renderer hand-off

use std::collections::BTreeMap;

use marionette_core::{ChannelKey, ChannelValue};

use crate::skeleton::Skeleton;

/// Final per-tick output: joint channels plus blendshape weights
#[derive(Debug, Clone, Default)]
pub struct PoseFrame {
    pub time_ms: f64,
    pub joints: BTreeMap<ChannelKey, ChannelValue>,
    pub blendshapes: BTreeMap<String, f32>,
}

impl PoseFrame {
    pub fn new(time_ms: f64) -> Self {
        Self {
            time_ms,
            ..Default::default()
        }
    }

    /// Build a frame from a composed pose, keeping only channels the skeleton binds
    pub fn from_pose(time_ms: f64, pose: BTreeMap<ChannelKey, ChannelValue>, skeleton: &Skeleton) -> Self {
        let joints = pose
            .into_iter()
            .filter(|(key, value)| skeleton.has_channel(key) && !matches!(value, ChannelValue::Dynamic(_)))
            .collect();
        Self {
            time_ms,
            joints,
            blendshapes: BTreeMap::new(),
        }
    }

    pub fn joint(&self, key: &ChannelKey) -> Option<&ChannelValue> {
        self.joints.get(key)
    }

    pub fn blendshape(&self, name: &str) -> Option<f32> {
        self.blendshapes.get(name).copied()
    }

    pub fn set_blendshape(&mut self, name: impl Into<String>, weight: f32) {
        self.blendshapes.insert(name.into(), weight);
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty() && self.blendshapes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marionette_core::{Quat, Vec3};

    #[test]
    fn test_unbound_joints_dropped() {
        let skeleton = Skeleton::humanoid();
        let mut pose = BTreeMap::new();
        pose.insert(ChannelKey::rotation("Head"), ChannelValue::Rotation(Quat::IDENTITY));
        pose.insert(ChannelKey::rotation("Tail"), ChannelValue::Rotation(Quat::IDENTITY));
        pose.insert(ChannelKey::position("Hips"), ChannelValue::Vector(Vec3::Y));

        let frame = PoseFrame::from_pose(16.0, pose, &skeleton);
        assert_eq!(frame.joints.len(), 2);
        assert!(frame.joint(&ChannelKey::rotation("Tail")).is_none());
    }

    #[test]
    fn test_blendshapes() {
        let mut frame = PoseFrame::new(0.0);
        assert!(frame.is_empty());
        frame.set_blendshape("viseme_aa", 0.7);
        assert_eq!(frame.blendshape("viseme_aa"), Some(0.7));
    }
}
