//! Simulated avatar and recording renderer

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;

use marionette_core::{ChannelKey, ChannelValue, Vec3};
use marionette_pose::{JointRest, JointSource, PoseFrame, Skeleton};
use marionette_runtime::{AvatarSource, Renderer};

/// Host scene backed by a skeleton, with optional joints left out
#[derive(Debug, Clone)]
pub struct SimulatedAvatar {
    skeleton: Skeleton,
    hidden: BTreeSet<String>,
    blendshapes: Vec<String>,
}

impl SimulatedAvatar {
    /// Reference humanoid; every blendshape is accepted
    pub fn humanoid() -> Self {
        Self {
            skeleton: Skeleton::humanoid(),
            hidden: BTreeSet::new(),
            blendshapes: Vec::new(),
        }
    }

    /// Restrict the meshes to these morph targets
    pub fn with_blendshapes(mut self, names: &[&str]) -> Self {
        self.blendshapes = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Drop joints from the scene (a rig without fingers, say)
    pub fn without_joints(mut self, names: &[&str]) -> Self {
        self.hidden.extend(names.iter().map(|n| n.to_string()));
        self
    }
}

impl JointSource for SimulatedAvatar {
    fn joint_names(&self) -> Vec<String> {
        self.skeleton
            .bones()
            .iter()
            .map(|b| b.name.clone())
            .filter(|n| !self.hidden.contains(n))
            .collect()
    }

    fn joint(&self, name: &str) -> Option<JointRest> {
        if self.hidden.contains(name) {
            return None;
        }
        let bone = self.skeleton.bone(self.skeleton.index_of(name)?)?;
        let parent = bone
            .parent
            .and_then(|p| self.skeleton.bone(p))
            .map(|p| p.name.clone());
        Some(JointRest {
            parent,
            position: bone.rest_position,
            rotation: bone.rest_rotation,
            scale: bone.rest_scale,
        })
    }
}

impl AvatarSource for SimulatedAvatar {
    fn blendshape_names(&self) -> Vec<String> {
        self.blendshapes.clone()
    }
}

/// Renderer that keeps every frame it is handed.
///
/// Clones share the same log, so a test keeps one handle and gives the
/// engine another.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    frames: Arc<Mutex<Vec<PoseFrame>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    pub fn last(&self) -> Option<PoseFrame> {
        self.frames.lock().last().cloned()
    }

    pub fn frames(&self) -> Vec<PoseFrame> {
        self.frames.lock().clone()
    }

    pub fn clear(&self) {
        self.frames.lock().clear();
    }

    /// `(time, weight)` for every frame that carried the blendshape
    pub fn blendshape_series(&self, name: &str) -> Vec<(f64, f32)> {
        self.frames
            .lock()
            .iter()
            .filter_map(|f| f.blendshape(name).map(|w| (f.time_ms, w)))
            .collect()
    }

    /// Largest weight the blendshape reached
    pub fn peak(&self, name: &str) -> Option<f32> {
        self.blendshape_series(name)
            .into_iter()
            .map(|(_, w)| w)
            .reduce(f32::max)
    }

    /// World position of a joint in the last frame
    pub fn joint_position(&self, skeleton: &Skeleton, joint: &str) -> Option<Vec3> {
        let frame = self.last()?;
        skeleton.world_of(joint, &frame.joints).map(|w| w.position)
    }

    /// Rotation channels in every frame whose norm drifted from one
    pub fn non_unit_rotations(&self, eps: f32) -> Vec<(f64, ChannelKey)> {
        let frames = self.frames.lock();
        let mut out = Vec::new();
        for frame in frames.iter() {
            for (key, value) in &frame.joints {
                if let ChannelValue::Rotation(q) = value {
                    if (q.length() - 1.0).abs() > eps {
                        out.push((frame.time_ms, key.clone()));
                    }
                }
            }
        }
        out
    }
}

impl Renderer for RecordingRenderer {
    fn apply(&mut self, frame: &PoseFrame) {
        self.frames.lock().push(frame.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avatar_binds_like_the_reference() {
        let avatar = SimulatedAvatar::humanoid();
        let skeleton = Skeleton::bind(&avatar).unwrap();
        assert_eq!(skeleton.len(), Skeleton::humanoid().len());
        let head = skeleton.world_of("Head", &Default::default()).unwrap();
        assert!((head.position.y - 1.59).abs() < 1e-4);
    }

    #[test]
    fn test_hidden_joints_are_not_bound() {
        let avatar = SimulatedAvatar::humanoid().without_joints(&["LeftHandMiddle1", "LeftHandMiddle2"]);
        let skeleton = Skeleton::bind(&avatar).unwrap();
        assert!(!skeleton.contains("LeftHandMiddle1"));
        assert!(skeleton.contains("LeftHand"));
    }

    #[test]
    fn test_recorder_shares_log() {
        let recorder = RecordingRenderer::new();
        let mut engine_side = recorder.clone();
        let mut frame = PoseFrame::new(16.0);
        frame.blendshapes.insert("viseme_aa".into(), 0.4);
        engine_side.apply(&frame);
        frame.time_ms = 32.0;
        frame.blendshapes.insert("viseme_aa".into(), 0.8);
        engine_side.apply(&frame);

        assert_eq!(recorder.len(), 2);
        assert_eq!(recorder.peak("viseme_aa"), Some(0.8));
        assert_eq!(recorder.blendshape_series("viseme_aa")[0], (16.0, 0.4));
    }
}
