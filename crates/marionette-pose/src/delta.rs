//! Corrective delta layer
//!
//! A handful of named controls (head and body rotation, eye rotation,
//! breathing, fist closure) are turned into per-channel offsets every tick
//! and composed onto the blended pose. Nothing persists past one frame.

use std::collections::BTreeMap;

use marionette_core::{ChannelKey, ChannelValue, Property, Vec3};

use crate::skeleton::Skeleton;

/// Control names understood by the delta layer
pub const DELTA_CONTROLS: [&str; 11] = [
    "headRotateX",
    "headRotateY",
    "headRotateZ",
    "bodyRotateX",
    "bodyRotateY",
    "bodyRotateZ",
    "eyesRotateX",
    "eyesRotateY",
    "chestInhale",
    "handFistLeft",
    "handFistRight",
];

/// Largest finger curl of a closed fist (radians)
const FIST_CURL: f32 = 1.4;

/// Is this a delta-layer control?
pub fn is_delta_control(name: &str) -> bool {
    DELTA_CONTROLS.iter().any(|c| *c == name)
}

/// Per-tick control values
#[derive(Debug, Clone, Default)]
pub struct DeltaPoseLayer {
    controls: BTreeMap<&'static str, f32>,
}

impl DeltaPoseLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a control; returns false for names the layer does not know
    pub fn set_control(&mut self, name: &str, value: f32) -> bool {
        match DELTA_CONTROLS.iter().find(|c| **c == name) {
            Some(c) => {
                self.controls.insert(*c, value);
                true
            }
            None => false,
        }
    }

    pub fn control(&self, name: &str) -> f32 {
        self.controls.get(name).copied().unwrap_or(0.0)
    }

    /// Forget this frame's inputs
    pub fn clear(&mut self) {
        self.controls.clear();
    }

    /// Offsets implied by the current controls
    pub fn deltas(&self) -> BTreeMap<ChannelKey, ChannelValue> {
        let mut out = BTreeMap::new();
        let c = |name: &str| self.control(name);
        let euler = |x: f32, y: f32, z: f32| ChannelValue::from_euler(Property::Rotation, Vec3::new(x, y, z));

        let head = Vec3::new(c("headRotateX"), c("headRotateY"), c("headRotateZ"));
        if head != Vec3::ZERO {
            out.insert(ChannelKey::rotation("Head"), euler(head.x, head.y, head.z));
        }

        let body = Vec3::new(c("bodyRotateX"), c("bodyRotateY"), c("bodyRotateZ"));
        if body != Vec3::ZERO {
            out.insert(ChannelKey::rotation("Spine"), euler(body.x, body.y, body.z));
        }

        let (ex, ey) = (c("eyesRotateX"), c("eyesRotateY"));
        if ex != 0.0 || ey != 0.0 {
            let eye = euler(ex, ey, 0.0);
            out.insert(ChannelKey::rotation("LeftEye"), eye.clone());
            out.insert(ChannelKey::rotation("RightEye"), eye);
        }

        let inhale = c("chestInhale");
        // Neck counters the chest lift so the head stays level
        let neck_pitch = -0.02 * inhale;
        if inhale != 0.0 {
            out.insert(
                ChannelKey::scale("Spine1"),
                ChannelValue::Vector(Vec3::new(0.02 * inhale, 0.03 * inhale, 0.04 * inhale)),
            );
        }
        if neck_pitch != 0.0 {
            out.insert(ChannelKey::rotation("Neck"), euler(neck_pitch, 0.0, 0.0));
        }

        for (side, sign) in [("Left", -1.0f32), ("Right", 1.0f32)] {
            let fist = c(&format!("handFist{side}"));
            if fist == 0.0 {
                continue;
            }
            let curl = euler(0.0, 0.0, sign * FIST_CURL * fist);
            for finger in ["Index", "Middle", "Ring", "Pinky"] {
                for segment in 1..=2 {
                    out.insert(ChannelKey::rotation(format!("{side}Hand{finger}{segment}")), curl.clone());
                }
            }
            out.insert(
                ChannelKey::rotation(format!("{side}HandThumb1")),
                euler(0.0, -sign * 0.5 * fist, 0.0),
            );
        }
        out
    }

    /// Compose this frame's deltas onto `pose`.
    /// Channels absent from the pose start from the skeleton's rest value;
    /// channels the skeleton lacks are skipped.
    pub fn apply(&self, pose: &mut BTreeMap<ChannelKey, ChannelValue>, skeleton: &Skeleton) {
        for (key, delta) in self.deltas() {
            let base = match pose.get(&key) {
                Some(v) => v.clone(),
                None => match skeleton.rest_value(&key) {
                    Some(rest) => rest,
                    None => {
                        tracing::trace!(channel = %key, "delta channel not bound, skipped");
                        continue;
                    }
                },
            };
            pose.insert(key, base.compose(&delta));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marionette_core::Quat;

    #[test]
    fn test_unknown_control_rejected() {
        let mut layer = DeltaPoseLayer::new();
        assert!(layer.set_control("headRotateY", 0.2));
        assert!(!layer.set_control("mouthSmile", 0.2));
        assert_eq!(layer.control("headRotateY"), 0.2);
    }

    #[test]
    fn test_zero_controls_leave_pose_untouched() {
        let layer = DeltaPoseLayer::new();
        assert!(layer.deltas().is_empty());
    }

    #[test]
    fn test_head_rotation_composed() {
        let skeleton = Skeleton::humanoid();
        let mut layer = DeltaPoseLayer::new();
        layer.set_control("headRotateY", 0.4);

        let mut pose = BTreeMap::new();
        pose.insert(ChannelKey::rotation("Head"), ChannelValue::Rotation(Quat::IDENTITY));
        layer.apply(&mut pose, &skeleton);

        let q = pose[&ChannelKey::rotation("Head")].as_rotation().unwrap();
        let expected = Quat::from_rotation_y(0.4);
        assert!(q.dot(expected).abs() > 1.0 - 1e-5);
    }

    #[test]
    fn test_breathing_scales_chest_from_rest() {
        let skeleton = Skeleton::humanoid();
        let mut layer = DeltaPoseLayer::new();
        layer.set_control("chestInhale", 1.0);

        let mut pose = BTreeMap::new();
        layer.apply(&mut pose, &skeleton);
        let scale = pose[&ChannelKey::scale("Spine1")].as_vector().unwrap();
        assert!(scale.abs_diff_eq(Vec3::new(1.02, 1.03, 1.04), 1e-5));
        assert!(pose.contains_key(&ChannelKey::rotation("Neck")));
    }

    #[test]
    fn test_fists_curl_opposite_ways() {
        let mut layer = DeltaPoseLayer::new();
        layer.set_control("handFistLeft", 1.0);
        layer.set_control("handFistRight", 1.0);
        let deltas = layer.deltas();
        let left = deltas[&ChannelKey::rotation("LeftHandIndex1")].as_rotation().unwrap();
        let right = deltas[&ChannelKey::rotation("RightHandIndex1")].as_rotation().unwrap();
        assert!(left.z < 0.0 && right.z > 0.0);
    }

    #[test]
    fn test_missing_joint_skipped() {
        let skeleton = Skeleton::default();
        let mut layer = DeltaPoseLayer::new();
        layer.set_control("eyesRotateY", 0.1);
        let mut pose = BTreeMap::new();
        layer.apply(&mut pose, &skeleton);
        assert!(pose.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut layer = DeltaPoseLayer::new();
        layer.set_control("bodyRotateX", 0.1);
        layer.clear();
        assert!(layer.deltas().is_empty());
    }
}
