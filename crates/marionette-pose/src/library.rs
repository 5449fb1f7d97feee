//! Built-in pose and gesture catalog
//!
//! Loaded once when the engine is constructed and never mutated afterwards.
//! Joint conventions follow [`Skeleton::humanoid`](crate::Skeleton::humanoid):
//! Y up, facing +Z, left side on +X, T-pose rest. Arms drop with a negative
//! Z rotation on the left side, thighs swing forward with negative X, knees
//! flex with positive X. Right-side values are derived by mirroring.

use std::collections::BTreeMap;

use marionette_core::{range, AnimError, AnimResult, ChannelKey, TemplateKind};

use crate::template::{GestureTemplate, PoseTemplate, Stance, TemplateValue};

const FINGERS: [&str; 4] = ["Index", "Middle", "Ring", "Pinky"];

/// Immutable catalog of named poses and gestures
#[derive(Debug, Clone, Default)]
pub struct PoseTemplateLibrary {
    poses: BTreeMap<String, PoseTemplate>,
    gestures: BTreeMap<String, GestureTemplate>,
}

impl PoseTemplateLibrary {
    /// Transitional template between standing and grounded stances
    pub const INTERMEDIATE_POSE: &'static str = "oneknee";

    /// Empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Library with every built-in pose and gesture
    pub fn builtin() -> Self {
        let mut lib = Self::new();
        for pose in builtin_poses() {
            lib = lib.with_pose(pose);
        }
        for gesture in builtin_gestures() {
            lib = lib.with_gesture(gesture);
        }
        lib
    }

    /// Add (or replace) a pose
    pub fn with_pose(mut self, pose: PoseTemplate) -> Self {
        self.poses.insert(pose.name.clone(), pose);
        self
    }

    /// Add (or replace) a gesture
    pub fn with_gesture(mut self, gesture: GestureTemplate) -> Self {
        self.gestures.insert(gesture.name.clone(), gesture);
        self
    }

    pub fn pose(&self, name: &str) -> AnimResult<&PoseTemplate> {
        self.poses
            .get(name)
            .ok_or_else(|| AnimError::unknown(TemplateKind::Pose, name))
    }

    pub fn gesture(&self, name: &str) -> AnimResult<&GestureTemplate> {
        self.gestures
            .get(name)
            .ok_or_else(|| AnimError::unknown(TemplateKind::Gesture, name))
    }

    pub fn has_pose(&self, name: &str) -> bool {
        self.poses.contains_key(name)
    }

    pub fn has_gesture(&self, name: &str) -> bool {
        self.gestures.contains_key(name)
    }

    pub fn pose_names(&self) -> Vec<&str> {
        self.poses.keys().map(String::as_str).collect()
    }

    pub fn gesture_names(&self) -> Vec<&str> {
        self.gestures.keys().map(String::as_str).collect()
    }
}

fn rot(joint: &str) -> ChannelKey {
    ChannelKey::rotation(joint)
}

fn v(x: f32, y: f32, z: f32) -> TemplateValue {
    TemplateValue::fixed(x, y, z)
}

/// Relaxed standing body shared by every pose; each pose overrides a subset,
/// so all poses cover the same channel set.
fn posture(name: &str, stance: Stance) -> PoseTemplate {
    let mut pose = PoseTemplate::new(name, stance)
        .prop(ChannelKey::position("Hips"), v(0.0, 1.0, 0.0))
        .prop(rot("Hips"), TemplateValue::new(0.0f32, range(-0.05, 0.05), 0.0f32))
        .prop(rot("Spine"), v(0.0, 0.0, 0.0))
        .prop(rot("Spine1"), v(0.02, 0.0, 0.0))
        .prop(rot("Spine2"), v(0.02, 0.0, 0.0))
        .prop(rot("Neck"), v(0.0, 0.0, 0.0))
        .prop(rot("Head"), v(-0.04, 0.0, 0.0))
        .symmetric(rot("LeftShoulder"), v(0.0, 0.0, -0.05))
        .symmetric(rot("LeftArm"), v(0.0, 0.1, -1.35))
        .symmetric(rot("LeftForeArm"), v(0.0, -0.3, 0.0))
        .symmetric(rot("LeftHand"), v(0.0, 0.0, -0.1))
        .symmetric(rot("LeftUpLeg"), v(0.0, 0.0, 0.0))
        .symmetric(rot("LeftLeg"), v(0.0, 0.0, 0.0))
        .symmetric(rot("LeftFoot"), v(0.0, 0.0, 0.0))
        .symmetric(rot("LeftHandThumb1"), v(0.0, -0.2, 0.0))
        .symmetric(rot("LeftHandThumb2"), v(0.0, -0.1, 0.0));
    for finger in FINGERS {
        pose = pose
            .symmetric(rot(&format!("LeftHand{finger}1")), v(0.0, 0.0, -0.15))
            .symmetric(rot(&format!("LeftHand{finger}2")), v(0.0, 0.0, -0.2));
    }
    pose
}

fn builtin_poses() -> Vec<PoseTemplate> {
    vec![
        posture("straight", Stance::Standing),
        // Weight on the left leg, right knee relaxed
        posture("side", Stance::Standing)
            .prop(ChannelKey::position("Hips"), v(0.04, 0.99, 0.0))
            .prop(rot("Hips"), v(0.0, 0.0, 0.06))
            .prop(rot("Spine"), v(0.0, 0.0, -0.08))
            .prop(rot("LeftUpLeg"), v(0.0, 0.0, -0.06))
            .prop(rot("RightUpLeg"), v(-0.15, 0.0, 0.1))
            .prop(rot("RightLeg"), v(0.3, 0.0, 0.0))
            .prop(rot("RightFoot"), v(-0.15, 0.0, 0.0)),
        // Left hand on the hip
        posture("hip", Stance::Standing)
            .prop(ChannelKey::position("Hips"), v(0.03, 1.0, 0.0))
            .prop(rot("Hips"), v(0.0, 0.0, 0.05))
            .prop(rot("LeftArm"), v(0.0, 0.5, -1.0))
            .prop(rot("LeftForeArm"), v(0.0, -1.6, 0.0))
            .prop(rot("LeftHand"), v(0.0, 0.0, 0.3))
            .prop(rot("RightUpLeg"), v(-0.1, 0.0, 0.08))
            .prop(rot("RightLeg"), v(0.2, 0.0, 0.0)),
        posture("wide", Stance::Standing)
            .prop(ChannelKey::position("Hips"), v(0.0, 0.97, 0.0))
            .symmetric(rot("LeftUpLeg"), v(0.0, 0.0, 0.22))
            .symmetric(rot("LeftFoot"), v(0.0, 0.0, -0.22))
            .symmetric(rot("LeftArm"), v(0.0, 0.0, -1.25)),
        // Left foot planted in front, right knee on the ground
        posture(PoseTemplateLibrary::INTERMEDIATE_POSE, Stance::Kneeling)
            .prop(ChannelKey::position("Hips"), v(0.0, 0.55, -0.05))
            .prop(rot("LeftUpLeg"), v(-1.5, 0.0, 0.0))
            .prop(rot("LeftLeg"), v(1.5, 0.0, 0.0))
            .prop(rot("RightUpLeg"), v(0.1, 0.0, 0.0))
            .prop(rot("RightLeg"), v(1.55, 0.0, 0.0))
            .prop(rot("RightFoot"), v(0.6, 0.0, 0.0))
            .prop(rot("Spine"), v(0.1, 0.0, 0.0)),
        posture("kneel", Stance::Kneeling)
            .prop(ChannelKey::position("Hips"), v(0.0, 0.5, -0.1))
            .symmetric(rot("LeftUpLeg"), v(0.1, 0.0, 0.05))
            .symmetric(rot("LeftLeg"), v(1.6, 0.0, 0.0))
            .symmetric(rot("LeftFoot"), v(0.7, 0.0, 0.0)),
        posture("sitting", Stance::Sitting)
            .prop(ChannelKey::position("Hips"), v(0.0, 0.5, 0.0))
            .symmetric(rot("LeftUpLeg"), v(-1.57, 0.0, 0.05))
            .symmetric(rot("LeftLeg"), v(1.57, 0.0, 0.0))
            .symmetric(rot("LeftArm"), v(0.4, 0.0, -1.2))
            .symmetric(rot("LeftForeArm"), v(0.0, -0.9, 0.0)),
        posture("bend", Stance::Bend)
            .prop(ChannelKey::position("Hips"), v(0.0, 0.95, -0.08))
            .prop(rot("Hips"), v(0.9, 0.0, 0.0))
            .prop(rot("Spine"), v(0.2, 0.0, 0.0))
            .prop(rot("Neck"), v(-0.4, 0.0, 0.0))
            .prop(rot("Head"), v(-0.5, 0.0, 0.0))
            .symmetric(rot("LeftUpLeg"), v(-0.9, 0.0, 0.0))
            .symmetric(rot("LeftArm"), v(0.9, 0.0, -1.2)),
        // Lying on the back, facing up
        posture("lying", Stance::Lying)
            .prop(ChannelKey::position("Hips"), v(0.0, 0.12, 0.0))
            .prop(rot("Hips"), v(-1.57, 0.0, 0.0))
            .prop(rot("Head"), v(0.2, 0.0, 0.0))
            .symmetric(rot("LeftArm"), v(0.0, 0.0, -1.45))
            .symmetric(rot("LeftFoot"), v(-0.5, 0.0, 0.0)),
    ]
}

fn curled(gesture: GestureTemplate, fingers: &[&str], amount: f32) -> GestureTemplate {
    fingers.iter().fold(gesture, |g, finger| {
        g.prop(rot(&format!("LeftHand{finger}1")), v(0.0, 0.0, -amount))
            .prop(rot(&format!("LeftHand{finger}2")), v(0.0, 0.0, -amount))
    })
}

fn straight(gesture: GestureTemplate, fingers: &[&str]) -> GestureTemplate {
    fingers.iter().fold(gesture, |g, finger| {
        g.prop(rot(&format!("LeftHand{finger}1")), v(0.0, 0.0, 0.0))
            .prop(rot(&format!("LeftHand{finger}2")), v(0.0, 0.0, 0.0))
    })
}

/// Gestures are authored for the left hand; `mirror` plays them on the right.
fn builtin_gestures() -> Vec<GestureTemplate> {
    let handup = straight(
        GestureTemplate::new("handup")
            .prop(rot("LeftArm"), v(0.0, 0.3, -0.9))
            .prop(rot("LeftForeArm"), TemplateValue::new(0.0f32, -0.2f32, range(1.5, 1.8)))
            .prop(rot("LeftHand"), v(-0.2, 0.0, 0.0)),
        &FINGERS,
    )
    .prop(rot("LeftHandThumb1"), v(0.0, -0.3, 0.0));

    let index = curled(
        GestureTemplate::new("index")
            .prop(rot("LeftArm"), v(0.0, 0.4, -1.0))
            .prop(rot("LeftForeArm"), v(0.0, -0.6, 1.4))
            .prop(rot("LeftHand"), v(0.0, 0.0, 0.2))
            .prop(rot("LeftHandThumb1"), v(0.0, 0.4, -0.3))
            .prop(rot("LeftHandThumb2"), v(0.0, 0.3, 0.0)),
        &["Middle", "Ring", "Pinky"],
        1.4,
    );
    let index = straight(index, &["Index"]);

    let ok = straight(
        curled(
            GestureTemplate::new("ok")
                .prop(rot("LeftArm"), v(0.0, 0.4, -1.0))
                .prop(rot("LeftForeArm"), v(0.0, -0.5, 1.5))
                .prop(rot("LeftHand"), v(-0.3, 0.0, 0.0))
                .prop(rot("LeftHandThumb1"), v(0.0, 0.35, -0.2))
                .prop(rot("LeftHandThumb2"), v(0.0, 0.3, 0.0)),
            &["Index"],
            0.8,
        ),
        &["Middle", "Ring", "Pinky"],
    );

    let thumbup = curled(
        GestureTemplate::new("thumbup")
            .prop(rot("LeftArm"), v(0.0, 0.4, -1.1))
            .prop(rot("LeftForeArm"), v(-1.5, -0.5, 1.2))
            .prop(rot("LeftHandThumb1"), v(0.0, -0.4, 0.3))
            .prop(rot("LeftHandThumb2"), v(0.0, 0.0, 0.0)),
        &FINGERS,
        1.5,
    );

    let thumbdown = curled(
        GestureTemplate::new("thumbdown")
            .prop(rot("LeftArm"), v(0.0, 0.4, -1.1))
            .prop(rot("LeftForeArm"), v(1.5, -0.5, 1.2))
            .prop(rot("LeftHandThumb1"), v(0.0, -0.4, 0.3))
            .prop(rot("LeftHandThumb2"), v(0.0, 0.0, 0.0)),
        &FINGERS,
        1.5,
    );

    // Arm out to the side, palm up
    let side = straight(
        GestureTemplate::new("side")
            .prop(rot("LeftArm"), v(-1.5, 0.2, -1.0))
            .prop(rot("LeftForeArm"), v(0.0, -0.7, 0.0))
            .prop(rot("LeftHand"), v(0.0, 0.0, 0.2)),
        &FINGERS,
    );

    // Both shoulders raised, forearms open
    let shrug = GestureTemplate::new("shrug")
        .prop(rot("LeftShoulder"), v(0.0, 0.0, 0.25))
        .prop(rot("RightShoulder"), v(0.0, 0.0, -0.25))
        .prop(rot("LeftArm"), v(-1.2, 0.3, -1.15))
        .prop(rot("RightArm"), v(-1.2, -0.3, 1.15))
        .prop(rot("LeftForeArm"), v(0.0, -1.2, 0.0))
        .prop(rot("RightForeArm"), v(0.0, 1.2, 0.0))
        .prop(rot("LeftHand"), v(0.0, 0.0, 0.3))
        .prop(rot("RightHand"), v(0.0, 0.0, -0.3));

    vec![handup, index, ok, thumbup, thumbdown, side, shrug]
}
