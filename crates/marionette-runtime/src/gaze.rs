//! Gaze direction split between head and eyes
//!
//! The avatar faces +Z with Y up. Positive pitch (X) looks down, positive
//! yaw (Y) turns toward +X, the avatar's left.

use std::collections::BTreeMap;

use marionette_core::Vec3;

/// Head rotation limits (radians)
pub const HEAD_MAX_PITCH: f32 = 0.5;
pub const HEAD_MAX_YAW: f32 = 0.8;
/// Eye rotation at full blendshape weight (radians)
pub const EYE_PITCH_RANGE: f32 = 0.4;
pub const EYE_YAW_RANGE: f32 = 0.6;

/// Head angles in radians, eye angles as composite weights in [-1, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeSplit {
    pub head: (f32, f32),
    pub eyes: (f32, f32),
}

impl GazeSplit {
    pub const AHEAD: GazeSplit = GazeSplit {
        head: (0.0, 0.0),
        eyes: (0.0, 0.0),
    };
}

/// Pitch and yaw that point the face from `from` toward `point`
pub fn direction_angles(from: Vec3, point: Vec3) -> (f32, f32) {
    let d = point - from;
    let horizontal = (d.x * d.x + d.z * d.z).sqrt();
    if horizontal == 0.0 && d.y == 0.0 {
        return (0.0, 0.0);
    }
    (-d.y.atan2(horizontal), d.x.atan2(d.z))
}

/// Give the head `head_share` of the turn (within its limits); eyes take the rest
pub fn split_gaze(head_position: Vec3, point: Vec3, head_share: f32) -> GazeSplit {
    let (pitch, yaw) = direction_angles(head_position, point);
    let head_pitch = (pitch * head_share).clamp(-HEAD_MAX_PITCH, HEAD_MAX_PITCH);
    let head_yaw = (yaw * head_share).clamp(-HEAD_MAX_YAW, HEAD_MAX_YAW);
    GazeSplit {
        head: (head_pitch, head_yaw),
        eyes: (
            ((pitch - head_pitch) / EYE_PITCH_RANGE).clamp(-1.0, 1.0),
            ((yaw - head_yaw) / EYE_YAW_RANGE).clamp(-1.0, 1.0),
        ),
    }
}

/// Eye rotation controls (`eyesRotateX`, `eyesRotateY`, radians) implied by
/// the eye-look blendshapes, if any of them is present
pub fn eye_rotation(values: &BTreeMap<String, f32>) -> Option<(f32, f32)> {
    let get = |name: &str| values.get(name).copied();
    let x = match (get("eyesLookDown"), get("eyesLookUp")) {
        (None, None) => None,
        (down, up) => Some((down.unwrap_or(0.0) - up.unwrap_or(0.0)) * EYE_PITCH_RANGE),
    };
    let y = match (get("eyeLookOutLeft"), get("eyeLookInLeft")) {
        (None, None) => None,
        (out, inward) => Some((out.unwrap_or(0.0) - inward.unwrap_or(0.0)) * EYE_YAW_RANGE),
    };
    if x.is_none() && y.is_none() {
        return None;
    }
    Some((x.unwrap_or(0.0), y.unwrap_or(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_straight_ahead() {
        let head = Vec3::new(0.0, 1.6, 0.0);
        let split = split_gaze(head, Vec3::new(0.0, 1.6, 2.0), 0.7);
        assert_eq!(split, GazeSplit::AHEAD);
    }

    #[test]
    fn test_left_and_down() {
        let head = Vec3::new(0.0, 1.6, 0.0);
        let (pitch, yaw) = direction_angles(head, Vec3::new(1.0, 0.6, 1.0));
        assert!(pitch > 0.0 && yaw > 0.0);
        assert!((yaw - std::f32::consts::FRAC_PI_4).abs() < 1e-5);

        let split = split_gaze(head, Vec3::new(1.0, 0.0, 1.0), 0.7);
        assert!((split.head.1 - 0.7 * yaw).abs() < 1e-5);
        // Head pitch hits its limit, eyes make up the difference
        assert_eq!(split.head.0, HEAD_MAX_PITCH);
        assert!(split.eyes.0 > 0.0 && split.eyes.1 > 0.0);
    }

    #[test]
    fn test_behind_clamps() {
        let split = split_gaze(Vec3::ZERO, Vec3::new(-0.1, 0.0, -3.0), 0.7);
        assert_eq!(split.head.1, -HEAD_MAX_YAW);
        assert_eq!(split.eyes.1, -1.0);
    }

    #[test]
    fn test_eye_rotation_from_blendshapes() {
        let mut values = BTreeMap::new();
        assert_eq!(eye_rotation(&values), None);
        values.insert("eyeLookOutLeft".to_string(), 0.5);
        values.insert("eyeLookInLeft".to_string(), 0.0);
        values.insert("eyesLookUp".to_string(), 0.25);
        let (x, y) = eye_rotation(&values).unwrap();
        assert!((x + 0.25 * EYE_PITCH_RANGE).abs() < 1e-6);
        assert!((y - 0.5 * EYE_YAW_RANGE).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_split_stays_in_limits(
            x in -5.0f32..5.0,
            y in -3.0f32..3.0,
            z in -5.0f32..5.0,
            share in 0.0f32..1.0,
        ) {
            let split = split_gaze(Vec3::new(0.0, 1.6, 0.0), Vec3::new(x, y, z), share);
            prop_assert!(split.head.0.abs() <= HEAD_MAX_PITCH);
            prop_assert!(split.head.1.abs() <= HEAD_MAX_YAW);
            prop_assert!(split.eyes.0.abs() <= 1.0);
            prop_assert!(split.eyes.1.abs() <= 1.0);
        }
    }
}
