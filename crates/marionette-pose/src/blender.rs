//! Pose blending - Base/Target state per channel
//!
//! Target holds where each channel is heading and when it started moving.
//! Every tick Base is eased toward Target; once a channel's window has
//! elapsed Base snaps to Target exactly.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use tracing::{debug, info};

use marionette_core::{alpha, ease, AnimResult, ChannelKey, ChannelValue};
use marionette_time::Deadline;

use crate::library::PoseTemplateLibrary;
use crate::template::{mirror_props, Stance};

/// Target value of one channel and its transition window
#[derive(Debug, Clone)]
pub struct ChannelState {
    pub value: ChannelValue,
    pub start_ms: f64,
    pub duration_ms: f64,
}

/// Second leg of a transition routed through the intermediate pose
#[derive(Debug, Clone)]
struct PendingPose {
    name: String,
    stance: Stance,
    props: BTreeMap<ChannelKey, ChannelValue>,
    duration_ms: f64,
    deadline: Deadline,
}

/// Base/Target pose state
#[derive(Debug, Clone, Default)]
pub struct PoseBlender {
    base: BTreeMap<ChannelKey, ChannelValue>,
    target: BTreeMap<ChannelKey, ChannelState>,
    /// Instantiated (and mirrored) values of the current template
    template_props: BTreeMap<ChannelKey, ChannelValue>,
    current: Option<String>,
    stance: Option<Stance>,
    mirrored: bool,
    /// Channels owned by an active gesture; template transitions skip them
    locked: BTreeSet<ChannelKey>,
    pending: Option<PendingPose>,
}

impl PoseBlender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the template the pose is heading to (or holding)
    pub fn current_template(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn stance(&self) -> Option<Stance> {
        self.stance
    }

    /// Is the current template playing on the opposite leg?
    pub fn is_mirrored(&self) -> bool {
        self.mirrored
    }

    /// Is a second transition leg still waiting?
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Transition to a named template.
    ///
    /// Picking the template already in use switches weight to the other leg.
    /// Transitions between standing and grounded stances go through the
    /// intermediate template first and continue after `intermediate_ms`.
    pub fn set_pose_from_template<R: Rng + ?Sized>(
        &mut self,
        library: &PoseTemplateLibrary,
        name: &str,
        now_ms: f64,
        duration_ms: f64,
        intermediate_ms: f64,
        rng: &mut R,
    ) -> AnimResult<()> {
        let template = library.pose(name)?;

        if self.current.as_deref() == Some(name) {
            self.mirrored = !self.mirrored;
        }
        let props = self.oriented(template.instantiate(rng));

        let needs_intermediate = self
            .stance
            .is_some_and(|from| Stance::needs_intermediate(from, template.stance));
        if needs_intermediate {
            let via = library.pose(PoseTemplateLibrary::INTERMEDIATE_POSE)?;
            info!(from = ?self.current, to = name, via = %via.name, "pose transition via intermediate");
            let via_props = self.oriented(via.instantiate(rng));
            self.apply_template(&via.name, via.stance, via_props, now_ms, intermediate_ms);

            let mut deadline = Deadline::new();
            deadline.arm_after(now_ms, intermediate_ms);
            self.pending = Some(PendingPose {
                name: template.name.clone(),
                stance: template.stance,
                props,
                duration_ms,
                deadline,
            });
        } else {
            info!(from = ?self.current, to = name, mirrored = self.mirrored, "pose transition");
            self.pending = None;
            self.apply_template(&template.name, template.stance, props, now_ms, duration_ms);
        }
        Ok(())
    }

    fn oriented(&self, props: BTreeMap<ChannelKey, ChannelValue>) -> BTreeMap<ChannelKey, ChannelValue> {
        if self.mirrored {
            mirror_props(&props)
        } else {
            props
        }
    }

    fn apply_template(
        &mut self,
        name: &str,
        stance: Stance,
        props: BTreeMap<ChannelKey, ChannelValue>,
        now_ms: f64,
        duration_ms: f64,
    ) {
        self.current = Some(name.to_string());
        self.stance = Some(stance);
        self.set_target(&props, now_ms, duration_ms);
        self.template_props = props;
    }

    /// Write targets for unlocked channels
    pub fn set_target(&mut self, props: &BTreeMap<ChannelKey, ChannelValue>, now_ms: f64, duration_ms: f64) {
        for (key, value) in props {
            if self.locked.contains(key) {
                continue;
            }
            self.write(key.clone(), value.clone(), now_ms, duration_ms);
        }
    }

    /// Write a target regardless of ownership (used by the owner itself)
    pub fn set_channel_target(&mut self, key: ChannelKey, value: ChannelValue, now_ms: f64, duration_ms: f64) {
        self.write(key, value, now_ms, duration_ms);
    }

    fn write(&mut self, key: ChannelKey, value: ChannelValue, now_ms: f64, duration_ms: f64) {
        // Unchanged targets keep their running window
        if let Some(existing) = self.target.get(&key) {
            if existing.value.approx_eq(&value, 1e-7) {
                return;
            }
        }
        self.target.insert(
            key,
            ChannelState {
                value,
                start_ms: now_ms,
                duration_ms,
            },
        );
    }

    /// Exclusive ownership of channels (gesture start)
    pub fn lock<'a>(&mut self, keys: impl IntoIterator<Item = &'a ChannelKey>) {
        self.locked.extend(keys.into_iter().cloned());
    }

    /// Release ownership (gesture stop)
    pub fn unlock<'a>(&mut self, keys: impl IntoIterator<Item = &'a ChannelKey>) {
        for key in keys {
            self.locked.remove(key);
        }
    }

    pub fn is_locked(&self, key: &ChannelKey) -> bool {
        self.locked.contains(key)
    }

    /// Value the current template implies for a channel
    pub fn template_value(&self, key: &ChannelKey) -> Option<&ChannelValue> {
        self.template_props.get(key)
    }

    pub fn target_value(&self, key: &ChannelKey) -> Option<&ChannelValue> {
        self.target.get(key).map(|s| &s.value)
    }

    pub fn target(&self) -> &BTreeMap<ChannelKey, ChannelState> {
        &self.target
    }

    /// Current blended pose
    pub fn pose(&self) -> &BTreeMap<ChannelKey, ChannelValue> {
        &self.base
    }

    pub fn base_value(&self, key: &ChannelKey) -> Option<&ChannelValue> {
        self.base.get(key)
    }

    /// Advance blending to `now_ms`
    pub fn tick(&mut self, now_ms: f64) {
        if let Some(pending) = self.pending.as_mut() {
            if pending.deadline.poll(now_ms) {
                if let Some(p) = self.pending.take() {
                    debug!(to = %p.name, "continuing pose transition");
                    self.apply_template(&p.name, p.stance, p.props, now_ms, p.duration_ms);
                }
            }
        }

        for (key, state) in &self.target {
            let a = alpha(now_ms, state.start_ms, state.duration_ms);
            let next = match self.base.get(key) {
                Some(base) if a < 1.0 => base.blend(&state.value, ease(a)),
                _ => state.value.clone(),
            };
            self.base.insert(key.clone(), next);
        }
    }

    /// Drop all state (skeleton unbound)
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marionette_core::{Property, Quat, Vec3};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_first_target_snaps() {
        let mut blender = PoseBlender::new();
        let key = ChannelKey::rotation("Head");
        let q = ChannelValue::from_euler(Property::Rotation, Vec3::new(0.3, 0.0, 0.0));
        blender.set_channel_target(key.clone(), q.clone(), 0.0, 1000.0);
        blender.tick(10.0);
        assert!(blender.base_value(&key).unwrap().approx_eq(&q, 1e-6));
    }

    #[test]
    fn test_eased_then_snapped() {
        let mut blender = PoseBlender::new();
        let key = ChannelKey::position("Hips");
        blender.set_channel_target(key.clone(), ChannelValue::Vector(Vec3::ZERO), 0.0, 0.0);
        blender.tick(0.0);

        blender.set_channel_target(key.clone(), ChannelValue::Vector(Vec3::X), 0.0, 1000.0);
        blender.tick(500.0);
        let mid = blender.base_value(&key).unwrap().as_vector().unwrap();
        assert!(mid.x > 0.0 && mid.x < 1.0);

        blender.tick(1000.0);
        assert_eq!(blender.base_value(&key).unwrap().as_vector(), Some(Vec3::X));
    }

    #[test]
    fn test_same_template_mirrors() {
        let lib = PoseTemplateLibrary::builtin();
        let mut blender = PoseBlender::new();
        let mut rng = rng();
        blender
            .set_pose_from_template(&lib, "side", 0.0, 0.0, 1000.0, &mut rng)
            .unwrap();
        assert!(!blender.is_mirrored());
        let left = blender.target_value(&ChannelKey::rotation("RightLeg")).cloned().unwrap();

        blender
            .set_pose_from_template(&lib, "side", 10.0, 0.0, 1000.0, &mut rng)
            .unwrap();
        assert!(blender.is_mirrored());
        let mirrored = blender.target_value(&ChannelKey::rotation("LeftLeg")).unwrap();
        assert!(mirrored.approx_eq(&left.mirrored(), 1e-5));
    }

    #[test]
    fn test_unknown_template_keeps_state() {
        let lib = PoseTemplateLibrary::builtin();
        let mut blender = PoseBlender::new();
        let mut rng = rng();
        blender
            .set_pose_from_template(&lib, "straight", 0.0, 0.0, 1000.0, &mut rng)
            .unwrap();
        assert!(blender
            .set_pose_from_template(&lib, "cartwheel", 0.0, 0.0, 1000.0, &mut rng)
            .is_err());
        assert_eq!(blender.current_template(), Some("straight"));
    }

    #[test]
    fn test_standing_to_lying_goes_through_intermediate() {
        let lib = PoseTemplateLibrary::builtin();
        let mut blender = PoseBlender::new();
        let mut rng = rng();
        blender
            .set_pose_from_template(&lib, "straight", 0.0, 0.0, 1000.0, &mut rng)
            .unwrap();
        blender.tick(0.0);

        blender
            .set_pose_from_template(&lib, "lying", 100.0, 2000.0, 1000.0, &mut rng)
            .unwrap();
        assert_eq!(blender.current_template(), Some("oneknee"));
        assert!(blender.has_pending());

        blender.tick(1099.0);
        assert_eq!(blender.current_template(), Some("oneknee"));
        blender.tick(1100.0);
        assert_eq!(blender.current_template(), Some("lying"));
        assert_eq!(blender.stance(), Some(Stance::Lying));
        assert!(!blender.has_pending());
    }

    #[test]
    fn test_locked_channels_skip_template() {
        let lib = PoseTemplateLibrary::builtin();
        let mut blender = PoseBlender::new();
        let mut rng = rng();
        let arm = ChannelKey::rotation("LeftArm");
        let held = ChannelValue::Rotation(Quat::IDENTITY);
        blender.lock([&arm]);
        blender.set_channel_target(arm.clone(), held.clone(), 0.0, 0.0);
        blender
            .set_pose_from_template(&lib, "straight", 0.0, 0.0, 1000.0, &mut rng)
            .unwrap();

        assert!(blender.target_value(&arm).unwrap().approx_eq(&held, 1e-6));
        // The template value is still known for when the lock is released
        assert!(!blender.template_value(&arm).unwrap().approx_eq(&held, 1e-3));
    }

    proptest! {
        #[test]
        fn prop_rotations_unit_norm_after_tick(seed in any::<u64>(), t in 0.0f64..3000.0) {
            let lib = PoseTemplateLibrary::builtin();
            let mut blender = PoseBlender::new();
            let mut rng = StdRng::seed_from_u64(seed);
            blender.set_pose_from_template(&lib, "straight", 0.0, 0.0, 1000.0, &mut rng).unwrap();
            blender.tick(0.0);
            blender.set_pose_from_template(&lib, "sitting", 0.0, 2000.0, 1000.0, &mut rng).unwrap();
            blender.tick(t);
            for value in blender.pose().values() {
                if let Some(q) = value.as_rotation() {
                    prop_assert!((q.length() - 1.0).abs() < 1e-4);
                }
            }
        }
    }
}
