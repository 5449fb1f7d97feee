//! CCD solver
//!
//! Each pass walks the chain from the link nearest the effector toward the
//! root. A link is turned so that its effector direction lines up with its
//! target direction, both measured in the link's own frame, then clamped to
//! its Euler box.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use marionette_core::{AnimError, AnimResult, ChannelKey, ChannelValue, EulerRot, Quat, Vec3};
use marionette_pose::Skeleton;

use crate::chain::{IkChain, IkLink};

/// Passes stop once no link turned by more than this (radians)
pub const CONVERGENCE_EPSILON: f32 = 1e-5;

/// Outcome of one solve
#[derive(Debug, Clone)]
pub struct IkSolution {
    /// New local rotation per chain link
    pub rotations: BTreeMap<ChannelKey, ChannelValue>,
    /// Effector-to-target distance after solving
    pub error: f32,
    /// Passes actually run
    pub iterations: u32,
}

/// Stateless CCD solver
#[derive(Debug, Clone, Copy, Default)]
pub struct IkSolver;

impl IkSolver {
    /// Solve `chain` toward `target` (world space) starting from `pose`.
    ///
    /// Fails only if a chain joint is not bound in `skeleton`.
    pub fn solve(
        skeleton: &Skeleton,
        pose: &BTreeMap<ChannelKey, ChannelValue>,
        chain: &IkChain,
        target: Vec3,
        iterations: u32,
    ) -> AnimResult<IkSolution> {
        let effector = skeleton
            .index_of(&chain.effector)
            .ok_or_else(|| AnimError::MissingChannel(chain.effector.clone()))?;
        if !skeleton.contains(&chain.root) {
            return Err(AnimError::MissingChannel(chain.root.clone()));
        }
        let links = chain
            .links
            .iter()
            .map(|link| {
                skeleton
                    .index_of(&link.joint)
                    .map(|idx| (idx, link))
                    .ok_or_else(|| AnimError::MissingChannel(link.joint.clone()))
            })
            .collect::<AnimResult<Vec<_>>>()?;

        let mut work = pose.clone();
        let mut passes = 0;
        for _ in 0..iterations {
            passes += 1;
            let mut rotated = false;
            for &(idx, link) in links.iter().rev() {
                if Self::step(skeleton, &mut work, idx, link, effector, target) {
                    rotated = true;
                }
            }
            if !rotated {
                break;
            }
        }

        let error = skeleton
            .world_transforms(&work)
            .get(effector)
            .map(|w| w.position.distance(target))
            .unwrap_or(f32::INFINITY);
        debug!(chain = %chain.effector, passes, error, "ik solved");

        let rotations = links
            .iter()
            .filter_map(|(_, link)| {
                let key = ChannelKey::rotation(link.joint.as_str());
                work.get(&key).cloned().map(|v| (key, v))
            })
            .collect();
        Ok(IkSolution {
            rotations,
            error,
            iterations: passes,
        })
    }

    /// Turn one link; returns whether it moved
    fn step(
        skeleton: &Skeleton,
        work: &mut BTreeMap<ChannelKey, ChannelValue>,
        idx: usize,
        link: &IkLink,
        effector: usize,
        target: Vec3,
    ) -> bool {
        let world = skeleton.world_transforms(work);
        let (Some(joint), Some(end)) = (world.get(idx), world.get(effector)) else {
            return false;
        };

        let inverse = joint.rotation.inverse();
        let to_effector = (inverse * (end.position - joint.position)).normalize_or_zero();
        let to_target = (inverse * (target - joint.position)).normalize_or_zero();
        if to_effector == Vec3::ZERO || to_target == Vec3::ZERO {
            return false;
        }

        let mut angle = to_effector.dot(to_target).clamp(-1.0, 1.0).acos();
        if angle < CONVERGENCE_EPSILON {
            return false;
        }
        if let Some(min) = link.min_angle {
            angle = angle.max(min);
        }
        if let Some(max) = link.max_angle {
            angle = angle.min(max);
        }

        let axis = to_effector.cross(to_target).normalize_or_zero();
        if axis == Vec3::ZERO {
            return false;
        }

        let (_, local) = skeleton.local_transform(idx, work);
        let mut rotation = (local * Quat::from_axis_angle(axis, angle)).normalize();
        if let (Some(min), Some(max)) = (link.min_axis, link.max_axis) {
            let (x, y, z) = rotation.to_euler(EulerRot::XYZ);
            let clamped = Vec3::new(x, y, z).clamp(min, max);
            rotation = Quat::from_euler(EulerRot::XYZ, clamped.x, clamped.y, clamped.z).normalize();
        }

        let moved = local.angle_between(rotation) > CONVERGENCE_EPSILON;
        if moved {
            trace!(joint = %link.joint, angle, "ccd step");
            work.insert(ChannelKey::rotation(link.joint.as_str()), ChannelValue::Rotation(rotation));
        }
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marionette_pose::{JointRest, JointSource};
    use proptest::prelude::*;

    /// Straight chain of unit links along +Y: Root -> A -> B -> Tip
    struct Stick;

    impl JointSource for Stick {
        fn joint_names(&self) -> Vec<String> {
            ["Root", "A", "B", "Tip"].iter().map(|s| s.to_string()).collect()
        }

        fn joint(&self, name: &str) -> Option<JointRest> {
            let (parent, y) = match name {
                "Root" => (None, 0.0),
                "A" => (Some("Root"), 1.0),
                "B" => (Some("A"), 1.0),
                "Tip" => (Some("B"), 1.0),
                _ => return None,
            };
            Some(JointRest {
                parent: parent.map(String::from),
                position: Vec3::new(0.0, y, 0.0),
                rotation: Quat::IDENTITY,
                scale: Vec3::ONE,
            })
        }
    }

    fn stick_chain() -> IkChain {
        IkChain::new("Root", "Tip", vec![IkLink::new("Root"), IkLink::new("A"), IkLink::new("B")])
    }

    #[test]
    fn test_reachable_target_converges() {
        let skeleton = Skeleton::bind(&Stick).unwrap();
        let target = Vec3::new(1.5, 1.5, 0.0);
        let solution = IkSolver::solve(&skeleton, &BTreeMap::new(), &stick_chain(), target, 20).unwrap();
        assert!(solution.error < 1e-2 * 3.0, "error {}", solution.error);
        assert!(solution.iterations <= 20);
        for value in solution.rotations.values() {
            let q = value.as_rotation().unwrap();
            assert!((q.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_unreachable_target_terminates() {
        let skeleton = Skeleton::bind(&Stick).unwrap();
        let target = Vec3::new(10.0, 10.0, 0.0);
        let solution = IkSolver::solve(&skeleton, &BTreeMap::new(), &stick_chain(), target, 20).unwrap();
        assert!(solution.iterations <= 20);
        // Fully stretched toward the target
        let best = target.length() - 3.0;
        assert!(solution.error < best + 0.2, "error {}", solution.error);
    }

    #[test]
    fn test_box_limits_respected() {
        let skeleton = Skeleton::bind(&Stick).unwrap();
        let chain = IkChain::new(
            "Root",
            "Tip",
            vec![IkLink::new("Root").with_limits(Vec3::new(0.0, 0.0, -0.2), Vec3::new(0.0, 0.0, 0.2))],
        );
        let solution = IkSolver::solve(&skeleton, &BTreeMap::new(), &chain, Vec3::new(3.0, 0.0, 0.0), 20).unwrap();
        let q = solution.rotations[&ChannelKey::rotation("Root")].as_rotation().unwrap();
        let (x, y, z) = q.to_euler(EulerRot::XYZ);
        assert!(x.abs() < 1e-4 && y.abs() < 1e-4);
        assert!(z >= -0.2 - 1e-4 && z <= 0.2 + 1e-4);
    }

    #[test]
    fn test_left_arm_reaches_forward() {
        let skeleton = Skeleton::humanoid();
        let pose = BTreeMap::new();
        let chain = IkChain::left_arm();
        let start = skeleton.world_of("LeftHandMiddle1", &pose).unwrap().position;
        let target = Vec3::new(0.3, 1.3, 0.35);

        let solution = IkSolver::solve(&skeleton, &pose, &chain, target, 20).unwrap();
        assert!(solution.error < start.distance(target));
        assert!(solution.rotations.keys().all(|k| k.joint.starts_with("Left")));
    }

    #[test]
    fn test_missing_joint() {
        let skeleton = Skeleton::bind(&Stick).unwrap();
        let result = IkSolver::solve(&skeleton, &BTreeMap::new(), &IkChain::left_arm(), Vec3::ONE, 20);
        assert!(matches!(result, Err(AnimError::MissingChannel(_))));
    }

    proptest! {
        #[test]
        fn prop_solve_terminates_with_unit_rotations(x in -5.0f32..5.0, y in -5.0f32..5.0, z in -5.0f32..5.0,
                                                      iterations in 0u32..30) {
            let skeleton = Skeleton::bind(&Stick).unwrap();
            let solution = IkSolver::solve(&skeleton, &BTreeMap::new(), &stick_chain(), Vec3::new(x, y, z), iterations).unwrap();
            prop_assert!(solution.iterations <= iterations);
            prop_assert!(solution.error.is_finite());
            for value in solution.rotations.values() {
                let q = value.as_rotation().unwrap();
                prop_assert!((q.length() - 1.0).abs() < 1e-3);
            }
        }
    }
}
