//! Skeleton - joints bound by name from the host scene
//!
//! The host resolves joint names to its own mutable handles; the engine only
//! needs the hierarchy and rest transforms to run forward kinematics for
//! IK and gaze.

use std::collections::{BTreeMap, HashMap};

use marionette_core::{AnimError, AnimResult, ChannelKey, ChannelValue, Property, Quat, Vec3};

/// Rest transform of a joint as reported by the host
#[derive(Debug, Clone)]
pub struct JointRest {
    pub parent: Option<String>,
    /// Local position relative to the parent
    pub position: Vec3,
    /// Local rotation relative to the parent
    pub rotation: Quat,
    pub scale: Vec3,
}

/// Host-side joint resolution
pub trait JointSource {
    /// Names of every joint the host can resolve
    fn joint_names(&self) -> Vec<String>;

    /// Rest transform of one joint
    fn joint(&self, name: &str) -> Option<JointRest>;
}

/// Bound joint
#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    /// Index of the parent bone (always smaller than this bone's index)
    pub parent: Option<usize>,
    pub rest_position: Vec3,
    pub rest_rotation: Quat,
    pub rest_scale: Vec3,
}

/// World-space transform produced by forward kinematics
#[derive(Debug, Clone, Copy)]
pub struct WorldTransform {
    pub position: Vec3,
    pub rotation: Quat,
}

/// Bound skeleton, bones ordered parents-first
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    bones: Vec<Bone>,
    index: HashMap<String, usize>,
}

impl Skeleton {
    /// Resolve every joint the host exposes
    pub fn bind(source: &dyn JointSource) -> AnimResult<Self> {
        let mut rests: BTreeMap<String, JointRest> = BTreeMap::new();
        for name in source.joint_names() {
            if let Some(rest) = source.joint(&name) {
                rests.insert(name, rest);
            } else {
                tracing::warn!(joint = %name, "joint listed but not resolvable; skipped");
            }
        }
        if rests.is_empty() {
            return Err(AnimError::NotBound);
        }

        let mut skeleton = Skeleton::default();
        let names: Vec<String> = rests.keys().cloned().collect();
        for name in names {
            skeleton.insert_with_parents(&name, &rests);
        }
        Ok(skeleton)
    }

    fn insert_with_parents(&mut self, name: &str, rests: &BTreeMap<String, JointRest>) {
        // Walk up to the first already-inserted ancestor, then insert top-down
        let mut pending = Vec::new();
        let mut cursor = Some(name.to_string());
        while let Some(n) = cursor {
            if self.index.contains_key(&n) || pending.contains(&n) {
                break;
            }
            let Some(rest) = rests.get(&n) else {
                break;
            };
            cursor = rest.parent.clone();
            pending.push(n);
        }
        for n in pending.into_iter().rev() {
            let Some(rest) = rests.get(&n) else {
                continue;
            };
            let parent = rest.parent.as_ref().and_then(|p| self.index.get(p).copied());
            if rest.parent.is_some() && parent.is_none() {
                tracing::warn!(joint = %n, "parent joint not bound; treating as root");
            }
            self.push_bone(Bone {
                name: n,
                parent,
                rest_position: rest.position,
                rest_rotation: rest.rotation,
                rest_scale: rest.scale,
            });
        }
    }

    fn push_bone(&mut self, bone: Bone) {
        self.index.insert(bone.name.clone(), self.bones.len());
        self.bones.push(bone);
    }

    /// Reference humanoid (Y up, facing +Z, T-pose, meters).
    /// Left-side joints sit on +X.
    pub fn humanoid() -> Self {
        let mut s = Skeleton::default();
        let mut add = |name: &str, parent: Option<&str>, pos: Vec3| {
            let parent = parent.and_then(|p| s.index.get(p).copied());
            s.push_bone(Bone {
                name: name.to_string(),
                parent,
                rest_position: pos,
                rest_rotation: Quat::IDENTITY,
                rest_scale: Vec3::ONE,
            });
        };

        add("Hips", None, Vec3::new(0.0, 1.0, 0.0));
        add("Spine", Some("Hips"), Vec3::new(0.0, 0.1, 0.0));
        add("Spine1", Some("Spine"), Vec3::new(0.0, 0.12, 0.0));
        add("Spine2", Some("Spine1"), Vec3::new(0.0, 0.12, 0.0));
        add("Neck", Some("Spine2"), Vec3::new(0.0, 0.15, 0.0));
        add("Head", Some("Neck"), Vec3::new(0.0, 0.1, 0.0));

        for (side, sx) in [("Left", 1.0f32), ("Right", -1.0f32)] {
            let j = |n: &str| format!("{side}{n}");
            add(&j("Eye"), Some("Head"), Vec3::new(0.03 * sx, 0.07, 0.08));
            add(&j("Shoulder"), Some("Spine2"), Vec3::new(0.06 * sx, 0.1, 0.0));
            add(&j("Arm"), Some(&j("Shoulder")), Vec3::new(0.12 * sx, 0.0, 0.0));
            add(&j("ForeArm"), Some(&j("Arm")), Vec3::new(0.27 * sx, 0.0, 0.0));
            add(&j("Hand"), Some(&j("ForeArm")), Vec3::new(0.25 * sx, 0.0, 0.0));
            for (finger, z, len) in [
                ("Thumb", 0.035f32, 0.03f32),
                ("Index", 0.025, 0.09),
                ("Middle", 0.0, 0.09),
                ("Ring", -0.02, 0.085),
                ("Pinky", -0.04, 0.075),
            ] {
                let f1 = j(&format!("Hand{finger}1"));
                let f2 = j(&format!("Hand{finger}2"));
                add(&f1, Some(&j("Hand")), Vec3::new(len * sx, 0.0, z));
                add(&f2, Some(&f1), Vec3::new(0.035 * sx, 0.0, 0.0));
            }
            add(&j("UpLeg"), Some("Hips"), Vec3::new(0.09 * sx, -0.05, 0.0));
            add(&j("Leg"), Some(&j("UpLeg")), Vec3::new(0.0, -0.42, 0.0));
            add(&j("Foot"), Some(&j("Leg")), Vec3::new(0.0, -0.42, 0.0));
            add(&j("ToeBase"), Some(&j("Foot")), Vec3::new(0.0, -0.05, 0.12));
        }
        s
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn bone(&self, idx: usize) -> Option<&Bone> {
        self.bones.get(idx)
    }

    /// Does the skeleton carry the joint behind this channel?
    pub fn has_channel(&self, key: &ChannelKey) -> bool {
        self.contains(&key.joint)
    }

    /// Rest value of a channel
    pub fn rest_value(&self, key: &ChannelKey) -> Option<ChannelValue> {
        let bone = self.bones.get(self.index_of(&key.joint)?)?;
        Some(match key.property {
            Property::Rotation => ChannelValue::Rotation(bone.rest_rotation),
            Property::Position => ChannelValue::Vector(bone.rest_position),
            Property::Scale => ChannelValue::Vector(bone.rest_scale),
        })
    }

    /// Local (position, rotation) of a bone under `pose`, falling back to rest
    pub fn local_transform(&self, idx: usize, pose: &BTreeMap<ChannelKey, ChannelValue>) -> (Vec3, Quat) {
        let bone = &self.bones[idx];
        let position = pose
            .get(&ChannelKey::position(bone.name.as_str()))
            .and_then(ChannelValue::as_vector)
            .unwrap_or(bone.rest_position);
        let rotation = pose
            .get(&ChannelKey::rotation(bone.name.as_str()))
            .and_then(ChannelValue::as_rotation)
            .unwrap_or(bone.rest_rotation);
        (position, rotation)
    }

    /// Forward kinematics for every bone
    pub fn world_transforms(&self, pose: &BTreeMap<ChannelKey, ChannelValue>) -> Vec<WorldTransform> {
        let mut out: Vec<WorldTransform> = Vec::with_capacity(self.bones.len());
        for (idx, bone) in self.bones.iter().enumerate() {
            let (pos, rot) = self.local_transform(idx, pose);
            let world = match bone.parent {
                Some(p) => {
                    let parent = out[p];
                    WorldTransform {
                        position: parent.position + parent.rotation * pos,
                        rotation: (parent.rotation * rot).normalize(),
                    }
                }
                None => WorldTransform {
                    position: pos,
                    rotation: rot,
                },
            };
            out.push(world);
        }
        out
    }

    /// World transform of one named joint
    pub fn world_of(&self, name: &str, pose: &BTreeMap<ChannelKey, ChannelValue>) -> Option<WorldTransform> {
        let idx = self.index_of(name)?;
        self.world_transforms(pose).get(idx).copied()
    }

    /// Bone indices from `root` down to `effector` (inclusive)
    pub fn chain(&self, root: &str, effector: &str) -> Option<Vec<usize>> {
        let root = self.index_of(root)?;
        let mut path = Vec::new();
        let mut cursor = Some(self.index_of(effector)?);
        while let Some(idx) = cursor {
            path.push(idx);
            if idx == root {
                path.reverse();
                return Some(path);
            }
            cursor = self.bones[idx].parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MapSource(BTreeMap<String, JointRest>);

    impl JointSource for MapSource {
        fn joint_names(&self) -> Vec<String> {
            self.0.keys().cloned().collect()
        }

        fn joint(&self, name: &str) -> Option<JointRest> {
            self.0.get(name).cloned()
        }
    }

    fn rest(parent: Option<&str>, y: f32) -> JointRest {
        JointRest {
            parent: parent.map(String::from),
            position: Vec3::new(0.0, y, 0.0),
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    #[test]
    fn test_bind_orders_parents_first() {
        let mut map = BTreeMap::new();
        // Alphabetical order puts children before parents
        map.insert("A_Head".to_string(), rest(Some("Z_Neck"), 0.1));
        map.insert("Z_Neck".to_string(), rest(Some("Y_Hips"), 0.5));
        map.insert("Y_Hips".to_string(), rest(None, 1.0));
        let skeleton = Skeleton::bind(&MapSource(map)).unwrap();

        assert_eq!(skeleton.len(), 3);
        for bone in skeleton.bones() {
            if let Some(p) = bone.parent {
                assert!(p < skeleton.index_of(&bone.name).unwrap());
            }
        }
        let head = skeleton.world_of("A_Head", &BTreeMap::new()).unwrap();
        assert!((head.position.y - 1.6).abs() < 1e-5);
    }

    #[test]
    fn test_bind_empty_fails() {
        let err = Skeleton::bind(&MapSource(BTreeMap::new())).unwrap_err();
        assert!(matches!(err, AnimError::NotBound));
    }

    #[test]
    fn test_humanoid_chain() {
        let s = Skeleton::humanoid();
        let chain = s.chain("LeftShoulder", "LeftHandMiddle1").unwrap();
        let names: Vec<&str> = chain.iter().map(|i| s.bones()[*i].name.as_str()).collect();
        assert_eq!(
            names,
            ["LeftShoulder", "LeftArm", "LeftForeArm", "LeftHand", "LeftHandMiddle1"]
        );
        assert!(s.chain("LeftShoulder", "RightHand").is_none());
    }

    #[test]
    fn test_forward_kinematics_rotation() {
        let s = Skeleton::humanoid();
        let mut pose = BTreeMap::new();
        // Drop the left arm straight down
        pose.insert(
            ChannelKey::rotation("LeftArm"),
            ChannelValue::Rotation(Quat::from_rotation_z(-std::f32::consts::FRAC_PI_2)),
        );
        let world = s.world_transforms(&pose);
        let arm = world[s.index_of("LeftArm").unwrap()].position;
        let hand = world[s.index_of("LeftHand").unwrap()].position;
        let d = hand - arm;
        assert!(d.x.abs() < 1e-4);
        assert!((d.y + 0.52).abs() < 1e-4);
    }
}
