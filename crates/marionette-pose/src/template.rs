//! Pose and gesture templates
//!
//! Templates are authored as Euler triples (XYZ order, radians) whose
//! components may be randomized. Instantiation samples the ranges and
//! normalizes rotations to quaternions.

use std::collections::BTreeMap;

use rand::Rng;

use marionette_core::{AnimError, AnimResult, ChannelKey, ChannelValue, Property, Scalar, Vec3};

/// Stance category of a pose template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stance {
    Standing,
    Sitting,
    Kneeling,
    Lying,
    Bend,
}

impl Stance {
    /// Does moving between these stances need a transitional kneeling leg?
    /// Hips are never interpolated straight from standing to the ground.
    pub fn needs_intermediate(from: Stance, to: Stance) -> bool {
        let grounded = |s: Stance| matches!(s, Stance::Lying | Stance::Bend);
        (from == Stance::Standing && grounded(to)) || (grounded(from) && to == Stance::Standing)
    }
}

/// One authored channel value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateValue {
    pub x: Scalar,
    pub y: Scalar,
    pub z: Scalar,
}

impl TemplateValue {
    pub fn fixed(x: f32, y: f32, z: f32) -> Self {
        Self {
            x: Scalar::Fixed(x),
            y: Scalar::Fixed(y),
            z: Scalar::Fixed(z),
        }
    }

    pub fn new(x: impl Into<Scalar>, y: impl Into<Scalar>, z: impl Into<Scalar>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            z: z.into(),
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        Vec3::new(self.x.resolve(rng), self.y.resolve(rng), self.z.resolve(rng))
    }

    /// Authored value reflected about the sagittal plane.
    /// XYZ Euler rotations keep `x` and negate `y`, `z`; vectors negate `x`.
    pub fn mirrored(&self, property: Property) -> Self {
        if property.is_rotation() {
            Self {
                x: self.x,
                y: self.y.negated(),
                z: self.z.negated(),
            }
        } else {
            Self {
                x: self.x.negated(),
                y: self.y,
                z: self.z,
            }
        }
    }
}

/// Sample and normalize a set of authored props
pub fn instantiate_props<R: Rng + ?Sized>(
    props: &BTreeMap<ChannelKey, TemplateValue>,
    rng: &mut R,
) -> BTreeMap<ChannelKey, ChannelValue> {
    props
        .iter()
        .map(|(key, v)| (key.clone(), ChannelValue::from_euler(key.property, v.sample(rng))))
        .collect()
}

/// Mirror a set of instantiated props left <-> right
pub fn mirror_props(props: &BTreeMap<ChannelKey, ChannelValue>) -> BTreeMap<ChannelKey, ChannelValue> {
    props.iter().map(|(k, v)| (k.mirrored(), v.mirrored())).collect()
}

/// Named static stance
#[derive(Debug, Clone)]
pub struct PoseTemplate {
    pub name: String,
    pub stance: Stance,
    pub props: BTreeMap<ChannelKey, TemplateValue>,
}

impl PoseTemplate {
    pub fn new(name: impl Into<String>, stance: Stance) -> Self {
        Self {
            name: name.into(),
            stance,
            props: BTreeMap::new(),
        }
    }

    /// Builder: add one channel from its `Joint.property` name
    pub fn with(mut self, channel: &str, value: TemplateValue) -> AnimResult<Self> {
        let key: ChannelKey = channel.parse()?;
        self.props.insert(key, value);
        Ok(self)
    }

    /// Builder: add one channel by key
    pub fn prop(mut self, key: ChannelKey, value: TemplateValue) -> Self {
        self.props.insert(key, value);
        self
    }

    /// Builder: author the left joint and derive its right counterpart
    pub fn symmetric(self, key: ChannelKey, value: TemplateValue) -> Self {
        let mirrored = value.mirrored(key.property);
        let right = key.mirrored();
        self.prop(key, value).prop(right, mirrored)
    }

    pub fn instantiate<R: Rng + ?Sized>(&self, rng: &mut R) -> BTreeMap<ChannelKey, ChannelValue> {
        instantiate_props(&self.props, rng)
    }
}

/// Is this joint an arm, hand or finger joint?
pub fn is_hand_joint(joint: &str) -> bool {
    joint.contains("Shoulder") || joint.contains("Arm") || joint.contains("Hand")
}

/// Named override of arm/hand/finger channels
#[derive(Debug, Clone)]
pub struct GestureTemplate {
    pub name: String,
    pub props: BTreeMap<ChannelKey, TemplateValue>,
}

impl GestureTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            props: BTreeMap::new(),
        }
    }

    /// Builder: add one channel; only arm/hand/finger joints are accepted
    pub fn with(mut self, channel: &str, value: TemplateValue) -> AnimResult<Self> {
        let key: ChannelKey = channel.parse()?;
        if !is_hand_joint(&key.joint) {
            return Err(AnimError::InvalidChannel(format!(
                "{channel} is not an arm/hand channel (gesture {})",
                self.name
            )));
        }
        self.props.insert(key, value);
        Ok(self)
    }

    /// Builder for built-in data; callers only pass arm/hand keys
    pub(crate) fn prop(mut self, key: ChannelKey, value: TemplateValue) -> Self {
        debug_assert!(is_hand_joint(&key.joint));
        self.props.insert(key, value);
        self
    }

    /// Instantiate, optionally mirrored to the other hand
    pub fn instantiate<R: Rng + ?Sized>(&self, mirror: bool, rng: &mut R) -> BTreeMap<ChannelKey, ChannelValue> {
        let props = instantiate_props(&self.props, rng);
        if mirror {
            mirror_props(&props)
        } else {
            props
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marionette_core::range;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_stance_intermediate() {
        assert!(Stance::needs_intermediate(Stance::Standing, Stance::Lying));
        assert!(Stance::needs_intermediate(Stance::Bend, Stance::Standing));
        assert!(!Stance::needs_intermediate(Stance::Standing, Stance::Sitting));
        assert!(!Stance::needs_intermediate(Stance::Kneeling, Stance::Lying));
    }

    #[test]
    fn test_randomized_template_instantiation() {
        let mut rng = StdRng::seed_from_u64(3);
        let t = PoseTemplate::new("sway", Stance::Standing)
            .with("Hips.position", TemplateValue::new(range(-0.1, 0.1), 1.0f32, 0.0f32))
            .unwrap();
        let props = t.instantiate(&mut rng);
        let v = props[&ChannelKey::position("Hips")].as_vector().unwrap();
        assert!(v.x >= -0.1 && v.x <= 0.1);
        assert_eq!(v.y, 1.0);
    }

    #[test]
    fn test_gesture_rejects_leg_channels() {
        let g = GestureTemplate::new("bad").with("LeftUpLeg.rotation", TemplateValue::fixed(0.0, 0.0, 0.0));
        assert!(g.is_err());
    }

    #[test]
    fn test_gesture_mirror() {
        let mut rng = StdRng::seed_from_u64(3);
        let g = GestureTemplate::new("wave")
            .with("LeftArm.rotation", TemplateValue::fixed(0.0, 0.0, 0.5))
            .unwrap();
        let props = g.instantiate(true, &mut rng);
        assert!(props.contains_key(&ChannelKey::rotation("RightArm")));
        assert!(!props.contains_key(&ChannelKey::rotation("LeftArm")));
    }
}
