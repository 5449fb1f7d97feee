//! Channel values - quaternion rotations, vectors and lazily evaluated scalars

use std::fmt;
use std::sync::Arc;

use glam::{EulerRot, Quat, Vec3};

use crate::Property;

/// Scalar evaluated on demand (e.g. the live baseline of a channel)
pub type DynamicFn = Arc<dyn Fn() -> f32 + Send + Sync>;

/// Value of a channel
#[derive(Clone)]
pub enum ChannelValue {
    /// Normalized quaternion
    Rotation(Quat),
    /// Position or scale
    Vector(Vec3),
    /// Scalar computed when read
    Dynamic(DynamicFn),
}

impl ChannelValue {
    /// Build the value for `property` from an authored Euler triple (XYZ order).
    /// Rotations become normalized quaternions, other properties stay vectors.
    pub fn from_euler(property: Property, v: Vec3) -> Self {
        if property.is_rotation() {
            ChannelValue::Rotation(Quat::from_euler(EulerRot::XYZ, v.x, v.y, v.z).normalize())
        } else {
            ChannelValue::Vector(v)
        }
    }

    /// Neutral value for a property (identity rotation, zero position, unit scale)
    pub fn identity(property: Property) -> Self {
        match property {
            Property::Rotation => ChannelValue::Rotation(Quat::IDENTITY),
            Property::Position => ChannelValue::Vector(Vec3::ZERO),
            Property::Scale => ChannelValue::Vector(Vec3::ONE),
        }
    }

    pub fn as_rotation(&self) -> Option<Quat> {
        match self {
            ChannelValue::Rotation(q) => Some(*q),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<Vec3> {
        match self {
            ChannelValue::Vector(v) => Some(*v),
            _ => None,
        }
    }

    /// Evaluate a scalar; rotations and vectors have no scalar reading
    pub fn scalar(&self) -> Option<f32> {
        match self {
            ChannelValue::Dynamic(f) => Some(f()),
            _ => None,
        }
    }

    /// Interpolate toward `other`: slerp for rotations, lerp for vectors.
    /// Mismatched kinds snap to `other` at `t >= 0.5`.
    pub fn blend(&self, other: &ChannelValue, t: f32) -> ChannelValue {
        let t = t.clamp(0.0, 1.0);
        match (self, other) {
            (ChannelValue::Rotation(a), ChannelValue::Rotation(b)) => {
                ChannelValue::Rotation(a.slerp(*b, t).normalize())
            }
            (ChannelValue::Vector(a), ChannelValue::Vector(b)) => ChannelValue::Vector(a.lerp(*b, t)),
            _ => {
                if t < 0.5 {
                    self.clone()
                } else {
                    other.clone()
                }
            }
        }
    }

    /// Reflect about the sagittal plane.
    /// Quaternions get `x` and `w` negated, vectors get `x` negated.
    pub fn mirrored(&self) -> ChannelValue {
        match self {
            ChannelValue::Rotation(q) => ChannelValue::Rotation(Quat::from_xyzw(-q.x, q.y, q.z, -q.w)),
            ChannelValue::Vector(v) => ChannelValue::Vector(Vec3::new(-v.x, v.y, v.z)),
            ChannelValue::Dynamic(f) => ChannelValue::Dynamic(f.clone()),
        }
    }

    /// Compose an additive correction: quaternion product for rotations,
    /// vector sum otherwise
    pub fn compose(&self, delta: &ChannelValue) -> ChannelValue {
        match (self, delta) {
            (ChannelValue::Rotation(a), ChannelValue::Rotation(d)) => {
                ChannelValue::Rotation((*a * *d).normalize())
            }
            (ChannelValue::Vector(a), ChannelValue::Vector(d)) => ChannelValue::Vector(*a + *d),
            _ => self.clone(),
        }
    }

    /// Approximate equality (quaternions compared up to sign)
    pub fn approx_eq(&self, other: &ChannelValue, eps: f32) -> bool {
        match (self, other) {
            (ChannelValue::Rotation(a), ChannelValue::Rotation(b)) => a.dot(*b).abs() > 1.0 - eps,
            (ChannelValue::Vector(a), ChannelValue::Vector(b)) => a.abs_diff_eq(*b, eps),
            _ => false,
        }
    }
}

impl fmt::Debug for ChannelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelValue::Rotation(q) => write!(f, "Rotation({q:?})"),
            ChannelValue::Vector(v) => write!(f, "Vector({v:?})"),
            ChannelValue::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}
