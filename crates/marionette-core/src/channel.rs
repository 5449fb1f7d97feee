//! Joint channels - a named skeleton joint plus one transform property
//!
//! Keys are globally stable: `Head.rotation` always maps to the same
//! representation (a normalized quaternion), positions and scales to vectors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::AnimError;

/// Transform property of a joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Property {
    Rotation,
    Position,
    Scale,
}

impl Property {
    pub fn as_str(&self) -> &'static str {
        match self {
            Property::Rotation => "rotation",
            Property::Position => "position",
            Property::Scale => "scale",
        }
    }

    /// Rotation channels hold quaternions, the rest hold vectors
    pub fn is_rotation(&self) -> bool {
        matches!(self, Property::Rotation)
    }
}

/// Channel key `(joint, property)`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChannelKey {
    pub joint: String,
    pub property: Property,
}

impl ChannelKey {
    pub fn new(joint: impl Into<String>, property: Property) -> Self {
        Self {
            joint: joint.into(),
            property,
        }
    }

    pub fn rotation(joint: impl Into<String>) -> Self {
        Self::new(joint, Property::Rotation)
    }

    pub fn position(joint: impl Into<String>) -> Self {
        Self::new(joint, Property::Position)
    }

    pub fn scale(joint: impl Into<String>) -> Self {
        Self::new(joint, Property::Scale)
    }

    /// Is this a left-side joint?
    pub fn is_left(&self) -> bool {
        self.joint.starts_with("Left")
    }

    /// Is this a right-side joint?
    pub fn is_right(&self) -> bool {
        self.joint.starts_with("Right")
    }

    /// Key of the opposite-side joint (`LeftArm` <-> `RightArm`).
    /// Center joints map to themselves.
    pub fn mirrored(&self) -> ChannelKey {
        let joint = if let Some(rest) = self.joint.strip_prefix("Left") {
            format!("Right{rest}")
        } else if let Some(rest) = self.joint.strip_prefix("Right") {
            format!("Left{rest}")
        } else {
            self.joint.clone()
        };
        ChannelKey {
            joint,
            property: self.property,
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.joint, self.property.as_str())
    }
}

impl FromStr for ChannelKey {
    type Err = AnimError;

    /// Parses `Joint.rotation`, `Joint.quaternion`, `Joint.position` or `Joint.scale`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (joint, prop) = s
            .rsplit_once('.')
            .ok_or_else(|| AnimError::InvalidChannel(s.to_string()))?;
        if joint.is_empty() {
            return Err(AnimError::InvalidChannel(s.to_string()));
        }
        let property = match prop {
            "rotation" | "quaternion" => Property::Rotation,
            "position" => Property::Position,
            "scale" => Property::Scale,
            _ => return Err(AnimError::InvalidChannel(s.to_string())),
        };
        Ok(ChannelKey::new(joint, property))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_channel_key() {
        let key: ChannelKey = "LeftArm.quaternion".parse().unwrap();
        assert_eq!(key, ChannelKey::rotation("LeftArm"));
        assert_eq!(key.to_string(), "LeftArm.rotation");

        let key: ChannelKey = "Hips.position".parse().unwrap();
        assert_eq!(key.property, Property::Position);

        assert!("Hips".parse::<ChannelKey>().is_err());
        assert!("Hips.color".parse::<ChannelKey>().is_err());
        assert!(".rotation".parse::<ChannelKey>().is_err());
    }

    #[test]
    fn test_mirrored_key() {
        let left = ChannelKey::rotation("LeftHandIndex1");
        assert_eq!(left.mirrored(), ChannelKey::rotation("RightHandIndex1"));
        assert_eq!(left.mirrored().mirrored(), left);

        let center = ChannelKey::rotation("Spine1");
        assert_eq!(center.mirrored(), center);
    }
}
