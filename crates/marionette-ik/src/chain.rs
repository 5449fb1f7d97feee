//! Kinematic chain definitions

use marionette_core::Vec3;

/// One rotating link of a chain
#[derive(Debug, Clone, PartialEq)]
pub struct IkLink {
    pub joint: String,
    /// Lower Euler (XYZ) bound of the link's local rotation
    pub min_axis: Option<Vec3>,
    /// Upper Euler (XYZ) bound of the link's local rotation
    pub max_axis: Option<Vec3>,
    /// Smallest rotation applied in one step (radians)
    pub min_angle: Option<f32>,
    /// Largest rotation applied in one step (radians)
    pub max_angle: Option<f32>,
}

impl IkLink {
    /// Unconstrained link
    pub fn new(joint: impl Into<String>) -> Self {
        Self {
            joint: joint.into(),
            min_axis: None,
            max_axis: None,
            min_angle: None,
            max_angle: None,
        }
    }

    pub fn with_limits(mut self, min: Vec3, max: Vec3) -> Self {
        self.min_axis = Some(min);
        self.max_axis = Some(max);
        self
    }

    pub fn with_max_angle(mut self, max: f32) -> Self {
        self.max_angle = Some(max);
        self
    }

    pub fn with_min_angle(mut self, min: f32) -> Self {
        self.min_angle = Some(min);
        self
    }

    /// Same link on the opposite side.
    /// Euler boxes reflect as (x, -y, -z), so y/z bounds swap and negate.
    pub fn mirrored(&self) -> Self {
        let joint = if let Some(rest) = self.joint.strip_prefix("Left") {
            format!("Right{rest}")
        } else if let Some(rest) = self.joint.strip_prefix("Right") {
            format!("Left{rest}")
        } else {
            self.joint.clone()
        };
        let (min_axis, max_axis) = match (self.min_axis, self.max_axis) {
            (Some(lo), Some(hi)) => (
                Some(Vec3::new(lo.x, -hi.y, -hi.z)),
                Some(Vec3::new(hi.x, -lo.y, -lo.z)),
            ),
            other => other,
        };
        Self {
            joint,
            min_axis,
            max_axis,
            ..*self
        }
    }
}

/// Root, effector and the links between them, listed root to effector
#[derive(Debug, Clone, PartialEq)]
pub struct IkChain {
    pub root: String,
    pub effector: String,
    pub links: Vec<IkLink>,
}

impl IkChain {
    pub fn new(root: impl Into<String>, effector: impl Into<String>, links: Vec<IkLink>) -> Self {
        Self {
            root: root.into(),
            effector: effector.into(),
            links,
        }
    }

    /// Left arm from shoulder to the middle finger base
    pub fn left_arm() -> Self {
        Self::new(
            "LeftShoulder",
            "LeftHandMiddle1",
            vec![
                IkLink::new("LeftArm").with_limits(Vec3::new(-1.6, -1.0, -1.6), Vec3::new(1.6, 1.0, 0.6)),
                IkLink::new("LeftForeArm").with_limits(Vec3::new(-0.6, -2.6, -0.3), Vec3::new(0.6, 0.0, 0.3)),
                IkLink::new("LeftHand")
                    .with_limits(Vec3::new(-0.6, -0.3, -0.8), Vec3::new(0.6, 0.3, 0.8))
                    .with_max_angle(0.5),
            ],
        )
    }

    pub fn right_arm() -> Self {
        Self::left_arm().mirrored()
    }

    /// Same chain on the opposite side
    pub fn mirrored(&self) -> Self {
        let flip = |name: &str| IkLink::new(name).mirrored().joint;
        Self {
            root: flip(&self.root),
            effector: flip(&self.effector),
            links: self.links.iter().map(IkLink::mirrored).collect(),
        }
    }
}
