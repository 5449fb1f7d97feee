//! Built-in animation templates
//!
//! Idle and speaking motion is authored as template trees. Every value is an
//! offset from the channel's baseline; timings and amplitudes are randomized
//! so looping entries never repeat exactly.

use std::collections::BTreeMap;
use std::sync::Arc;

use marionette_core::{range, range_skewed, AnimError, AnimResult, Scalar, TemplateKind};
use marionette_pose::TemplateValue;

use crate::entry::HandSide;
use crate::template::{AnimSpec, AnimTemplate, CommandSpec, TemplateNode};

/// Name of the gaze template built per request
pub const LOOKAT: &str = "lookat";

/// Catalog of named animation templates
#[derive(Debug, Clone, Default)]
pub struct AnimLibrary {
    templates: BTreeMap<String, Arc<AnimTemplate>>,
}

impl AnimLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Library with every built-in template
    pub fn builtin() -> Self {
        Self::new()
            .with(breathing())
            .with(blink())
            .with(eyes())
            .with(head())
            .with(pose())
            .with(talking_hands())
    }

    pub fn with(mut self, template: AnimTemplate) -> Self {
        self.templates.insert(template.name.clone(), Arc::new(template));
        self
    }

    pub fn get(&self, name: &str) -> AnimResult<Arc<AnimTemplate>> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| AnimError::unknown(TemplateKind::Animation, name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }
}

fn breathing() -> AnimTemplate {
    AnimTemplate::new(
        "breathing",
        AnimSpec::new(0.0f32)
            .steps([Scalar::Fixed(1200.0), range(400.0, 600.0), Scalar::Fixed(1000.0)])
            .channel("chestInhale", [0.5f32, 0.5, 0.0])
            .leaf(),
    )
}

fn blink() -> AnimTemplate {
    let single = AnimSpec::new(range(1000.0, 8000.0))
        .steps([Scalar::Fixed(50.0), range(100.0, 300.0), Scalar::Fixed(100.0)])
        .channel("eyeBlinkLeft", [1.0f32, 1.0, 0.0])
        .channel("eyeBlinkRight", [1.0f32, 1.0, 0.0]);
    let double = AnimSpec::new(range(1000.0, 4000.0))
        .steps([
            Scalar::Fixed(50.0),
            range(100.0, 200.0),
            Scalar::Fixed(100.0),
            range(10.0, 400.0),
            Scalar::Fixed(50.0),
            range(100.0, 200.0),
            Scalar::Fixed(100.0),
        ])
        .channel("eyeBlinkLeft", [1.0f32, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0])
        .channel("eyeBlinkRight", [1.0f32, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0]);
    AnimTemplate::new("blink", TemplateNode::alt([(Some(0.85), single.leaf()), (None, double.leaf())]))
}

fn eyes() -> AnimTemplate {
    let idle = AnimSpec::new(range(100.0, 5000.0))
        .steps([range(100.0, 300.0), range(200.0, 5000.0)])
        .channel("eyesRotateY", [range(-0.6, 0.6)])
        .channel("eyesRotateX", [range_skewed(-0.6, 0.5, 2.0, 1)]);
    let talking = AnimSpec::new(range(100.0, 2000.0))
        .steps([range(100.0, 200.0), range(500.0, 2000.0)])
        .channel("eyesRotateY", [range(-0.2, 0.2)])
        .channel("eyesRotateX", [range(-0.1, 0.2)]);
    AnimTemplate::new(
        "eyes",
        TemplateNode::branch([("idle", idle.leaf()), ("talking", talking.leaf())]),
    )
}

fn head() -> AnimTemplate {
    let idle = AnimSpec::new(range(0.0, 1000.0))
        .steps([range(1000.0, 5000.0)])
        .channel("headRotateX", [range(-0.04, 0.1)])
        .channel("headRotateY", [range_skewed(-0.3, 0.3, 1.0, 2)])
        .channel("headRotateZ", [range(-0.08, 0.08)]);
    let talking = AnimSpec::new(range(0.0, 1000.0))
        .steps([range(1000.0, 7000.0)])
        .channel("headRotateX", [range(-0.07, 0.07)])
        .channel("headRotateY", [range(-0.2, 0.2)])
        .channel("headRotateZ", [range(-0.05, 0.05)]);
    AnimTemplate::new(
        "head",
        TemplateNode::branch([("idle", idle.leaf()), ("talking", talking.leaf())]),
    )
}

fn pose_change(name: &str) -> TemplateNode {
    AnimSpec::new(range(5000.0, 30000.0))
        .steps([range(5000.0, 30000.0)])
        .channel("pose", [CommandSpec::Pose(name.to_string())])
        .leaf()
}

fn pose() -> AnimTemplate {
    let feminine = TemplateNode::alt([
        (Some(0.4), pose_change("hip")),
        (Some(0.3), pose_change("side")),
        (None, pose_change("straight")),
    ]);
    let masculine = TemplateNode::alt([
        (Some(0.4), pose_change("wide")),
        (Some(0.2), pose_change("side")),
        (None, pose_change("straight")),
    ]);
    AnimTemplate::new(
        "pose",
        TemplateNode::branch([
            // A sleeping avatar stays where it is
            (
                "sleep",
                AnimSpec::new(0.0f32).steps([Scalar::Fixed(30000.0)]).leaf(),
            ),
            ("F", feminine),
            ("M", masculine),
        ]),
    )
}

/// Hand beat target relative to the shoulder, authored for the left side
fn beat_target(side: HandSide) -> TemplateValue {
    let x = match side {
        HandSide::Left => range(0.1, 0.25),
        HandSide::Right => range(-0.25, -0.1),
    };
    TemplateValue::new(x, range(-0.5, -0.35), range(0.2, 0.35))
}

fn hand_beat(side: HandSide) -> Vec<CommandSpec> {
    vec![
        CommandSpec::Hand {
            side,
            target: Some(beat_target(side)),
            duration_ms: Some(range(800.0, 1500.0)),
        },
        CommandSpec::Hand {
            side,
            target: None,
            duration_ms: Some(Scalar::Fixed(1000.0)),
        },
    ]
}

fn talking_hands() -> AnimTemplate {
    let beat = |side: HandSide| {
        let channel = match side {
            HandSide::Left => "handLeft",
            HandSide::Right => "handRight",
        };
        AnimSpec::new(range(0.0, 1000.0))
            .steps([range(1000.0, 2500.0), range(500.0, 1500.0)])
            .channel(channel, hand_beat(side))
            .leaf()
    };
    // Idle leaf only waits, so the loop picks the talking branch once speech starts
    let idle = AnimSpec::new(0.0f32).steps([range(1000.0, 2000.0)]).leaf();
    AnimTemplate::new(
        "talkinghands",
        TemplateNode::branch([
            ("idle", idle),
            (
                "talking",
                TemplateNode::branch([
                    // Hands are out of frame for a head shot
                    ("head", AnimSpec::new(0.0f32).steps([Scalar::Fixed(2000.0)]).leaf()),
                    ("full", TemplateNode::alt([(None, beat(HandSide::Left)), (None, beat(HandSide::Right))])),
                    ("mid", TemplateNode::alt([(None, beat(HandSide::Left)), (None, beat(HandSide::Right))])),
                    ("upper", TemplateNode::alt([(None, beat(HandSide::Left)), (None, beat(HandSide::Right))])),
                ]),
            ),
        ]),
    )
}

/// Gaze shift held for `hold_ms`: head takes `head` (pitch, yaw), eyes the rest
pub fn look_at_spec(head: (f32, f32), eyes: (f32, f32), hold_ms: f32) -> AnimSpec {
    AnimSpec::new(0.0f32)
        .steps([range(200.0, 400.0), Scalar::Fixed(hold_ms.max(0.0))])
        .channel("headRotateX", [head.0])
        .channel("headRotateY", [head.1])
        .channel("eyesRotateX", [eyes.0])
        .channel("eyesRotateY", [eyes.1])
}
