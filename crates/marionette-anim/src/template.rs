//! Animation templates and their resolver
//!
//! A template is a tree. Branch nodes are keyed by the avatar's current
//! state, mood, pose, camera view and body form; weighted alternatives pick
//! one child at random; leaves describe a timeline (`delay`, `dt`, `vs`).
//! Resolution walks the tree with a fixed key order until it hits a leaf.

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use marionette_core::{AnimError, AnimResult, ChannelKey, Scalar};
use marionette_pose::TemplateValue;

use crate::entry::{CommandFn, HandSide};

/// Speaking state of the avatar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AvatarState {
    #[default]
    Idle,
    Talking,
}

impl AvatarState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AvatarState::Idle => "idle",
            AvatarState::Talking => "talking",
        }
    }
}

/// Camera framing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Full,
    Mid,
    Upper,
    Head,
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Full => "full",
            View::Mid => "mid",
            View::Upper => "upper",
            View::Head => "head",
        }
    }
}

/// Body form of the avatar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BodyForm {
    #[default]
    M,
    F,
}

impl BodyForm {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyForm::M => "M",
            BodyForm::F => "F",
        }
    }
}

/// Values the resolver narrows on, in priority order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolveKeys {
    pub state: AvatarState,
    pub mood: String,
    pub pose: String,
    pub view: View,
    pub body: BodyForm,
}

impl ResolveKeys {
    /// Keys in resolution order: state, mood, pose, view, body
    pub fn ordered(&self) -> [&str; 5] {
        [
            self.state.as_str(),
            self.mood.as_str(),
            self.pose.as_str(),
            self.view.as_str(),
            self.body.as_str(),
        ]
    }
}

/// Authored command; randomized parts are sampled when an entry is built
#[derive(Clone)]
pub enum CommandSpec {
    Pose(String),
    Gesture {
        name: String,
        duration_s: Option<f32>,
        mirror: bool,
        transition_ms: Option<f64>,
    },
    MoveTo {
        props: BTreeMap<ChannelKey, TemplateValue>,
        duration_ms: Scalar,
    },
    /// `target: None` releases the hand back to the pose
    Hand {
        side: HandSide,
        target: Option<TemplateValue>,
        duration_ms: Option<Scalar>,
    },
    Subtitles(String),
    Speak(String),
    Function(CommandFn),
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandSpec::Pose(name) => write!(f, "Pose({name})"),
            CommandSpec::Gesture { name, .. } => write!(f, "Gesture({name})"),
            CommandSpec::MoveTo { props, .. } => write!(f, "MoveTo({} channels)", props.len()),
            CommandSpec::Hand { side, target, .. } => write!(f, "Hand({side:?}, {target:?})"),
            CommandSpec::Subtitles(text) => write!(f, "Subtitles({text:?})"),
            CommandSpec::Speak(text) => write!(f, "Speak({text:?})"),
            CommandSpec::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// One authored value of a channel sequence
#[derive(Debug, Clone)]
pub enum SpecValue {
    /// Offset from the channel's baseline, scaled by the entry's value scale
    Value(Scalar),
    /// The channel's live baseline, read when the keyframe is evaluated
    Baseline,
    Command(CommandSpec),
}

impl From<f32> for SpecValue {
    fn from(v: f32) -> Self {
        SpecValue::Value(Scalar::Fixed(v))
    }
}

impl From<Scalar> for SpecValue {
    fn from(s: Scalar) -> Self {
        SpecValue::Value(s)
    }
}

impl From<CommandSpec> for SpecValue {
    fn from(c: CommandSpec) -> Self {
        SpecValue::Command(c)
    }
}

/// Leaf timeline definition
#[derive(Debug, Clone, Default)]
pub struct AnimSpec {
    pub delay: Scalar,
    pub dt: Vec<Scalar>,
    pub vs: BTreeMap<String, Vec<SpecValue>>,
}

impl AnimSpec {
    pub fn new(delay: impl Into<Scalar>) -> Self {
        Self {
            delay: delay.into(),
            ..Default::default()
        }
    }

    /// Segment durations between consecutive timestamps
    pub fn steps<S: Into<Scalar>>(mut self, dt: impl IntoIterator<Item = S>) -> Self {
        self.dt = dt.into_iter().map(Into::into).collect();
        self
    }

    /// Value sequence of one channel (targets at `ts[1..]`, or at `ts[0..]` for commands)
    pub fn channel<V: Into<SpecValue>>(mut self, name: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.vs.insert(name.to_string(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn leaf(self) -> TemplateNode {
        TemplateNode::Leaf(self)
    }
}

/// One weighted alternative; `p: None` takes an equal share of what is left
#[derive(Debug, Clone)]
pub struct Alternative {
    pub p: Option<f32>,
    pub node: TemplateNode,
}

impl Alternative {
    pub fn new(p: Option<f32>, node: TemplateNode) -> Self {
        Self { p, node }
    }
}

/// Template tree node
#[derive(Debug, Clone)]
pub enum TemplateNode {
    Leaf(AnimSpec),
    Branch(BTreeMap<String, TemplateNode>),
    WeightedAlt(Vec<Alternative>),
}

impl TemplateNode {
    /// Branch from `(key, node)` pairs
    pub fn branch<'a>(arms: impl IntoIterator<Item = (&'a str, TemplateNode)>) -> Self {
        TemplateNode::Branch(arms.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    pub fn alt(alternatives: impl IntoIterator<Item = (Option<f32>, TemplateNode)>) -> Self {
        TemplateNode::WeightedAlt(
            alternatives
                .into_iter()
                .map(|(p, node)| Alternative::new(p, node))
                .collect(),
        )
    }
}

/// Named top-level template
#[derive(Debug, Clone)]
pub struct AnimTemplate {
    pub name: String,
    pub node: TemplateNode,
}

impl AnimTemplate {
    pub fn new(name: impl Into<String>, node: TemplateNode) -> Self {
        Self {
            name: name.into(),
            node,
        }
    }

    /// Narrow the tree down to a leaf
    pub fn resolve<R: Rng + ?Sized>(&self, keys: &ResolveKeys, rng: &mut R) -> AnimResult<&AnimSpec> {
        resolve(&self.node, keys, rng).ok_or_else(|| AnimError::UnresolvedTemplate(self.name.clone()))
    }
}

/// Walk `node` with the ordered keys; alternatives restart the walk
pub fn resolve<'a, R: Rng + ?Sized>(
    mut node: &'a TemplateNode,
    keys: &ResolveKeys,
    rng: &mut R,
) -> Option<&'a AnimSpec> {
    let ordered = keys.ordered();
    loop {
        let mut progressed = false;
        for key in ordered {
            if let TemplateNode::Branch(arms) = node {
                if let Some(child) = arms.get(key) {
                    node = child;
                    progressed = true;
                }
            }
        }
        match node {
            TemplateNode::Leaf(spec) => return Some(spec),
            TemplateNode::WeightedAlt(alts) => {
                let idx = choose_alternative(alts, rng.gen::<f32>())?;
                node = &alts[idx].node;
            }
            TemplateNode::Branch(_) if !progressed => return None,
            TemplateNode::Branch(_) => {}
        }
    }
}

/// One-pass weighted choice for a single uniform draw `r` in `[0, 1)`.
///
/// Probability mass accumulates over the alternatives (explicit `p`, or an
/// equal share of the remaining mass among this and the later ones); the
/// first alternative whose cumulative mass exceeds `r` wins.
pub fn choose_alternative(alts: &[Alternative], r: f32) -> Option<usize> {
    if alts.is_empty() {
        return None;
    }
    let n = alts.len();
    let mut acc = 0.0f32;
    for (i, alt) in alts.iter().enumerate() {
        acc += match alt.p {
            Some(p) => p,
            None => (1.0 - acc).max(0.0) / (n - i) as f32,
        };
        if r < acc {
            return Some(i);
        }
    }
    // Mass summing just below 1.0 (rounding)
    Some(n - 1)
}
