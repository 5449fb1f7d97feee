//! Animation entries - time-stamped channel timelines
//!
//! An entry carries `ts[0..n]` and, per channel, `n` keyframes. Numeric
//! channels start with an anchor that is replaced by the channel's live value
//! when the entry becomes active. Command channels fire each keyframe once
//! when its timestamp passes.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rand::Rng;
use tracing::warn;

use marionette_core::{ease, ChannelKey, ChannelValue, DynamicFn, Vec3};

use crate::config::DampingConfig;
use crate::template::{AnimSpec, AnimTemplate, CommandSpec, SpecValue};

/// Callback fired by a `function` command or a speech marker
pub type CommandFn = Arc<dyn Fn() + Send + Sync>;

/// Which arm an IK command drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandSide {
    Left,
    Right,
}

/// Side-effecting command produced by a channel keyframe
#[derive(Clone)]
pub enum AnimCommand {
    Pose(String),
    Gesture {
        name: String,
        duration_s: Option<f32>,
        mirror: bool,
        transition_ms: Option<f64>,
    },
    MoveTo {
        props: BTreeMap<ChannelKey, ChannelValue>,
        duration_ms: f64,
    },
    /// Offset from the chain root; `None` releases the hand
    Hand {
        side: HandSide,
        target: Option<Vec3>,
        duration_ms: Option<f64>,
    },
    Subtitles(String),
    Speak(String),
    Function(CommandFn),
}

impl AnimCommand {
    /// Channel name that carries this command
    pub fn channel(&self) -> &'static str {
        match self {
            AnimCommand::Pose(_) => "pose",
            AnimCommand::Gesture { .. } => "gesture",
            AnimCommand::MoveTo { .. } => "moveto",
            AnimCommand::Hand {
                side: HandSide::Left, ..
            } => "handLeft",
            AnimCommand::Hand {
                side: HandSide::Right, ..
            } => "handRight",
            AnimCommand::Subtitles(_) => "subtitles",
            AnimCommand::Speak(_) => "speak",
            AnimCommand::Function(_) => "function",
        }
    }

    fn from_spec<R: Rng + ?Sized>(spec: &CommandSpec, rng: &mut R) -> Self {
        match spec {
            CommandSpec::Pose(name) => AnimCommand::Pose(name.clone()),
            CommandSpec::Gesture {
                name,
                duration_s,
                mirror,
                transition_ms,
            } => AnimCommand::Gesture {
                name: name.clone(),
                duration_s: *duration_s,
                mirror: *mirror,
                transition_ms: *transition_ms,
            },
            CommandSpec::MoveTo { props, duration_ms } => AnimCommand::MoveTo {
                props: props
                    .iter()
                    .map(|(k, v)| (k.clone(), ChannelValue::from_euler(k.property, v.sample(rng))))
                    .collect(),
                duration_ms: duration_ms.resolve(rng).max(0.0) as f64,
            },
            CommandSpec::Hand {
                side,
                target,
                duration_ms,
            } => AnimCommand::Hand {
                side: *side,
                target: target.map(|t| t.sample(rng)),
                duration_ms: duration_ms.map(|d| d.resolve(rng).max(0.0) as f64),
            },
            CommandSpec::Subtitles(text) => AnimCommand::Subtitles(text.clone()),
            CommandSpec::Speak(text) => AnimCommand::Speak(text.clone()),
            CommandSpec::Function(f) => AnimCommand::Function(f.clone()),
        }
    }
}

impl fmt::Debug for AnimCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnimCommand::Pose(name) => write!(f, "Pose({name})"),
            AnimCommand::Gesture {
                name,
                duration_s,
                mirror,
                ..
            } => write!(f, "Gesture({name}, {duration_s:?}, mirror={mirror})"),
            AnimCommand::MoveTo { props, duration_ms } => {
                write!(f, "MoveTo({} channels, {duration_ms}ms)", props.len())
            }
            AnimCommand::Hand { side, target, .. } => write!(f, "Hand({side:?}, {target:?})"),
            AnimCommand::Subtitles(text) => write!(f, "Subtitles({text:?})"),
            AnimCommand::Speak(text) => write!(f, "Speak({text:?})"),
            AnimCommand::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// One keyframe of a channel timeline
#[derive(Clone)]
pub enum Keyframe {
    /// Live value of the channel, captured on activation
    Anchor,
    Value(f32),
    /// Channel baseline, read at evaluation time
    Baseline,
    Dynamic(DynamicFn),
    Command(AnimCommand),
    /// Command already fired (or padding after the last command)
    Consumed,
}

impl Keyframe {
    pub fn is_command(&self) -> bool {
        matches!(self, Keyframe::Command(_))
    }

    fn map_value(&self, f: impl Fn(f32) -> f32) -> Keyframe {
        match self {
            Keyframe::Value(v) => Keyframe::Value(f(*v)),
            other => other.clone(),
        }
    }
}

impl fmt::Debug for Keyframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Keyframe::Anchor => f.write_str("Anchor"),
            Keyframe::Value(v) => write!(f, "{v}"),
            Keyframe::Baseline => f.write_str("Baseline"),
            Keyframe::Dynamic(_) => f.write_str("Dynamic(..)"),
            Keyframe::Command(c) => write!(f, "{c:?}"),
            Keyframe::Consumed => f.write_str("Consumed"),
        }
    }
}

/// How often an entry plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    Once,
    /// Total number of plays
    Times(u32),
    Forever,
}

impl LoopMode {
    /// Mode of the respawned entry, or `None` when done
    pub fn next(self) -> Option<LoopMode> {
        match self {
            LoopMode::Once => None,
            LoopMode::Times(n) if n > 1 => Some(LoopMode::Times(n - 1)),
            LoopMode::Times(_) => None,
            LoopMode::Forever => Some(LoopMode::Forever),
        }
    }
}

/// Origin of an entry, used for bulk removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryTag {
    #[default]
    Template,
    /// Viseme and subtitle timelines of the current utterance
    Speech,
    /// Retired together with the active gesture
    Gesture,
    Manual,
}

/// Creation options
#[derive(Debug, Clone, PartialEq)]
pub struct EntryOptions {
    pub loop_mode: LoopMode,
    pub time_scale: f32,
    pub value_scale: f32,
    pub tag: EntryTag,
    /// Mood switched to when the entry becomes active
    pub mood_transition: Option<String>,
}

impl Default for EntryOptions {
    fn default() -> Self {
        Self {
            loop_mode: LoopMode::Once,
            time_scale: 1.0,
            value_scale: 1.0,
            tag: EntryTag::Template,
            mood_transition: None,
        }
    }
}

impl EntryOptions {
    pub fn looping(loop_mode: LoopMode) -> Self {
        Self {
            loop_mode,
            ..Default::default()
        }
    }

    pub fn tagged(tag: EntryTag) -> Self {
        Self {
            tag,
            ..Default::default()
        }
    }
}

/// Time-stamped timeline over named channels
#[derive(Debug, Clone)]
pub struct AnimationEntry {
    /// Assigned when the entry is queued
    pub id: u64,
    pub name: String,
    /// Template to regenerate from when looping
    pub template: Option<Arc<AnimTemplate>>,
    pub ts: Vec<f64>,
    pub channels: BTreeMap<String, Vec<Keyframe>>,
    pub options: EntryOptions,
    pub(crate) active: bool,
}

impl AnimationEntry {
    /// Empty entry over the given timestamps
    pub fn new(name: impl Into<String>, ts: Vec<f64>, options: EntryOptions) -> Self {
        Self {
            id: 0,
            name: name.into(),
            template: None,
            ts,
            channels: BTreeMap::new(),
            options,
            active: false,
        }
    }

    /// Add a channel, padding or truncating it to the timestamp count
    pub fn with_channel(mut self, name: impl Into<String>, keyframes: Vec<Keyframe>) -> Self {
        self.insert_channel(name.into(), keyframes);
        self
    }

    fn insert_channel(&mut self, name: String, mut keyframes: Vec<Keyframe>) {
        let n = self.ts.len();
        let is_command = keyframes.iter().any(Keyframe::is_command);
        keyframes.truncate(n);
        while keyframes.len() < n {
            // Commands are never repeated by padding
            let pad = match keyframes.last() {
                Some(last) if !is_command => last.clone(),
                _ if is_command => Keyframe::Consumed,
                _ => Keyframe::Anchor,
            };
            keyframes.push(pad);
        }
        self.channels.insert(name, keyframes);
    }

    /// Build from a resolved leaf.
    ///
    /// `ts[0] = now + delay`, `ts[i+1] = ts[i] + dt[i] * time_scale`. Numeric
    /// channels become `[Anchor, base + value_scale * x, ...]` where `base`
    /// is the channel's baseline.
    pub fn from_spec<R: Rng + ?Sized>(
        name: &str,
        spec: &AnimSpec,
        now_ms: f64,
        options: EntryOptions,
        baseline: &dyn Fn(&str) -> f32,
        rng: &mut R,
    ) -> Self {
        let mut ts = Vec::with_capacity(spec.dt.len() + 1);
        ts.push(now_ms + spec.delay.resolve(rng).max(0.0) as f64);
        for dt in &spec.dt {
            let step = (dt.resolve(rng) * options.time_scale).max(0.0) as f64;
            let last = ts[ts.len() - 1];
            ts.push(last + step);
        }

        let value_scale = options.value_scale;
        let mut entry = Self::new(name, ts, options);
        for (channel, values) in &spec.vs {
            let commands = values.iter().all(|v| matches!(v, SpecValue::Command(_)));
            if commands {
                let keyframes = values
                    .iter()
                    .filter_map(|v| match v {
                        SpecValue::Command(c) => Some(Keyframe::Command(AnimCommand::from_spec(c, rng))),
                        _ => None,
                    })
                    .collect();
                entry.insert_channel(channel.clone(), keyframes);
                continue;
            }

            let base = baseline(channel);
            let mut keyframes = Vec::with_capacity(values.len() + 1);
            keyframes.push(Keyframe::Anchor);
            for v in values {
                keyframes.push(match v {
                    SpecValue::Value(s) => Keyframe::Value(base + value_scale * s.resolve(rng)),
                    SpecValue::Baseline => Keyframe::Baseline,
                    SpecValue::Command(c) => {
                        warn!(channel = %channel, command = ?c, "command mixed into numeric channel, ignored");
                        Keyframe::Baseline
                    }
                });
            }
            entry.insert_expanded(channel, keyframes);
        }
        entry
    }

    /// Composite eye channels are split into positive-only physical pairs
    fn insert_expanded(&mut self, channel: &str, keyframes: Vec<Keyframe>) {
        let pos = |kf: &[Keyframe]| kf.iter().map(|k| k.map_value(|x| x.max(0.0))).collect::<Vec<_>>();
        let neg = |kf: &[Keyframe]| kf.iter().map(|k| k.map_value(|x| (-x).max(0.0))).collect::<Vec<_>>();
        match channel {
            "eyesRotateY" => {
                self.insert_channel("eyeLookOutLeft".into(), pos(&keyframes));
                self.insert_channel("eyeLookInLeft".into(), neg(&keyframes));
                self.insert_channel("eyeLookOutRight".into(), neg(&keyframes));
                self.insert_channel("eyeLookInRight".into(), pos(&keyframes));
            }
            "eyesRotateX" => {
                self.insert_channel("eyesLookDown".into(), pos(&keyframes));
                self.insert_channel("eyesLookUp".into(), neg(&keyframes));
            }
            _ => self.insert_channel(channel.to_string(), keyframes),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn start(&self) -> f64 {
        self.ts.first().copied().unwrap_or(0.0)
    }

    pub fn end(&self) -> f64 {
        self.ts.last().copied().unwrap_or(0.0)
    }

    pub fn total_duration(&self) -> f64 {
        self.end() - self.start()
    }

    /// Has the last timestamp passed?
    pub fn is_finished(&self, now_ms: f64) -> bool {
        self.ts.is_empty() || now_ms >= self.end()
    }

    /// Move every timestamp by `offset_ms`
    pub fn shift(&mut self, offset_ms: f64) {
        for t in &mut self.ts {
            *t += offset_ms;
        }
    }

    /// Stretch or compress to `duration_ms`.
    ///
    /// Extra time is spread over the segments by `weights` (default: segment
    /// length); a shorter duration scales all segments uniformly.
    pub fn rescale(&mut self, duration_ms: f64, weights: Option<&[f32]>) {
        let total = self.total_duration();
        if self.ts.len() < 2 || total <= 0.0 || duration_ms <= 0.0 {
            return;
        }
        let mut segments: Vec<f64> = self.ts.windows(2).map(|w| w[1] - w[0]).collect();
        if duration_ms > total {
            let excess = duration_ms - total;
            let w: Vec<f64> = match weights {
                Some(w) if w.len() == segments.len() && w.iter().any(|&x| x > 0.0) => {
                    w.iter().map(|&x| x.max(0.0) as f64).collect()
                }
                _ => segments.clone(),
            };
            let sum: f64 = w.iter().sum();
            for (seg, wi) in segments.iter_mut().zip(&w) {
                *seg += excess * wi / sum;
            }
        } else {
            let k = duration_ms / total;
            for seg in &mut segments {
                *seg *= k;
            }
        }
        let start = self.start();
        self.ts = std::iter::once(start)
            .chain(segments.iter().scan(start, |t, seg| {
                *t += seg;
                Some(*t)
            }))
            .collect();
    }

    /// Scale numeric deviations from the baseline by the damping rules
    pub fn damp(&mut self, damping: &DampingConfig, baseline: &dyn Fn(&str) -> f32) {
        for (channel, keyframes) in &mut self.channels {
            let factor = damping.factor(channel);
            if factor == 1.0 {
                continue;
            }
            let base = baseline(channel);
            for kf in keyframes.iter_mut() {
                *kf = kf.map_value(|v| base + (v - base) * factor);
            }
        }
    }

    /// Replace anchors with live values
    pub(crate) fn activate(&mut self, live: &dyn Fn(&str) -> f32) {
        for (channel, keyframes) in &mut self.channels {
            for kf in keyframes.iter_mut() {
                if matches!(kf, Keyframe::Anchor) {
                    *kf = Keyframe::Value(live(channel));
                }
            }
        }
        self.active = true;
    }

    /// Numeric channels currently carried
    pub fn value_channels(&self) -> impl Iterator<Item = &str> {
        self.channels
            .iter()
            .filter(|(_, kf)| !kf.iter().any(|k| matches!(k, Keyframe::Command(_) | Keyframe::Consumed)))
            .map(|(name, _)| name.as_str())
    }

    /// Take every command whose timestamp has passed; spent command channels are removed
    pub(crate) fn take_due_commands(&mut self, now_ms: f64) -> Vec<AnimCommand> {
        let mut out = Vec::new();
        let ts = &self.ts;
        self.channels.retain(|_, keyframes| {
            let is_command = keyframes
                .iter()
                .any(|k| matches!(k, Keyframe::Command(_) | Keyframe::Consumed));
            if !is_command {
                return true;
            }
            for (i, kf) in keyframes.iter_mut().enumerate() {
                if ts.get(i).is_some_and(|&t| t <= now_ms) {
                    if let Keyframe::Command(cmd) = std::mem::replace(kf, Keyframe::Consumed) {
                        out.push(cmd);
                    }
                }
            }
            keyframes.iter().any(Keyframe::is_command)
        });
        out
    }
}

/// Piecewise eased interpolation over a keyframe sequence.
///
/// Finds the bracketing pair around `now_ms`, eases the local fraction and
/// lerps between the endpoint values. Returns `None` before `ts[0]` or when
/// an endpoint has no numeric value.
pub fn value_animation_seq(
    ts: &[f64],
    keyframes: &[Keyframe],
    now_ms: f64,
    value_of: &dyn Fn(&Keyframe) -> Option<f32>,
) -> Option<f32> {
    let first = *ts.first()?;
    if now_ms < first || keyframes.len() != ts.len() {
        return None;
    }
    let last = ts.len() - 1;
    if now_ms >= ts[last] {
        return value_of(&keyframes[last]);
    }
    // ts[j] <= now < ts[j + 1]
    let j = ts.partition_point(|&t| t <= now_ms).saturating_sub(1).min(last - 1);
    let (t0, t1) = (ts[j], ts[j + 1]);
    let frac = if t1 > t0 { ((now_ms - t0) / (t1 - t0)) as f32 } else { 1.0 };
    let v0 = value_of(&keyframes[j])?;
    let v1 = value_of(&keyframes[j + 1])?;
    match ease(frac) {
        e if e >= 1.0 => Some(v1),
        e => Some(v0 + e * (v1 - v0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::AnimSpec;
    use marionette_core::{range, Scalar};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn zero(_: &str) -> f32 {
        0.0
    }

    fn plain(kf: &Keyframe) -> Option<f32> {
        match kf {
            Keyframe::Value(v) => Some(*v),
            _ => None,
        }
    }

    #[test]
    fn test_timestamps_and_padding() {
        let spec = AnimSpec::new(100.0f32)
            .steps([50.0f32, 200.0, 100.0])
            .channel("eyeBlinkLeft", [1.0f32]);
        let mut rng = StdRng::seed_from_u64(1);
        let entry = AnimationEntry::from_spec("blink", &spec, 1000.0, EntryOptions::default(), &zero, &mut rng);

        assert_eq!(entry.ts, vec![1100.0, 1150.0, 1350.0, 1450.0]);
        let kf = &entry.channels["eyeBlinkLeft"];
        assert_eq!(kf.len(), 4);
        assert!(matches!(kf[0], Keyframe::Anchor));
        assert!(matches!(kf[3], Keyframe::Value(v) if v == 1.0));
    }

    #[test]
    fn test_time_and_value_scale() {
        let spec = AnimSpec::new(0.0f32).steps([100.0f32]).channel("mouthSmile", [0.5f32]);
        let mut rng = StdRng::seed_from_u64(1);
        let opts = EntryOptions {
            time_scale: 2.0,
            value_scale: 0.5,
            ..Default::default()
        };
        let baseline = |_: &str| 0.1;
        let entry = AnimationEntry::from_spec("s", &spec, 0.0, opts, &baseline, &mut rng);
        assert_eq!(entry.ts, vec![0.0, 200.0]);
        assert!(matches!(entry.channels["mouthSmile"][1], Keyframe::Value(v) if (v - 0.35).abs() < 1e-6));
    }

    #[test]
    fn test_eye_rotation_split() {
        let spec = AnimSpec::new(0.0f32)
            .steps([100.0f32, 100.0])
            .channel("eyesRotateY", [0.4f32, -0.2])
            .channel("eyesRotateX", [-0.3f32, 0.0]);
        let mut rng = StdRng::seed_from_u64(1);
        let entry = AnimationEntry::from_spec("eyes", &spec, 0.0, EntryOptions::default(), &zero, &mut rng);

        assert!(!entry.channels.contains_key("eyesRotateY"));
        let v = |ch: &str, i: usize| plain(&entry.channels[ch][i]);
        assert_eq!(v("eyeLookOutLeft", 1), Some(0.4));
        assert_eq!(v("eyeLookInLeft", 1), Some(0.0));
        assert_eq!(v("eyeLookInRight", 1), Some(0.4));
        assert_eq!(v("eyeLookOutRight", 2), Some(0.2));
        assert_eq!(v("eyesLookUp", 1), Some(0.3));
        assert_eq!(v("eyesLookDown", 1), Some(0.0));
    }

    #[test]
    fn test_commands_fire_once() {
        let spec = AnimSpec::new(0.0f32)
            .steps([1000.0f32])
            .channel("pose", [CommandSpec::Pose("hip".into())]);
        let mut rng = StdRng::seed_from_u64(1);
        let mut entry = AnimationEntry::from_spec("pose", &spec, 0.0, EntryOptions::default(), &zero, &mut rng);
        assert_eq!(entry.channels["pose"].len(), 2);

        let fired = entry.take_due_commands(0.0);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].channel(), "pose");
        assert!(entry.take_due_commands(2000.0).is_empty());
        assert!(!entry.channels.contains_key("pose"));
    }

    #[test]
    fn test_value_animation_seq() {
        let ts = [0.0, 100.0, 200.0];
        let kf = [Keyframe::Value(0.0), Keyframe::Value(1.0), Keyframe::Value(1.0)];
        assert_eq!(value_animation_seq(&ts, &kf, -1.0, &plain), None);
        assert_eq!(value_animation_seq(&ts, &kf, 0.0, &plain), Some(0.0));
        let mid = value_animation_seq(&ts, &kf, 50.0, &plain).unwrap();
        assert!((mid - 0.5).abs() < 1e-4);
        let early = value_animation_seq(&ts, &kf, 20.0, &plain).unwrap();
        assert!(early < 0.2, "eased start should be slow: {early}");
        assert_eq!(value_animation_seq(&ts, &kf, 150.0, &plain), Some(1.0));
        assert_eq!(value_animation_seq(&ts, &kf, 500.0, &plain), Some(1.0));

        // Keyframe values come back exactly, not from the curve
        let odd = [Keyframe::Value(0.3), Keyframe::Value(0.7)];
        assert_eq!(value_animation_seq(&ts[..2], &odd, 0.0, &plain), Some(0.3));
        assert_eq!(value_animation_seq(&ts[..2], &odd, 100.0, &plain), Some(0.7));
    }

    #[test]
    fn test_rescale_spreads_by_weights() {
        let mut entry = AnimationEntry::new("e", vec![0.0, 300.0, 2300.0], EntryOptions::default());
        entry.rescale(4300.0, Some(&[0.0, 1.0]));
        assert_eq!(entry.ts, vec![0.0, 300.0, 4300.0]);

        let mut entry = AnimationEntry::new("e", vec![0.0, 300.0, 2300.0], EntryOptions::default());
        entry.rescale(1150.0, Some(&[0.0, 1.0]));
        assert_eq!(entry.ts, vec![0.0, 150.0, 1150.0]);
    }

    #[test]
    fn test_damp_toward_baseline() {
        let mut entry = AnimationEntry::new("head", vec![0.0, 100.0], EntryOptions::default())
            .with_channel("headRotateY", vec![Keyframe::Anchor, Keyframe::Value(0.4)])
            .with_channel("eyeBlinkLeft", vec![Keyframe::Anchor, Keyframe::Value(1.0)]);
        entry.damp(&DampingConfig::default(), &zero);
        assert!(matches!(entry.channels["headRotateY"][1], Keyframe::Value(v) if (v - 0.1).abs() < 1e-6));
        assert!(matches!(entry.channels["eyeBlinkLeft"][1], Keyframe::Value(v) if v == 1.0));
    }

    #[test]
    fn test_loop_mode_countdown() {
        assert_eq!(LoopMode::Times(3).next(), Some(LoopMode::Times(2)));
        assert_eq!(LoopMode::Times(1).next(), None);
        assert_eq!(LoopMode::Once.next(), None);
        assert_eq!(LoopMode::Forever.next(), Some(LoopMode::Forever));
    }

    fn arb_scalar() -> impl Strategy<Value = Scalar> {
        prop_oneof![
            (-500.0f32..2000.0).prop_map(Scalar::Fixed),
            (0.0f32..1000.0, 0.0f32..1000.0).prop_map(|(a, b)| range(a.min(b), a.max(b))),
        ]
    }

    proptest! {
        #[test]
        fn prop_entry_timeline_invariants(
            delay in arb_scalar(),
            dt in proptest::collection::vec(arb_scalar(), 0..8),
            lens in proptest::collection::vec(0usize..10, 1..4),
            time_scale in 0.1f32..3.0,
            seed in any::<u64>(),
        ) {
            let mut spec = AnimSpec::new(delay).steps(dt);
            for (i, len) in lens.iter().enumerate() {
                spec = spec.channel(&format!("ch{i}"), vec![0.5f32; *len]);
            }
            let mut rng = StdRng::seed_from_u64(seed);
            let opts = EntryOptions { time_scale, ..Default::default() };
            let entry = AnimationEntry::from_spec("p", &spec, 100.0, opts, &zero, &mut rng);

            prop_assert!(entry.ts.windows(2).all(|w| w[0] <= w[1]));
            prop_assert!(entry.ts[0] >= 100.0);
            for keyframes in entry.channels.values() {
                prop_assert_eq!(keyframes.len(), entry.ts.len());
            }
        }
    }
}
