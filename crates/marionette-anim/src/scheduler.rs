//! Animation scheduler
//!
//! Owns the queue of animation entries and the two persistent layers:
//!
//! - Baseline: every channel no active entry owns eases toward its mood
//!   baseline over a fixed approach time
//! - Fixed: pinned values that override everything else
//!
//! Precedence per channel is fixed > active entry > baseline. Among active
//! entries the one queued last wins; activating an entry prunes the shared
//! channels from earlier active entries.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rand::Rng;
use tracing::{debug, info, warn};

use marionette_core::{alpha, ease, AnimResult};

use crate::config::SchedulerConfig;
use crate::entry::{value_animation_seq, AnimCommand, AnimationEntry, EntryOptions, EntryTag, Keyframe, LoopMode};
use crate::library::AnimLibrary;
use crate::mood::MoodLibrary;
use crate::template::{AnimSpec, AnimTemplate, AvatarState, BodyForm, ResolveKeys, View};

/// Name given to one-shot entries created by `set_value`
const SET_VALUE: &str = "setvalue";

/// Values and side effects produced by one tick
#[derive(Debug, Default)]
pub struct SchedulerOutput {
    pub values: BTreeMap<String, f32>,
    pub commands: Vec<AnimCommand>,
}

/// Eased approach of one unowned channel toward its baseline
#[derive(Debug, Clone, Copy)]
struct Approach {
    from: f32,
    target: f32,
    start_ms: f64,
}

/// Queue of animation entries plus baseline and fixed layers
#[derive(Debug)]
pub struct AnimationScheduler {
    config: SchedulerConfig,
    library: AnimLibrary,
    moods: MoodLibrary,
    entries: Vec<AnimationEntry>,
    next_id: u64,
    baseline: BTreeMap<String, f32>,
    approach: BTreeMap<String, Approach>,
    fixed: BTreeMap<String, f32>,
    last_values: BTreeMap<String, f32>,
    owned_last: BTreeSet<String>,
    keys: ResolveKeys,
}

impl AnimationScheduler {
    pub fn new(config: SchedulerConfig, library: AnimLibrary, moods: MoodLibrary) -> Self {
        let keys = ResolveKeys {
            view: config.view,
            body: config.body,
            ..Default::default()
        };
        Self {
            config,
            library,
            moods,
            entries: Vec::new(),
            next_id: 1,
            baseline: BTreeMap::new(),
            approach: BTreeMap::new(),
            fixed: BTreeMap::new(),
            last_values: BTreeMap::new(),
            owned_last: BTreeSet::new(),
            keys,
        }
    }

    /// Scheduler with the built-in templates and moods
    pub fn builtin(config: SchedulerConfig) -> Self {
        Self::new(config, AnimLibrary::builtin(), MoodLibrary::builtin())
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn library(&self) -> &AnimLibrary {
        &self.library
    }

    pub fn moods(&self) -> &MoodLibrary {
        &self.moods
    }

    pub fn keys(&self) -> &ResolveKeys {
        &self.keys
    }

    pub fn mood(&self) -> &str {
        &self.keys.mood
    }

    pub fn entries(&self) -> &[AnimationEntry] {
        &self.entries
    }

    pub fn is_speaking(&self) -> bool {
        self.keys.state == AvatarState::Talking
    }

    /// Switch the `state` resolver key; baseline targets are re-damped
    pub fn set_speaking(&mut self, speaking: bool) {
        self.keys.state = if speaking { AvatarState::Talking } else { AvatarState::Idle };
    }

    pub fn set_pose_key(&mut self, pose: &str) {
        self.keys.pose = pose.to_string();
    }

    pub fn set_view(&mut self, view: View) {
        self.keys.view = view;
    }

    pub fn set_body(&mut self, body: BodyForm) {
        self.keys.body = body;
    }

    /// Switch mood: new baseline targets, and the idle loops are replaced
    /// by the mood's animations.
    pub fn set_mood<R: Rng + ?Sized>(&mut self, name: &str, now_ms: f64, rng: &mut R) -> AnimResult<()> {
        let mood = self.moods.get(name)?.clone();
        info!(from = %self.keys.mood, to = %mood.name, "mood change");

        for value in self.baseline.values_mut() {
            *value = 0.0;
        }
        self.baseline.extend(mood.baseline.iter().map(|(k, v)| (k.clone(), *v)));
        self.keys.mood = mood.name.clone();

        self.entries
            .retain(|e| !(e.options.tag == EntryTag::Template && e.options.loop_mode == LoopMode::Forever));
        for anim in &mood.anims {
            if let Err(err) = self.create_entry(anim, EntryOptions::looping(LoopMode::Forever), now_ms, rng) {
                warn!(mood = %mood.name, anim = %anim, %err, "mood animation skipped");
            }
        }
        Ok(())
    }

    /// Resolve a library template and queue the resulting entry
    pub fn create_entry<R: Rng + ?Sized>(
        &mut self,
        name: &str,
        options: EntryOptions,
        now_ms: f64,
        rng: &mut R,
    ) -> AnimResult<u64> {
        let template = self.library.get(name)?;
        self.create_entry_from(template, options, now_ms, rng)
    }

    /// Resolve `template` against the current keys and queue the entry
    pub fn create_entry_from<R: Rng + ?Sized>(
        &mut self,
        template: Arc<AnimTemplate>,
        options: EntryOptions,
        now_ms: f64,
        rng: &mut R,
    ) -> AnimResult<u64> {
        let spec = template.resolve(&self.keys, rng)?;
        let mut entry = self.build(&template.name, spec, options, now_ms, rng);
        entry.template = Some(template.clone());
        debug!(template = %template.name, start = entry.start(), end = entry.end(), "entry created");
        Ok(self.push_entry(entry))
    }

    /// Build an entry from a leaf against this scheduler's baselines (not queued)
    pub fn build<R: Rng + ?Sized>(
        &self,
        name: &str,
        spec: &AnimSpec,
        options: EntryOptions,
        now_ms: f64,
        rng: &mut R,
    ) -> AnimationEntry {
        let baseline = |channel: &str| self.baseline.get(channel).copied().unwrap_or(0.0);
        AnimationEntry::from_spec(name, spec, now_ms, options, &baseline, rng)
    }

    /// Build and queue an entry from a leaf
    pub fn push_spec<R: Rng + ?Sized>(
        &mut self,
        name: &str,
        spec: &AnimSpec,
        options: EntryOptions,
        now_ms: f64,
        rng: &mut R,
    ) -> u64 {
        let entry = self.build(name, spec, options, now_ms, rng);
        self.push_entry(entry)
    }

    /// Queue a ready-made entry; returns its id
    pub fn push_entry(&mut self, mut entry: AnimationEntry) -> u64 {
        entry.id = self.next_id;
        self.next_id += 1;
        let id = entry.id;
        self.entries.push(entry);
        id
    }

    /// Drop entries matching `pred`; returns how many were removed
    pub fn remove_where(&mut self, pred: impl Fn(&AnimationEntry) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !pred(e));
        before - self.entries.len()
    }

    pub fn remove_tagged(&mut self, tag: EntryTag) -> usize {
        self.remove_where(|e| e.options.tag == tag)
    }

    pub fn remove_named(&mut self, name: &str) -> usize {
        self.remove_where(|e| e.name == name)
    }

    /// Pin a channel (`None` releases it)
    pub fn set_fixed(&mut self, channel: &str, value: Option<f32>) {
        match value {
            Some(v) => {
                self.fixed.insert(channel.to_string(), v);
            }
            None => {
                self.fixed.remove(channel);
                // Release eases back from the pinned value
                self.approach.remove(channel);
            }
        }
    }

    pub fn fixed(&self, channel: &str) -> Option<f32> {
        self.fixed.get(channel).copied()
    }

    /// Set a channel's baseline target (`None` settles it on 0)
    pub fn set_baseline(&mut self, channel: &str, value: Option<f32>) {
        self.baseline.insert(channel.to_string(), value.unwrap_or(0.0));
    }

    pub fn baseline(&self, channel: &str) -> f32 {
        self.baseline.get(channel).copied().unwrap_or(0.0)
    }

    /// Ease a channel to `value` over `duration_ms`, then let the baseline take over
    pub fn set_value(&mut self, channel: &str, value: f32, duration_ms: f64, now_ms: f64) -> u64 {
        let entry = AnimationEntry::new(
            SET_VALUE,
            vec![now_ms, now_ms + duration_ms.max(0.0)],
            EntryOptions::tagged(EntryTag::Manual),
        )
        .with_channel(channel, vec![Keyframe::Anchor, Keyframe::Value(value)]);
        self.push_entry(entry)
    }

    /// Last value output for a channel
    pub fn get_value(&self, channel: &str) -> Option<f32> {
        self.last_values.get(channel).copied()
    }

    pub fn values(&self) -> &BTreeMap<String, f32> {
        &self.last_values
    }

    /// Drop every entry and layer
    pub fn clear(&mut self) {
        self.entries.clear();
        self.baseline.clear();
        self.approach.clear();
        self.fixed.clear();
        self.last_values.clear();
        self.owned_last.clear();
    }

    fn baseline_target(&self, channel: &str) -> f32 {
        let base = self.baseline(channel);
        if self.is_speaking() {
            base * self.config.damping.factor(channel)
        } else {
            base
        }
    }

    /// Advance every entry to `now_ms` and resolve the layers
    pub fn tick<R: Rng + ?Sized>(&mut self, now_ms: f64, rng: &mut R) -> SchedulerOutput {
        let mut out = SchedulerOutput::default();

        for transition in self.activate(now_ms) {
            if let Err(err) = self.set_mood(&transition, now_ms, rng) {
                warn!(mood = %transition, %err, "mood transition skipped");
            }
        }

        let (entry_values, owned) = self.evaluate(now_ms, &mut out.commands);
        self.retire(now_ms, rng);

        // Baseline layer for everything no entry owns
        let channels: BTreeSet<String> = self
            .baseline
            .keys()
            .chain(self.last_values.keys())
            .filter(|c| !owned.contains(*c) && !self.fixed.contains_key(*c))
            .cloned()
            .collect();
        for channel in channels {
            let target = self.baseline_target(&channel);
            let last = self.last_values.get(&channel).copied();
            let released = self.owned_last.contains(&channel);
            let state = self.approach.get(&channel).copied();
            let state = match state {
                Some(s) if !released && s.target == target => s,
                _ => {
                    let s = Approach {
                        from: last.unwrap_or(target),
                        target,
                        start_ms: now_ms,
                    };
                    self.approach.insert(channel.clone(), s);
                    s
                }
            };
            let a = alpha(now_ms, state.start_ms, self.config.baseline_approach_ms);
            let value = if a >= 1.0 {
                state.target
            } else {
                state.from + ease(a) * (state.target - state.from)
            };
            out.values.insert(channel, value);
        }

        out.values.extend(entry_values);
        out.values.extend(self.fixed.iter().map(|(k, v)| (k.clone(), *v)));

        for channel in &owned {
            self.approach.remove(channel);
        }
        self.last_values.extend(out.values.iter().map(|(k, v)| (k.clone(), *v)));
        self.owned_last = owned;
        out
    }

    /// Activate due entries; returns requested mood transitions
    fn activate(&mut self, now_ms: f64) -> Vec<String> {
        let mut transitions = Vec::new();
        let last_values = &self.last_values;
        let baseline = &self.baseline;
        let live = |channel: &str| {
            last_values
                .get(channel)
                .or_else(|| baseline.get(channel))
                .copied()
                .unwrap_or(0.0)
        };
        for i in 0..self.entries.len() {
            let (earlier, rest) = self.entries.split_at_mut(i);
            let entry = &mut rest[0];
            if entry.active || entry.start() > now_ms {
                continue;
            }
            entry.activate(&live);
            let channels: Vec<&str> = entry.value_channels().collect();
            for other in earlier.iter_mut().filter(|e| e.active) {
                for channel in &channels {
                    other.channels.remove(*channel);
                }
            }
            if let Some(mood) = entry.options.mood_transition.take() {
                transitions.push(mood);
            }
        }
        transitions
    }

    /// Evaluate active entries; later entries overwrite earlier ones
    fn evaluate(&mut self, now_ms: f64, commands: &mut Vec<AnimCommand>) -> (BTreeMap<String, f32>, BTreeSet<String>) {
        let mut values = BTreeMap::new();
        let mut owned = BTreeSet::new();
        let mut broken = Vec::new();
        let speaking = self.is_speaking();
        let baseline = &self.baseline;
        let damping = &self.config.damping;
        let last_values = &self.last_values;

        for entry in self.entries.iter_mut().filter(|e| e.active) {
            commands.extend(entry.take_due_commands(now_ms));
            for (channel, keyframes) in &entry.channels {
                if keyframes.iter().any(|k| matches!(k, Keyframe::Command(_) | Keyframe::Consumed)) {
                    continue;
                }
                let value_of = |k: &Keyframe| match k {
                    Keyframe::Value(v) => Some(*v),
                    Keyframe::Baseline => {
                        let base = baseline.get(channel).copied().unwrap_or(0.0);
                        Some(if speaking { base * damping.factor(channel) } else { base })
                    }
                    Keyframe::Dynamic(f) => Some(f()),
                    Keyframe::Anchor => last_values.get(channel).copied(),
                    Keyframe::Command(_) | Keyframe::Consumed => None,
                };
                owned.insert(channel.clone());
                match value_animation_seq(&entry.ts, keyframes, now_ms, &value_of) {
                    Some(v) if v.is_finite() => {
                        values.insert(channel.clone(), v);
                    }
                    Some(v) => {
                        warn!(entry = %entry.name, channel = %channel, value = v, "non-finite value, entry dropped");
                        broken.push(entry.id);
                    }
                    None => {}
                }
            }
        }

        if !broken.is_empty() {
            self.entries.retain(|e| !broken.contains(&e.id));
            for channel in values.keys().cloned().collect::<Vec<_>>() {
                if !self.entries.iter().any(|e| e.active && e.channels.contains_key(&channel)) {
                    values.remove(&channel);
                    owned.remove(&channel);
                }
            }
        }
        (values, owned)
    }

    /// Retire finished entries, respawning loops from their template
    fn retire<R: Rng + ?Sized>(&mut self, now_ms: f64, rng: &mut R) {
        let (finished, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| e.active && e.is_finished(now_ms));
        self.entries = running;

        for entry in finished {
            let next = entry.options.loop_mode.next();
            let (Some(loop_mode), Some(template)) = (next, entry.template.clone()) else {
                debug!(entry = %entry.name, "entry retired");
                continue;
            };
            let options = EntryOptions {
                loop_mode,
                ..entry.options.clone()
            };
            let spec = match template.resolve(&self.keys, rng) {
                Ok(spec) => spec,
                Err(err) => {
                    warn!(template = %template.name, %err, "loop respawn failed");
                    continue;
                }
            };
            let mut respawn = self.build(&template.name, spec, options, now_ms, rng);
            respawn.template = Some(template.clone());
            if self.is_speaking() {
                let baseline = |c: &str| self.baseline.get(c).copied().unwrap_or(0.0);
                respawn.damp(&self.config.damping, &baseline);
            }
            debug!(template = %template.name, start = respawn.start(), "loop respawned");
            self.push_entry(respawn);
        }
    }
}
