//! Animation engine - one avatar, one main loop
//!
//! `tick` runs once per render callback:
//! 1. Advance the logical clock (frames under the fps cap are skipped)
//! 2. Apply commands from the inbox
//! 3. Poll speech timers
//! 4. Expire gestures
//! 5. Resolve fixed / entry / baseline layers into channel values
//! 6. Dispatch command channels (pose, gesture, moveto, hands, callbacks)
//! 7. Route numeric channels to delta controls and blendshapes
//! 8. Blend the pose
//! 9. Compose the delta layer
//! 10. Hand the frame to the renderer

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, trace, warn};

use marionette_anim::{
    look_at_spec, AnimCommand, AnimationScheduler, BodyForm, EmojiLibrary, EntryOptions, EntryTag,
    GestureController, GestureRequest, HandSide, View, LOOKAT,
};
use marionette_core::{AnimError, AnimResult, ChannelKey, TemplateKind, Vec3};
use marionette_ik::{IkChain, IkSolution, IkSolver};
use marionette_pose::{is_delta_control, DeltaPoseLayer, PoseBlender, PoseFrame, PoseTemplateLibrary, Skeleton};
use marionette_speech::{
    AudioBuffer, AudioDecoder, AudioOutput, LipsyncTable, NullAudio, PcmDecoder, SimpleLipsync, SpeechEffect,
    SpeechItem, SpeechQueue, TtsPayload, Viseme,
};
use marionette_time::{AnimClock, ClockTick};

use crate::config::EngineConfig;
use crate::gaze::{eye_rotation, split_gaze, GazeSplit};
use crate::host::{AvatarSource, EngineCallbacks, Renderer};
use crate::inbox::{CommandInbox, EngineCommand, InboxSender};

/// Counters for diagnostics
#[derive(Clone, Debug, Default)]
pub struct EngineStats {
    pub ticks: u64,
    pub skipped_frames: u64,
    pub commands_applied: u64,
    pub commands_failed: u64,
    pub anim_commands: u64,
}

/// Bound skeleton plus the blendshapes its meshes accept
#[derive(Debug)]
struct Binding {
    skeleton: Skeleton,
    blendshapes: BTreeSet<String>,
}

/// The avatar engine
pub struct AnimationEngine {
    config: EngineConfig,
    clock: AnimClock,
    rng: StdRng,
    poses: PoseTemplateLibrary,
    binding: Option<Binding>,
    blender: PoseBlender,
    delta: DeltaPoseLayer,
    scheduler: AnimationScheduler,
    gestures: GestureController,
    speech: SpeechQueue,
    inbox: CommandInbox,
    callbacks: EngineCallbacks,
    renderer: Option<Box<dyn Renderer>>,
    camera: Option<Vec3>,
    last_frame: Option<PoseFrame>,
    stats: EngineStats,
}

impl AnimationEngine {
    /// Engine with silent audio, 16-bit PCM decoding and the spelling lip-sync table
    pub fn new(config: EngineConfig) -> AnimResult<Self> {
        Self::with_audio(
            config,
            Box::new(PcmDecoder::default()),
            Box::new(NullAudio),
            Box::new(SimpleLipsync),
        )
    }

    pub fn with_audio(
        config: EngineConfig,
        decoder: Box<dyn AudioDecoder>,
        output: Box<dyn AudioOutput>,
        lipsync: Box<dyn LipsyncTable>,
    ) -> AnimResult<Self> {
        config.validate()?;
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let emojis = EmojiLibrary::builtin();
        Ok(AnimationEngine {
            clock: AnimClock::with_config(config.clock_config()),
            rng,
            poses: PoseTemplateLibrary::builtin(),
            binding: None,
            blender: PoseBlender::new(),
            delta: DeltaPoseLayer::new(),
            scheduler: AnimationScheduler::builtin(config.scheduler_config()),
            gestures: GestureController::new(emojis.clone()),
            speech: SpeechQueue::new(config.speech_config(), decoder, output, lipsync, emojis),
            inbox: CommandInbox::new(),
            callbacks: EngineCallbacks::default(),
            renderer: None,
            camera: None,
            last_frame: None,
            stats: EngineStats::default(),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_renderer(&mut self, renderer: Box<dyn Renderer>) {
        self.renderer = Some(renderer);
    }

    pub fn set_callbacks(&mut self, callbacks: EngineCallbacks) {
        self.callbacks = callbacks;
    }

    /// Producer handle for other threads
    pub fn sender(&self) -> InboxSender {
        self.inbox.sender()
    }

    /// Current logical time (ms)
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn last_frame(&self) -> Option<&PoseFrame> {
        self.last_frame.as_ref()
    }

    pub fn scheduler(&self) -> &AnimationScheduler {
        &self.scheduler
    }

    pub fn blender(&self) -> &PoseBlender {
        &self.blender
    }

    pub fn gestures(&self) -> &GestureController {
        &self.gestures
    }

    pub fn poses(&self) -> &PoseTemplateLibrary {
        &self.poses
    }

    // ---- Binding ----

    /// Resolve the host's joints and start the initial mood and pose
    pub fn bind<S: AvatarSource>(&mut self, source: &S) -> AnimResult<()> {
        let skeleton = Skeleton::bind(source)?;
        self.bind_skeleton(skeleton, source.blendshape_names())
    }

    /// Bind an already-resolved skeleton
    pub fn bind_skeleton(&mut self, skeleton: Skeleton, blendshapes: Vec<String>) -> AnimResult<()> {
        if skeleton.is_empty() {
            return Err(AnimError::NotBound);
        }
        self.reset_state();
        info!(joints = skeleton.len(), blendshapes = blendshapes.len(), "avatar bound");
        self.binding = Some(Binding {
            skeleton,
            blendshapes: blendshapes.into_iter().collect(),
        });

        let pose = self.config.initial_pose.clone();
        let mood = self.config.initial_mood.clone();
        if let Err(err) = self.set_pose(&pose) {
            warn!(pose = %pose, %err, "initial pose skipped");
        }
        if let Err(err) = self.set_mood(&mood) {
            warn!(mood = %mood, %err, "initial mood skipped");
        }
        Ok(())
    }

    /// Tear down all per-avatar state
    pub fn unbind(&mut self) {
        if self.binding.take().is_some() {
            info!("avatar unbound");
        }
        self.reset_state();
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    pub fn skeleton(&self) -> Option<&Skeleton> {
        self.binding.as_ref().map(|b| &b.skeleton)
    }

    fn reset_state(&mut self) {
        let now = self.clock.now();
        self.gestures.stop(0.0, now, &mut self.blender, &mut self.scheduler);
        let effects = self.speech.stop();
        self.apply_speech_effects(effects);
        self.scheduler.clear();
        self.scheduler.set_speaking(false);
        self.blender.clear();
        self.delta.clear();
        self.last_frame = None;
    }

    fn require_bound(&self) -> AnimResult<&Skeleton> {
        self.binding.as_ref().map(|b| &b.skeleton).ok_or(AnimError::NotBound)
    }

    // ---- Main loop ----

    /// Process one render callback (`wall_ms` from the host's clock).
    ///
    /// Returns the frame handed to the renderer, or `None` when the frame was
    /// skipped or no avatar is bound.
    pub fn tick(&mut self, wall_ms: f64) -> Option<&PoseFrame> {
        let now = match self.clock.tick(wall_ms) {
            ClockTick::Advanced { now_ms, .. } => now_ms,
            ClockTick::Skipped => {
                self.stats.skipped_frames += 1;
                return None;
            }
        };
        self.binding.as_ref()?;
        self.stats.ticks += 1;

        for command in self.inbox.drain() {
            let name = command.name();
            match self.apply_command(command) {
                Ok(()) => self.stats.commands_applied += 1,
                Err(err) => {
                    self.stats.commands_failed += 1;
                    warn!(command = name, %err, "engine command failed");
                }
            }
        }

        let effects = self.speech.tick(now);
        self.apply_speech_effects(effects);

        self.gestures.tick(now, &mut self.blender, &mut self.scheduler);

        let output = self.scheduler.tick(now, &mut self.rng);

        for command in output.commands {
            self.stats.anim_commands += 1;
            self.dispatch(command, now);
        }

        let blendshapes = self.route_values(&output.values);

        self.blender.tick(now);

        let binding = self.binding.as_ref()?;
        let mut pose = self.blender.pose().clone();
        self.delta.apply(&mut pose, &binding.skeleton);

        let mut frame = PoseFrame::from_pose(now, pose, &binding.skeleton);
        frame.blendshapes = blendshapes;
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.apply(&frame);
        }
        self.last_frame = Some(frame);
        self.last_frame.as_ref()
    }

    fn apply_command(&mut self, command: EngineCommand) -> AnimResult<()> {
        match command {
            EngineCommand::SetMood(mood) => self.set_mood(&mood),
            EngineCommand::SetPose(pose) => self.set_pose(&pose),
            EngineCommand::SetView(view) => {
                self.set_view(view);
                Ok(())
            }
            EngineCommand::PlayGesture(request) => self.play_gesture(&request),
            EngineCommand::StopGesture(transition_ms) => {
                self.stop_gesture(transition_ms);
                Ok(())
            }
            EngineCommand::Speak(item) => {
                self.speak(item);
                Ok(())
            }
            EngineCommand::PauseSpeaking => {
                self.pause_speaking();
                Ok(())
            }
            EngineCommand::StopSpeaking => {
                self.stop_speaking();
                Ok(())
            }
            EngineCommand::AudioEnded => {
                self.audio_ended();
                Ok(())
            }
            EngineCommand::LookAt { point, duration_ms } => self.look_at(point, duration_ms),
            EngineCommand::LookAtCamera(ms) => self.look_at_camera(ms),
            EngineCommand::LookAhead(ms) => {
                self.look_ahead(ms);
                Ok(())
            }
            EngineCommand::SetFixedValue { channel, value } => {
                self.set_fixed_value(&channel, value);
                Ok(())
            }
        }
    }

    /// Side effects of command channels. Failures are logged, never propagated.
    fn dispatch(&mut self, command: AnimCommand, now: f64) {
        trace!(?command, "anim command");
        let result = match command {
            AnimCommand::Pose(name) => self.set_pose(&name),
            AnimCommand::Gesture {
                name,
                duration_s,
                mirror,
                transition_ms,
            } => {
                let mut request = GestureRequest::new(name)
                    .mirrored(mirror)
                    .transition(transition_ms.unwrap_or(self.config.gesture_transition_ms));
                request.duration_s = duration_s;
                self.play_gesture(&request)
            }
            AnimCommand::MoveTo { props, duration_ms } => {
                self.blender.set_target(&props, now, duration_ms);
                Ok(())
            }
            AnimCommand::Hand {
                side,
                target,
                duration_ms,
            } => self.hand(side, target, duration_ms),
            AnimCommand::Subtitles(text) => {
                self.callbacks.subtitles(&text);
                Ok(())
            }
            AnimCommand::Speak(text) => {
                self.callbacks.speak(&text);
                Ok(())
            }
            AnimCommand::Function(f) => {
                f();
                Ok(())
            }
        };
        if let Err(err) = result {
            warn!(%err, "anim command dropped");
        }
    }

    /// Delta controls go to the delta layer, everything else is a blendshape
    fn route_values(&mut self, values: &BTreeMap<String, f32>) -> BTreeMap<String, f32> {
        self.delta.clear();
        let accepted = self.binding.as_ref().map(|b| &b.blendshapes);
        let mut blendshapes = BTreeMap::new();
        for (channel, &value) in values {
            if is_delta_control(channel) {
                self.delta.set_control(channel, value);
            } else if accepted.map_or(true, |names| names.is_empty() || names.contains(channel)) {
                blendshapes.insert(channel.clone(), value);
            } else {
                trace!(channel = %channel, "no blendshape for channel");
            }
        }
        if let Some((x, y)) = eye_rotation(values) {
            let current = (self.delta.control("eyesRotateX"), self.delta.control("eyesRotateY"));
            self.delta.set_control("eyesRotateX", current.0 + x);
            self.delta.set_control("eyesRotateY", current.1 + y);
        }
        blendshapes
    }

    fn apply_speech_effects(&mut self, effects: Vec<SpeechEffect>) {
        for effect in effects {
            match effect {
                SpeechEffect::SpeakingChanged(speaking) => {
                    self.scheduler.set_speaking(speaking);
                    self.callbacks.speaking_changed(speaking);
                }
                SpeechEffect::PushEntries(entries) => {
                    for entry in entries {
                        self.scheduler.push_entry(entry);
                    }
                }
                SpeechEffect::ClearSpeechEntries => {
                    let removed = self.scheduler.remove_tagged(EntryTag::Speech);
                    debug!(removed, "speech entries cleared");
                }
                SpeechEffect::PlayEmoji(name) => {
                    let mut request = GestureRequest::new(name).transition(self.config.gesture_transition_ms);
                    if let Some(emoji) = self.gestures.emojis().get(&request.name) {
                        request = request.for_secs((emoji.duration_ms() / 1000.0) as f32);
                    }
                    if let Err(err) = self.play_gesture(&request) {
                        warn!(emoji = %request.name, %err, "emoji skipped");
                    }
                }
                SpeechEffect::LookAtCamera(ms) => {
                    if let Err(err) = self.look_at_camera(ms) {
                        warn!(%err, "look at camera skipped");
                    }
                }
                SpeechEffect::SetMood(mood) => {
                    if let Err(err) = self.set_mood(&mood) {
                        warn!(mood = %mood, %err, "speech mood skipped");
                    }
                }
                SpeechEffect::CallMarker(f) => f(),
            }
        }
    }

    // ---- Mood, pose, view ----

    /// Switch mood; an unknown name is rejected and nothing changes
    pub fn set_mood(&mut self, name: &str) -> AnimResult<()> {
        self.require_bound()?;
        let pose = self.scheduler.moods().get(name)?.pose.clone();
        let now = self.clock.now();
        self.scheduler.set_mood(name, now, &mut self.rng)?;
        if let Some(pose) = pose {
            if let Err(err) = self.set_pose(&pose) {
                warn!(mood = name, pose = %pose, %err, "mood pose skipped");
            }
        }
        Ok(())
    }

    pub fn mood(&self) -> &str {
        self.scheduler.mood()
    }

    pub fn mood_names(&self) -> Vec<&str> {
        self.scheduler.moods().names()
    }

    /// Transition to a pose template, through the intermediate pose when needed
    pub fn set_pose(&mut self, name: &str) -> AnimResult<()> {
        self.require_bound()?;
        let now = self.clock.now();
        self.blender.set_pose_from_template(
            &self.poses,
            name,
            now,
            self.config.pose_transition_ms,
            self.config.intermediate_pose_ms,
            &mut self.rng,
        )?;
        self.scheduler.set_pose_key(name);
        Ok(())
    }

    pub fn pose_names(&self) -> Vec<&str> {
        self.poses.pose_names()
    }

    pub fn set_view(&mut self, view: View) {
        info!(view = view.as_str(), "view changed");
        self.scheduler.set_view(view);
    }

    pub fn set_body(&mut self, body: BodyForm) {
        self.scheduler.set_body(body);
    }

    // ---- Gestures and IK ----

    pub fn play_gesture(&mut self, request: &GestureRequest) -> AnimResult<()> {
        self.require_bound()?;
        let now = self.clock.now();
        self.gestures.play(
            request,
            now,
            &self.poses,
            &mut self.blender,
            &mut self.scheduler,
            &mut self.rng,
        )
    }

    /// Release the hands (`None` uses the configured transition)
    pub fn stop_gesture(&mut self, transition_ms: Option<f64>) {
        let now = self.clock.now();
        let ms = transition_ms.unwrap_or(self.config.gesture_transition_ms);
        self.gestures.stop(ms, now, &mut self.blender, &mut self.scheduler);
    }

    /// Solve an arm toward a world-space point.
    ///
    /// With a duration the result becomes the arm's target; without one it
    /// is only returned.
    pub fn reach(&mut self, side: HandSide, target: Vec3, duration_ms: Option<f64>) -> AnimResult<IkSolution> {
        let chain = arm_chain(side);
        let skeleton = self.require_bound()?;
        let solution = IkSolver::solve(skeleton, self.blender.pose(), &chain, target, self.config.ik_iterations)?;
        if let Some(ms) = duration_ms {
            let now = self.clock.now();
            self.blender.set_target(&solution.rotations, now, ms);
        }
        Ok(solution)
    }

    /// Hand command: `target` is relative to the arm's root joint; `None` releases the arm
    fn hand(&mut self, side: HandSide, target: Option<Vec3>, duration_ms: Option<f64>) -> AnimResult<()> {
        let chain = arm_chain(side);
        if chain
            .links
            .iter()
            .any(|link| self.blender.is_locked(&ChannelKey::rotation(link.joint.as_str())))
        {
            debug!(?side, gesture = ?self.gestures.active(), "hand held by gesture");
            return Ok(());
        }

        let now = self.clock.now();
        match target {
            Some(offset) => {
                let skeleton = self.require_bound()?;
                let root = skeleton
                    .world_of(&chain.root, self.blender.pose())
                    .ok_or_else(|| AnimError::MissingChannel(chain.root.clone()))?;
                self.reach(side, root.position + offset, duration_ms)?;
            }
            None => {
                let ms = duration_ms.unwrap_or(self.config.gesture_transition_ms);
                for link in &chain.links {
                    let key = ChannelKey::rotation(link.joint.as_str());
                    if let Some(value) = self.blender.template_value(&key).cloned() {
                        self.blender.set_channel_target(key, value, now, ms);
                    }
                }
            }
        }
        Ok(())
    }

    // ---- Speech ----

    /// Queue any speech item
    pub fn speak(&mut self, item: SpeechItem) {
        let now = self.clock.now();
        let effects = self.speech.push(item, now);
        self.apply_speech_effects(effects);
    }

    pub fn speak_text(&mut self, text: &str, tts: TtsPayload) {
        self.speak(SpeechItem::text(text, tts));
    }

    /// Text with a raw TTS response; a malformed response is rejected
    pub fn speak_text_json(&mut self, text: &str, tts_json: &str) -> AnimResult<()> {
        let tts = TtsPayload::from_json(tts_json)?;
        self.speak_text(text, tts);
        Ok(())
    }

    pub fn speak_audio(&mut self, audio: AudioBuffer, visemes: Vec<Viseme>) {
        self.speak(SpeechItem::audio(audio, visemes));
    }

    pub fn speak_emoji(&mut self, name: &str) -> AnimResult<()> {
        if self.gestures.emojis().get(name).is_none() {
            return Err(AnimError::unknown(TemplateKind::Emoji, name));
        }
        self.speak(SpeechItem::Emoji(name.to_string()));
        Ok(())
    }

    pub fn speak_break(&mut self, ms: f64) {
        self.speak(SpeechItem::Break(ms));
    }

    pub fn speak_marker(&mut self, f: impl Fn() + Send + Sync + 'static) {
        self.speak(SpeechItem::Marker(Arc::new(f)));
    }

    pub fn pause_speaking(&mut self) {
        let effects = self.speech.pause();
        self.apply_speech_effects(effects);
    }

    pub fn stop_speaking(&mut self) {
        let effects = self.speech.stop();
        self.apply_speech_effects(effects);
    }

    /// Host notification that the playing buffer ended
    pub fn audio_ended(&mut self) {
        let now = self.clock.now();
        let effects = self.speech.audio_ended(now);
        self.apply_speech_effects(effects);
    }

    pub fn is_speaking(&self) -> bool {
        self.speech.is_speaking()
    }

    pub fn speech_state(&self) -> &'static str {
        self.speech.state_name()
    }

    pub fn set_slowdown_rate(&mut self, rate: f64) {
        self.clock.set_slowdown_rate(rate);
        self.speech.set_slowdown_rate(self.clock.slowdown_rate());
    }

    pub fn set_max_fps(&mut self, fps: Option<f32>) {
        self.clock.set_max_fps(fps);
    }

    // ---- Gaze ----

    pub fn set_camera(&mut self, position: Option<Vec3>) {
        self.camera = position;
    }

    /// Turn head and eyes toward a world-space point for `duration_ms`
    pub fn look_at(&mut self, point: Vec3, duration_ms: f64) -> AnimResult<()> {
        let skeleton = self.require_bound()?;
        let head = skeleton
            .world_of("Head", self.blender.pose())
            .ok_or_else(|| AnimError::MissingChannel("Head".into()))?;
        let split = split_gaze(head.position, point, self.config.head_gaze_share);
        self.push_gaze(split, duration_ms);
        Ok(())
    }

    pub fn look_at_camera(&mut self, duration_ms: f64) -> AnimResult<()> {
        match self.camera {
            Some(camera) => self.look_at(camera, duration_ms),
            None => {
                self.look_ahead(duration_ms);
                Ok(())
            }
        }
    }

    pub fn look_ahead(&mut self, duration_ms: f64) {
        self.push_gaze(GazeSplit::AHEAD, duration_ms);
    }

    fn push_gaze(&mut self, split: GazeSplit, duration_ms: f64) {
        let now = self.clock.now();
        debug!(head = ?split.head, eyes = ?split.eyes, duration_ms, "gaze");
        self.scheduler.remove_named(LOOKAT);
        let spec = look_at_spec(split.head, split.eyes, duration_ms as f32);
        self.scheduler
            .push_spec(LOOKAT, &spec, EntryOptions::default(), now, &mut self.rng);
    }

    // ---- Manual control ----

    /// Pin a channel (`None` releases it)
    pub fn set_fixed_value(&mut self, channel: &str, value: Option<f32>) {
        self.scheduler.set_fixed(channel, value);
    }

    /// Ease a channel to `value` over `duration_ms`
    pub fn set_value(&mut self, channel: &str, value: f32, duration_ms: f64) {
        let now = self.clock.now();
        self.scheduler.set_value(channel, value, duration_ms, now);
    }

    /// Last value output for a channel
    pub fn get_value(&self, channel: &str) -> Option<f32> {
        self.scheduler.get_value(channel)
    }

    pub fn set_baseline_value(&mut self, channel: &str, value: Option<f32>) {
        self.scheduler.set_baseline(channel, value);
    }
}

impl std::fmt::Debug for AnimationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationEngine")
            .field("now", &self.clock.now())
            .field("bound", &self.is_bound())
            .field("mood", &self.scheduler.mood())
            .field("pose", &self.blender.current_template())
            .field("gesture", &self.gestures.active())
            .field("speech", &self.speech)
            .finish()
    }
}

fn arm_chain(side: HandSide) -> IkChain {
    match side {
        HandSide::Left => IkChain::left_arm(),
        HandSide::Right => IkChain::right_arm(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marionette_anim::Keyframe;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn engine() -> AnimationEngine {
        let mut engine = AnimationEngine::new(EngineConfig::debug()).unwrap();
        engine.bind_skeleton(Skeleton::humanoid(), Vec::new()).unwrap();
        engine
    }

    /// Tick at 60 fps from `from` through `to` (wall ms)
    fn run(engine: &mut AnimationEngine, from: f64, to: f64) {
        let mut t = from;
        while t <= to {
            engine.tick(t);
            t += 1000.0 / 60.0;
        }
    }

    #[test]
    fn test_unbound_engine() {
        let mut engine = AnimationEngine::new(EngineConfig::debug()).unwrap();
        assert!(engine.tick(0.0).is_none());
        assert!(matches!(engine.set_mood("happy"), Err(AnimError::NotBound)));
        assert!(matches!(engine.set_pose("side"), Err(AnimError::NotBound)));
        assert!(matches!(
            engine.look_at(Vec3::new(0.0, 1.6, 1.0), 500.0),
            Err(AnimError::NotBound)
        ));
    }

    #[test]
    fn test_bind_produces_frames() {
        let mut engine = engine();
        assert_eq!(engine.mood(), "neutral");
        assert_eq!(engine.blender().current_template(), Some("straight"));
        let frame = engine.tick(0.0).unwrap();
        assert!(frame.joint(&ChannelKey::position("Hips")).is_some());

        run(&mut engine, 16.0, 3000.0);
        let frame = engine.last_frame().unwrap();
        assert!(frame.time_ms > 2900.0);
        assert!(frame.joints.values().all(|v| match v.as_rotation() {
            Some(q) => (q.length() - 1.0).abs() < 1e-4,
            None => true,
        }));
        // Idle loops are running
        assert!(engine.scheduler().entries().iter().any(|e| e.name == "blink"));
    }

    #[test]
    fn test_unknown_mood_keeps_state() {
        let mut engine = engine();
        engine.set_mood("happy").unwrap();
        let err = engine.set_mood("bored").unwrap_err();
        assert!(matches!(err, AnimError::UnknownTemplate { kind: TemplateKind::Mood, .. }));
        assert_eq!(engine.mood(), "happy");
    }

    #[test]
    fn test_mood_with_pose() {
        let mut engine = engine();
        engine.set_mood("angry").unwrap();
        assert_eq!(engine.blender().current_template(), Some("wide"));
        run(&mut engine, 0.0, 1500.0);
        assert!(engine.get_value("browDownLeft").unwrap() > 0.0);
    }

    #[test]
    fn test_bend_goes_through_oneknee() {
        let mut engine = engine();
        engine.tick(0.0);
        engine.set_pose("bend").unwrap();
        assert_eq!(engine.blender().current_template(), Some("oneknee"));
        run(&mut engine, 16.0, 900.0);
        assert_eq!(engine.blender().current_template(), Some("oneknee"));
        run(&mut engine, 1000.0, 1100.0);
        assert_eq!(engine.blender().current_template(), Some("bend"));
    }

    #[test]
    fn test_inbox_commands_apply_at_tick() {
        let mut engine = engine();
        engine.tick(0.0);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let tx = engine.sender();
        let handle = std::thread::spawn(move || {
            tx.send(EngineCommand::Speak(SpeechItem::Break(500.0)));
            tx.send(EngineCommand::Speak(SpeechItem::Marker(Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))));
            tx.send(EngineCommand::SetMood("nope".into()));
        });
        handle.join().unwrap();
        assert!(!engine.is_speaking());

        engine.tick(16.0);
        assert!(engine.is_speaking());
        assert_eq!(engine.stats().commands_failed, 1);

        run(&mut engine, 32.0, 500.0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        run(&mut engine, 520.0, 600.0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!engine.is_speaking());
        assert_eq!(engine.speech_state(), "idle");
    }

    #[test]
    fn test_speech_callbacks_and_visemes() {
        let mut engine = engine();
        let speaking = Arc::new(Mutex::new(Vec::new()));
        let log = speaking.clone();
        engine.set_callbacks(EngineCallbacks::new().on_speaking_changed(move |s| log.lock().unwrap().push(s)));
        engine.tick(0.0);

        engine.speak_audio(
            AudioBuffer::with_duration(22050, 1200.0),
            vec![Viseme::new("aa", 0.0, 300.0), Viseme::new("PP", 300.0, 200.0)],
        );
        assert!(engine.is_speaking());
        let visemes = engine
            .scheduler()
            .entries()
            .iter()
            .filter(|e| e.options.tag == EntryTag::Speech)
            .count();
        assert_eq!(visemes, 2);

        run(&mut engine, 16.0, 200.0);
        assert!(engine.last_frame().unwrap().blendshape("viseme_aa").unwrap() > 0.0);

        engine.stop_speaking();
        assert!(!engine.is_speaking());
        assert!(engine
            .scheduler()
            .entries()
            .iter()
            .all(|e| e.options.tag != EntryTag::Speech));
        assert_eq!(*speaking.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn test_unknown_emoji_rejected() {
        let mut engine = engine();
        assert!(matches!(
            engine.speak_emoji("🦄"),
            Err(AnimError::UnknownTemplate { kind: TemplateKind::Emoji, .. })
        ));
        assert!(!engine.is_speaking());
        engine.speak_emoji("👍").unwrap();
        assert_eq!(engine.gestures().active(), Some("thumbup"));
    }

    #[test]
    fn test_look_at_left() {
        let mut engine = engine();
        engine.tick(0.0);
        engine.look_at(Vec3::new(2.0, 1.6, 2.0), 1000.0).unwrap();
        let entry = engine
            .scheduler()
            .entries()
            .iter()
            .find(|e| e.name == LOOKAT)
            .unwrap();
        let yaw = match entry.channels["headRotateY"][1] {
            Keyframe::Value(v) => v,
            _ => panic!("expected a value"),
        };
        assert!(yaw > 0.3);
        assert!(entry.channels.contains_key("eyeLookOutLeft"));

        // A second gaze replaces the first
        engine.look_ahead(500.0);
        assert_eq!(engine.scheduler().entries().iter().filter(|e| e.name == LOOKAT).count(), 1);
    }

    #[test]
    fn test_reach_preview_leaves_pose() {
        let mut engine = engine();
        engine.tick(0.0);
        let key = ChannelKey::rotation("LeftArm");
        let before = engine.blender().target_value(&key).cloned();
        let target = Vec3::new(0.3, 1.3, 0.35);
        let start = engine
            .skeleton()
            .and_then(|s| s.world_of("LeftHandMiddle1", engine.blender().pose()))
            .unwrap()
            .position;
        let solution = engine.reach(HandSide::Left, target, None).unwrap();
        assert!(solution.error < start.distance(target));
        assert_eq!(
            engine.blender().target_value(&key).map(|v| format!("{v:?}")),
            before.map(|v| format!("{v:?}"))
        );

        engine.reach(HandSide::Left, target, Some(500.0)).unwrap();
        let after = engine.blender().target_value(&key).unwrap();
        assert!(solution.rotations[&key].approx_eq(after, 1e-6));
    }

    #[test]
    fn test_fixed_value_wins() {
        let mut engine = engine();
        engine.set_fixed_value("mouthSmileLeft", Some(0.7));
        run(&mut engine, 0.0, 100.0);
        assert_eq!(engine.get_value("mouthSmileLeft"), Some(0.7));
        assert_eq!(engine.last_frame().unwrap().blendshape("mouthSmileLeft"), Some(0.7));
    }

    #[test]
    fn test_unbind_clears_state() {
        let mut engine = engine();
        engine.speak_break(1000.0);
        engine.unbind();
        assert!(!engine.is_bound());
        assert!(!engine.is_speaking());
        assert!(engine.scheduler().entries().is_empty());
        assert!(engine.tick(100.0).is_none());
    }

    #[test]
    fn test_unbind_mid_speech_reports_silence() {
        let mut engine = engine();
        let speaking = Arc::new(Mutex::new(Vec::new()));
        let log = speaking.clone();
        engine.set_callbacks(EngineCallbacks::new().on_speaking_changed(move |s| log.lock().unwrap().push(s)));
        engine.tick(0.0);

        engine.speak_audio(AudioBuffer::with_duration(22050, 1000.0), vec![Viseme::new("O", 0.0, 300.0)]);
        run(&mut engine, 16.0, 100.0);
        engine.unbind();
        assert_eq!(*speaking.lock().unwrap(), vec![true, false]);

        // Rebinding an idle engine reports nothing new
        engine.bind_skeleton(Skeleton::humanoid(), Vec::new()).unwrap();
        assert_eq!(*speaking.lock().unwrap(), vec![true, false]);
    }
}
