//! Speech queue state machine
//!
//! ```text
//!   Idle --advance--> Waiting (break / emoji timer)
//!                 \-> Playing (audio started, waiting for `ended`)
//!                 \-> Resuming (output suspended, bounded retry)
//!   Waiting/Playing --timer or ended--> advance
//! ```
//!
//! Items complete strictly in push order. Side effects the queue cannot
//! perform itself (queueing entries, markers, mood changes) are returned
//! to the caller as `SpeechEffect`s.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use marionette_anim::{AnimationEntry, CommandFn, EmojiLibrary};
use marionette_core::{AnimError, AnimResult};
use marionette_time::Deadline;

use crate::audio::{AudioBuffer, AudioDecoder, AudioOutput};
use crate::item::{split_words, SpeechItem, TtsPayload, WordTimings};
use crate::lipsync::LipsyncTable;
use crate::viseme::{subtitle_entry, viseme_entries, visemes_from_words, Viseme};

/// Speech configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Fixed latency added when rebasing timelines onto the clock
    pub audio_latency_ms: f64,
    /// Wait for a suspended output before retrying the resume
    pub audio_resume_timeout_ms: f64,
    /// Grace period after a buffer's end before its `ended` event is assumed
    pub ended_grace_ms: f64,
    /// Language passed to the lip-sync table
    pub lipsync_lang: String,
    /// Logical slowdown; audio plays at `1 / slowdown_rate`
    pub slowdown_rate: f64,
    /// Gaze hold when an emoji is played
    pub emoji_look_ms: f64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            audio_latency_ms: 0.0,
            audio_resume_timeout_ms: 1000.0,
            ended_grace_ms: 500.0,
            lipsync_lang: "en".into(),
            slowdown_rate: 1.0,
            emoji_look_ms: 500.0,
        }
    }
}

/// Work the engine performs on the queue's behalf
#[derive(Clone)]
pub enum SpeechEffect {
    SpeakingChanged(bool),
    /// Timelines already rebased onto the animation clock
    PushEntries(Vec<AnimationEntry>),
    /// Drop pending viseme and subtitle entries
    ClearSpeechEntries,
    PlayEmoji(String),
    LookAtCamera(f64),
    SetMood(String),
    CallMarker(CommandFn),
}

impl fmt::Debug for SpeechEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeechEffect::SpeakingChanged(b) => write!(f, "SpeakingChanged({b})"),
            SpeechEffect::PushEntries(e) => write!(f, "PushEntries({})", e.len()),
            SpeechEffect::ClearSpeechEntries => f.write_str("ClearSpeechEntries"),
            SpeechEffect::PlayEmoji(name) => write!(f, "PlayEmoji({name})"),
            SpeechEffect::LookAtCamera(ms) => write!(f, "LookAtCamera({ms})"),
            SpeechEffect::SetMood(mood) => write!(f, "SetMood({mood})"),
            SpeechEffect::CallMarker(_) => f.write_str("CallMarker(..)"),
        }
    }
}

/// Audio waiting to be played with its relative timelines
#[derive(Debug, Clone)]
struct PlaylistItem {
    audio: AudioBuffer,
    entries: Vec<AnimationEntry>,
    mood: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum QueueState {
    Idle,
    /// Break or emoji running until the timer fires
    Waiting,
    /// Audio started at `started_ms`, lasting `duration_ms`
    Playing { started_ms: f64, duration_ms: f64 },
    /// Output suspended; resume requested
    Resuming,
}

/// FIFO speech queue
pub struct SpeechQueue {
    config: SpeechConfig,
    queue: VecDeque<SpeechItem>,
    playlist: VecDeque<PlaylistItem>,
    state: QueueState,
    timer: Deadline,
    speaking: bool,
    decoder: Box<dyn AudioDecoder>,
    output: Box<dyn AudioOutput>,
    lipsync: Box<dyn LipsyncTable>,
    emojis: EmojiLibrary,
}

impl fmt::Debug for SpeechQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechQueue")
            .field("queued", &self.queue.len())
            .field("playlist", &self.playlist.len())
            .field("state", &self.state)
            .field("speaking", &self.speaking)
            .finish()
    }
}

impl SpeechQueue {
    pub fn new(
        config: SpeechConfig,
        decoder: Box<dyn AudioDecoder>,
        output: Box<dyn AudioOutput>,
        lipsync: Box<dyn LipsyncTable>,
        emojis: EmojiLibrary,
    ) -> Self {
        Self {
            config,
            queue: VecDeque::new(),
            playlist: VecDeque::new(),
            state: QueueState::Idle,
            timer: Deadline::new(),
            speaking: false,
            decoder,
            output,
            lipsync,
            emojis,
        }
    }

    pub fn config(&self) -> &SpeechConfig {
        &self.config
    }

    pub fn set_slowdown_rate(&mut self, rate: f64) {
        self.config.slowdown_rate = rate;
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    pub fn state_name(&self) -> &'static str {
        if self.speaking {
            "speaking"
        } else {
            "idle"
        }
    }

    /// Items not yet started
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_idle(&self) -> bool {
        self.state == QueueState::Idle
    }

    /// Queue an item; starts processing if nothing is running
    pub fn push(&mut self, item: SpeechItem, now_ms: f64) -> Vec<SpeechEffect> {
        debug!(kind = item.kind(), queued = self.queue.len(), "speech item queued");
        self.queue.push_back(item);
        self.advance(now_ms, false)
    }

    /// Start the next item.
    ///
    /// Without `force` nothing happens while an item is still running.
    pub fn advance(&mut self, now_ms: f64, force: bool) -> Vec<SpeechEffect> {
        let mut effects = Vec::new();
        if !force && self.state != QueueState::Idle {
            return effects;
        }
        self.timer.cancel();
        self.state = QueueState::Idle;

        while let Some(item) = self.queue.pop_front() {
            self.set_speaking(true, &mut effects);
            match item {
                SpeechItem::Marker(f) => {
                    effects.push(SpeechEffect::CallMarker(f));
                }
                SpeechItem::Break(ms) => {
                    self.timer.arm_after(now_ms, ms.max(0.0));
                    self.state = QueueState::Waiting;
                    return effects;
                }
                SpeechItem::Emoji(name) => {
                    let Some(emoji) = self.emojis.get(&name) else {
                        warn!(emoji = %name, "unknown emoji skipped");
                        continue;
                    };
                    let duration = emoji.duration_ms();
                    effects.push(SpeechEffect::LookAtCamera(self.config.emoji_look_ms));
                    effects.push(SpeechEffect::PlayEmoji(name));
                    self.timer.arm_after(now_ms, duration);
                    self.state = QueueState::Waiting;
                    return effects;
                }
                SpeechItem::Audio {
                    audio,
                    visemes,
                    words,
                    mood,
                } => {
                    let entries = self.timelines(&audio, visemes, words.as_ref());
                    self.playlist.push_back(PlaylistItem { audio, entries, mood });
                    self.play_audio(now_ms, &mut effects);
                    return effects;
                }
                SpeechItem::Text { text, tts, mood, lang } => match self.decode_text(&text, tts.as_ref(), lang) {
                    Ok(item) => {
                        self.playlist.push_back(PlaylistItem { mood, ..item });
                        self.play_audio(now_ms, &mut effects);
                        return effects;
                    }
                    Err(err) => {
                        warn!(%err, text = %text, "speech text skipped");
                    }
                },
            }
        }

        // Queue drained
        if self.playlist.is_empty() {
            self.set_speaking(false, &mut effects);
        }
        effects
    }

    /// Poll timers; call once per tick
    pub fn tick(&mut self, now_ms: f64) -> Vec<SpeechEffect> {
        match self.state {
            QueueState::Idle => Vec::new(),
            QueueState::Waiting => {
                if self.timer.poll(now_ms) {
                    self.advance(now_ms, true)
                } else {
                    Vec::new()
                }
            }
            QueueState::Playing {
                started_ms,
                duration_ms,
            } => {
                if now_ms >= started_ms + duration_ms + self.config.ended_grace_ms {
                    warn!(started_ms, duration_ms, "audio ended event missing, continuing");
                    self.audio_ended(now_ms)
                } else {
                    Vec::new()
                }
            }
            QueueState::Resuming => {
                let mut effects = Vec::new();
                if !self.output.is_suspended() {
                    info!("audio output resumed");
                    self.play_audio(now_ms, &mut effects);
                } else if self.timer.poll(now_ms) {
                    warn!(
                        timeout_ms = self.config.audio_resume_timeout_ms,
                        "audio resume timed out, retrying"
                    );
                    self.output.request_resume();
                    self.timer.arm_after(now_ms, self.config.audio_resume_timeout_ms);
                }
                effects
            }
        }
    }

    /// Host notification: the current buffer finished
    pub fn audio_ended(&mut self, now_ms: f64) -> Vec<SpeechEffect> {
        if !matches!(self.state, QueueState::Playing { .. }) {
            return Vec::new();
        }
        debug!("audio ended");
        let mut effects = Vec::new();
        if self.playlist.is_empty() {
            effects.extend(self.advance(now_ms, true));
        } else {
            self.play_audio(now_ms, &mut effects);
        }
        effects
    }

    /// Stop audio and drop the playlist; queued items stay
    pub fn pause(&mut self) -> Vec<SpeechEffect> {
        let mut effects = Vec::new();
        // An idle output has nothing to stop
        if self.state != QueueState::Idle || !self.playlist.is_empty() {
            self.output.stop();
        }
        self.playlist.clear();
        self.timer.cancel();
        self.state = QueueState::Idle;
        effects.push(SpeechEffect::ClearSpeechEntries);
        self.set_speaking(false, &mut effects);
        info!(queued = self.queue.len(), "speech paused");
        effects
    }

    /// Pause and forget every queued item
    pub fn stop(&mut self) -> Vec<SpeechEffect> {
        self.queue.clear();
        let effects = self.pause();
        info!("speech stopped");
        effects
    }

    fn set_speaking(&mut self, speaking: bool, effects: &mut Vec<SpeechEffect>) {
        if self.speaking != speaking {
            self.speaking = speaking;
            effects.push(SpeechEffect::SpeakingChanged(speaking));
        }
    }

    /// Start the next playlist item, or advance the queue when it is empty
    fn play_audio(&mut self, now_ms: f64, effects: &mut Vec<SpeechEffect>) {
        if self.output.is_suspended() {
            if self.state != QueueState::Resuming {
                info!("audio output suspended, requesting resume");
                self.output.request_resume();
                self.timer.arm_after(now_ms, self.config.audio_resume_timeout_ms);
                self.state = QueueState::Resuming;
            }
            return;
        }
        self.timer.cancel();

        let Some(mut item) = self.playlist.pop_front() else {
            effects.extend(self.advance(now_ms, true));
            return;
        };

        let offset = now_ms + self.output.output_latency_ms() + self.config.audio_latency_ms;
        for entry in &mut item.entries {
            entry.shift(offset);
        }
        if let Some(mood) = item.mood.take() {
            effects.push(SpeechEffect::SetMood(mood));
        }

        let rate = 1.0 / self.config.slowdown_rate.max(0.1);
        if let Err(err) = self.output.play(&item.audio, rate) {
            warn!(%err, "audio playback failed, item skipped");
            effects.extend(self.advance(now_ms, true));
            return;
        }
        info!(duration_ms = item.audio.duration_ms, entries = item.entries.len(), offset, "audio started");
        effects.push(SpeechEffect::PushEntries(item.entries));
        self.state = QueueState::Playing {
            started_ms: now_ms,
            duration_ms: item.audio.duration_ms,
        };
    }

    /// Relative viseme and subtitle entries for a buffer
    fn timelines(&self, audio: &AudioBuffer, visemes: Vec<Viseme>, words: Option<&WordTimings>) -> Vec<AnimationEntry> {
        let visemes = match words {
            Some(words) if visemes.is_empty() => {
                visemes_from_words(words, self.lipsync.as_ref(), &self.config.lipsync_lang)
            }
            _ => visemes,
        };
        let mut entries = viseme_entries(&visemes, audio.duration_ms);
        entries.extend(words.and_then(subtitle_entry));
        entries
    }

    fn decode_text(
        &self,
        text: &str,
        tts: Option<&TtsPayload>,
        lang: Option<String>,
    ) -> AnimResult<PlaylistItem> {
        let tts = tts.ok_or_else(|| AnimError::InvalidPayload("text without audio".into()))?;
        let audio = self.decoder.decode(&tts.audio_bytes()?)?;
        let words = WordTimings::from_marks(&split_words(text), tts, audio.duration_ms);
        let lang = lang.unwrap_or_else(|| self.config.lipsync_lang.clone());
        let visemes = visemes_from_words(&words, self.lipsync.as_ref(), &lang);
        let mut entries = viseme_entries(&visemes, audio.duration_ms);
        entries.extend(subtitle_entry(&words));
        Ok(PlaylistItem {
            audio,
            entries,
            mood: None,
        })
    }
}
