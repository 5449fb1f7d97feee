//! Thread-safe command hand-off
//!
//! All engine state is mutated by the thread that calls `tick`. Other
//! threads send `EngineCommand`s through an `InboxSender`; the engine drains
//! the inbox at the start of each tick.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use marionette_anim::{GestureRequest, View};
use marionette_core::Vec3;
use marionette_speech::SpeechItem;

/// Request applied at the next tick boundary
#[derive(Debug, Clone)]
pub enum EngineCommand {
    SetMood(String),
    SetPose(String),
    SetView(View),
    PlayGesture(GestureRequest),
    /// Transition (ms); `None` uses the configured default
    StopGesture(Option<f64>),
    Speak(SpeechItem),
    PauseSpeaking,
    StopSpeaking,
    /// Host audio finished the current buffer
    AudioEnded,
    LookAt { point: Vec3, duration_ms: f64 },
    LookAtCamera(f64),
    LookAhead(f64),
    SetFixedValue { channel: String, value: Option<f32> },
}

impl EngineCommand {
    pub fn name(&self) -> &'static str {
        match self {
            EngineCommand::SetMood(_) => "set_mood",
            EngineCommand::SetPose(_) => "set_pose",
            EngineCommand::SetView(_) => "set_view",
            EngineCommand::PlayGesture(_) => "play_gesture",
            EngineCommand::StopGesture(_) => "stop_gesture",
            EngineCommand::Speak(_) => "speak",
            EngineCommand::PauseSpeaking => "pause_speaking",
            EngineCommand::StopSpeaking => "stop_speaking",
            EngineCommand::AudioEnded => "audio_ended",
            EngineCommand::LookAt { .. } => "look_at",
            EngineCommand::LookAtCamera(_) => "look_at_camera",
            EngineCommand::LookAhead(_) => "look_ahead",
            EngineCommand::SetFixedValue { .. } => "set_fixed_value",
        }
    }
}

type Queue = Arc<Mutex<VecDeque<EngineCommand>>>;

/// Engine side of the hand-off
#[derive(Debug)]
pub struct CommandInbox {
    queue: Queue,
    capacity: usize,
}

impl CommandInbox {
    pub const DEFAULT_CAPACITY: usize = 1024;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            capacity,
        }
    }

    /// A producer handle; clone it freely across threads
    pub fn sender(&self) -> InboxSender {
        InboxSender {
            queue: self.queue.clone(),
            capacity: self.capacity,
        }
    }

    /// Take every pending command in send order
    pub fn drain(&self) -> Vec<EngineCommand> {
        self.queue.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl Default for CommandInbox {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer side of the hand-off
#[derive(Debug, Clone)]
pub struct InboxSender {
    queue: Queue,
    capacity: usize,
}

impl InboxSender {
    /// Queue a command; returns false (and drops it) when the inbox is full
    pub fn send(&self, command: EngineCommand) -> bool {
        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity {
            warn!(command = command.name(), capacity = self.capacity, "engine inbox full, command dropped");
            return false;
        }
        queue.push_back(command);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_drain_preserves_order() {
        let inbox = CommandInbox::new();
        let tx = inbox.sender();
        assert!(tx.send(EngineCommand::SetMood("happy".into())));
        assert!(tx.send(EngineCommand::Speak(SpeechItem::Break(100.0))));
        assert!(tx.send(EngineCommand::StopSpeaking));

        let names: Vec<_> = inbox.drain().iter().map(EngineCommand::name).collect();
        assert_eq!(names, vec!["set_mood", "speak", "stop_speaking"]);
        assert!(inbox.is_empty());
    }

    #[test]
    fn test_capacity_drops_overflow() {
        let inbox = CommandInbox::with_capacity(2);
        let tx = inbox.sender();
        assert!(tx.send(EngineCommand::PauseSpeaking));
        assert!(tx.send(EngineCommand::PauseSpeaking));
        assert!(!tx.send(EngineCommand::AudioEnded));
        assert_eq!(inbox.len(), 2);
    }

    #[test]
    fn test_senders_on_other_threads() {
        let inbox = CommandInbox::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let tx = inbox.sender();
                thread::spawn(move || {
                    for _ in 0..25 {
                        tx.send(EngineCommand::LookAhead(i as f64));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(inbox.drain().len(), 100);
    }
}
