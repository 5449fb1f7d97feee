//! Gesture controller
//!
//! At most one named hand gesture is active. Its channels are locked in the
//! pose blender so template transitions leave them alone; on stop (explicit
//! or by timer) they return to whatever the current pose template implies.

use std::collections::BTreeSet;

use rand::Rng;
use tracing::{debug, info};

use marionette_core::{AnimError, AnimResult, ChannelKey, TemplateKind};
use marionette_pose::{PoseBlender, PoseTemplateLibrary};
use marionette_time::Deadline;

use crate::emoji::EmojiLibrary;
use crate::entry::{EntryOptions, EntryTag};
use crate::scheduler::AnimationScheduler;

/// Parameters of one `play` call
#[derive(Debug, Clone, PartialEq)]
pub struct GestureRequest {
    /// Gesture template or emoji name
    pub name: String,
    /// Auto-stop after this many seconds (`None` holds until stopped)
    pub duration_s: Option<f32>,
    /// Play on the other hand
    pub mirror: bool,
    pub transition_ms: f64,
}

impl GestureRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            duration_s: None,
            mirror: false,
            transition_ms: 1000.0,
        }
    }

    pub fn for_secs(mut self, secs: f32) -> Self {
        self.duration_s = Some(secs);
        self
    }

    pub fn mirrored(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn transition(mut self, ms: f64) -> Self {
        self.transition_ms = ms;
        self
    }
}

#[derive(Debug, Clone)]
struct ActiveGesture {
    name: String,
    channels: BTreeSet<ChannelKey>,
    transition_ms: f64,
}

/// Exclusive owner of the hand channels
#[derive(Debug, Clone, Default)]
pub struct GestureController {
    emojis: EmojiLibrary,
    active: Option<ActiveGesture>,
    timer: Deadline,
}

impl GestureController {
    pub fn new(emojis: EmojiLibrary) -> Self {
        Self {
            emojis,
            active: None,
            timer: Deadline::new(),
        }
    }

    pub fn emojis(&self) -> &EmojiLibrary {
        &self.emojis
    }

    /// Name of the gesture holding the hands
    pub fn active(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.name.as_str())
    }

    /// Channels owned by the active gesture
    pub fn owned(&self) -> impl Iterator<Item = &ChannelKey> {
        self.active.iter().flat_map(|a| a.channels.iter())
    }

    /// When the running gesture stops on its own
    pub fn expires_at(&self) -> Option<f64> {
        self.timer.due()
    }

    /// Start a gesture, an emoji, or both when the emoji names a gesture.
    ///
    /// An unknown name is rejected and nothing changes.
    pub fn play<R: Rng + ?Sized>(
        &mut self,
        request: &GestureRequest,
        now_ms: f64,
        poses: &PoseTemplateLibrary,
        blender: &mut PoseBlender,
        scheduler: &mut AnimationScheduler,
        rng: &mut R,
    ) -> AnimResult<()> {
        let emoji = self.emojis.get(&request.name).cloned();
        let gesture_name = if poses.has_gesture(&request.name) {
            Some(request.name.clone())
        } else {
            emoji.as_ref().and_then(|e| e.gesture.clone())
        };
        let gesture = match &gesture_name {
            Some(name) => Some(poses.gesture(name)?),
            None => None,
        };
        if gesture.is_none() && emoji.is_none() {
            return Err(AnimError::unknown(TemplateKind::Gesture, &request.name));
        }

        let duration_ms = request
            .duration_s
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(|d| d as f64 * 1000.0);

        if let Some(gesture) = gesture {
            let props = gesture.instantiate(request.mirror, rng);
            let channels: BTreeSet<ChannelKey> = props.keys().cloned().collect();

            if let Some(previous) = self.active.take() {
                blender.unlock(previous.channels.iter());
                // Channels only the old gesture held go back to the pose
                let stale = previous.channels.difference(&channels);
                restore(blender, stale, now_ms, request.transition_ms);
                debug!(from = %previous.name, to = %gesture.name, "gesture preempted");
            }

            blender.lock(channels.iter());
            for (key, value) in props {
                blender.set_channel_target(key, value, now_ms, request.transition_ms);
            }
            info!(gesture = %gesture.name, mirror = request.mirror, ?duration_ms, "gesture started");
            self.active = Some(ActiveGesture {
                name: gesture.name.clone(),
                channels,
                transition_ms: request.transition_ms,
            });

            // Only a new gesture replaces the hands' timer
            self.timer.cancel();
            if let Some(ms) = duration_ms {
                self.timer.arm_after(now_ms, ms);
            }
        }

        scheduler.remove_tagged(EntryTag::Gesture);
        if let Some(emoji) = emoji {
            let mut entry = scheduler.build(
                &emoji.name,
                &emoji.to_spec(),
                EntryOptions::tagged(EntryTag::Gesture),
                now_ms,
                rng,
            );
            if let Some(ms) = duration_ms {
                entry.rescale(ms, emoji.rescale.as_deref());
            }
            scheduler.push_entry(entry);
        }
        Ok(())
    }

    /// Release the hands back to the pose template
    pub fn stop(
        &mut self,
        transition_ms: f64,
        now_ms: f64,
        blender: &mut PoseBlender,
        scheduler: &mut AnimationScheduler,
    ) {
        self.timer.cancel();
        if let Some(active) = self.active.take() {
            blender.unlock(active.channels.iter());
            restore(blender, active.channels.iter(), now_ms, transition_ms);
            info!(gesture = %active.name, "gesture stopped");
        }
        scheduler.remove_tagged(EntryTag::Gesture);
    }

    /// Stop the gesture once its timer fires; returns whether it did
    pub fn tick(&mut self, now_ms: f64, blender: &mut PoseBlender, scheduler: &mut AnimationScheduler) -> bool {
        if !self.timer.poll(now_ms) {
            return false;
        }
        let transition = self.active.as_ref().map_or(1000.0, |a| a.transition_ms);
        debug!(gesture = ?self.active(), "gesture expired");
        self.stop(transition, now_ms, blender, scheduler);
        true
    }
}

/// Return channels to the value the current pose template implies
fn restore<'a>(
    blender: &mut PoseBlender,
    channels: impl Iterator<Item = &'a ChannelKey>,
    now_ms: f64,
    transition_ms: f64,
) {
    for key in channels {
        if let Some(value) = blender.template_value(key).cloned() {
            blender.set_channel_target(key.clone(), value, now_ms, transition_ms);
        }
    }
}
