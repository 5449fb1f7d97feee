//! Host collaborators

use std::fmt;

use marionette_pose::{JointSource, PoseFrame};

/// Bound avatar: joints plus the blendshapes its meshes expose
pub trait AvatarSource: JointSource {
    /// Morph target names; empty means every blendshape is passed through
    fn blendshape_names(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Receives the final frame of every processed tick
pub trait Renderer {
    fn apply(&mut self, frame: &PoseFrame);
}

type TextCallback = Box<dyn FnMut(&str) + Send>;
type FlagCallback = Box<dyn FnMut(bool) + Send>;

/// Notifications for the UI
#[derive(Default)]
pub struct EngineCallbacks {
    /// One call per subtitle word
    pub on_subtitles: Option<TextCallback>,
    /// Text a `speak` command asks the host to synthesize
    pub on_speak: Option<TextCallback>,
    pub on_speaking_changed: Option<FlagCallback>,
}

impl EngineCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_subtitles(mut self, f: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_subtitles = Some(Box::new(f));
        self
    }

    pub fn on_speak(mut self, f: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_speak = Some(Box::new(f));
        self
    }

    pub fn on_speaking_changed(mut self, f: impl FnMut(bool) + Send + 'static) -> Self {
        self.on_speaking_changed = Some(Box::new(f));
        self
    }

    pub(crate) fn subtitles(&mut self, text: &str) {
        if let Some(f) = self.on_subtitles.as_mut() {
            f(text);
        }
    }

    pub(crate) fn speak(&mut self, text: &str) {
        if let Some(f) = self.on_speak.as_mut() {
            f(text);
        }
    }

    pub(crate) fn speaking_changed(&mut self, speaking: bool) {
        if let Some(f) = self.on_speaking_changed.as_mut() {
            f(speaking);
        }
    }
}

impl fmt::Debug for EngineCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineCallbacks")
            .field("on_subtitles", &self.on_subtitles.is_some())
            .field("on_speak", &self.on_speak.is_some())
            .field("on_speaking_changed", &self.on_speaking_changed.is_some())
            .finish()
    }
}
