//! Error types for the avatar engine

use thiserror::Error;

/// Kind of named template a lookup failed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Pose,
    Gesture,
    Mood,
    Emoji,
    Animation,
}

impl std::fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TemplateKind::Pose => "pose",
            TemplateKind::Gesture => "gesture",
            TemplateKind::Mood => "mood",
            TemplateKind::Emoji => "emoji",
            TemplateKind::Animation => "animation",
        };
        f.write_str(s)
    }
}

/// Core engine errors
#[derive(Error, Debug)]
pub enum AnimError {
    // Channel errors
    #[error("Missing channel: {0}")]
    MissingChannel(String),

    #[error("Invalid channel name: {0}")]
    InvalidChannel(String),

    // Template errors
    #[error("Unknown {kind} template: {name}")]
    UnknownTemplate { kind: TemplateKind, name: String },

    #[error("Template resolved to no leaf: {0}")]
    UnresolvedTemplate(String),

    // Speech errors
    #[error("Audio decode failed: {0}")]
    AudioDecode(String),

    #[error("Audio context suspended")]
    AudioContextSuspended,

    #[error("Invalid speech payload: {0}")]
    InvalidPayload(String),

    // Engine errors
    #[error("Skeleton not bound")]
    NotBound,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AnimError {
    pub fn unknown(kind: TemplateKind, name: impl Into<String>) -> Self {
        AnimError::UnknownTemplate {
            kind,
            name: name.into(),
        }
    }
}

/// Result type for engine operations
pub type AnimResult<T> = Result<T, AnimError>;
