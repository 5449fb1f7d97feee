//! Marionette Runtime - Avatar engine and main loop
//!
//! One `AnimationEngine` drives one bound avatar. The host calls `tick`
//! from its render callback; each processed tick:
//! 1. Advances the logical clock
//! 2. Applies commands sent from other threads
//! 3. Polls speech timers
//! 4. Expires gestures
//! 5. Resolves animation channels
//! 6. Dispatches command channels
//! 7. Routes values to delta controls and blendshapes
//! 8. Blends the pose
//! 9. Composes the delta layer
//! 10. Hands the frame to the renderer

pub mod config;
pub mod engine;
pub mod gaze;
pub mod host;
pub mod inbox;
pub mod logging;

pub use config::*;
pub use engine::*;
pub use gaze::*;
pub use host::*;
pub use inbox::*;
pub use logging::*;
