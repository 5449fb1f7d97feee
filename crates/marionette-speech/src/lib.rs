//! Marionette Speech - Speech queue and lip-sync
//!
//! Speech is a strict FIFO of items (text, audio, emoji, breaks, markers).
//! Each item turns into animation entries: visemes with a rise/hold/fall
//! envelope and one subtitle command per word. Entries are built relative
//! to the start of their audio and rebased onto the animation clock the
//! moment playback actually begins.
//!
//! The queue is a state machine driven by the engine tick and by the
//! host's audio `ended` notifications. It never blocks.

pub mod audio;
pub mod item;
pub mod lipsync;
pub mod queue;
pub mod viseme;

pub use audio::*;
pub use item::*;
pub use lipsync::*;
pub use queue::*;
pub use viseme::*;
