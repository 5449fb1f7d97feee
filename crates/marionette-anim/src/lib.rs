//! Marionette Anim - Procedural animation scheduling
//!
//! Idle and speaking motion is generated, not played back:
//!
//! - Templates are trees narrowed by state, mood, pose, view and body form,
//!   with weighted random alternatives and randomized timing at the leaves
//! - Entries are the resolved timelines; the scheduler eases every channel
//!   along them and fires command channels once
//! - Channels nobody animates settle on the mood baseline; fixed values
//!   override everything
//! - The gesture controller owns the hand channels exclusively while a
//!   gesture runs

pub mod config;
pub mod emoji;
pub mod entry;
pub mod gesture;
pub mod library;
pub mod mood;
pub mod scheduler;
pub mod template;

pub use config::*;
pub use emoji::*;
pub use entry::*;
pub use gesture::*;
pub use library::*;
pub use mood::*;
pub use scheduler::*;
pub use template::*;
