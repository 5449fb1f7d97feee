//! Marionette Core - Fundamental types and primitives
//!
//! This crate defines the core types used throughout the avatar engine:
//! - Joint channels (joint name + property) and their values
//! - Randomized ranges used by templates
//! - The sigmoid easing curve shared by every interpolator
//! - Error types

pub mod channel;
pub mod easing;
pub mod error;
pub mod random;
pub mod value;

pub use channel::*;
pub use easing::*;
pub use error::*;
pub use random::*;
pub use value::*;

pub use glam::{EulerRot, Quat, Vec3};
