//! Marionette Pose - Body pose as blended state
//!
//! This is NOT a keyframe player. A pose is a set of joint-channel targets
//! that the blender eases toward every tick.
//!
//! # Layers
//!
//! - Skeleton: joints bound by name from the host, with rest transforms
//! - Templates: immutable catalog of named stances and hand gestures
//! - Blender: Base/Target state per channel, eased slerp/lerp each tick
//! - Delta layer: per-tick additive corrections (head, eyes, breathing, fists)
//! - Frame: the flat channel/blendshape map handed to the renderer

pub mod blender;
pub mod delta;
pub mod frame;
pub mod library;
pub mod skeleton;
pub mod template;

pub use blender::*;
pub use delta::*;
pub use frame::*;
pub use library::*;
pub use skeleton::*;
pub use template::*;
