//! Marionette Test Harness - Deterministic engine simulation
//!
//! This crate provides:
//! - A simulated avatar over the reference humanoid skeleton
//! - A renderer that records every frame
//! - Scripted audio output and decoding
//! - A simulator that drives the engine with a manual wall clock

pub mod audio;
pub mod avatar;
pub mod simulator;

pub use audio::*;
pub use avatar::*;
pub use simulator::*;
