//! Marionette Time - the logical animation clock
//!
//! Every timeline in the engine is expressed in logical milliseconds:
//! - The clock advances once per accepted render callback
//! - Frames arriving faster than the cap are skipped
//! - A slowdown rate stretches logical time relative to wall time
//! - Deadline timers replace host timeouts so everything is testable

pub mod clock;
pub mod timer;

pub use clock::*;
pub use timer::*;
