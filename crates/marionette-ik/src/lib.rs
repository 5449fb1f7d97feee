//! Marionette IK - Cyclic coordinate descent over skeleton chains
//!
//! The solver only corrects swing. Authored per-joint Euler boxes keep the
//! result anatomically plausible; it is not a general 6-DOF solver.
//!
//! A solve never fails on an unreachable target: it returns the best pose
//! found after the iteration budget (or earlier, once a pass stops moving).

pub mod chain;
pub mod solver;

pub use chain::*;
pub use solver::*;
