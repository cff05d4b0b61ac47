//! Fixed-point DSP building blocks shared by the channel state machines.

pub mod fixed;
pub mod intrinsics;
pub mod noise;
pub mod slew;
pub mod tables;

pub use fixed::Level;
pub use slew::{compute_slew, SlewSteps};
