//! DAC7565 quad 16-bit DAC driver module.
//!
//! Drives the TI DAC7565/DAC8564 family found on the output expander over
//! SPI. Also works for the 12/14-bit DAC7564 and DAC8164 when values are
//! left-aligned.
//!
//! # Feature gate
//!
//! This module is available when the `dac7565` feature is enabled.

pub(crate) mod registers;
mod driver;

pub use driver::{Dac7565, PowerDown, Reference, Target};
