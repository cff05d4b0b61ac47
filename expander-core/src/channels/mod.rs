//! Per-output state machines.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`oscillator`] | Phase-accumulator oscillator with morph, PolyBLEP and glide |
//! | [`cv_output`] | CV channel: values, slews, envelopes, oscillation, DAC path |
//! | [`trigger_output`] | Trigger channel: pulses, divider, multiplier, metronome |

pub mod cv_output;
pub mod oscillator;
pub mod trigger_output;

pub use cv_output::{ChannelOutput, EnvelopeEvents, OutputState};
pub use oscillator::{Oscillator, Rectify, Waveform};
pub use trigger_output::TriggerChannel;
