//! # expander-core
//!
//! A `no_std`, zero-allocation real-time core for a Eurorack CV/trigger
//! output expander on Teensy-class microcontrollers. One sample-rate timer
//! interrupt drives every CV and trigger channel; a slower timer refreshes
//! the LEDs; a bus receive path calls the setters in between.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Time | [`clock`] / [`units`] | Wrapping millisecond clock, time units, V/oct |
//! | Trait | [`dac`] / [`output`] / [`quantizer`] | `Dac`, `Kill` and `Quantizer` seams |
//! | DSP | [`dsp`] | Fixed-point levels, slew planning, wavetables, noise |
//! | Channels | [`channels`] | Oscillator, CV output, trigger output state machines |
//! | Assembly | [`expander`] | One module's channels on one DAC, event routing |
//! | Driver | [`dac7565`] | DAC7565/DAC8564 SPI driver (feature-gated) |
//!
//! ## Quick start
//!
//! ```ignore
//! use expander_core::expander::Expander;
//! use expander_core::quantizer::EqualTemperament;
//! use expander_core::units::TimeUnit;
//!
//! let mut m: Expander<_, EqualTemperament, 4, 4> = Expander::with_default_quantizers(dac);
//!
//! // CV 1: 250 ms slews; CV 2: looping envelope clocking trigger 1
//! m.cv[0].set_slew(250, TimeUnit::Milliseconds);
//! m.cv[0].target_value(8192);
//! m.cv[1].set_value(16383);
//! m.cv[1].set_envelope_mode(true);
//! m.cv[1].set_envelope_loop(0);
//! m.cv[1].set_end_of_cycle(1);
//! m.cv[1].trigger_envelope();
//!
//! // trigger 2: 120 bpm metronome, doubled
//! m.tr[1].set_metro_time(120, TimeUnit::Bpm);
//! m.tr[1].set_multiplier(2);
//! m.tr[1].set_metro(true, clock.now());
//!
//! // In the sample-rate ISR:
//! m.tick(clock.now())?;
//! ```
//!
//! ## Features
//!
//! | Feature | Default | Enables |
//! |---------|---------|---------|
//! | `turbo` | yes | 25 kHz tick, PolyBLEP, closed-form triangle |
//! | `dac7565` | no | DAC7565 SPI driver (requires `embedded-hal`) |
//! | `defmt` | no | Debug logging and `defmt::Format` derives |
//!
//! ## Output parameters
//!
//! - **Sample rate:** 25 kHz with `turbo`, 15 625 Hz without ([`constants::SAMPLE_RATE`])
//! - **CV format:** `i16` (signed 16-bit, inverted at the DAC)
//! - **Slew resolution:** Q16.15 ([`dsp::Level`])
//! - **Clock:** 32-bit milliseconds, wrap-safe ([`clock::Millis`])

#![no_std]

mod log;

pub mod constants;
pub mod clock;
pub mod units;
pub mod dac;
pub mod output;
pub mod quantizer;
pub mod dsp;
pub mod channels;
pub mod expander;

#[cfg(feature = "dac7565")]
pub mod dac7565;
