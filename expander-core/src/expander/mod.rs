//! Output expander assembly.
//!
//! [`Expander`] owns the DAC and every CV and trigger channel of one
//! module and drives them from the two timer interrupts:
//!
//! - [`Expander::tick`] at the sample rate: every CV channel, then every
//!   trigger channel, with end-of-rise/end-of-cycle routed between them
//! - [`Expander::led_tick`] every [`LED_RATE_MS`](crate::constants::LED_RATE_MS)
//!
//! Setters are called on the public `cv` and `tr` arrays directly.
//!
//! ```ignore
//! let mut expander: Expander<_, EqualTemperament, 4, 4> = Expander::with_default_quantizers(dac);
//! expander.cv[0].set_envelope_mode(true);
//! expander.cv[0].set_end_of_cycle(1);
//! expander.cv[0].trigger_envelope();
//!
//! // sample-rate interrupt
//! expander.tick(clock.now())?;
//! ```

use crate::channels::{ChannelOutput, EnvelopeEvents, TriggerChannel};
use crate::clock::{Clock, Millis};
use crate::dac::Dac;
use crate::log::trace;
use crate::output::Kill;
use crate::quantizer::Quantizer;

#[cfg(test)]
mod verification_tests;

/// One output module: `CV` CV channels and `TR` trigger channels on one DAC.
pub struct Expander<D, Q, const CV: usize, const TR: usize> {
    dac: D,
    pub cv: [ChannelOutput<Q>; CV],
    pub tr: [TriggerChannel; TR],
}

impl<D: Dac, Q: Quantizer, const CV: usize, const TR: usize> Expander<D, Q, CV, TR> {
    /// Assemble from pre-built CV channels. Trigger channels start at their
    /// power-on settings.
    pub fn new(dac: D, cv: [ChannelOutput<Q>; CV]) -> Self {
        Expander {
            dac,
            cv,
            tr: core::array::from_fn(|_| TriggerChannel::new()),
        }
    }

    /// Advance every channel by one sample tick.
    ///
    /// All channels are updated and envelope events routed even if a DAC
    /// write fails; the first error is returned afterwards.
    pub fn tick(&mut self, now: Millis) -> Result<(), D::Error> {
        let mut first_error = None;
        for channel in self.cv.iter_mut() {
            let (events, written) = channel.update(&mut self.dac);
            route(&mut self.tr, events, now);
            if let Err(e) = written {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        for trigger in self.tr.iter_mut() {
            trigger.update(now);
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// [`tick`](Self::tick) at the time read from `clock`.
    pub fn tick_clock<C: Clock>(&mut self, clock: &C) -> Result<(), D::Error> {
        self.tick(clock.now())
    }

    /// Refresh LED brightness for every channel: `(cv, trigger)`.
    pub fn led_tick(&mut self) -> ([u8; CV], [u8; TR]) {
        let cv = core::array::from_fn(|i| self.cv[i].update_led());
        let tr = core::array::from_fn(|i| self.tr[i].led_level());
        (cv, tr)
    }

    /// Stop every slew, pulse and metronome. Envelopes finish their current
    /// leg and stop looping.
    pub fn kill_all(&mut self) {
        for channel in self.cv.iter_mut() {
            channel.kill();
        }
        for trigger in self.tr.iter_mut() {
            trigger.kill();
        }
    }

    /// Restore every channel to its power-on settings.
    pub fn reset_all(&mut self, now: Millis) {
        for channel in self.cv.iter_mut() {
            channel.reset();
        }
        for trigger in self.tr.iter_mut() {
            trigger.reset(now);
        }
    }

    pub fn dac(&self) -> &D {
        &self.dac
    }

    pub fn dac_mut(&mut self) -> &mut D {
        &mut self.dac
    }

    /// Take the DAC back.
    pub fn release(self) -> D {
        self.dac
    }
}

impl<D: Dac, Q: Quantizer + Default, const CV: usize, const TR: usize> Expander<D, Q, CV, TR> {
    /// CV channel `i` writes DAC channel `i`, each with default quantizers.
    pub fn with_default_quantizers(dac: D) -> Self {
        Self::new(
            dac,
            core::array::from_fn(|i| ChannelOutput::new(i as u8, Q::default(), Q::default())),
        )
    }
}

/// Pulse the triggers named by `events`. Indices past the end are ignored.
fn route(triggers: &mut [TriggerChannel], events: EnvelopeEvents, now: Millis) {
    for index in [events.end_of_rise, events.end_of_cycle].into_iter().flatten() {
        match triggers.get_mut(index) {
            Some(trigger) => trigger.pulse(now),
            None => trace!("no trigger {} to pulse", index),
        }
    }
}
