//! CV output channel: direct values, slews, AD envelopes and oscillation
//! sharing one DAC write path.
//!
//! [`ChannelOutput::update`] runs once per sample tick. Exactly one of
//! these governs the written value on any tick:
//!
//! | State | Written value |
//! |-------|---------------|
//! | Direct | target, applied on the next tick |
//! | Slewing | `current += delta` until the final snap |
//! | Envelope attack/decay | a slew between offset and envelope peak |
//! | Oscillating | held value scaled by the oscillator, every tick |
//!
//! End-of-rise and end-of-cycle are reported back to the caller as trigger
//! indices in [`EnvelopeEvents`]; the assembly owns the trigger channels.

use crate::constants::{DEFAULT_ATTACK_MS, DEFAULT_DECAY_MS, RESET_ATTACK_MS, RESET_DECAY_MS, RETRIGGER_MS};
use crate::dac::{Dac, WriteCache};
use crate::dsp::intrinsics::{saturate16, scale_q15};
use crate::dsp::tables::{exp_lookup, led_brightness, FULL_SCALE};
use crate::dsp::{compute_slew, Level, SlewSteps};
use crate::log::{debug, trace};
use crate::output::Kill;
use crate::quantizer::Quantizer;
use crate::units::{voct_to_frequency, TimeUnit};

use super::oscillator::Oscillator;

/// Default slew time for `target_value`.
const DEFAULT_SLEW_MS: u32 = 1;

/// Which state currently governs the written value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputState {
    Direct,
    Slewing,
    EnvelopeAttack,
    EnvelopeDecay,
    Oscillating,
}

/// Envelope leg in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    /// Fast ramp down to the offset before re-attacking.
    Retrigger,
    Attack,
    Decay,
}

/// Trigger outputs to pulse after a tick, as 0-based indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EnvelopeEvents {
    /// An attack reached its peak.
    pub end_of_rise: Option<usize>,
    /// A decay reached the offset.
    pub end_of_cycle: Option<usize>,
}

impl EnvelopeEvents {
    pub const NONE: EnvelopeEvents = EnvelopeEvents {
        end_of_rise: None,
        end_of_cycle: None,
    };

    pub fn is_empty(&self) -> bool {
        self.end_of_rise.is_none() && self.end_of_cycle.is_none()
    }
}

/// One CV output with its oscillator and quantizers.
///
/// Values are signed 16-bit CV units; the DAC receives `32767 - value`
/// because the output stage inverts.
///
/// # Example
/// ```ignore
/// let mut cv = ChannelOutput::new(0, EqualTemperament::new(), EqualTemperament::new());
/// cv.set_slew(50, TimeUnit::Milliseconds);
/// cv.target_value(8192);
/// loop {
///     let (events, written) = cv.update(&mut dac);
///     // route events to the trigger outputs, then
///     written?;
/// }
/// ```
pub struct ChannelOutput<Q> {
    channel: u8,

    current: Level,
    target: Level,
    /// Apply `target` on the next tick without slewing.
    set: bool,
    /// Rewrite the held value on the next idle tick.
    refresh: bool,
    slew: SlewSteps,
    slew_ms: u32,

    offset: i32,
    offset_level: Level,
    calibration: i32,
    log_mode: bool,

    envelope_mode: bool,
    stage: Stage,
    /// Envelope peak; also the saved direct target while envelope mode is on.
    env_target: Level,
    attack_ms: u32,
    decay_ms: u32,
    attack_slew: SlewSteps,
    decay_slew: SlewSteps,
    /// Cycles per trigger; 1 = single shot, 0 = forever.
    loop_times: u32,
    loop_count: u32,
    looping: bool,
    end_of_rise: Option<usize>,
    end_of_cycle: Option<usize>,

    oscillating: bool,
    oscillator: Oscillator,
    /// Last sample, for the LED.
    osc_sample: i32,
    quantizer: Q,
    osc_quantizer: Q,

    cache: WriteCache,
    led_dirty: bool,
    /// Show the envelope peak on the next LED refresh.
    peak_hold: bool,
    led: u8,
}

impl<Q: Quantizer> ChannelOutput<Q> {
    /// A channel at 0 V writing DAC `channel`.
    pub fn new(channel: u8, quantizer: Q, osc_quantizer: Q) -> Self {
        let mut out = ChannelOutput {
            channel,
            current: Level::ZERO,
            target: Level::ZERO,
            set: true,
            refresh: false,
            slew: SlewSteps::IDLE,
            slew_ms: DEFAULT_SLEW_MS,
            offset: 0,
            offset_level: Level::ZERO,
            calibration: 0,
            log_mode: false,
            envelope_mode: false,
            stage: Stage::Idle,
            env_target: Level::ZERO,
            attack_ms: DEFAULT_ATTACK_MS,
            decay_ms: DEFAULT_DECAY_MS,
            attack_slew: SlewSteps::IDLE,
            decay_slew: SlewSteps::IDLE,
            loop_times: 1,
            loop_count: 0,
            looping: false,
            end_of_rise: None,
            end_of_cycle: None,
            oscillating: false,
            oscillator: Oscillator::new(),
            osc_sample: 0,
            quantizer,
            osc_quantizer,
            cache: WriteCache::new(),
            led_dirty: true,
            peak_hold: false,
            led: 0,
        };
        out.plan_envelope();
        out
    }

    /// Advance one tick and write the DAC if the value changed.
    ///
    /// State transitions happen even when the write fails, so the envelope
    /// events of the tick are returned alongside the write result.
    #[inline]
    pub fn update<D: Dac>(&mut self, dac: &mut D) -> (EnvelopeEvents, Result<(), D::Error>) {
        let mut events = EnvelopeEvents::NONE;

        let written = if self.set || self.slew.steps == 1 {
            self.current = self.target;
            let written = self.write_dac(dac);
            self.led_dirty = true;
            self.set = false;
            self.slew.steps = 0;
            self.advance_envelope(&mut events);
            written
        } else if self.slew.steps > 1 {
            self.slew.steps -= 1;
            self.current += self.slew.delta;
            self.led_dirty = true;
            self.write_dac(dac)
        } else if self.oscillating || self.refresh {
            self.write_dac(dac)
        } else {
            Ok(())
        };

        (events, written)
    }

    /// Envelope transitions once a leg has landed on its target.
    fn advance_envelope(&mut self, events: &mut EnvelopeEvents) {
        match self.stage {
            Stage::Idle => {}
            Stage::Retrigger => self.start_attack(),
            Stage::Attack => {
                self.stage = Stage::Decay;
                self.target = self.offset_level;
                self.slew = self.decay_slew;
                self.peak_hold = true;
                events.end_of_rise = self.end_of_rise;
                trace!("ch{} end of rise", self.channel);
            }
            Stage::Decay => {
                self.stage = Stage::Idle;
                events.end_of_cycle = self.end_of_cycle;
                trace!("ch{} end of cycle", self.channel);
                if self.looping {
                    self.loop_count += 1;
                    if self.loop_times == 0 || self.loop_count < self.loop_times {
                        self.start_attack();
                    } else {
                        self.looping = false;
                    }
                }
            }
        }
    }

    fn start_attack(&mut self) {
        self.stage = Stage::Attack;
        self.current = self.offset_level;
        self.target = self.env_target;
        self.slew = self.attack_slew;
    }

    /// Log curve, oscillator scaling, calibration, then a deduplicated write.
    #[inline]
    fn write_dac<D: Dac>(&mut self, dac: &mut D) -> Result<(), D::Error> {
        let mut value = self.current.value();
        if self.log_mode {
            value = log_translate(value);
        }
        if self.oscillating {
            self.osc_sample = self.oscillator.oscillate();
            value = scale_q15(value, self.osc_sample) as i32;
        }
        let code = dac_code(value.saturating_add(self.calibration));
        let written = self.cache.write(dac, self.channel, code).map(|_| ());
        // retry on the next idle tick
        self.refresh = written.is_err();
        written
    }

    /// Recompute the LED brightness if the level moved. Call at the LED rate.
    ///
    /// Oscillating channels show the amplitude of the latest sample. After an
    /// attack the peak is shown once even if the decay has already started.
    pub fn update_led(&mut self) -> u8 {
        if self.oscillating {
            let amplitude = scale_q15(self.current.value(), self.osc_sample) as i32;
            self.led = led_brightness(amplitude.unsigned_abs() as u16);
        } else if self.led_dirty || self.peak_hold {
            self.led_dirty = false;
            let level = if self.peak_hold { self.env_target } else { self.current };
            self.peak_hold = false;
            self.led = led_brightness(level.value().unsigned_abs() as u16);
        }
        self.led
    }

    /// Last computed LED brightness.
    pub fn led_level(&self) -> u8 {
        self.led
    }

    fn level_for(&self, value: i32) -> Level {
        Level::from_value(value.saturating_add(self.offset))
    }

    fn set_envelope_peak(&mut self, peak: Level) {
        if peak != self.env_target {
            self.env_target = peak;
            self.plan_envelope();
        }
    }

    fn plan_envelope(&mut self) {
        self.attack_slew = compute_slew(self.attack_ms, self.env_target, self.offset_level);
        self.decay_slew = compute_slew(self.decay_ms, self.offset_level, self.env_target);
    }

    // ---- values ----

    /// Jump to `value` (plus offset) on the next tick. In envelope mode this
    /// sets the envelope peak instead.
    pub fn set_value(&mut self, value: i32) {
        let level = self.level_for(value);
        if self.envelope_mode {
            self.set_envelope_peak(level);
        } else {
            self.target = level;
            self.set = true;
        }
    }

    /// Slew to `value` (plus offset) over the slew time. In envelope mode
    /// this sets the envelope peak instead.
    pub fn target_value(&mut self, value: i32) {
        let level = self.level_for(value);
        if self.envelope_mode {
            self.set_envelope_peak(level);
        } else {
            self.target = level;
            self.set = false;
            self.slew = compute_slew(self.slew_ms, self.target, self.current);
        }
    }

    /// Slew time for `target_value` and offset changes.
    pub fn set_slew(&mut self, value: i32, unit: TimeUnit) {
        self.slew_ms = unit.to_ms(value);
        if self.stage == Stage::Idle {
            self.set = false;
            self.slew = compute_slew(self.slew_ms, self.target, self.current);
        }
    }

    /// Move the offset, carrying the current target along with it.
    pub fn set_offset(&mut self, value: i32) {
        let value = saturate16(value) as i32;
        let shift = value - self.offset;
        self.offset = value;
        self.offset_level = Level::from_value(value);

        if self.envelope_mode {
            self.env_target = Level::from_value(self.env_target.value() + shift);
            self.plan_envelope();
            match self.stage {
                Stage::Idle => {
                    self.target = self.offset_level;
                    self.glide_to_target();
                }
                Stage::Attack => {
                    self.target = self.env_target;
                    self.slew = self.slew.retarget(self.target, self.current);
                }
                Stage::Retrigger | Stage::Decay => {
                    self.target = self.offset_level;
                    self.slew = self.slew.retarget(self.target, self.current);
                }
            }
        } else {
            self.target = Level::from_value(self.target.value() + shift);
            if self.slew.steps > 1 {
                self.slew = self.slew.retarget(self.target, self.current);
            } else {
                self.glide_to_target();
            }
        }
    }

    /// Reach the target over the slew time, or next tick without one.
    fn glide_to_target(&mut self) {
        if self.slew_ms == 0 {
            self.set = true;
        } else {
            self.set = false;
            self.slew = compute_slew(self.slew_ms, self.target, self.current);
        }
    }

    // ---- quantization ----

    pub fn set_quantization_scale(&mut self, scale: i32) {
        self.quantizer.set_scale(scale);
    }

    /// Snap a V/oct value (`0..=16383`) to the scale and jump to it.
    pub fn set_quantized_value(&mut self, value: i32) {
        let value = self.quantizer.quantize(value).value;
        self.set_value(value << 1);
    }

    pub fn target_quantized_value(&mut self, value: i32) {
        let value = self.quantizer.quantize(value).value;
        self.target_value(value << 1);
    }

    /// Jump to scale degree `note`.
    pub fn set_note(&mut self, note: i32) {
        let value = self.quantizer.value_for_note(note);
        self.set_value(value << 1);
    }

    pub fn target_note(&mut self, note: i32) {
        let value = self.quantizer.value_for_note(note);
        self.target_value(value << 1);
    }

    // ---- oscillator ----

    /// Enter or leave oscillator mode. Entering starts the phase where the
    /// held CV sits; leaving rewrites the plain value.
    fn enter_oscillation(&mut self, active: bool) -> bool {
        if !self.oscillating {
            self.oscillator.reset_phase(self.target.value());
        }
        if self.oscillating && !active {
            debug!("ch{} oscillator off", self.channel);
            self.refresh = true;
        }
        self.oscillating = active;
        active
    }

    /// Oscillate at `hz`; zero leaves oscillator mode.
    pub fn set_frequency(&mut self, hz: i32) {
        if self.enter_oscillation(hz > 0) {
            self.oscillator.set_frequency(hz);
        }
    }

    pub fn target_frequency(&mut self, hz: i32) {
        if self.enter_oscillation(hz > 0) {
            self.oscillator.target_frequency(hz);
        }
    }

    /// Oscillate at the pitch of a V/oct value; zero leaves oscillator mode.
    pub fn set_voct(&mut self, value: i32) {
        if self.enter_oscillation(value > 0) {
            self.oscillator.set_float_frequency(voct_to_frequency(value));
        }
    }

    pub fn target_voct(&mut self, value: i32) {
        if self.enter_oscillation(value > 0) {
            self.oscillator.target_float_frequency(voct_to_frequency(value));
        }
    }

    /// Oscillate at `millihertz`; zero leaves oscillator mode.
    pub fn set_lfo(&mut self, millihertz: i32) {
        if self.enter_oscillation(millihertz > 0) {
            self.oscillator.set_lfo(millihertz);
        }
    }

    pub fn target_lfo(&mut self, millihertz: i32) {
        if self.enter_oscillation(millihertz > 0) {
            self.oscillator.target_lfo(millihertz);
        }
    }

    /// Oscillate at a V/oct value snapped to the oscillator scale.
    pub fn set_quantized_voct(&mut self, value: i32) {
        if self.enter_oscillation(value > 0) {
            let frequency = self.osc_quantizer.quantize(value).frequency;
            self.oscillator.set_float_frequency(frequency);
        }
    }

    pub fn target_quantized_voct(&mut self, value: i32) {
        if self.enter_oscillation(value > 0) {
            let frequency = self.osc_quantizer.quantize(value).frequency;
            self.oscillator.target_float_frequency(frequency);
        }
    }

    /// Oscillate at scale degree `note` of the oscillator scale.
    pub fn set_osc_note(&mut self, note: i32) {
        self.enter_oscillation(true);
        let frequency = self.osc_quantizer.frequency_for_note(note);
        self.oscillator.set_float_frequency(frequency);
    }

    pub fn target_osc_note(&mut self, note: i32) {
        self.enter_oscillation(true);
        let frequency = self.osc_quantizer.frequency_for_note(note);
        self.oscillator.target_float_frequency(frequency);
    }

    pub fn set_osc_quantization_scale(&mut self, scale: i32) {
        self.osc_quantizer.set_scale(scale);
    }

    /// Waveform and morph code, see [`Oscillator::set_waveform`].
    pub fn set_waveform(&mut self, code: i32) {
        self.oscillator.set_waveform(code);
    }

    pub fn set_width(&mut self, percent: i32) {
        self.oscillator.set_width(percent);
    }

    pub fn set_rectify(&mut self, mode: i32) {
        self.oscillator.set_rectify(mode);
    }

    pub fn set_phase_offset(&mut self, offset: i32) {
        self.oscillator.set_phase_offset(offset);
    }

    /// Restart the oscillator cycle.
    pub fn sync(&mut self) {
        let polarity = if self.oscillating { 0 } else { self.target.value() };
        self.oscillator.reset_phase(polarity);
    }

    /// Portamento time for the `target_*` frequency setters.
    pub fn set_frequency_slew(&mut self, value: i32, unit: TimeUnit) {
        let ms = unit.to_ms(value);
        debug!("ch{} portamento {} ms", self.channel, ms);
        self.oscillator.set_portamento_ms(ms);
    }

    // ---- envelope ----

    /// Attack time, at least 1 ms.
    pub fn set_attack(&mut self, value: i32, unit: TimeUnit) {
        self.attack_ms = unit.to_ms(value).max(1);
        self.attack_slew = compute_slew(self.attack_ms, self.env_target, self.offset_level);
    }

    /// Decay time, at least 1 ms.
    pub fn set_decay(&mut self, value: i32, unit: TimeUnit) {
        self.decay_ms = unit.to_ms(value).max(1);
        self.decay_slew = compute_slew(self.decay_ms, self.offset_level, self.env_target);
    }

    /// Turn envelope mode on or off. Repeating the current mode does nothing.
    ///
    /// Turning it on keeps the current target as the envelope peak and drops
    /// to the offset; turning it off returns to the saved target.
    pub fn set_envelope_mode(&mut self, on: bool) {
        if on == self.envelope_mode {
            return;
        }
        self.envelope_mode = on;
        if on {
            self.env_target = self.target;
            self.target = self.offset_level;
            self.plan_envelope();
        } else {
            self.target = self.env_target;
            self.looping = false;
        }
        self.stage = Stage::Idle;
        self.set = true;
        debug!("ch{} envelope mode {}", self.channel, on);
    }

    /// Start the envelope. A decaying envelope first ramps quickly down to
    /// the offset so the restart has no step; a trigger during that ramp
    /// replans it from the current level.
    pub fn trigger_envelope(&mut self) {
        if !self.envelope_mode {
            return;
        }
        self.set = false;
        if matches!(self.stage, Stage::Decay | Stage::Retrigger) {
            self.stage = Stage::Retrigger;
            self.target = self.offset_level;
            self.slew = compute_slew(RETRIGGER_MS, self.target, self.current);
        } else {
            self.start_attack();
        }
        if self.loop_times != 1 && !self.looping {
            self.looping = true;
            self.loop_count = 0;
        }
    }

    /// Cycles per trigger; 1 plays once, 0 repeats until stopped.
    pub fn set_envelope_loop(&mut self, times: i32) {
        self.loop_times = times.max(0) as u32;
        if self.loop_times == 1 {
            self.looping = false;
        }
    }

    /// Pulse trigger `number` (1-based) at each envelope peak; 0 disables.
    pub fn set_end_of_rise(&mut self, number: i32) {
        self.end_of_rise = trigger_index(number);
    }

    /// Pulse trigger `number` (1-based) when each cycle ends; 0 disables.
    pub fn set_end_of_cycle(&mut self, number: i32) {
        self.end_of_cycle = trigger_index(number);
    }

    // ---- output stage ----

    /// Exponential response curve, mirrored for negative values.
    pub fn set_log_mode(&mut self, on: bool) {
        self.log_mode = on;
        self.refresh = true;
    }

    /// Raw DAC offset added after all processing.
    pub fn set_calibration_value(&mut self, value: i32) {
        self.calibration = value;
        self.refresh = true;
    }

    pub fn calibration_value(&self) -> i32 {
        self.calibration
    }

    /// Restore power-on oscillator, quantizer and envelope settings.
    pub fn reset(&mut self) {
        self.set_frequency_slew(0, TimeUnit::Milliseconds);
        self.set_frequency(0);
        self.set_quantization_scale(0);
        self.set_osc_quantization_scale(0);
        self.set_envelope_mode(false);
        self.set_envelope_loop(1);
        self.set_end_of_rise(0);
        self.set_end_of_cycle(0);
        self.set_log_mode(false);
        self.set_attack(RESET_ATTACK_MS as i32, TimeUnit::Milliseconds);
        self.set_decay(RESET_DECAY_MS as i32, TimeUnit::Milliseconds);
    }

    // ---- inspection ----

    pub fn state(&self) -> OutputState {
        if self.oscillating {
            return OutputState::Oscillating;
        }
        match self.stage {
            Stage::Retrigger | Stage::Attack => OutputState::EnvelopeAttack,
            Stage::Decay => OutputState::EnvelopeDecay,
            Stage::Idle if !self.set && self.slew.steps > 1 => OutputState::Slewing,
            Stage::Idle => OutputState::Direct,
        }
    }

    /// Value of the last tick, before log curve, oscillator and calibration.
    pub fn current_value(&self) -> i32 {
        self.current.value()
    }

    pub fn target_value_level(&self) -> i32 {
        self.target.value()
    }

    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// Envelope peak (or the saved target while envelope mode is on).
    pub fn envelope_peak(&self) -> i32 {
        self.env_target.value()
    }

    pub fn is_envelope_mode(&self) -> bool {
        self.envelope_mode
    }

    /// An attack, retrigger ramp or decay is running.
    pub fn is_envelope_running(&self) -> bool {
        self.stage != Stage::Idle
    }

    pub fn is_oscillating(&self) -> bool {
        self.oscillating
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn oscillator(&self) -> &Oscillator {
        &self.oscillator
    }
}

impl<Q: Quantizer> Kill for ChannelOutput<Q> {
    /// Stop any slew and jump to the target on the next tick.
    ///
    /// An envelope finishes its current leg at once and stops looping. A
    /// killed attack still decays to the offset; a killed retrigger ramp
    /// lands on the offset without re-attacking.
    fn kill(&mut self) {
        if self.stage == Stage::Retrigger {
            self.stage = Stage::Decay;
        }
        self.looping = false;
        self.set = true;
    }
}

fn trigger_index(number: i32) -> Option<usize> {
    usize::try_from(number).ok().and_then(|n| n.checked_sub(1))
}

/// Exponential curve over the magnitude; the sign is kept.
fn log_translate(value: i32) -> i32 {
    let magnitude = exp_lookup(value.unsigned_abs().min(32768) as u16) as i32;
    if value < 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// The output stage inverts: full positive CV is code 0.
fn dac_code(value: i32) -> u16 {
    (FULL_SCALE - saturate16(value) as i32) as u16
}
