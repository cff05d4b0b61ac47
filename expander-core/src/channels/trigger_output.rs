//! Trigger/gate output: pulses, clock division and multiplication, metronome.
//!
//! Time comes in as [`Millis`] from the caller; every deadline comparison
//! goes through [`Millis::reached`] so the 32-bit counter may overflow while
//! pulses and metronomes are pending.

use crate::clock::Millis;
use crate::constants::{DEFAULT_METRO_MS, DEFAULT_PULSE_MS};
use crate::log::debug;
use crate::output::Kill;
use crate::units::TimeUnit;

/// A single trigger output and its indicator LED.
///
/// # Example
/// ```
/// use expander_core::channels::TriggerChannel;
/// use expander_core::clock::Millis;
/// use expander_core::units::TimeUnit;
///
/// let mut tr = TriggerChannel::new();
/// tr.set_time(10, TimeUnit::Milliseconds);
/// tr.pulse(Millis(0));
/// assert!(tr.is_high());
/// tr.update(Millis(10));
/// assert!(!tr.is_high());
/// ```
pub struct TriggerChannel {
    /// Electrical level of the output.
    level: bool,
    /// Level a pulse drives the output to.
    polarity: bool,
    muted: bool,

    pulse_ms: u32,
    /// Pulse length follows the beat interval as a percentage.
    width_mode: bool,
    width_percent: u32,
    /// Pending end of the current pulse.
    toggle_off: Option<Millis>,

    division: u32,
    counter: u32,

    multiplication: u32,
    /// Beats fired in the current reference period.
    multiply_count: u32,

    metro: bool,
    metro_interval: u32,
    next_event: Millis,
    /// Next reference beat; always advances by exactly `metro_interval`.
    next_normal: Millis,
    /// Beats per arming, 0 = unlimited.
    metro_count: u32,
    remaining: u32,
}

impl TriggerChannel {
    /// A low, active-high output with a 100 ms pulse and a disarmed 1 s metronome.
    pub const fn new() -> Self {
        TriggerChannel {
            level: false,
            polarity: true,
            muted: false,
            pulse_ms: DEFAULT_PULSE_MS,
            width_mode: false,
            width_percent: 50,
            toggle_off: None,
            division: 1,
            counter: 0,
            multiplication: 1,
            multiply_count: 0,
            metro: false,
            metro_interval: DEFAULT_METRO_MS,
            next_event: Millis(0),
            next_normal: Millis(0),
            metro_count: 0,
            remaining: 0,
        }
    }

    /// Advance to `now`: end an expired pulse and fire a due metronome beat.
    pub fn update(&mut self, now: Millis) {
        if let Some(off) = self.toggle_off {
            if now.reached(off) {
                if self.level == self.polarity {
                    self.level = !self.polarity;
                }
                self.toggle_off = None;
            }
        }

        if self.metro && now.reached(self.next_event) {
            if self.metro_count > 0 {
                self.remaining = self.remaining.saturating_sub(1);
                if self.remaining == 0 {
                    self.metro = false;
                    debug!("metro finished after {} beats", self.metro_count);
                }
            }
            self.schedule_next_beat();
            self.pulse(now);
        }
    }

    /// Work out the beat after the one that just fired.
    ///
    /// Multiplied beats are placed by proportion inside the current reference
    /// period, so rounding in `interval / multiplication` never carries over
    /// into the next reference beat.
    fn schedule_next_beat(&mut self) {
        if self.multiply_count == 0 {
            self.next_normal = self.next_event + self.metro_interval;
        }
        self.multiply_count += 1;
        if self.multiply_count >= self.multiplication {
            self.multiply_count = 0;
            self.next_event = self.next_normal;
        } else {
            let period_start = Millis(self.next_normal.ticks().wrapping_sub(self.metro_interval));
            let offset = self.metro_interval as u64 * self.multiply_count as u64 / self.multiplication as u64;
            self.next_event = period_start + offset as u32;
        }
    }

    /// Fire a pulse, subject to mute and the clock divider.
    pub fn pulse(&mut self, now: Millis) {
        if self.muted {
            return;
        }
        if self.division > 1 {
            self.counter += 1;
            if self.counter >= self.division {
                self.counter = 0;
            } else {
                return;
            }
        }
        self.level = self.polarity;
        self.toggle_off = Some(now + self.pulse_ms);
    }

    /// Drive the output directly, leaving any pending pulse end in place.
    pub fn set_state(&mut self, high: bool) {
        self.level = high;
    }

    /// Invert the output and cancel any pending pulse end.
    pub fn toggle_state(&mut self) {
        self.toggle_off = None;
        self.level = !self.level;
    }

    /// Level a pulse drives the output to (`true` = high).
    pub fn set_polarity(&mut self, polarity: bool) {
        self.polarity = polarity;
    }

    /// Fixed pulse length.
    pub fn set_time(&mut self, value: i32, unit: TimeUnit) {
        self.width_mode = false;
        self.pulse_ms = unit.to_ms(value);
    }

    /// Pulse length as a percentage (`0..=100`) of the beat interval.
    pub fn set_width(&mut self, percent: i32) {
        self.width_mode = true;
        self.width_percent = percent.clamp(0, 100) as u32;
        self.pulse_ms = self.beat_interval() * self.width_percent / 100;
    }

    /// Only every `division`th pulse reaches the output (minimum 1).
    pub fn set_division(&mut self, division: i32) {
        self.division = division.max(1) as u32;
        self.counter = 0;
    }

    /// Metronome beats per reference period (minimum 1).
    pub fn set_multiplier(&mut self, multiplication: i32) {
        self.multiplication = multiplication.max(1) as u32;
        if self.multiply_count >= self.multiplication {
            self.multiply_count = 0;
        }
        if self.width_mode {
            self.set_width(self.width_percent as i32);
        }
    }

    /// Arm or disarm the metronome. Arming an idle metronome syncs it to `now`.
    pub fn set_metro(&mut self, on: bool, now: Millis) {
        if on {
            self.remaining = self.metro_count;
            if !self.metro {
                self.sync(now);
            }
        }
        debug!("metro {}", on);
        self.metro = on;
    }

    /// Metronome reference period (minimum 1 ms).
    pub fn set_metro_time(&mut self, value: i32, unit: TimeUnit) {
        self.metro_interval = unit.to_ms(value).max(1);
        if self.width_mode {
            self.set_width(self.width_percent as i32);
        }
    }

    /// Beats per arming; 0 repeats forever.
    pub fn set_metro_count(&mut self, count: i32) {
        self.metro_count = count.max(0) as u32;
        self.remaining = self.metro_count;
    }

    /// Restart the metronome cycle at `now`.
    pub fn sync(&mut self, now: Millis) {
        self.next_event = now;
        self.next_normal = now;
        self.multiply_count = 0;
    }

    /// Ignore pulses while muted. The metronome keeps its timing.
    pub fn set_mute(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Restore power-on settings.
    pub fn reset(&mut self, now: Millis) {
        self.set_polarity(true);
        self.set_state(false);
        self.toggle_off = None;
        self.set_time(DEFAULT_PULSE_MS as i32, TimeUnit::Milliseconds);
        self.set_division(1);
        self.set_multiplier(1);
        self.set_metro(false, now);
        self.set_metro_time(DEFAULT_METRO_MS as i32, TimeUnit::Milliseconds);
        self.set_metro_count(0);
        self.set_mute(false);
    }

    fn beat_interval(&self) -> u32 {
        self.metro_interval / self.multiplication
    }

    /// Current electrical level; mirrored on the LED.
    pub fn is_high(&self) -> bool {
        self.level
    }

    /// LED brightness: fully on while the output is high.
    pub fn led_level(&self) -> u8 {
        if self.level {
            u8::MAX
        } else {
            0
        }
    }

    /// A pulse is waiting to end.
    pub fn is_pulsing(&self) -> bool {
        self.toggle_off.is_some()
    }

    pub fn is_metro_armed(&self) -> bool {
        self.metro
    }

    /// Time of the next reference beat.
    pub fn next_reference_beat(&self) -> Millis {
        self.next_normal
    }

    /// Time of the next beat, reference or multiplied.
    pub fn next_beat(&self) -> Millis {
        self.next_event
    }

    /// Current pulse length in milliseconds.
    pub fn pulse_ms(&self) -> u32 {
        self.pulse_ms
    }
}

impl Default for TriggerChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kill for TriggerChannel {
    /// Cancel the pending pulse end and stop the metronome.
    fn kill(&mut self) {
        self.toggle_off = None;
        self.metro = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Run `update` every millisecond in `from..to`, counting rising edges.
    fn run(tr: &mut TriggerChannel, from: u32, to: u32) -> u32 {
        let mut edges = 0;
        let mut last = tr.is_high();
        let mut t = from;
        while t != to {
            tr.update(Millis(t));
            if tr.is_high() && !last {
                edges += 1;
            }
            last = tr.is_high();
            t = t.wrapping_add(1);
        }
        edges
    }

    #[test]
    fn pulse_goes_high_then_low() {
        let mut tr = TriggerChannel::new();
        tr.set_time(20, TimeUnit::Milliseconds);
        tr.pulse(Millis(100));
        assert!(tr.is_high());
        tr.update(Millis(119));
        assert!(tr.is_high());
        tr.update(Millis(120));
        assert!(!tr.is_high());
        assert!(!tr.is_pulsing());
    }

    #[test]
    fn inverted_polarity_pulses_low() {
        let mut tr = TriggerChannel::new();
        tr.set_polarity(false);
        tr.set_state(true);
        tr.pulse(Millis(0));
        assert!(!tr.is_high());
        tr.update(Millis(DEFAULT_PULSE_MS));
        assert!(tr.is_high());
    }

    #[test]
    fn divider_fires_every_fourth_pulse() {
        let mut tr = TriggerChannel::new();
        tr.set_division(4);
        let mut fired = [false; 8];
        for (i, slot) in fired.iter_mut().enumerate() {
            tr.kill();
            tr.set_state(false);
            tr.pulse(Millis(i as u32));
            *slot = tr.is_high();
        }
        assert_eq!(fired, [false, false, false, true, false, false, false, true]);
    }

    #[test]
    fn division_clamps_to_one() {
        let mut tr = TriggerChannel::new();
        tr.set_division(0);
        tr.pulse(Millis(0));
        assert!(tr.is_high());
    }

    #[test]
    fn muted_pulses_are_ignored() {
        let mut tr = TriggerChannel::new();
        tr.set_mute(true);
        tr.pulse(Millis(0));
        assert!(!tr.is_high());
        tr.set_mute(false);
        tr.pulse(Millis(0));
        assert!(tr.is_high());
    }

    #[test]
    fn pulse_end_survives_clock_overflow() {
        let mut tr = TriggerChannel::new();
        tr.set_time(10, TimeUnit::Milliseconds);
        tr.pulse(Millis(u32::MAX - 3));
        tr.update(Millis(u32::MAX));
        assert!(tr.is_high());
        tr.update(Millis(5));
        assert!(tr.is_high());
        tr.update(Millis(6));
        assert!(!tr.is_high());
    }

    #[test]
    fn metro_beats_on_interval() {
        let mut tr = TriggerChannel::new();
        tr.set_time(5, TimeUnit::Milliseconds);
        tr.set_metro_time(100, TimeUnit::Milliseconds);
        tr.set_metro(true, Millis(1000));
        assert_eq!(run(&mut tr, 1000, 1500), 5);
        assert_eq!(tr.next_beat(), Millis(1500));
    }

    #[test]
    fn metro_count_disarms() {
        let mut tr = TriggerChannel::new();
        tr.set_time(5, TimeUnit::Milliseconds);
        tr.set_metro_time(10, TimeUnit::Milliseconds);
        tr.set_metro_count(3);
        tr.set_metro(true, Millis(0));
        assert_eq!(run(&mut tr, 0, 200), 3);
        assert!(!tr.is_metro_armed());

        // re-arming restores the count
        tr.set_metro(true, Millis(200));
        assert_eq!(run(&mut tr, 200, 400), 3);
    }

    #[test]
    fn multiplied_metro_keeps_reference_grid() {
        let mut tr = TriggerChannel::new();
        tr.set_time(1, TimeUnit::Milliseconds);
        tr.set_metro_time(1000, TimeUnit::Milliseconds);
        tr.set_multiplier(3);
        let start = 5_000;
        tr.set_metro(true, Millis(start));

        let mut beats = [0u32; 3];
        let mut fired = 0;
        let mut t = start;
        while fired < 3 {
            let before = tr.next_beat();
            tr.update(Millis(t));
            if tr.next_beat() != before {
                beats[fired] = t;
                fired += 1;
            }
            t += 1;
        }
        assert_eq!(beats, [start, start + 333, start + 666]);
        assert_eq!(tr.next_reference_beat(), Millis(start + 1000));
        assert_eq!(tr.next_beat(), Millis(start + 1000));
    }

    #[test]
    fn multiplied_metro_has_no_long_run_drift() {
        let mut tr = TriggerChannel::new();
        tr.set_time(1, TimeUnit::Milliseconds);
        tr.set_metro_time(1000, TimeUnit::Milliseconds);
        tr.set_multiplier(3);
        tr.set_metro(true, Millis(0));
        let edges = run(&mut tr, 0, 10_000);
        assert_eq!(edges, 30);
        assert_eq!(tr.next_reference_beat(), Millis(10_000));
    }

    #[test]
    fn metro_runs_across_clock_overflow() {
        let mut tr = TriggerChannel::new();
        tr.set_time(2, TimeUnit::Milliseconds);
        tr.set_metro_time(50, TimeUnit::Milliseconds);
        let start = u32::MAX - 120;
        tr.set_metro(true, Millis(start));
        let edges = run(&mut tr, start, start.wrapping_add(500));
        assert_eq!(edges, 10);
    }

    #[test]
    fn width_tracks_metro_time() {
        let mut tr = TriggerChannel::new();
        tr.set_metro_time(200, TimeUnit::Milliseconds);
        tr.set_width(25);
        assert_eq!(tr.pulse_ms(), 50);
        tr.set_metro_time(2, TimeUnit::Seconds);
        assert_eq!(tr.pulse_ms(), 500);
        tr.set_multiplier(4);
        assert_eq!(tr.pulse_ms(), 125);
        tr.set_time(7, TimeUnit::Milliseconds);
        tr.set_metro_time(100, TimeUnit::Milliseconds);
        assert_eq!(tr.pulse_ms(), 7);
    }

    #[test]
    fn kill_cancels_pulse_and_metro() {
        let mut tr = TriggerChannel::new();
        tr.set_metro(true, Millis(0));
        tr.update(Millis(0));
        assert!(tr.is_high());
        tr.kill();
        assert!(!tr.is_metro_armed());
        tr.update(Millis(10_000));
        // the pulse end was cancelled, so the level stays where it was
        assert!(tr.is_high());
    }

    #[test]
    fn reset_restores_defaults() {
        let mut tr = TriggerChannel::new();
        tr.set_polarity(false);
        tr.set_division(3);
        tr.set_mute(true);
        tr.set_metro_count(2);
        tr.set_metro(true, Millis(0));
        tr.set_width(10);
        tr.reset(Millis(0));
        assert!(!tr.is_high());
        assert!(!tr.is_metro_armed());
        assert_eq!(tr.pulse_ms(), DEFAULT_PULSE_MS);
        tr.pulse(Millis(0));
        assert!(tr.is_high());
    }
}
