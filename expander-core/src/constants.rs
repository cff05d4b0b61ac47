/// Audio-rate tick frequency in Hz (Teensy 3.6 class CPU).
#[cfg(feature = "turbo")]
pub const SAMPLE_RATE: u32 = 25_000;

/// Audio-rate tick frequency in Hz (Teensy 3.2 class CPU).
#[cfg(not(feature = "turbo"))]
pub const SAMPLE_RATE: u32 = 15_625;

/// Highest frequency the oscillator accepts.
pub const NYQUIST: u32 = SAMPLE_RATE / 2;

/// Interval between LED refreshes in milliseconds.
pub const LED_RATE_MS: u32 = 50;

/// Ramp time used to pull a decaying envelope back to rest before re-attacking.
pub const RETRIGGER_MS: u32 = 5;

/// Default trigger pulse width (matches the Teletype's own trigger time).
pub const DEFAULT_PULSE_MS: u32 = 100;

/// Default metronome period.
pub const DEFAULT_METRO_MS: u32 = 1000;

/// Envelope attack at power-on.
pub const DEFAULT_ATTACK_MS: u32 = 12;

/// Envelope decay at power-on.
pub const DEFAULT_DECAY_MS: u32 = 250;

/// Envelope attack applied by `reset()`.
pub const RESET_ATTACK_MS: u32 = 7;

/// Envelope decay applied by `reset()`.
pub const RESET_DECAY_MS: u32 = 500;

/// Number of ticks in `ms` milliseconds at [`SAMPLE_RATE`], saturating at `u32::MAX`.
#[inline]
pub const fn ticks_for_ms(ms: u32) -> u32 {
    let ticks = ms as u64 * SAMPLE_RATE as u64 / 1000;
    if ticks > u32::MAX as u64 {
        u32::MAX
    } else {
        ticks as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_scale_with_sample_rate() {
        assert_eq!(ticks_for_ms(0), 0);
        assert_eq!(ticks_for_ms(1000), SAMPLE_RATE);
        assert_eq!(ticks_for_ms(u32::MAX), u32::MAX);
    }
}
