//! Unit conversions shared by the setter catalog.

/// Unit attached to a time-valued parameter on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeUnit {
    Milliseconds,
    Seconds,
    Minutes,
    /// Beats per minute; converted to the period of one beat.
    Bpm,
}

impl TimeUnit {
    /// Decode the wire code (0 = ms, 1 = s, 2 = min, 3 = bpm).
    ///
    /// Unknown codes fall back to milliseconds.
    pub const fn from_code(code: i32) -> Self {
        match code {
            1 => TimeUnit::Seconds,
            2 => TimeUnit::Minutes,
            3 => TimeUnit::Bpm,
            _ => TimeUnit::Milliseconds,
        }
    }

    /// Convert `value` in this unit to milliseconds.
    ///
    /// Negative values clamp to zero; a tempo of zero clamps to 1 bpm.
    pub const fn to_ms(self, value: i32) -> u32 {
        let value = if value < 0 { 0 } else { value as u32 };
        match self {
            TimeUnit::Milliseconds => value,
            TimeUnit::Seconds => value.saturating_mul(1_000),
            TimeUnit::Minutes => value.saturating_mul(60_000),
            TimeUnit::Bpm => {
                let bpm = if value == 0 { 1 } else { value };
                60_000 / bpm
            }
        }
    }
}

/// Lowest frequency of the V/oct range (C0).
const C0_HZ: f32 = 16.351_597;

/// DAC counts per volt in the 0..16383 pitch range (10 V span).
pub const COUNTS_PER_VOLT: f32 = 1638.3;

/// Convert a 0..16383 V/oct value to a frequency in Hz.
///
/// 0 maps to half of C0, each 1638.3 counts doubles the frequency.
pub fn voct_to_frequency(value: i32) -> f32 {
    C0_HZ * libm::exp2f(value as f32 / COUNTS_PER_VOLT - 1.0)
}
