//! Pitch quantization seam.
//!
//! CV channels own two quantizers: one for the CV value path, one for the
//! oscillator frequency path. Values live in the 0..16383 (0..10 V) range
//! used by the V/oct setters; the channel doubles them into DAC units.

use crate::units::{voct_to_frequency, COUNTS_PER_VOLT};

/// Highest V/oct value (10 V).
pub const VOCT_MAX: i32 = 16383;

/// Value of one semitone in V/oct counts.
pub const SEMITONE: f32 = COUNTS_PER_VOLT / 12.0;

/// A value snapped to the active scale together with its pitch.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Quantized {
    /// V/oct value in `0..=16383`.
    pub value: i32,
    /// Frequency of `value` in Hz.
    pub frequency: f32,
}

/// Maps raw V/oct values and scale-degree note numbers onto a scale.
pub trait Quantizer {
    /// Snap `value` to the nearest note of the active scale.
    fn quantize(&self, value: i32) -> Quantized;

    /// V/oct value of scale degree `note` (0 = lowest note of the range).
    fn value_for_note(&self, note: i32) -> i32;

    /// Frequency of scale degree `note`.
    fn frequency_for_note(&self, note: i32) -> f32;

    /// Select the active scale by id.
    fn set_scale(&mut self, scale: i32);
}

/// Pitch-class sets, bit `n` = semitone `n` above the root.
const SCALES: [u16; 6] = [
    0b1111_1111_1111, // chromatic
    0b1010_1011_0101, // major
    0b0101_1010_1101, // natural minor
    0b0010_1001_0101, // major pentatonic
    0b0100_1010_1001, // minor pentatonic
    0b0101_0101_0101, // whole tone
];

const SEMITONES: i32 = 120;

/// Twelve-tone equal temperament over the 10 V range with a handful of
/// pitch-class scales.
///
/// | id | scale |
/// |----|-------|
/// | 0 | chromatic |
/// | 1 | major |
/// | 2 | natural minor |
/// | 3 | major pentatonic |
/// | 4 | minor pentatonic |
/// | 5 | whole tone |
///
/// Unknown ids select chromatic.
#[derive(Debug, Clone, Copy)]
pub struct EqualTemperament {
    mask: u16,
    degrees: [u8; 12],
    degree_count: u8,
}

impl EqualTemperament {
    pub const fn new() -> Self {
        Self::with_mask(SCALES[0])
    }

    const fn with_mask(mask: u16) -> Self {
        let mut degrees = [0u8; 12];
        let mut count = 0;
        let mut pc = 0;
        while pc < 12 {
            if mask & (1 << pc) != 0 {
                degrees[count] = pc as u8;
                count += 1;
            }
            pc += 1;
        }
        EqualTemperament {
            mask,
            degrees,
            degree_count: count as u8,
        }
    }

    fn semitone_value(semitone: i32) -> i32 {
        (semitone * VOCT_MAX + SEMITONES / 2) / SEMITONES
    }

    fn in_scale(&self, semitone: i32) -> bool {
        self.mask & (1 << semitone.rem_euclid(12)) != 0
    }
}

impl Default for EqualTemperament {
    fn default() -> Self {
        Self::new()
    }
}

impl Quantizer for EqualTemperament {
    fn quantize(&self, value: i32) -> Quantized {
        let value = value.clamp(0, VOCT_MAX);
        let nearest = (value * SEMITONES + VOCT_MAX / 2) / VOCT_MAX;
        let mut snapped = nearest;
        // search outward; ties resolve downward
        for distance in 0..=6 {
            if nearest - distance >= 0 && self.in_scale(nearest - distance) {
                snapped = nearest - distance;
                break;
            }
            if nearest + distance <= SEMITONES && self.in_scale(nearest + distance) {
                snapped = nearest + distance;
                break;
            }
        }
        let value = Self::semitone_value(snapped).min(VOCT_MAX);
        Quantized {
            value,
            frequency: voct_to_frequency(value),
        }
    }

    fn value_for_note(&self, note: i32) -> i32 {
        let note = note.max(0);
        let per_octave = self.degree_count as i32;
        let octave = note / per_octave;
        let degree = self.degrees[(note % per_octave) as usize] as i32;
        Self::semitone_value(octave * 12 + degree).min(VOCT_MAX)
    }

    fn frequency_for_note(&self, note: i32) -> f32 {
        voct_to_frequency(self.value_for_note(note))
    }

    fn set_scale(&mut self, scale: i32) {
        let mask = usize::try_from(scale)
            .ok()
            .and_then(|i| SCALES.get(i).copied())
            .unwrap_or(SCALES[0]);
        *self = Self::with_mask(mask);
    }
}
