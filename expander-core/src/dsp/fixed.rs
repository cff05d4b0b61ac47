//! Fixed-point encodings used by the CV path.

use core::ops::{Add, AddAssign, Sub};

use super::intrinsics::saturate16;

/// Fractional bits carried below a 16-bit CV value while slewing.
pub const LEVEL_FRAC_BITS: u32 = 15;

/// A CV value in Q16.15: the signed 16-bit output value shifted left by
/// [`LEVEL_FRAC_BITS`] so slews can move by less than one DAC step per tick.
///
/// Any value built from a clamped 16-bit sample stays within
/// `-2^30..2^30`, so the difference of two levels always fits an `i32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Level(i32);

impl Level {
    pub const ZERO: Level = Level(0);

    /// Encode a CV value, saturating it to the 16-bit range first.
    #[inline]
    pub fn from_value(value: i32) -> Level {
        Level((saturate16(value) as i32) << LEVEL_FRAC_BITS)
    }

    /// Raw fixed-point representation.
    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Build from a raw fixed-point representation.
    #[inline]
    pub const fn from_raw(raw: i32) -> Level {
        Level(raw)
    }

    /// Integer CV value (fraction truncated toward negative infinity).
    #[inline]
    pub const fn value(self) -> i32 {
        self.0 >> LEVEL_FRAC_BITS
    }
}

impl Add<i32> for Level {
    type Output = Level;

    #[inline]
    fn add(self, delta: i32) -> Level {
        Level(self.0.wrapping_add(delta))
    }
}

impl AddAssign<i32> for Level {
    #[inline]
    fn add_assign(&mut self, delta: i32) {
        self.0 = self.0.wrapping_add(delta);
    }
}

impl Sub for Level {
    type Output = i32;

    /// Signed distance between two levels in raw fixed-point units.
    #[inline]
    fn sub(self, other: Level) -> i32 {
        self.0.wrapping_sub(other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_round_trips_value() {
        assert_eq!(Level::from_value(1234).value(), 1234);
        assert_eq!(Level::from_value(-1234).value(), -1234);
        assert_eq!(Level::from_value(1).raw(), 1 << 15);
    }

    #[test]
    fn level_saturates_input() {
        assert_eq!(Level::from_value(100_000).value(), 32767);
        assert_eq!(Level::from_value(-100_000).value(), -32768);
    }

    #[test]
    fn full_range_distance_fits() {
        let top = Level::from_value(32767);
        let bottom = Level::from_value(-32768);
        assert_eq!(top - bottom, 65535 << 15);
        assert_eq!(bottom - top, -(65535 << 15));
    }
}
