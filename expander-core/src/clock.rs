//! Wrapping millisecond time base.
//!
//! The firmware clock is a free-running 32-bit millisecond counter that
//! overflows roughly every 49.7 days. All ordering between two instants is
//! therefore modular: `a` is at or after `b` when `a - b` (wrapping) lands in
//! the lower half of the `u32` range.

use core::ops::Add;

/// A point on the wrapping millisecond clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Millis(pub u32);

impl Millis {
    /// Raw counter value.
    #[inline]
    pub const fn ticks(self) -> u32 {
        self.0
    }

    /// True when `self` is at or after `other`, tolerant of counter overflow.
    #[inline]
    pub const fn reached(self, other: Millis) -> bool {
        (self.0.wrapping_sub(other.0) as i32) >= 0
    }

    /// Milliseconds from `earlier` to `self`, modulo 2^32.
    #[inline]
    pub const fn since(self, earlier: Millis) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }
}

impl Add<u32> for Millis {
    type Output = Millis;

    #[inline]
    fn add(self, ms: u32) -> Millis {
        Millis(self.0.wrapping_add(ms))
    }
}

/// A monotonic millisecond source (SysTick counter, RTIC monotonic, ...).
pub trait Clock {
    /// Current time.
    fn now(&self) -> Millis;
}
