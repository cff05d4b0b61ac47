//! Linear ramp planning shared by CV slews and the envelope legs.

use super::fixed::Level;
use crate::constants::ticks_for_ms;

/// A planned linear ramp.
///
/// The owner applies `delta` on each of the first `steps - 1` ticks and then
/// snaps to the target on the last one, so truncation in `delta` never
/// accumulates into the final value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlewSteps {
    /// Requested ramp time in milliseconds.
    pub duration: u32,
    /// Ticks remaining, including the final snap. Never 0 for a fresh plan.
    pub steps: u32,
    /// Raw fixed-point increment per tick.
    pub delta: i32,
}

impl SlewSteps {
    /// A plan with no work left.
    pub const IDLE: SlewSteps = SlewSteps { duration: 0, steps: 0, delta: 0 };

    /// Re-aim a running ramp at a new `target`, keeping the ticks it has left.
    ///
    /// A ramp on its final tick (or finished) becomes a single full step.
    pub fn retarget(self, target: Level, current: Level) -> SlewSteps {
        let distance = target - current;
        if self.steps <= 1 {
            return SlewSteps {
                steps: 1,
                delta: distance,
                ..self
            };
        }
        SlewSteps {
            delta: distance / (self.steps - 1) as i32,
            ..self
        }
    }
}

/// Plan a ramp from `current` to `target` lasting `duration_ms`.
///
/// Zero duration or equal endpoints produce a single step whose delta is the
/// full distance. Otherwise the ramp gets one tick per sample period plus a
/// final guard tick that performs the snap.
pub fn compute_slew(duration_ms: u32, target: Level, current: Level) -> SlewSteps {
    let distance = target - current;
    let ticks = ticks_for_ms(duration_ms);
    if duration_ms == 0 || distance == 0 || ticks == 0 {
        return SlewSteps {
            duration: duration_ms,
            steps: 1,
            delta: distance,
        };
    }
    let ticks = ticks.min(i32::MAX as u32 - 1);
    SlewSteps {
        duration: duration_ms,
        steps: ticks + 1,
        delta: distance / ticks as i32,
    }
}
