//! Uniform stop capability over every output kind.

/// Capability shared by every physical output (CV or trigger).
///
/// A kill stops whatever the output is doing right now: a CV channel jumps
/// to its target, a trigger channel drops pending pulses and its metronome.
pub trait Kill {
    /// Stop all in-flight activity immediately.
    fn kill(&mut self);
}
