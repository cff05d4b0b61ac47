/// A multi-channel 16-bit DAC that CV channels write into.
///
/// Implemented by the SPI driver behind the `dac7565` feature, or by any
/// board-specific peripheral wrapper.
pub trait Dac {
    /// Error type for a failed write.
    type Error;

    /// Write a raw 16-bit code to `channel`.
    fn write_channel(&mut self, channel: u8, value: u16) -> Result<(), Self::Error>;
}

/// Remembers the last code sent to a channel so identical codes are not
/// written twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteCache {
    last: Option<u16>,
}

impl WriteCache {
    /// An empty cache; the first write always goes through.
    pub const fn new() -> Self {
        WriteCache { last: None }
    }

    /// Send `value` to `channel` unless it equals the last code written.
    ///
    /// Returns `Ok(true)` when the device was actually written. The cache is
    /// only updated on success so a failed write is retried next tick.
    pub fn write<D: Dac>(&mut self, dac: &mut D, channel: u8, value: u16) -> Result<bool, D::Error> {
        if self.last == Some(value) {
            return Ok(false);
        }
        dac.write_channel(channel, value)?;
        self.last = Some(value);
        Ok(true)
    }

    /// Last code that reached the device.
    pub fn last(&self) -> Option<u16> {
        self.last
    }
}

impl Default for WriteCache {
    fn default() -> Self {
        Self::new()
    }
}
