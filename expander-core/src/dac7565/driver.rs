//! DAC7565 SPI driver.
//!
//! Generic over any [`embedded_hal::spi::SpiDevice`]; the device handles
//! the SYNC (chip select) line around each 24-bit frame. Tie LDAC low so
//! single-channel updates take effect immediately.
//!
//! # Example
//!
//! ```ignore
//! let mut dac = Dac7565::new(spi);
//! dac.set_reference(Reference::AlwaysPoweredUp)?;
//! dac.write(Target::All, 32767)?;     // every output to mid-scale
//! dac.write(Target::Channel(2), 0)?;  // channel C
//! ```

use embedded_hal::spi::SpiDevice;

use super::registers as reg;
use crate::dac::Dac;
use crate::log::debug;

/// Channel addressed by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Target {
    /// Channel `0..=3` (A..D).
    Channel(u8),
    /// All four channels.
    All,
}

/// Internal reference mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reference {
    /// Powered while any channel is powered.
    PoweredToDefault,
    AlwaysPoweredUp,
    /// Use an external reference.
    AlwaysPoweredDown,
}

/// Channel power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerDown {
    /// Normal operation.
    PowerUp,
    /// Output pulled to ground through 1 kΩ.
    Pulldown1k,
    /// Output pulled to ground through 100 kΩ.
    Pulldown100k,
    HighImpedance,
}

/// TI DAC7565 / DAC8564 quad DAC.
pub struct Dac7565<SPI> {
    spi: SPI,
}

impl<SPI: SpiDevice> Dac7565<SPI> {
    pub fn new(spi: SPI) -> Self {
        Dac7565 { spi }
    }

    /// Release the SPI device.
    pub fn release(self) -> SPI {
        self.spi
    }

    /// Send one raw 24-bit frame.
    pub fn write_frame(&mut self, frame: u32) -> Result<(), SPI::Error> {
        self.spi.write(&reg::frame_bytes(frame))
    }

    /// Load mode and channel bits for `target`, or `None` for a bad channel.
    fn address(target: Target, single: u32) -> Option<u32> {
        match target {
            Target::Channel(channel) if channel <= reg::CHANNEL_MAX => Some(single | reg::channel_select(channel)),
            Target::Channel(_) => None,
            Target::All => Some(reg::BROADCAST_UPDATE | reg::MASK_DACSEL1),
        }
    }

    /// Write and update `target`. Channels past D are ignored.
    pub fn write(&mut self, target: Target, value: u16) -> Result<(), SPI::Error> {
        match Self::address(target, reg::SINGLE_CHANNEL_UPDATE) {
            Some(bits) => self.write_frame(bits | value as u32),
            None => {
                debug!("dac7565: no channel {}", target);
                Ok(())
            }
        }
    }

    /// Load a channel buffer without changing the output.
    pub fn store(&mut self, channel: u8, value: u16) -> Result<(), SPI::Error> {
        match Self::address(Target::Channel(channel), reg::SINGLE_CHANNEL_STORE) {
            Some(bits) => self.write_frame(bits | value as u32),
            None => Ok(()),
        }
    }

    /// Write `channel` and move every stored buffer to the outputs at once.
    pub fn write_and_update_all(&mut self, channel: u8, value: u16) -> Result<(), SPI::Error> {
        match Self::address(Target::Channel(channel), reg::SIMULTANEOUS_UPDATE) {
            Some(bits) => self.write_frame(bits | value as u32),
            None => Ok(()),
        }
    }

    /// Select the internal reference mode.
    pub fn set_reference(&mut self, reference: Reference) -> Result<(), SPI::Error> {
        let mode = match reference {
            Reference::PoweredToDefault => reg::REFERENCE_POWERED_TO_DEFAULT,
            Reference::AlwaysPoweredUp => reg::REFERENCE_ALWAYS_POWERED_UP,
            Reference::AlwaysPoweredDown => reg::REFERENCE_ALWAYS_POWERED_DOWN,
        };
        debug!("dac7565: reference {}", reference);
        self.write_frame(reg::MASK_PD0 | mode)
    }

    /// Power a channel (or all) up or down.
    pub fn set_channel_power(&mut self, target: Target, power: PowerDown) -> Result<(), SPI::Error> {
        let power = match power {
            PowerDown::PowerUp => 0,
            PowerDown::Pulldown1k => reg::POWER_DOWN_1K,
            PowerDown::Pulldown100k => reg::POWER_DOWN_100K,
            PowerDown::HighImpedance => reg::POWER_DOWN_HIZ,
        };
        match Self::address(target, reg::SINGLE_CHANNEL_UPDATE) {
            Some(bits) => self.write_frame(bits | reg::MASK_PD0 | power),
            None => Ok(()),
        }
    }
}

impl<SPI: SpiDevice> Dac for Dac7565<SPI> {
    type Error = SPI::Error;

    fn write_channel(&mut self, channel: u8, value: u16) -> Result<(), SPI::Error> {
        self.write(Target::Channel(channel), value)
    }
}
