//! DAC7565 24-bit command frame layout.
//!
//! Every command is one 24-bit frame, MSB first:
//!
//! | Bits | Field |
//! |------|-------|
//! | 23:22 | reserved (0) |
//! | 21:20 | LD1, LD0 load mode |
//! | 19 | reserved (0) |
//! | 18:17 | DACSEL1, DACSEL0 channel select |
//! | 16 | PD0: 1 = power/reference command |
//! | 15:0 | data, or PD2/PD1 power bits and reference mode |

// ── Load control ───────────────────────────────────────────────────────────

pub const MASK_LD1: u32 = 0x20_0000;
pub const MASK_LD0: u32 = 0x10_0000;

/// Write the selected channel's buffer only.
pub const SINGLE_CHANNEL_STORE: u32 = 0;
/// Write and update the selected channel.
pub const SINGLE_CHANNEL_UPDATE: u32 = MASK_LD0;
/// Write the selected channel and update all channels from their buffers.
pub const SIMULTANEOUS_UPDATE: u32 = MASK_LD1;
/// Write and update all channels with the same value.
pub const BROADCAST_UPDATE: u32 = MASK_LD1 | MASK_LD0;

// ── Channel select ─────────────────────────────────────────────────────────

pub const MASK_DACSEL1: u32 = 0x04_0000;
pub const MASK_DACSEL0: u32 = 0x02_0000;

/// Highest addressable channel (D).
pub const CHANNEL_MAX: u8 = 3;

// ── Power control ──────────────────────────────────────────────────────────

pub const MASK_PD0: u32 = 0x01_0000;
pub const MASK_PD1: u32 = 0x00_8000;
pub const MASK_PD2: u32 = 0x00_4000;

pub const POWER_DOWN_1K: u32 = MASK_PD2;
pub const POWER_DOWN_100K: u32 = MASK_PD1;
pub const POWER_DOWN_HIZ: u32 = MASK_PD2 | MASK_PD1;

// ── Internal reference ─────────────────────────────────────────────────────

pub const REFERENCE_POWERED_TO_DEFAULT: u32 = 0x0000;
pub const REFERENCE_ALWAYS_POWERED_UP: u32 = 0x1000;
pub const REFERENCE_ALWAYS_POWERED_DOWN: u32 = 0x2000;

/// Channel-select bits for channel `0..=3` (A..D).
pub const fn channel_select(channel: u8) -> u32 {
    let mut bits = 0;
    if channel & 0b01 != 0 {
        bits |= MASK_DACSEL0;
    }
    if channel & 0b10 != 0 {
        bits |= MASK_DACSEL1;
    }
    bits
}

/// Split a frame into its three SPI bytes.
pub const fn frame_bytes(frame: u32) -> [u8; 3] {
    [(frame >> 16) as u8, (frame >> 8) as u8, frame as u8]
}
