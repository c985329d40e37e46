//! DMX512 wire protocol: line parameters, timing, and frame encoding
//!
//! DMX512 runs over an RS-485 line at 250 kbaud with 8N2 framing. Each
//! frame starts with a break (line held in the space condition), then a
//! mark-after-break, then the slots: one start code byte followed by up
//! to 512 channel bytes. Receivers are allowed to discard frames whose
//! break or mark-after-break is too short, so a transmitter always errs
//! on the long side of the timing floors.

use std::time::Duration;

/// DMX512 line rate in baud (8 data bits, no parity, 2 stop bits).
pub const DMX_BAUD: u32 = 250_000;

/// Start code for standard dimmer data (the null start code).
pub const DMX_START_CODE: u8 = 0x00;

/// Number of channels in one DMX universe.
pub const UNIVERSE_SIZE: usize = 512;

/// Size of one full frame: the start code plus 512 channel slots.
pub const FRAME_SIZE: usize = UNIVERSE_SIZE + 1;

/// Protocol floor for the break duration in microseconds.
pub const MIN_BREAK_MICROS: u64 = 92;

/// Protocol floor for the mark-after-break in microseconds.
pub const MIN_MAB_MICROS: u64 = 12;

/// Break duration the engine actually transmits.
///
/// Double the 88 us a receiver must accept; oversleeping past this is
/// harmless since the break has no upper bound.
pub const BREAK_MICROS: u64 = 176;

/// Mark-after-break the engine actually transmits (floor is 12 us).
pub const MAB_MICROS: u64 = 48;

/// Slowest supported refresh rate. The protocol keeps receivers alive
/// with frames up to ~1 s apart; rates this low are for bench work.
pub const MIN_REFRESH_HZ: u32 = 1;

/// Fastest supported refresh rate. A full 513-slot frame takes ~23 ms
/// of line time, which caps a continuous full-universe stream at 44 Hz.
pub const MAX_REFRESH_HZ: u32 = 44;

/// Default refresh rate for fixture-friendly output.
pub const DEFAULT_REFRESH_HZ: u32 = 40;

/// Encode one DMX frame: the null start code followed by all 512
/// channel values in channel order.
pub fn encode_frame(channels: &[u8; UNIVERSE_SIZE]) -> [u8; FRAME_SIZE] {
    let mut frame = [0u8; FRAME_SIZE];

    // Slot 0: start code
    frame[0] = DMX_START_CODE;

    // Slots 1-512: channel data
    frame[1..].copy_from_slice(channels);

    frame
}

/// Cycle period for a refresh rate, clamped to the supported window.
pub fn cycle_period(hz: u32) -> Duration {
    let hz = hz.clamp(MIN_REFRESH_HZ, MAX_REFRESH_HZ);
    Duration::from_micros(1_000_000 / u64::from(hz))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layout_all_zero() {
        let frame = encode_frame(&[0u8; UNIVERSE_SIZE]);

        assert_eq!(frame.len(), 513);
        assert!(frame.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_frame_start_code_first() {
        let frame = encode_frame(&[0xffu8; UNIVERSE_SIZE]);

        // Slot 0 is always the null start code, never channel data
        assert_eq!(frame[0], 0x00);
        assert!(frame[1..].iter().all(|&b| b == 0xff));
    }

    #[test]
    fn test_frame_channel_placement() {
        let mut channels = [0u8; UNIVERSE_SIZE];
        channels[0] = 255; // channel 1
        channels[511] = 128; // channel 512

        let frame = encode_frame(&channels);

        assert_eq!(frame[1], 255);
        assert_eq!(frame[512], 128);
        assert!(frame[2..512].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_timing_constants_above_floors() {
        assert!(BREAK_MICROS >= MIN_BREAK_MICROS);
        assert!(MAB_MICROS >= MIN_MAB_MICROS);
    }

    #[test]
    fn test_cycle_period_default() {
        assert_eq!(cycle_period(DEFAULT_REFRESH_HZ), Duration::from_micros(25_000));
    }

    #[test]
    fn test_cycle_period_clamps() {
        assert_eq!(cycle_period(0), cycle_period(MIN_REFRESH_HZ));
        assert_eq!(cycle_period(1_000), cycle_period(MAX_REFRESH_HZ));
        assert_eq!(cycle_period(MAX_REFRESH_HZ), Duration::from_micros(22_727));
    }
}
