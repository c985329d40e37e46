//! The 512-channel universe buffer

use crate::error::{DmxError, Result};
use crate::protocol::UNIVERSE_SIZE;

/// One universe of DMX channel data.
///
/// Channels are addressed 1-512, matching fixture displays and patch
/// sheets; slot 0 of the wire frame is the start code and is not stored
/// here. Values are plain `u8`, so the 0-255 protocol bound holds by
/// construction. A fresh universe is all zeros (blackout).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    channels: [u8; UNIVERSE_SIZE],
}

impl Universe {
    /// Create a universe with every channel at zero.
    pub fn new() -> Self {
        Self {
            channels: [0; UNIVERSE_SIZE],
        }
    }

    /// Set one channel to a value.
    ///
    /// Fails with [`DmxError::ChannelOutOfRange`] for channel 0 or any
    /// channel past 512, leaving the buffer untouched.
    pub fn set(&mut self, channel: u16, value: u8) -> Result<()> {
        self.channels[Self::index(channel)?] = value;
        Ok(())
    }

    /// Read one channel back.
    pub fn get(&self, channel: u16) -> Result<u8> {
        Ok(self.channels[Self::index(channel)?])
    }

    /// Copy of the current channel data, in channel order.
    pub fn snapshot(&self) -> [u8; UNIVERSE_SIZE] {
        self.channels
    }

    /// Zero every channel.
    pub fn reset(&mut self) {
        self.channels = [0; UNIVERSE_SIZE];
    }

    // Channel 1 lives at index 0
    fn index(channel: u16) -> Result<usize> {
        if channel == 0 || channel as usize > UNIVERSE_SIZE {
            return Err(DmxError::ChannelOutOfRange(channel));
        }
        Ok(usize::from(channel) - 1)
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::new()
    }
}
