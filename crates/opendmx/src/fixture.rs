//! Fixture channel mapping
//!
//! Which channel drives which function of a fixture is patching, a
//! rig convention rather than a protocol fact, so the session API
//! speaks plain channel numbers. This module carries a caller's chosen
//! mapping: a fixture is a start address plus function offsets, and
//! repatching means changing the start address only. Offsets may leave
//! gaps, as cheap RGB pars with unused mode channels often do.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::DeviceSession;

/// Function of a mapped channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelType {
    /// Master intensity
    Dimmer,
    /// Red component
    Red,
    /// Green component
    Green,
    /// Blue component
    Blue,
    /// Amber component
    Amber,
    /// White component
    White,
    /// Anything else (mode, macro, speed)
    Generic,
}

/// A fixture patched at a start address, with functions at fixed
/// offsets from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    /// Human-readable fixture name
    pub name: String,
    /// First channel of the fixture (1-512)
    pub start_address: u16,
    /// Function layout as (function, offset from start) pairs
    pub channels: Vec<(ChannelType, u16)>,
}

impl Fixture {
    /// A fixture with no functions mapped yet.
    pub fn new(name: impl Into<String>, start_address: u16) -> Self {
        Self {
            name: name.into(),
            start_address,
            channels: Vec::new(),
        }
    }

    /// An RGB par: red at the start address, green and blue on the two
    /// channels after it.
    pub fn rgb(name: impl Into<String>, start_address: u16) -> Self {
        Self::new(name, start_address)
            .with_channel(ChannelType::Red, 0)
            .with_channel(ChannelType::Green, 1)
            .with_channel(ChannelType::Blue, 2)
    }

    /// Map a function at an offset from the start address.
    pub fn with_channel(mut self, channel_type: ChannelType, offset: u16) -> Self {
        self.channels.push((channel_type, offset));
        self
    }

    /// Map the dimmer at an offset from the start address.
    pub fn with_dimmer(self, offset: u16) -> Self {
        self.with_channel(ChannelType::Dimmer, offset)
    }

    /// Absolute channel of the first mapping for a function, if mapped.
    pub fn channel(&self, channel_type: ChannelType) -> Option<u16> {
        self.channels
            .iter()
            .find(|(ty, _)| *ty == channel_type)
            .map(|(_, offset)| self.start_address.saturating_add(*offset))
    }

    /// Write a value to every mapping of a function.
    ///
    /// Fails with [`crate::DmxError::ChannelOutOfRange`] if the patch
    /// places the function past channel 512.
    pub fn set_value(
        &self,
        session: &DeviceSession,
        channel_type: ChannelType,
        value: u8,
    ) -> Result<()> {
        for (ty, offset) in &self.channels {
            if *ty == channel_type {
                session.set_channel(self.start_address.saturating_add(*offset), value)?;
            }
        }
        Ok(())
    }

    /// Write a color to the red, green, and blue mappings.
    pub fn set_rgb(&self, session: &DeviceSession, r: u8, g: u8, b: u8) -> Result<()> {
        self.set_value(session, ChannelType::Red, r)?;
        self.set_value(session, ChannelType::Green, g)?;
        self.set_value(session, ChannelType::Blue, b)?;
        Ok(())
    }

    /// Write the master intensity.
    pub fn set_dimmer(&self, session: &DeviceSession, value: u8) -> Result<()> {
        self.set_value(session, ChannelType::Dimmer, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockProvider;

    fn session() -> DeviceSession {
        DeviceSession::auto(MockProvider::with_open_dmx("mock0")).unwrap()
    }

    #[test]
    fn test_rgb_layout() {
        let par = Fixture::rgb("front par", 25);

        assert_eq!(par.channel(ChannelType::Red), Some(25));
        assert_eq!(par.channel(ChannelType::Green), Some(26));
        assert_eq!(par.channel(ChannelType::Blue), Some(27));
        assert_eq!(par.channel(ChannelType::Dimmer), None);
    }

    #[test]
    fn test_dimmer_offset_may_leave_a_gap() {
        // RGB on 25-27, nothing on 28, dimmer on 29
        let par = Fixture::rgb("front par", 25).with_dimmer(4);

        assert_eq!(par.channel(ChannelType::Dimmer), Some(29));
    }

    #[test]
    fn test_set_rgb_writes_through_session() {
        let session = session();
        let par = Fixture::rgb("front par", 25).with_dimmer(4);

        par.set_rgb(&session, 255, 128, 64).unwrap();
        par.set_dimmer(&session, 200).unwrap();

        assert_eq!(session.channel(25).unwrap(), 255);
        assert_eq!(session.channel(26).unwrap(), 128);
        assert_eq!(session.channel(27).unwrap(), 64);
        assert_eq!(session.channel(28).unwrap(), 0);
        assert_eq!(session.channel(29).unwrap(), 200);
    }

    #[test]
    fn test_patch_past_universe_end_fails() {
        let session = session();
        let par = Fixture::rgb("edge par", 511);

        // Blue would land on channel 513
        assert!(par.set_rgb(&session, 1, 2, 3).is_err());
    }

    #[test]
    fn test_repatch_by_start_address() {
        let mut par = Fixture::rgb("par", 25);
        par.start_address = 101;

        assert_eq!(par.channel(ChannelType::Red), Some(101));
        assert_eq!(par.channel(ChannelType::Blue), Some(103));
    }

    #[test]
    fn test_fixture_serde_round_trip() {
        let par = Fixture::rgb("front par", 25).with_dimmer(4);

        let json = serde_json::to_string(&par).unwrap();
        let restored: Fixture = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, par);
    }
}
