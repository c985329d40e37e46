//! OpenDMX - DMX512 output for open (raw) USB-DMX interfaces
//!
//! "Open" DMX widgets (the Enttec Open DMX USB and its FT232R clones)
//! are plain USB-serial bridges with no protocol intelligence on board.
//! The host generates the entire DMX512 signal itself: the break, the
//! mark-after-break, the start code, and the 512 channel bytes, cycled
//! continuously for as long as the rig is live. This crate provides:
//! - **Device identification**: USB signature matching for the
//!   supported bridge family ([`device`])
//! - **Channel buffer**: the 512-channel universe ([`universe`])
//! - **Frame encoding**: start code plus channel data ([`protocol`])
//! - **Transmission loop**: timed break/MAB/data cycles at a stable
//!   refresh rate on a background thread ([`transmitter`])
//! - **Session lifecycle**: open, start, stop, close, with channel
//!   writes accepted in any state ([`session`])
//!
//! ## Feature Flags
//!
//! - `serial` (default): the real serial backend (requires `serialport`)
//!
//! ## Quick Start
//!
//! ```rust
//! use opendmx::{DeviceSession, Fixture, MockProvider};
//!
//! # fn main() -> opendmx::Result<()> {
//! // MockProvider records instead of transmitting; use SerialProvider
//! // for real hardware.
//! let provider = MockProvider::with_open_dmx("/dev/ttyUSB0");
//! let mut session = DeviceSession::auto(provider)?;
//!
//! // Channel values buffer in any state and hit the wire once
//! // sending starts
//! let par = Fixture::rgb("front par", 25).with_dimmer(4);
//! par.set_rgb(&session, 255, 128, 0)?;
//!
//! session.open()?;
//! session.start_sending()?;
//! // ~40 frames per second go out until stopped
//! session.stop_sending();
//! session.close()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

/// Error types
pub mod error;

/// USB-DMX interface identification
pub mod device;

/// Wire protocol constants and frame encoding
pub mod protocol;

/// The 512-channel universe buffer
pub mod universe;

/// Port providers and the DMX port abstraction
pub mod transport;

/// The continuous transmission loop
pub mod transmitter;

/// Device session lifecycle
pub mod session;

/// Caller-side fixture channel mapping
pub mod fixture;

// Re-exports
pub use device::{find_open_dmx, is_open_dmx, PortDescriptor, UsbId, FTDI_FT232R};
pub use error::{DmxError, Result};
pub use fixture::{ChannelType, Fixture};
pub use protocol::{
    encode_frame, DEFAULT_REFRESH_HZ, DMX_BAUD, DMX_START_CODE, FRAME_SIZE, MAX_REFRESH_HZ,
    MIN_REFRESH_HZ, UNIVERSE_SIZE,
};
pub use session::DeviceSession;
pub use transmitter::TransmitterState;
pub use transport::mock::MockProvider;
pub use transport::{DmxPort, PortProvider};
pub use universe::Universe;

#[cfg(feature = "serial")]
pub use transport::serial::SerialProvider;
