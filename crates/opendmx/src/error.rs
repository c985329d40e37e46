//! Error types for the DMX engine
use thiserror::Error;

/// DMX engine errors
#[derive(Error, Debug)]
pub enum DmxError {
    /// No compatible USB-DMX interface was found
    #[error("no compatible USB-DMX interface found")]
    DeviceNotFound,

    /// The device is already open
    #[error("device is already open")]
    AlreadyOpen,

    /// The device is not open
    #[error("device is not open")]
    NotOpen,

    /// Channel outside the 1-512 universe address space
    #[error("channel {0} out of range (DMX channels are 1-512)")]
    ChannelOutOfRange(u16),

    /// Transmission loop failure (write or line signaling)
    #[error("transmission failed: {0}")]
    Transmission(String),

    /// Serial backend error
    #[error("serial port error: {0}")]
    #[cfg(feature = "serial")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for DMX operations
pub type Result<T> = std::result::Result<T, DmxError>;
