//! Transport abstraction for open-DMX interfaces
//!
//! The engine never talks to hardware directly. It is handed a
//! [`PortProvider`] (enumerate ports, open one) and drives the opened
//! [`DmxPort`] (raw writes plus hardware break control). The stock
//! [`serial`] implementation wraps the `serialport` crate; the [`mock`]
//! implementation records every action for tests and demos.

use crate::device::PortDescriptor;
use crate::error::Result;

/// An open serial transport carrying DMX data.
///
/// A port is exclusively owned by its session once opened; dropping the
/// port releases it back to the OS.
pub trait DmxPort: Send {
    /// Write raw bytes to the line.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Block until buffered bytes have been handed to the device.
    fn flush(&mut self) -> Result<()>;

    /// Assert (`true`) or release (`false`) the line break condition.
    fn set_break(&mut self, asserted: bool) -> Result<()>;

    /// Port path this transport was opened on.
    fn name(&self) -> &str;
}

/// Enumerates serial ports and opens them for DMX output.
pub trait PortProvider: Send {
    /// Descriptors for every serial port currently present.
    fn list_ports(&self) -> Result<Vec<PortDescriptor>>;

    /// Open a port for exclusive use at the given baud rate (8N2).
    fn open(&self, descriptor: &PortDescriptor, baud: u32) -> Result<Box<dyn DmxPort>>;
}

pub mod mock;
#[cfg(feature = "serial")]
pub mod serial;
