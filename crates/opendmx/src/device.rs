//! Identification of compatible USB-DMX interfaces
//!
//! Open-DMX class widgets (the Enttec Open DMX USB and its clones) are
//! plain FTDI USB-UART bridges with no protocol intelligence on board.
//! The only way to tell one apart from an arbitrary serial port is its
//! USB vendor/product signature, so discovery is signature matching
//! over the host's port list.

use serde::{Deserialize, Serialize};

use crate::error::{DmxError, Result};
use crate::transport::PortProvider;

/// A USB vendor/product id pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsbId {
    /// USB vendor id
    pub vid: u16,
    /// USB product id
    pub pid: u16,
}

/// FTDI FT232R bridge, as used by the Enttec Open DMX USB.
pub const FTDI_FT232R: UsbId = UsbId {
    vid: 0x0403,
    pid: 0x6001,
};

/// USB signatures accepted as open-DMX transmitters.
pub const OPEN_DMX_SIGNATURES: &[UsbId] = &[FTDI_FT232R];

/// Description of one serial port as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDescriptor {
    /// OS port path, e.g. `/dev/ttyUSB0` or `COM4`
    pub port_name: String,
    /// USB id, if the port is USB-backed at all
    pub usb: Option<UsbId>,
    /// Product string reported by the device, if any
    pub product: Option<String>,
}

impl PortDescriptor {
    /// True if this port carries the given USB signature.
    pub fn matches(&self, id: UsbId) -> bool {
        self.usb == Some(id)
    }
}

/// True if the descriptor matches a known open-DMX bridge signature.
///
/// Pure check over the descriptor; used both to filter enumeration
/// results and to vet a user-selected port.
pub fn is_open_dmx(descriptor: &PortDescriptor) -> bool {
    OPEN_DMX_SIGNATURES.iter().any(|&id| descriptor.matches(id))
}

/// Find the first connected open-DMX interface.
///
/// Returns [`DmxError::DeviceNotFound`] when no port with a compatible
/// USB signature is present.
pub fn find_open_dmx(provider: &dyn PortProvider) -> Result<PortDescriptor> {
    provider
        .list_ports()?
        .into_iter()
        .find(is_open_dmx)
        .ok_or(DmxError::DeviceNotFound)
}
