//! Serial transport backed by the `serialport` crate

use std::io::Write;
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};
use tracing::{debug, info};

use super::{DmxPort, PortProvider};
use crate::device::{PortDescriptor, UsbId};
use crate::error::Result;

/// Write timeout for the underlying port.
///
/// A full frame is ~23 ms of line time at 250 kbaud; anything slower
/// than this means a wedged adapter, which should surface as an error
/// instead of hanging the transmission thread.
const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

/// [`PortProvider`] backed by the host's real serial ports.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialProvider;

impl SerialProvider {
    /// Create a provider over the host's serial ports.
    pub fn new() -> Self {
        Self
    }
}

impl PortProvider for SerialProvider {
    fn list_ports(&self) -> Result<Vec<PortDescriptor>> {
        let ports = serialport::available_ports()?;

        Ok(ports
            .into_iter()
            .map(|info| {
                let (usb, product) = match info.port_type {
                    SerialPortType::UsbPort(usb) => (
                        Some(UsbId {
                            vid: usb.vid,
                            pid: usb.pid,
                        }),
                        usb.product,
                    ),
                    _ => (None, None),
                };
                PortDescriptor {
                    port_name: info.port_name,
                    usb,
                    product,
                }
            })
            .collect())
    }

    fn open(&self, descriptor: &PortDescriptor, baud: u32) -> Result<Box<dyn DmxPort>> {
        let port = serialport::new(&descriptor.port_name, baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::Two)
            .flow_control(FlowControl::None)
            .timeout(WRITE_TIMEOUT)
            .open()?;

        // Stale bytes from a previous owner must not leak into the first frame
        port.clear(ClearBuffer::All)?;

        info!(
            "Opened serial port {} at {} baud (8N2)",
            descriptor.port_name, baud
        );

        Ok(Box::new(SerialDmxPort {
            name: descriptor.port_name.clone(),
            port,
        }))
    }
}

/// An open serial port transmitting DMX.
struct SerialDmxPort {
    name: String,
    port: Box<dyn SerialPort>,
}

impl DmxPort for SerialDmxPort {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.port.write_all(bytes)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.port.flush()?;
        Ok(())
    }

    fn set_break(&mut self, asserted: bool) -> Result<()> {
        if asserted {
            self.port.set_break()?;
        } else {
            self.port.clear_break()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for SerialDmxPort {
    fn drop(&mut self) {
        debug!("Serial port {} released", self.name);
    }
}
