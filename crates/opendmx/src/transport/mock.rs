//! Recording transport for tests and demos
//!
//! [`MockProvider`] mirrors a machine with a configurable set of serial
//! ports; every port it opens records breaks, frame writes, and its
//! eventual drop into a shared [`PortLog`] that tests inspect after the
//! fact. Cloning the provider shares the underlying state, so a test
//! can keep a clone for inspection while the session owns the original.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{DmxPort, PortProvider};
use crate::device::{PortDescriptor, FTDI_FT232R};
use crate::error::{DmxError, Result};

/// One observable action on a [`MockPort`], in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortEvent {
    /// `set_break(true)`: the break condition was asserted
    BreakAsserted,
    /// `set_break(false)`: the mark-after-break began
    BreakReleased,
    /// One write, carrying the bytes exactly as handed to the port
    Frame(Vec<u8>),
    /// The port was dropped (released back to the OS)
    Closed,
}

/// Everything a [`MockPort`] was asked to do, in order.
#[derive(Debug, Default)]
pub struct PortLog {
    events: Mutex<Vec<PortEvent>>,
}

impl PortLog {
    /// All recorded events, oldest first.
    pub fn events(&self) -> Vec<PortEvent> {
        self.events.lock().clone()
    }

    /// The payload of every frame write, oldest first.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                PortEvent::Frame(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of frame writes recorded so far.
    pub fn frame_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| matches!(event, PortEvent::Frame(_)))
            .count()
    }

    fn push(&self, event: PortEvent) {
        self.events.lock().push(event);
    }
}

#[derive(Default)]
struct ProviderState {
    descriptors: Vec<PortDescriptor>,
    logs: Vec<Arc<PortLog>>,
    fail_writes_after: Option<usize>,
}

/// [`PortProvider`] that hands out in-memory recording ports.
#[derive(Clone, Default)]
pub struct MockProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl MockProvider {
    /// A provider with no ports attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider with a single open-DMX interface plugged in at
    /// `port_name`.
    pub fn with_open_dmx(port_name: &str) -> Self {
        let provider = Self::new();
        provider.add_port(PortDescriptor {
            port_name: port_name.to_string(),
            usb: Some(FTDI_FT232R),
            product: Some("FT232R USB UART".to_string()),
        });
        provider
    }

    /// Plug in another port.
    pub fn add_port(&self, descriptor: PortDescriptor) {
        self.state.lock().descriptors.push(descriptor);
    }

    /// Make every port opened from now on fail its writes after
    /// `frames` successful ones.
    pub fn fail_writes_after(&self, frames: usize) {
        self.state.lock().fail_writes_after = Some(frames);
    }

    /// Log of the most recently opened port, if any was opened.
    pub fn last_log(&self) -> Option<Arc<PortLog>> {
        self.state.lock().logs.last().cloned()
    }

    /// Logs of every port opened so far, in open order.
    pub fn logs(&self) -> Vec<Arc<PortLog>> {
        self.state.lock().logs.clone()
    }
}

impl PortProvider for MockProvider {
    fn list_ports(&self) -> Result<Vec<PortDescriptor>> {
        Ok(self.state.lock().descriptors.clone())
    }

    fn open(&self, descriptor: &PortDescriptor, _baud: u32) -> Result<Box<dyn DmxPort>> {
        let mut state = self.state.lock();
        if !state
            .descriptors
            .iter()
            .any(|d| d.port_name == descriptor.port_name)
        {
            return Err(DmxError::DeviceNotFound);
        }

        let log = Arc::new(PortLog::default());
        state.logs.push(log.clone());

        Ok(Box::new(MockPort {
            name: descriptor.port_name.clone(),
            log,
            fail_writes_after: state.fail_writes_after,
            writes: 0,
        }))
    }
}

/// In-memory port that records instead of transmitting.
pub struct MockPort {
    name: String,
    log: Arc<PortLog>,
    fail_writes_after: Option<usize>,
    writes: usize,
}

impl DmxPort for MockPort {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        if let Some(limit) = self.fail_writes_after {
            if self.writes >= limit {
                return Err(DmxError::Io(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "mock write failure",
                )));
            }
        }
        self.writes += 1;
        self.log.push(PortEvent::Frame(bytes.to_vec()));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn set_break(&mut self, asserted: bool) -> Result<()> {
        self.log.push(if asserted {
            PortEvent::BreakAsserted
        } else {
            PortEvent::BreakReleased
        });
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for MockPort {
    fn drop(&mut self) {
        self.log.push(PortEvent::Closed);
    }
}
