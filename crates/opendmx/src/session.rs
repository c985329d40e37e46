//! Device session lifecycle
//!
//! [`DeviceSession`] ties one adapter to one channel universe and the
//! loop that transmits it. The lifecycle is explicit: `open` claims
//! the port and `close` releases it, with `start_sending` and
//! `stop_sending` controlling the frame loop in between. Channel
//! writes are accepted in every state and land on the wire with the
//! next frame once output is running.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::info;

use crate::device::{self, PortDescriptor};
use crate::error::{DmxError, Result};
use crate::protocol::{self, UNIVERSE_SIZE};
use crate::transmitter::{SharedPort, SharedUniverse, Transmitter, TransmitterState};
use crate::transport::PortProvider;
use crate::universe::Universe;

/// A session against one open-DMX adapter.
pub struct DeviceSession {
    provider: Box<dyn PortProvider>,
    descriptor: PortDescriptor,
    universe: SharedUniverse,
    port: SharedPort,
    transmitter: Transmitter,
}

impl DeviceSession {
    /// Create a session for a specific port.
    ///
    /// Nothing is opened yet; channel values set now are buffered and
    /// transmitted once the device is opened and sending starts.
    pub fn new(provider: impl PortProvider + 'static, descriptor: PortDescriptor) -> Self {
        Self {
            provider: Box::new(provider),
            descriptor,
            universe: Arc::new(Mutex::new(Universe::new())),
            port: Arc::new(Mutex::new(None)),
            transmitter: Transmitter::new(),
        }
    }

    /// Create a session for the first compatible adapter the provider
    /// reports, or [`DmxError::DeviceNotFound`] when none is connected.
    pub fn auto(provider: impl PortProvider + 'static) -> Result<Self> {
        let descriptor = device::find_open_dmx(&provider)?;
        Ok(Self::new(provider, descriptor))
    }

    /// Descriptor of the adapter this session drives.
    pub fn descriptor(&self) -> &PortDescriptor {
        &self.descriptor
    }

    /// True while the transport is open.
    pub fn is_open(&self) -> bool {
        self.port.lock().is_some()
    }

    /// True from `start_sending` until `stop_sending` (or until a
    /// transmission failure stops the loop).
    pub fn is_sending(&self) -> bool {
        self.transmitter.is_sending()
    }

    /// Current state of the transmission loop.
    pub fn state(&self) -> TransmitterState {
        self.transmitter.state()
    }

    /// Open the transport at the DMX line rate. Does not start sending.
    pub fn open(&mut self) -> Result<()> {
        let mut port = self.port.lock();
        if port.is_some() {
            return Err(DmxError::AlreadyOpen);
        }
        *port = Some(self.provider.open(&self.descriptor, protocol::DMX_BAUD)?);
        info!("DMX device {} opened", self.descriptor.port_name);
        Ok(())
    }

    /// Stop sending if necessary, then release the transport. No frame
    /// is generated after this returns.
    pub fn close(&mut self) -> Result<()> {
        if !self.is_open() {
            return Err(DmxError::NotOpen);
        }
        self.transmitter.stop();
        // Dropping the handle closes the port
        self.port.lock().take();
        info!("DMX device {} closed", self.descriptor.port_name);
        Ok(())
    }

    /// Start the continuous frame loop. No-op when already sending;
    /// fails with [`DmxError::NotOpen`] before `open`.
    pub fn start_sending(&mut self) -> Result<()> {
        self.transmitter
            .start(self.universe.clone(), self.port.clone())
    }

    /// Stop the frame loop. The in-flight frame completes; channel
    /// values and the open port are kept. No-op when already stopped.
    pub fn stop_sending(&mut self) {
        self.transmitter.stop();
    }

    /// Set one channel (1-512) to a value. Valid in any state; while
    /// sending, the value goes out with the next frame.
    pub fn set_channel(&self, channel: u16, value: u8) -> Result<()> {
        self.universe.lock().set(channel, value)
    }

    /// Read one channel back from the buffer.
    pub fn channel(&self, channel: u16) -> Result<u8> {
        self.universe.lock().get(channel)
    }

    /// Copy of the full channel buffer, in channel order.
    pub fn snapshot(&self) -> [u8; UNIVERSE_SIZE] {
        self.universe.lock().snapshot()
    }

    /// Zero every channel: a blackout on the next frame if sending.
    pub fn reset_channels(&self) {
        self.universe.lock().reset();
    }

    /// Change the target refresh rate, clamped to the supported window.
    /// Takes effect from the next cycle, even mid-run.
    pub fn set_refresh_rate(&self, hz: u32) {
        self.transmitter.set_refresh_rate(hz);
    }

    /// Current cycle period of the loop.
    pub fn refresh_period(&self) -> Duration {
        self.transmitter.refresh_period()
    }

    /// Total frames transmitted by this session.
    pub fn frames_sent(&self) -> u64 {
        self.transmitter.frames_sent()
    }

    /// The failure that stopped the loop, if one occurred. Moves the
    /// error out; a second call returns `None`.
    pub fn take_error(&self) -> Option<DmxError> {
        self.transmitter.take_error()
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        if self.is_open() {
            let _ = self.close();
        } else {
            // A failed loop may still hold its thread
            self.transmitter.stop();
        }
    }
}
