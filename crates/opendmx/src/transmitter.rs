//! The continuous DMX transmission loop
//!
//! Open-DMX hardware has no frame buffer of its own, so output only
//! exists while the host keeps generating it. One background thread per
//! sending session runs the cycle: assert the break, release it for the
//! mark-after-break, write one encoded frame, then idle until the next
//! cycle deadline. The thread owns nothing; the universe and the port
//! stay behind session-held locks so `stop` and `close` can always
//! reclaim them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{error, info, trace};

use crate::error::{DmxError, Result};
use crate::protocol::{self, BREAK_MICROS, MAB_MICROS};
use crate::transport::DmxPort;
use crate::universe::Universe;

/// Universe shared between the caller (writes) and the loop (snapshots).
pub(crate) type SharedUniverse = Arc<Mutex<Universe>>;

/// Open port shared between the session and the loop; `None` while the
/// device is closed.
pub(crate) type SharedPort = Arc<Mutex<Option<Box<dyn DmxPort>>>>;

/// Lifecycle of the transmission loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitterState {
    /// No loop thread is running
    Stopped,
    /// The loop thread is spawned but has not sent its first frame
    Starting,
    /// Frames are being generated continuously
    Running,
    /// A stop was requested; the in-flight frame may still complete
    Stopping,
}

enum LoopCommand {
    Stop,
}

/// Drives the continuous frame cycle for one session.
pub(crate) struct Transmitter {
    state: Arc<Mutex<TransmitterState>>,
    period: Arc<Mutex<Duration>>,
    last_error: Arc<Mutex<Option<DmxError>>>,
    frames_sent: Arc<AtomicU64>,
    commands: Option<Sender<LoopCommand>>,
    handle: Option<JoinHandle<()>>,
}

impl Transmitter {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(TransmitterState::Stopped)),
            period: Arc::new(Mutex::new(protocol::cycle_period(
                protocol::DEFAULT_REFRESH_HZ,
            ))),
            last_error: Arc::new(Mutex::new(None)),
            frames_sent: Arc::new(AtomicU64::new(0)),
            commands: None,
            handle: None,
        }
    }

    pub(crate) fn state(&self) -> TransmitterState {
        *self.state.lock()
    }

    /// True from a successful `start` until `stop` or a loop failure.
    pub(crate) fn is_sending(&self) -> bool {
        matches!(
            self.state(),
            TransmitterState::Starting | TransmitterState::Running
        )
    }

    /// Change the target refresh rate, clamped to the supported window.
    /// Takes effect from the next cycle, even mid-run.
    pub(crate) fn set_refresh_rate(&self, hz: u32) {
        *self.period.lock() = protocol::cycle_period(hz);
    }

    pub(crate) fn refresh_period(&self) -> Duration {
        *self.period.lock()
    }

    pub(crate) fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    /// The failure that stopped the loop, if one occurred. Moves the
    /// error out; a second call returns `None`.
    pub(crate) fn take_error(&self) -> Option<DmxError> {
        self.last_error.lock().take()
    }

    /// Spawn the loop thread. No-op when already sending; fails with
    /// [`DmxError::NotOpen`] when no port is open.
    pub(crate) fn start(&mut self, universe: SharedUniverse, port: SharedPort) -> Result<()> {
        if self.is_sending() {
            return Ok(());
        }
        // Reap a thread that exited on its own after a write failure
        self.join_loop_thread();

        if port.lock().is_none() {
            return Err(DmxError::NotOpen);
        }

        *self.last_error.lock() = None;
        *self.state.lock() = TransmitterState::Starting;

        let (tx, rx) = bounded(1);
        let ctx = LoopContext {
            universe,
            port,
            period: self.period.clone(),
            state: self.state.clone(),
            last_error: self.last_error.clone(),
            frames_sent: self.frames_sent.clone(),
            commands: rx,
        };

        match thread::Builder::new()
            .name("dmx-tx".to_string())
            .spawn(move || run_loop(ctx))
        {
            Ok(handle) => {
                self.handle = Some(handle);
                self.commands = Some(tx);
                Ok(())
            }
            Err(e) => {
                *self.state.lock() = TransmitterState::Stopped;
                Err(e.into())
            }
        }
    }

    /// Stop the loop and join its thread. The in-flight frame completes;
    /// no frame starts after this returns. No-op when already stopped.
    pub(crate) fn stop(&mut self) {
        {
            let mut state = self.state.lock();
            if *state != TransmitterState::Stopped {
                *state = TransmitterState::Stopping;
            }
        }

        // Wakes the loop out of its inter-frame idle immediately; a send
        // to an already-exited loop is fine
        if let Some(commands) = self.commands.take() {
            let _ = commands.send(LoopCommand::Stop);
        }
        self.join_loop_thread();

        *self.state.lock() = TransmitterState::Stopped;
    }

    fn join_loop_thread(&mut self) {
        self.commands = None;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct LoopContext {
    universe: SharedUniverse,
    port: SharedPort,
    period: Arc<Mutex<Duration>>,
    state: Arc<Mutex<TransmitterState>>,
    last_error: Arc<Mutex<Option<DmxError>>>,
    frames_sent: Arc<AtomicU64>,
    commands: Receiver<LoopCommand>,
}

fn run_loop(ctx: LoopContext) {
    {
        // A stop may already have raced in; never promote past it
        let mut state = ctx.state.lock();
        if *state == TransmitterState::Starting {
            *state = TransmitterState::Running;
        }
    }
    info!("DMX transmission started");

    let mut deadline = Instant::now();
    loop {
        if let Err(e) = send_cycle(&ctx) {
            let e = match e {
                DmxError::Transmission(_) => e,
                other => DmxError::Transmission(other.to_string()),
            };
            error!("DMX transmission stopped: {}", e);
            *ctx.last_error.lock() = Some(e);
            *ctx.state.lock() = TransmitterState::Stopped;
            return;
        }
        ctx.frames_sent.fetch_add(1, Ordering::Relaxed);
        trace!("Sent DMX frame");

        deadline += *ctx.period.lock();
        let now = Instant::now();
        let idle = deadline.saturating_duration_since(now);
        if idle.is_zero() {
            // The frame took longer than the period; restart the
            // schedule from now rather than bursting to catch up
            deadline = now;
        }

        match ctx.commands.recv_timeout(idle) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(LoopCommand::Stop) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    info!("DMX transmission stopped");
}

/// One full cycle: snapshot the universe, then break, mark-after-break,
/// and frame bytes as a single unit under the port lock.
fn send_cycle(ctx: &LoopContext) -> Result<()> {
    let snapshot = ctx.universe.lock().snapshot();
    let frame = protocol::encode_frame(&snapshot);

    let mut guard = ctx.port.lock();
    let port = guard.as_mut().ok_or(DmxError::NotOpen)?;

    port.set_break(true)?;
    thread::sleep(Duration::from_micros(BREAK_MICROS));
    port.set_break(false)?;
    thread::sleep(Duration::from_micros(MAB_MICROS));

    port.write_all(&frame)?;
    port.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockProvider;
    use crate::transport::PortProvider;

    fn shared_universe() -> SharedUniverse {
        Arc::new(Mutex::new(Universe::new()))
    }

    fn open_mock_port(provider: &MockProvider) -> SharedPort {
        let descriptor = provider.list_ports().unwrap().remove(0);
        let port = provider.open(&descriptor, protocol::DMX_BAUD).unwrap();
        Arc::new(Mutex::new(Some(port)))
    }

    fn wait_for_frames(provider: &MockProvider, count: usize) {
        let log = provider.last_log().unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        while log.frame_count() < count {
            assert!(Instant::now() < deadline, "timed out waiting for frames");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_start_without_port_fails() {
        let mut transmitter = Transmitter::new();
        let port: SharedPort = Arc::new(Mutex::new(None));

        let err = transmitter.start(shared_universe(), port).unwrap_err();

        assert!(matches!(err, DmxError::NotOpen));
        assert_eq!(transmitter.state(), TransmitterState::Stopped);
    }

    #[test]
    fn test_stop_when_stopped_is_noop() {
        let mut transmitter = Transmitter::new();
        transmitter.stop();
        transmitter.stop();
        assert_eq!(transmitter.state(), TransmitterState::Stopped);
    }

    #[test]
    fn test_start_is_idempotent() {
        let provider = MockProvider::with_open_dmx("mock0");
        let port = open_mock_port(&provider);
        let mut transmitter = Transmitter::new();

        transmitter.start(shared_universe(), port.clone()).unwrap();
        transmitter.start(shared_universe(), port).unwrap();
        wait_for_frames(&provider, 2);
        transmitter.stop();

        // A second loop would have opened a second log
        assert_eq!(provider.logs().len(), 1);
        assert_eq!(
            transmitter.frames_sent(),
            provider.last_log().unwrap().frame_count() as u64
        );
    }

    #[test]
    fn test_frames_carry_current_universe() {
        let provider = MockProvider::with_open_dmx("mock0");
        let port = open_mock_port(&provider);
        let universe = shared_universe();
        universe.lock().set(25, 255).unwrap();

        let mut transmitter = Transmitter::new();
        transmitter.start(universe, port).unwrap();
        wait_for_frames(&provider, 1);
        transmitter.stop();

        let frames = provider.last_log().unwrap().frames();
        assert_eq!(frames[0].len(), protocol::FRAME_SIZE);
        assert_eq!(frames[0][0], protocol::DMX_START_CODE);
        assert_eq!(frames[0][25], 255);
    }

    #[test]
    fn test_write_failure_stops_loop_and_surfaces_error() {
        let provider = MockProvider::with_open_dmx("mock0");
        provider.fail_writes_after(2);
        let port = open_mock_port(&provider);

        let mut transmitter = Transmitter::new();
        transmitter.start(shared_universe(), port).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while transmitter.is_sending() {
            assert!(Instant::now() < deadline, "loop did not stop on failure");
            thread::sleep(Duration::from_millis(2));
        }

        assert_eq!(provider.last_log().unwrap().frame_count(), 2);
        assert!(matches!(
            transmitter.take_error(),
            Some(DmxError::Transmission(_))
        ));
        // The error moves out on first read
        assert!(transmitter.take_error().is_none());

        // A fresh start clears the failure and runs again
        provider.fail_writes_after(usize::MAX);
        let port = open_mock_port(&provider);
        transmitter.start(shared_universe(), port).unwrap();
        wait_for_frames(&provider, 1);
        transmitter.stop();
        assert!(transmitter.take_error().is_none());
    }

    #[test]
    fn test_refresh_rate_is_clamped() {
        let transmitter = Transmitter::new();

        transmitter.set_refresh_rate(10_000);
        assert_eq!(
            transmitter.refresh_period(),
            protocol::cycle_period(protocol::MAX_REFRESH_HZ)
        );

        transmitter.set_refresh_rate(0);
        assert_eq!(
            transmitter.refresh_period(),
            protocol::cycle_period(protocol::MIN_REFRESH_HZ)
        );
    }
}
