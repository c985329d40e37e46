//! Integration tests for transmission loop timing and line discipline

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use opendmx::transport::mock::{MockProvider, PortEvent, PortLog};
use opendmx::{DeviceSession, FRAME_SIZE, MAX_REFRESH_HZ};

fn sending_session(provider: &MockProvider) -> DeviceSession {
    let mut session = DeviceSession::auto(provider.clone()).unwrap();
    session.open().unwrap();
    session.start_sending().unwrap();
    session
}

fn wait_for_frames(log: &Arc<PortLog>, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while log.frame_count() < count {
        assert!(Instant::now() < deadline, "timed out waiting for frames");
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn test_every_frame_is_preceded_by_break_and_mab() {
    let provider = MockProvider::with_open_dmx("mock0");
    let mut session = sending_session(&provider);

    let log = provider.last_log().unwrap();
    wait_for_frames(&log, 3);
    session.stop_sending();

    let events = log.events();
    let frames = events
        .iter()
        .filter(|e| matches!(e, PortEvent::Frame(_)))
        .count();
    assert!(frames >= 3);

    // The line discipline repeats in strict cycles: break asserted,
    // break released, then the data bytes
    for cycle in events.chunks_exact(3).take(frames) {
        assert_eq!(cycle[0], PortEvent::BreakAsserted);
        assert_eq!(cycle[1], PortEvent::BreakReleased);
        assert!(matches!(&cycle[2], PortEvent::Frame(f) if f.len() == FRAME_SIZE));
    }
}

#[test]
fn test_first_frame_goes_out_immediately() {
    let provider = MockProvider::with_open_dmx("mock0");
    let mut session = DeviceSession::auto(provider.clone()).unwrap();
    session.set_refresh_rate(1); // 1 s between frames
    session.open().unwrap();

    let started = Instant::now();
    session.start_sending().unwrap();
    wait_for_frames(&provider.last_log().unwrap(), 1);

    // The first frame does not wait out a full period
    assert!(started.elapsed() < Duration::from_millis(500));
    session.stop_sending();
}

#[test]
fn test_stop_interrupts_the_idle_wait() {
    let provider = MockProvider::with_open_dmx("mock0");
    let mut session = DeviceSession::auto(provider.clone()).unwrap();
    session.set_refresh_rate(1); // 1 s between frames
    session.open().unwrap();
    session.start_sending().unwrap();

    let log = provider.last_log().unwrap();
    wait_for_frames(&log, 1);
    // The loop is now deep in its inter-frame idle
    thread::sleep(Duration::from_millis(50));

    let stop_started = Instant::now();
    session.stop_sending();

    assert!(stop_started.elapsed() < Duration::from_millis(500));
    assert_eq!(log.frame_count(), 1);
}

#[test]
fn test_refresh_rate_paces_the_loop() {
    let provider = MockProvider::with_open_dmx("mock0");
    let mut session = DeviceSession::auto(provider.clone()).unwrap();
    session.set_refresh_rate(MAX_REFRESH_HZ);
    session.open().unwrap();
    session.start_sending().unwrap();

    thread::sleep(Duration::from_millis(200));
    session.stop_sending();

    // ~22.7 ms period: nine-ish frames in 200 ms, never a busy spin
    let count = provider.last_log().unwrap().frame_count();
    assert!(count >= 3, "too few frames: {}", count);
    assert!(count <= 12, "too many frames: {}", count);
}

#[test]
fn test_refresh_rate_change_applies_mid_run() {
    let provider = MockProvider::with_open_dmx("mock0");
    let session = sending_session(&provider);

    let log = provider.last_log().unwrap();
    wait_for_frames(&log, 1);

    // Slow the loop right down; frame production all but stops
    session.set_refresh_rate(1);
    thread::sleep(Duration::from_millis(120));
    let slowed = log.frame_count();
    thread::sleep(Duration::from_millis(120));

    assert!(log.frame_count() <= slowed + 1);
    drop(session);
}

#[test]
fn test_refresh_rate_is_clamped_to_the_supported_window() {
    let provider = MockProvider::with_open_dmx("mock0");
    let session = DeviceSession::auto(provider).unwrap();

    session.set_refresh_rate(10_000);
    assert_eq!(session.refresh_period(), Duration::from_micros(22_727));

    session.set_refresh_rate(0);
    assert_eq!(session.refresh_period(), Duration::from_secs(1));
}

#[test]
fn test_frames_sent_matches_the_wire() {
    let provider = MockProvider::with_open_dmx("mock0");
    let mut session = sending_session(&provider);

    let log = provider.last_log().unwrap();
    wait_for_frames(&log, 3);
    session.stop_sending();

    assert_eq!(session.frames_sent(), log.frame_count() as u64);
}
