use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::transport::mock::MockTransport;

use super::driver::{Clock, ConnectionState, Driver, DriverError, EntropySource};
use super::event::{ConnectionChange, Event, EVENT_CONNECTION, EVENT_UPDATE, INPUT_REPORT_SIZE};
use super::exchange::{Delay, FeatureExchange, RetryPolicy};
use super::hid_report::{ENTROPY_LEN, MOTOR_LEFT};
use super::CONFIG_SEND_GYRO;

const SEED: [u8; ENTROPY_LEN] = [
    0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee,
    0xff,
];
const TIMEOUT: Duration = Duration::from_millis(500);

struct FakeClock {
    now: Mutex<Instant>,
}

impl FakeClock {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Instant::now()),
        })
    }

    fn advance(&self, duration: Duration) {
        *self.now.lock().unwrap() += duration;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}

struct FixedEntropy;

impl EntropySource for FixedEntropy {
    fn fill(&mut self, seed: &mut [u8; ENTROPY_LEN]) {
        *seed = SEED;
    }
}

struct NoDelay;

impl Delay for NoDelay {
    fn delay(&mut self, _duration: Duration) {}
}

fn driver_with(
    transport: MockTransport,
    wireless: bool,
    clock: Arc<FakeClock>,
) -> Driver<MockTransport> {
    let exchange = FeatureExchange::with_policy(
        transport,
        RetryPolicy {
            max_attempts: 3,
            backoff: Duration::ZERO,
        },
        Box::new(NoDelay),
    );
    Driver::with_parts(
        exchange,
        wireless,
        CONFIG_SEND_GYRO,
        TIMEOUT,
        clock,
        &mut FixedEntropy,
    )
}

fn connection_frame(detail: u8) -> [u8; INPUT_REPORT_SIZE] {
    let mut frame = [0u8; INPUT_REPORT_SIZE];
    frame[0] = 0x01;
    frame[2] = EVENT_CONNECTION;
    frame[4] = detail;
    frame
}

fn update_frame(timestamp: u32) -> [u8; INPUT_REPORT_SIZE] {
    let mut frame = [0u8; INPUT_REPORT_SIZE];
    frame[0] = 0x01;
    frame[2] = EVENT_UPDATE;
    frame[3] = 0x3c;
    frame[0x04..0x08].copy_from_slice(&timestamp.to_le_bytes());
    frame
}

/// Feature ids of every report sent so far.
fn sent_ids(transport: &MockTransport) -> Vec<u8> {
    transport.sent().iter().map(|report| report[1]).collect()
}

#[test]
fn failed_initialization_disconnects_without_configuring() {
    let transport = MockTransport::failing();
    let mut driver = driver_with(transport.clone(), false, FakeClock::new());

    assert_eq!(driver.connection_state(), ConnectionState::Disconnected);
    assert!(transport.sent().is_empty(), "nothing got through");

    // The session is terminal; even a connect event changes nothing.
    transport.queue_input(&connection_frame(2));
    assert!(driver.poll().unwrap().is_none());
    assert_eq!(driver.connection_state(), ConnectionState::Disconnected);
    assert!(!sent_ids(&transport).contains(&0x87));
}

#[test]
fn wired_initialization_only_clears_mappings() {
    let transport = MockTransport::new();
    let driver = driver_with(transport.clone(), false, FakeClock::new());

    assert_eq!(driver.connection_state(), ConnectionState::Connecting);
    assert_eq!(sent_ids(&transport), vec![0x81]);
}

#[test]
fn wireless_initialization_seeds_injected_entropy() {
    let transport = MockTransport::new();
    let mut state_response = [0u8; 65];
    state_response[1] = 0xb4;
    state_response[2] = 1;
    state_response[3] = 2;
    transport.queue_feature_response(state_response);

    let driver = driver_with(transport.clone(), true, FakeClock::new());

    assert_eq!(driver.connection_state(), ConnectionState::Connecting);
    assert_eq!(sent_ids(&transport), vec![0x96, 0xb4, 0x81]);

    let entropy = transport.sent()[0];
    assert_eq!(entropy[2] as usize, ENTROPY_LEN);
    assert_eq!(&entropy[3..3 + ENTROPY_LEN], &SEED);
}

#[test]
fn connect_event_configures_before_reporting_connected() {
    let transport = MockTransport::new();
    let mut driver = driver_with(transport.clone(), false, FakeClock::new());

    transport.queue_input(&connection_frame(2));
    let surfaced = driver.poll().unwrap();

    assert_eq!(surfaced, None, "the connect poll itself surfaces nothing");
    assert_eq!(driver.connection_state(), ConnectionState::Connected);
    assert!(driver.controller_state().connected);

    let settings_sends = sent_ids(&transport)
        .iter()
        .filter(|id| **id == 0x87)
        .count();
    assert_eq!(settings_sends, 1, "exactly one settings report");
}

#[test]
fn connecting_times_out_on_the_first_late_poll() {
    let transport = MockTransport::new();
    let clock = FakeClock::new();
    let mut driver = driver_with(transport, false, clock.clone());

    assert!(driver.poll().unwrap().is_none());
    assert_eq!(driver.connection_state(), ConnectionState::Connecting);

    clock.advance(TIMEOUT + Duration::from_millis(1));
    assert!(driver.poll().unwrap().is_none());
    assert_eq!(driver.connection_state(), ConnectionState::Disconnected);
}

#[test]
fn disconnect_event_while_connecting_is_terminal() {
    let transport = MockTransport::new();
    let mut driver = driver_with(transport.clone(), false, FakeClock::new());

    transport.queue_input(&connection_frame(1));
    assert!(driver.poll().unwrap().is_none());
    assert_eq!(driver.connection_state(), ConnectionState::Disconnected);
    assert!(!sent_ids(&transport).contains(&0x87), "never configured");
}

#[test]
fn disconnect_event_ends_a_connected_session() {
    let transport = MockTransport::new();
    let mut driver = driver_with(transport.clone(), false, FakeClock::new());
    transport.queue_input(&connection_frame(2));
    driver.poll().unwrap();

    transport.queue_input(&connection_frame(1));
    let event = driver.poll().unwrap();

    assert_eq!(
        event,
        Some(Event::Connection(ConnectionChange::Disconnected))
    );
    assert_eq!(driver.connection_state(), ConnectionState::Disconnected);
    assert!(!driver.controller_state().connected);
}

#[test]
fn update_events_surface_and_fold_into_the_snapshot() {
    let transport = MockTransport::new();
    let mut driver = driver_with(transport.clone(), false, FakeClock::new());
    transport.queue_input(&connection_frame(2));
    driver.poll().unwrap();

    transport.queue_input(&update_frame(1234));
    let event = driver.poll().unwrap();

    assert!(matches!(event, Some(Event::Update(update)) if update.timestamp == 1234));
    assert_eq!(driver.controller_state().timestamp, 1234);

    // Empty reads in between are the normal case.
    assert_eq!(driver.poll().unwrap(), None);
    assert_eq!(driver.connection_state(), ConnectionState::Connected);
}

#[test]
fn pairing_request_is_surfaced_without_changing_state() {
    let transport = MockTransport::new();
    let mut driver = driver_with(transport.clone(), false, FakeClock::new());
    transport.queue_input(&connection_frame(2));
    driver.poll().unwrap();

    transport.queue_input(&connection_frame(3));
    let event = driver.poll().unwrap();

    assert_eq!(
        event,
        Some(Event::Connection(ConnectionChange::PairingRequested))
    );
    assert_eq!(driver.connection_state(), ConnectionState::Connected);
    assert!(driver.controller_state().pairing_requested);
}

#[test]
fn query_wireless_state_parses_the_payload_byte() {
    let transport = MockTransport::new();
    let mut driver = driver_with(transport.clone(), false, FakeClock::new());

    let mut response = [0u8; 65];
    response[1] = 0xb4;
    response[2] = 1;
    response[3] = 2;
    transport.queue_feature_response(response);
    assert!(matches!(
        driver.query_wireless_state(),
        Ok(super::driver::WirelessState::Connected)
    ));

    response[3] = 9;
    transport.queue_feature_response(response);
    assert!(matches!(
        driver.query_wireless_state(),
        Err(DriverError::UnexpectedResponse(9))
    ));
}

#[test]
fn feedback_rejects_oversized_durations_before_sending() {
    let transport = MockTransport::new();
    let mut driver = driver_with(transport.clone(), false, FakeClock::new());
    let sends_before = transport.sent().len();

    let err = driver
        .feedback(0, Duration::from_millis(70), Duration::ZERO, 1)
        .unwrap_err();

    assert!(matches!(err, DriverError::DurationOutOfRange(_)));
    assert_eq!(transport.sent().len(), sends_before, "nothing was sent");
}

#[test]
fn feedback_sends_a_haptic_pulse_report() {
    let transport = MockTransport::new();
    let mut driver = driver_with(transport.clone(), false, FakeClock::new());

    driver
        .feedback(
            MOTOR_LEFT,
            Duration::from_micros(500),
            Duration::from_micros(1000),
            3,
        )
        .unwrap();

    let last = *transport.sent().last().unwrap();
    assert_eq!(last[1], 0x8f);
    assert_eq!(last[2], 7);
    assert_eq!(last[3], MOTOR_LEFT as u8);
}
