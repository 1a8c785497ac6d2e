use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::RngCore;
use thiserror::Error;

use crate::transport::hid::HidTransport;
use crate::transport::{ConnectionInfo, Transport, TransportError};

use super::event::{ConnectionChange, Event, INPUT_REPORT_SIZE};
use super::exchange::{ExchangeError, FeatureExchange};
use super::hid_report::{self, FeatureReport, ReportType, ENTROPY_LEN};
use super::state::ControllerState;

/// Lifecycle of one controller session. `Disconnected` is terminal;
/// callers re-enumerate and open a new session to reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

/// Pairing slot state reported by a wireless dongle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WirelessState {
    /// No controller is paired and connected with the dongle.
    NotConnected,
    /// A controller is connected to the dongle.
    Connected,
}

/// Monotonic time seam for the connection deadline.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// The system monotonic clock.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Source of the random bytes seeded into a dongle's radio. The dongle
/// consumes these for its pairing algorithm, presumably to avoid RF
/// transmission collisions.
pub trait EntropySource {
    fn fill(&mut self, seed: &mut [u8; ENTROPY_LEN]);
}

/// Entropy from the process RNG.
#[derive(Debug, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&mut self, seed: &mut [u8; ENTROPY_LEN]) {
        rand::rng().fill_bytes(seed);
    }
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("haptic duration {0:?} exceeds the 16 bit microsecond range")]
    DurationOutOfRange(Duration),
    #[error("unexpected response payload byte {0:#04x}")]
    UnexpectedResponse(u8),
}

/// One live controller session over an exclusively owned transport.
///
/// Construction runs the initialization sequence and leaves the session
/// in `Connecting`; the caller then polls until a connection event (or
/// the timeout) settles the state. Wired controllers also announce
/// themselves with a connection event shortly after initialization.
pub struct Driver<T: Transport> {
    exchange: FeatureExchange<T>,
    wireless: bool,
    config_flags: u32,
    connection: ConnectionState,
    deadline: Instant,
    state: ControllerState,
    clock: Arc<dyn Clock>,
}

impl Driver<HidTransport> {
    /// Open and initialize the controller behind `info`.
    pub fn open(
        info: &ConnectionInfo,
        config_flags: u32,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let transport = HidTransport::open(info)?;
        Ok(Self::new(transport, info.wireless, config_flags, timeout))
    }
}

impl<T: Transport> Driver<T> {
    pub fn new(transport: T, wireless: bool, config_flags: u32, timeout: Duration) -> Self {
        Self::with_parts(
            FeatureExchange::new(transport),
            wireless,
            config_flags,
            timeout,
            Arc::new(SystemClock),
            &mut OsEntropy,
        )
    }

    /// Fully injected constructor.
    pub fn with_parts(
        exchange: FeatureExchange<T>,
        wireless: bool,
        config_flags: u32,
        timeout: Duration,
        clock: Arc<dyn Clock>,
        entropy: &mut dyn EntropySource,
    ) -> Self {
        let deadline = clock.now() + timeout;
        let mut driver = Self {
            exchange,
            wireless,
            config_flags,
            connection: ConnectionState::Connecting,
            deadline,
            state: ControllerState::default(),
            clock,
        };
        match driver.initialize(entropy) {
            // Restart the attach timeout now that initialization is done.
            Ok(()) => driver.deadline = driver.clock.now() + timeout,
            Err(err) => {
                log::error!("controller initialization failed: {err}");
                driver.connection = ConnectionState::Disconnected;
            }
        }
        driver
    }

    /// Initialization sequence. Dongles are seeded with radio entropy
    /// and queried for their wireless state first; every device then
    /// gets CLEAR_MAPPINGS to stop the built-in keyboard/mouse
    /// emulation.
    fn initialize(&mut self, entropy: &mut dyn EntropySource) -> Result<(), ExchangeError> {
        if self.wireless {
            let mut seed = [0; ENTROPY_LEN];
            entropy.fill(&mut seed);
            self.exchange.send(&hid_report::entropy_report(&seed))?;

            // The result is informational only; dongles keep working
            // when this query fails.
            let template = FeatureReport::new(ReportType::DongleGetWirelessState);
            match self.exchange.get(&template) {
                Ok(response) => {
                    log::debug!(
                        "dongle wireless state at init: {:#04x}",
                        response.payload().first().copied().unwrap_or(0)
                    );
                }
                Err(err) => log::debug!("wireless state query failed during init: {err}"),
            }
        }

        self.exchange
            .send(&FeatureReport::new(ReportType::ClearMappings))
    }

    /// Poll the device: one non-blocking read, one decode. Returns the
    /// decoded event once the session is connected; `None` is the
    /// common "nothing new" case and not an error.
    pub fn poll(&mut self) -> Result<Option<Event>, DriverError> {
        let mut buf = [0; INPUT_REPORT_SIZE + 1];
        let len = self.exchange.transport().read_input(&mut buf)?;
        let event = Event::from_report(&buf[..len]);

        match self.connection {
            ConnectionState::Connecting => {
                match event {
                    Some(Event::Connection(change)) => self.handle_connecting_change(change),
                    _ => {
                        if self.clock.now() > self.deadline {
                            log::debug!("timed out waiting for a controller to attach");
                            self.connection = ConnectionState::Disconnected;
                        }
                    }
                }
                Ok(None)
            }
            ConnectionState::Connected => {
                let Some(event) = event else {
                    return Ok(None);
                };
                self.state.apply(&event);
                if let Event::Connection(ConnectionChange::Disconnected) = event {
                    log::info!("controller disconnected");
                    self.connection = ConnectionState::Disconnected;
                }
                Ok(Some(event))
            }
            ConnectionState::Disconnected => Ok(None),
        }
    }

    fn handle_connecting_change(&mut self, change: ConnectionChange) {
        match change {
            ConnectionChange::Connected => {
                // Configure before the caller gets to see "connected".
                if let Err(err) = self.configure(self.config_flags) {
                    log::warn!("configuration after connect failed: {err}");
                }
                self.state.apply(&Event::Connection(ConnectionChange::Connected));
                self.connection = ConnectionState::Connected;
            }
            ConnectionChange::Disconnected => {
                self.state
                    .apply(&Event::Connection(ConnectionChange::Disconnected));
                self.connection = ConnectionState::Disconnected;
            }
            ConnectionChange::PairingRequested => {
                self.state
                    .apply(&Event::Connection(ConnectionChange::PairingRequested));
            }
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    /// The accumulated state snapshot.
    pub fn controller_state(&self) -> &ControllerState {
        &self.state
    }

    pub fn is_wireless(&self) -> bool {
        self.wireless
    }

    /// Apply the settings report built from `config_flags` and remember
    /// the flags for future reconfiguration.
    pub fn configure(&mut self, config_flags: u32) -> Result<(), DriverError> {
        self.config_flags = config_flags;
        self.exchange
            .send(&hid_report::settings_report(config_flags))?;
        Ok(())
    }

    /// Set the brightness of the home button in percent (0-100).
    pub fn set_home_button_brightness(&mut self, percent: u8) -> Result<(), DriverError> {
        self.exchange.send(&hid_report::single_setting_report(
            hid_report::Register::LedBrightness,
            u16::from(percent),
        ))?;
        Ok(())
    }

    /// Set the inactivity timeout in seconds after which the controller
    /// turns itself off.
    pub fn set_sleep_timeout(&mut self, seconds: u16) -> Result<(), DriverError> {
        self.exchange.send(&hid_report::single_setting_report(
            hid_report::Register::SleepInactivityTimeout,
            seconds,
        ))?;
        Ok(())
    }

    /// Pulse a haptic actuator with PWM on/off times and a cycle count.
    /// Durations above the protocol's 16 bit microsecond fields are
    /// rejected before anything is sent.
    pub fn feedback(
        &mut self,
        motor: u16,
        on_time: Duration,
        off_time: Duration,
        count: u16,
    ) -> Result<(), DriverError> {
        let on_us = u16::try_from(on_time.as_micros())
            .map_err(|_| DriverError::DurationOutOfRange(on_time))?;
        let off_us = u16::try_from(off_time.as_micros())
            .map_err(|_| DriverError::DurationOutOfRange(off_time))?;
        self.exchange
            .send(&hid_report::haptic_pulse_report(motor, on_us, off_us, count))?;
        Ok(())
    }

    /// Play one of the built-in melodies; see [`hid_report::Melody`].
    pub fn play_melody(&mut self, melody: u32) -> Result<(), DriverError> {
        self.exchange.send(&hid_report::play_melody_report(melody))?;
        Ok(())
    }

    /// Persist the startup and shutdown melody in the controller EEPROM.
    pub fn save_melodies(&mut self, startup: u8, shutdown: u8) -> Result<(), DriverError> {
        self.exchange
            .send(&hid_report::save_melodies_report(startup, shutdown))?;
        Ok(())
    }

    /// Turn off the controller; the configured shutdown melody plays.
    pub fn turn_off(&mut self) -> Result<(), DriverError> {
        self.exchange.send(&hid_report::turn_off_report())?;
        Ok(())
    }

    /// Query whether a controller is paired and connected to the dongle.
    pub fn query_wireless_state(&mut self) -> Result<WirelessState, DriverError> {
        let template = FeatureReport::new(ReportType::DongleGetWirelessState);
        let response = self.exchange.get(&template)?;
        match response.payload().first().copied().unwrap_or(0) {
            1 => Ok(WirelessState::NotConnected),
            2 => Ok(WirelessState::Connected),
            other => Err(DriverError::UnexpectedResponse(other)),
        }
    }

    /// Put the dongle into (or out of) pairing mode. A `device_type` of
    /// zero selects the wireless controller type.
    pub fn enable_pairing(&mut self, enable: bool, device_type: u8) -> Result<(), DriverError> {
        self.exchange
            .send(&hid_report::enable_pairing_report(enable, device_type))?;
        Ok(())
    }

    /// Accept or reject the controller that requested pairing.
    pub fn commit_pairing(&mut self, connect: bool) -> Result<(), DriverError> {
        let report_type = if connect {
            ReportType::CommitDevice
        } else {
            ReportType::DisconnectDevice
        };
        self.exchange.send(&FeatureReport::new(report_type))?;
        Ok(())
    }

    /// Raw GET_ATTRIBUTES response. The field meanings are largely
    /// unknown; offsets 0x12/0x17/0x1b look like bootloader, firmware
    /// and radio build timestamps.
    pub fn get_attributes(&mut self) -> Result<FeatureReport, DriverError> {
        Ok(self
            .exchange
            .get(&FeatureReport::new(ReportType::GetAttributes))?)
    }

    /// Raw GET_CHIPID response.
    pub fn get_chipid(&mut self) -> Result<FeatureReport, DriverError> {
        Ok(self
            .exchange
            .get(&FeatureReport::new(ReportType::GetChipId))?)
    }

    /// Raw DONGLE_GET_VERSION response.
    pub fn dongle_version(&mut self) -> Result<FeatureReport, DriverError> {
        Ok(self
            .exchange
            .get(&FeatureReport::new(ReportType::DongleGetVersion))?)
    }
}
