//! Source: https://github.com/torvalds/linux/blob/master/drivers/hid/hid-steam.c

use crate::transport::FEATURE_REPORT_SIZE;

use super::{
    CONFIG_RIGHT_PAD_HAPTIC_TOUCH, CONFIG_RIGHT_PAD_HAPTIC_TRACKBALL, CONFIG_SEND_BATTERY_STATUS,
    CONFIG_STICK_HAPTIC,
};

/// Maximum payload bytes in a single feature report.
pub const PAYLOAD_MAX: usize = FEATURE_REPORT_SIZE - 3;

/// Length of the pseudo-random seed consumed by the dongle radio.
pub const ENTROPY_LEN: usize = 16;

/// Right haptic actuator (under the right pad).
pub const MOTOR_RIGHT: u16 = 0;
/// Left haptic actuator (under the left pad).
pub const MOTOR_LEFT: u16 = 1;

/// Device type byte used when pairing; 0x3c is the wireless controller.
pub const PAIRING_DEVICE_TYPE_CONTROLLER: u8 = 0x3c;

/// Home button brightness applied by the configuration sequence, percent.
pub const DEFAULT_BRIGHTNESS: u16 = 100;
/// Inactivity shutdown applied by the configuration sequence, seconds.
pub const DEFAULT_SLEEP_TIMEOUT_SECS: u16 = 300;

/// Different report types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    ClearMappings = 0x81,
    GetAttributes = 0x83,
    SetSettings = 0x87,
    TriggerHapticPulse = 0x8f,
    SetPrngEntropy = 0x96,
    TurnOffController = 0x9f,
    DongleGetVersion = 0xa1,
    EnablePairing = 0xad,
    DisconnectDevice = 0xb2,
    CommitDevice = 0xb3,
    DongleGetWirelessState = 0xb4,
    PlayMelody = 0xb6,
    GetChipId = 0xba,
    WriteEeprom = 0xc1,
}

impl TryFrom<u8> for ReportType {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x81 => Ok(Self::ClearMappings),
            0x83 => Ok(Self::GetAttributes),
            0x87 => Ok(Self::SetSettings),
            0x8f => Ok(Self::TriggerHapticPulse),
            0x96 => Ok(Self::SetPrngEntropy),
            0x9f => Ok(Self::TurnOffController),
            0xa1 => Ok(Self::DongleGetVersion),
            0xad => Ok(Self::EnablePairing),
            0xb2 => Ok(Self::DisconnectDevice),
            0xb3 => Ok(Self::CommitDevice),
            0xb4 => Ok(Self::DongleGetWirelessState),
            0xb6 => Ok(Self::PlayMelody),
            0xba => Ok(Self::GetChipId),
            0xc1 => Ok(Self::WriteEeprom),
            _ => Err("Invalid report type"),
        }
    }
}

/// Settings registers accepted by a SET_SETTINGS report. The unknown
/// registers are always written with the values observed from Steam;
/// their meaning has not been reverse engineered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Unknown03 = 0x03,
    RightPadHapticTouch = 0x05,
    StickMode = 0x07,
    RightPadMode = 0x08,
    Unknown18 = 0x18,
    LedBrightness = 0x2d,
    Unknown2e = 0x2e,
    Unknown2f = 0x2f,
    ImuMode = 0x30,
    BatteryReporting = 0x31,
    SleepInactivityTimeout = 0x32,
}

/// Built-in melody ids for [`play_melody_report`] and the EEPROM melody
/// slots written by [`save_melodies_report`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Melody {
    WarmAndHappy = 0x00,
    Invader = 0x01,
    ControllerConfirmed = 0x02,
    Victory = 0x03,
    RiseAndShine = 0x04,
    Shorty = 0x05,
    WarmBoot = 0x06,
    NextLevel = 0x07,
    ShakeItOff = 0x08,
    AccessDenied = 0x09,
    Deactivate = 0x0a,
    Discovery = 0x0b,
    Triumph = 0x0c,
    TheMann = 0x0d,
}

impl Melody {
    pub fn id(&self) -> u32 {
        *self as u32
    }
}

/// A 65 byte HID feature report, used for both commands and command
/// responses:
///
/// `[reportPage:1][featureId:1][dataLen:1][data:62]`
///
/// `data_len` counts the valid payload bytes; unused payload bytes stay
/// zero. All multi-byte payload fields are little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureReport {
    pub feature_id: u8,
    pub data_len: u8,
    pub data: [u8; PAYLOAD_MAX],
}

impl FeatureReport {
    /// Return a new empty report for the given command.
    pub fn new(report_type: ReportType) -> Self {
        Self::with_id(report_type as u8)
    }

    /// Return a new empty report with a raw feature id.
    pub fn with_id(feature_id: u8) -> Self {
        Self {
            feature_id,
            data_len: 0,
            data: [0; PAYLOAD_MAX],
        }
    }

    /// Valid payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.data[..usize::from(self.data_len).min(PAYLOAD_MAX)]
    }

    /// Append raw bytes to the payload, advancing `data_len`.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        let offset = usize::from(self.data_len);
        assert!(
            offset + bytes.len() <= PAYLOAD_MAX,
            "feature report payload overflow"
        );
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.data_len += bytes.len() as u8;
    }

    pub fn push_u8(&mut self, value: u8) {
        self.push_bytes(&[value]);
    }

    pub fn push_u16(&mut self, value: u16) {
        self.push_bytes(&value.to_le_bytes());
    }

    pub fn push_u32(&mut self, value: u32) {
        self.push_bytes(&value.to_le_bytes());
    }

    /// Append a (register, value) settings triplet. Only meaningful on a
    /// SET_SETTINGS report; the controller applies triplets in payload
    /// order.
    pub fn add_setting(&mut self, register: Register, value: u16) {
        self.push_u8(register as u8);
        self.push_u16(value);
    }

    /// Wire image of the report, report page byte first.
    pub fn pack(&self) -> [u8; FEATURE_REPORT_SIZE] {
        let mut buf = [0; FEATURE_REPORT_SIZE];
        buf[1] = self.feature_id;
        buf[2] = self.data_len;
        buf[3..].copy_from_slice(&self.data);
        buf
    }

    /// Rebuild a report from its wire image. A `dataLen` beyond the
    /// payload capacity is clamped rather than trusted.
    pub fn unpack(buf: &[u8; FEATURE_REPORT_SIZE]) -> Self {
        let mut data = [0; PAYLOAD_MAX];
        data.copy_from_slice(&buf[3..]);
        Self {
            feature_id: buf[1],
            data_len: buf[2].min(PAYLOAD_MAX as u8),
            data,
        }
    }
}

/// Build the SET_SETTINGS report applied when a controller attaches.
/// The registers must be written in this order; reordering them has been
/// observed to reset previously applied settings.
pub fn settings_report(config_flags: u32) -> FeatureReport {
    let mut report = FeatureReport::new(ReportType::SetSettings);
    report.add_setting(Register::Unknown03, 0x2d);
    report.add_setting(
        Register::RightPadHapticTouch,
        u16::from(config_flags & CONFIG_RIGHT_PAD_HAPTIC_TOUCH != 0),
    );
    report.add_setting(
        Register::StickMode,
        if config_flags & CONFIG_STICK_HAPTIC != 0 { 0 } else { 7 },
    );
    report.add_setting(
        Register::RightPadMode,
        if config_flags & CONFIG_RIGHT_PAD_HAPTIC_TRACKBALL != 0 {
            0
        } else {
            7
        },
    );
    report.add_setting(Register::Unknown18, 0x00);
    report.add_setting(Register::LedBrightness, DEFAULT_BRIGHTNESS);
    report.add_setting(Register::Unknown2e, 0x00);
    report.add_setting(Register::Unknown2f, 0x01);
    report.add_setting(Register::ImuMode, (config_flags & 31) as u16);
    report.add_setting(
        Register::BatteryReporting,
        if config_flags & CONFIG_SEND_BATTERY_STATUS != 0 {
            2
        } else {
            0
        },
    );
    report.add_setting(Register::SleepInactivityTimeout, DEFAULT_SLEEP_TIMEOUT_SECS);
    report
}

/// Build a SET_SETTINGS report that writes a single register.
pub fn single_setting_report(register: Register, value: u16) -> FeatureReport {
    let mut report = FeatureReport::new(ReportType::SetSettings);
    report.add_setting(register, value);
    report
}

/// Build a haptic pulse report. On and off times are PWM microseconds,
/// `count` is the number of cycles. Motor values above 0xff spill their
/// high byte into payload offset 7.
pub fn haptic_pulse_report(motor: u16, on_time_us: u16, off_time_us: u16, count: u16) -> FeatureReport {
    let mut report = FeatureReport::new(ReportType::TriggerHapticPulse);
    report.push_u8((motor & 0xff) as u8);
    report.push_u16(on_time_us);
    report.push_u16(off_time_us);
    report.push_u16(count);
    if motor > 0xff {
        report.push_u8((motor >> 8) as u8);
    }
    report
}

/// Build a PLAY_MELODY report.
pub fn play_melody_report(melody: u32) -> FeatureReport {
    let mut report = FeatureReport::new(ReportType::PlayMelody);
    report.push_u32(melody);
    report
}

/// Build the EEPROM write that persists the startup and shutdown melody.
/// The filler bytes are fixed; Steam writes the same values.
pub fn save_melodies_report(startup: u8, shutdown: u8) -> FeatureReport {
    let mut report = FeatureReport::new(ReportType::WriteEeprom);
    report.push_u8(startup);
    report.push_u8(shutdown);
    report.push_bytes(&[0xff, 0xff, 0x03, 0x09, 0x05]);
    report.push_bytes(&[0xff; 9]);
    report
}

/// Build the SET_PRNG_ENTROPY report that seeds the dongle radio.
pub fn entropy_report(seed: &[u8; ENTROPY_LEN]) -> FeatureReport {
    let mut report = FeatureReport::new(ReportType::SetPrngEntropy);
    report.push_bytes(seed);
    report
}

/// Build an ENABLE_PAIRING report. A `device_type` of zero selects the
/// wireless controller type when enabling.
pub fn enable_pairing_report(enable: bool, device_type: u8) -> FeatureReport {
    let mut report = FeatureReport::new(ReportType::EnablePairing);
    report.push_u8(u8::from(enable));
    report.push_u8(if enable {
        if device_type == 0 {
            PAIRING_DEVICE_TYPE_CONTROLLER
        } else {
            device_type
        }
    } else {
        0
    });
    report
}

/// Build the TURN_OFF_CONTROLLER report. The payload is a fixed ASCII
/// signature the firmware checks before powering down.
pub fn turn_off_report() -> FeatureReport {
    let mut report = FeatureReport::new(ReportType::TurnOffController);
    report.push_bytes(b"off!");
    report
}
