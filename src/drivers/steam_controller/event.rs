//! Input report decoding. Every report read from the device is up to 65
//! bytes; byte 2 of the frame selects the event type and unknown types
//! are ignorable noise rather than errors.

use packed_struct::prelude::*;
use packed_struct::types::SizedInteger;

/// Size of one input report frame, without the optional report-id prefix.
pub const INPUT_REPORT_SIZE: usize = 64;

/// Event type discriminators found at byte 2 of every frame.
pub const EVENT_UPDATE: u8 = 1;
pub const EVENT_CONNECTION: u8 = 3;
pub const EVENT_BATTERY: u8 = 4;

// Button and flag bits of the 24 bit mask carried by update events.
pub const BUTTON_RT: u32 = 1 << 0; // Right trigger fully pressed
pub const BUTTON_LT: u32 = 1 << 1; // Left trigger fully pressed
pub const BUTTON_RS: u32 = 1 << 2; // Right shoulder
pub const BUTTON_LS: u32 = 1 << 3; // Left shoulder
pub const BUTTON_Y: u32 = 1 << 4;
pub const BUTTON_B: u32 = 1 << 5;
pub const BUTTON_X: u32 = 1 << 6;
pub const BUTTON_A: u32 = 1 << 7;
pub const BUTTON_DPAD_UP: u32 = 0x01 << 8; // Left pad pressed, upper quarter
pub const BUTTON_DPAD_RIGHT: u32 = 0x02 << 8;
pub const BUTTON_DPAD_LEFT: u32 = 0x04 << 8;
pub const BUTTON_DPAD_DOWN: u32 = 0x08 << 8;
pub const BUTTON_PREV: u32 = 0x10 << 8; // Left arrow button
pub const BUTTON_HOME: u32 = 0x20 << 8; // Steam logo button
pub const BUTTON_NEXT: u32 = 0x40 << 8; // Right arrow button
pub const BUTTON_LG: u32 = 0x80 << 8; // Left grip
pub const BUTTON_RG: u32 = 0x01 << 16; // Right grip
pub const BUTTON_STICK: u32 = 0x02 << 16; // Stick or left pad pressed down
pub const BUTTON_RPAD: u32 = 0x04 << 16; // Right pad pressed
/// A finger is touching the left touch pad.
pub const BUTTON_LFINGER: u32 = 0x08 << 16;
/// A finger is touching the right touch pad.
pub const BUTTON_RFINGER: u32 = 0x10 << 16;
/// The device reports pad and stick simultaneously; [`BUTTON_LFINGER`]
/// selects which one the left axis pair carries in this frame.
pub const FLAG_PAD_STICK: u32 = 0x80 << 16;

/// A horizontal/vertical axis pair.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AxisPair {
    pub x: i16,
    pub y: i16,
}

/// A vector in three dimensional space relative to the controller.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Vector3 {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "64")]
pub struct PackedUpdateReport {
    // byte 0-3
    #[packed_field(bytes = "0")]
    pub device_index: u8, // Always 0x01, possibly a per-dongle slot
    #[packed_field(bytes = "2")]
    pub event_type: u8, // 0x01 for updates
    #[packed_field(bytes = "3")]
    pub device_kind: u8, // Always 0x3c for controllers

    // byte 4-12
    #[packed_field(bytes = "4..=7", endian = "lsb")]
    pub timestamp: Integer<u32, packed_bits::Bits<32>>, // Counter, not wall clock
    #[packed_field(bytes = "8..=10", endian = "lsb")]
    pub buttons: Integer<u32, packed_bits::Bits<24>>,
    #[packed_field(bytes = "11")]
    pub left_trigger: u8,
    #[packed_field(bytes = "12")]
    pub right_trigger: u8,

    // byte 16-23, left pair is pad or stick depending on BUTTON_LFINGER
    #[packed_field(bytes = "16..=17", endian = "lsb")]
    pub left_x: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "18..=19", endian = "lsb")]
    pub left_y: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "20..=21", endian = "lsb")]
    pub right_x: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "22..=23", endian = "lsb")]
    pub right_y: Integer<i16, packed_bits::Bits<16>>,

    // byte 28-33
    #[packed_field(bytes = "28..=29", endian = "lsb")]
    pub accel_x: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "30..=31", endian = "lsb")]
    pub accel_y: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "32..=33", endian = "lsb")]
    pub accel_z: Integer<i16, packed_bits::Bits<16>>,

    // byte 34-39
    #[packed_field(bytes = "34..=35", endian = "lsb")]
    pub gyro_x: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "36..=37", endian = "lsb")]
    pub gyro_y: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "38..=39", endian = "lsb")]
    pub gyro_z: Integer<i16, packed_bits::Bits<16>>,

    // byte 40-45
    #[packed_field(bytes = "40..=41", endian = "lsb")]
    pub orientation_x: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "42..=43", endian = "lsb")]
    pub orientation_y: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "44..=45", endian = "lsb")]
    pub orientation_z: Integer<i16, packed_bits::Bits<16>>,
}

#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "64")]
pub struct PackedBatteryReport {
    #[packed_field(bytes = "2")]
    pub event_type: u8, // 0x04 for battery updates
    #[packed_field(bytes = "12..=13", endian = "lsb")]
    pub voltage: Integer<u16, packed_bits::Bits<16>>, // Millivolts, both cells
}

#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "64")]
pub struct PackedConnectionReport {
    #[packed_field(bytes = "2")]
    pub event_type: u8, // 0x03 for connection changes
    #[packed_field(bytes = "4")]
    pub detail: u8,
}

/// Axis, button and sensor data from one update frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpdateEvent {
    pub timestamp: u32,
    pub buttons: u32,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub left_axis: AxisPair,
    pub right_axis: AxisPair,
    pub acceleration: Vector3,
    pub angular_velocity: Vector3,
    pub orientation: Vector3,
}

/// Detail code of a connection event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionChange {
    Disconnected = 1,
    Connected = 2,
    PairingRequested = 3,
}

impl ConnectionChange {
    fn from_wire(detail: u8) -> Option<Self> {
        match detail {
            1 => Some(Self::Disconnected),
            2 => Some(Self::Connected),
            3 => Some(Self::PairingRequested),
            _ => None,
        }
    }
}

/// Battery voltage report, sent only when battery reporting is enabled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatteryEvent {
    pub voltage_mv: u16,
}

/// One decoded input report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Update(UpdateEvent),
    Connection(ConnectionChange),
    Battery(BatteryEvent),
}

impl Event {
    /// Decode a raw input report. Returns `None` for empty reads,
    /// truncated frames and unrecognized event types; none of these are
    /// errors, polling simply found nothing usable.
    ///
    /// Some transports prefix the frame with a zero report-id byte; a
    /// leading zero is skipped before decoding.
    pub fn from_report(buf: &[u8]) -> Option<Event> {
        let frame = match buf.first() {
            Some(0) => &buf[1..],
            Some(_) => buf,
            None => return None,
        };
        if frame.len() < 5 {
            return None;
        }

        let mut raw = [0; INPUT_REPORT_SIZE];
        let len = frame.len().min(INPUT_REPORT_SIZE);
        raw[..len].copy_from_slice(&frame[..len]);

        match frame[2] {
            EVENT_UPDATE if len >= 0x2e => {
                let report = PackedUpdateReport::unpack(&raw).ok()?;
                Some(Event::Update(UpdateEvent {
                    timestamp: report.timestamp.to_primitive(),
                    buttons: report.buttons.to_primitive(),
                    left_trigger: report.left_trigger,
                    right_trigger: report.right_trigger,
                    left_axis: AxisPair {
                        x: report.left_x.to_primitive(),
                        y: report.left_y.to_primitive(),
                    },
                    right_axis: AxisPair {
                        x: report.right_x.to_primitive(),
                        y: report.right_y.to_primitive(),
                    },
                    acceleration: Vector3 {
                        x: report.accel_x.to_primitive(),
                        y: report.accel_y.to_primitive(),
                        z: report.accel_z.to_primitive(),
                    },
                    angular_velocity: Vector3 {
                        x: report.gyro_x.to_primitive(),
                        y: report.gyro_y.to_primitive(),
                        z: report.gyro_z.to_primitive(),
                    },
                    orientation: Vector3 {
                        x: report.orientation_x.to_primitive(),
                        y: report.orientation_y.to_primitive(),
                        z: report.orientation_z.to_primitive(),
                    },
                }))
            }
            EVENT_CONNECTION => {
                let report = PackedConnectionReport::unpack(&raw).ok()?;
                let Some(change) = ConnectionChange::from_wire(report.detail) else {
                    log::warn!("unknown connection event detail {:#04x}", report.detail);
                    return None;
                };
                Some(Event::Connection(change))
            }
            EVENT_BATTERY if len >= 0x0e => {
                let report = PackedBatteryReport::unpack(&raw).ok()?;
                Some(Event::Battery(BatteryEvent {
                    voltage_mv: report.voltage.to_primitive(),
                }))
            }
            other => {
                log::debug!("ignoring input report with event type {other:#04x}");
                None
            }
        }
    }
}
