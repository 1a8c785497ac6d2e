use super::event::{
    AxisPair, BatteryEvent, ConnectionChange, Event, UpdateEvent, Vector3, BUTTON_LFINGER,
    FLAG_PAD_STICK,
};

/// Accumulated state of one controller, updated by folding decoded
/// events in arrival order.
///
/// The controller multiplexes the stick and the left touch pad onto one
/// axis pair, so `stick` and `left_pad` are filled in from alternating
/// update frames; see [`ControllerState::apply`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ControllerState {
    /// Timestamp of the latest update. A message counter, not wall clock.
    pub timestamp: u32,
    /// Actively pressed buttons and flags.
    pub buttons: u32,
    pub left_trigger: u8,
    pub right_trigger: u8,
    /// Stick position.
    pub stick: AxisPair,
    /// Thumb position on the left touch pad, or (0,0) if untouched.
    pub left_pad: AxisPair,
    /// Thumb position on the right touch pad, or (0,0) if untouched.
    pub right_pad: AxisPair,
    /// Orientation vector. Probably the imaginary parts of a unit
    /// quaternion; the exact semantics are not reverse engineered.
    pub orientation: Vector3,
    /// Acceleration of the controller; around 16384 per g.
    pub acceleration: Vector3,
    /// Angular velocity from the gyros.
    pub angular_velocity: Vector3,
    /// Battery voltage in millivolts.
    pub battery_voltage_mv: u16,
    pub connected: bool,
    pub pairing_requested: bool,
}

impl ControllerState {
    /// Fold one decoded event into the snapshot.
    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::Update(update) => self.apply_update(update),
            Event::Connection(change) => match change {
                ConnectionChange::Disconnected => {
                    self.connected = false;
                    self.pairing_requested = false;
                }
                ConnectionChange::Connected => {
                    self.connected = true;
                    self.pairing_requested = false;
                }
                ConnectionChange::PairingRequested => self.pairing_requested = true,
            },
            Event::Battery(BatteryEvent { voltage_mv }) => self.battery_voltage_mv = *voltage_mv,
        }
    }

    /// Whether any button of `mask` is down.
    pub fn pressed(&self, mask: u32) -> bool {
        self.buttons & mask != 0
    }

    fn apply_update(&mut self, update: &UpdateEvent) {
        self.timestamp = update.timestamp;
        self.buttons = update.buttons;
        self.left_trigger = update.left_trigger;
        self.right_trigger = update.right_trigger;

        // With LFINGER down the left axis pair is the pad contact point,
        // otherwise it is the stick. Without FLAG_PAD_STICK the device
        // cannot report both, so a stick frame also means "pad released".
        if update.buttons & BUTTON_LFINGER != 0 {
            self.left_pad = update.left_axis;
        } else {
            self.stick = update.left_axis;
            if update.buttons & FLAG_PAD_STICK == 0 {
                self.left_pad = AxisPair::default();
            }
        }

        self.right_pad = update.right_axis;
        self.acceleration = update.acceleration;
        self.angular_velocity = update.angular_velocity;
        self.orientation = update.orientation;
    }
}
