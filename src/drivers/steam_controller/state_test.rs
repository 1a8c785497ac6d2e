use super::event::{AxisPair, BatteryEvent, ConnectionChange, Event, UpdateEvent, Vector3};
use super::state::ControllerState;

fn update_with_left(buttons: u32, left_axis: AxisPair) -> Event {
    Event::Update(UpdateEvent {
        timestamp: 42,
        buttons,
        left_axis,
        ..UpdateEvent::default()
    })
}

#[test]
fn lfinger_routes_left_axis_into_pad_position() {
    let mut state = ControllerState {
        stick: AxisPair { x: 5, y: 6 },
        ..ControllerState::default()
    };

    state.apply(&update_with_left(0x080000, AxisPair { x: 100, y: -100 }));

    assert_eq!(state.left_pad, AxisPair { x: 100, y: -100 });
    assert_eq!(state.stick, AxisPair { x: 5, y: 6 }, "stick untouched");
}

#[test]
fn stick_frame_without_pad_flag_zeroes_pad_position() {
    let mut state = ControllerState {
        left_pad: AxisPair { x: 9, y: 9 },
        ..ControllerState::default()
    };

    state.apply(&update_with_left(0, AxisPair { x: 100, y: -100 }));

    assert_eq!(state.stick, AxisPair { x: 100, y: -100 });
    assert_eq!(state.left_pad, AxisPair::default());
}

#[test]
fn stick_frame_with_pad_flag_preserves_pad_position() {
    let mut state = ControllerState {
        left_pad: AxisPair { x: 9, y: 9 },
        ..ControllerState::default()
    };

    state.apply(&update_with_left(0x800000, AxisPair { x: 100, y: -100 }));

    assert_eq!(state.stick, AxisPair { x: 100, y: -100 });
    assert_eq!(state.left_pad, AxisPair { x: 9, y: 9 });
}

#[test]
fn update_copies_triggers_sensors_and_right_pad() {
    let mut state = ControllerState::default();
    state.apply(&Event::Update(UpdateEvent {
        timestamp: 7,
        buttons: 0x01,
        left_trigger: 11,
        right_trigger: 22,
        right_axis: AxisPair { x: -4, y: 4 },
        acceleration: Vector3 { x: 1, y: 2, z: 3 },
        angular_velocity: Vector3 { x: 4, y: 5, z: 6 },
        orientation: Vector3 { x: 7, y: 8, z: 9 },
        ..UpdateEvent::default()
    }));

    assert_eq!(state.timestamp, 7);
    assert!(state.pressed(0x01));
    assert_eq!(state.left_trigger, 11);
    assert_eq!(state.right_trigger, 22);
    assert_eq!(state.right_pad, AxisPair { x: -4, y: 4 });
    assert_eq!(state.acceleration, Vector3 { x: 1, y: 2, z: 3 });
    assert_eq!(state.angular_velocity, Vector3 { x: 4, y: 5, z: 6 });
    assert_eq!(state.orientation, Vector3 { x: 7, y: 8, z: 9 });
}

#[test]
fn battery_event_updates_voltage_only() {
    let mut state = ControllerState::default();
    state.apply(&Event::Battery(BatteryEvent { voltage_mv: 2995 }));
    assert_eq!(state.battery_voltage_mv, 2995);
    assert_eq!(state.timestamp, 0);
}

#[test]
fn connection_events_drive_flags() {
    let mut state = ControllerState::default();

    state.apply(&Event::Connection(ConnectionChange::PairingRequested));
    assert!(state.pairing_requested);
    assert!(!state.connected);

    state.apply(&Event::Connection(ConnectionChange::Connected));
    assert!(state.connected);
    assert!(!state.pairing_requested, "connect clears the pairing request");

    state.apply(&Event::Connection(ConnectionChange::Disconnected));
    assert!(!state.connected);
    assert!(!state.pairing_requested);
}
