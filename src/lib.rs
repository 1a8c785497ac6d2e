//! Userspace driver for the Valve Steam Controller.
//!
//! Supports wired controllers and wireless dongles: device discovery, the
//! reverse-engineered feature report configuration protocol, input event
//! decoding into a controller state snapshot, and haptic/melody feedback.

pub mod drivers;
pub mod transport;

pub use drivers::steam_controller::driver::{
    ConnectionState, Driver, DriverError, WirelessState,
};
pub use drivers::steam_controller::event::Event;
pub use drivers::steam_controller::state::ControllerState;
pub use transport::{ConnectionInfo, Transport, TransportError};
