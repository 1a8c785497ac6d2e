use std::env;
use std::error::Error;
use std::process;
use std::time::Duration;

use steampad::drivers::steam_controller::event::BUTTON_A;
use steampad::drivers::steam_controller::CONFIG_DEFAULT;
use steampad::transport::hid;
use steampad::{ConnectionInfo, ConnectionState, Driver, Event};

/// How long to wait for a controller to attach before giving up on an
/// endpoint. Dongles enumerate even with every paired controller turned
/// off, so short is fine.
const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

fn main() -> Result<(), Box<dyn Error>> {
    let log_level = match env::var("LOG_LEVEL") {
        Ok(value) => value,
        Err(_) => "info".to_string(),
    };
    env::set_var("RUST_LOG", log_level);
    env_logger::init();

    let devices = hid::enumerate()?;
    if devices.is_empty() {
        eprintln!("No controllers found!");
        process::exit(1);
    }

    for info in devices {
        log::info!(
            "Trying {} ({})",
            info.path,
            if info.wireless { "wireless dongle" } else { "wired" }
        );
        run(&info)?;
    }

    Ok(())
}

/// Poll one endpoint until it disconnects or the A button is pressed,
/// printing right pad coordinates along the way.
fn run(info: &ConnectionInfo) -> Result<(), Box<dyn Error>> {
    let mut driver = Driver::open(info, CONFIG_DEFAULT, CONNECT_TIMEOUT)?;

    loop {
        let before = driver.connection_state();
        let event = driver.poll()?;
        let state = driver.connection_state();

        if state == ConnectionState::Disconnected {
            // Endpoints with no controller attached also end up here
            // once the connect timeout runs out.
            println!("Controller disconnected");
            return Ok(());
        }
        if state == ConnectionState::Connected && before != ConnectionState::Connected {
            println!("Controller connected");
        }

        if let Some(Event::Update(update)) = event {
            if update.buttons & BUTTON_A != 0 {
                return Ok(());
            }
            println!("({}, {})", update.right_axis.x, update.right_axis.y);
        }
    }
}
