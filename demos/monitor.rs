use std::env;
use std::net::IpAddr;

use cpa1110::{CpaConfig, NetworkCpa1110, register::Field};
use inquire::{Confirm, Select};
use strum::IntoEnumIterator;

// Configuration constants - adjust these for your setup
const DEVICE_ID: u8 = 16;
const POLL_COUNT: usize = 5;
const POLL_INTERVAL_MS: u64 = 2000;

fn main() {
    tracing_subscriber::fmt::init();

    // An IP address argument means Modbus TCP, anything else is a serial port path
    let resource = env::args().nth(1).unwrap_or_else(|| {
        let ports = serialport::available_ports().expect("Failed to enumerate serial ports");

        if ports.is_empty() {
            eprintln!("No serial ports found, pass the controller's IP address instead");
            std::process::exit(1);
        }

        let port_names: Vec<String> = ports.iter().map(|p| p.port_name.clone()).collect();

        Select::new("Select a serial port:", port_names)
            .prompt()
            .expect("Failed to select port")
    });

    let config = if resource.parse::<IpAddr>().is_ok() {
        CpaConfig::tcp(&resource)
    } else {
        CpaConfig::serial(&resource)
    }
    .with_device_id(DEVICE_ID)
    .with_auto_refresh(false);

    println!("Using {:?} resource: {}", config.connection_type, resource);

    let mut cpa = NetworkCpa1110::open(&config).expect("Failed to connect to the compressor");

    // Every field from the read done while connecting
    println!("\n--- Register Map ---");
    for field in Field::iter() {
        println!("{:<24} {:?}", format!("{field:?}"), cpa.read_field(field).unwrap());
    }

    let control = Confirm::new("Start or stop the compressor?")
        .with_default(false)
        .prompt()
        .unwrap_or(false);
    if control {
        let start = Select::new("Command:", vec!["start", "stop"])
            .prompt()
            .expect("Failed to select command")
            == "start";
        if start {
            cpa.enable_compressor().unwrap();
        } else {
            cpa.disable_compressor().unwrap();
        }
        println!("Command sent");
    }

    println!("\n--- Polling ---");
    for _ in 0..POLL_COUNT {
        let snapshot = cpa.read_snapshot().unwrap();
        println!(
            "{:?}: helium {:.1}, low {:.1}, high {:.1}, motor {:.1} A, warnings {:?}, errors {:?}",
            snapshot.operating_state,
            snapshot.helium_temperature,
            snapshot.low_pressure,
            snapshot.high_pressure,
            snapshot.motor_current,
            snapshot.warnings,
            snapshot.errors,
        );
        std::thread::sleep(std::time::Duration::from_millis(POLL_INTERVAL_MS));
    }

    cpa.close();
}
