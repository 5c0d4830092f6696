//! Robot relay — a TCP server that stands in for the robot's Wi-Fi bridge.
//!
//! The relay listens where the robot would (`0.0.0.0:9090` by default), accepts
//! one motion client at a time, decodes the 11-byte wheel frames for the log and
//! can forward the raw byte stream to the motor controller's serial port.
//!
//! Usage example (CLI):
//! ```bash
//! robot_relay --port 9090 --serial /dev/ttyUSB0 --baud 115200
//! ```
#![warn(missing_docs)]
use crate::relay::RobotRelay;
use clap::Parser;
use leap_common::BridgeError;
use leap_common::Result;
use leap_common::net::ROBOT_PORT;
use log::info;
use std::time::Duration;

mod relay;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// TCP port to listen on.
    #[clap(long, default_value_t = ROBOT_PORT)]
    port: u16,

    /// Serial device receiving the raw frames, e.g. `/dev/ttyUSB0`.
    #[clap(long)]
    serial: Option<String>,

    /// Serial baud rate.
    #[clap(long, default_value_t = 115_200)]
    baud: u32,
}

fn main() -> Result<(), BridgeError> {
    init_logger();
    let args = Args::parse();

    let relay = RobotRelay::new(&format!("0.0.0.0:{}", args.port))?;
    match args.serial {
        Some(path) => {
            let mut port = serialport::new(&path, args.baud)
                .timeout(Duration::from_secs(1))
                .open()?;
            info!("Forwarding frames to serial port {} @ {} baud", path, args.baud);
            relay.serve(Some(&mut port))
        }
        None => relay.serve(None::<&mut std::io::Sink>),
    }
}

fn init_logger() {
    logger_builder().parse_default_env().init();
}

/// Info by default; `RUST_LOG` is parsed on top and takes precedence.
fn logger_builder() -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(log::LevelFilter::Info);
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::LevelFilter;

    #[test]
    fn logs_at_info_unless_overridden() {
        assert_eq!(logger_builder().build().filter(), LevelFilter::Info);

        let mut builder = logger_builder();
        builder.parse_filters("debug");
        assert_eq!(builder.build().filter(), LevelFilter::Debug);
    }
}
