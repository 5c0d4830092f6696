//! Leap Bridge — forwards hand-tracking gestures to robots, serial devices and
//! simulators. It reads tracking events from a source (JSON lines on stdin or in
//! a file, or a synthetic generator), runs them through the selected bridge and
//! stops cleanly on Ctrl+C or at the end of the input.
//!
//! Usage examples (CLI):
//! ```bash
//! leap_bridge --source synthetic drive --agent-id 15
//! leap_bridge --source file --events ./session.jsonl open-close --serial /dev/ttyACM0
//! leap_bridge coordinates --udp-target 127.0.0.1:5006 < session.jsonl
//! ```
//!
//! Each line of an event file is one JSON `Event`; see `leap_common::tracking`.
#![warn(missing_docs)]
mod args;
mod bridges;
mod source;

use crate::args::{Args, BridgeCommand, SerialArgs, SourceKind};
use crate::bridges::drive::DriveBridge;
use crate::bridges::gesture_file::{self, GestureFileBridge};
use crate::bridges::serial::{
    self, AnimatronicBridge, FingerCountBridge, LETTER_BAUD, OpenCloseAllBridge, OpenCloseBridge,
    SERVO_BAUD,
};
use crate::bridges::udp::{
    self, CoordinatesBridge, DepthBridge, GestureLabelBridge, HandPoseBridge,
};
use clap::Parser;
use crossbeam_channel::unbounded;
use leap_common::net::timeout_from_secs;
use leap_common::{BridgeError, ConnectTarget, Event, Listener, MotionClient, Result};
use log::{error, info};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::time::Duration;

fn main() -> Result<(), BridgeError> {
    init_logger();
    let args = Args::parse();

    let mut bridge = build_bridge(&args.bridge)?;

    let (shutdown_tx, shutdown_rx) = unbounded::<()>();
    ctrlc::set_handler(move || {
        info!("Ctrl+C received. Shutting down bridge...");
        let _ = shutdown_tx.send(());
    })
    .map_err(|e| BridgeError::Format(format!("Error setting Ctrl+C handler: {}", e)))?;

    let (event_tx, event_rx) = unbounded::<Event>();
    info!("Reading tracking events from {}", args.source);
    let source = match args.source {
        SourceKind::Stdin => source::spawn_line_source(BufReader::new(io::stdin()), event_tx),
        SourceKind::File => {
            let raw = args.events.as_deref().ok_or_else(|| {
                BridgeError::InvalidArgument("--source file requires --events <path>".to_string())
            })?;
            let file = File::open(normalize_path(raw))?;
            source::spawn_line_source(BufReader::new(file), event_tx)
        }
        SourceKind::Synthetic => source::spawn_synthetic_source(args.rate_hz, event_tx)?,
    };

    info!("Bridge is running. Press Ctrl+C to exit.");
    source::run_event_loop(bridge.as_mut(), event_rx, shutdown_rx)?;

    // Stdin readers may still be blocked on input; only report finished sources.
    if source.is_finished() {
        match source.join() {
            Ok(Err(e)) => error!("Event source failed: {}", e),
            Err(_) => error!("Event source thread panicked"),
            Ok(Ok(())) => {}
        }
    }
    info!("Bridge stopped");
    Ok(())
}

fn build_bridge(command: &BridgeCommand) -> Result<Box<dyn Listener>> {
    let bridge: Box<dyn Listener> = match command {
        BridgeCommand::Drive {
            ip,
            agent_id,
            port,
            timeout_s,
            max_hz,
            keepalive_s,
        } => {
            let keepalive = positive_secs("keepalive_s", *keepalive_s)?;
            let mut robot = MotionClient::new()
                .with_port(*port)
                .with_timeout(timeout_from_secs(*timeout_s)?);
            let target = ConnectTarget {
                ip: ip.clone(),
                agent_id: *agent_id,
            };
            robot.connect(&target)?;
            Box::new(DriveBridge::new(robot, *max_hz, keepalive)?)
        }
        BridgeCommand::OpenClose { serial } => {
            Box::new(OpenCloseBridge::new(open_serial(serial, LETTER_BAUD)?))
        }
        BridgeCommand::OpenCloseAll { serial } => {
            Box::new(OpenCloseAllBridge::new(open_serial(serial, LETTER_BAUD)?))
        }
        BridgeCommand::FingerCount { serial } => {
            Box::new(FingerCountBridge::new(open_serial(serial, LETTER_BAUD)?))
        }
        BridgeCommand::Animatronic { serial, mapping } => Box::new(AnimatronicBridge::new(
            open_serial(serial, SERVO_BAUD)?,
            *mapping,
        )),
        BridgeCommand::Coordinates { udp_target } => {
            let (socket, target) = udp::open_socket(udp_target)?;
            Box::new(CoordinatesBridge::new(socket, target))
        }
        BridgeCommand::Depth {
            udp_target,
            step_mm,
        } => {
            let (socket, target) = udp::open_socket(udp_target)?;
            Box::new(DepthBridge::new(socket, target, *step_mm))
        }
        BridgeCommand::PointAgent { udp_target } => {
            let (socket, target) = udp::open_socket(udp_target)?;
            Box::new(GestureLabelBridge::point_agent(socket, target))
        }
        BridgeCommand::Sawyer { udp_target } => {
            let (socket, target) = udp::open_socket(udp_target)?;
            Box::new(GestureLabelBridge::sawyer(socket, target))
        }
        BridgeCommand::HandPose { udp_target } => {
            let (socket, target) = udp::open_socket(udp_target)?;
            Box::new(HandPoseBridge::new(socket, target))
        }
        BridgeCommand::GestureFile { path } => {
            let path = path.clone().unwrap_or_else(gesture_file::default_path);
            Box::new(GestureFileBridge::new(path)?)
        }
    };
    Ok(bridge)
}

fn positive_secs(name: &str, secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(BridgeError::InvalidArgument(format!(
            "{} must be a positive number of seconds, got {}",
            name, secs
        )));
    }
    Ok(Duration::from_secs_f64(secs))
}

fn open_serial(args: &SerialArgs, default_baud: u32) -> Result<Box<dyn serialport::SerialPort>> {
    let path = args.serial.trim().replace('"', "");
    serial::open_port(&path, args.baud.unwrap_or(default_baud))
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

/// Normalize a CLI-provided path string by trimming whitespace and matching quotes.
///
/// This allows passing Windows paths in quotes without breaking parsing.
fn normalize_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let no_quotes = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    PathBuf::from(no_quotes)
}
