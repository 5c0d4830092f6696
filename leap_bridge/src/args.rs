//! Command-line arguments for the Leap bridge.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use leap_common::net::ROBOT_PORT;
use strum::Display;

use crate::bridges::drive::KEEPALIVE;
use crate::bridges::serial::ServoMapping;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Where tracking events come from.
    #[clap(long, value_enum, default_value_t = SourceKind::Stdin)]
    pub source: SourceKind,

    /// JSON-lines file with one tracking event per line (for `--source file`).
    #[clap(long)]
    pub events: Option<String>,

    /// Frames per second produced by the synthetic source.
    #[clap(long, default_value_t = 30.0)]
    pub rate_hz: f64,

    /// Bridge to run.
    #[command(subcommand)]
    pub bridge: BridgeCommand,
}

/// Tracking event sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Display)]
#[clap(rename_all = "lower")]
#[strum(serialize_all = "lowercase")]
pub enum SourceKind {
    /// JSON lines on standard input.
    Stdin,
    /// JSON lines from `--events`.
    File,
    /// Randomly moving hands, no device needed.
    Synthetic,
}

/// Serial port options shared by the serial bridges.
#[derive(Debug, Clone, ClapArgs)]
pub struct SerialArgs {
    /// Serial device, e.g. `/dev/ttyACM0` or `COM13`.
    #[clap(long)]
    pub serial: String,

    /// Baud rate; each bridge has its own default.
    #[clap(long)]
    pub baud: Option<u32>,
}

/// One subcommand per bridge.
#[derive(Debug, Subcommand)]
pub enum BridgeCommand {
    /// Drive the two-wheeled robot with the right hand; open left hand stops it.
    Drive {
        /// Robot IP address. Takes precedence over `--agent-id`.
        #[clap(long)]
        ip: Option<String>,
        /// Robot agent id (0-19); the IP is derived from it.
        #[clap(long, allow_negative_numbers = true)]
        agent_id: Option<i64>,
        /// Robot TCP port.
        #[clap(long, default_value_t = ROBOT_PORT)]
        port: u16,
        /// Connect timeout in seconds.
        #[clap(long, default_value_t = 2.0)]
        timeout_s: f64,
        /// Maximum command rate.
        #[clap(long, default_value_t = 30.0)]
        max_hz: f64,
        /// Resend the current command at least this often (seconds).
        #[clap(long, default_value_t = KEEPALIVE.as_secs_f64())]
        keepalive_s: f64,
    },
    /// Send `a`/`s`/`d` for an open, closed or neutral right hand.
    OpenClose {
        #[command(flatten)]
        serial: SerialArgs,
    },
    /// Send `e` when all fingers are extended and `z` for a fist.
    OpenCloseAll {
        #[command(flatten)]
        serial: SerialArgs,
    },
    /// Send a letter for the number of extended fingers.
    FingerCount {
        #[command(flatten)]
        serial: SerialArgs,
    },
    /// Stream servo positions to the animatronic hand.
    Animatronic {
        #[command(flatten)]
        serial: SerialArgs,
        /// Which servos follow the hand.
        #[clap(long, value_enum, default_value_t = ServoMapping::Fingers)]
        mapping: ServoMapping,
    },
    /// Stream the right palm position as `x,y,z` over UDP.
    Coordinates {
        /// UDP destination.
        #[clap(long, default_value = "127.0.0.1:5006")]
        udp_target: String,
    },
    /// Move a virtual point along z with open/closed gestures and stream it over UDP.
    Depth {
        /// UDP destination.
        #[clap(long, default_value = "127.0.0.1:5006")]
        udp_target: String,
        /// Distance moved per frame in millimetres.
        #[clap(long, default_value_t = 5.0)]
        step_mm: f64,
    },
    /// Send the gesture label of every frame to the virtual point agent over UDP.
    PointAgent {
        /// UDP destination.
        #[clap(long, default_value = "127.0.0.1:50010")]
        udp_target: String,
    },
    /// Send gesture label changes to the simulated Sawyer arm over UDP.
    Sawyer {
        /// UDP destination.
        #[clap(long, default_value = "127.0.0.1:50011")]
        udp_target: String,
    },
    /// Send finger states and palm orientation to the simulated hand over UDP.
    HandPose {
        /// UDP destination.
        #[clap(long, default_value = "127.0.0.1:50010")]
        udp_target: String,
    },
    /// Keep the latest gesture label in a file for external consumers.
    GestureFile {
        /// Output file; defaults to `leap_motion_command.txt` in the temp directory.
        #[clap(long)]
        path: Option<PathBuf>,
    },
}
