//! Error types shared between the bridges and the relay.
//!
//! The `BridgeError` enum unifies argument validation, robot connection and
//! transmission failures, and the I/O, serial and serialization errors raised
//! by the bridges, so every crate can propagate a single error type.
use std::io;

use thiserror::Error;

/// Unified error type shared by the workspace.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Caller supplied an unusable argument (agent id out of range, no address, NaN speed).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The TCP connect attempt to the robot failed or timed out.
    #[error("Could not connect to the robot at {address}:{port}: {source}")]
    Connection {
        /// Resolved target address.
        address: String,
        /// Target TCP port.
        port: u16,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },

    /// A command was issued while no socket is open.
    #[error("Not connected. Call connect() first.")]
    NotConnected,

    /// Sending a frame over an established connection failed.
    #[error("TCP send failed: {0}")]
    Transmission(#[source] io::Error),

    /// I/O error originating from the standard library, sockets or files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serial port could not be opened or configured.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Failure while decoding tracking events from JSON.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Malformed wire data with a human-readable message.
    #[error("Format error: {0}")]
    Format(String),
}
