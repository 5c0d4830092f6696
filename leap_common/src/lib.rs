//!
//! Common types and utilities shared by the hand-tracking bridges and the robot relay.
//!
//! This crate aggregates:
//! - `error` — unified error type `BridgeError` used across the workspace.
//! - `result` — handy `Result<T, BridgeError>` alias.
//! - `net` — robot port constant and agent address derivation.
//! - `frame` — the 11-byte wheel command frame and its safety envelope.
//! - `motion` — blocking TCP client for the two-wheeled robot.
//! - `tracking` — hand-tracking events and the `Listener` interface.
//! - `gesture` — fixed-threshold gesture classification.
#![warn(missing_docs)]
pub mod error;
pub mod frame;
pub mod gesture;
pub mod motion;
pub mod net;
pub mod result;
pub mod tracking;

pub use error::BridgeError;
pub use frame::WheelCommand;
pub use motion::{ConnectTarget, MotionClient, Session};
pub use result::Result;
pub use tracking::{Event, Listener};
