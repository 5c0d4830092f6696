//! Wheel command frame and its safety envelope.
//!
//! The robot firmware expects every command as a fixed 11-byte frame holding a
//! two-element array of big-endian 32-bit floats:
//!
//! ```text
//! 0x82 | 0xFA | left f32 (BE) | 0xFA | right f32 (BE)
//! ```
//!
//! Speeds are revolutions per minute and are clamped to `[MIN_RPM, MAX_RPM]`
//! before they are encoded.
use strum_macros::{Display, EnumString};

use crate::error::BridgeError;

/// Upper bound of the wheel speed envelope (rpm).
pub const MAX_RPM: f64 = 400.0;
/// Lower bound of the wheel speed envelope (rpm).
pub const MIN_RPM: f64 = -400.0;
/// Total length of an encoded frame in bytes.
pub const FRAME_LEN: usize = 11;

/// Marker for a two-element array.
const ARRAY_OF_TWO: u8 = 0x82;
/// Marker preceding each single-precision float.
const FLOAT32: u8 = 0xFA;

/// Side of the robot a wheel speed applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Wheel {
    /// Left wheel, first float in the frame.
    Left,
    /// Right wheel, second float in the frame.
    Right,
}

/// Record of a speed that was clamped to the envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Saturation {
    /// Which wheel was clamped.
    pub wheel: Wheel,
    /// Bound the value was clamped to.
    pub bound: f64,
}

/// Pair of wheel speeds in rpm.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelCommand {
    /// Left wheel speed.
    pub left: f64,
    /// Right wheel speed.
    pub right: f64,
}

impl WheelCommand {
    /// Creates a command without applying the envelope.
    pub fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }

    /// Both wheels stopped.
    pub fn stop() -> Self {
        Self::default()
    }

    /// Clamp both speeds to the envelope independently.
    ///
    /// Returns the clamped command together with one `Saturation` per side that
    /// had to be changed. NaN speeds are rejected.
    pub fn saturate(left: f64, right: f64) -> Result<(Self, Vec<Saturation>), BridgeError> {
        let mut saturations = Vec::new();
        let left = clamp_side(Wheel::Left, left, &mut saturations)?;
        let right = clamp_side(Wheel::Right, right, &mut saturations)?;
        Ok((Self { left, right }, saturations))
    }

    /// Encode into the 11-byte wire frame.
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut frame = [0u8; FRAME_LEN];
        frame[0] = ARRAY_OF_TWO;
        frame[1] = FLOAT32;
        frame[2..6].copy_from_slice(&(self.left as f32).to_be_bytes());
        frame[6] = FLOAT32;
        frame[7..11].copy_from_slice(&(self.right as f32).to_be_bytes());
        frame
    }

    /// Decode a frame produced by [`Self::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, BridgeError> {
        if bytes.len() != FRAME_LEN {
            return Err(BridgeError::Format(format!(
                "wheel frame must be {} bytes, got {}",
                FRAME_LEN,
                bytes.len()
            )));
        }
        if bytes[0] != ARRAY_OF_TWO || bytes[1] != FLOAT32 || bytes[6] != FLOAT32 {
            return Err(BridgeError::Format(format!(
                "unexpected wheel frame markers: {:02X} {:02X} {:02X}",
                bytes[0], bytes[1], bytes[6]
            )));
        }
        let left = f32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
        let right = f32::from_be_bytes([bytes[7], bytes[8], bytes[9], bytes[10]]);
        Ok(Self {
            left: left as f64,
            right: right as f64,
        })
    }
}

fn clamp_side(
    wheel: Wheel,
    value: f64,
    saturations: &mut Vec<Saturation>,
) -> Result<f64, BridgeError> {
    if value.is_nan() {
        return Err(BridgeError::InvalidArgument(format!(
            "{} wheel speed is NaN",
            wheel
        )));
    }
    let bound = if value > MAX_RPM {
        MAX_RPM
    } else if value < MIN_RPM {
        MIN_RPM
    } else {
        return Ok(value);
    };
    saturations.push(Saturation { wheel, bound });
    Ok(bound)
}
