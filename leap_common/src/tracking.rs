//! Hand-tracking events and the listener interface.
//!
//! The tracking device is treated as a black box that delivers `Event`s. Events
//! are plain serde types so they can be replayed from JSON lines, e.g.
//!
//! ```json
//! {"type":"tracking","frame_id":12,"hands":[{"hand_type":"right","palm":{...},"digits":[...]}]}
//! {"type":"connection"}
//! ```
//!
//! Bridges implement [`Listener`] and match on every `Event` variant.
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::result::Result;

/// Index of the distal bone; its `next_joint` is the fingertip.
pub const DISTAL_BONE: usize = 3;

/// Point or direction in device coordinates (millimetres for positions).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    #[allow(missing_docs)]
    pub x: f64,
    #[allow(missing_docs)]
    pub y: f64,
    #[allow(missing_docs)]
    pub z: f64,
}

impl Vector {
    /// Creates a new vector.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Vector) -> f64 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Which hand a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum HandType {
    #[allow(missing_docs)]
    Left,
    #[allow(missing_docs)]
    Right,
}

/// Palm centre, the unit normal pointing out of the palm and the unit vector
/// from the palm towards the fingers.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Palm {
    #[allow(missing_docs)]
    pub position: Vector,
    #[allow(missing_docs)]
    pub normal: Vector,
    /// Older recordings omit it; it then reads as the zero vector.
    #[serde(default)]
    pub direction: Vector,
}

/// One finger bone between two joints.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bone {
    /// Joint closer to the wrist.
    pub prev_joint: Vector,
    /// Joint closer to the fingertip.
    pub next_joint: Vector,
}

/// A finger, bones ordered from metacarpal to distal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Digit {
    #[allow(missing_docs)]
    pub bones: Vec<Bone>,
}

impl Digit {
    /// Fingertip position, if the distal bone is present.
    pub fn tip(&self) -> Option<Vector> {
        self.bones.get(DISTAL_BONE).map(|bone| bone.next_joint)
    }
}

/// A tracked hand; digits ordered thumb, index, middle, ring, pinky.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hand {
    #[allow(missing_docs)]
    pub hand_type: HandType,
    #[allow(missing_docs)]
    pub palm: Palm,
    #[allow(missing_docs)]
    pub digits: Vec<Digit>,
}

impl Hand {
    /// Build a hand whose fingertips sit `distances[i]` mm above the palm.
    ///
    /// Only the distal bone of each digit carries joints; the others are zeroed.
    pub fn with_tip_distances(hand_type: HandType, palm: Palm, distances: &[f64]) -> Self {
        let digits = distances
            .iter()
            .map(|d| {
                let tip = Vector::new(palm.position.x, palm.position.y + d, palm.position.z);
                let mut bones = vec![Bone::default(); DISTAL_BONE];
                bones.push(Bone {
                    prev_joint: palm.position,
                    next_joint: tip,
                });
                Digit { bones }
            })
            .collect();
        Self {
            hand_type,
            palm,
            digits,
        }
    }

    /// Palm-to-fingertip distance for every digit that has a tip.
    pub fn tip_distances(&self) -> Vec<f64> {
        self.digits
            .iter()
            .filter_map(Digit::tip)
            .map(|tip| self.palm.position.distance(&tip))
            .collect()
    }
}

/// One sample of all hands in view.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackingFrame {
    /// Monotonic frame counter from the device.
    #[serde(default)]
    pub frame_id: u64,
    #[allow(missing_docs)]
    #[serde(default)]
    pub hands: Vec<Hand>,
}

impl TrackingFrame {
    /// First hand of the given type.
    pub fn hand(&self, hand_type: HandType) -> Option<&Hand> {
        self.hands.iter().find(|hand| hand.hand_type == hand_type)
    }
}

/// Event delivered by the tracking device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A new tracking sample.
    Tracking(TrackingFrame),
    /// The device service connected.
    Connection,
    /// The device service went away.
    ConnectionLost,
    /// The device reported an error.
    DeviceError {
        #[allow(missing_docs)]
        message: String,
    },
}

impl Event {
    /// Parse a single JSON-encoded event.
    pub fn from_json(line: &str) -> Result<Event> {
        Ok(serde_json::from_str(line)?)
    }
}

/// Receives tracking events; one implementation per bridge.
pub trait Listener {
    /// Handle one event. Errors are reported to the event loop, which logs them.
    fn on_event(&mut self, event: &Event) -> Result<()>;

    /// Called once when the event loop stops.
    fn on_shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_events() {
        assert_eq!(
            Event::from_json(r#"{"type":"connection"}"#).unwrap(),
            Event::Connection
        );
        assert_eq!(
            Event::from_json(r#"{"type":"device_error","message":"unplugged"}"#).unwrap(),
            Event::DeviceError {
                message: "unplugged".to_string()
            }
        );
        match Event::from_json(r#"{"type":"tracking","frame_id":3,"hands":[]}"#).unwrap() {
            Event::Tracking(frame) => {
                assert_eq!(frame.frame_id, 3);
                assert!(frame.hands.is_empty());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_event_type() {
        assert!(Event::from_json(r#"{"type":"gesture"}"#).is_err());
    }

    #[test]
    fn tip_needs_distal_bone() {
        let short = Digit {
            bones: vec![Bone::default(); 2],
        };
        assert_eq!(short.tip(), None);

        let hand = fixtures::hand(HandType::Right, [10.0, 20.0, 30.0, 40.0, 50.0], 0.0);
        assert_eq!(hand.tip_distances(), vec![10.0, 20.0, 30.0, 40.0, 50.0]);
    }

    #[test]
    fn palm_direction_defaults_when_missing() {
        let palm: Palm = serde_json::from_str(
            r#"{"position":{"x":1.0,"y":2.0,"z":3.0},"normal":{"x":0.0,"y":-1.0,"z":0.0}}"#,
        )
        .unwrap();
        assert_eq!(palm.position, Vector::new(1.0, 2.0, 3.0));
        assert_eq!(palm.direction, Vector::default());
    }

    #[test]
    fn tracking_event_round_trips_through_json() {
        let frame = TrackingFrame {
            frame_id: 7,
            hands: vec![fixtures::hand(HandType::Left, [80.0; 5], 0.2)],
        };
        let json = serde_json::to_string(&Event::Tracking(frame.clone())).unwrap();
        assert_eq!(Event::from_json(&json).unwrap(), Event::Tracking(frame));
    }
}
