//! Bridges from tracking events to actuators.
//!
//! Each bridge implements `Listener` and owns its output (robot client, serial
//! port, UDP socket or file):
//! - `drive` — two-wheeled robot over TCP.
//! - `serial` — open/close, finger count and animatronic hand over serial.
//! - `udp` — palm coordinates, depth, gesture labels and hand poses for the
//!   simulators over UDP.
//! - `gesture_file` — latest gesture label in a file.
use leap_common::Event;
use log::{error, info, warn};

pub mod drive;
pub mod gesture_file;
pub mod serial;
pub mod udp;

/// Log the non-tracking events every bridge reacts to the same way.
pub(crate) fn log_device_event(event: &Event) {
    match event {
        Event::Tracking(_) => {}
        Event::Connection => info!("Connected to the tracking service"),
        Event::ConnectionLost => warn!("Tracking service lost"),
        Event::DeviceError { message } => error!("Tracking device error: {}", message),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use leap_common::tracking::{Hand, HandType, Palm, TrackingFrame, Vector};

    pub fn frame(hands: Vec<Hand>) -> TrackingFrame {
        TrackingFrame { frame_id: 1, hands }
    }

    /// Hand at (0, 200, 0) with fingertips `distances[i]` mm above the palm.
    pub fn hand(hand_type: HandType, distances: [f64; 5], normal_x: f64) -> Hand {
        let palm = Palm {
            position: Vector::new(0.0, 200.0, 0.0),
            normal: Vector::new(normal_x, -1.0, 0.0),
            direction: Vector::new(0.0, 0.0, -1.0),
        };
        Hand::with_tip_distances(hand_type, palm, &distances)
    }
}
