//! Bridges writing single-byte commands or servo frames to a serial device.
//!
//! All of them react to the right hand only and are generic over `Write`, so
//! they run against a `serialport` handle in production and a `Vec<u8>` in tests.
use std::io::Write;
use std::time::{Duration, Instant};

use clap::ValueEnum;
use leap_common::gesture::{self, HandShape, SERVO_BUFFER_LEN};
use leap_common::tracking::{Hand, HandType, TrackingFrame};
use leap_common::{Event, Listener, Result};
use log::{info, warn};
use serialport::SerialPort;
use strum::Display;

use crate::bridges::log_device_event;

/// Baud rate of the OpenCM boards driven by the letter bridges.
pub const LETTER_BAUD: u32 = 115_200;
/// Baud rate of the animatronic hand controller.
pub const SERVO_BAUD: u32 = 1_000_000;
/// Minimum gap between `e`/`z` writes.
const ALL_FINGERS_INTERVAL: Duration = Duration::from_millis(100);
/// Minimum gap between servo frames.
const SERVO_INTERVAL: Duration = Duration::from_millis(80);

/// Open a serial device with a one second timeout.
pub fn open_port(path: &str, baud: u32) -> Result<Box<dyn SerialPort>> {
    let port = serialport::new(path, baud)
        .timeout(Duration::from_secs(1))
        .open()?;
    info!("Serial port opened: {} @ {} baud", path, baud);
    Ok(port)
}

fn write_byte<W: Write>(port: &mut W, byte: u8) -> Result<()> {
    port.write_all(&[byte])?;
    port.flush()?;
    info!("Sent to serial: {}", byte as char);
    Ok(())
}

/// `a`, `s` or `d` for an open, closed or neutral right hand, sent on change.
pub struct OpenCloseBridge<W: Write> {
    port: W,
    last: Option<u8>,
}

impl<W: Write> OpenCloseBridge<W> {
    #[allow(missing_docs)]
    pub fn new(port: W) -> Self {
        Self { port, last: None }
    }

    fn on_frame(&mut self, frame: &TrackingFrame) -> Result<()> {
        let Some(shape) = frame.hand(HandType::Right).and_then(HandShape::of) else {
            return Ok(());
        };
        let command = shape.serial_command();
        if self.last != Some(command) {
            write_byte(&mut self.port, command)?;
            self.last = Some(command);
        }
        Ok(())
    }
}

impl<W: Write> Listener for OpenCloseBridge<W> {
    fn on_event(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::Tracking(frame) => self.on_frame(frame),
            other => {
                log_device_event(other);
                Ok(())
            }
        }
    }
}

/// Letter for the number of extended right-hand fingers, sent on change.
pub struct FingerCountBridge<W: Write> {
    port: W,
    last: Option<u8>,
}

impl<W: Write> FingerCountBridge<W> {
    #[allow(missing_docs)]
    pub fn new(port: W) -> Self {
        Self { port, last: None }
    }

    fn on_frame(&mut self, frame: &TrackingFrame) -> Result<()> {
        let Some(hand) = frame.hand(HandType::Right) else {
            return Ok(());
        };
        let letter = gesture::finger_count_letter(gesture::extended_fingers(hand));
        if self.last != Some(letter) {
            write_byte(&mut self.port, letter)?;
            self.last = Some(letter);
        }
        Ok(())
    }
}

impl<W: Write> Listener for FingerCountBridge<W> {
    fn on_event(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::Tracking(frame) => self.on_frame(frame),
            other => {
                log_device_event(other);
                Ok(())
            }
        }
    }
}

/// `e` when all five fingers are extended, `z` for a fist, at most every 100 ms.
pub struct OpenCloseAllBridge<W: Write> {
    port: W,
    last_sent: Option<Instant>,
}

impl<W: Write> OpenCloseAllBridge<W> {
    #[allow(missing_docs)]
    pub fn new(port: W) -> Self {
        Self {
            port,
            last_sent: None,
        }
    }

    /// Write the command for `frame` if one applies and the interval has passed.
    pub fn apply(&mut self, frame: &TrackingFrame, now: Instant) -> Result<bool> {
        let Some(hand) = frame.hand(HandType::Right) else {
            return Ok(false);
        };
        let command = match gesture::extended_fingers(hand) {
            5 => b'e',
            0 => b'z',
            _ => return Ok(false),
        };
        if self
            .last_sent
            .is_some_and(|t| now.saturating_duration_since(t) <= ALL_FINGERS_INTERVAL)
        {
            return Ok(false);
        }
        write_byte(&mut self.port, command)?;
        self.last_sent = Some(now);
        Ok(true)
    }
}

impl<W: Write> Listener for OpenCloseAllBridge<W> {
    fn on_event(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::Tracking(frame) => self.apply(frame, Instant::now()).map(|_| ()),
            other => {
                log_device_event(other);
                Ok(())
            }
        }
    }
}

/// How the right hand drives the ten servo bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Display)]
#[clap(rename_all = "lower")]
#[strum(serialize_all = "lowercase")]
pub enum ServoMapping {
    /// Proportional fingers, wrist and forearm held at mid position.
    Fingers,
    /// Forearm and wrist follow the palm, fingers open or closed.
    Arm,
}

impl ServoMapping {
    fn buffer(&self, hand: &Hand) -> Option<[u8; SERVO_BUFFER_LEN]> {
        match self {
            ServoMapping::Fingers => gesture::servo_buffer(hand),
            ServoMapping::Arm => gesture::arm_buffer(hand),
        }
    }
}

/// Streams the ten-byte servo frame to the animatronic hand.
pub struct AnimatronicBridge<W: Write> {
    port: W,
    mapping: ServoMapping,
    last_buffer: [u8; SERVO_BUFFER_LEN],
    last_sent: Option<Instant>,
}

impl<W: Write> AnimatronicBridge<W> {
    #[allow(missing_docs)]
    pub fn new(port: W, mapping: ServoMapping) -> Self {
        Self {
            port,
            mapping,
            last_buffer: [0; SERVO_BUFFER_LEN],
            last_sent: None,
        }
    }

    /// Send the frame for `frame` if it changed and 80 ms have passed.
    pub fn apply(&mut self, frame: &TrackingFrame, now: Instant) -> Result<bool> {
        let Some(buffer) = frame
            .hand(HandType::Right)
            .and_then(|hand| self.mapping.buffer(hand))
        else {
            return Ok(false);
        };
        if buffer == self.last_buffer {
            return Ok(false);
        }
        if self
            .last_sent
            .is_some_and(|t| now.saturating_duration_since(t) <= SERVO_INTERVAL)
        {
            return Ok(false);
        }
        let sent = self.port.write(&buffer)?;
        self.port.flush()?;
        self.last_buffer = buffer;
        self.last_sent = Some(now);
        info!("Servo buffer sent: {:?}", buffer);
        if sent != SERVO_BUFFER_LEN {
            warn!("Only {} of {} bytes were written", sent, SERVO_BUFFER_LEN);
        }
        Ok(true)
    }
}

impl<W: Write> Listener for AnimatronicBridge<W> {
    fn on_event(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::Tracking(frame) => self.apply(frame, Instant::now()).map(|_| ()),
            other => {
                log_device_event(other);
                Ok(())
            }
        }
    }
}
