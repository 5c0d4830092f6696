//! Gesture driving for the two-wheeled robot.
//!
//! The right hand steers (open: forward, closed: backward, tilt: turn) and an
//! open left hand stops. Commands go out when the gesture changes or the
//! keepalive expires, but never faster than `max_hz`.
use std::time::{Duration, Instant};

use leap_common::gesture::DriveGesture;
use leap_common::tracking::TrackingFrame;
use leap_common::{BridgeError, Event, Listener, MotionClient, Result};
use log::{error, info, warn};

/// Default keepalive between repeated commands.
pub const KEEPALIVE: Duration = Duration::from_millis(250);
/// Interval between command log lines.
const LOG_INTERVAL: Duration = Duration::from_secs(1);

/// Translates drive gestures into wheel commands on a connected robot.
pub struct DriveBridge {
    robot: MotionClient,
    min_interval: Duration,
    keepalive: Duration,
    last_send: Option<Instant>,
    last_log: Option<Instant>,
    last_gesture: Option<DriveGesture>,
}

impl DriveBridge {
    /// Wrap a connected client.
    pub fn new(robot: MotionClient, max_hz: f64, keepalive: Duration) -> Result<Self> {
        if !max_hz.is_finite() || max_hz <= 0.0 {
            return Err(BridgeError::InvalidArgument(format!(
                "max_hz must be positive, got {}",
                max_hz
            )));
        }
        Ok(Self {
            robot,
            min_interval: Duration::from_secs_f64(1.0 / max_hz),
            keepalive,
            last_send: None,
            last_log: None,
            last_gesture: None,
        })
    }

    /// Send the command for `gesture` if it is due at `now`.
    ///
    /// Returns whether a command was sent.
    pub fn apply(&mut self, gesture: DriveGesture, now: Instant) -> Result<bool> {
        let since_send = self.last_send.map(|t| now.saturating_duration_since(t));
        let changed = self.last_gesture != Some(gesture);
        let keepalive_due = since_send.is_none_or(|elapsed| elapsed >= self.keepalive);
        if !(changed || keepalive_due) {
            return Ok(false);
        }
        if !since_send.is_none_or(|elapsed| elapsed >= self.min_interval) {
            return Ok(false);
        }

        let (left, right) = gesture.wheel_rpms();
        self.robot.set_wheel_velocities(left, right)?;
        self.last_send = Some(now);
        self.last_gesture = Some(gesture);

        if self
            .last_log
            .is_none_or(|t| now.saturating_duration_since(t) >= LOG_INTERVAL)
        {
            info!("Gesture={:?} cmd=({:.1}, {:.1}) rpm", gesture, left, right);
            self.last_log = Some(now);
        }
        Ok(true)
    }

    fn on_frame(&mut self, frame: &TrackingFrame) {
        let gesture = DriveGesture::classify(frame);
        if let Err(e) = self.apply(gesture, Instant::now()) {
            warn!("Drive command failed: {}. Sending STOP.", e);
            self.stop();
        }
    }

    fn stop(&mut self) {
        if let Err(e) = self.robot.force_stop() {
            error!("STOP failed: {}", e);
        }
    }

    /// Borrow the underlying client.
    pub fn robot(&self) -> &MotionClient {
        &self.robot
    }
}

impl Listener for DriveBridge {
    fn on_event(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::Tracking(frame) => self.on_frame(frame),
            Event::Connection => info!("Connected to the tracking service"),
            Event::ConnectionLost => {
                warn!("Tracking service lost. Sending STOP.");
                self.stop();
                self.last_gesture = None;
            }
            Event::DeviceError { message } => {
                error!("Tracking device error: {}. Sending STOP.", message);
                self.stop();
                self.last_gesture = None;
            }
        }
        Ok(())
    }

    fn on_shutdown(&mut self) -> Result<()> {
        self.robot.disconnect();
        info!("Robot stopped and disconnected");
        Ok(())
    }
}
