//! Bridges streaming hand positions and gesture labels to simulation
//! environments over UDP.
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

use leap_common::gesture::{self, HandShape};
use leap_common::tracking::{HandType, TrackingFrame, Vector};
use leap_common::{BridgeError, Event, Listener, Result};
use log::{debug, info};

use crate::bridges::log_device_event;

/// Label sent by the point-agent bridge for an open left hand.
pub const POINT_AGENT_STOP: &str = "parar";
/// Label sent by the Sawyer bridge for an open left hand.
pub const SAWYER_FULL_RIGHT: &str = "derecha completa";
/// Minimum gap between hand-pose messages.
const POSE_INTERVAL: Duration = Duration::from_millis(100);

/// Bind an ephemeral local socket and resolve `target`.
pub fn open_socket(target: &str) -> Result<(UdpSocket, SocketAddr)> {
    let target_addr = target.to_socket_addrs()?.next().ok_or_else(|| {
        BridgeError::InvalidArgument(format!("UDP target {} resolved to nothing", target))
    })?;
    let bind_addr = if target_addr.is_ipv4() {
        "0.0.0.0:0"
    } else {
        "[::]:0"
    };
    let socket = UdpSocket::bind(bind_addr)?;
    info!("Streaming to {} from {}", target_addr, socket.local_addr()?);
    Ok((socket, target_addr))
}

/// Right palm position as `x,y,z` with two decimals.
pub fn palm_message(position: &Vector) -> String {
    format!("{:.2},{:.2},{:.2}", position.x, position.y, position.z)
}

/// Streams the right palm position every frame.
pub struct CoordinatesBridge {
    socket: UdpSocket,
    target: SocketAddr,
}

impl CoordinatesBridge {
    #[allow(missing_docs)]
    pub fn new(socket: UdpSocket, target: SocketAddr) -> Self {
        Self { socket, target }
    }

    fn on_frame(&mut self, frame: &TrackingFrame) -> Result<()> {
        if let Some(hand) = frame.hand(HandType::Right) {
            let message = palm_message(&hand.palm.position);
            self.socket.send_to(message.as_bytes(), self.target)?;
            debug!("Sent: {}", message);
        }
        Ok(())
    }
}

impl Listener for CoordinatesBridge {
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

/// Moves a virtual point along z: open hand pushes it forward, a fist pulls it back.
pub struct DepthBridge {
    socket: UdpSocket,
    target: SocketAddr,
    position: Vector,
    step_mm: f64,
}

impl DepthBridge {
    #[allow(missing_docs)]
    pub fn new(socket: UdpSocket, target: SocketAddr, step_mm: f64) -> Self {
        Self {
            socket,
            target,
            position: Vector::default(),
            step_mm,
        }
    }

    /// Move the point for one right-hand shape and return the message to send.
    pub fn step(&mut self, shape: HandShape) -> String {
        match shape {
            HandShape::Open => self.position.z += self.step_mm,
            HandShape::Closed => self.position.z -= self.step_mm,
            HandShape::Neutral => {}
        }
        format!(
            "{:?},{:?},{:?}",
            self.position.x, self.position.y, self.position.z
        )
    }

    fn on_frame(&mut self, frame: &TrackingFrame) -> Result<()> {
        let Some(shape) = frame.hand(HandType::Right).and_then(HandShape::of) else {
            return Ok(());
        };
        let message = self.step(shape);
        self.socket.send_to(message.as_bytes(), self.target)?;
        info!("Sent: {} ({})", message, shape);
        Ok(())
    }
}

impl Listener for DepthBridge {
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

/// Sends the drive-gesture label of every frame, or only its changes.
///
/// An open left hand replaces the label with `left_open_label`.
pub struct GestureLabelBridge {
    socket: UdpSocket,
    target: SocketAddr,
    left_open_label: &'static str,
    changes_only: bool,
    last: Option<String>,
}

impl GestureLabelBridge {
    /// Virtual point agent: one label per frame, `parar` for an open left hand.
    pub fn point_agent(socket: UdpSocket, target: SocketAddr) -> Self {
        Self::new(socket, target, POINT_AGENT_STOP, false)
    }

    /// Sawyer arm: non-empty labels on change, `derecha completa` for an open left hand.
    pub fn sawyer(socket: UdpSocket, target: SocketAddr) -> Self {
        Self::new(socket, target, SAWYER_FULL_RIGHT, true)
    }

    fn new(
        socket: UdpSocket,
        target: SocketAddr,
        left_open_label: &'static str,
        changes_only: bool,
    ) -> Self {
        Self {
            socket,
            target,
            left_open_label,
            changes_only,
            last: None,
        }
    }

    /// Label for `frame`; empty when there is neither a right hand nor an open left one.
    pub fn label(&self, frame: &TrackingFrame) -> String {
        if gesture::left_hand_open(frame) {
            self.left_open_label.to_string()
        } else {
            gesture::simulation_label(frame).unwrap_or_default()
        }
    }

    /// Send the label for `frame` when due; returns what was sent.
    pub fn apply(&mut self, frame: &TrackingFrame) -> Result<Option<String>> {
        let label = self.label(frame);
        if self.changes_only && (label.is_empty() || self.last.as_deref() == Some(label.as_str())) {
            return Ok(None);
        }
        self.socket.send_to(label.as_bytes(), self.target)?;
        info!("Sent: {}", label);
        self.last = Some(label.clone());
        Ok(Some(label))
    }
}

impl Listener for GestureLabelBridge {
    fn on_event(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::Tracking(frame) => self.apply(frame).map(|_| ()),
            other => {
                log_device_event(other);
                Ok(())
            }
        }
    }
}

/// Sends the right hand's pose message on change, at most every 100 ms.
pub struct HandPoseBridge {
    socket: UdpSocket,
    target: SocketAddr,
    last: Option<String>,
    last_sent: Option<Instant>,
}

impl HandPoseBridge {
    #[allow(missing_docs)]
    pub fn new(socket: UdpSocket, target: SocketAddr) -> Self {
        Self {
            socket,
            target,
            last: None,
            last_sent: None,
        }
    }

    /// Send the pose for `frame` if it changed and the interval has passed.
    pub fn apply(&mut self, frame: &TrackingFrame, now: Instant) -> Result<bool> {
        let Some(message) = frame.hand(HandType::Right).map(gesture::pose_message) else {
            return Ok(false);
        };
        if self.last.as_deref() == Some(message.as_str()) {
            return Ok(false);
        }
        if self
            .last_sent
            .is_some_and(|t| now.saturating_duration_since(t) <= POSE_INTERVAL)
        {
            return Ok(false);
        }
        self.socket.send_to(message.as_bytes(), self.target)?;
        info!("Sent: {}", message);
        self.last = Some(message);
        self.last_sent = Some(now);
        Ok(true)
    }
}

impl Listener for HandPoseBridge {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridges::test_support::{frame, hand};

    fn receiver() -> (UdpSocket, String) {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let addr = socket.local_addr().unwrap().to_string();
        (socket, addr)
    }

    fn recv_string(socket: &UdpSocket) -> String {
        let mut buf = [0u8; 128];
        let size = socket.recv(&mut buf).unwrap();
        String::from_utf8_lossy(&buf[..size]).to_string()
    }

    #[test]
    fn formats_palm_with_two_decimals() {
        assert_eq!(palm_message(&Vector::new(1.0, -2.346, 200.0)), "1.00,-2.35,200.00");
    }

    #[test]
    fn streams_right_palm_position() {
        let (receiver, addr) = receiver();
        let (socket, target) = open_socket(&addr).unwrap();
        let mut bridge = CoordinatesBridge::new(socket, target);

        let left_only = Event::Tracking(frame(vec![hand(HandType::Left, [50.0; 5], 0.0)]));
        bridge.on_event(&left_only).unwrap();
        let right = Event::Tracking(frame(vec![hand(HandType::Right, [50.0; 5], 0.0)]));
        bridge.on_event(&right).unwrap();

        assert_eq!(recv_string(&receiver), "0.00,200.00,0.00");
    }

    #[test]
    fn depth_moves_with_hand_shape() {
        let (receiver, addr) = receiver();
        let (socket, target) = open_socket(&addr).unwrap();
        let mut bridge = DepthBridge::new(socket, target, 5.0);

        for distance in [80.0, 80.0, 50.0, 20.0] {
            let event = Event::Tracking(frame(vec![hand(HandType::Right, [distance; 5], 0.0)]));
            bridge.on_event(&event).unwrap();
        }
        let messages: Vec<String> = (0..4).map(|_| recv_string(&receiver)).collect();
        assert_eq!(
            messages,
            vec!["0.0,0.0,5.0", "0.0,0.0,10.0", "0.0,0.0,10.0", "0.0,0.0,5.0"]
        );
    }

    #[test]
    fn point_agent_sends_every_frame() {
        let (receiver, addr) = receiver();
        let (socket, target) = open_socket(&addr).unwrap();
        let mut bridge = GestureLabelBridge::point_agent(socket, target);

        let open = frame(vec![hand(HandType::Right, [80.0; 5], -0.7)]);
        let stop = frame(vec![
            hand(HandType::Right, [80.0; 5], 0.0),
            hand(HandType::Left, [80.0; 5], 0.0),
        ]);
        for sample in [&open, &open, &stop] {
            bridge.on_event(&Event::Tracking(sample.clone())).unwrap();
        }
        let messages: Vec<String> = (0..3).map(|_| recv_string(&receiver)).collect();
        assert_eq!(messages, vec!["abierta derecha", "abierta derecha", "parar"]);
    }

    #[test]
    fn sawyer_sends_only_changes() {
        let (receiver, addr) = receiver();
        let (socket, target) = open_socket(&addr).unwrap();
        let mut bridge = GestureLabelBridge::sawyer(socket, target);

        let closed = frame(vec![hand(HandType::Right, [20.0; 5], 0.0)]);
        let full_right = frame(vec![hand(HandType::Left, [80.0; 5], 0.0)]);
        assert_eq!(bridge.apply(&closed).unwrap().as_deref(), Some("cerrada"));
        assert_eq!(bridge.apply(&closed).unwrap(), None);
        assert_eq!(bridge.apply(&frame(vec![])).unwrap(), None);
        assert_eq!(
            bridge.apply(&full_right).unwrap().as_deref(),
            Some("derecha completa")
        );

        assert_eq!(recv_string(&receiver), "cerrada");
        assert_eq!(recv_string(&receiver), "derecha completa");
    }

    #[test]
    fn hand_pose_sends_changes_at_most_every_100ms() {
        let (receiver, addr) = receiver();
        let (socket, target) = open_socket(&addr).unwrap();
        let mut bridge = HandPoseBridge::new(socket, target);
        let open = frame(vec![hand(HandType::Right, [60.0; 5], 0.0)]);
        let fist = frame(vec![hand(HandType::Right, [10.0; 5], 0.0)]);
        let t0 = Instant::now();

        assert!(bridge.apply(&open, t0).unwrap());
        assert!(!bridge.apply(&open, t0 + Duration::from_millis(500)).unwrap());
        assert!(!bridge.apply(&fist, t0 + Duration::from_millis(50)).unwrap());
        assert!(bridge.apply(&fist, t0 + Duration::from_millis(150)).unwrap());
        assert!(!bridge.apply(&frame(vec![]), t0 + Duration::from_millis(400)).unwrap());

        assert_eq!(recv_string(&receiver), "mano=abierta centro");
        assert_eq!(recv_string(&receiver), "mano=cerrada centro");
    }
}
