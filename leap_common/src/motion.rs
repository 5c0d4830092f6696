//! Blocking TCP motion client for the two-wheeled robot.
//!
//! A `MotionClient` owns at most one TCP stream to the robot firmware. Commands
//! are wheel speeds in rpm; each command is clamped to the safety envelope,
//! encoded into the 11-byte frame from [`crate::frame`] and written to the
//! stream without waiting for a reply.
//!
//! Lifecycle:
//! - `MotionClient::new()` — no socket.
//! - `connect(&target)` — resolves the address and opens exactly one stream.
//! - `set_wheel_velocities` / `force_stop` — write frames on that stream.
//! - `disconnect()` — best-effort stop, then shutdown and close.
//!
//! The client is not synchronized; share it across threads only behind a lock.
use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::BridgeError;
use crate::frame::WheelCommand;
use crate::net::{self, DEFAULT_CONNECT_TIMEOUT_SECS, ROBOT_PORT};
use crate::result::Result;

/// Where to connect: an explicit IP, an agent id, or both (IP wins).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectTarget {
    /// Explicit robot address.
    pub ip: Option<String>,
    /// Agent slot in `0..=19`; the address is derived from it.
    pub agent_id: Option<i64>,
}

impl ConnectTarget {
    /// Target a robot by explicit address.
    pub fn ip(ip: &str) -> Self {
        Self {
            ip: Some(ip.to_string()),
            agent_id: None,
        }
    }

    /// Target a robot by agent id.
    pub fn agent(agent_id: i64) -> Self {
        Self {
            ip: None,
            agent_id: Some(agent_id),
        }
    }

    /// Resolve the address to dial and the agent id to record.
    ///
    /// An explicit IP takes precedence and records no agent id.
    pub fn resolve(&self) -> Result<(String, Option<i64>)> {
        match (&self.ip, self.agent_id) {
            (Some(ip), _) => Ok((ip.clone(), None)),
            (None, Some(agent_id)) => Ok((net::agent_address(agent_id)?, Some(agent_id))),
            (None, None) => Err(BridgeError::InvalidArgument(
                "Must provide either agent_id or ip to connect()".to_string(),
            )),
        }
    }
}

/// TCP client commanding the robot's wheel speeds.
#[derive(Debug)]
pub struct MotionClient {
    ip: Option<String>,
    agent_id: Option<i64>,
    port: u16,
    timeout: Duration,
    stream: Option<TcpStream>,
}

impl Default for MotionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionClient {
    /// Create a disconnected client on `ROBOT_PORT` with the default 2 s connect timeout.
    pub fn new() -> Self {
        Self {
            ip: None,
            agent_id: None,
            port: ROBOT_PORT,
            timeout: Duration::from_secs_f64(DEFAULT_CONNECT_TIMEOUT_SECS),
            stream: None,
        }
    }

    /// Replace the connect timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Dial a port other than `ROBOT_PORT` (local relays, tests).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Address of the connected robot.
    pub fn ip(&self) -> Option<&str> {
        self.ip.as_deref()
    }

    /// Agent id, when connected through one.
    pub fn agent_id(&self) -> Option<i64> {
        self.agent_id
    }

    /// TCP port the client dials.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Connect timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether a live stream is held.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Open the TCP stream to the robot.
    ///
    /// Fails with `InvalidArgument` before touching the network when the target
    /// is unusable, and with `Connection` when the connect attempt fails or
    /// exceeds the timeout. A previous stream is not stopped here; call
    /// `disconnect()` first when reconnecting.
    pub fn connect(&mut self, target: &ConnectTarget) -> Result<()> {
        let (ip, agent_id) = target.resolve()?;
        let port = self.port;

        let socket_addr = resolve_socket_addr(&ip, port)?;
        info!("Connecting to robot at {}", net::addr(&ip, port));
        let stream = TcpStream::connect_timeout(&socket_addr, self.timeout).map_err(|e| {
            BridgeError::Connection {
                address: ip.clone(),
                port,
                source: e,
            }
        })?;

        info!("Connected to robot at {}", net::addr(&ip, port));
        self.ip = Some(ip);
        self.agent_id = agent_id;
        self.stream = Some(stream);
        Ok(())
    }

    /// Command both wheel speeds in rpm.
    ///
    /// Speeds outside `[-400, 400]` are clamped and a warning is logged per
    /// clamped side; the clamped command is still sent.
    pub fn set_wheel_velocities(&mut self, left: f64, right: f64) -> Result<()> {
        if self.stream.is_none() {
            return Err(BridgeError::NotConnected);
        }
        let (command, saturations) = WheelCommand::saturate(left, right)?;
        for saturation in &saturations {
            warn!(
                "{} wheel speed saturated to {} rpm",
                saturation.wheel, saturation.bound
            );
        }
        self.send(&command)
    }

    /// Send a zero-speed frame. Does nothing when disconnected.
    pub fn force_stop(&mut self) -> Result<()> {
        if self.stream.is_none() {
            return Ok(());
        }
        self.send(&WheelCommand::stop())
    }

    /// Stop the robot and release the stream.
    ///
    /// Best effort: the stop frame, the shutdown and the close are each attempted
    /// and their failures ignored, so the client always ends up disconnected.
    /// Calling this while disconnected does nothing.
    pub fn disconnect(&mut self) {
        if let Err(e) = self.force_stop() {
            debug!("Stop before disconnect failed: {}", e);
        }
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                debug!("Socket shutdown failed: {}", e);
            }
            if let Some(ip) = &self.ip {
                info!("Disconnected from robot at {}", net::addr(ip, self.port));
            }
        }
        self.ip = None;
        self.agent_id = None;
    }

    /// Borrow the client for a scope that ends with `disconnect()`.
    ///
    /// Fails with `NotConnected` when no stream is open.
    pub fn session(&mut self) -> Result<Session<'_>> {
        if self.stream.is_none() {
            return Err(BridgeError::NotConnected);
        }
        Ok(Session { client: self })
    }

    /// Run `body` inside a [`Session`] and return its result after teardown.
    ///
    /// The body never runs when the client is not connected.
    pub fn scoped<T, F>(&mut self, body: F) -> Result<T>
    where
        F: FnOnce(&mut MotionClient) -> Result<T>,
    {
        let mut session = self.session()?;
        body(&mut *session)
    }

    fn send(&mut self, command: &WheelCommand) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(BridgeError::NotConnected)?;
        let frame = command.encode();
        stream
            .write_all(&frame)
            .map_err(BridgeError::Transmission)?;
        debug!(
            "Sent wheel command L={:.1} R={:.1} rpm",
            command.left, command.right
        );
        Ok(())
    }
}

impl Drop for MotionClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn resolve_socket_addr(ip: &str, port: u16) -> Result<SocketAddr> {
    let connection_error = |source: std::io::Error| BridgeError::Connection {
        address: ip.to_string(),
        port,
        source,
    };
    (ip, port)
        .to_socket_addrs()
        .map_err(connection_error)?
        .next()
        .ok_or_else(|| {
            connection_error(std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                "address resolved to nothing",
            ))
        })
}

/// Scoped use of a connected [`MotionClient`].
///
/// Dereferences to the client; dropping it (normal exit, `?` propagation or
/// unwinding) calls `disconnect()` once.
#[derive(Debug)]
pub struct Session<'a> {
    client: &'a mut MotionClient,
}

impl Deref for Session<'_> {
    type Target = MotionClient;

    fn deref(&self) -> &Self::Target {
        self.client
    }
}

impl DerefMut for Session<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.client
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.client.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ip_takes_precedence_over_agent() {
        let target = ConnectTarget {
            ip: Some("10.0.0.7".to_string()),
            agent_id: Some(99),
        };
        assert_eq!(target.resolve().unwrap(), ("10.0.0.7".to_string(), None));
    }

    #[test]
    fn agent_target_records_id() {
        assert_eq!(
            ConnectTarget::agent(15).resolve().unwrap(),
            ("192.168.50.115".to_string(), Some(15))
        );
    }

    #[test]
    fn empty_target_is_invalid() {
        assert!(matches!(
            ConnectTarget::default().resolve(),
            Err(BridgeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn new_client_defaults() {
        let client = MotionClient::new();
        assert_eq!(client.port(), ROBOT_PORT);
        assert_eq!(client.timeout(), Duration::from_secs(2));
        assert!(!client.is_connected());
        assert_eq!(client.ip(), None);
        assert_eq!(client.agent_id(), None);
    }

    #[test]
    fn commands_require_connection() {
        let mut client = MotionClient::new();
        assert!(matches!(
            client.set_wheel_velocities(10.0, 10.0),
            Err(BridgeError::NotConnected)
        ));
        assert!(client.force_stop().is_ok());
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut client = MotionClient::new();
        client.disconnect();
        assert!(!client.is_connected());
        client.disconnect();
        assert!(!client.is_connected());
    }

    #[test]
    fn session_requires_connection() {
        let mut client = MotionClient::new();
        assert!(matches!(client.session(), Err(BridgeError::NotConnected)));

        let mut ran = false;
        let result = client.scoped(|_| {
            ran = true;
            Ok(())
        });
        assert!(matches!(result, Err(BridgeError::NotConnected)));
        assert!(!ran);
    }
}
