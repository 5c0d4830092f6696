use leap_common::frame::{FRAME_LEN, WheelCommand};
use leap_common::{BridgeError, Result};
use log::{debug, error, info, warn};
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};

/// Frame start byte, used to resynchronise after garbage.
const FRAME_START: u8 = 0x82;

/// Reassembles wheel frames from an arbitrary split of the TCP byte stream.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buffer: Vec<u8>,
    skipped: usize,
}

impl FrameAssembler {
    /// Append received bytes and return every complete frame.
    ///
    /// Bytes that cannot start a valid frame are dropped one at a time until the
    /// stream lines up again.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<WheelCommand> {
        self.buffer.extend_from_slice(bytes);
        let mut commands = Vec::new();
        let mut offset = 0;

        while self.buffer.len() - offset >= FRAME_LEN {
            match WheelCommand::decode(&self.buffer[offset..offset + FRAME_LEN]) {
                Ok(command) => {
                    commands.push(command);
                    offset += FRAME_LEN;
                }
                Err(e) => {
                    debug!("Resynchronising: {}", e);
                    offset += 1;
                    while offset < self.buffer.len() && self.buffer[offset] != FRAME_START {
                        offset += 1;
                    }
                    self.skipped += 1;
                }
            }
        }
        self.buffer.drain(..offset);
        commands
    }

    /// Number of resynchronisations so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Bytes of an incomplete frame still waiting for more data.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// TCP server standing in for the robot firmware.
///
/// Accepts one client at a time, logs every wheel command it receives and
/// optionally forwards the raw bytes to a serial port.
pub struct RobotRelay {
    /// The underlying TCP listening socket.
    pub(crate) socket: TcpListener,
}

impl RobotRelay {
    /// Bind a new relay to `bind_addr` (e.g., `0.0.0.0:9090`).
    pub fn new(bind_addr: &str) -> Result<Self, BridgeError> {
        let socket = TcpListener::bind(bind_addr)?;
        Ok(Self { socket })
    }

    /// Address the relay is listening on.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Blocking loop serving clients one after another.
    ///
    /// A failing client is logged and dropped; the relay keeps accepting.
    pub fn serve<W: Write>(&self, mut forward: Option<&mut W>) -> Result<()> {
        info!("Robot relay is listening on {}", self.socket.local_addr()?);
        for stream in self.socket.incoming() {
            match stream {
                Ok(stream) => {
                    if let Err(e) = handle_client(stream, forward.as_deref_mut()) {
                        error!("Client session failed: {}", e);
                    }
                }
                Err(e) => error!("TCP connection error: {}", e),
            }
        }
        Ok(())
    }

    /// Serve exactly one client and return the commands it sent.
    pub fn serve_one<W: Write>(&self, forward: Option<&mut W>) -> Result<Vec<WheelCommand>> {
        let (stream, _) = self.socket.accept()?;
        handle_client(stream, forward)
    }
}

/// Read a client until it disconnects, logging and forwarding its frames.
pub fn handle_client<W: Write>(
    mut stream: TcpStream,
    mut forward: Option<&mut W>,
) -> Result<Vec<WheelCommand>> {
    let peer = stream.peer_addr()?;
    info!("Client connected: {}", peer);

    let mut assembler = FrameAssembler::default();
    let mut received = Vec::new();
    let mut buf = [0u8; 256];

    loop {
        let size = match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(size) => size,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == ErrorKind::ConnectionReset => {
                warn!("Client {} reset the connection", peer);
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(port) = forward.as_deref_mut() {
            port.write_all(&buf[..size])?;
            port.flush()?;
        }
        for command in assembler.push(&buf[..size]) {
            info!(
                "Wheel command from {}: L={:.1} R={:.1} rpm",
                peer, command.left, command.right
            );
            received.push(command);
        }
    }

    if assembler.pending() > 0 {
        warn!("Client {} left {} bytes of a partial frame", peer, assembler.pending());
    }
    if assembler.skipped() > 0 {
        warn!("Dropped {} malformed frame starts from {}", assembler.skipped(), peer);
    }
    info!("Client disconnected: {}", peer);
    Ok(received)
}
