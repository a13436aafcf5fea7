//! UDP broadcast transport.
//!
//! Each status datagram is one UDP packet carrying a small JSON envelope:
//!
//! ```json
//! {"channel":"lily-status","sender":3735928559,"payload":{ ...status... }}
//! ```
//!
//! - Controllers bind an ephemeral port with `SO_BROADCAST` and send to
//!   `<broadcast_addr>:<port>` ([`UdpTransport::sender`]).
//! - Boards bind `0.0.0.0:<port>` and receive ([`UdpTransport::listener`]).
//! - `receive()` blocks for at most the given timeout.  A timeout is
//!   `Ok(None)`; so is a packet that is not a well-formed envelope
//!   (another program on the same port).
//! - No acknowledgement, no retransmission.

use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app::ports::TransportError;
use crate::broadcast::transport::{Datagram, Transport};

/// Largest datagram accepted.  Status messages are a few hundred bytes.
const MAX_DATAGRAM: usize = 2048;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    channel: String,
    sender: u32,
    payload: Value,
}

pub struct UdpTransport {
    socket: UdpSocket,
    target: SocketAddr,
    sender_id: u32,
    buf: Vec<u8>,
}

impl UdpTransport {
    /// Controller side: bind an ephemeral port and broadcast to
    /// `<broadcast_addr>:<port>`.  Several controllers can share a host.
    pub fn sender(port: u16, broadcast_addr: &str, sender_id: u32) -> Result<Self, TransportError> {
        Self::open(0, port, broadcast_addr, sender_id)
    }

    /// Board side: bind `0.0.0.0:<port>` to hear every controller.
    pub fn listener(port: u16, broadcast_addr: &str) -> Result<Self, TransportError> {
        Self::open(port, port, broadcast_addr, 0)
    }

    fn open(
        bind_port: u16,
        port: u16,
        broadcast_addr: &str,
        sender_id: u32,
    ) -> Result<Self, TransportError> {
        let ip: IpAddr = broadcast_addr
            .parse()
            .map_err(|_| TransportError::BindFailed)?;
        let local = SocketAddr::from((Ipv4Addr::UNSPECIFIED, bind_port));
        let transport = Self::bind(local, SocketAddr::new(ip, port), sender_id)?;
        transport
            .socket
            .set_broadcast(true)
            .map_err(|_| TransportError::BindFailed)?;
        info!("UDP: bound {} -> {}", local, transport.target);
        Ok(transport)
    }

    /// Bind `local` and send every datagram to `target`.  Used directly by
    /// tests to run over the loopback interface.
    pub fn bind(local: SocketAddr, target: SocketAddr, sender_id: u32) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(local).map_err(|e| {
            warn!("UDP: bind {} failed: {}", local, e);
            TransportError::BindFailed
        })?;
        Ok(Self {
            socket,
            target,
            sender_id,
            buf: vec![0u8; MAX_DATAGRAM],
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok()
    }

    pub fn set_target(&mut self, target: SocketAddr) {
        self.target = target;
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, payload: &[u8], channel: &str) -> Result<(), TransportError> {
        let envelope = Envelope {
            channel: channel.to_owned(),
            sender: self.sender_id,
            payload: serde_json::from_slice(payload).map_err(|_| TransportError::Codec)?,
        };
        let bytes = serde_json::to_vec(&envelope).map_err(|_| TransportError::Codec)?;
        self.socket
            .send_to(&bytes, self.target)
            .map_err(|_| TransportError::SendFailed)?;
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Datagram>, TransportError> {
        // A zero timeout means "block forever" to the socket API.
        let timeout = timeout.max(Duration::from_millis(1));
        self.socket
            .set_read_timeout(Some(timeout))
            .map_err(|_| TransportError::ReceiveFailed)?;

        let (len, from) = match self.socket.recv_from(&mut self.buf) {
            Ok(r) => r,
            Err(ref e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return Ok(None);
            }
            Err(_) => return Err(TransportError::ReceiveFailed),
        };

        let envelope: Envelope = match serde_json::from_slice(&self.buf[..len]) {
            Ok(env) => env,
            Err(_) => {
                debug!("UDP: dropped {} byte foreign packet from {}", len, from);
                return Ok(None);
            }
        };
        let payload = serde_json::to_vec(&envelope.payload).map_err(|_| TransportError::Codec)?;
        Ok(Some(Datagram {
            sender_id: envelope.sender,
            payload,
            channel: envelope.channel,
        }))
    }
}
