//! Transport abstraction: any best-effort datagram channel.
//!
//! Concrete implementations:
//! - UDP broadcast on the local network ([`UdpTransport`](crate::adapters::udp::UdpTransport))
//! - In-process loopback ([`Loopback`]) for wiring and tests
//! - [`NullTransport`] when status emission is disabled
//!
//! Delivery is at-most-once and unordered.  Nothing above this trait may
//! assume a datagram arrived.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use crate::app::ports::TransportError;

/// One received datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    /// Transport-level sender identity.
    pub sender_id: u32,
    pub payload: Vec<u8>,
    pub channel: String,
}

/// Best-effort datagram channel.
pub trait Transport {
    /// Send `payload` tagged with `channel`.  No acknowledgement.
    fn send(&mut self, payload: &[u8], channel: &str) -> Result<(), TransportError>;

    /// Wait at most `timeout` for the next datagram.
    /// `Ok(None)` means the wait timed out.
    fn receive(&mut self, timeout: Duration) -> Result<Option<Datagram>, TransportError>;
}

/// A transport that discards all sends and never receives.
pub struct NullTransport;

impl Transport for NullTransport {
    fn send(&mut self, _payload: &[u8], _channel: &str) -> Result<(), TransportError> {
        Ok(())
    }

    fn receive(&mut self, _timeout: Duration) -> Result<Option<Datagram>, TransportError> {
        Ok(None)
    }
}

/// In-process broadcast medium.  Every [`Loopback`] endpoint created from
/// the same bus sees every datagram sent by any endpoint, including its own.
#[derive(Clone, Default)]
pub struct LoopbackBus {
    queues: Rc<RefCell<Vec<Rc<RefCell<VecDeque<Datagram>>>>>>,
}

impl LoopbackBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new endpoint with the given sender id.
    pub fn endpoint(&self, sender_id: u32) -> Loopback {
        let inbox = Rc::new(RefCell::new(VecDeque::new()));
        self.queues.borrow_mut().push(Rc::clone(&inbox));
        Loopback {
            sender_id,
            bus: self.clone(),
            inbox,
        }
    }
}

/// Endpoint on a [`LoopbackBus`].  `receive` never blocks.
pub struct Loopback {
    sender_id: u32,
    bus: LoopbackBus,
    inbox: Rc<RefCell<VecDeque<Datagram>>>,
}

impl Loopback {
    pub fn pending(&self) -> usize {
        self.inbox.borrow().len()
    }
}

impl Transport for Loopback {
    fn send(&mut self, payload: &[u8], channel: &str) -> Result<(), TransportError> {
        let datagram = Datagram {
            sender_id: self.sender_id,
            payload: payload.to_vec(),
            channel: channel.to_string(),
        };
        for queue in self.bus.queues.borrow().iter() {
            queue.borrow_mut().push_back(datagram.clone());
        }
        Ok(())
    }

    fn receive(&mut self, _timeout: Duration) -> Result<Option<Datagram>, TransportError> {
        Ok(self.inbox.borrow_mut().pop_front())
    }
}
