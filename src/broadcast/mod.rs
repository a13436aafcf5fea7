//! Status broadcast subsystem.
//!
//! ```text
//! ┌──────────────┐  StatusMessage  ┌─────────────┐  JSON bytes  ┌───────────┐
//! │ FeedScheduler │───────────────▶│ Broadcaster │─────────────▶│ Transport │
//! └──────────────┘   (StatusSink)  └─────────────┘  + channel   └───────────┘
//! ```
//!
//! Fire-and-forget: no acknowledgement, no ordering, no retry.  A send
//! failure costs one status message and nothing else.

pub mod protocol;
pub mod transport;

use log::{debug, warn};

use crate::app::ports::StatusSink;
use protocol::StatusMessage;
use transport::Transport;

/// [`StatusSink`] that puts every message on a transport channel.
pub struct Broadcaster<T: Transport> {
    transport: Option<T>,
    channel: String,
    sent: u64,
    dropped: u64,
}

impl<T: Transport> Broadcaster<T> {
    pub fn new(transport: T, channel: impl Into<String>) -> Self {
        Self {
            transport: Some(transport),
            channel: channel.into(),
            sent: 0,
            dropped: 0,
        }
    }

    /// A broadcaster with no endpoint: every publish is a no-op.
    pub fn disabled(channel: impl Into<String>) -> Self {
        Self {
            transport: None,
            channel: channel.into(),
            sent: 0,
            dropped: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Messages handed to the transport successfully.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Messages lost to encode or send failures.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }
}

impl<T: Transport> StatusSink for Broadcaster<T> {
    fn publish(&mut self, message: &StatusMessage) {
        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        let result = protocol::encode(message)
            .and_then(|payload| transport.send(&payload, &self.channel));
        match result {
            Ok(()) => {
                self.sent += 1;
                debug!(
                    "STATUS | {} level={} event={}",
                    message.label,
                    message.level,
                    message.event.as_str()
                );
            }
            Err(e) => {
                self.dropped += 1;
                // First failure is worth a warning; the rest are noise.
                if self.dropped == 1 {
                    warn!("Broadcaster: status dropped ({}), continuing without it", e);
                } else {
                    debug!("Broadcaster: status dropped ({})", e);
                }
            }
        }
    }
}
