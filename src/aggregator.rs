//! Status aggregator: the board's record table.
//!
//! Folds every accepted [`StatusMessage`] into one [`DisplayRecord`] per
//! label.  Records are created on first sight and never removed: a
//! controller that goes quiet keeps its last record, and staleness shows up
//! as an old `updated_at` rather than a missing row.

use std::collections::BTreeMap;

use log::{debug, info};

use crate::app::events::EventKind;
use crate::broadcast::protocol::{self, StatusMessage, fallback_label};
use crate::broadcast::transport::Datagram;
use crate::timestamp::Timestamp;

/// Last-known state of one controller, as seen by the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRecord {
    pub label: String,
    pub source_id: u32,
    pub level: u8,
    pub ready_at: Option<Timestamp>,
    pub last_event: EventKind,
    pub last_fired_at: Option<Timestamp>,
    /// Board-local receive time of the last message.
    pub updated_at: Timestamp,
}

pub struct Aggregator {
    channel: String,
    records: BTreeMap<String, DisplayRecord>,
    accepted: u64,
    ignored: u64,
}

impl Aggregator {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            records: BTreeMap::new(),
            accepted: 0,
            ignored: 0,
        }
    }

    /// Accept a raw datagram if it is on our channel and decodes as a
    /// status message.  Returns the updated record, or `None` if ignored.
    pub fn ingest(&mut self, datagram: &Datagram, now: Timestamp) -> Option<&DisplayRecord> {
        if datagram.channel != self.channel {
            self.ignored += 1;
            return None;
        }
        match protocol::decode(&datagram.payload) {
            Ok(message) => Some(self.apply(&message, now)),
            Err(e) => {
                self.ignored += 1;
                debug!(
                    "Aggregator: dropped datagram from {} ({})",
                    datagram.sender_id, e
                );
                None
            }
        }
    }

    /// Merge one decoded message into its record.
    pub fn apply(&mut self, message: &StatusMessage, now: Timestamp) -> &DisplayRecord {
        self.accepted += 1;
        let key = record_key(message);
        let record = self.records.entry(key).or_insert_with_key(|label| {
            info!("Aggregator: new source '{}' (id {})", label, message.source_id);
            DisplayRecord {
                label: label.clone(),
                source_id: message.source_id,
                level: message.level,
                ready_at: None,
                last_event: message.event,
                last_fired_at: None,
                updated_at: now,
            }
        });

        record.source_id = message.source_id;
        record.level = message.level;
        record.last_event = message.event;
        if message.ready_at.is_some() {
            record.ready_at = message.ready_at;
        }
        if message.event == EventKind::Fired {
            record.last_fired_at = Some(message.time);
        }
        record.updated_at = now;
        record
    }

    /// Records sorted by label.
    pub fn snapshot(&self) -> Vec<DisplayRecord> {
        self.records.values().cloned().collect()
    }

    pub fn get(&self, label: &str) -> Option<&DisplayRecord> {
        self.records.get(label)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Messages merged into a record.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Datagrams rejected for channel, decode or kind mismatch.
    pub fn ignored(&self) -> u64 {
        self.ignored
    }
}

/// Label, or `id_<sourceId>` when the sender did not set one.
fn record_key(message: &StatusMessage) -> String {
    let label = message.label.trim();
    if label.is_empty() {
        fallback_label(message.source_id)
    } else {
        label.to_string()
    }
}
