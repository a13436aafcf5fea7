//! Status wire schema.
//!
//! The JSON object below is the only cross-process contract between
//! controllers and boards:
//!
//! ```text
//! { "kind": "lily_status", "label": "north", "sourceId": 17,
//!   "time": 1700000000000, "level": 5, "readyAt": 1700000101000,
//!   "event": "cooldown_start", "extra": { "cooldown_level": 5 } }
//! ```
//!
//! `readyAt` and `extra` are omitted when absent.  Timestamps are epoch
//! milliseconds.

use serde::{Deserialize, Serialize};

use crate::app::events::{EventKind, Extra};
use crate::app::ports::TransportError;
use crate::app::state::ScheduleState;
use crate::timestamp::Timestamp;

/// Value of the `kind` field on every status message.
pub const PROTOCOL_KIND: &str = "lily_status";

/// Default channel tag shared by controllers and boards.
pub const DEFAULT_CHANNEL: &str = "lily-status";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    pub kind: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub source_id: u32,
    #[serde(default)]
    pub time: Timestamp,
    pub level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_at: Option<Timestamp>,
    pub event: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Extra>,
}

/// Who a controller says it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub label: String,
    pub source_id: u32,
}

impl Identity {
    /// Use the configured label, or `id_<source_id>` when none is set.
    pub fn new(label: Option<&str>, source_id: u32) -> Self {
        let label = match label.map(str::trim) {
            Some(l) if !l.is_empty() => l.to_string(),
            _ => fallback_label(source_id),
        };
        Self { label, source_id }
    }
}

/// Synthesized label for a source without one.
pub fn fallback_label(source_id: u32) -> String {
    format!("id_{}", source_id)
}

/// Build the message for `event` from the current schedule.
pub fn status_message(
    identity: &Identity,
    state: &ScheduleState,
    level: u8,
    event: EventKind,
    extra: Option<Extra>,
    now: Timestamp,
) -> StatusMessage {
    StatusMessage {
        kind: PROTOCOL_KIND.to_string(),
        label: identity.label.clone(),
        source_id: identity.source_id,
        time: now,
        level,
        ready_at: state.ready_at,
        event,
        extra,
    }
}

pub fn encode(message: &StatusMessage) -> Result<Vec<u8>, TransportError> {
    serde_json::to_vec(message).map_err(|_| TransportError::Codec)
}

/// Decode a payload, rejecting anything whose `kind` is not ours.
pub fn decode(payload: &[u8]) -> Result<StatusMessage, TransportError> {
    let message: StatusMessage =
        serde_json::from_slice(payload).map_err(|_| TransportError::Codec)?;
    if message.kind != PROTOCOL_KIND {
        return Err(TransportError::Codec);
    }
    Ok(message)
}
