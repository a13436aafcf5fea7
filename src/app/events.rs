//! Outbound status events.
//!
//! The [`FeedScheduler`](crate::scheduler::FeedScheduler) tags every status
//! message with one of these.  The names are part of the wire contract
//! (snake_case) and must not change without a compatibility plan.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event vocabulary of the status protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Level changed, or heartbeat.
    Level,
    /// A 0 → L edge started a new cooldown.
    CooldownStart,
    /// `ready_at` has been reached; a pulse follows.
    FeedDue,
    /// A pulse was issued.
    Fired,
    /// A >0 → 0 edge was seen inside the confirmation window.
    Confirm,
    /// The confirmation window elapsed without that edge; re-armed.
    Retry,
    /// Startup boot policy applied.
    BootArm,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        Self::Level,
        Self::CooldownStart,
        Self::FeedDue,
        Self::Fired,
        Self::Confirm,
        Self::Retry,
        Self::BootArm,
    ];

    /// Wire name, e.g. `"cooldown_start"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Level => "level",
            Self::CooldownStart => "cooldown_start",
            Self::FeedDue => "feed_due",
            Self::Fired => "fired",
            Self::Confirm => "confirm",
            Self::Retry => "retry",
            Self::BootArm => "boot_arm",
        }
    }
}

/// Free-form per-event details carried in the `extra` field.
pub type Extra = Map<String, Value>;

/// Build an [`Extra`] from `(key, value)` pairs.
pub fn extra<const N: usize>(pairs: [(&str, Value); N]) -> Extra {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
