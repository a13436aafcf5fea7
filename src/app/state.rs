//! Persisted schedule state and the phases derived from it.
//!
//! [`ScheduleState`] is the only thing the controller writes to its store.
//! The state machine has no stored "current state" field: the [`Phase`] is
//! recomputed from the schedule and the clock whenever it is needed, so a
//! restart can never disagree with the persisted blob.

use serde::{Deserialize, Serialize};

use crate::timestamp::Timestamp;

/// Highest level the sensor can report.
pub const MAX_LEVEL: u8 = 15;

/// Clamp a raw sensor reading into `0..=MAX_LEVEL`.
pub fn clamp_level(raw: u8) -> u8 {
    raw.min(MAX_LEVEL)
}

/// Durable schedule for one controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleState {
    /// Last observed sensor level, for edge detection.
    pub last_level: Option<u8>,
    /// Level observed when the current cooldown started.
    pub cooldown_level: Option<u8>,
    /// When the current cooldown began; `None` when recovered at boot.
    pub cooldown_started_at: Option<Timestamp>,
    /// When the next pulse must be attempted; `None` = nothing pending.
    pub ready_at: Option<Timestamp>,
    /// Last time a pulse was actually issued.
    pub fired_at: Option<Timestamp>,
}

/// Conceptual scheduler phase.
///
/// `Confirming` never shows up here: it only exists inside the feed step,
/// which runs to completion within a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing scheduled.
    Idle,
    /// A cooldown is being waited out.
    CooldownArmed,
    /// A retry is pending after an unconfirmed pulse.
    RetryArmed,
    /// `ready_at` has passed; the next tick pulses.
    FeedDue,
}

impl ScheduleState {
    pub fn phase(&self, now: Timestamp) -> Phase {
        match self.ready_at {
            None => Phase::Idle,
            Some(at) if now >= at => Phase::FeedDue,
            Some(at) => match self.fired_at {
                // A ready_at armed after the last pulse, with no new cooldown
                // edge since that pulse, is a retry re-arm.
                Some(fired)
                    if at > fired
                        && self.cooldown_started_at.is_none_or(|start| start <= fired) =>
                {
                    Phase::RetryArmed
                }
                _ => Phase::CooldownArmed,
            },
        }
    }

    /// Drop any pending schedule and cooldown bookkeeping.
    pub fn clear_schedule(&mut self) {
        self.ready_at = None;
        self.cooldown_level = None;
        self.cooldown_started_at = None;
    }
}
