//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ FeedScheduler / Aggregator (domain)
//! ```
//!
//! Driven adapters (sensor, actuator, clock, state store, status sink,
//! renderer) implement these traits.  The scheduler consumes them via
//! generics, so the domain core never touches files, pins or sockets.
//!
//! ## Failure contract
//!
//! - Port errors are typed, but none of them is fatal to the control loop.
//! - A failed sensor read is treated as level 0 by the caller.
//! - A failed save leaves the controller running from memory.

use core::fmt;
use core::time::Duration;

use crate::aggregator::DisplayRecord;
use crate::app::state::ScheduleState;
use crate::broadcast::protocol::StatusMessage;
use crate::timestamp::Timestamp;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the scheduler polls this every tick and inside the
/// confirmation window.
pub trait SensorPort {
    /// Current cooldown level.  Adapters should not clamp; the scheduler
    /// clamps to [`MAX_LEVEL`](crate::app::state::MAX_LEVEL).
    fn read_level(&mut self) -> Result<u8, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: a single fixed-duration pulse.
pub trait ActuatorPort {
    /// Drive the output high for `duration`, then low.  Blocks for the
    /// whole pulse.  `Ok` means the pulse was issued, not that it worked.
    fn pulse(&mut self, duration: Duration) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Time source and sleep primitive.  Injected so the whole loop can run on
/// simulated time in tests.
pub trait Clock {
    fn now(&self) -> Timestamp;

    fn sleep(&self, duration: Duration);
}

// ───────────────────────────────────────────────────────────────
// State store port (driven adapter: domain ↔ durable blob)
// ───────────────────────────────────────────────────────────────

/// Durable storage for the single [`ScheduleState`] of a controller.
///
/// - `save` MUST be idempotent and atomic: a crash mid-write leaves the
///   previous blob intact.
/// - `load` returns [`StorageError::NotFound`] when nothing was ever saved
///   and [`StorageError::Corrupted`] when the blob does not decode.  Callers
///   treat both as a fresh default state.
pub trait StatePort {
    fn load(&self) -> Result<ScheduleState, StorageError>;

    fn save(&mut self, state: &ScheduleState) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Status sink port (driven adapter: domain → broadcast / logging)
// ───────────────────────────────────────────────────────────────

/// The scheduler emits every [`StatusMessage`] through this port.
/// Delivery is best-effort; implementations swallow their own failures.
pub trait StatusSink {
    fn publish(&mut self, message: &StatusMessage);
}

// ───────────────────────────────────────────────────────────────
// Renderer port (driven adapter: aggregator → screen)
// ───────────────────────────────────────────────────────────────

/// Paints a board snapshot.  `records` is already sorted by label.
pub trait Renderer {
    fn render(&mut self, records: &[DisplayRecord], now: Timestamp);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`SensorPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The underlying source could not be read.
    ReadFailed,
    /// A value was read but is not an integer level.
    Malformed,
}

/// Errors from [`ActuatorPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// Driving the output pin failed.
    PinWriteFailed,
}

/// Errors from [`StatePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Nothing stored yet (first boot).
    NotFound,
    /// Stored blob failed to decode.
    Corrupted,
    /// Generic I/O error from the backend.
    IoError,
}

/// Errors from [`Transport`](crate::broadcast::transport::Transport) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// No endpoint could be opened.
    BindFailed,
    /// A datagram could not be sent.
    SendFailed,
    /// The receive call failed for a reason other than a timeout.
    ReceiveFailed,
    /// The payload could not be encoded or decoded.
    Codec,
}

/// Errors from configuration loading and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// The configuration sources could not be read or deserialized.
    Load(String),
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailed => write!(f, "read failed"),
            Self::Malformed => write!(f, "malformed reading"),
        }
    }
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PinWriteFailed => write!(f, "pin write failed"),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "no stored state"),
            Self::Corrupted => write!(f, "stored state corrupted"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BindFailed => write!(f, "bind failed"),
            Self::SendFailed => write!(f, "send failed"),
            Self::ReceiveFailed => write!(f, "receive failed"),
            Self::Codec => write!(f, "codec error"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::Load(msg) => write!(f, "load failed: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
