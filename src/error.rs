//! Unified error types for the LilyFeed controller.
//!
//! A single `Error` enum that every collaborator failure can convert into,
//! keeping the control loop's degradation handling uniform.  None of these
//! stop the loop; they only decide which capability is lost (broadcast,
//! durability, a sensor reading).  All variants are `Copy` so they can be
//! logged and passed around without allocation.

use core::fmt;

use crate::app::ports::{ActuatorError, SensorError, StorageError, TransportError};

// ---------------------------------------------------------------------------
// Top-level controller error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The sensor could not be read; the scheduler substitutes level 0.
    SensorUnavailable(SensorError),
    /// No usable broadcast endpoint; scheduling continues without status.
    TransportUnavailable(TransportError),
    /// The persisted blob is missing, unreadable or unwritable.
    PersistenceCorruptOrAbsent(StorageError),
    /// The actuator reported a fault.  The confirm/retry loop is the only
    /// remedy; this is logged, never acted on directly.
    ActuatorFault(ActuatorError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SensorUnavailable(e) => write!(f, "sensor unavailable: {e}"),
            Self::TransportUnavailable(e) => write!(f, "transport unavailable: {e}"),
            Self::PersistenceCorruptOrAbsent(e) => write!(f, "persistence: {e}"),
            Self::ActuatorFault(e) => write!(f, "actuator fault: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::SensorUnavailable(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::TransportUnavailable(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::PersistenceCorruptOrAbsent(e)
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::ActuatorFault(e)
    }
}
