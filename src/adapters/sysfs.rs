//! Value-file I/O, sysfs style.
//!
//! The host build talks to the outside world through small text files:
//!
//! | File          | Type           | Contents                      |
//! |---------------|----------------|-------------------------------|
//! | sensor level  | [`LevelFile`]  | decimal integer, e.g. `5\n`   |
//! | actuator pin  | [`ValueFilePin`] | `1` while high, `0` while low |
//!
//! This matches the kernel GPIO `value` files and anything that can
//! mimic them (a bridge process, a FUSE mount, a test fixture).

use std::fs;
use std::path::{Path, PathBuf};

use embedded_hal::digital::{self, ErrorKind, ErrorType, OutputPin};

use crate::app::ports::{SensorError, SensorPort};

// ── Sensor ────────────────────────────────────────────────────

/// Sensor level read from a text file on every call.
pub struct LevelFile {
    path: PathBuf,
}

impl LevelFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SensorPort for LevelFile {
    fn read_level(&mut self) -> Result<u8, SensorError> {
        let text = fs::read_to_string(&self.path).map_err(|_| SensorError::ReadFailed)?;
        parse_level(&text)
    }
}

/// Parse a decimal level, ignoring surrounding whitespace.
/// Values above `u8::MAX` are malformed; the scheduler clamps the rest.
pub fn parse_level(text: &str) -> Result<u8, SensorError> {
    text.trim().parse::<u8>().map_err(|_| SensorError::Malformed)
}

// ── Output pin ────────────────────────────────────────────────

/// Error from a [`ValueFilePin`] write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinIoError;

impl digital::Error for PinIoError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// `OutputPin` that writes `1`/`0` into a value file.
pub struct ValueFilePin {
    path: PathBuf,
    high: bool,
}

impl ValueFilePin {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            high: false,
        }
    }

    /// Last level successfully written.
    pub fn is_high(&self) -> bool {
        self.high
    }

    fn write(&mut self, high: bool) -> Result<(), PinIoError> {
        fs::write(&self.path, if high { "1\n" } else { "0\n" }).map_err(|_| PinIoError)?;
        self.high = high;
        Ok(())
    }
}

impl ErrorType for ValueFilePin {
    type Error = PinIoError;
}

impl OutputPin for ValueFilePin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}
