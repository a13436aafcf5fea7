//! Schedule state store.
//!
//! Implements [`StatePort`] for the controller's single persisted blob.
//!
//! - Encoding: `postcard` (compact, schema-less; a decode failure is
//!   reported as [`StorageError::Corrupted`]).
//! - Atomic writes: the blob is written to a sibling temp file, synced,
//!   then renamed over the target.  A crash mid-write leaves the previous
//!   blob intact.
//! - One path per controller instance; the owning loop is the only writer.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::app::ports::{StatePort, StorageError};
use crate::app::state::ScheduleState;

/// Blobs larger than this are rejected as corrupt without decoding.
const MAX_BLOB_SIZE: u64 = 4096;

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!("FileStore: state at {}", path.display());
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StatePort for FileStore {
    fn load(&self) -> Result<ScheduleState, StorageError> {
        let meta = match fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StorageError::NotFound),
            Err(_) => return Err(StorageError::IoError),
        };
        if meta.len() > MAX_BLOB_SIZE {
            return Err(StorageError::Corrupted);
        }
        let bytes = fs::read(&self.path).map_err(|_| StorageError::IoError)?;
        let state: ScheduleState =
            postcard::from_bytes(&bytes).map_err(|_| StorageError::Corrupted)?;
        info!("FileStore: loaded state ({} bytes)", bytes.len());
        Ok(state)
    }

    fn save(&mut self, state: &ScheduleState) -> Result<(), StorageError> {
        let bytes = postcard::to_allocvec(state).map_err(|_| StorageError::IoError)?;
        let tmp = self.temp_path();
        {
            let mut file = fs::File::create(&tmp).map_err(|_| StorageError::IoError)?;
            file.write_all(&bytes).map_err(|_| StorageError::IoError)?;
            file.sync_all().map_err(|_| StorageError::IoError)?;
        }
        fs::rename(&tmp, &self.path).map_err(|_| StorageError::IoError)?;
        debug!("FileStore: saved state ({} bytes)", bytes.len());
        Ok(())
    }
}

/// Volatile store: survives a scheduler being rebuilt, not a process exit.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    blob: Option<Vec<u8>>,
    saves: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with raw bytes (e.g. to simulate corruption).
    pub fn with_blob(blob: Vec<u8>) -> Self {
        Self {
            blob: Some(blob),
            saves: 0,
        }
    }

    pub fn saves(&self) -> u64 {
        self.saves
    }
}

impl StatePort for MemoryStore {
    fn load(&self) -> Result<ScheduleState, StorageError> {
        let bytes = self.blob.as_ref().ok_or(StorageError::NotFound)?;
        postcard::from_bytes(bytes).map_err(|_| StorageError::Corrupted)
    }

    fn save(&mut self, state: &ScheduleState) -> Result<(), StorageError> {
        self.blob = Some(postcard::to_allocvec(state).map_err(|_| StorageError::IoError)?);
        self.saves += 1;
        Ok(())
    }
}
