//! Device identity derived from the host name.
//!
//! Produces a stable numeric source id for status messages when no
//! `source_id` is configured.  The id is the 32-bit FNV-1a hash of the
//! host name, so it is:
//! - Deterministic across restarts on the same host
//! - Distinct across hosts with different names (with high probability)
//! - Never zero (zero is reserved for "unset" in configuration)

use std::fs;

const FNV_OFFSET: u32 = 0x811C_9DC5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Read the host name from `/etc/hostname`, then `$HOSTNAME`.
/// Falls back to `localhost`.
pub fn read_hostname() -> String {
    fs::read_to_string("/etc/hostname")
        .ok()
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            std::env::var("HOSTNAME")
                .ok()
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| "localhost".to_owned())
}

/// 32-bit FNV-1a, remapped away from zero.
pub fn source_id_for(name: &str) -> u32 {
    let hash = name.bytes().fold(FNV_OFFSET, |h, b| {
        (h ^ u32::from(b)).wrapping_mul(FNV_PRIME)
    });
    if hash == 0 { 1 } else { hash }
}

/// Source id of this host.
pub fn device_source_id() -> u32 {
    source_id_for(&read_hostname())
}
