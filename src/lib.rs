//! lilyfeed: level-driven feed scheduler and status board.
//!
//! Exposes the scheduler, protocol and adapters for the two binaries
//! (`lilyfeed`, `lily-board`) and for integration testing.  Everything
//! that touches time, files or sockets sits behind a trait in
//! [`app::ports`] or [`broadcast::transport`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod aggregator;
pub mod app;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod timestamp;

/// Install the process-wide log subscriber.
///
/// `RUST_LOG` selects verbosity (default `info`).  Library code logs
/// through the `log` facade, which the subscriber picks up.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Fails only if a subscriber is already installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
