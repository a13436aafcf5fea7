//! Fuzz target: persisted schedule blob
//!
//! Loads arbitrary bytes as a stored schedule.  Decoding must never panic,
//! and anything that does decode must survive a save/load cycle unchanged.
//!
//! cargo fuzz run fuzz_state_blob

#![no_main]

use libfuzzer_sys::fuzz_target;
use lilyfeed::adapters::file_store::MemoryStore;
use lilyfeed::app::ports::StatePort;

fuzz_target!(|data: &[u8]| {
    let store = MemoryStore::with_blob(data.to_vec());
    if let Ok(state) = store.load() {
        let mut fresh = MemoryStore::new();
        fresh.save(&state).expect("memory save cannot fail");
        assert_eq!(fresh.load().expect("just saved"), state);
    }
});
