//! Fuzz target: `Aggregator::ingest`
//!
//! Feeds arbitrary payloads to the board's aggregator on its own channel
//! and checks that it never panics, that every datagram is either accepted
//! or ignored, and that an accepted one always leaves a record behind.
//!
//! cargo fuzz run fuzz_status_ingest

#![no_main]

use libfuzzer_sys::fuzz_target;
use lilyfeed::aggregator::Aggregator;
use lilyfeed::broadcast::protocol::DEFAULT_CHANNEL;
use lilyfeed::broadcast::transport::Datagram;
use lilyfeed::timestamp::Timestamp;

fuzz_target!(|data: &[u8]| {
    let mut agg = Aggregator::new(DEFAULT_CHANNEL);
    let datagram = Datagram {
        sender_id: 1,
        payload: data.to_vec(),
        channel: DEFAULT_CHANNEL.to_string(),
    };

    let accepted = agg.ingest(&datagram, Timestamp::from_secs(1)).is_some();
    assert_eq!(agg.accepted() + agg.ignored(), 1);
    assert_eq!(accepted, agg.len() == 1);

    // A second copy updates the same record in place.
    agg.ingest(&datagram, Timestamp::from_secs(2));
    assert!(agg.len() <= 1);
});
