//! Integration tests: controllers broadcasting over a loopback bus into a
//! BoardService.

use core::time::Duration;

use lilyfeed::adapters::file_store::MemoryStore;
use lilyfeed::aggregator::Aggregator;
use lilyfeed::app::events::EventKind;
use lilyfeed::app::ports::{Clock, TransportError};
use lilyfeed::app::service::{BoardService, FeederService};
use lilyfeed::broadcast::Broadcaster;
use lilyfeed::broadcast::protocol::{DEFAULT_CHANNEL, Identity};
use lilyfeed::broadcast::transport::{Datagram, Loopback, LoopbackBus, NullTransport, Transport};
use lilyfeed::config::BoardConfig;
use lilyfeed::scheduler::FeedScheduler;
use lilyfeed::timestamp::Timestamp;

use crate::mock_hw::{MockFeeder, RecordingRenderer, SimClock, test_config};

type Feeder = FeederService<MockFeeder, SimClock, MemoryStore, Broadcaster<Loopback>>;

fn feeder(bus: &LoopbackBus, clock: &SimClock, label: &str, id: u32, script: &[u8]) -> Feeder {
    let config = test_config();
    FeederService::new(
        FeedScheduler::new(config, Identity::new(Some(label), id)),
        MockFeeder::new(clock, script),
        clock.clone(),
        MemoryStore::new(),
        Broadcaster::new(bus.endpoint(id), DEFAULT_CHANNEL),
    )
}

fn board<T: Transport>(transport: T, channel: &str) -> BoardService<T, SimClock, RecordingRenderer> {
    BoardService::new(
        Aggregator::new(channel),
        transport,
        SimClock::at_secs(5000),
        RecordingRenderer::default(),
        BoardConfig::default(),
    )
}

/// Step the board until its inbox is empty.
fn drain(board: &mut BoardService<Loopback, SimClock, RecordingRenderer>) {
    while board.transport_mut().pending() > 0 {
        board.step();
    }
}

#[test]
fn board_tracks_controller_state() {
    let bus = LoopbackBus::new();
    let clock = SimClock::at_secs(1000);
    let mut ctl = feeder(&bus, &clock, "kitchen", 17, &[0, 0, 4]);
    let mut board = board(bus.endpoint(0), DEFAULT_CHANNEL);

    ctl.start();
    for _ in 0..6 {
        ctl.step();
    }
    assert!(ctl.sink().sent() > 0);
    drain(&mut board);

    let rec = board.aggregator().get("kitchen").unwrap();
    assert_eq!(rec.source_id, 17);
    assert_eq!(rec.level, 4);
    assert_eq!(rec.ready_at, Some(Timestamp::from_secs(1001 + 81)));
    assert_eq!(rec.last_event, EventKind::Level);
    assert_eq!(rec.last_fired_at, None);
    assert_eq!(rec.updated_at, Timestamp::from_secs(5000));
}

#[test]
fn confirm_keeps_last_ready_at_on_the_board() {
    let bus = LoopbackBus::new();
    let clock = SimClock::at_secs(1000);
    let mut ctl = feeder(&bus, &clock, "kitchen", 17, &[0, 0, 1]);
    let mut board = board(bus.endpoint(0), DEFAULT_CHANNEL);

    ctl.start();
    while ctl.hardware().pulses.is_empty() {
        ctl.step();
    }
    drain(&mut board);

    let rec = board.aggregator().get("kitchen").unwrap();
    assert_eq!(rec.last_event, EventKind::Confirm);
    assert_eq!(rec.level, 0);
    assert_eq!(rec.last_fired_at, Some(Timestamp::from_secs(1022)));
    // The confirm message carries no readyAt, so the old one stays.
    assert_eq!(rec.ready_at, Some(Timestamp::from_secs(1022)));
}

#[test]
fn several_controllers_render_sorted() {
    let bus = LoopbackBus::new();
    let clock = SimClock::at_secs(1000);
    let mut porch = feeder(&bus, &clock, "porch", 2, &[0]);
    let mut attic = feeder(&bus, &clock, "attic", 3, &[6]);
    let mut board = board(bus.endpoint(0), DEFAULT_CHANNEL);

    porch.start();
    attic.start();
    porch.step();
    attic.step();
    drain(&mut board);

    // One more paint after the redraw interval.
    board.clock().sleep(Duration::from_millis(1000));
    assert!(board.step());

    let (_, last) = board.renderer().frames.last().unwrap();
    let labels: Vec<&str> = last.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["attic", "porch"]);
    assert_eq!(last[0].level, 6);
    assert!(last[0].ready_at.is_some());
}

#[test]
fn board_repaints_only_on_redraw_interval() {
    let bus = LoopbackBus::new();
    let mut board = board(bus.endpoint(0), DEFAULT_CHANNEL);

    assert!(board.step());
    assert!(!board.step());
    board.clock().sleep(Duration::from_millis(999));
    assert!(!board.step());
    board.clock().sleep(Duration::from_millis(1));
    assert!(board.step());
    assert_eq!(board.renderer().frames.len(), 2);
}

#[test]
fn other_channels_and_garbage_are_ignored() {
    let bus = LoopbackBus::new();
    let mut stranger = bus.endpoint(99);
    let mut board = board(bus.endpoint(0), DEFAULT_CHANNEL);

    stranger.send(b"{\"kind\":\"lily_status\"}", "other").unwrap();
    stranger.send(b"not json at all", DEFAULT_CHANNEL).unwrap();
    stranger
        .send(
            br#"{"kind":"weather","sourceId":1,"time":0,"level":1,"event":"level"}"#,
            DEFAULT_CHANNEL,
        )
        .unwrap();
    drain(&mut board);

    assert!(board.aggregator().is_empty());
    assert_eq!(board.aggregator().ignored(), 3);
}

#[test]
fn missing_label_falls_back_to_source_id() {
    let bus = LoopbackBus::new();
    let mut stranger = bus.endpoint(7);
    let mut board = board(bus.endpoint(0), DEFAULT_CHANNEL);

    stranger
        .send(
            br#"{"kind":"lily_status","sourceId":7,"time":1000,"level":2,"event":"level"}"#,
            DEFAULT_CHANNEL,
        )
        .unwrap();
    drain(&mut board);

    assert_eq!(board.aggregator().get("id_7").unwrap().level, 2);
}

#[test]
fn receive_errors_back_off() {
    struct Broken;
    impl Transport for Broken {
        fn send(&mut self, _p: &[u8], _c: &str) -> Result<(), TransportError> {
            Err(TransportError::SendFailed)
        }
        fn receive(&mut self, _t: Duration) -> Result<Option<Datagram>, TransportError> {
            Err(TransportError::ReceiveFailed)
        }
    }

    let mut board = board(Broken, DEFAULT_CHANNEL);
    let before = board.clock().now();
    board.step();
    board.step();
    assert_eq!(board.clock().now().since(before), Duration::from_millis(500));
    assert!(board.aggregator().is_empty());
}

#[test]
fn controller_runs_with_broadcast_disabled() {
    let clock = SimClock::at_secs(1000);
    let mut ctl = FeederService::new(
        FeedScheduler::new(test_config(), Identity::new(Some("solo"), 1)),
        MockFeeder::new(&clock, &[0, 0, 1]),
        clock.clone(),
        MemoryStore::new(),
        Broadcaster::<NullTransport>::disabled(DEFAULT_CHANNEL),
    );
    ctl.start();
    for _ in 0..30 {
        ctl.step();
    }
    assert_eq!(ctl.hardware().pulses, vec![Timestamp::from_secs(1022)]);
    assert!(!ctl.sink().is_enabled());
    assert_eq!(ctl.sink().sent(), 0);
}
