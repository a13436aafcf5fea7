//! Integration tests: FeederService + FeedScheduler against mock hardware.
//!
//! Every test runs on a [`SimClock`] with a 1 s tick, so step N of a
//! service started at `T` reads the sensor at `T + N - 1` seconds.

use core::time::Duration;

use lilyfeed::adapters::file_store::MemoryStore;
use lilyfeed::app::events::EventKind;
use lilyfeed::app::ports::{Clock, StatePort, StatusSink};
use lilyfeed::app::service::FeederService;
use lilyfeed::app::state::{Phase, ScheduleState};
use lilyfeed::broadcast::protocol::Identity;
use lilyfeed::scheduler::{BootSource, FeedScheduler};
use lilyfeed::timestamp::Timestamp;
use serde_json::json;

use crate::mock_hw::{FailingStore, MockFeeder, RecordingSink, SimClock, test_config};

type Service<P> = FeederService<MockFeeder, SimClock, P, RecordingSink>;

fn service<P: StatePort>(clock: &SimClock, hw: MockFeeder, store: P) -> Service<P> {
    let config = test_config();
    let identity = Identity::new(config.label.as_deref(), 17);
    FeederService::new(
        FeedScheduler::new(config, identity),
        hw,
        clock.clone(),
        store,
        RecordingSink::default(),
    )
}

/// Step until `done` holds, at most `max` steps.
fn run_until<H, P, S>(
    svc: &mut FeederService<H, SimClock, P, S>,
    max: usize,
    done: impl Fn(&FeederService<H, SimClock, P, S>) -> bool,
) where
    H: lilyfeed::app::ports::SensorPort + lilyfeed::app::ports::ActuatorPort,
    P: StatePort,
    S: StatusSink,
{
    for _ in 0..max {
        if done(svc) {
            return;
        }
        svc.step();
    }
    assert!(done(svc), "condition not reached within {max} steps");
}

fn secs(s: u64) -> Timestamp {
    Timestamp::from_secs(s)
}

// ── Cooldown, pulse, confirm ──────────────────────────────────

#[test]
fn cooldown_edge_schedules_and_confirms_one_feed() {
    let clock = SimClock::at_secs(1000);
    let hw = MockFeeder::new(&clock, &[0, 0, 0, 5]);
    let mut svc = service(&clock, hw, MemoryStore::new());

    assert_eq!(svc.start(), BootSource::Cleared);
    run_until(&mut svc, 200, |s| !s.hardware().pulses.is_empty());

    let sink = svc.sink();
    let start = sink.of(EventKind::CooldownStart);
    assert_eq!(start.len(), 1);
    assert_eq!(start[0].time, secs(1002));
    assert_eq!(start[0].level, 5);
    assert_eq!(start[0].ready_at, Some(secs(1002 + 5 * 20 + 1)));
    assert_eq!(start[0].extra.as_ref().unwrap()["cooldown_level"], json!(5));

    assert_eq!(svc.hardware().pulses, vec![secs(1103)]);
    assert_eq!(sink.of(EventKind::FeedDue)[0].time, secs(1103));
    let fired = sink.of(EventKind::Fired);
    assert_eq!(fired[0].time, secs(1103));
    assert_eq!(fired[0].extra.as_ref().unwrap()["pulse_ms"], json!(500));

    let confirm = sink.of(EventKind::Confirm);
    assert_eq!(confirm.len(), 1);
    assert_eq!(confirm[0].ready_at, None);
    assert_eq!(confirm[0].level, 0);
    assert_eq!(confirm[0].extra.as_ref().unwrap()["after_ms"], json!(200));

    let state = svc.scheduler().state();
    assert_eq!(state.ready_at, None);
    assert_eq!(state.fired_at, Some(secs(1103)));
    assert_eq!(state.last_level, Some(0));
    assert_eq!(svc.scheduler().phase(clock.now()), Phase::Idle);
}

#[test]
fn feed_sequence_is_ordered() {
    let clock = SimClock::at_secs(1000);
    let hw = MockFeeder::new(&clock, &[0, 0, 3]);
    let mut svc = service(&clock, hw, MemoryStore::new());
    svc.start();
    run_until(&mut svc, 200, |s| !s.sink().of(EventKind::Confirm).is_empty());

    let feed: Vec<EventKind> = svc
        .sink()
        .events()
        .into_iter()
        .filter(|e| *e != EventKind::Level)
        .collect();
    assert_eq!(
        feed,
        vec![
            EventKind::BootArm,
            EventKind::CooldownStart,
            EventKind::FeedDue,
            EventKind::Fired,
            EventKind::Confirm,
        ]
    );
}

#[test]
fn pulse_happens_at_most_once_per_schedule() {
    let clock = SimClock::at_secs(1000);
    let hw = MockFeeder::new(&clock, &[0, 0, 2]);
    let mut svc = service(&clock, hw, MemoryStore::new());
    svc.start();
    for _ in 0..600 {
        svc.step();
    }
    assert_eq!(svc.hardware().pulses.len(), 1);
    assert_eq!(svc.scheduler().pulses(), 1);
}

#[test]
fn no_pulse_without_cooldown_edge() {
    let clock = SimClock::at_secs(1000);
    let hw = MockFeeder::new(&clock, &[0]);
    let mut svc = service(&clock, hw, MemoryStore::new());
    svc.start();
    for _ in 0..300 {
        svc.step();
    }
    assert!(svc.hardware().pulses.is_empty());
    assert_eq!(svc.scheduler().state().ready_at, None);
}

#[test]
fn level_is_clamped_before_prediction() {
    let clock = SimClock::at_secs(1000);
    let hw = MockFeeder::new(&clock, &[0, 0, 40]);
    let mut svc = service(&clock, hw, MemoryStore::new());
    svc.start();
    svc.step();
    svc.step();

    let start = svc.sink().of(EventKind::CooldownStart);
    assert_eq!(start[0].level, 15);
    assert_eq!(start[0].ready_at, Some(secs(1001 + 15 * 20 + 1)));
}

// ── Retry ─────────────────────────────────────────────────────

#[test]
fn unconfirmed_pulse_rearms_from_fired_at() {
    let clock = SimClock::at_secs(1000);
    let hw = MockFeeder::stuck(&clock, &[0, 0, 5]);
    let mut svc = service(&clock, hw, MemoryStore::new());
    svc.start();
    run_until(&mut svc, 200, |s| !s.sink().of(EventKind::Retry).is_empty());

    // Edge at 1001 s, pulse at 1102 s, window 0.5 s pulse + 4 s polling.
    assert_eq!(svc.hardware().pulses, vec![secs(1102)]);
    let state = svc.scheduler().state();
    assert_eq!(state.fired_at, Some(secs(1102)));
    assert_eq!(state.ready_at, Some(secs(1102 + 5)));
    assert_eq!(svc.scheduler().phase(secs(1106)), Phase::RetryArmed);

    let retry = svc.sink().of(EventKind::Retry);
    assert_eq!(retry[0].time, Timestamp::from_millis(1_106_500));
    assert_eq!(retry[0].ready_at, Some(secs(1107)));
    let extra = retry[0].extra.as_ref().unwrap();
    assert_eq!(extra["attempt"], json!(1));
    assert_eq!(extra["window_ms"], json!(4000));
}

#[test]
fn retries_repeat_until_confirmed() {
    let clock = SimClock::at_secs(1000);
    let hw = MockFeeder::stuck(&clock, &[0, 0, 5]);
    let mut svc = service(&clock, hw, MemoryStore::new());
    svc.start();
    run_until(&mut svc, 300, |s| s.hardware().pulses.len() == 2);

    let pulses = &svc.hardware().pulses;
    assert_eq!(pulses[1], Timestamp::from_millis(1_107_500));
    let retries = svc.sink().of(EventKind::Retry);
    assert_eq!(retries.len(), 2);
    assert_eq!(retries[1].extra.as_ref().unwrap()["attempt"], json!(2));

    // Let the next pulse work.
    svc.hardware_mut().pulse_empties = true;
    run_until(&mut svc, 300, |s| !s.sink().of(EventKind::Confirm).is_empty());

    assert_eq!(svc.sink().of(EventKind::Retry).len(), 2);
    assert_eq!(svc.hardware().pulses.len(), 3);
    assert_eq!(svc.scheduler().state().ready_at, None);
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn boot_while_cooling_down_schedules_conservatively() {
    let clock = SimClock::at_secs(1000);
    let hw = MockFeeder::new(&clock, &[7]);
    let mut svc = service(&clock, hw, MemoryStore::new());

    assert_eq!(svc.start(), BootSource::Conservative);
    let state = svc.scheduler().state().clone();
    assert_eq!(state.ready_at, Some(secs(1000 + 7 * 20 + 1)));
    assert_eq!(state.cooldown_level, Some(7));
    assert_eq!(state.cooldown_started_at, None);
    assert_eq!(state.last_level, Some(7));

    let boot = svc.sink().of(EventKind::BootArm);
    assert_eq!(boot.len(), 1);
    assert_eq!(boot[0].ready_at, Some(secs(1141)));
    assert_eq!(boot[0].extra.as_ref().unwrap()["source"], json!("conservative"));
    assert_eq!(svc.store().load().unwrap(), state);

    run_until(&mut svc, 200, |s| !s.hardware().pulses.is_empty());
    assert_eq!(svc.hardware().pulses, vec![secs(1141)]);
}

#[test]
fn boot_ignores_stale_persisted_ready_at() {
    // The saved ready_at belongs to a cooldown that ended while powered off.
    let clock = SimClock::at_secs(1000);
    let mut store = MemoryStore::new();
    store
        .save(&ScheduleState {
            last_level: Some(7),
            cooldown_level: Some(7),
            cooldown_started_at: Some(secs(359)),
            ready_at: Some(secs(500)),
            fired_at: Some(secs(200)),
        })
        .unwrap();
    let hw = MockFeeder::new(&clock, &[7]);
    let mut svc = service(&clock, hw, store);

    assert_eq!(svc.start(), BootSource::Conservative);
    let state = svc.scheduler().state().clone();
    assert_eq!(state.ready_at, Some(secs(1141)));
    assert_eq!(state.cooldown_started_at, None);
    assert_eq!(state.fired_at, Some(secs(200)));
    assert_eq!(
        svc.sink().of(EventKind::BootArm)[0].extra.as_ref().unwrap()["source"],
        json!("conservative")
    );

    svc.step();
    assert!(svc.hardware().pulses.is_empty());
    run_until(&mut svc, 200, |s| !s.hardware().pulses.is_empty());
    assert_eq!(svc.hardware().pulses, vec![secs(1141)]);
}

#[test]
fn corrupt_store_boots_fresh() {
    let clock = SimClock::at_secs(1000);
    let hw = MockFeeder::new(&clock, &[0]);
    let mut svc = service(&clock, hw, MemoryStore::with_blob(vec![0xFF, 0xFF, 0xFF]));

    assert_eq!(svc.start(), BootSource::Cleared);
    assert_eq!(svc.scheduler().state().ready_at, None);
    // Boot overwrites the corrupt blob with a valid one.
    assert!(svc.store().load().is_ok());
}

#[test]
fn restart_mid_cooldown_reschedules_from_boot() {
    let clock = SimClock::at_secs(1000);
    let hw = MockFeeder::new(&clock, &[0, 0, 4]);
    let mut first = service(&clock, hw, MemoryStore::new());
    first.start();
    for _ in 0..10 {
        first.step();
    }
    assert_eq!(first.scheduler().state().ready_at, Some(secs(1001 + 81)));
    let store = first.store().clone();
    drop(first);

    // Power is back 30 s later; the cooldown is still running but the
    // controller cannot tell how far along it is.
    clock.advance(Duration::from_secs(30));
    assert_eq!(clock.now(), secs(1040));
    let hw = MockFeeder::new(&clock, &[4]);
    let mut second = service(&clock, hw, store);
    assert_eq!(second.start(), BootSource::Conservative);
    assert_eq!(second.scheduler().state().ready_at, Some(secs(1040 + 81)));
    run_until(&mut second, 200, |s| !s.hardware().pulses.is_empty());
    assert_eq!(second.hardware().pulses, vec![secs(1121)]);
}

// ── Status ────────────────────────────────────────────────────

#[test]
fn heartbeat_repeats_every_status_period() {
    let clock = SimClock::at_secs(1000);
    let hw = MockFeeder::new(&clock, &[0]);
    let mut svc = service(&clock, hw, MemoryStore::new());
    svc.start();
    for _ in 0..20 {
        svc.step();
    }
    let times: Vec<Timestamp> = svc
        .sink()
        .of(EventKind::Level)
        .iter()
        .map(|m| m.time)
        .collect();
    assert_eq!(times, vec![secs(1000), secs(1005), secs(1010), secs(1015)]);
}

#[test]
fn level_change_is_reported_immediately() {
    let clock = SimClock::at_secs(1000);
    let hw = MockFeeder::new(&clock, &[0, 0, 0, 6]);
    let mut svc = service(&clock, hw, MemoryStore::new());
    svc.start();
    for _ in 0..3 {
        svc.step();
    }
    let levels = svc.sink().of(EventKind::Level);
    let last = levels.last().unwrap();
    assert_eq!(last.time, secs(1002));
    assert_eq!(last.level, 6);
    assert_eq!(last.label, "kitchen");
    assert_eq!(last.source_id, 17);
}

// ── Degradation ───────────────────────────────────────────────

#[test]
fn failing_store_does_not_stop_feeding() {
    let clock = SimClock::at_secs(1000);
    let hw = MockFeeder::new(&clock, &[0, 0, 2]);
    let mut svc = service(&clock, hw, FailingStore::default());
    svc.start();
    run_until(&mut svc, 100, |s| !s.sink().of(EventKind::Confirm).is_empty());

    assert_eq!(svc.hardware().pulses, vec![secs(1001 + 41)]);
    assert!(!svc.scheduler().is_store_healthy());
    assert!(svc.store().attempts > 40);
}

#[test]
fn unreadable_sensor_reads_as_zero() {
    let clock = SimClock::at_secs(1000);
    let mut hw = MockFeeder::new(&clock, &[5]);
    hw.fail_reads = true;
    let mut svc = service(&clock, hw, MemoryStore::new());

    assert_eq!(svc.start(), BootSource::Cleared);
    for _ in 0..10 {
        svc.step();
    }
    assert!(svc.sink().messages.iter().all(|m| m.level == 0));
    assert!(svc.hardware().pulses.is_empty());
}
