//! Feed scheduler: cooldown prediction, confirm/retry and boot recovery.
//!
//! One instance per controller.  It owns the [`ScheduleState`] and is driven
//! by a single cooperative loop calling [`FeedScheduler::tick`] at a fixed
//! period.  All I/O goes through port traits passed in at call sites.
//!
//! ```text
//!            0 → L edge                 now ≥ ready_at
//!   Idle ───────────────▶ CooldownArmed ───────────────▶ FeedDue
//!    ▲                                                      │ pulse
//!    │  >0 → 0 inside window                                ▼
//!    └──────────────────────────────────────────────── Confirming
//!                                                           │ window elapsed
//!                      RetryArmed ◀─────────────────────────┘
//!                      (ready_at = fired_at + retry delay)
//! ```
//!
//! A 0 → L edge seen inside the confirmation window goes straight back to
//! CooldownArmed with a fresh prediction.
//!
//! A pulse is only ever issued from the feed step, and the feed step always
//! either clears `ready_at` or re-arms it to a new instant before returning,
//! so each `ready_at` instance produces at most one pulse.

use log::{debug, info, warn};
use serde_json::json;

use crate::app::events::{EventKind, Extra, extra};
use crate::app::ports::{ActuatorPort, Clock, SensorPort, StatePort, StatusSink, StorageError};
use crate::app::state::{Phase, ScheduleState, clamp_level};
use crate::broadcast::protocol::{Identity, status_message};
use crate::config::FeederConfig;
use crate::error::Error;
use crate::timestamp::Timestamp;

/// What the boot policy did with the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootSource {
    /// Sensor cooling down: scheduled as if the cooldown had just started.
    /// Any persisted `ready_at` is replaced.
    Conservative,
    /// Sensor producing: any stale schedule was dropped.
    Cleared,
}

impl BootSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Cleared => "cleared",
        }
    }
}

/// Outcome of one feed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    /// A >0 → 0 edge was seen inside the window.
    Confirmed,
    /// A 0 → L edge was seen inside the window: a new cooldown replaced
    /// the schedule.
    Rescheduled,
    /// Neither edge: re-armed for a retry.
    Retry,
}

impl FeedOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Rescheduled => "rescheduled",
            Self::Retry => "retry",
        }
    }
}

pub struct FeedScheduler {
    config: FeederConfig,
    identity: Identity,
    state: ScheduleState,
    /// When the last `level` status went out (heartbeat bookkeeping).
    last_status_at: Option<Timestamp>,
    /// Consecutive unconfirmed pulses for the current schedule.
    retry_attempt: u32,
    pulses: u64,
    store_healthy: bool,
    sensor_healthy: bool,
}

impl FeedScheduler {
    pub fn new(config: FeederConfig, identity: Identity) -> Self {
        Self::with_state(config, identity, ScheduleState::default())
    }

    /// Construct around an already-known state (tests, tooling).
    pub fn with_state(config: FeederConfig, identity: Identity, state: ScheduleState) -> Self {
        Self {
            config,
            identity,
            state,
            last_status_at: None,
            retry_attempt: 0,
            pulses: 0,
            store_healthy: true,
            sensor_healthy: true,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Restore the persisted state and apply the boot policy.
    ///
    /// Call once before the first [`tick`](Self::tick).
    pub fn boot(
        &mut self,
        sensor: &mut impl SensorPort,
        clock: &impl Clock,
        store: &mut impl StatePort,
        sink: &mut impl StatusSink,
    ) -> BootSource {
        match store.load() {
            Ok(state) => {
                info!("Scheduler: restored schedule {:?}", state);
                self.state = state;
            }
            Err(StorageError::NotFound) => {
                info!("Scheduler: no persisted schedule, starting fresh");
            }
            Err(e) => {
                warn!("Scheduler: {}, starting fresh", Error::from(e));
            }
        }

        let now = clock.now();
        let level = self.read_level(sensor);

        let source = if level == 0 {
            self.state.clear_schedule();
            BootSource::Cleared
        } else {
            // Cannot know how long the cooldown already ran, and a persisted
            // ready_at may belong to a cooldown that ended while we were
            // down: never early, possibly late.
            self.state.ready_at = Some(self.predict_ready_at(now, level));
            self.state.cooldown_level = Some(level);
            self.state.cooldown_started_at = None;
            BootSource::Conservative
        };
        self.state.last_level = Some(level);
        self.persist(store);

        info!(
            "Scheduler: boot level={} source={} phase={:?} ready_at={:?}",
            level,
            source.as_str(),
            self.phase(now),
            self.state.ready_at
        );
        self.emit(
            sink,
            level,
            EventKind::BootArm,
            Some(extra([("source", json!(source.as_str()))])),
            now,
        );
        source
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle: read → edge → status → feed → persist.
    ///
    /// The `hw` parameter satisfies **both** [`SensorPort`] and
    /// [`ActuatorPort`], so the confirmation window can poll the same
    /// sensor the pulse is meant to affect.
    ///
    /// A tick without a feed saves once, at the end.  A feed saves twice:
    /// once right after the pulse, so a crash in the window cannot pulse
    /// again, and once with the window's outcome.
    pub fn tick(
        &mut self,
        hw: &mut (impl SensorPort + ActuatorPort),
        clock: &impl Clock,
        store: &mut impl StatePort,
        sink: &mut impl StatusSink,
    ) {
        let now = clock.now();
        let level = self.read_level(hw);
        let previous = self.state.last_level;

        // 1. New cooldown on a 0 → L edge
        if previous == Some(0) && level > 0 {
            self.start_cooldown(level, now, sink);
        }

        // 2. Level change or heartbeat
        let heartbeat_due = self
            .last_status_at
            .is_none_or(|at| now.since(at) >= self.config.status_period());
        if previous != Some(level) || heartbeat_due {
            self.emit(sink, level, EventKind::Level, None, now);
            self.last_status_at = Some(now);
        }

        // 3. Feed step (persists its own outcome, last_level included)
        if self.state.ready_at.is_some_and(|at| now >= at) {
            let outcome = self.feed(level, now, hw, clock, store, sink);
            debug!("Scheduler: feed step {}", outcome.as_str());
            return;
        }

        // 4. Edge bookkeeping
        self.state.last_level = Some(level);
        self.persist(store);
    }

    /// Arm a fresh cooldown observed at `at`.  The caller persists.
    fn start_cooldown(&mut self, level: u8, at: Timestamp, sink: &mut impl StatusSink) {
        let ready_at = self.predict_ready_at(at, level);
        self.state.cooldown_level = Some(level);
        self.state.cooldown_started_at = Some(at);
        self.state.ready_at = Some(ready_at);
        self.retry_attempt = 0;
        info!("Scheduler: cooldown L={} started, ready at {}", level, ready_at);
        self.emit(
            sink,
            level,
            EventKind::CooldownStart,
            Some(extra([("cooldown_level", json!(level))])),
            at,
        );
    }

    /// Pulse, then watch the sensor for the edge that proves it worked.
    ///
    /// Inside the window a >0 → 0 edge confirms the feed.  A 0 → L edge
    /// (the feed started while producing, and a cooldown began meanwhile)
    /// is scheduled like any other cooldown instead of being lost.
    fn feed(
        &mut self,
        level: u8,
        now: Timestamp,
        hw: &mut (impl SensorPort + ActuatorPort),
        clock: &impl Clock,
        store: &mut impl StatePort,
        sink: &mut impl StatusSink,
    ) -> FeedOutcome {
        self.emit(sink, level, EventKind::FeedDue, None, now);

        if let Err(e) = hw.pulse(self.config.pulse()) {
            // No success signal either way; the window below decides.
            warn!("Scheduler: {}", Error::from(e));
        }
        self.state.fired_at = Some(now);
        self.pulses += 1;
        self.persist(store);
        info!("Scheduler: pulse #{} fired at {}", self.pulses, now);
        self.emit(
            sink,
            level,
            EventKind::Fired,
            Some(extra([("pulse_ms", json!(self.config.pulse_ms))])),
            now,
        );

        // Confirming
        let window = self.config.confirm_window();
        let poll = self.config.confirm_poll();
        let window_start = clock.now();
        let mut prev = level;
        let mut confirmed_after = None;
        let mut rise = None;
        while clock.now().since(window_start) < window {
            clock.sleep(poll);
            let sample = self.read_level(hw);
            if prev > 0 && sample == 0 {
                confirmed_after = Some(clock.now().since(window_start));
                prev = sample;
                break;
            }
            if prev == 0 && sample > 0 && rise.is_none() {
                rise = Some((sample, clock.now()));
            }
            prev = sample;
        }

        let at = clock.now();
        self.state.last_level = Some(prev);
        if let Some(after) = confirmed_after {
            self.state.ready_at = None;
            self.retry_attempt = 0;
            self.persist(store);
            info!("Scheduler: feed confirmed after {}ms", after.as_millis());
            self.emit(
                sink,
                prev,
                EventKind::Confirm,
                Some(extra([("after_ms", json!(after.as_millis() as u64))])),
                at,
            );
            FeedOutcome::Confirmed
        } else if let Some((rise_level, rise_at)) = rise {
            self.start_cooldown(rise_level, rise_at, sink);
            self.persist(store);
            FeedOutcome::Rescheduled
        } else {
            let retry_at = now.plus_secs(self.config.retry_delay_seconds);
            self.state.ready_at = Some(retry_at);
            self.retry_attempt += 1;
            self.persist(store);
            warn!(
                "Scheduler: no confirmation within {}ms, retry #{} at {}",
                self.config.confirm_window_ms, self.retry_attempt, retry_at
            );
            self.emit(
                sink,
                prev,
                EventKind::Retry,
                Some(extra([
                    ("attempt", json!(self.retry_attempt)),
                    ("window_ms", json!(self.config.confirm_window_ms)),
                ])),
                at,
            );
            FeedOutcome::Retry
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// `now + level * unit + buffer`.
    pub fn predict_ready_at(&self, now: Timestamp, level: u8) -> Timestamp {
        now.plus_secs(u64::from(level) * self.config.unit_seconds + self.config.extra_buffer_seconds)
    }

    pub fn state(&self) -> &ScheduleState {
        &self.state
    }

    pub fn phase(&self, now: Timestamp) -> Phase {
        self.state.phase(now)
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn config(&self) -> &FeederConfig {
        &self.config
    }

    /// Pulses issued since startup.
    pub fn pulses(&self) -> u64 {
        self.pulses
    }

    /// Whether the last save succeeded.
    pub fn is_store_healthy(&self) -> bool {
        self.store_healthy
    }

    // ── Internal ──────────────────────────────────────────────

    fn read_level(&mut self, sensor: &mut impl SensorPort) -> u8 {
        match sensor.read_level() {
            Ok(raw) => {
                if !self.sensor_healthy {
                    info!("Scheduler: sensor readable again");
                    self.sensor_healthy = true;
                }
                clamp_level(raw)
            }
            Err(e) => {
                if self.sensor_healthy {
                    warn!("Scheduler: {}, assuming level 0", Error::from(e));
                    self.sensor_healthy = false;
                }
                0
            }
        }
    }

    fn persist(&mut self, store: &mut impl StatePort) {
        match store.save(&self.state) {
            Ok(()) => {
                if !self.store_healthy {
                    info!("Scheduler: state store writable again");
                    self.store_healthy = true;
                }
            }
            Err(e) => {
                if self.store_healthy {
                    warn!("Scheduler: {}, continuing in memory", Error::from(e));
                    self.store_healthy = false;
                } else {
                    debug!("Scheduler: save still failing ({})", e);
                }
            }
        }
    }

    fn emit(
        &self,
        sink: &mut impl StatusSink,
        level: u8,
        event: EventKind,
        extra: Option<Extra>,
        now: Timestamp,
    ) {
        let message = status_message(&self.identity, &self.state, level, event, extra, now);
        sink.publish(&message);
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
