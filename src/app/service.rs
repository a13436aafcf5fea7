//! Application services: the two cooperative loops.
//!
//! [`FeederService`] owns a [`FeedScheduler`] and every adapter it drives;
//! [`BoardService`] owns an [`Aggregator`], a transport and a renderer.
//! Each loop is the exclusive owner of its resources, so nothing here
//! locks.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────┐ ──▶ StatusSink ─ ─ ─ ┐
//! ActuatorPort ◀──│  FeederService   │ ──▶ StatePort        │ datagrams
//!        Clock ──▶└──────────────────┘                      ▼
//!                                         ┌──────────────────┐
//!                           Transport ──▶ │   BoardService   │ ──▶ Renderer
//!                                         └──────────────────┘
//! ```

use log::{info, warn};

use crate::aggregator::Aggregator;
use crate::app::ports::{ActuatorPort, Clock, Renderer, SensorPort, StatePort, StatusSink};
use crate::broadcast::transport::Transport;
use crate::config::BoardConfig;
use crate::scheduler::{BootSource, FeedScheduler};
use crate::timestamp::Timestamp;

// ───────────────────────────────────────────────────────────────
// FeederService
// ───────────────────────────────────────────────────────────────

pub struct FeederService<H, C, P, S> {
    scheduler: FeedScheduler,
    hw: H,
    clock: C,
    store: P,
    sink: S,
    booted: bool,
}

impl<H, C, P, S> FeederService<H, C, P, S>
where
    H: SensorPort + ActuatorPort,
    C: Clock,
    P: StatePort,
    S: StatusSink,
{
    pub fn new(scheduler: FeedScheduler, hw: H, clock: C, store: P, sink: S) -> Self {
        Self {
            scheduler,
            hw,
            clock,
            store,
            sink,
            booted: false,
        }
    }

    /// Restore persisted state and apply the boot policy.
    pub fn start(&mut self) -> BootSource {
        self.booted = true;
        self.scheduler
            .boot(&mut self.hw, &self.clock, &mut self.store, &mut self.sink)
    }

    /// One tick followed by the inter-tick sleep.
    pub fn step(&mut self) {
        if !self.booted {
            self.start();
        }
        self.scheduler
            .tick(&mut self.hw, &self.clock, &mut self.store, &mut self.sink);
        self.clock.sleep(self.scheduler.config().tick());
    }

    /// Run forever.  Termination is external; the next start recovers via
    /// the persisted state.
    pub fn run(mut self) -> ! {
        if !self.booted {
            self.start();
        }
        info!(
            "FeederService: '{}' running, tick {}ms",
            self.scheduler.identity().label,
            self.scheduler.config().tick_ms
        );
        loop {
            self.step();
        }
    }

    pub fn scheduler(&self) -> &FeedScheduler {
        &self.scheduler
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

// ───────────────────────────────────────────────────────────────
// BoardService
// ───────────────────────────────────────────────────────────────

pub struct BoardService<T, C, R> {
    aggregator: Aggregator,
    transport: T,
    clock: C,
    renderer: R,
    config: BoardConfig,
    last_paint: Option<Timestamp>,
    receive_errors: u64,
}

impl<T, C, R> BoardService<T, C, R>
where
    T: Transport,
    C: Clock,
    R: Renderer,
{
    pub fn new(aggregator: Aggregator, transport: T, clock: C, renderer: R, config: BoardConfig) -> Self {
        Self {
            aggregator,
            transport,
            clock,
            renderer,
            config,
            last_paint: None,
            receive_errors: 0,
        }
    }

    /// Drain at most one datagram (bounded wait), then repaint if the
    /// redraw interval has elapsed.  Returns whether a repaint happened.
    pub fn step(&mut self) -> bool {
        match self.transport.receive(self.config.receive_timeout()) {
            Ok(Some(datagram)) => {
                let now = self.clock.now();
                self.aggregator.ingest(&datagram, now);
            }
            Ok(None) => {}
            Err(e) => {
                self.receive_errors += 1;
                if self.receive_errors == 1 {
                    warn!("BoardService: receive failed ({})", e);
                }
                // Keep the loop from spinning on a persistent error.
                self.clock.sleep(self.config.receive_timeout());
            }
        }

        let now = self.clock.now();
        let due = self
            .last_paint
            .is_none_or(|at| now.since(at) >= self.config.redraw());
        if due {
            self.renderer.render(&self.aggregator.snapshot(), now);
            self.last_paint = Some(now);
        }
        due
    }

    pub fn run(mut self) -> ! {
        info!(
            "BoardService: listening on '{}', redraw {}ms",
            self.aggregator.channel(),
            self.config.redraw_ms
        );
        loop {
            self.step();
        }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
