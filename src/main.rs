//! lilyfeed controller: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  LevelFile      PinActuator     FileStore     SystemClock    │
//! │  (SensorPort)   (ActuatorPort)  (StatePort)   (Clock)        │
//! │  UdpTransport ─▶ Broadcaster (StatusSink)                    │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │   FeederService ─▶ FeedScheduler (pure logic)      │      │
//! │  └────────────────────────────────────────────────────┘      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `lilyfeed [CONFIG_PATH]`

use anyhow::{Context, Result, bail};
use log::{info, warn};

use lilyfeed::adapters::device_id;
use lilyfeed::adapters::file_store::FileStore;
use lilyfeed::adapters::hardware::FeederHardware;
use lilyfeed::adapters::pulse::PinActuator;
use lilyfeed::adapters::sysfs::{LevelFile, ValueFilePin};
use lilyfeed::adapters::time::{StdDelay, SystemClock};
use lilyfeed::adapters::udp::UdpTransport;
use lilyfeed::app::service::FeederService;
use lilyfeed::broadcast::Broadcaster;
use lilyfeed::broadcast::protocol::Identity;
use lilyfeed::config;
use lilyfeed::scheduler::FeedScheduler;

fn main() -> Result<()> {
    lilyfeed::init_logging();
    info!("lilyfeed v{}", env!("CARGO_PKG_VERSION"));

    // ── Configuration ─────────────────────────────────────────
    let path = config::config_path(std::env::args().nth(1));
    let settings = config::load(&path).with_context(|| format!("config {}", path.display()))?;
    let feeder = settings.feeder;

    let source_id = feeder.source_id.unwrap_or_else(device_id::device_source_id);
    let identity = Identity::new(feeder.label.as_deref(), source_id);
    info!("Identity: '{}' (id {})", identity.label, identity.source_id);

    // ── Adapters ──────────────────────────────────────────────
    let store = FileStore::new(&feeder.state_path);
    let hw = FeederHardware::new(
        LevelFile::new(&feeder.sensor_path),
        PinActuator::new(ValueFilePin::new(&feeder.actuator_path), StdDelay),
    );

    let bc = &settings.broadcast;
    let sink = match UdpTransport::sender(bc.port, &bc.broadcast_addr, source_id) {
        Ok(transport) => Broadcaster::new(transport, bc.channel.as_str()),
        Err(e) if bc.required => bail!("status transport unavailable: {e}"),
        Err(e) => {
            warn!("Status transport unavailable ({}), running without broadcasts", e);
            Broadcaster::disabled(bc.channel.as_str())
        }
    };

    // ── Run ───────────────────────────────────────────────────
    let scheduler = FeedScheduler::new(feeder, identity);
    let service = FeederService::new(scheduler, hw, SystemClock::new(), store, sink);
    info!("System ready. Entering control loop.");
    service.run()
}
