//! lily-board: status board entry point.
//!
//! Listens for controller status broadcasts and repaints a sorted table
//! on the terminal.
//!
//! Usage: `lily-board [CONFIG_PATH]`

use anyhow::{Context, Result};
use log::info;

use lilyfeed::adapters::terminal::TerminalRenderer;
use lilyfeed::adapters::time::SystemClock;
use lilyfeed::adapters::udp::UdpTransport;
use lilyfeed::aggregator::Aggregator;
use lilyfeed::app::service::BoardService;
use lilyfeed::config;
use lilyfeed::error::Error;

fn main() -> Result<()> {
    lilyfeed::init_logging();
    info!("lily-board v{}", env!("CARGO_PKG_VERSION"));

    let path = config::config_path(std::env::args().nth(1));
    let settings = config::load(&path).with_context(|| format!("config {}", path.display()))?;
    let bc = &settings.broadcast;

    let transport = UdpTransport::listener(bc.port, &bc.broadcast_addr)
        .map_err(Error::from)
        .with_context(|| format!("bind UDP port {}", bc.port))?;
    let renderer = TerminalRenderer::new(std::io::stdout(), bc.channel.as_str());

    let service = BoardService::new(
        Aggregator::new(bc.channel.as_str()),
        transport,
        SystemClock::new(),
        renderer,
        settings.board,
    );
    service.run()
}
