//! Terminal renderer for the status board.
//!
//! Repaints the whole table on every call: an ANSI clear-and-home, a header
//! line, then one row per record in label order.
//!
//! ```text
//! lily-status board  12:01:40  2 sources
//! LABEL             LVL  EVENT           READY      LAST FIRED  AGE
//! kitchen             5  cooldown_start  in 1m41s   --          2s
//! porch               0  confirm         --         11:58:02    14s
//! ```
//!
//! Wall-clock columns are formatted with `chrono`; relative columns
//! (countdown, age) are computed against the `now` passed by the board.

use std::io::Write;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use log::warn;

use crate::aggregator::DisplayRecord;
use crate::app::ports::Renderer;
use crate::timestamp::Timestamp;

const CLEAR_HOME: &str = "\x1b[2J\x1b[H";

pub struct TerminalRenderer<W> {
    out: W,
    title: String,
    ansi: bool,
    utc: bool,
    write_failed: bool,
}

impl<W: Write> TerminalRenderer<W> {
    /// ANSI output, local time zone.
    pub fn new(out: W, title: impl Into<String>) -> Self {
        Self {
            out,
            title: title.into(),
            ansi: true,
            utc: false,
            write_failed: false,
        }
    }

    /// Plain output (no escape codes), UTC times.  For logs and tests.
    pub fn plain(out: W, title: impl Into<String>) -> Self {
        Self {
            ansi: false,
            utc: true,
            ..Self::new(out, title)
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    fn clock(&self, ts: Timestamp) -> String {
        format_clock(ts, self.utc)
    }

    fn paint(&mut self, records: &[DisplayRecord], now: Timestamp) -> std::io::Result<()> {
        let mut frame = String::new();
        if self.ansi {
            frame.push_str(CLEAR_HOME);
        }
        frame.push_str(&format!(
            "{} board  {}  {} source{}\n",
            self.title,
            self.clock(now),
            records.len(),
            if records.len() == 1 { "" } else { "s" }
        ));
        frame.push_str(&format!(
            "{:<16}  {:>3}  {:<14}  {:<9}  {:<10}  {}\n",
            "LABEL", "LVL", "EVENT", "READY", "LAST FIRED", "AGE"
        ));
        for r in records {
            let ready = match r.ready_at {
                Some(at) if at > now => format!("in {}", format_span(at.until_from(now))),
                Some(_) => "due".to_string(),
                None => "--".to_string(),
            };
            let fired = r
                .last_fired_at
                .map_or_else(|| "--".to_string(), |at| self.clock(at));
            frame.push_str(&format!(
                "{:<16}  {:>3}  {:<14}  {:<9}  {:<10}  {}\n",
                r.label,
                r.level,
                r.last_event.as_str(),
                ready,
                fired,
                format_span(now.since(r.updated_at))
            ));
        }
        self.out.write_all(frame.as_bytes())?;
        self.out.flush()
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn render(&mut self, records: &[DisplayRecord], now: Timestamp) {
        if let Err(e) = self.paint(records, now) {
            if !self.write_failed {
                warn!("Terminal: write failed ({})", e);
            }
            self.write_failed = true;
        }
    }
}

/// `HH:MM:SS` in UTC or the local zone.  Out-of-range stamps print `?`.
pub fn format_clock(ts: Timestamp, utc: bool) -> String {
    let Ok(ms) = i64::try_from(ts.as_millis()) else {
        return "?".to_string();
    };
    match DateTime::<Utc>::from_timestamp_millis(ms) {
        Some(dt) if utc => dt.format("%H:%M:%S").to_string(),
        Some(dt) => dt.with_timezone(&Local).format("%H:%M:%S").to_string(),
        None => "?".to_string(),
    }
}

/// Compact span: `45s`, `1m41s`, `2h05m`.
pub fn format_span(span: Duration) -> String {
    let secs = span.as_secs();
    match secs {
        0..60 => format!("{secs}s"),
        60..3600 => format!("{}m{:02}s", secs / 60, secs % 60),
        _ => format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60),
    }
}
