//! Live mode: one sample per stdin line, wall-clock engine time.

use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, bounded};
use pacer_config::Config;
use pacer_core::Sample;

use crate::session::{Printer, open_engine};

const POLL: Duration = Duration::from_millis(100);

enum Line {
    Sample(String),
    Pause,
    Reset,
}

fn classify(raw: &str) -> Option<Line> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    Some(match line {
        "pause" | "stop" => Line::Pause,
        "reset" => Line::Reset,
        _ => Line::Sample(line.to_string()),
    })
}

/// Run until stdin closes or Ctrl-C; both end with a flush of pending
/// finish times.
pub fn run_live(cfg: &Config, json: bool, shutdown: &Arc<AtomicBool>) -> eyre::Result<()> {
    let mut engine = open_engine(cfg, None)?;
    let mut printer = Printer::new(json);

    let (tx, rx) = bounded::<Line>(64);
    std::thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for raw in stdin.lock().lines() {
                let Ok(raw) = raw else { break };
                if let Some(line) = classify(&raw)
                    && tx.send(line).is_err()
                {
                    break;
                }
            }
        })?;

    tracing::info!("live session start");
    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("interrupted");
            break;
        }
        let line = match rx.recv_timeout(POLL) {
            Ok(l) => l,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        match line {
            Line::Pause => {
                if let Err(e) = engine.on_pause_or_stop() {
                    tracing::warn!(error = %e, "flush failed");
                }
            }
            Line::Reset => engine.on_reset()?,
            Line::Sample(text) => match pacer_config::parse_trace_line(&text) {
                Ok(row) => {
                    let out = engine.tick(&Sample::from(&row));
                    printer.tick(row.elapsed_ms, row.distance_m, &out);
                }
                Err(e) => tracing::warn!(error = %e, line = %text, "skipping unparsable line"),
            },
        }
    }

    engine.on_pause_or_stop()?;
    printer.summary(&engine, false);
    Ok(())
}
