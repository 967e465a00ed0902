//! Trace replay with a clock driven by the trace itself.

use std::path::Path;
use std::time::Duration;

use pacer_config::Config;
use pacer_core::Sample;
use pacer_traits::ManualClock;

use crate::session::{Printer, open_engine};

pub struct ReplayOpts<'a> {
    pub trace: &'a Path,
    pub fresh: bool,
    pub every: usize,
    pub stats: bool,
    pub json: bool,
}

/// Feed every row of the trace to the engine, then flush like a stopped
/// activity would.
///
/// The engine clock follows `elapsed_ms`, so celebration holds and write
/// throttling behave as they did during the recorded run.
pub fn run_replay(cfg: &Config, opts: &ReplayOpts<'_>) -> eyre::Result<()> {
    let rows = pacer_config::load_trace_csv(opts.trace)?;
    let clock = ManualClock::new();
    let mut engine = open_engine(cfg, Some(Box::new(clock.clone())))?;
    if opts.fresh {
        engine.on_reset()?;
    }

    tracing::info!(rows = rows.len(), trace = ?opts.trace, "replay start");
    let every = opts.every.max(1);
    let mut printer = Printer::new(opts.json);
    let last = rows.len().saturating_sub(1);
    for (i, row) in rows.iter().enumerate() {
        if let Some(t) = row.elapsed_ms {
            clock.set_offset(Duration::from_millis(u64::from(t)));
        }
        let out = engine.tick(&Sample::from(row));
        if i % every == 0 || i == last {
            printer.tick(row.elapsed_ms, row.distance_m, &out);
        }
    }

    engine.on_pause_or_stop()?;
    tracing::info!(stats = ?engine.stats(), "replay done");
    printer.summary(&engine, opts.stats);
    Ok(())
}
