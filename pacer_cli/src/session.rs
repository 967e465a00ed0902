//! Engine assembly shared by the commands.

use eyre::WrapErr;
use pacer_config::Config;
use pacer_core::{Engine, EngineCfg, FileStore, TickOutput};
use pacer_traits::Clock;

use crate::render;

/// Build an engine over the file store configured in `[persistence]`.
/// Persisted finish times are restored as part of this.
pub fn open_engine(
    cfg: &Config,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> eyre::Result<Engine<FileStore>> {
    let store = FileStore::open(&cfg.persistence.dir)
        .wrap_err_with(|| format!("open store directory {:?}", cfg.persistence.dir))?;
    let mut builder = Engine::builder()
        .with_store(store)
        .with_config(EngineCfg::from(cfg));
    if let Some(c) = clock {
        builder = builder.with_clock(c);
    }
    let engine = builder.build()?;
    let stats = engine.stats();
    if stats.corruption_discards > 0 {
        tracing::warn!("persisted record was corrupt and has been discarded");
    }
    Ok(engine)
}

/// Prints ticks either as a table or as JSON lines.
pub struct Printer {
    json: bool,
    header_done: bool,
}

impl Printer {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            header_done: false,
        }
    }

    pub fn tick(&mut self, elapsed_ms: Option<u32>, distance_m: Option<f64>, out: &TickOutput) {
        if self.json {
            println!("{}", render::json_row(elapsed_ms, out));
            return;
        }
        if !self.header_done {
            println!("{}", render::table_header());
            self.header_done = true;
        }
        println!("{}", render::table_row(elapsed_ms, distance_m, out));
    }

    /// Counters and finish times after a run.
    pub fn summary(&self, engine: &Engine<FileStore>, with_stats: bool) {
        if self.json {
            let finish: Vec<_> = engine
                .milestones()
                .iter()
                .map(|m| serde_json::json!({ "label": m.label, "finish_ms": m.finish_time_ms }))
                .collect();
            let mut obj = serde_json::json!({ "summary": { "milestones": finish } });
            if with_stats {
                obj["summary"]["stats"] = serde_json::json!(engine.stats());
            }
            println!("{obj}");
            return;
        }
        println!();
        for m in engine.milestones() {
            println!("{:<14} {}", m.label, render::fmt_clock(m.finish_time_ms));
        }
        if with_stats {
            let s = engine.stats();
            println!(
                "ticks={} rejected={} anomalies={} faults={} safe_mode={} saves={} io_failures={} discarded={} implausible={}",
                s.ticks,
                s.validation_rejections,
                s.anomaly_rejections,
                s.faults,
                s.safe_mode_entries,
                s.saves,
                s.io_failures,
                s.corruption_discards,
                s.implausible_drops,
            );
        }
    }
}
