//! Inspect and reset the persisted finish-time record.

use eyre::WrapErr;
use pacer_config::Config;
use pacer_core::persistence::validate_record;
use pacer_core::{EngineCfg, FileStore, PersistError, PersistedRecord};
use pacer_traits::KvStore;
use serde_json::json;

use crate::render::fmt_clock;
use crate::session::open_engine;

/// Print the stored record against the configured milestone table.
///
/// Read-only: a corrupt record is reported with a non-zero exit but left in
/// place; the next engine start discards it.
pub fn run_inspect(cfg: &Config, json_out: bool) -> eyre::Result<()> {
    let engine_cfg = EngineCfg::from(cfg);
    let mut store = FileStore::open(&cfg.persistence.dir)
        .wrap_err_with(|| format!("open store directory {:?}", cfg.persistence.dir))?;
    let key = &engine_cfg.persistence.key;

    let Some(bytes) = store.get(key).map_err(PersistError::Io)? else {
        if json_out {
            println!("{}", json!({ "record": null }));
        } else {
            println!("no record at {}", store.path_for(key).display());
        }
        return Ok(());
    };

    let rec = PersistedRecord::decode(&bytes).map_err(PersistError::Corrupt)?;
    validate_record(
        &rec,
        engine_cfg.tracking.milestones.len(),
        engine_cfg.persistence.max_plausible_time_ms,
    )
    .map_err(PersistError::Corrupt)?;

    if json_out {
        let rows: Vec<_> = engine_cfg
            .tracking
            .milestones
            .iter()
            .zip(&rec.finish_times)
            .map(|(m, t)| json!({ "label": m.label, "finish_ms": t }))
            .collect();
        println!(
            "{}",
            json!({ "record": { "version": rec.version, "checksum": rec.checksum, "milestones": rows } })
        );
        return Ok(());
    }

    println!("record v{} checksum {} (ok)", rec.version, rec.checksum);
    for (m, t) in engine_cfg.tracking.milestones.iter().zip(&rec.finish_times) {
        println!("{:<14} {}", m.label, fmt_clock(*t));
    }
    Ok(())
}

/// Clear all finish times and delete the stored record.
pub fn run_reset(cfg: &Config) -> eyre::Result<()> {
    let mut engine = open_engine(cfg, None)?;
    engine.on_reset()?;
    println!("reset: finish times cleared");
    Ok(())
}
