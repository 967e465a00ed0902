use std::time::Duration;

use pacer_core::config::{EngineCfg, MilestoneDef};
use pacer_core::{Engine, EngineStatus, MemoryStore, Sample};
use pacer_traits::ManualClock;

fn engine_with(cfg: EngineCfg) -> (Engine<MemoryStore>, ManualClock) {
    let clock = ManualClock::new();
    let e = Engine::builder()
        .with_store(MemoryStore::new())
        .with_config(cfg)
        .with_clock(Box::new(clock.clone()))
        .build()
        .expect("build");
    (e, clock)
}

fn at(e: &mut Engine<MemoryStore>, clock: &ManualClock, d: f64, t_ms: u32) -> pacer_core::TickOutput {
    clock.set_offset(Duration::from_millis(u64::from(t_ms)));
    e.tick(&Sample::new(d, t_ms))
}

fn labels(out: &pacer_core::TickOutput) -> Vec<String> {
    out.slots
        .iter()
        .map(|s| s.as_ref().map_or("-".to_string(), |v| v.label.to_string()))
        .collect()
}

#[test]
fn celebration_holds_for_fifteen_seconds_then_rotates() {
    let (mut e, clock) = engine_with(EngineCfg::default());
    let out = at(&mut e, &clock, 5000.0, 1_800_000);
    assert_eq!(out.celebrating, Some(0));
    assert_eq!(labels(&out), ["5K", "5MI", "10K"]);

    let out = at(&mut e, &clock, 5041.0, 1_814_900);
    assert_eq!(out.celebrating, Some(0));
    assert_eq!(out.slots[0].as_ref().unwrap().display_time_ms, Some(1_800_000));

    let out = at(&mut e, &clock, 5044.0, 1_815_000);
    assert_eq!(out.celebrating, None);
    assert_eq!(labels(&out), ["5MI", "10K", "10MI"]);
}

#[test]
fn completion_during_celebration_does_not_rotate_again() {
    let mut cfg = EngineCfg::default();
    cfg.tracking.milestones = vec![
        MilestoneDef::new("A", 10_000),
        MilestoneDef::new("B", 12_000),
        MilestoneDef::new("C", 50_000),
        MilestoneDef::new("D", 90_000),
    ];
    let (mut e, clock) = engine_with(cfg);
    let out = at(&mut e, &clock, 100.0, 30_000);
    assert_eq!(out.celebrating, Some(0));
    let out = at(&mut e, &clock, 120.0, 35_000);
    assert_eq!(out.celebrating, Some(0));
    assert!(out.slots[1].as_ref().unwrap().is_completed);

    let out = at(&mut e, &clock, 140.0, 45_000);
    assert_eq!(labels(&out), ["C", "D", "-"]);
}

#[test]
fn last_milestone_locks_display_and_reports_complete() {
    let mut cfg = EngineCfg::default();
    cfg.tracking.milestones = vec![MilestoneDef::new("1K", 100_000), MilestoneDef::new("2K", 200_000)];
    let (mut e, clock) = engine_with(cfg);

    at(&mut e, &clock, 1000.0, 360_000);
    let out = at(&mut e, &clock, 1100.0, 380_000);
    assert_eq!(labels(&out), ["2K", "-", "-"]);

    let out = at(&mut e, &clock, 2000.0, 720_000);
    assert_eq!(out.celebrating, None);
    assert_eq!(out.status, EngineStatus::Complete);
    assert_eq!(labels(&out), ["2K", "-", "-"]);
    assert_eq!(out.progress_ratio, 0.0);

    // Long after, still pinned.
    let out = at(&mut e, &clock, 2500.0, 900_000);
    assert_eq!(labels(&out), ["2K", "-", "-"]);
    assert_eq!(out.slots[0].as_ref().unwrap().display_time_ms, Some(720_000));
}

#[test]
fn reset_clears_everything() {
    let (mut e, clock) = engine_with(EngineCfg::default());
    at(&mut e, &clock, 5000.0, 1_800_000);
    assert!(e.store().raw("finish_times").is_some());

    e.on_reset().expect("reset");
    assert!(e.milestones().iter().all(|m| m.finish_time_ms.is_none()));
    assert_eq!(e.window(), &[Some(0), Some(1), Some(2)]);
    assert_eq!(e.celebration(), None);
    assert_eq!(e.pace_estimate().smoothed_pace_s_per_m, 0.0);
    assert!(!e.anomaly_state().first_reading_done);
    assert!(e.store().raw("finish_times").is_none());
}
