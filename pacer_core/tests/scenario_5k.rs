//! Steady 0.36 s/m run (6:00 /km) through the first milestone.

use std::time::Duration;

use pacer_core::{Engine, EngineStatus, MemoryStore, Sample, Severity, TickOutput};
use pacer_traits::ManualClock;

const PACE: f64 = 0.36;

fn engine() -> (Engine<MemoryStore>, ManualClock) {
    let clock = ManualClock::new();
    let e = Engine::builder()
        .with_store(MemoryStore::new())
        .with_clock(Box::new(clock.clone()))
        .build()
        .expect("build");
    (e, clock)
}

fn run(e: &mut Engine<MemoryStore>, clock: &ManualClock, secs: std::ops::RangeInclusive<u32>) -> TickOutput {
    let mut out = None;
    for t in secs {
        clock.set_offset(Duration::from_secs(u64::from(t)));
        out = Some(e.tick(&Sample::new(f64::from(t) / PACE, t * 1000)));
    }
    out.expect("at least one tick")
}

#[test]
fn warms_up_then_projects_remaining_time() {
    let (mut e, clock) = engine();

    let early = run(&mut e, &clock, 1..=4);
    assert_eq!(early.status, EngineStatus::WarmingUp);
    assert!(early.slots.iter().flatten().all(|s| s.display_time_ms.is_none()));

    let mid = run(&mut e, &clock, 5..=900);
    assert_eq!(mid.status, EngineStatus::Running);
    let five_k = mid.slots[0].as_ref().expect("slot 0");
    assert_eq!(&*five_k.label, "5K");
    assert!(!five_k.is_completed);
    // 2500 m left at 0.36 s/m
    let eta = five_k.display_time_ms.expect("projection");
    assert!((899_000..=901_000).contains(&eta), "eta {eta}");
    let ten_k = mid.slots[2].as_ref().expect("slot 2");
    let eta10 = ten_k.display_time_ms.expect("projection");
    assert!((2_699_000..=2_701_000).contains(&eta10), "eta {eta10}");

    assert!((mid.progress_ratio - 0.5).abs() < 1e-3);
    assert_eq!(mid.severity, Severity::Yellow);
    assert!((e.pace_estimate().smoothed_pace_s_per_m - PACE).abs() < 1e-9);
}

#[test]
fn completion_happens_exactly_at_target_minus_tolerance() {
    let (mut e, clock) = engine();
    let out = run(&mut e, &clock, 1..=1798);
    assert!(!out.slots[0].as_ref().unwrap().is_completed);
    assert_eq!(out.severity, Severity::Red);

    // 499_499 cm: one centimetre short.
    clock.set_offset(Duration::from_millis(1_798_100));
    let out = e.tick(&Sample::new(4994.99, 1_798_100));
    assert!(!out.slots[0].as_ref().unwrap().is_completed);

    // 499_500 cm: complete.
    clock.set_offset(Duration::from_millis(1_798_200));
    let out = e.tick(&Sample::new(4995.0, 1_798_200));
    let slot = out.slots[0].as_ref().unwrap();
    assert!(slot.is_completed);
    assert_eq!(slot.display_time_ms, Some(1_798_200));
    assert_eq!(out.celebrating, Some(0));
    assert_eq!(e.milestones()[0].finish_time_ms, Some(1_798_200));

    // Progress now refers to the 5K -> 5MI segment.
    assert!(out.progress_ratio > 0.99);
    assert_eq!(out.severity, Severity::Green);

    // Saved immediately (first write is never throttled).
    assert_eq!(e.stats().saves, 1);
    assert!(!e.is_dirty());
}

#[test]
fn finish_time_is_stable_under_repeated_samples() {
    let (mut e, clock) = engine();
    run(&mut e, &clock, 1..=1800);
    let first = e.milestones()[0].finish_time_ms;
    for _ in 0..3 {
        e.tick(&Sample::new(1800.0 / PACE, 1_800_000));
    }
    assert_eq!(e.milestones()[0].finish_time_ms, first);
    assert_eq!(e.stats().saves, 1);
}
