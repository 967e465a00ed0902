use std::time::Duration;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use pacer_core::{Engine, MemoryStore, Sample};
use pacer_traits::ManualClock;

// Synthetic run: steady pace with xorshift GPS jitter.
fn synth_run(n: usize, pace_s_per_m: f64, jitter_m: f64, seed: u32) -> Vec<Sample> {
    let mut state = seed.max(1);
    let mut next_f64 = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        f64::from(x) / (f64::from(u32::MAX) + 1.0)
    };
    let mut v = Vec::with_capacity(n);
    for i in 1..=n {
        let t_s = i as f64;
        let noise = (next_f64() * 2.0 - 1.0) * jitter_m;
        let d = (t_s / pace_s_per_m + noise).max(0.2);
        v.push(Sample::new(d, (i * 1000) as u32));
    }
    v
}

fn engine(clock: &ManualClock) -> Engine<MemoryStore> {
    Engine::builder()
        .with_store(MemoryStore::new())
        .with_clock(Box::new(clock.clone()))
        .build()
        .expect("build")
}

fn bench_tick(c: &mut Criterion) {
    let run = synth_run(3600, 0.36, 1.5, 0xC0FFEE);

    c.bench_function("tick_steady_state", |b| {
        let clock = ManualClock::new();
        let mut e = engine(&clock);
        for s in &run[..600] {
            e.tick(s);
        }
        let s = run[600];
        b.iter(|| black_box(e.tick(black_box(&s))));
    });

    c.bench_function("one_hour_run", |b| {
        b.iter_batched(
            || {
                let clock = ManualClock::new();
                (engine(&clock), clock)
            },
            |(mut e, clock)| {
                for (i, s) in run.iter().enumerate() {
                    clock.set_offset(Duration::from_secs(i as u64 + 1));
                    black_box(e.tick(s));
                }
                e
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
