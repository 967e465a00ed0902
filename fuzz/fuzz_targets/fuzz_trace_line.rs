#![no_main]
use libfuzzer_sys::fuzz_target;
use pacer_core::{Engine, MemoryStore, Sample};

fuzz_target!(|data: &str| {
    let Ok(mut engine) = Engine::builder().with_store(MemoryStore::new()).build() else {
        return;
    };
    // Arbitrary lines become arbitrary ticks; tick() must never panic.
    for line in data.lines() {
        if let Ok(row) = pacer_config::parse_trace_line(line) {
            let out = engine.tick(&Sample::from(&row));
            assert!((0.0..=1.0).contains(&out.progress_ratio));
        }
    }
});
