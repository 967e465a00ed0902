#![no_main]
use libfuzzer_sys::fuzz_target;
use pacer_core::persistence::validate_record;
use pacer_core::{PersistedRecord, Sample};

fuzz_target!(|data: &[u8]| {
    let Ok(rec) = PersistedRecord::decode(data) else {
        return;
    };
    let ok = validate_record(&rec, 9, 360_000_000).is_ok();

    // Whatever passes validation must also survive an engine start and a tick.
    let mut store = pacer_core::MemoryStore::new();
    store.insert_raw("finish_times", data.to_vec());
    if let Ok(mut engine) = pacer_core::Engine::builder().with_store(store).build() {
        let restored = engine.milestones().iter().any(|m| m.finish_time_ms.is_some());
        assert!(ok || !restored);
        let _ = engine.tick(&Sample::new(100.0, 36_000));
    }
});
