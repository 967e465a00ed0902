#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse errors and validation errors are fine; panics are not.
    if let Ok(cfg) = pacer_config::load_toml(data)
        && cfg.validate().is_ok()
    {
        // A validated config must map to a buildable milestone table or a typed error.
        let engine_cfg = pacer_core::EngineCfg::from(&cfg);
        let _ = pacer_core::Engine::builder()
            .with_store(pacer_core::MemoryStore::new())
            .with_config(engine_cfg)
            .build();
    }
});
