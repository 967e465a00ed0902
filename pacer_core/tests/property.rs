use std::time::Duration;

use pacer_core::config::{RECORD_VERSION, SmoothingCfg};
use pacer_core::persistence::{PersistedRecord, validate_record};
use pacer_core::smoother::PaceSmoother;
use pacer_core::{Engine, MemoryStore, Sample};
use pacer_traits::ManualClock;
use proptest::prelude::*;

const MAX_PLAUSIBLE_MS: u32 = 360_000_000;

prop_compose! {
    /// A valid finish-time array for the built-in nine milestones: a
    /// non-decreasing completed prefix followed by pending entries.
    fn valid_times()(
        mut prefix in prop::collection::vec(0u32..MAX_PLAUSIBLE_MS, 0..=9)
    ) -> Vec<Option<u32>> {
        prefix.sort_unstable();
        let mut v: Vec<Option<u32>> = prefix.into_iter().map(Some).collect();
        v.resize(9, None);
        v
    }
}

proptest! {
    #[test]
    fn ema_converges_geometrically(
        seed in 0.1f64..5.0,
        target in 0.1f64..5.0,
        n in 1usize..200,
    ) {
        let cfg = SmoothingCfg::default();
        let alpha = cfg.alpha;
        let mut s = PaceSmoother::new(cfg);
        s.update(seed, 1.0);
        for i in 0..n {
            s.update(target, 2.0 + i as f64);
        }
        let err = (s.estimate().smoothed_pace_s_per_m - target).abs();
        let bound = (1.0 - alpha).powi(n as i32) * (seed - target).abs() + 1e-9;
        prop_assert!(err <= bound, "err {err} > bound {bound}");
    }

    #[test]
    fn saved_record_loads_back_unchanged(times in valid_times()) {
        let rec = PersistedRecord::new(times.clone());
        let decoded = PersistedRecord::decode(&rec.encode().unwrap()).unwrap();
        prop_assert_eq!(validate_record(&decoded, 9, MAX_PLAUSIBLE_MS), Ok(()));
        prop_assert_eq!(decoded.version, RECORD_VERSION);
        prop_assert_eq!(decoded.finish_times, times);
    }

    #[test]
    fn single_entry_change_is_rejected(
        times in valid_times(),
        idx in 0usize..9,
        replacement in prop::option::of(0u32..MAX_PLAUSIBLE_MS),
    ) {
        prop_assume!(times[idx] != replacement);
        let mut rec = PersistedRecord::new(times);
        rec.finish_times[idx] = replacement;
        prop_assert!(validate_record(&rec, 9, MAX_PLAUSIBLE_MS).is_err());
    }

    #[test]
    fn finish_times_are_monotonic_with_no_gaps(
        steps in prop::collection::vec((0.0f64..400.0, 1u32..=4000), 1..400),
    ) {
        let clock = ManualClock::new();
        let mut e = Engine::builder()
            .with_store(MemoryStore::new())
            .with_clock(Box::new(clock.clone()))
            .build()
            .unwrap();
        let mut d = 1.0;
        let mut t: u32 = 1000;
        for (dd, dt) in steps {
            d += dd;
            t += dt;
            clock.set_offset(Duration::from_millis(u64::from(t)));
            e.tick(&Sample::new(d, t));
        }
        let times: Vec<Option<u32>> = e.milestones().iter().map(|m| m.finish_time_ms).collect();
        let done = times.iter().take_while(|t| t.is_some()).count();
        prop_assert!(times[done..].iter().all(Option::is_none), "gap in {times:?}");
        let completed: Vec<u32> = times.iter().flatten().copied().collect();
        prop_assert!(completed.windows(2).all(|w| w[0] <= w[1]), "order in {completed:?}");
    }
}
