//! The per-tick estimator and its builder.

use std::sync::Arc;
use std::time::Instant;

use pacer_traits::{Clock, KvStore, MonotonicClock};
use serde::Serialize;

use crate::anomaly::{AnomalyDetector, AnomalyKind, AnomalyState};
use crate::breaker::{SafeModeBreaker, TickFault};
use crate::config::{DISPLAY_SLOTS, EngineCfg, MAX_PLAUSIBLE_CAP_MS};
use crate::display::{Celebration, DisplayRotationController, Window};
use crate::error::{BuildError, Result};
use crate::milestones::{Milestone, MilestoneTracker};
use crate::persistence::{PersistError, PersistenceGateway};
use crate::severity::{self, Severity, SeverityBands};
use crate::smoother::{PaceEstimate, PaceSmoother};
use crate::status::EngineStatus;
use crate::util::cm_to_m;
use crate::validator::{Rejection, Sample, SampleValidator, ValidSample};

/// One visible milestone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotView {
    pub index: u8,
    pub label: Arc<str>,
    pub is_completed: bool,
    /// Finish time when completed, projected time remaining otherwise;
    /// `None` renders as `--:--`.
    pub display_time_ms: Option<u32>,
}

/// Snapshot handed to the renderer after every tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickOutput {
    pub slots: [Option<SlotView>; DISPLAY_SLOTS],
    /// 1.0 at the start of the current segment, 0.0 at its target.
    pub progress_ratio: f64,
    pub severity: Severity,
    pub status: EngineStatus,
    pub heart_rate: Option<u16>,
    pub rejection: Option<Rejection>,
    pub anomaly: Option<AnomalyKind>,
    pub celebrating: Option<u8>,
    pub smoothed_pace_s_per_m: f64,
}

/// Diagnostic counters. Monotonic for the life of the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub ticks: u64,
    pub validation_rejections: u64,
    pub anomaly_rejections: u64,
    pub faults: u64,
    pub safe_mode_entries: u64,
    pub io_failures: u64,
    pub corruption_discards: u64,
    pub saves: u64,
    /// Finish times left out of writes for exceeding the plausible range.
    pub implausible_drops: u64,
}

/// Owned, single-threaded estimator. A multi-threaded host wraps it in one
/// lock and renders from the returned `TickOutput`.
pub struct Engine<S: KvStore> {
    validator: SampleValidator,
    detector: AnomalyDetector,
    smoother: PaceSmoother,
    tracker: MilestoneTracker,
    display: DisplayRotationController,
    persistence: PersistenceGateway<S>,
    breaker: SafeModeBreaker,
    bands: SeverityBands,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    last_distance_cm: u32,
    stats: EngineStats,
}

impl<S: KvStore> core::fmt::Debug for Engine<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Engine")
            .field("window", self.display.window())
            .field("celebration", &self.display.celebration())
            .field("pace", self.smoother.estimate())
            .field("safe_mode", &self.breaker.is_open())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<S: KvStore> Engine<S> {
    /// Start building an engine.
    pub fn builder() -> EngineBuilder<S> {
        EngineBuilder::default()
    }

    /// Process one telemetry sample. Never fails; problems are reported in
    /// the output and counted in `stats()`.
    pub fn tick(&mut self, sample: &Sample) -> TickOutput {
        self.stats.ticks += 1;

        if self.breaker.skip_tick() {
            return self.fallback_output(EngineStatus::SafeMode, sample.heart_rate);
        }

        let now_ms = self.clock.ms_since(self.epoch);
        self.display.expire(now_ms, &self.tracker);

        let valid = match self.validator.validate(sample) {
            Ok(v) => v,
            Err(r) => {
                self.stats.validation_rejections += 1;
                tracing::debug!(reason = %r, "sample rejected");
                return self.finish_tick(None, false, None, Some(r), sample.heart_rate);
            }
        };
        self.last_distance_cm = valid.distance_cm;

        let done = self
            .tracker
            .check(self.display.window(), valid.distance_cm, valid.time_ms);
        if !done.is_empty() {
            self.display.on_completion(&done, &self.tracker, now_ms);
        }

        let (estimated, anomaly) = if valid.gps_usable {
            self.estimate(&valid)
        } else {
            (false, None)
        };

        self.persist_if_dirty();
        self.finish_tick(Some(&valid), estimated, anomaly, None, valid.heart_rate)
    }

    fn estimate(&mut self, valid: &ValidSample) -> (bool, Option<AnomalyKind>) {
        let kind = match self.detector.assess(valid) {
            Ok(a) => {
                if a.history_reset {
                    self.smoother.reset();
                }
                match a.anomaly {
                    None => {
                        self.smoother.update(a.pace_s_per_m, valid.time_s());
                        return (true, None);
                    }
                    Some(k) => k,
                }
            }
            Err(k) => k,
        };
        self.stats.anomaly_rejections += 1;
        tracing::debug!(anomaly = %kind, distance_m = valid.distance_m, "estimation skipped");
        (false, Some(kind))
    }

    fn finish_tick(
        &mut self,
        valid: Option<&ValidSample>,
        estimated: bool,
        anomaly: Option<AnomalyKind>,
        rejection: Option<Rejection>,
        heart_rate: Option<u16>,
    ) -> TickOutput {
        match self.render(valid, estimated, anomaly, rejection, heart_rate) {
            Ok(out) => {
                self.breaker.record_success();
                out
            }
            Err(fault) => {
                self.stats.faults += 1;
                if self.breaker.record_fault(fault) {
                    self.stats.safe_mode_entries += 1;
                }
                self.display.reset(&self.tracker);
                let status = if self.breaker.is_open() {
                    EngineStatus::SafeMode
                } else {
                    EngineStatus::WarmingUp
                };
                self.fallback_output(status, heart_rate)
            }
        }
    }

    fn render(
        &self,
        valid: Option<&ValidSample>,
        estimated: bool,
        anomaly: Option<AnomalyKind>,
        rejection: Option<Rejection>,
        heart_rate: Option<u16>,
    ) -> core::result::Result<TickOutput, TickFault> {
        let pace = self.smoother.estimate().smoothed_pace_s_per_m;
        if !pace.is_finite() {
            return Err(TickFault::NonFinite("smoothed pace"));
        }
        let current_cm = self.last_distance_cm;
        let warm = valid.is_some_and(|v| v.gps_usable && self.smoother.can_project(v.distance_m));
        let project = warm && estimated;

        let mut slots: [Option<SlotView>; DISPLAY_SLOTS] = Default::default();
        for (out, idx) in slots.iter_mut().zip(self.display.window()) {
            let Some(idx) = *idx else { continue };
            let m = self
                .tracker
                .get(idx)
                .ok_or(TickFault::BadWindowIndex(idx))?;
            let display_time_ms = if m.is_complete() {
                m.finish_time_ms
            } else if project {
                let remaining_m = cm_to_m(m.target_cm.saturating_sub(current_cm));
                self.smoother.project_ms(remaining_m)
            } else {
                None
            };
            *out = Some(SlotView {
                index: m.index,
                label: Arc::clone(&m.label),
                is_completed: m.is_complete(),
                display_time_ms,
            });
        }

        let (progress_ratio, severity) = match self.tracker.first_pending() {
            Some(next) => {
                let start = self.tracker.segment_start_cm(next.index);
                let ratio = severity::progress_ratio(current_cm, start, next.target_cm);
                let remaining_m = cm_to_m(next.target_cm.saturating_sub(current_cm));
                (ratio, severity::classify(ratio, remaining_m, &self.bands))
            }
            None => (0.0, Severity::Green),
        };
        if !progress_ratio.is_finite() {
            return Err(TickFault::NonFinite("progress ratio"));
        }

        let status = if self.tracker.all_complete() {
            EngineStatus::Complete
        } else if valid.is_none_or(|v| !v.gps_usable) {
            EngineStatus::WaitingGps
        } else if warm {
            EngineStatus::Running
        } else {
            EngineStatus::WarmingUp
        };

        Ok(TickOutput {
            slots,
            progress_ratio,
            severity,
            status,
            heart_rate,
            rejection,
            anomaly,
            celebrating: self.display.celebration().map(|c| c.milestone_idx),
            smoothed_pace_s_per_m: pace,
        })
    }

    /// Output used while the breaker is open or after a fault: labels and
    /// finish times only, no projections.
    fn fallback_output(&self, status: EngineStatus, heart_rate: Option<u16>) -> TickOutput {
        let mut slots: [Option<SlotView>; DISPLAY_SLOTS] = Default::default();
        for (out, idx) in slots.iter_mut().zip(self.display.window()) {
            if let Some(m) = idx.and_then(|i| self.tracker.get(i)) {
                *out = Some(SlotView {
                    index: m.index,
                    label: Arc::clone(&m.label),
                    is_completed: m.is_complete(),
                    display_time_ms: m.finish_time_ms,
                });
            }
        }
        TickOutput {
            slots,
            progress_ratio: 0.0,
            severity: Severity::Green,
            status,
            heart_rate,
            rejection: None,
            anomaly: None,
            celebrating: None,
            smoothed_pace_s_per_m: 0.0,
        }
    }

    fn persist_if_dirty(&mut self) {
        if !self.tracker.is_dirty() || !self.persistence.is_due() {
            return;
        }
        let times: Vec<Option<u32>> = self.tracker.finish_times().collect();
        let result = self.persistence.save_if_due(&times);
        self.stats.implausible_drops = self.persistence.implausible_dropped();
        match result {
            Ok(true) => {
                self.stats.saves += 1;
                self.tracker.mark_clean();
            }
            Ok(false) => {}
            Err(e) => {
                self.stats.io_failures += 1;
                tracing::warn!(error = %e, "throttled save failed");
            }
        }
    }

    /// Flush pending finish times immediately. Returns whether a write
    /// happened.
    pub fn on_pause_or_stop(&mut self) -> core::result::Result<bool, PersistError> {
        if !self.tracker.is_dirty() {
            return Ok(false);
        }
        let times: Vec<Option<u32>> = self.tracker.finish_times().collect();
        let result = self.persistence.flush(&times);
        self.stats.implausible_drops = self.persistence.implausible_dropped();
        match result {
            Ok(()) => {
                self.stats.saves += 1;
                self.tracker.mark_clean();
                Ok(true)
            }
            Err(e) => {
                self.stats.io_failures += 1;
                tracing::warn!(error = %e, "flush on pause/stop failed");
                Err(e)
            }
        }
    }

    /// Start a new activity: clear every finish time, the estimator state
    /// and the display, and delete the persisted record.
    pub fn on_reset(&mut self) -> core::result::Result<(), PersistError> {
        self.tracker.clear();
        self.detector.reset();
        self.smoother.reset();
        self.breaker.reset();
        self.display.reset(&self.tracker);
        self.last_distance_cm = 0;
        tracing::info!("activity reset");
        self.persistence.clear().inspect_err(|e| {
            self.stats.io_failures += 1;
            tracing::warn!(error = %e, "failed to delete persisted record");
        })
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn milestones(&self) -> &[Milestone] {
        self.tracker.milestones()
    }

    pub fn window(&self) -> &Window {
        self.display.window()
    }

    pub fn celebration(&self) -> Option<Celebration> {
        self.display.celebration()
    }

    pub fn anomaly_state(&self) -> &AnomalyState {
        self.detector.state()
    }

    pub fn pace_estimate(&self) -> &PaceEstimate {
        self.smoother.estimate()
    }

    pub fn is_safe_mode(&self) -> bool {
        self.breaker.is_open()
    }

    pub fn is_dirty(&self) -> bool {
        self.tracker.is_dirty()
    }

    pub fn store(&self) -> &S {
        self.persistence.store()
    }

    pub fn store_mut(&mut self) -> &mut S {
        self.persistence.store_mut()
    }
}

// ── Builder ──────────────────────────────────────────────────────────────────

/// Builder for `Engine`. The store is required; config and clock default.
pub struct EngineBuilder<S> {
    store: Option<S>,
    cfg: Option<EngineCfg>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
}

impl<S> Default for EngineBuilder<S> {
    fn default() -> Self {
        Self {
            store: None,
            cfg: None,
            clock: None,
        }
    }
}

impl<S: KvStore> EngineBuilder<S> {
    pub fn with_store(mut self, store: S) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_config(mut self, cfg: EngineCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }

    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate settings, restore persisted finish times and build the engine.
    pub fn build(self) -> Result<Engine<S>> {
        let store = self
            .store
            .ok_or_else(|| eyre::Report::new(BuildError::MissingStore))?;
        let cfg = self.cfg.unwrap_or_default();
        validate_cfg(&cfg)?;

        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(b) => Arc::from(b),
            None => Arc::new(MonotonicClock::new()),
        };
        let epoch = clock.now();

        let mut tracker = MilestoneTracker::new(&cfg.tracking)?;
        let mut persistence = PersistenceGateway::new(store, &cfg.persistence, Arc::clone(&clock));
        let mut stats = EngineStats::default();

        match persistence.load(tracker.len()) {
            Ok(Some(times)) => {
                tracker.restore(&times);
                tracing::info!(
                    completed = times.iter().flatten().count(),
                    "restored finish times"
                );
            }
            Ok(None) => {}
            Err(PersistError::Corrupt(_)) => stats.corruption_discards += 1,
            Err(e) => {
                stats.io_failures += 1;
                tracing::warn!(error = %e, "could not read persisted record; starting fresh");
            }
        }

        let display = DisplayRotationController::new(&cfg.display, &tracker);

        Ok(Engine {
            validator: SampleValidator::new(&cfg.validation),
            detector: AnomalyDetector::new(cfg.anomaly.clone()),
            smoother: PaceSmoother::new(cfg.smoothing.clone()),
            tracker,
            display,
            persistence,
            breaker: SafeModeBreaker::new(&cfg.safe_mode),
            bands: SeverityBands::from(&cfg.display),
            clock,
            epoch,
            last_distance_cm: 0,
            stats,
        })
    }
}

fn validate_cfg(cfg: &EngineCfg) -> Result<()> {
    let invalid =
        |msg: &'static str| -> Result<()> { Err(eyre::Report::new(BuildError::InvalidConfig(msg))) };

    let s = &cfg.smoothing;
    if !(s.alpha > 0.0 && s.alpha <= 1.0) {
        return invalid("alpha must be in (0, 1]");
    }
    if !s.warmup_s.is_finite() || s.warmup_s < 0.0 {
        return invalid("warmup_s must be >= 0");
    }
    if !s.min_prediction_distance_m.is_finite() || s.min_prediction_distance_m < 0.0 {
        return invalid("min_prediction_distance_m must be >= 0");
    }

    let a = &cfg.anomaly;
    if !(a.min_pace_s_per_m > 0.0 && a.min_pace_s_per_m < a.max_pace_s_per_m)
        || !a.max_pace_s_per_m.is_finite()
    {
        return invalid("pace bounds must satisfy 0 < min < max");
    }
    if !(a.spike_ratio_low > 0.0 && a.spike_ratio_low < 1.0 && a.spike_ratio_high > 1.0)
        || !a.spike_ratio_high.is_finite()
    {
        return invalid("spike ratios must satisfy 0 < low < 1 < high");
    }
    if a.stagnation_threshold == 0 || a.spike_threshold == 0 {
        return invalid("anomaly thresholds must be >= 1");
    }
    if !a.stagnation_epsilon_m.is_finite() || a.stagnation_epsilon_m < 0.0 {
        return invalid("stagnation_epsilon_m must be >= 0");
    }
    if !a.time_jump_s.is_finite() || a.time_jump_s <= 0.0 {
        return invalid("time_jump_s must be > 0");
    }

    let v = &cfg.validation;
    if !v.min_distance_m.is_finite() || v.min_distance_m < 0.0 {
        return invalid("min_distance_m must be >= 0");
    }
    if v.min_gps_accuracy > 4 {
        return invalid("min_gps_accuracy must be 0..=4");
    }

    let d = &cfg.display;
    if d.celebration_ms > d.max_celebration_ms {
        return invalid("celebration_ms must not exceed max_celebration_ms");
    }
    if !(0.0..=1.0).contains(&d.red_ratio)
        || !(0.0..=1.0).contains(&d.yellow_ratio)
        || d.red_ratio > d.yellow_ratio
    {
        return invalid("severity ratios must satisfy 0 <= red <= yellow <= 1");
    }
    if !d.red_distance_m.is_finite() || d.red_distance_m < 0.0 {
        return invalid("red_distance_m must be >= 0");
    }

    if cfg.persistence.key.is_empty() {
        return invalid("persistence key must not be empty");
    }
    if cfg.persistence.max_plausible_time_ms == 0
        || cfg.persistence.max_plausible_time_ms > MAX_PLAUSIBLE_CAP_MS
    {
        return invalid("max_plausible_time_ms out of range");
    }
    if cfg.safe_mode.fault_threshold == 0 {
        return invalid("fault_threshold must be >= 1");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use pacer_traits::ManualClock;
    use std::time::Duration;

    fn engine() -> (Engine<MemoryStore>, ManualClock) {
        let clock = ManualClock::new();
        let e = Engine::builder()
            .with_store(MemoryStore::new())
            .with_clock(Box::new(clock.clone()))
            .build()
            .unwrap();
        (e, clock)
    }

    #[test]
    fn repeated_faults_enter_and_leave_safe_mode() {
        let (mut e, clock) = engine();
        for i in 0..3u32 {
            clock.advance(Duration::from_secs(1));
            e.display.force_slot(1, 200);
            let out = e.tick(&Sample::new(100.0 + f64::from(i) * 3.0, 36_000 + i * 1000));
            assert!(out.slots.iter().all(|s| s.as_ref().is_none_or(|v| v.display_time_ms.is_none())));
        }
        assert_eq!(e.stats().faults, 3);
        assert_eq!(e.stats().safe_mode_entries, 1);
        assert!(e.is_safe_mode());

        for i in 0..10u32 {
            let s = Sample::new(110.0 + f64::from(i) * 3.0, 40_000 + i * 1000)
                .with_heart_rate(171);
            let out = e.tick(&s);
            assert_eq!(out.status, EngineStatus::SafeMode);
            assert_eq!(out.heart_rate, Some(171));
        }
        assert!(!e.is_safe_mode());
        let out = e.tick(&Sample::new(150.0, 54_000));
        assert_ne!(out.status, EngineStatus::SafeMode);
        assert_eq!(e.stats().faults, 3);
    }

    #[test]
    fn single_fault_self_heals_window() {
        let (mut e, _) = engine();
        e.display.force_slot(2, 99);
        e.tick(&Sample::new(100.0, 36_000));
        assert_eq!(e.stats().faults, 1);
        assert_eq!(e.window(), &[Some(0), Some(1), Some(2)]);
        assert!(!e.is_safe_mode());
    }

    #[test]
    fn builder_rejects_bad_alpha() {
        let mut cfg = EngineCfg::default();
        cfg.smoothing.alpha = 0.0;
        let err = Engine::builder()
            .with_store(MemoryStore::new())
            .with_config(cfg)
            .build()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::InvalidConfig(_))
        ));
    }
}
