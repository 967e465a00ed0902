//! Configuration types for the estimator engine.
//!
//! These are the runtime configuration structs used by `Engine`.
//! They are separate from the TOML-deserialized config in `pacer_config`.

use std::sync::Arc;

/// Number of display slots surfaced to the renderer.
pub const DISPLAY_SLOTS: usize = 3;

/// Upper bound on the milestone table; indices fit in `u8`.
pub const MAX_MILESTONES: usize = 16;

/// Version tag written into every persisted record. Bump on layout change;
/// older records are discarded, never migrated.
/// Upper bound for `PersistenceCfg::max_plausible_time_ms`; keeps every
/// storable finish time clear of the checksum's pending-entry term.
pub const MAX_PLAUSIBLE_CAP_MS: u32 = pacer_config::MAX_PLAUSIBLE_TIME_CAP_MS;
pub const RECORD_VERSION: u32 = 1;

/// EMA smoothing and projection.
#[derive(Debug, Clone)]
pub struct SmoothingCfg {
    /// Weight of the newest pace sample. Range: (0.0, 1.0].
    pub alpha: f64,
    /// Elapsed time before the estimate counts as warmed up (s).
    pub warmup_s: f64,
    /// Projections are withheld below this distance (m).
    pub min_prediction_distance_m: f64,
    /// Projection cap (ms). Default: 100 h.
    pub max_remaining_ms: u32,
}

impl Default for SmoothingCfg {
    fn default() -> Self {
        Self {
            alpha: 0.15,
            warmup_s: 5.0,
            min_prediction_distance_m: 100.0,
            max_remaining_ms: 100 * 60 * 60 * 1000,
        }
    }
}

/// What to do when elapsed time jumps by more than `AnomalyCfg::time_jump_s`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeJumpPolicy {
    /// Reset smoothing and anomaly history, then treat the tick as a fresh start.
    #[default]
    ResetOnTimeJump,
    /// Keep history if the distance advanced across the jump; reset otherwise.
    ReconcileTimeJump,
}

/// Telemetry anomaly thresholds.
#[derive(Debug, Clone)]
pub struct AnomalyCfg {
    /// Sanity bounds for raw pace (s/m); outside aborts the tick.
    pub min_pace_s_per_m: f64,
    pub max_pace_s_per_m: f64,
    /// Distance deltas below this count as "no movement" (m).
    pub stagnation_epsilon_m: f64,
    /// Consecutive stagnant ticks before rejection.
    pub stagnation_threshold: u8,
    /// Ratio band against the last valid pace.
    pub spike_ratio_high: f64,
    pub spike_ratio_low: f64,
    /// Consecutive out-of-band ratios before rejection.
    pub spike_threshold: u8,
    /// Elapsed-time gap treated as a discontinuity (s).
    pub time_jump_s: f64,
    pub time_jump_policy: TimeJumpPolicy,
}

impl Default for AnomalyCfg {
    fn default() -> Self {
        Self {
            min_pace_s_per_m: 0.05,
            max_pace_s_per_m: 20.0,
            stagnation_epsilon_m: 0.01,
            stagnation_threshold: 5,
            spike_ratio_high: 2.0,
            spike_ratio_low: 0.5,
            spike_threshold: 3,
            time_jump_s: 5.0,
            time_jump_policy: TimeJumpPolicy::ResetOnTimeJump,
        }
    }
}

/// Structural sample checks.
#[derive(Debug, Clone)]
pub struct ValidationCfg {
    /// Distances below this are "no fix yet" (m).
    pub min_distance_m: f64,
    /// Minimum GPS quality for predictions (0 = not available .. 4 = good).
    pub min_gps_accuracy: u8,
}

impl Default for ValidationCfg {
    fn default() -> Self {
        Self {
            min_distance_m: 0.1,
            min_gps_accuracy: 3,
        }
    }
}

/// One entry of the milestone table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneDef {
    pub label: Arc<str>,
    pub target_cm: u32,
}

impl MilestoneDef {
    pub fn new(label: &str, target_cm: u32) -> Self {
        Self {
            label: Arc::from(label),
            target_cm,
        }
    }
}

/// Built-in table: 5K, 5 mi, 10K, 10 mi, half, 30K, marathon, 50K, 100K.
pub fn default_milestones() -> Vec<MilestoneDef> {
    vec![
        MilestoneDef::new("5K", 500_000),
        MilestoneDef::new("5MI", 804_672),
        MilestoneDef::new("10K", 1_000_000),
        MilestoneDef::new("10MI", 1_609_344),
        MilestoneDef::new("HM", 2_109_750),
        MilestoneDef::new("30K", 3_000_000),
        MilestoneDef::new("FM", 4_219_500),
        MilestoneDef::new("50K", 5_000_000),
        MilestoneDef::new("100K", 10_000_000),
    ]
}

/// Milestone completion settings.
#[derive(Debug, Clone)]
pub struct TrackingCfg {
    /// Early-completion slack in centimetres. Default: 5 m.
    pub tolerance_cm: u32,
    /// Ascending milestone table.
    pub milestones: Vec<MilestoneDef>,
}

impl Default for TrackingCfg {
    fn default() -> Self {
        Self {
            tolerance_cm: 500,
            milestones: default_milestones(),
        }
    }
}

/// Rotation, celebration and severity tiers.
#[derive(Debug, Clone)]
pub struct DisplayCfg {
    /// Hold time for a completed milestone in slot 0 (ms).
    pub celebration_ms: u32,
    /// Celebrations observed older than this are force-cleared (ms).
    pub max_celebration_ms: u32,
    pub yellow_ratio: f64,
    pub red_ratio: f64,
    pub red_distance_m: f64,
}

impl Default for DisplayCfg {
    fn default() -> Self {
        Self {
            celebration_ms: 15_000,
            max_celebration_ms: 60_000,
            yellow_ratio: 0.5,
            red_ratio: 0.1,
            red_distance_m: 200.0,
        }
    }
}

/// Persisted record settings.
#[derive(Debug, Clone)]
pub struct PersistenceCfg {
    pub key: String,
    /// Minimum spacing between throttled writes (ms).
    pub min_save_interval_ms: u64,
    /// Finish times above this are rejected on load (ms).
    pub max_plausible_time_ms: u32,
}

impl Default for PersistenceCfg {
    fn default() -> Self {
        Self {
            key: "finish_times".to_string(),
            min_save_interval_ms: 30_000,
            max_plausible_time_ms: 100 * 60 * 60 * 1000,
        }
    }
}

/// Circuit breaker for repeated internal faults.
#[derive(Debug, Clone)]
pub struct SafeModeCfg {
    pub fault_threshold: u8,
    pub recovery_ticks: u16,
}

impl Default for SafeModeCfg {
    fn default() -> Self {
        Self {
            fault_threshold: 3,
            recovery_ticks: 10,
        }
    }
}

/// Aggregate of all engine settings.
#[derive(Debug, Clone, Default)]
pub struct EngineCfg {
    pub smoothing: SmoothingCfg,
    pub anomaly: AnomalyCfg,
    pub validation: ValidationCfg,
    pub tracking: TrackingCfg,
    pub display: DisplayCfg,
    pub persistence: PersistenceCfg,
    pub safe_mode: SafeModeCfg,
}
