//! `From` implementations bridging `pacer_config` types to `pacer_core` types.

use crate::config::{
    AnomalyCfg, DisplayCfg, EngineCfg, MilestoneDef, PersistenceCfg, SafeModeCfg, SmoothingCfg,
    TimeJumpPolicy, TrackingCfg, ValidationCfg, default_milestones,
};
use crate::util::m_to_cm;
use crate::validator::{GpsAccuracy, Sample};

// ── SmoothingCfg ─────────────────────────────────────────────────────────────

impl From<&pacer_config::SmoothingCfg> for SmoothingCfg {
    fn from(c: &pacer_config::SmoothingCfg) -> Self {
        Self {
            alpha: c.alpha,
            warmup_s: c.warmup_s,
            min_prediction_distance_m: c.min_prediction_distance_m,
            max_remaining_ms: c.max_remaining_ms,
        }
    }
}

// ── AnomalyCfg ───────────────────────────────────────────────────────────────

impl From<pacer_config::TimeJumpPolicyToml> for TimeJumpPolicy {
    fn from(p: pacer_config::TimeJumpPolicyToml) -> Self {
        match p {
            pacer_config::TimeJumpPolicyToml::Reset => Self::ResetOnTimeJump,
            pacer_config::TimeJumpPolicyToml::Reconcile => Self::ReconcileTimeJump,
        }
    }
}

impl From<&pacer_config::AnomalyCfg> for AnomalyCfg {
    fn from(c: &pacer_config::AnomalyCfg) -> Self {
        Self {
            min_pace_s_per_m: c.min_pace_s_per_m,
            max_pace_s_per_m: c.max_pace_s_per_m,
            stagnation_epsilon_m: c.stagnation_epsilon_m,
            stagnation_threshold: c.stagnation_threshold,
            spike_ratio_high: c.spike_ratio_high,
            spike_ratio_low: c.spike_ratio_low,
            spike_threshold: c.spike_threshold,
            time_jump_s: c.time_jump_s,
            time_jump_policy: c.time_jump_policy.into(),
        }
    }
}

// ── ValidationCfg ────────────────────────────────────────────────────────────

impl From<&pacer_config::ValidationCfg> for ValidationCfg {
    fn from(c: &pacer_config::ValidationCfg) -> Self {
        Self {
            min_distance_m: c.min_distance_m,
            min_gps_accuracy: c.min_gps_accuracy,
        }
    }
}

// ── TrackingCfg ──────────────────────────────────────────────────────────────

impl From<&pacer_config::TrackingCfg> for TrackingCfg {
    /// An empty table selects the built-in milestones. Distances that do not
    /// fit in centimetres map to 0 and are rejected when the engine is built.
    fn from(c: &pacer_config::TrackingCfg) -> Self {
        let milestones = if c.milestones.is_empty() {
            default_milestones()
        } else {
            c.milestones
                .iter()
                .map(|m| MilestoneDef::new(&m.label, m_to_cm(m.distance_m).unwrap_or(0)))
                .collect()
        };
        Self {
            tolerance_cm: m_to_cm(c.tolerance_m).unwrap_or(0),
            milestones,
        }
    }
}

// ── DisplayCfg ───────────────────────────────────────────────────────────────

impl From<&pacer_config::DisplayCfg> for DisplayCfg {
    fn from(c: &pacer_config::DisplayCfg) -> Self {
        Self {
            celebration_ms: c.celebration_ms,
            max_celebration_ms: c.max_celebration_ms,
            yellow_ratio: c.yellow_ratio,
            red_ratio: c.red_ratio,
            red_distance_m: c.red_distance_m,
        }
    }
}

// ── PersistenceCfg ───────────────────────────────────────────────────────────

impl From<&pacer_config::PersistenceCfg> for PersistenceCfg {
    fn from(c: &pacer_config::PersistenceCfg) -> Self {
        Self {
            key: c.key.clone(),
            min_save_interval_ms: c.min_save_interval_ms,
            max_plausible_time_ms: c.max_plausible_time_ms,
        }
    }
}

// ── SafeModeCfg ──────────────────────────────────────────────────────────────

impl From<&pacer_config::SafeModeCfg> for SafeModeCfg {
    fn from(c: &pacer_config::SafeModeCfg) -> Self {
        Self {
            fault_threshold: c.fault_threshold,
            recovery_ticks: c.recovery_ticks,
        }
    }
}

// ── EngineCfg ────────────────────────────────────────────────────────────────

impl From<&pacer_config::Config> for EngineCfg {
    fn from(c: &pacer_config::Config) -> Self {
        Self {
            smoothing: (&c.smoothing).into(),
            anomaly: (&c.anomaly).into(),
            validation: (&c.validation).into(),
            tracking: (&c.tracking).into(),
            display: (&c.display).into(),
            persistence: (&c.persistence).into(),
            safe_mode: (&c.safe_mode).into(),
        }
    }
}

// ── Sample ───────────────────────────────────────────────────────────────────

impl From<&pacer_config::TraceRow> for Sample {
    fn from(r: &pacer_config::TraceRow) -> Self {
        Self {
            elapsed_distance_m: r.distance_m,
            elapsed_time_ms: r.elapsed_ms,
            gps_accuracy: r.gps_accuracy.map(GpsAccuracy::from),
            heart_rate: r.heart_rate,
        }
    }
}
