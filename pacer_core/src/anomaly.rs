//! Frozen-distance and pace-spike detection with hysteresis counters.
//!
//! Raw pace is cumulative: `elapsed_time_s / elapsed_distance_m`. A tick is
//! only suppressed once a condition persists for the configured number of
//! consecutive ticks; single glitches pass through and reset nothing.

use serde::Serialize;
use thiserror::Error;

use crate::config::{AnomalyCfg, TimeJumpPolicy};
use crate::validator::ValidSample;

/// Reason a structurally valid tick was kept away from the smoother.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    #[error("raw pace outside sanity bounds")]
    PaceOutOfBounds,
    #[error("distance frozen")]
    Stagnation,
    #[error("repeated pace spikes")]
    PaceSpike,
}

/// Detector memory carried between ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnomalyState {
    pub last_valid_distance_m: f64,
    pub distance_stagnation_count: u8,
    pub last_valid_pace: f64,
    pub pace_anomaly_count: u8,
    pub first_reading_done: bool,
}

/// Result of a tick that passed the sanity bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assessment {
    /// Raw pace in seconds per metre.
    pub pace_s_per_m: f64,
    /// Set when a time discontinuity wiped history; the smoother must be
    /// reset before this pace is fed to it.
    pub history_reset: bool,
    /// `None` when the tick may be used for estimation.
    pub anomaly: Option<AnomalyKind>,
}

#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    cfg: AnomalyCfg,
    state: AnomalyState,
    last_compute_time_s: Option<f64>,
}

impl AnomalyDetector {
    pub fn new(cfg: AnomalyCfg) -> Self {
        Self {
            cfg,
            state: AnomalyState::default(),
            last_compute_time_s: None,
        }
    }

    pub fn state(&self) -> &AnomalyState {
        &self.state
    }

    /// Elapsed time of the last tick that passed the sanity bounds.
    pub fn last_compute_time_s(&self) -> Option<f64> {
        self.last_compute_time_s
    }

    /// Forget everything, including the time reference.
    pub fn reset(&mut self) {
        self.state = AnomalyState::default();
        self.last_compute_time_s = None;
    }

    /// Classify one validated sample.
    ///
    /// Returns `Err(PaceOutOfBounds)` without touching any state when the raw
    /// pace is implausible. Otherwise counters are updated and the returned
    /// `Assessment` says whether the tick is usable.
    pub fn assess(&mut self, s: &ValidSample) -> Result<Assessment, AnomalyKind> {
        let t = s.time_s();
        let d = s.distance_m;
        let pace = t / d;
        if !pace.is_finite()
            || pace < self.cfg.min_pace_s_per_m
            || pace > self.cfg.max_pace_s_per_m
        {
            return Err(AnomalyKind::PaceOutOfBounds);
        }

        let history_reset = self.check_time_jump(t, d);
        self.last_compute_time_s = Some(t);

        let anomaly = self.check_counters(d, pace);
        Ok(Assessment {
            pace_s_per_m: pace,
            history_reset,
            anomaly,
        })
    }

    fn check_time_jump(&mut self, t: f64, d: f64) -> bool {
        let Some(last) = self.last_compute_time_s else {
            return false;
        };
        if (t - last).abs() <= self.cfg.time_jump_s {
            return false;
        }
        let reset = match self.cfg.time_jump_policy {
            TimeJumpPolicy::ResetOnTimeJump => true,
            TimeJumpPolicy::ReconcileTimeJump => {
                d - self.state.last_valid_distance_m < self.cfg.stagnation_epsilon_m
            }
        };
        if reset {
            tracing::debug!(
                from_s = last,
                to_s = t,
                policy = ?self.cfg.time_jump_policy,
                "time discontinuity; anomaly history reset"
            );
            self.state = AnomalyState::default();
        }
        reset
    }

    fn check_counters(&mut self, d: f64, pace: f64) -> Option<AnomalyKind> {
        let st = &mut self.state;

        if (d - st.last_valid_distance_m).abs() < self.cfg.stagnation_epsilon_m {
            st.distance_stagnation_count = st.distance_stagnation_count.saturating_add(1);
            if st.distance_stagnation_count >= self.cfg.stagnation_threshold {
                return Some(AnomalyKind::Stagnation);
            }
        } else {
            st.distance_stagnation_count = 0;
            st.last_valid_distance_m = d;
        }

        if st.first_reading_done {
            let ratio = pace / st.last_valid_pace;
            if ratio > self.cfg.spike_ratio_high || ratio < self.cfg.spike_ratio_low {
                st.pace_anomaly_count = st.pace_anomaly_count.saturating_add(1);
                if st.pace_anomaly_count >= self.cfg.spike_threshold {
                    return Some(AnomalyKind::PaceSpike);
                }
            } else {
                st.pace_anomaly_count = 0;
            }
        } else {
            st.first_reading_done = true;
        }

        st.last_valid_pace = pace;
        None
    }
}
