//! Single-pole exponential smoothing of pace and time-remaining projection.

use crate::config::SmoothingCfg;
use crate::util::{MILLIS_PER_SEC, clamp_ms};

/// Current pace estimate. `smoothed_pace_s_per_m == 0.0` means "not seeded".
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PaceEstimate {
    pub smoothed_pace_s_per_m: f64,
    pub warmed_up: bool,
    pub last_compute_time_s: f64,
}

#[derive(Debug, Clone)]
pub struct PaceSmoother {
    cfg: SmoothingCfg,
    est: PaceEstimate,
}

impl PaceSmoother {
    pub fn new(cfg: SmoothingCfg) -> Self {
        Self {
            cfg,
            est: PaceEstimate::default(),
        }
    }

    pub fn estimate(&self) -> &PaceEstimate {
        &self.est
    }

    pub fn is_seeded(&self) -> bool {
        self.est.smoothed_pace_s_per_m > 0.0
    }

    pub fn reset(&mut self) {
        self.est = PaceEstimate::default();
    }

    /// Feed one accepted raw pace observed at `time_s` of elapsed time.
    pub fn update(&mut self, pace_s_per_m: f64, time_s: f64) {
        let e = &mut self.est;
        if e.smoothed_pace_s_per_m > 0.0 {
            e.smoothed_pace_s_per_m =
                self.cfg.alpha * pace_s_per_m + (1.0 - self.cfg.alpha) * e.smoothed_pace_s_per_m;
        } else {
            e.smoothed_pace_s_per_m = pace_s_per_m;
        }
        e.last_compute_time_s = time_s;
        e.warmed_up = time_s >= self.cfg.warmup_s;
    }

    /// Whether projections may be shown at `distance_m` covered so far.
    pub fn can_project(&self, distance_m: f64) -> bool {
        self.est.warmed_up
            && self.is_seeded()
            && distance_m >= self.cfg.min_prediction_distance_m
    }

    /// Milliseconds to cover `remaining_m` at the smoothed pace, capped.
    ///
    /// `None` until the estimate is seeded.
    pub fn project_ms(&self, remaining_m: f64) -> Option<u32> {
        if !self.is_seeded() {
            return None;
        }
        let ms = remaining_m.max(0.0) * self.est.smoothed_pace_s_per_m * MILLIS_PER_SEC;
        clamp_ms(ms, self.cfg.max_remaining_ms)
    }
}
