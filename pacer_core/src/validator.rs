//! Structural checks on raw telemetry samples.

use serde::Serialize;
use thiserror::Error;

use crate::config::ValidationCfg;
use crate::util::m_to_cm;

/// Position quality reported by the device, ordered worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GpsAccuracy {
    NotAvailable = 0,
    LastKnown = 1,
    Poor = 2,
    Usable = 3,
    Good = 4,
}

impl GpsAccuracy {
    /// Numeric quality level (0..=4).
    pub fn level(self) -> u8 {
        self as u8
    }
}

impl From<u8> for GpsAccuracy {
    /// Levels above 4 saturate to `Good`.
    fn from(level: u8) -> Self {
        match level {
            0 => Self::NotAvailable,
            1 => Self::LastKnown,
            2 => Self::Poor,
            3 => Self::Usable,
            _ => Self::Good,
        }
    }
}

/// One raw telemetry tick as handed over by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sample {
    pub elapsed_distance_m: Option<f64>,
    pub elapsed_time_ms: Option<u32>,
    pub gps_accuracy: Option<GpsAccuracy>,
    pub heart_rate: Option<u16>,
}

impl Sample {
    /// Convenience constructor for a fully-populated sample with a usable fix.
    pub fn new(distance_m: f64, time_ms: u32) -> Self {
        Self {
            elapsed_distance_m: Some(distance_m),
            elapsed_time_ms: Some(time_ms),
            gps_accuracy: Some(GpsAccuracy::Usable),
            heart_rate: None,
        }
    }

    pub fn with_gps(mut self, gps: GpsAccuracy) -> Self {
        self.gps_accuracy = Some(gps);
        self
    }

    pub fn with_heart_rate(mut self, bpm: u16) -> Self {
        self.heart_rate = Some(bpm);
        self
    }
}

/// A sample that passed structural validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidSample {
    pub distance_m: f64,
    pub distance_cm: u32,
    pub time_ms: u32,
    /// False when the fix is below the configured minimum. Estimation is
    /// skipped for such ticks; tracking and persistence still run.
    pub gps_usable: bool,
    pub heart_rate: Option<u16>,
}

impl ValidSample {
    pub fn time_s(&self) -> f64 {
        crate::util::ms_to_sec(self.time_ms)
    }
}

/// Why a sample was dropped before touching any state.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    #[error("elapsed time missing")]
    MissingTime,
    #[error("elapsed time must be > 0")]
    ZeroTime,
    #[error("elapsed distance missing")]
    MissingDistance,
    #[error("elapsed distance is not finite")]
    NonFiniteDistance,
    #[error("elapsed distance below minimum")]
    DistanceTooSmall,
    #[error("elapsed distance exceeds representable range")]
    DistanceOutOfRange,
}

/// Stateless gate in front of the anomaly detector.
#[derive(Debug, Clone)]
pub struct SampleValidator {
    min_distance_m: f64,
    min_gps: GpsAccuracy,
}

impl SampleValidator {
    pub fn new(cfg: &ValidationCfg) -> Self {
        Self {
            min_distance_m: cfg.min_distance_m,
            min_gps: GpsAccuracy::from(cfg.min_gps_accuracy),
        }
    }

    pub fn validate(&self, sample: &Sample) -> Result<ValidSample, Rejection> {
        let time_ms = sample.elapsed_time_ms.ok_or(Rejection::MissingTime)?;
        if time_ms == 0 {
            return Err(Rejection::ZeroTime);
        }
        let distance_m = sample
            .elapsed_distance_m
            .ok_or(Rejection::MissingDistance)?;
        if !distance_m.is_finite() {
            return Err(Rejection::NonFiniteDistance);
        }
        if distance_m < self.min_distance_m {
            return Err(Rejection::DistanceTooSmall);
        }
        let distance_cm = m_to_cm(distance_m).ok_or(Rejection::DistanceOutOfRange)?;

        // No accuracy field at all (simulator, replayed files) counts as usable.
        let gps_usable = sample.gps_accuracy.is_none_or(|g| g >= self.min_gps);

        Ok(ValidSample {
            distance_m,
            distance_cm,
            time_ms,
            gps_usable,
            heart_rate: sample.heart_rate,
        })
    }
}
