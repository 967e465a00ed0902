//! Urgency tier of the next pending milestone.

use serde::Serialize;

use crate::config::DisplayCfg;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Green,
    Yellow,
    Red,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        }
    }
}

/// Thresholds for `classify`.
#[derive(Debug, Clone, Copy)]
pub struct SeverityBands {
    pub yellow_ratio: f64,
    pub red_ratio: f64,
    pub red_distance_m: f64,
}

impl From<&DisplayCfg> for SeverityBands {
    fn from(c: &DisplayCfg) -> Self {
        Self {
            yellow_ratio: c.yellow_ratio,
            red_ratio: c.red_ratio,
            red_distance_m: c.red_distance_m,
        }
    }
}

impl Default for SeverityBands {
    fn default() -> Self {
        Self::from(&DisplayCfg::default())
    }
}

/// `progress_ratio` runs from 1.0 at segment start to 0.0 at the target.
pub fn classify(progress_ratio: f64, remaining_m: f64, bands: &SeverityBands) -> Severity {
    if progress_ratio <= bands.red_ratio || remaining_m <= bands.red_distance_m {
        Severity::Red
    } else if progress_ratio <= bands.yellow_ratio {
        Severity::Yellow
    } else {
        Severity::Green
    }
}

/// Fraction of the current segment still ahead, clamped to `[0, 1]`.
pub fn progress_ratio(current_cm: u32, segment_start_cm: u32, target_cm: u32) -> f64 {
    let span = target_cm.saturating_sub(segment_start_cm);
    if span == 0 {
        return 0.0;
    }
    let remaining = target_cm.saturating_sub(current_cm);
    (f64::from(remaining) / f64::from(span)).clamp(0.0, 1.0)
}
