//! Engine status reported with every tick.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    /// No usable position fix; projections withheld.
    WaitingGps,
    /// Fix is fine but the pace estimate is not trusted yet.
    WarmingUp,
    /// Projections are live.
    Running,
    /// Every milestone has a finish time.
    Complete,
    /// Computation suspended after repeated internal faults.
    SafeMode,
}

impl EngineStatus {
    /// Same spelling as the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WaitingGps => "waiting_gps",
            Self::WarmingUp => "warming_up",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::SafeMode => "safe_mode",
        }
    }
}
