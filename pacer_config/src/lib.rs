#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and trace parsing for the milestone pace estimator.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//!   Every section is optional; omitted values fall back to the device defaults.
//! - The trace CSV loader enforces headers and feeds the replay tooling.
use serde::Deserialize;
use serde::de::Deserializer;

/// Upper bound on the milestone table; indices travel as `u8` and the
/// persisted record is a fixed array.
pub const MAX_MILESTONES: usize = 16;

/// Largest accepted `persistence.max_plausible_time_ms` (~277 h). Larger
/// values would let a stored time alias the checksum term for a pending entry.
pub const MAX_PLAUSIBLE_TIME_CAP_MS: u32 = 999_999_997;

/// Largest distance representable in centimetres as `u32`.
pub const MAX_DISTANCE_M: f64 = u32::MAX as f64 / 100.0;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SmoothingCfg {
    /// EMA weight of the newest pace sample. Range: (0.0, 1.0].
    pub alpha: f64,
    /// Elapsed time before the estimate counts as warmed up (s).
    pub warmup_s: f64,
    /// No projections are shown before this distance (m).
    pub min_prediction_distance_m: f64,
    /// Projection cap (ms); guards near-zero pace/distance blow-ups.
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

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeJumpPolicyToml {
    /// Drop smoothing and anomaly history unconditionally.
    #[default]
    Reset,
    /// Keep history when the distance advanced across the jump.
    Reconcile,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AnomalyCfg {
    pub min_pace_s_per_m: f64,
    pub max_pace_s_per_m: f64,
    /// Distance deltas below this count as "no movement" (m).
    pub stagnation_epsilon_m: f64,
    pub stagnation_threshold: u8,
    pub spike_ratio_high: f64,
    pub spike_ratio_low: f64,
    pub spike_threshold: u8,
    /// Elapsed-time gap treated as a discontinuity (s).
    pub time_jump_s: f64,
    pub time_jump_policy: TimeJumpPolicyToml,
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
            time_jump_policy: TimeJumpPolicyToml::Reset,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ValidationCfg {
    /// Distances below this are treated as "no fix yet" (m).
    pub min_distance_m: f64,
    /// Minimum GPS quality for predictions. Accepts either a number
    /// (0 = not available .. 4 = good) or a name:
    /// "not_available" | "last_known" | "poor" | "usable" | "good".
    #[serde(deserialize_with = "de_gps_accuracy")]
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

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GpsAccuracyToml {
    Level(u8),
    Name(String),
}

fn de_gps_accuracy<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    match GpsAccuracyToml::deserialize(deserializer)? {
        GpsAccuracyToml::Level(n) => Ok(n),
        GpsAccuracyToml::Name(name) => gps_level_from_name(&name).ok_or_else(|| {
            serde::de::Error::custom(format!("unknown gps accuracy level '{name}'"))
        }),
    }
}

/// Map a GPS quality name to its numeric level.
pub fn gps_level_from_name(name: &str) -> Option<u8> {
    match name.trim().to_ascii_lowercase().as_str() {
        "not_available" | "none" => Some(0),
        "last_known" => Some(1),
        "poor" => Some(2),
        "usable" => Some(3),
        "good" => Some(4),
        _ => None,
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MilestoneToml {
    pub label: String,
    pub distance_m: f64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TrackingCfg {
    /// Early-completion slack (m).
    pub tolerance_m: f64,
    /// Milestone table, ascending by distance. Empty means the built-in table.
    pub milestones: Vec<MilestoneToml>,
}

impl Default for TrackingCfg {
    fn default() -> Self {
        Self {
            tolerance_m: 5.0,
            milestones: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DisplayCfg {
    /// How long a completed milestone stays pinned in slot 0 (ms).
    pub celebration_ms: u32,
    /// Celebrations older than this are force-cleared (ms).
    pub max_celebration_ms: u32,
    /// Progress ratio at or below which the severity turns yellow.
    pub yellow_ratio: f64,
    /// Progress ratio at or below which the severity turns red.
    pub red_ratio: f64,
    /// Remaining distance at or below which the severity turns red (m).
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PersistenceCfg {
    /// Directory for the file-backed store.
    pub dir: String,
    /// Storage key of the finish-time record.
    pub key: String,
    /// Minimum spacing between throttled writes (ms).
    pub min_save_interval_ms: u64,
    /// Finish times above this are rejected on load (ms).
    pub max_plausible_time_ms: u32,
}

impl Default for PersistenceCfg {
    fn default() -> Self {
        Self {
            dir: "var/pacer".to_string(),
            key: "finish_times".to_string(),
            min_save_interval_ms: 30_000,
            max_plausible_time_ms: 100 * 60 * 60 * 1000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SafeModeCfg {
    /// Consecutive internal faults that trip safe mode.
    pub fault_threshold: u8,
    /// Ticks skipped while in safe mode before retrying.
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

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub smoothing: SmoothingCfg,
    pub anomaly: AnomalyCfg,
    pub validation: ValidationCfg,
    pub tracking: TrackingCfg,
    pub display: DisplayCfg,
    pub persistence: PersistenceCfg,
    pub safe_mode: SafeModeCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Smoothing
        let s = &self.smoothing;
        if !(s.alpha > 0.0 && s.alpha <= 1.0) {
            eyre::bail!("smoothing.alpha must be in (0.0, 1.0]");
        }
        if !s.warmup_s.is_finite() || s.warmup_s < 0.0 {
            eyre::bail!("smoothing.warmup_s must be >= 0");
        }
        if !s.min_prediction_distance_m.is_finite() || s.min_prediction_distance_m < 0.0 {
            eyre::bail!("smoothing.min_prediction_distance_m must be >= 0");
        }
        if s.max_remaining_ms == 0 {
            eyre::bail!("smoothing.max_remaining_ms must be >= 1");
        }

        // Anomaly
        let a = &self.anomaly;
        if !(a.min_pace_s_per_m > 0.0 && a.min_pace_s_per_m < a.max_pace_s_per_m) {
            eyre::bail!("anomaly pace bounds must satisfy 0 < min_pace_s_per_m < max_pace_s_per_m");
        }
        if !a.max_pace_s_per_m.is_finite() {
            eyre::bail!("anomaly.max_pace_s_per_m must be finite");
        }
        if !(a.stagnation_epsilon_m > 0.0 && a.stagnation_epsilon_m <= 1.0) {
            eyre::bail!("anomaly.stagnation_epsilon_m must be in (0.0, 1.0]");
        }
        if a.stagnation_threshold == 0 {
            eyre::bail!("anomaly.stagnation_threshold must be >= 1");
        }
        if a.spike_threshold == 0 {
            eyre::bail!("anomaly.spike_threshold must be >= 1");
        }
        if !(a.spike_ratio_low > 0.0 && a.spike_ratio_low < 1.0) {
            eyre::bail!("anomaly.spike_ratio_low must be in (0.0, 1.0)");
        }
        if !(a.spike_ratio_high > 1.0 && a.spike_ratio_high.is_finite()) {
            eyre::bail!("anomaly.spike_ratio_high must be > 1.0");
        }
        if !(a.time_jump_s > 0.0 && a.time_jump_s.is_finite()) {
            eyre::bail!("anomaly.time_jump_s must be > 0");
        }

        // Validation
        if !(self.validation.min_distance_m > 0.0 && self.validation.min_distance_m.is_finite()) {
            eyre::bail!("validation.min_distance_m must be > 0");
        }
        if self.validation.min_gps_accuracy > 4 {
            eyre::bail!("validation.min_gps_accuracy must be in 0..=4");
        }

        // Tracking
        let t = &self.tracking;
        if !(t.tolerance_m >= 0.0 && t.tolerance_m <= 100.0) {
            eyre::bail!("tracking.tolerance_m must be in [0.0, 100.0]");
        }
        if t.milestones.len() > MAX_MILESTONES {
            eyre::bail!(
                "tracking.milestones has {} entries (max {MAX_MILESTONES})",
                t.milestones.len()
            );
        }
        let mut prev = 0.0_f64;
        for (i, m) in t.milestones.iter().enumerate() {
            if m.label.trim().is_empty() {
                eyre::bail!("tracking.milestones[{i}].label must not be empty");
            }
            if !(m.distance_m > 0.0 && m.distance_m <= MAX_DISTANCE_M) {
                eyre::bail!("tracking.milestones[{i}].distance_m must be in (0, {MAX_DISTANCE_M}]");
            }
            if m.distance_m <= prev {
                eyre::bail!("tracking.milestones must be strictly ascending by distance_m");
            }
            prev = m.distance_m;
        }

        // Display
        let d = &self.display;
        if d.celebration_ms == 0 {
            eyre::bail!("display.celebration_ms must be >= 1");
        }
        if d.max_celebration_ms < d.celebration_ms {
            eyre::bail!("display.max_celebration_ms must be >= display.celebration_ms");
        }
        if !(0.0 <= d.red_ratio && d.red_ratio <= d.yellow_ratio && d.yellow_ratio <= 1.0) {
            eyre::bail!("display ratios must satisfy 0 <= red_ratio <= yellow_ratio <= 1");
        }
        if !(d.red_distance_m >= 0.0 && d.red_distance_m.is_finite()) {
            eyre::bail!("display.red_distance_m must be >= 0");
        }

        // Persistence
        let p = &self.persistence;
        if p.key.trim().is_empty() {
            eyre::bail!("persistence.key must not be empty");
        }
        if p.key.contains(['/', '\\']) {
            eyre::bail!("persistence.key must not contain path separators");
        }
        if p.max_plausible_time_ms == 0 || p.max_plausible_time_ms > MAX_PLAUSIBLE_TIME_CAP_MS {
            eyre::bail!(
                "persistence.max_plausible_time_ms must be in 1..={MAX_PLAUSIBLE_TIME_CAP_MS}"
            );
        }
        if p.min_save_interval_ms > 60 * 60 * 1000 {
            eyre::bail!("persistence.min_save_interval_ms is unreasonably large (>1h)");
        }

        // Safe mode
        if self.safe_mode.fault_threshold == 0 {
            eyre::bail!("safe_mode.fault_threshold must be >= 1");
        }
        if self.safe_mode.recovery_ticks == 0 {
            eyre::bail!("safe_mode.recovery_ticks must be >= 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}

/// One row of a recorded activity trace.
///
/// Expected headers (the last two columns are optional):
/// elapsed_ms,distance_m,gps_accuracy,heart_rate
///
/// Example:
/// elapsed_ms,distance_m,gps_accuracy,heart_rate
/// 1000,2.8,4,121
/// 2000,5.5,4,
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct TraceRow {
    #[serde(default)]
    pub elapsed_ms: Option<u32>,
    #[serde(default)]
    pub distance_m: Option<f64>,
    #[serde(default)]
    pub gps_accuracy: Option<u8>,
    #[serde(default)]
    pub heart_rate: Option<u16>,
}

const TRACE_HEADERS: [&str; 4] = ["elapsed_ms", "distance_m", "gps_accuracy", "heart_rate"];

pub fn load_trace_csv(path: &std::path::Path) -> eyre::Result<Vec<TraceRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open trace CSV {:?}: {}", path, e))?;

    // Enforce a prefix of the known header list, at least time and distance
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual.len() < 2
        || actual.len() > TRACE_HEADERS.len()
        || actual.iter().zip(TRACE_HEADERS).any(|(a, e)| a != e)
    {
        eyre::bail!(
            "trace CSV must have headers 'elapsed_ms,distance_m[,gps_accuracy[,heart_rate]]', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<TraceRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    Ok(rows)
}

/// Parse one live sample line: `elapsed_ms,distance_m[,gps_accuracy[,heart_rate]]`.
///
/// Empty fields become `None`; the GPS column also accepts level names.
pub fn parse_trace_line(line: &str) -> eyre::Result<TraceRow> {
    let mut fields = line.split(',').map(str::trim);
    let mut row = TraceRow::default();

    fn opt<'a>(f: Option<&'a str>) -> Option<&'a str> {
        f.filter(|s| !s.is_empty())
    }

    if let Some(v) = opt(fields.next()) {
        row.elapsed_ms = Some(
            v.parse()
                .map_err(|e| eyre::eyre!("elapsed_ms '{v}': {e}"))?,
        );
    }
    if let Some(v) = opt(fields.next()) {
        row.distance_m = Some(
            v.parse()
                .map_err(|e| eyre::eyre!("distance_m '{v}': {e}"))?,
        );
    }
    if let Some(v) = opt(fields.next()) {
        row.gps_accuracy = match v.parse::<u8>() {
            Ok(n) => Some(n),
            Err(_) => Some(
                gps_level_from_name(v).ok_or_else(|| eyre::eyre!("gps_accuracy '{v}' unknown"))?,
            ),
        };
    }
    if let Some(v) = opt(fields.next()) {
        row.heart_rate = Some(
            v.parse()
                .map_err(|e| eyre::eyre!("heart_rate '{v}': {e}"))?,
        );
    }
    if fields.next().is_some() {
        eyre::bail!("too many fields in sample line (max 4)");
    }
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = load_toml("").unwrap();
        assert!((cfg.smoothing.alpha - 0.15).abs() < f64::EPSILON);
        assert_eq!(cfg.anomaly.stagnation_threshold, 5);
        assert_eq!(cfg.anomaly.time_jump_policy, TimeJumpPolicyToml::Reset);
        assert!(cfg.tracking.milestones.is_empty());
        cfg.validate().unwrap();
    }

    #[test]
    fn gps_level_accepts_names_and_numbers() {
        let cfg = load_toml("[validation]\nmin_gps_accuracy = \"poor\"\n").unwrap();
        assert_eq!(cfg.validation.min_gps_accuracy, 2);
        let cfg = load_toml("[validation]\nmin_gps_accuracy = 4\n").unwrap();
        assert_eq!(cfg.validation.min_gps_accuracy, 4);
        assert!(load_toml("[validation]\nmin_gps_accuracy = \"great\"\n").is_err());
    }

    #[test]
    fn parse_line_handles_optional_columns() {
        let row = parse_trace_line("1000, 2.5").unwrap();
        assert_eq!(row.elapsed_ms, Some(1000));
        assert_eq!(row.distance_m, Some(2.5));
        assert_eq!(row.gps_accuracy, None);

        let row = parse_trace_line("2000,5.0,good,140").unwrap();
        assert_eq!(row.gps_accuracy, Some(4));
        assert_eq!(row.heart_rate, Some(140));

        let row = parse_trace_line(",5.0,,").unwrap();
        assert_eq!(row.elapsed_ms, None);

        assert!(parse_trace_line("1,2,3,4,5").is_err());
        assert!(parse_trace_line("abc,2").is_err());
    }
}
