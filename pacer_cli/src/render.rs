//! Text and JSON rendering of tick outputs.

use pacer_core::{SlotView, TickOutput};
use serde_json::json;

/// `h:mm:ss` above an hour, `mm:ss` below, `--:--` when unknown.
pub fn fmt_clock(ms: Option<u32>) -> String {
    let Some(ms) = ms else {
        return "--:--".to_string();
    };
    let total_s = ms / 1000;
    let (h, m, s) = (total_s / 3600, (total_s / 60) % 60, total_s % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

/// Pace in min/km, or `--:--` before the estimate is seeded.
pub fn fmt_pace(s_per_m: f64) -> String {
    if !(s_per_m.is_finite() && s_per_m > 0.0) {
        return "--:--".to_string();
    }
    let per_km = (s_per_m * 1000.0).round();
    if per_km >= f64::from(u32::MAX) {
        return "--:--".to_string();
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let per_km = per_km as u32;
    format!("{}:{:02}", per_km / 60, per_km % 60)
}

fn fmt_slot(slot: Option<&SlotView>) -> String {
    match slot {
        None => String::new(),
        Some(s) if s.is_completed => format!("{}*{}", s.label, fmt_clock(s.display_time_ms)),
        Some(s) => format!("{} {}", s.label, fmt_clock(s.display_time_ms)),
    }
}

pub fn table_header() -> String {
    format!(
        "{:>8}  {:>9}  {:>6}  {:<11}  {:<16}{:<16}{:<16}{:<6}",
        "time", "dist_m", "pace", "status", "slot0", "slot1", "slot2", "sev"
    )
}

/// One table row. Completed slots are marked with `*`; a trailing note
/// explains rejected ticks.
pub fn table_row(elapsed_ms: Option<u32>, distance_m: Option<f64>, out: &TickOutput) -> String {
    let dist = distance_m.map_or_else(|| "-".to_string(), |d| format!("{d:.1}"));
    let mut row = format!(
        "{:>8}  {:>9}  {:>6}  {:<11}  {:<16}{:<16}{:<16}{:<6}",
        fmt_clock(elapsed_ms),
        dist,
        fmt_pace(out.smoothed_pace_s_per_m),
        out.status.as_str(),
        fmt_slot(out.slots[0].as_ref()),
        fmt_slot(out.slots[1].as_ref()),
        fmt_slot(out.slots[2].as_ref()),
        out.severity.as_str(),
    );
    if let Some(r) = out.rejection {
        row.push_str(&format!("  [rejected: {r}]"));
    } else if let Some(a) = out.anomaly {
        row.push_str(&format!("  [anomaly: {a}]"));
    }
    if let Some(idx) = out.celebrating {
        row.push_str(&format!("  [celebrating #{idx}]"));
    }
    row
}

pub fn json_row(elapsed_ms: Option<u32>, out: &TickOutput) -> String {
    json!({ "elapsed_ms": elapsed_ms, "tick": out }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_formatting() {
        assert_eq!(fmt_clock(None), "--:--");
        assert_eq!(fmt_clock(Some(0)), "00:00");
        assert_eq!(fmt_clock(Some(1_798_200)), "29:58");
        assert_eq!(fmt_clock(Some(3_723_000)), "1:02:03");
    }

    #[test]
    fn pace_formatting() {
        assert_eq!(fmt_pace(0.36), "6:00");
        assert_eq!(fmt_pace(0.0), "--:--");
        assert_eq!(fmt_pace(f64::NAN), "--:--");
    }
}
