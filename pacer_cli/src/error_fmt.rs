//! Human-readable error descriptions and structured JSON error formatting.

use pacer_core::{BuildError, Corruption, PersistError};
use serde_json::json;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingStore => {
                "What happened: No storage was provided to the estimator.\nLikely causes: The store directory could not be opened.\nHow to fix: Check [persistence].dir in the config and its permissions.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values or an unsorted [[tracking.milestones]] table.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(pe) = err.downcast_ref::<PersistError>() {
        return match pe {
            PersistError::Corrupt(c) => format!(
                "What happened: The persisted finish-time record is invalid ({c}).\nLikely causes: Interrupted write, manual edits, or a milestone table that changed since the record was saved.\nHow to fix: Run `pacer reset`, or start the estimator once to discard the record."
            ),
            PersistError::Io(e) => format!(
                "What happened: Storage I/O failed ({e}).\nLikely causes: Missing directory, permissions, or a full disk.\nHow to fix: Check [persistence].dir and free space, then rerun."
            ),
            PersistError::Encode(e) => format!(
                "What happened: Could not encode the finish-time record ({e}).\nLikely causes: Internal error.\nHow to fix: Re-run with --log-level=debug and report the output."
            ),
        };
    }

    // String-based heuristics for errors coming from config or trace loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("invalid configuration") {
        let cause = err
            .source()
            .map(|s| format!(" ({s})"))
            .unwrap_or_default();
        return format!(
            "What happened: Configuration is invalid{cause}.\nLikely causes: Typo in a key, wrong value type, or out-of-range values.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("trace csv must have headers") {
        return "Invalid headers in trace CSV. Expected 'elapsed_ms,distance_m[,gps_accuracy[,heart_rate]]'.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 config, 4 corrupt record, 5 storage I/O, 1 otherwise.
/// Usage errors exit 2 from clap.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if matches!(err.downcast_ref::<BuildError>(), Some(BuildError::InvalidConfig(_))) {
        return 3;
    }
    match err.downcast_ref::<PersistError>() {
        Some(PersistError::Corrupt(_)) => 4,
        Some(PersistError::Io(_)) => 5,
        _ if err.to_string().to_ascii_lowercase().contains("invalid configuration") => 3,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingStore => "MissingStore",
            BuildError::InvalidConfig(_) => "InvalidConfig",
        };
    }
    match err.downcast_ref::<PersistError>() {
        Some(PersistError::Corrupt(_)) => "CorruptRecord",
        Some(PersistError::Io(_)) => "StorageIo",
        Some(PersistError::Encode(_)) => "Encode",
        None if exit_code_for_error(err) == 3 => "InvalidConfig",
        None => "Error",
    }
}

fn corruption_details(c: &Corruption) -> serde_json::Value {
    match *c {
        Corruption::Version { found, expected } => json!({ "found": found, "expected": expected }),
        Corruption::Length { found, expected } => json!({ "found": found, "expected": expected }),
        Corruption::OutOfRange { index }
        | Corruption::Gap { index }
        | Corruption::NonMonotonic { index } => json!({ "index": index }),
        Corruption::Malformed | Corruption::Checksum => json!({}),
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    let msg = humanize(err);
    if let Some(PersistError::Corrupt(c)) = err.downcast_ref::<PersistError>() {
        return json!({
            "reason": reason_name(err),
            "details": { "kind": c.to_string(), "at": corruption_details(c) },
            "message": msg,
        })
        .to_string();
    }
    json!({ "reason": reason_name(err), "message": msg }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_record_maps_to_exit_4_with_details() {
        let err = eyre::Report::new(PersistError::Corrupt(Corruption::Gap { index: 2 }));
        assert_eq!(exit_code_for_error(&err), 4);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "CorruptRecord");
        assert_eq!(v["details"]["at"]["index"], 2);
    }

    #[test]
    fn invalid_config_maps_to_exit_3() {
        let err = eyre::Report::new(BuildError::InvalidConfig("alpha must be in (0, 1]"));
        assert_eq!(exit_code_for_error(&err), 3);
        assert!(humanize(&err).contains("alpha must be in (0, 1]"));
    }

    #[test]
    fn wrapped_config_errors_are_recognised() {
        let err = eyre::eyre!("smoothing.alpha must be in (0, 1]").wrap_err("invalid configuration");
        assert_eq!(exit_code_for_error(&err), 3);
        assert_eq!(reason_name(&err), "InvalidConfig");
        assert!(humanize(&err).contains("smoothing.alpha"));
    }

    #[test]
    fn unknown_errors_fall_back() {
        let err = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&err), 1);
        assert!(humanize(&err).contains("Original: boom"));
    }
}
