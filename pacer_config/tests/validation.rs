use pacer_config::{TimeJumpPolicyToml, load_toml};
use rstest::rstest;

const FULL: &str = r#"
[smoothing]
alpha = 0.15
warmup_s = 5.0
min_prediction_distance_m = 100.0
max_remaining_ms = 360000000

[anomaly]
min_pace_s_per_m = 0.05
max_pace_s_per_m = 20.0
stagnation_epsilon_m = 0.01
stagnation_threshold = 5
spike_ratio_high = 2.0
spike_ratio_low = 0.5
spike_threshold = 3
time_jump_s = 5.0
time_jump_policy = "reconcile"

[validation]
min_distance_m = 0.1
min_gps_accuracy = "usable"

[tracking]
tolerance_m = 5.0

[[tracking.milestones]]
label = "1K"
distance_m = 1000.0

[[tracking.milestones]]
label = "5K"
distance_m = 5000.0

[display]
celebration_ms = 15000
max_celebration_ms = 60000

[persistence]
dir = "var/pacer"
key = "finish_times"
min_save_interval_ms = 30000

[safe_mode]
fault_threshold = 3
recovery_ticks = 10

[logging]
level = "debug"
rotation = "daily"
"#;

#[test]
fn accepts_full_config() {
    let cfg = load_toml(FULL).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.anomaly.time_jump_policy, TimeJumpPolicyToml::Reconcile);
    assert_eq!(cfg.validation.min_gps_accuracy, 3);
    assert_eq!(cfg.tracking.milestones.len(), 2);
    assert_eq!(cfg.tracking.milestones[1].label, "5K");
}

#[rstest]
#[case("[smoothing]\nalpha = 0.0\n", "smoothing.alpha")]
#[case("[smoothing]\nalpha = 1.5\n", "smoothing.alpha")]
#[case("[anomaly]\nmin_pace_s_per_m = 30.0\n", "pace bounds")]
#[case("[anomaly]\nstagnation_threshold = 0\n", "stagnation_threshold")]
#[case("[anomaly]\nspike_ratio_low = 1.5\n", "spike_ratio_low")]
#[case("[anomaly]\ntime_jump_s = 0.0\n", "time_jump_s")]
#[case("[validation]\nmin_distance_m = 0.0\n", "min_distance_m")]
#[case("[validation]\nmin_gps_accuracy = 9\n", "min_gps_accuracy")]
#[case("[display]\ncelebration_ms = 5000\nmax_celebration_ms = 1000\n", "max_celebration_ms")]
#[case("[display]\nred_ratio = 0.8\nyellow_ratio = 0.5\n", "ratios")]
#[case("[persistence]\nkey = \"a/b\"\n", "path separators")]
#[case("[persistence]\nmax_plausible_time_ms = 999999998\n", "max_plausible_time_ms")]
#[case("[safe_mode]\nrecovery_ticks = 0\n", "recovery_ticks")]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation")]
fn rejects_out_of_range_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(needle),
        "error '{err}' should mention '{needle}'"
    );
}

#[test]
fn rejects_unsorted_milestones() {
    let toml = r#"
[[tracking.milestones]]
label = "10K"
distance_m = 10000.0

[[tracking.milestones]]
label = "5K"
distance_m = 5000.0
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("unsorted table");
    assert!(format!("{err}").contains("strictly ascending"));
}

#[test]
fn rejects_blank_milestone_label() {
    let toml = "[[tracking.milestones]]\nlabel = \"  \"\ndistance_m = 5000.0\n";
    let cfg = load_toml(toml).expect("parse TOML");
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_unknown_time_jump_policy() {
    assert!(load_toml("[anomaly]\ntime_jump_policy = \"ignore\"\n").is_err());
}
