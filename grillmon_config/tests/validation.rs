use grillmon_config::{load_file, load_toml};
use rstest::rstest;
use std::fs;

#[rstest]
#[case("[estimator]\ntau_step_s = 0.0\n", "tau_step_s must be > 0")]
#[case("[estimator]\ntau_min_s = 900.0\ntau_max_s = 600.0\n", "tau_max_s must be >=")]
#[case("[estimator]\naccept_ratio = 1.5\n", "accept_ratio must be in")]
#[case("[estimator]\nmin_fit_samples = 1\n", "min_fit_samples must be >= 2")]
#[case("[estimator]\nhistory_len = 5\nfit_window = 10\n", "fit_window must not exceed")]
#[case("[estimator]\nmax_eta_s = 0\n", "max_eta_s must be >= 1")]
#[case("[fallback]\nwindow = 1\n", "fallback.window must be >= 2")]
#[case("[monitor]\nstall_timeout_ms = 0\n", "stall_timeout_ms must be >= 1")]
#[case("[monitor]\nchannel_capacity = 0\n", "channel_capacity must be >= 1")]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation must be one of")]
fn rejects_out_of_range_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(needle),
        "expected {needle:?} in {err}"
    );
}

#[test]
fn accepts_full_document() {
    let toml = r#"
[estimator]
history_len = 30
min_fit_samples = 4
fit_window = 12
initial_tau_s = 1800.0
tau_min_s = 120.0
tau_max_s = 14400.0
tau_step_s = 120.0
accept_ratio = 0.8
max_eta_s = 21600
uncertainty_window = 6

[fallback]
window = 6
max_eta_s = 43200

[monitor]
stall_timeout_ms = 30000
channel_capacity = 16

[logging]
file = "grillmon.log"
level = "debug"
rotation = "daily"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.estimator.fit_window, 12);
    assert_eq!(cfg.fallback.window, 6);
    assert_eq!(cfg.monitor.channel_capacity, 16);
    assert_eq!(cfg.logging.rotation.as_deref(), Some("daily"));
}

#[test]
fn unknown_type_is_a_parse_error() {
    assert!(load_toml("[estimator]\nhistory_len = \"twenty\"\n").is_err());
}

#[test]
fn load_file_reads_and_validates() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.toml");
    fs::write(&good, "[fallback]\nwindow = 4\n").unwrap();
    let cfg = load_file(&good).expect("load");
    assert_eq!(cfg.fallback.window, 4);

    let bad = dir.path().join("bad.toml");
    fs::write(&bad, "[fallback]\nwindow = 0\n").unwrap();
    let err = load_file(&bad).expect_err("invalid config");
    assert!(format!("{err}").contains("fallback.window"));

    let missing = dir.path().join("missing.toml");
    let err = load_file(&missing).expect_err("missing file");
    assert!(format!("{err}").contains("read config"));
}
