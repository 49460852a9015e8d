//! Human-readable error descriptions and structured JSON error formatting.

use grillmon_core::error::{BuildError, GrillError};
use serde_json::json;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid estimator configuration ({msg}).\nLikely causes: Out-of-range values in the [estimator] or [fallback] tables.\nHow to fix: Edit the config file, then rerun `grillmon self-check`."
            ),
        };
    }

    if let Some(ge) = err.downcast_ref::<GrillError>() {
        return match ge {
            GrillError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: A typo in the TOML or a value outside its allowed range.\nHow to fix: Edit the config file, then rerun `grillmon self-check`."
            ),
            GrillError::Io(msg) => format!(
                "What happened: A file could not be read or written ({msg}).\nLikely causes: Wrong path or missing permissions.\nHow to fix: Check the path passed on the command line and that the directory exists."
            ),
            GrillError::Telemetry(msg) => format!(
                "What happened: Telemetry could not be decoded ({msg}).\nLikely causes: The input is not a status log or broker envelope stream.\nHow to fix: Feed one JSON status or envelope per line."
            ),
        };
    }

    if let Some(io) = err.downcast_ref::<std::io::Error>() {
        return format!(
            "What happened: I/O failure ({io}).\nLikely causes: A closed pipe or an unwritable output.\nHow to fix: Check where stdout and --output point."
        );
    }

    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable reason name for JSON errors.
fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidConfig";
    }
    match err.downcast_ref::<GrillError>() {
        Some(GrillError::Config(_)) => "Config",
        Some(GrillError::Io(_)) => "Io",
        Some(GrillError::Telemetry(_)) => "Telemetry",
        None if err.downcast_ref::<std::io::Error>().is_some() => "Io",
        None => "Error",
    }
}

/// Exit codes: 3 for configuration problems, 4 for file access, 1 otherwise.
/// Usage errors exit 2 from clap before any of this runs.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match reason_name(err) {
        "InvalidConfig" | "Config" => 3,
        "Io" => 4,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}
