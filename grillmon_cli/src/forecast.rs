//! `grillmon forecast`: replay a status log and print what the ETA would have been.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use eyre::WrapErr;
use grillmon_config::Config;
use grillmon_core::config::{EstimatorCfg, FallbackCfg};
use grillmon_core::error::GrillError;
use grillmon_core::replay::{self, Actual, Forecast, ForecastRow, ForecastSummary};
use grillmon_core::telemetry::Units;
use grillmon_core::util::format_duration;
use serde_json::json;

/// Rows between annotation lines.
const ANNOTATE_EVERY: usize = 10;

pub fn run_forecast(
    cfg: &Config,
    input: &Path,
    actual: Option<DateTime<Utc>>,
    csv: Option<&Path>,
    json: bool,
) -> eyre::Result<()> {
    let file = File::open(input)
        .map_err(|e| GrillError::Io(format!("open {}: {e}", input.display())))?;
    let entries = replay::load_history(BufReader::new(file))?;
    tracing::info!(input = %input.display(), entries = entries.len(), "history loaded");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if entries.is_empty() {
        writeln!(out, "No valid probe data found in input file")?;
        return Ok(());
    }

    let est = EstimatorCfg::from(&cfg.estimator);
    let fb = FallbackCfg::from(&cfg.fallback);
    let fc = replay::forecast(&entries, actual, &est, &fb)?;

    if let Some(path) = csv {
        write_csv(path, &fc.rows)?;
        tracing::info!(path = %path.display(), rows = fc.rows.len(), "csv written");
    }

    if json {
        write_json(&mut out, &fc)?;
    } else {
        render_table(&mut out, &fc, actual)?;
    }
    out.flush()?;
    Ok(())
}

fn write_json<W: Write>(out: &mut W, fc: &Forecast) -> eyre::Result<()> {
    for row in &fc.rows {
        serde_json::to_writer(&mut *out, row)?;
        writeln!(out)?;
    }
    if let Some(summary) = &fc.summary {
        writeln!(out, "{}", json!({ "summary": summary }))?;
    }
    Ok(())
}

fn render_table<W: Write>(
    out: &mut W,
    fc: &Forecast,
    actual: Option<DateTime<Utc>>,
) -> eyre::Result<()> {
    let units = fc.summary.as_ref().map_or(Units::Fahrenheit, |s| s.units);
    let deg = units.symbol();

    writeln!(out, "Forecasting ETA predictions from {} entries", fc.rows.len())?;
    if let Some(finish) = actual {
        writeln!(out, "Actual finish time: {}", finish.format("%H:%M:%S"))?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "{:<8} {:>6} {:>5} {:>5} {:>6} {:>9} {:>8} {:>7} {:>7} {:<11} {:>7} {:>8}",
        "Time", "Δ(s)", "Grill", "Probe", "Target", "Rate/h", "Filtered", "ExpETA", "Actual",
        "Source", "ETA", "Accuracy"
    )?;
    writeln!(out, "{}", "-".repeat(105))?;

    let last = fc.rows.len().saturating_sub(1);
    for (i, row) in fc.rows.iter().enumerate() {
        writeln!(
            out,
            "{:<8} {:>6.0} {:>5} {:>5} {:>6} {:>9.1} {:>8.1} {:>7} {:>7} {:<11} {:>7} {:>8}",
            row.time.format("%H:%M:%S"),
            row.delta_s,
            row.grill,
            row.probe,
            row.target,
            row.observed_rate,
            row.filtered_temp,
            format_duration(row.exponential_eta),
            actual_cell(row.actual),
            row.source.as_str(),
            format_duration(row.eta),
            row.accuracy.map_or_else(|| "-".to_owned(), |a| format!("{a:+.1}%")),
        )?;
        if i % ANNOTATE_EVERY == 0 || i == last {
            annotate(out, row, deg)?;
        }
    }

    if let Some(summary) = &fc.summary {
        render_summary(out, summary, deg)?;
    }
    Ok(())
}

fn actual_cell(actual: Option<Actual>) -> String {
    match actual {
        Some(Actual::Remaining(d)) => format_duration(d),
        Some(Actual::Done) => "DONE".to_owned(),
        None => "-".to_owned(),
    }
}

fn annotate<W: Write>(out: &mut W, row: &ForecastRow, deg: &str) -> io::Result<()> {
    let finish = row
        .predicted_finish()
        .map_or_else(|| "-".to_owned(), |t| t.format("%H:%M:%S").to_string());
    writeln!(
        out,
        "    -> predicted finish {finish}, actual remaining {}, uncertainty ±{:.1}{deg}, tau {:.0}s",
        actual_cell(row.actual),
        row.uncertainty,
        row.time_constant,
    )
}

fn render_summary<W: Write>(out: &mut W, s: &ForecastSummary, deg: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Summary:")?;
    if let Some(total) = s.total_cook_s {
        writeln!(
            out,
            "  Total cook time: {}",
            format_duration(std::time::Duration::from_secs(total))
        )?;
    }
    writeln!(out, "  Monitored time: {}", format_duration(s.monitored))?;
    writeln!(
        out,
        "  Temperature range: {}{deg} → {}{deg} (target {}{deg})",
        s.start_probe, s.end_probe, s.target
    )?;
    if let Some(acc) = s.final_accuracy {
        writeln!(out, "  Final prediction accuracy: {acc:+.1}%")?;
    }
    Ok(())
}

fn write_csv(path: &Path, rows: &[ForecastRow]) -> eyre::Result<()> {
    let mut w = csv::Writer::from_path(path)
        .map_err(|e| GrillError::Io(format!("create {}: {e}", path.display())))?;
    w.write_record([
        "time",
        "delta_s",
        "grill",
        "probe",
        "target",
        "observed_rate",
        "filtered_temp",
        "exp_eta_s",
        "eta_s",
        "source",
        "uncertainty",
        "time_constant_s",
        "actual_remaining_s",
        "accuracy_pct",
    ])?;
    for r in rows {
        let actual = match r.actual {
            Some(Actual::Remaining(d)) => d.as_secs().to_string(),
            Some(Actual::Done) => "0".to_owned(),
            None => String::new(),
        };
        w.write_record([
            r.time.to_rfc3339(),
            format!("{:.0}", r.delta_s),
            r.grill.to_string(),
            r.probe.to_string(),
            r.target.to_string(),
            format!("{:.2}", r.observed_rate),
            format!("{:.2}", r.filtered_temp),
            r.exponential_eta.as_secs().to_string(),
            r.eta.as_secs().to_string(),
            r.source.as_str().to_owned(),
            format!("{:.2}", r.uncertainty),
            format!("{:.0}", r.time_constant),
            actual,
            r.accuracy.map_or_else(String::new, |a| format!("{a:.2}")),
        ])?;
    }
    w.flush()
        .wrap_err_with(|| format!("flush {}", path.display()))?;
    Ok(())
}
