//! Duration formatting helpers.

use std::time::Duration;

pub const SECS_PER_MIN: u64 = 60;
pub const SECS_PER_HOUR: u64 = 3600;

/// Compact human form used in tables: `"1h5m"`, `"42m"`, `"0s"` for zero.
///
/// Sub-minute remainders are truncated, so 30 s renders as `"0m"`.
pub fn format_duration(d: Duration) -> String {
    if d.is_zero() {
        return "0s".to_owned();
    }
    let secs = d.as_secs();
    let hours = secs / SECS_PER_HOUR;
    let minutes = (secs / SECS_PER_MIN) % 60;
    if hours > 0 {
        format!("{hours}h{minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Render `d` the way Go's `time.Duration.String` does (`"1h23m0s"`, `"1.5s"`, `"250ms"`).
pub fn format_go_duration(d: Duration) -> String {
    if d.is_zero() {
        return "0s".to_owned();
    }
    let nanos = d.as_nanos();
    if nanos < 1_000 {
        return format!("{nanos}ns");
    }
    if nanos < 1_000_000 {
        return format!("{}µs", trim_fraction(nanos, 1_000));
    }
    if nanos < 1_000_000_000 {
        return format!("{}ms", trim_fraction(nanos, 1_000_000));
    }

    let total_secs = d.as_secs();
    let hours = total_secs / SECS_PER_HOUR;
    let minutes = (total_secs / SECS_PER_MIN) % 60;
    let sub_nanos = u128::from(total_secs % 60) * 1_000_000_000 + u128::from(d.subsec_nanos());
    let secs = trim_fraction(sub_nanos, 1_000_000_000);

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h{minutes}m"));
    } else if minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    out.push_str(&secs);
    out.push('s');
    out
}

/// `value / unit` as a decimal string without trailing zeros.
fn trim_fraction(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let frac = value % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let width = unit.ilog10() as usize;
    let digits = format!("{frac:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// Error returned by [`parse_go_duration`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid duration {0:?}")]
pub struct ParseDurationError(pub String);

/// Parse a Go duration string such as `"1h23m0s"`, `"1.5h"` or `"300ms"`.
///
/// Negative durations are rejected; `"0"` is accepted.
pub fn parse_go_duration(s: &str) -> Result<Duration, ParseDurationError> {
    let err = || ParseDurationError(s.to_owned());
    let mut rest = s.strip_prefix('+').unwrap_or(s);
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() || rest.starts_with('-') {
        return Err(err());
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(err)?;
        if num_len == 0 {
            return Err(err());
        }
        let (whole, frac) = rest[..num_len].split_once('.').unwrap_or((&rest[..num_len], ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(err());
        }
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit_nanos: u128 = match &rest[..unit_len] {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60_000_000_000,
            "h" => 3_600_000_000_000,
            _ => return Err(err()),
        };
        rest = &rest[unit_len..];

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| err())?
        };
        let mut part = whole.checked_mul(unit_nanos).ok_or_else(err)?;
        if !frac.is_empty() {
            let digits = frac.len().min(18);
            let frac: u128 = frac[..digits].parse().map_err(|_| err())?;
            part = part
                .checked_add(frac * unit_nanos / 10u128.pow(digits as u32))
                .ok_or_else(err)?;
        }
        total = total.checked_add(part).ok_or_else(err)?;
    }
    let secs = u64::try_from(total / 1_000_000_000).map_err(|_| err())?;
    Ok(Duration::new(secs, (total % 1_000_000_000) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "0s")]
    #[case(30, "0m")]
    #[case(300, "5m")]
    #[case(3900, "1h5m")]
    #[case(86_400, "24h0m")]
    fn compact_format(#[case] secs: u64, #[case] expected: &str) {
        assert_eq!(format_duration(Duration::from_secs(secs)), expected);
    }

    #[rstest]
    #[case(Duration::ZERO, "0s")]
    #[case(Duration::from_secs(45), "45s")]
    #[case(Duration::from_secs(300), "5m0s")]
    #[case(Duration::from_secs(4980), "1h23m0s")]
    #[case(Duration::from_millis(1500), "1.5s")]
    #[case(Duration::from_millis(250), "250ms")]
    #[case(Duration::from_micros(3), "3µs")]
    fn go_format(#[case] d: Duration, #[case] expected: &str) {
        assert_eq!(format_go_duration(d), expected);
    }

    #[rstest]
    #[case("1h23m0s", Duration::from_secs(4980))]
    #[case("1.5h", Duration::from_secs(5400))]
    #[case("300ms", Duration::from_millis(300))]
    #[case("0", Duration::ZERO)]
    #[case("0s", Duration::ZERO)]
    fn go_parse(#[case] s: &str, #[case] expected: Duration) {
        assert_eq!(parse_go_duration(s).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("-5m")]
    #[case("5")]
    #[case("5x")]
    #[case("h")]
    #[case("94522879700260684295381835.9h")]
    #[case("340282366920938463463374607431768211455ns")]
    fn go_parse_rejects(#[case] s: &str) {
        assert!(parse_go_duration(s).is_err());
    }
}
