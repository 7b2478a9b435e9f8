//! 숫자 파싱 모듈.
//!
//! Kuaishou reports counters either as plain numbers or as display strings
//! such as `"1.2万"`, and durations either as milliseconds or `"MM:SS"`.

use serde_json::Value;

const TEN_THOUSAND: f64 = 10_000.0;
const HUNDRED_MILLION: f64 = 100_000_000.0;

/// Parses a display count such as `"1.2万"`, `"5亿"`, `"3.4w"` or `"1234"`.
///
/// Returns `None` for negative or unparseable input.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_count_with_unit(raw: &str) -> Option<u64> {
    let lowered = raw.trim().to_lowercase();

    let (num_part, multiplier) = if lowered.contains('万') || lowered.contains('w') {
        (lowered.replace(['万', 'w'], ""), TEN_THOUSAND)
    } else if lowered.contains('亿') || lowered.contains('b') {
        (lowered.replace(['亿', 'b'], ""), HUNDRED_MILLION)
    } else {
        (lowered.clone(), 1.0)
    };

    let Ok(num) = num_part.trim().parse::<f64>() else {
        tracing::warn!(raw = %raw, "Count string is not a valid number");
        return None;
    };

    let value = num * multiplier;
    if !value.is_finite() || value < 0.0 {
        return None;
    }

    Some(value.trunc() as u64)
}

/// Parses a counter from a JSON value (number or display string).
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn count_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            let f = n.as_f64().filter(|f| *f >= 0.0)?;
            Some(f.trunc() as u64)
        }),
        Value::String(s) => parse_count_with_unit(s),
        _ => None,
    }
}

/// Parses a `"H:M:S"` or `"M:S"` duration string into seconds.
///
/// Returns `None` when the total does not fit in a `u64`.
pub fn parse_duration(raw: &str) -> Option<u64> {
    if !raw.contains(':') {
        return None;
    }

    let parts: Vec<u64> = raw
        .split(':')
        .map(|p| p.trim().parse::<u64>())
        .collect::<Result<_, _>>()
        .ok()?;

    match parts.as_slice() {
        [h, m, s] => h
            .checked_mul(3600)?
            .checked_add(m.checked_mul(60)?)?
            .checked_add(*s),
        [m, s] => m.checked_mul(60)?.checked_add(*s),
        _ => None,
    }
}

/// Parses a duration from a JSON value.
///
/// Numbers are milliseconds; strings go through [`parse_duration`].
pub fn duration_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => {
            let millis = n.as_i64().and_then(|ms| u64::try_from(ms).ok()).unwrap_or(0);
            Some(millis / 1000)
        }
        Value::String(s) => parse_duration(s),
        _ => None,
    }
}
