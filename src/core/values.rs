//! Coercion of loosely typed export cells into the types the analysis works on.

use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d.%m.%Y", "%m/%d/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Non-negative metric. Missing and empty cells count as zero.
pub fn to_count(value: Option<&Value>, table: &str, column: &str) -> Result<u64> {
    let invalid = |shown: &dyn std::fmt::Display| {
        EtlError::processing(format!(
            "{} column '{}' holds '{}', expected a non-negative number",
            table, column, shown
        ))
    };

    let number = match value {
        None | Some(Value::Null) => return Ok(0),
        Some(Value::Number(n)) => {
            if let Some(v) = n.as_u64() {
                return Ok(v);
            }
            n.as_f64().ok_or_else(|| invalid(n))?
        }
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
                return Ok(0);
            }
            trimmed.parse::<f64>().map_err(|_| invalid(s))?
        }
        Some(other) => return Err(invalid(other)),
    };

    if !number.is_finite() || number < 0.0 {
        return Err(invalid(&number));
    }
    Ok(number.round() as u64)
}

pub fn to_date(value: Option<&Value>, table: &str, column: &str) -> Result<NaiveDate> {
    let text = match value {
        Some(Value::String(s)) => s.trim(),
        Some(other) => {
            return Err(EtlError::processing(format!(
                "{} column '{}' holds '{}', expected a date",
                table, column, other
            )))
        }
        None => "",
    };

    if text.is_empty() {
        return Err(EtlError::processing(format!(
            "{} column '{}' has an empty date",
            table, column
        )));
    }

    parse_date(text).ok_or_else(|| {
        EtlError::processing(format!(
            "{} column '{}' holds unrecognised date '{}'",
            table, column, text
        ))
    })
}

pub fn parse_date(text: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

/// Identifier or label. Integral floats lose their `.0` so ids group consistently.
pub fn to_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 9.0e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Some(other) => other.to_string(),
    }
}

/// Cell as written back to CSV.
pub fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}
