use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};

use super::{Locale, numeric};
use crate::types::RowValues;

/// Spreadsheet serial day numbers count from this midnight.
fn excel_epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1899, 12, 30).map(|d| d.and_time(NaiveTime::MIN))
}

/// Serial days accepted by spreadsheets: 0100-01-01 through 9999-12-31.
const EXCEL_MIN: f64 = -657_435.0;
const EXCEL_MAX: f64 = 2_958_466.0;

/// Interpret `serial` as a spreadsheet date. The whole part counts days from
/// the epoch; the fractional part is always added as time of day, so
/// `-1.25` is 1899-12-29 06:00.
pub(super) fn from_excel_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial <= EXCEL_MIN || serial >= EXCEL_MAX {
        return None;
    }
    let days = serial.trunc();
    #[allow(clippy::cast_possible_truncation)]
    let millis = ((serial - days).abs() * 86_400_000.0).round() as i64;
    #[allow(clippy::cast_possible_truncation)]
    let whole_days = days as i64;
    excel_epoch()?
        .checked_add_signed(Duration::days(whole_days))?
        .checked_add_signed(Duration::milliseconds(millis))
}

fn excel_serial_of(value: &RowValues, locale: &Locale) -> Option<f64> {
    #[allow(clippy::cast_precision_loss)]
    match value {
        RowValues::Int(i) => Some(*i as f64),
        RowValues::Float(f) => Some(*f),
        RowValues::Text(text) => {
            let trimmed = text.trim();
            let digits = numeric::decimal_digits(trimmed);
            // Reject text that merely contains digits, like an ISO date.
            if digits.len() != trimmed.len() || digits.matches('-').count() > 1 {
                return None;
            }
            numeric::parse_decimal(trimmed, locale)
        }
        RowValues::JSON(json) => json.as_f64(),
        _ => None,
    }
}

/// Parse `text` with one explicit chrono format, as date-time or date-only.
pub(super) fn parse_with_format(text: &str, format: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, format)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, format)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Parse `text` using ISO forms, RFC 3339, then the locale's own patterns.
pub(super) fn parse_with_locale(text: &str, locale: &Locale) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(text) {
        return Some(with_offset.naive_local());
    }
    locale
        .datetime_patterns()
        .find_map(|pattern| NaiveDateTime::parse_from_str(text, pattern).ok())
        .or_else(|| {
            locale
                .date_patterns()
                .find_map(|pattern| NaiveDate::parse_from_str(text, pattern).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Run the date fallback chain:
///
/// 1. spreadsheet serial day, when `excel` is set and the value is numeric
/// 2. the explicit `format`, when one is given
/// 3. the active locale
/// 4. one retry against [`Locale::reference`] when the active locale differs
pub(super) fn to_datetime(
    value: &RowValues,
    excel: bool,
    format: Option<&str>,
    locale: &Locale,
) -> Option<NaiveDateTime> {
    if let RowValues::Timestamp(ts) = value {
        return Some(*ts);
    }
    if excel {
        if let Some(parsed) = excel_serial_of(value, locale).and_then(from_excel_serial) {
            return Some(parsed);
        }
    }
    let text = match value {
        RowValues::Text(text) => text.as_str(),
        RowValues::JSON(serde_json::Value::String(text)) => text.as_str(),
        _ => return None,
    };
    if let Some(parsed) = format.and_then(|f| parse_with_format(text, f)) {
        return Some(parsed);
    }
    if let Some(parsed) = parse_with_locale(text, locale) {
        return Some(parsed);
    }
    let reference = Locale::reference();
    if *locale == reference {
        None
    } else {
        parse_with_locale(text, &reference)
    }
}
