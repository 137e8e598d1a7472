use std::sync::LazyLock;

use regex::Regex;

use super::{FloatWidth, IntWidth, Locale};
use crate::types::RowValues;

static NON_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\-0-9]").expect("static pattern compiles"));
static NON_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\-0-9.,]").expect("static pattern compiles"));
static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]").expect("static pattern compiles"));

/// Keep only digits and `-`. Any decimal point is dropped, so `"12.5"`
/// becomes `"125"`.
pub(super) fn integer_digits(text: &str) -> String {
    NON_INTEGER.replace_all(text, "").into_owned()
}

/// Keep only digits, `-`, `.` and `,`.
pub(super) fn decimal_digits(text: &str) -> String {
    NON_DECIMAL.replace_all(text, "").into_owned()
}

pub(super) fn to_integer(value: &RowValues, width: IntWidth, locale: &Locale) -> Option<RowValues> {
    let wide = match value {
        RowValues::Int(i) => Some(*i),
        RowValues::Float(f) => float_to_i64(*f),
        RowValues::Bool(b) => Some(i64::from(*b)),
        RowValues::Text(text) => {
            let digits = integer_digits(text);
            if digits.is_empty() {
                None
            } else {
                digits.parse::<i64>().ok()
            }
        }
        RowValues::JSON(json) => json
            .as_i64()
            .or_else(|| json.as_f64().and_then(float_to_i64))
            .or_else(|| {
                json.as_str()
                    .and_then(|s| to_integer(&RowValues::Text(s.to_owned()), width, locale))
                    .and_then(|v| v.as_int().copied())
            }),
        RowValues::Timestamp(_) | RowValues::Blob(_) | RowValues::Null => None,
    }?;
    width.contains(wide).then_some(RowValues::Int(wide))
}

pub(super) fn to_float(value: &RowValues, width: FloatWidth, locale: &Locale) -> Option<RowValues> {
    #[allow(clippy::cast_precision_loss)]
    let wide = match value {
        RowValues::Float(f) => Some(*f),
        RowValues::Int(i) => Some(*i as f64),
        RowValues::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        RowValues::Text(text) => parse_decimal(text, locale),
        RowValues::JSON(json) => json
            .as_f64()
            .or_else(|| json.as_str().and_then(|s| parse_decimal(s, locale))),
        RowValues::Timestamp(_) | RowValues::Blob(_) | RowValues::Null => None,
    }?;
    match width {
        FloatWidth::F64 => Some(RowValues::Float(wide)),
        FloatWidth::F32 => {
            #[allow(clippy::cast_possible_truncation)]
            let narrow = wide as f32;
            (narrow.is_finite() || !wide.is_finite()).then_some(RowValues::Float(f64::from(narrow)))
        }
    }
}

/// Parse text written in `locale` as a float after stripping everything but
/// digits, signs and separators.
pub(super) fn parse_decimal(text: &str, locale: &Locale) -> Option<f64> {
    let digits = decimal_digits(text);
    if digits.is_empty() {
        return None;
    }
    locale.normalize_decimal(&digits).parse::<f64>().ok()
}

/// `true` for `"true"`/`"1"` after dropping non-alphanumerics, `false` for
/// `"false"`/`"0"`, `None` for anything else.
pub(super) fn to_bool(value: &RowValues) -> Option<bool> {
    let rendered = match value {
        RowValues::Bool(b) => return Some(*b),
        RowValues::Int(i) => i.to_string(),
        RowValues::Float(f) => f.to_string(),
        RowValues::Text(text) => text.clone(),
        RowValues::JSON(json) => match json {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        },
        RowValues::Timestamp(_) | RowValues::Blob(_) | RowValues::Null => return None,
    };
    let word = NON_ALPHANUMERIC.replace_all(&rendered, "").to_ascii_lowercase();
    match word.as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Round half-to-even and convert, rejecting values outside `i64`.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_to_i64(f: f64) -> Option<i64> {
    if !f.is_finite() {
        return None;
    }
    let rounded = f.round_ties_even();
    (rounded >= i64::MIN as f64 && rounded < i64::MAX as f64).then_some(rounded as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_strip_drops_decimal_point() {
        assert_eq!(integer_digits("12.5"), "125");
        assert_eq!(integer_digits("Rp -1.250"), "-1250");
    }

    #[test]
    fn floats_round_half_to_even_into_integers() {
        let en = Locale::EN_US;
        assert_eq!(
            to_integer(&RowValues::Float(2.5), IntWidth::I32, &en),
            Some(RowValues::Int(2))
        );
        assert_eq!(
            to_integer(&RowValues::Float(3.5), IntWidth::I32, &en),
            Some(RowValues::Int(4))
        );
    }

    #[test]
    fn integer_overflow_is_rejected() {
        let en = Locale::EN_US;
        assert_eq!(to_integer(&RowValues::Int(300), IntWidth::I8, &en), None);
        assert_eq!(to_integer(&RowValues::Int(-1), IntWidth::U16, &en), None);
        assert_eq!(to_integer(&RowValues::Float(1e30), IntWidth::I64, &en), None);
    }

    #[test]
    fn decimal_text_follows_locale() {
        assert_eq!(parse_decimal("12,500.75", &Locale::EN_US), Some(12500.75));
        assert_eq!(parse_decimal("12,500.75", &Locale::ID_ID), Some(12.50075));
        assert_eq!(parse_decimal("Rp 12.500,75", &Locale::ID_ID), Some(12500.75));
        assert_eq!(parse_decimal("1.2.3", &Locale::EN_US), None);
    }

    #[test]
    fn bool_words_ignore_case_and_punctuation() {
        assert_eq!(to_bool(&RowValues::Text(" TRUE! ".into())), Some(true));
        assert_eq!(to_bool(&RowValues::Int(1)), Some(true));
        assert_eq!(to_bool(&RowValues::Text("no".into())), None);
    }
}
