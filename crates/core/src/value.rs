use std::{fmt, str::FromStr};

use rust_decimal::Decimal;

const NULL_DISPLAY: &str = "NULL";

/// A single scalar as it appears in a fixture expectation or an engine result.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

pub type Row = Vec<Value>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text-protocol form of the value, `None` for NULL.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(true) => Some("t".to_string()),
            Self::Bool(false) => Some("f".to_string()),
            Self::Int(value) => Some(value.to_string()),
            Self::Float(value) => Some(render_float(*value)),
            Self::Text(value) => Some(value.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str(NULL_DISPLAY),
            Self::Text(value) => write!(f, "{value:?}"),
            other => f.write_str(&other.render().unwrap_or_default()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[must_use]
pub fn values_match(expected: &Value, actual: &Value, normalize_numeric: bool) -> bool {
    match (expected.render(), actual.render()) {
        (None, None) => true,
        (Some(expected), Some(actual)) => {
            if expected == actual {
                return true;
            }
            normalize_numeric && decimals_match(&expected, &actual)
        }
        _ => false,
    }
}

#[must_use]
pub fn rows_match(expected: &[Value], actual: &[Value], normalize_numeric: bool) -> bool {
    expected.len() == actual.len()
        && expected
            .iter()
            .zip(actual)
            .all(|(expected, actual)| values_match(expected, actual, normalize_numeric))
}

#[must_use]
pub fn render_row(row: &[Value]) -> String {
    let rendered = row.iter().map(Value::to_string).collect::<Vec<_>>();
    format!("[{}]", rendered.join(", "))
}

fn decimals_match(expected: &str, actual: &str) -> bool {
    match (parse_decimal(expected), parse_decimal(actual)) {
        (Some(expected), Some(actual)) => expected == actual,
        _ => false,
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
        .map(|value| value.normalize())
}

fn render_float(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value.is_sign_positive() {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        };
    }
    // float8out: shortest round-trip digits, exponent form outside 1e-4..1e15.
    let scientific = format!("{value:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return value.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return value.to_string();
    };
    if (-4..15).contains(&exponent) {
        return value.to_string();
    }
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
}

#[cfg(test)]
mod tests {
    use super::{Value, values_match};

    #[test]
    fn null_only_matches_null() {
        assert!(values_match(&Value::Null, &Value::Null, false));
        assert!(!values_match(&Value::Null, &Value::text(""), false));
        assert!(!values_match(&Value::Null, &Value::Int(0), false));
        assert!(!values_match(&Value::text(""), &Value::Null, false));
    }

    #[test]
    fn typed_literals_match_text_protocol_output() {
        assert!(values_match(&Value::Int(1), &Value::text("1"), false));
        assert!(values_match(&Value::Bool(true), &Value::text("t"), false));
        assert!(values_match(&Value::Float(1.5), &Value::text("1.5"), false));
        assert!(values_match(
            &Value::Float(f64::NEG_INFINITY),
            &Value::text("-Infinity"),
            false
        ));
        assert!(!values_match(&Value::Int(1), &Value::text("1.0"), false));
    }

    #[test]
    fn floats_switch_to_exponent_form_like_float8out() {
        assert_eq!(Value::Float(1e20).render().as_deref(), Some("1e+20"));
        assert_eq!(Value::Float(1e-5).render().as_deref(), Some("1e-05"));
        assert_eq!(Value::Float(-1.5e300).render().as_deref(), Some("-1.5e+300"));
        assert_eq!(Value::Float(1e15).render().as_deref(), Some("1e+15"));
        assert_eq!(
            Value::Float(123_456_789_012_345.0).render().as_deref(),
            Some("123456789012345")
        );
        assert_eq!(Value::Float(0.0001).render().as_deref(), Some("0.0001"));
        assert_eq!(Value::Float(0.0).render().as_deref(), Some("0"));
        assert!(values_match(&Value::Float(1e20), &Value::text("1e+20"), false));
    }

    #[test]
    fn numeric_normalization_is_opt_in() {
        assert!(!values_match(&Value::text("1.50"), &Value::text("1.5"), false));
        assert!(values_match(&Value::text("1.50"), &Value::text("1.5"), true));
        assert!(values_match(&Value::Int(0), &Value::text("-0.000"), true));
        assert!(!values_match(&Value::text("abc"), &Value::text("abd"), true));
    }
}
