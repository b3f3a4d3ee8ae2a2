//! Property types and total coercion.
//!
//! Every property write goes through [`PropertyValue::coerce`]. Inputs of
//! the wrong shape never fail: they resolve to the sentinel of the
//! declared type (string `-`, integer `-1`, float `-1.0`, boolean
//! `false`, datetime `0001-01-01T01:01:01Z`). Unset properties stay
//! [`PropertyValue::Empty`] and serialize to an empty CSV field.

use chrono::NaiveDateTime;
use serde_json::Value;

/// Timestamp layout used across the GitHub APIs and the CSV files.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Fallback timestamp written when a datetime fails to parse.
pub const DATETIME_SENTINEL: &str = "0001-01-01T01:01:01Z";

/// The property types the graph database schema distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    String,
    Integer,
    Float,
    Boolean,
    Datetime,
}

/// A coerced property value, carrying the CSV rendering rules.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Never written; renders as an empty field.
    Empty,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// A validated `YYYY-MM-DDTHH:MM:SSZ` timestamp.
    Datetime(String),
}

impl PropertyValue {
    /// Coerce a JSON scalar to the declared property type.
    pub fn coerce(declared: PropertyType, value: &Value) -> Self {
        match declared {
            PropertyType::String => Self::Str(coerce_string(value)),
            PropertyType::Integer => Self::Int(coerce_integer(value)),
            PropertyType::Float => Self::Float(coerce_float(value)),
            PropertyType::Boolean => Self::Bool(coerce_boolean(value)),
            PropertyType::Datetime => Self::Datetime(coerce_datetime(value)),
        }
    }

    /// Render the value the way the CSV files expect it: booleans as
    /// `True`/`False`, floats with a decimal point, everything else
    /// verbatim.
    pub fn to_csv_field(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Str(s) => s.clone(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            }
            Self::Bool(b) => {
                if *b {
                    "True".to_string()
                } else {
                    "False".to_string()
                }
            }
            Self::Datetime(s) => s.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => "-".to_string(),
    }
}

fn coerce_integer(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(-1),
        Value::String(s) => s.trim().parse::<i64>().unwrap_or(-1),
        Value::Bool(b) => i64::from(*b),
        _ => -1,
    }
}

fn coerce_float(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(-1.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(-1.0),
        _ => -1.0,
    }
}

fn coerce_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.as_str(), "true" | "True" | "TRUE"),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

fn coerce_datetime(value: &Value) -> String {
    let Value::String(raw) = value else {
        return DATETIME_SENTINEL.to_string();
    };
    match NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT) {
        Ok(_) => raw.clone(),
        Err(_) => DATETIME_SENTINEL.to_string(),
    }
}

/// First day of the month of `timestamp`, rendered in the CSV datetime
/// layout. Used for the `date_month` property on month-bucket edges.
pub fn month_floor(timestamp: &str) -> String {
    match NaiveDateTime::parse_from_str(timestamp, DATETIME_FORMAT) {
        Ok(parsed) => {
            use chrono::Datelike;
            format!("{:04}-{:02}-01T00:00:00Z", parsed.year(), parsed.month())
        }
        Err(_) => DATETIME_SENTINEL.to_string(),
    }
}

/// Cypher projection of a single CSV column through the declared type,
/// mapping empty and null fields onto the sentinel defaults.
pub fn cypher_projection(name: &str, declared: PropertyType) -> String {
    match declared {
        PropertyType::Float => format!(
            "{name}: CASE row.{name} WHEN null THEN toFloat('-1') WHEN '' THEN toFloat('-1') ELSE toFloat(row.{name}) END"
        ),
        PropertyType::Datetime => format!(
            "{name}: CASE row.{name} WHEN null THEN datetime('{DATETIME_SENTINEL}') WHEN '' THEN datetime('{DATETIME_SENTINEL}') ELSE datetime(row.{name}) END"
        ),
        PropertyType::Boolean => format!(
            "{name}: CASE row.{name} WHEN 'True' THEN true WHEN 'False' THEN false ELSE false END"
        ),
        PropertyType::Integer => format!(
            "{name}: CASE row.{name} WHEN null THEN toInteger('-1') WHEN '' THEN toInteger('-1') ELSE toInteger(row.{name}) END"
        ),
        PropertyType::String => {
            format!("{name}: CASE row.{name} WHEN null THEN '' ELSE row.{name} END")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_coercion_total() {
        assert_eq!(
            PropertyValue::coerce(PropertyType::String, &json!("abc")),
            PropertyValue::Str("abc".to_string())
        );
        assert_eq!(
            PropertyValue::coerce(PropertyType::String, &json!(42)),
            PropertyValue::Str("42".to_string())
        );
        assert_eq!(
            PropertyValue::coerce(PropertyType::String, &json!(null)),
            PropertyValue::Str("-".to_string())
        );
        assert_eq!(
            PropertyValue::coerce(PropertyType::String, &json!([1])),
            PropertyValue::Str("-".to_string())
        );
    }

    #[test]
    fn integer_coercion_total() {
        assert_eq!(
            PropertyValue::coerce(PropertyType::Integer, &json!(7)),
            PropertyValue::Int(7)
        );
        assert_eq!(
            PropertyValue::coerce(PropertyType::Integer, &json!("12")),
            PropertyValue::Int(12)
        );
        assert_eq!(
            PropertyValue::coerce(PropertyType::Integer, &json!("nope")),
            PropertyValue::Int(-1)
        );
        assert_eq!(
            PropertyValue::coerce(PropertyType::Integer, &json!(null)),
            PropertyValue::Int(-1)
        );
    }

    #[test]
    fn float_coercion_total() {
        assert_eq!(
            PropertyValue::coerce(PropertyType::Float, &json!(2.5)),
            PropertyValue::Float(2.5)
        );
        assert_eq!(
            PropertyValue::coerce(PropertyType::Float, &json!({})),
            PropertyValue::Float(-1.0)
        );
    }

    #[test]
    fn boolean_coercion_total() {
        assert_eq!(
            PropertyValue::coerce(PropertyType::Boolean, &json!(true)),
            PropertyValue::Bool(true)
        );
        assert_eq!(
            PropertyValue::coerce(PropertyType::Boolean, &json!("True")),
            PropertyValue::Bool(true)
        );
        assert_eq!(
            PropertyValue::coerce(PropertyType::Boolean, &json!("yes")),
            PropertyValue::Bool(false)
        );
        assert_eq!(
            PropertyValue::coerce(PropertyType::Boolean, &json!(null)),
            PropertyValue::Bool(false)
        );
    }

    #[test]
    fn datetime_coercion_validates_layout() {
        assert_eq!(
            PropertyValue::coerce(PropertyType::Datetime, &json!("2023-04-05T06:07:08Z")),
            PropertyValue::Datetime("2023-04-05T06:07:08Z".to_string())
        );
        assert_eq!(
            PropertyValue::coerce(PropertyType::Datetime, &json!("05/04/2023")),
            PropertyValue::Datetime(DATETIME_SENTINEL.to_string())
        );
        assert_eq!(
            PropertyValue::coerce(PropertyType::Datetime, &json!(12)),
            PropertyValue::Datetime(DATETIME_SENTINEL.to_string())
        );
    }

    #[test]
    fn csv_rendering() {
        assert_eq!(PropertyValue::Bool(true).to_csv_field(), "True");
        assert_eq!(PropertyValue::Bool(false).to_csv_field(), "False");
        assert_eq!(PropertyValue::Float(-1.0).to_csv_field(), "-1.0");
        assert_eq!(PropertyValue::Empty.to_csv_field(), "");
    }

    #[test]
    fn month_floor_truncates_to_first_of_month() {
        assert_eq!(month_floor("2023-04-05T06:07:08Z"), "2023-04-01T00:00:00Z");
        assert_eq!(month_floor("garbage"), DATETIME_SENTINEL);
    }

    #[test]
    fn cypher_projection_per_type() {
        assert!(cypher_projection("year", PropertyType::Integer).contains("toInteger(row.year)"));
        assert!(cypher_projection("merge", PropertyType::Boolean).contains("WHEN 'True' THEN true"));
        assert!(
            cypher_projection("closedAt", PropertyType::Datetime).contains("datetime(row.closedAt)")
        );
    }
}
