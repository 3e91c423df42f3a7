//! Conversion of resolved JSON tokens into a column's declared type

use crate::config::ColumnType;
use crate::error::token_kind;
use crate::extract::row::Cell;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static ISO_DATETIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+-]\d{2}:?\d{2})?$").unwrap()
});

static ISO_DATE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// Convert `token` for a column of type `column_type`
///
/// JSON `null` is accepted by every type. On failure the error describes
/// the offending token.
pub fn coerce(token: &Value, column_type: ColumnType) -> Result<Cell, String> {
    if token.is_null() {
        return Ok(Cell::Null);
    }

    let cell = match column_type {
        ColumnType::Json => Some(Cell::Json(token.clone())),
        ColumnType::Text => Some(Cell::Text(match token {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })),
        ColumnType::Bool => to_bool(token).map(Cell::Bool),
        ColumnType::Int => to_int(token).map(Cell::Int),
        ColumnType::Float => to_float(token).map(Cell::Float),
        ColumnType::DateTime => match token {
            Value::String(s) if is_iso_datetime(s) => Some(Cell::Text(s.clone())),
            _ => None,
        },
    };

    cell.ok_or_else(|| describe(token))
}

fn to_bool(token: &Value) -> Option<bool> {
    match token {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn to_int(token: &Value) -> Option<i64> {
    match token {
        Value::Number(n) => n.as_i64().or_else(|| {
            let f = n.as_f64()?;
            let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
            (f.fract() == 0.0 && in_range).then_some(f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_float(token: &Value) -> Option<f64> {
    match token {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn is_iso_datetime(s: &str) -> bool {
    ISO_DATE_REGEX.is_match(s) || ISO_DATETIME_REGEX.is_match(s)
}

fn describe(token: &Value) -> String {
    match token {
        Value::Object(_) | Value::Array(_) => token_kind(token).to_string(),
        scalar => format!("{} ({})", token_kind(scalar), scalar),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_fits_every_type() {
        for ty in [
            ColumnType::Bool,
            ColumnType::Int,
            ColumnType::Float,
            ColumnType::Text,
            ColumnType::DateTime,
            ColumnType::Json,
        ] {
            assert_eq!(coerce(&Value::Null, ty), Ok(Cell::Null));
        }
    }

    #[test]
    fn test_int_conversions() {
        assert_eq!(coerce(&json!(42), ColumnType::Int), Ok(Cell::Int(42)));
        assert_eq!(coerce(&json!(3.0), ColumnType::Int), Ok(Cell::Int(3)));
        assert_eq!(coerce(&json!(" 17 "), ColumnType::Int), Ok(Cell::Int(17)));
        assert!(coerce(&json!(3.5), ColumnType::Int).is_err());
        assert!(coerce(&json!(u64::MAX), ColumnType::Int).is_err());
        assert!(coerce(&json!(true), ColumnType::Int).is_err());
    }

    #[test]
    fn test_float_conversions() {
        assert_eq!(coerce(&json!(1), ColumnType::Float), Ok(Cell::Float(1.0)));
        assert_eq!(coerce(&json!("2.5"), ColumnType::Float), Ok(Cell::Float(2.5)));
        assert!(coerce(&json!("NaN"), ColumnType::Float).is_err());
        assert!(coerce(&json!([1.0]), ColumnType::Float).is_err());
    }

    #[test]
    fn test_bool_conversions() {
        assert_eq!(coerce(&json!(false), ColumnType::Bool), Ok(Cell::Bool(false)));
        assert_eq!(coerce(&json!("TRUE"), ColumnType::Bool), Ok(Cell::Bool(true)));
        assert!(coerce(&json!(1), ColumnType::Bool).is_err());
    }

    #[test]
    fn test_text_stringifies_everything() {
        assert_eq!(coerce(&json!("a"), ColumnType::Text), Ok(Cell::Text("a".into())));
        assert_eq!(coerce(&json!(12), ColumnType::Text), Ok(Cell::Text("12".into())));
        assert_eq!(
            coerce(&json!({"k": [1, 2]}), ColumnType::Text),
            Ok(Cell::Text(r#"{"k":[1,2]}"#.into()))
        );
    }

    #[test]
    fn test_datetime_requires_iso_format() {
        assert_eq!(
            coerce(&json!("2024-03-01"), ColumnType::DateTime),
            Ok(Cell::Text("2024-03-01".into()))
        );
        assert!(coerce(&json!("2024-03-01T10:15:00Z"), ColumnType::DateTime).is_ok());
        assert!(coerce(&json!("2024-03-01T10:15:00.123+02:00"), ColumnType::DateTime).is_ok());
        assert!(coerce(&json!("March 1st"), ColumnType::DateTime).is_err());
        assert!(coerce(&json!(20240301), ColumnType::DateTime).is_err());
    }

    #[test]
    fn test_json_passes_through() {
        let token = json!({"nested": {"deep": true}});
        assert_eq!(coerce(&token, ColumnType::Json), Ok(Cell::Json(token.clone())));
    }

    #[test]
    fn test_failure_describes_token() {
        assert_eq!(
            coerce(&json!("abc"), ColumnType::Int),
            Err(r#"a string ("abc")"#.to_string())
        );
        assert_eq!(coerce(&json!({}), ColumnType::Int), Err("an object".to_string()));
    }
}
