//! Flat rows as exported by the relational side.
//!
//! A [`Row`] is a JSON object keyed by column name. Every accessor takes the
//! list of column names a field may appear under (query alias first, English
//! name after) and coerces leniently, since JSON dumps carry native types
//! while CSV dumps carry text for everything.

use serde_json::{Map, Number, Value};

use super::date;
use super::dedupe::exact_i64;
use crate::error::{ValidationError, ValidationResult};
use crate::models::TaggedDate;
use crate::parser::parse_pg_array;

/// Column names a single field may be exported under.
pub type Columns = &'static [&'static str];

/// One flat row of a join.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(Map<String, Value>);

impl Row {
    pub fn new(columns: Map<String, Value>) -> Self {
        Self(columns)
    }

    /// Wrap a JSON value, if it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn columns(&self) -> &Map<String, Value> {
        &self.0
    }

    /// First non-null value under any of `names`.
    pub fn get(&self, names: Columns) -> Option<&Value> {
        names
            .iter()
            .filter_map(|name| self.0.get(*name))
            .find(|v| !v.is_null())
    }

    pub fn text(&self, names: Columns) -> ValidationResult<Option<String>> {
        match self.get(names) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(other) => Err(ValidationError::invalid_value(
                names[0],
                format!("expected text, got {}", other),
            )),
        }
    }

    pub fn int(&self, names: Columns) -> ValidationResult<Option<i64>> {
        let Some(value) = self.get(names) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Number(n) => exact_i64(n),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        parsed
            .map(Some)
            .ok_or_else(|| ValidationError::non_numeric(names[0], value))
    }

    pub fn require_int(&self, names: Columns) -> ValidationResult<i64> {
        self.int(names)?
            .ok_or_else(|| ValidationError::MissingField(names[0].to_string()))
    }

    /// Integer or decimal, kept as given.
    pub fn number(&self, names: Columns) -> ValidationResult<Option<Number>> {
        let Some(value) = self.get(names) else {
            return Ok(None);
        };
        match value {
            Value::Number(n) => Ok(Some(n.clone())),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .map(Number::from)
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(Number::from_f64))
                    .map(Some)
                    .ok_or_else(|| ValidationError::non_numeric(names[0], s))
            }
            other => Err(ValidationError::non_numeric(names[0], other)),
        }
    }

    pub fn boolean(&self, names: Columns) -> ValidationResult<Option<bool>> {
        let Some(value) = self.get(names) else {
            return Ok(None);
        };
        match value {
            Value::Bool(b) => Ok(Some(*b)),
            Value::Number(n) if n.as_i64() == Some(1) => Ok(Some(true)),
            Value::Number(n) if n.as_i64() == Some(0) => Ok(Some(false)),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "t" | "1" | "yes" | "y" | "sim" | "s" => Ok(Some(true)),
                "false" | "f" | "0" | "no" | "n" | "nao" | "não" => Ok(Some(false)),
                _ => Err(ValidationError::invalid_value(
                    names[0],
                    format!("expected a boolean, got '{}'", s),
                )),
            },
            other => Err(ValidationError::invalid_value(
                names[0],
                format!("expected a boolean, got {}", other),
            )),
        }
    }

    pub fn date(&self, names: Columns) -> ValidationResult<Option<TaggedDate>> {
        match self.get(names) {
            None => Ok(None),
            Some(value) => date::tag(names[0], value),
        }
    }

    /// Elements of an aggregate column.
    ///
    /// Accepts a JSON array, a PostgreSQL array literal, or a lone scalar
    /// (one row per child). Absent columns yield an empty list.
    pub fn list(&self, names: Columns) -> Vec<Value> {
        match self.get(names) {
            None => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(Value::String(s)) => {
                parse_pg_array(s).unwrap_or_else(|| vec![Value::String(s.clone())])
            }
            Some(other) => vec![other.clone()],
        }
    }
}

impl From<Map<String, Value>> for Row {
    fn from(columns: Map<String, Value>) -> Self {
        Self(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        Row::from_value(value).unwrap()
    }

    #[test]
    fn test_get_uses_first_non_null_alias() {
        let r = row(json!({ "_id": null, "id": 4 }));
        assert_eq!(r.get(&["_id", "id"]), Some(&json!(4)));
        assert_eq!(r.get(&["missing"]), None);
    }

    #[test]
    fn test_int_coercion() {
        let r = row(json!({ "a": 5, "b": "12", "c": "x", "d": 2.0 }));
        assert_eq!(r.int(&["a"]).unwrap(), Some(5));
        assert_eq!(r.int(&["b"]).unwrap(), Some(12));
        assert_eq!(r.int(&["d"]).unwrap(), Some(2));
        assert!(r.int(&["c"]).is_err());
        assert_eq!(
            r.require_int(&["z"]).unwrap_err(),
            ValidationError::MissingField("z".into())
        );
    }

    #[test]
    fn test_int_rejects_floats_outside_i64() {
        let r = row(json!({ "_id": 1e20, "other": 2e20, "b": -1e30 }));
        assert!(matches!(
            r.int(&["_id"]).unwrap_err(),
            ValidationError::NonNumeric { .. }
        ));
        assert!(r.require_int(&["other"]).is_err());
        assert!(r.int(&["b"]).is_err());
    }

    #[test]
    fn test_boolean_coercion() {
        let r = row(json!({ "a": "t", "b": false, "c": "maybe", "d": 1 }));
        assert_eq!(r.boolean(&["a"]).unwrap(), Some(true));
        assert_eq!(r.boolean(&["b"]).unwrap(), Some(false));
        assert_eq!(r.boolean(&["d"]).unwrap(), Some(true));
        assert!(r.boolean(&["c"]).is_err());
    }

    #[test]
    fn test_number_keeps_decimals() {
        let r = row(json!({ "a": "4.5", "b": 0, "c": "five" }));
        assert_eq!(r.number(&["a"]).unwrap(), Number::from_f64(4.5));
        assert_eq!(r.number(&["b"]).unwrap(), Some(Number::from(0)));
        assert!(r.number(&["c"]).is_err());
    }

    #[test]
    fn test_list_shapes() {
        let r = row(json!({
            "json": ["Rock", null],
            "literal": "{Rock,\"Hard Rock\",NULL}",
            "scalar": "Jazz",
            "null": null
        }));
        assert_eq!(r.list(&["json"]), vec![json!("Rock"), Value::Null]);
        assert_eq!(
            r.list(&["literal"]),
            vec![json!("Rock"), json!("Hard Rock"), Value::Null]
        );
        assert_eq!(r.list(&["scalar"]), vec![json!("Jazz")]);
        assert!(r.list(&["null"]).is_empty());
    }
}
