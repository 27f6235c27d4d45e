//! Set-like cleanup of multi-valued aggregates.
//!
//! `ARRAY_AGG` over a `LEFT JOIN` yields `[NULL]` when nothing matched and
//! repeats values when two joins fan out together. The functions here strip
//! the nulls and keep the first occurrence of every value.

use serde_json::{Number, Value};
use std::collections::HashSet;
use std::hash::Hash;

use crate::error::{ValidationError, ValidationResult};

/// Drop `None`s and repeated values, keeping first-occurrence order.
pub fn dedupe<T, I>(values: I) -> Vec<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = Option<T>>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .flatten()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

/// Append the values of `extra` that `target` does not hold yet.
pub fn extend_unique<T: PartialEq>(target: &mut Vec<T>, extra: impl IntoIterator<Item = T>) {
    for value in extra {
        if !target.contains(&value) {
            target.push(value);
        }
    }
}

/// Deduplicate a list of names. Numbers are kept as their text form.
pub fn dedupe_names(field: &str, values: &[Value]) -> ValidationResult<Vec<String>> {
    let names = values
        .iter()
        .map(|v| match v {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s.clone())),
            Value::Number(n) => Ok(Some(n.to_string())),
            other => Err(ValidationError::invalid_value(
                field,
                format!("expected a name, got {}", other),
            )),
        })
        .collect::<ValidationResult<Vec<_>>>()?;
    Ok(dedupe(names))
}

/// Deduplicate a list of numeric ids, coercing numeric strings.
pub fn dedupe_ids(field: &str, values: &[Value]) -> ValidationResult<Vec<i64>> {
    let ids = values
        .iter()
        .map(|v| coerce_id(field, v))
        .collect::<ValidationResult<Vec<_>>>()?;
    Ok(dedupe(ids))
}

/// Integer value of a JSON number, if it has one.
///
/// Integral floats count; fractions and floats outside the `i64` range do not.
pub fn exact_i64(n: &Number) -> Option<i64> {
    n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(f))
            .map(|f| f as i64)
    })
}

fn coerce_id(field: &str, value: &Value) -> ValidationResult<Option<i64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => exact_i64(n)
            .map(Some)
            .ok_or_else(|| ValidationError::non_numeric(field, n)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ValidationError::non_numeric(field, s)),
        other => Err(ValidationError::non_numeric(field, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dedupe_keeps_first_occurrence_order() {
        let values = vec![Some("Rock"), Some("Rock"), None, Some("Jazz"), Some("Rock")];
        assert_eq!(dedupe(values), vec!["Rock", "Jazz"]);
    }

    #[test]
    fn test_dedupe_of_nulls_is_empty_not_missing() {
        let values: Vec<Option<i64>> = vec![None, None];
        assert!(dedupe(values).is_empty());
    }

    #[test]
    fn test_dedupe_properties_over_mixed_input() {
        let input = vec![
            Some(3), None, Some(1), Some(3), Some(2), None, Some(1), Some(4), Some(2),
        ];
        let out = dedupe(input.clone());

        let unique: HashSet<_> = out.iter().collect();
        assert_eq!(unique.len(), out.len());

        // first-occurrence order
        let mut expected = Vec::new();
        for v in input.into_iter().flatten() {
            if !expected.contains(&v) {
                expected.push(v);
            }
        }
        assert_eq!(out, expected);
    }

    #[test]
    fn test_dedupe_names() {
        let values = [json!("Rock"), json!(null), json!("Jazz"), json!("Rock"), json!(1984)];
        assert_eq!(
            dedupe_names("generos", &values).unwrap(),
            vec!["Rock", "Jazz", "1984"]
        );
        assert!(dedupe_names("generos", &[json!({ "nome": "Rock" })]).is_err());
    }

    #[test]
    fn test_dedupe_ids_coerces_numbers() {
        let values = [json!(1), json!("2"), json!(null), json!(" 1 "), json!(3.0)];
        assert_eq!(dedupe_ids("discos_id", &values).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_dedupe_ids_rejects_non_numeric() {
        let err = dedupe_ids("discos_id", &[json!(1), json!("abc")]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::NonNumeric {
                field: "discos_id".into(),
                value: "abc".into(),
            }
        );
        assert!(dedupe_ids("discos_id", &[json!(1.5)]).is_err());
        assert!(dedupe_ids("discos_id", &[json!(true)]).is_err());
    }

    #[test]
    fn test_dedupe_ids_rejects_out_of_range_floats() {
        let err = dedupe_ids("discos_id", &[json!(1e20)]).unwrap_err();
        assert!(matches!(err, ValidationError::NonNumeric { .. }));
        assert!(dedupe_ids("discos_id", &[json!(-1e30)]).is_err());
        assert!(dedupe_ids("discos_id", &[json!(9_223_372_036_854_775_808.0_f64)]).is_err());
        assert_eq!(dedupe_ids("discos_id", &[json!(i64::MAX)]).unwrap(), vec![i64::MAX]);
    }

    #[test]
    fn test_exact_i64() {
        assert_eq!(exact_i64(&Number::from(7)), Some(7));
        assert_eq!(Number::from_f64(4.0).as_ref().and_then(exact_i64), Some(4));
        assert_eq!(Number::from_f64(4.5).as_ref().and_then(exact_i64), None);
        assert_eq!(Number::from_f64(2e20).as_ref().and_then(exact_i64), None);
    }

    #[test]
    fn test_extend_unique() {
        let mut target = vec![1, 2];
        extend_unique(&mut target, vec![2, 3, 1, 4]);
        assert_eq!(target, vec![1, 2, 3, 4]);
    }
}
