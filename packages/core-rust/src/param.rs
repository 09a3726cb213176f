//! Typed statement parameters and their wire classification.
//!
//! The store dialect understands exactly three bind types, tagged on the
//! wire as `s` (string), `d` (floating point), and `i` (integer). Callers
//! hand the dispatcher loosely-typed [`serde_json::Value`]s; classification
//! into [`Param`] happens before a request is handed to a worker, so that
//! an unsupported value kind is rejected on the control thread instead of
//! deep inside a worker batch.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::OperationError;

// ---------------------------------------------------------------------------
// Param
// ---------------------------------------------------------------------------

/// One bind parameter, already narrowed to a supported store type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Param {
    /// UTF-8 string, wire tag `s`.
    Str(String),
    /// 64-bit IEEE 754 float, wire tag `d`.
    Float(f64),
    /// Signed 64-bit integer, wire tag `i`.
    Int(i64),
}

impl Param {
    /// The single-character wire tag for this parameter.
    #[must_use]
    pub fn tag(&self) -> char {
        match self {
            Param::Str(_) => 's',
            Param::Float(_) => 'd',
            Param::Int(_) => 'i',
        }
    }

    /// Classify a loose JSON value into a supported parameter.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::UnsupportedParameterType`] for null, bool,
    /// array, and object values; only strings and numbers are bindable.
    pub fn classify(value: serde_json::Value) -> Result<Self, OperationError> {
        match value {
            serde_json::Value::String(s) => Ok(Param::Str(s)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Param::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Param::Float(f))
                } else {
                    // u64 above i64::MAX with no f64 representation
                    Err(OperationError::UnsupportedParameterType("number"))
                }
            }
            serde_json::Value::Null => Err(OperationError::UnsupportedParameterType("null")),
            serde_json::Value::Bool(_) => Err(OperationError::UnsupportedParameterType("bool")),
            serde_json::Value::Array(_) => Err(OperationError::UnsupportedParameterType("array")),
            serde_json::Value::Object(_) => Err(OperationError::UnsupportedParameterType("object")),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Str(s) => f.write_str(s),
            Param::Float(v) => write!(f, "{v}"),
            Param::Int(v) => write!(f, "{v}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Classify a whole parameter list, failing on the first unsupported value.
///
/// # Errors
///
/// Propagates the first [`OperationError::UnsupportedParameterType`].
pub fn classify_params(values: Vec<serde_json::Value>) -> Result<Vec<Param>, OperationError> {
    values.into_iter().map(Param::classify).collect()
}

/// The concatenated wire tags for a parameter list, e.g. `"sdi"`.
#[must_use]
pub fn type_tags(params: &[Param]) -> String {
    params.iter().map(Param::tag).collect()
}

/// Render a parameter list as `index:value;` pairs for diagnostics.
#[must_use]
pub fn format_params(params: &[Param]) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    for (index, param) in params.iter().enumerate() {
        // Writing to a String cannot fail.
        let _ = write!(out, "{index}:{param};");
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn classify_string_tags_s() {
        let param = Param::classify(json!("a")).unwrap();
        assert_eq!(param, Param::Str("a".to_string()));
        assert_eq!(param.tag(), 's');
    }

    #[test]
    fn classify_float_tags_d() {
        let param = Param::classify(json!(3.14)).unwrap();
        assert_eq!(param, Param::Float(3.14));
        assert_eq!(param.tag(), 'd');
    }

    #[test]
    fn classify_integer_tags_i() {
        let param = Param::classify(json!(7)).unwrap();
        assert_eq!(param, Param::Int(7));
        assert_eq!(param.tag(), 'i');
    }

    #[test]
    fn classify_rejects_other_kinds() {
        for (value, kind) in [
            (json!(null), "null"),
            (json!(true), "bool"),
            (json!([1, 2]), "array"),
            (json!({"k": 1}), "object"),
        ] {
            match Param::classify(value) {
                Err(OperationError::UnsupportedParameterType(got)) => assert_eq!(got, kind),
                other => panic!("expected unsupported parameter type, got {other:?}"),
            }
        }
    }

    #[test]
    fn classify_params_fails_on_first_bad_value() {
        let err = classify_params(vec![json!("ok"), json!(false), json!(1)]).unwrap_err();
        assert!(matches!(
            err,
            OperationError::UnsupportedParameterType("bool")
        ));
    }

    #[test]
    fn type_tags_concatenate_in_order() {
        let params = vec![
            Param::Str("v".to_string()),
            Param::Float(1.5),
            Param::Int(9),
        ];
        assert_eq!(type_tags(&params), "sdi");
    }

    #[test]
    fn format_params_lists_index_value_pairs() {
        let params = vec![Param::Str("a".to_string()), Param::Int(42)];
        assert_eq!(format_params(&params), "0:a;1:42;");
    }
}
