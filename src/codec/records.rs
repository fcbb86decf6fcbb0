//! Fixed-shape JSON record arrays. Decoding goes through [`Fields`] so that
//! string, number and bool values are coerced to the declared field type and
//! failures name the record index and field path.

use std::ops::RangeInclusive;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::codec::strip_bom;
use crate::error::{DecodeError, ManagerError, Result};

/// One entry of a JSON record array.
pub trait Record: Sized + Serialize {
    fn from_fields(fields: &Fields<'_>) -> std::result::Result<Self, DecodeError>;

    /// Range checks applied when the presentation layer hands back edited rows.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Typed access to the fields of one JSON object.
pub struct Fields<'a> {
    index: usize,
    prefix: String,
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    pub fn new(index: usize, map: &'a Map<String, Value>) -> Self {
        Self {
            index,
            prefix: String::new(),
            map,
        }
    }

    fn path(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    fn invalid(&self, name: &str, expected: &'static str) -> DecodeError {
        DecodeError::InvalidField {
            index: self.index,
            field: self.path(name),
            expected,
        }
    }

    fn value(&self, name: &str) -> std::result::Result<&'a Value, DecodeError> {
        match self.map.get(name) {
            Some(Value::Null) | None => Err(DecodeError::MissingField {
                index: self.index,
                field: self.path(name),
            }),
            Some(v) => Ok(v),
        }
    }

    pub fn int(&self, name: &str) -> std::result::Result<i64, DecodeError> {
        let parsed = match self.value(name)? {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| self.invalid(name, "integer"))
    }

    pub fn float(&self, name: &str) -> std::result::Result<f64, DecodeError> {
        let parsed = match self.value(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        };
        parsed.ok_or_else(|| self.invalid(name, "number"))
    }

    pub fn bool(&self, name: &str) -> std::result::Result<bool, DecodeError> {
        let parsed = match self.value(name)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            Value::Number(n) => match n.as_i64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            _ => None,
        };
        parsed.ok_or_else(|| self.invalid(name, "boolean"))
    }

    pub fn string(&self, name: &str) -> std::result::Result<String, DecodeError> {
        match self.value(name)? {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            _ => Err(self.invalid(name, "string")),
        }
    }

    /// Fields of a nested object.
    pub fn object(&self, name: &str) -> std::result::Result<Fields<'a>, DecodeError> {
        let map = self
            .value(name)?
            .as_object()
            .ok_or_else(|| self.invalid(name, "object"))?;
        Ok(Fields {
            index: self.index,
            prefix: format!("{}{}.", self.prefix, name),
            map,
        })
    }

    /// A nested array of records, reported as `name[i].field` on failure.
    pub fn list<T: Record>(&self, name: &str) -> std::result::Result<Vec<T>, DecodeError> {
        let items = self
            .value(name)?
            .as_array()
            .ok_or_else(|| self.invalid(name, "array"))?;

        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let element = format!("{name}[{i}]");
                let map = item
                    .as_object()
                    .ok_or_else(|| self.invalid(&element, "object"))?;
                T::from_fields(&Fields {
                    index: self.index,
                    prefix: format!("{}{}.", self.prefix, element),
                    map,
                })
            })
            .collect()
    }
}

pub fn decode_records<T: Record>(bytes: &[u8]) -> std::result::Result<Vec<T>, DecodeError> {
    let value: Value = serde_json::from_slice(strip_bom(bytes))
        .map_err(|e| DecodeError::Json(e.to_string()))?;
    decode_value(&value)
}

pub fn decode_value<T: Record>(value: &Value) -> std::result::Result<Vec<T>, DecodeError> {
    let items = value.as_array().ok_or(DecodeError::NotAnArray)?;
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let map = item
                .as_object()
                .ok_or(DecodeError::NotAnObject { index })?;
            T::from_fields(&Fields::new(index, map))
        })
        .collect()
}

/// Pretty JSON with two-space indentation, records in the given order.
pub fn encode_records<T: Record>(records: &[T]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(records)?)
}

pub fn validate_records<T: Record>(records: &[T]) -> Result<()> {
    for (index, record) in records.iter().enumerate() {
        record
            .validate()
            .map_err(|e| prefix_validation(&format!("record {index} "), e))?;
    }
    Ok(())
}

/// Qualify the field named by a validation error, e.g. with its record index.
pub(crate) fn prefix_validation(prefix: &str, err: ManagerError) -> ManagerError {
    match err {
        ManagerError::Validation { field, message } => ManagerError::Validation {
            field: format!("{prefix}{field}"),
            message,
        },
        other => other,
    }
}

pub(crate) fn ensure_range(field: &str, value: i64, range: RangeInclusive<i64>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ManagerError::validation(
            field,
            format!(
                "{value} is outside {}..={}",
                range.start(),
                range.end()
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize)]
    struct Row {
        id: i64,
        ratio: f64,
        on: bool,
        label: String,
        parts: Vec<Part>,
    }

    #[derive(Debug, PartialEq, Serialize)]
    struct Part {
        qty: i64,
    }

    impl Record for Part {
        fn from_fields(f: &Fields<'_>) -> std::result::Result<Self, DecodeError> {
            Ok(Part { qty: f.int("qty")? })
        }

        fn validate(&self) -> Result<()> {
            ensure_range("qty", self.qty, 0..=10)
        }
    }

    impl Record for Row {
        fn from_fields(f: &Fields<'_>) -> std::result::Result<Self, DecodeError> {
            Ok(Row {
                id: f.int("id")?,
                ratio: f.float("ratio")?,
                on: f.bool("on")?,
                label: f.string("label")?,
                parts: f.list("parts")?,
            })
        }
    }

    #[test]
    fn test_coercions() {
        let json = br#"[{"id": "12", "ratio": "1.5", "on": "True", "label": 7, "parts": [{"qty": 3.0}]}]"#;
        let rows: Vec<Row> = decode_records(json).unwrap();
        assert_eq!(
            rows,
            vec![Row {
                id: 12,
                ratio: 1.5,
                on: true,
                label: "7".into(),
                parts: vec![Part { qty: 3 }],
            }]
        );
    }

    #[test]
    fn test_missing_field_names_index_and_field() {
        let json = br#"[
            {"id": 1, "ratio": 1, "on": true, "label": "a", "parts": []},
            {"id": 2, "ratio": 1, "on": true, "parts": []}
        ]"#;
        let err = decode_records::<Row>(json).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MissingField {
                index: 1,
                field: "label".into()
            }
        );
    }

    #[test]
    fn test_nested_error_path() {
        let json = br#"[{"id": 1, "ratio": 1, "on": true, "label": "a", "parts": [{"qty": 1}, {"qty": "many"}]}]"#;
        let err = decode_records::<Row>(json).unwrap_err();
        assert_eq!(
            err,
            DecodeError::InvalidField {
                index: 0,
                field: "parts[1].qty".into(),
                expected: "integer"
            }
        );
    }

    #[test]
    fn test_non_integral_float_is_not_an_int() {
        let json = br#"[{"id": 1.5, "ratio": 1, "on": true, "label": "a", "parts": []}]"#;
        assert!(matches!(
            decode_records::<Row>(json),
            Err(DecodeError::InvalidField { expected: "integer", .. })
        ));
    }

    #[test]
    fn test_shape_errors() {
        assert_eq!(decode_records::<Row>(b"{}"), Err(DecodeError::NotAnArray));
        assert_eq!(
            decode_records::<Row>(b"[1]"),
            Err(DecodeError::NotAnObject { index: 0 })
        );
        assert!(matches!(
            decode_records::<Row>(b"[{"),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn test_encode_uses_two_space_indent() {
        let bytes = encode_records(&[Part { qty: 1 }]).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "[\n  {\n    \"qty\": 1\n  }\n]"
        );
    }

    #[test]
    fn test_validate_records_prefixes_index() {
        let err = validate_records(&[Part { qty: 1 }, Part { qty: 11 }]).unwrap_err();
        match err {
            ManagerError::Validation { field, .. } => assert_eq!(field, "record 1 qty"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
