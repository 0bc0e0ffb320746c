//! Field-path aware accessors over `serde_json::Value`.
//!
//! Both the request validator and the oracle response validator walk untyped JSON
//! with these helpers so that every failure names the exact field that broke.

use serde_json::{Map, Value};

use crate::error::FieldError;
use crate::util::trimmed_len;

pub type Object = Map<String, Value>;

pub fn child_path(parent: &str, key: &str) -> String {
  if parent.is_empty() { key.to_string() } else { format!("{parent}.{key}") }
}

pub fn index_path(parent: &str, idx: usize) -> String {
  format!("{parent}[{idx}]")
}

fn type_name(v: &Value) -> &'static str {
  match v {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

fn wrong_type(path: &str, expected: &str, v: &Value) -> FieldError {
  FieldError::new(path, format!("expected {expected}, received {}", type_name(v)))
}

pub fn as_object<'a>(v: &'a Value, path: &str) -> Result<&'a Object, FieldError> {
  v.as_object().ok_or_else(|| wrong_type(path, "object", v))
}

/// Required member of an object. Explicit `null` counts as missing.
pub fn required<'a>(obj: &'a Object, parent: &str, key: &str) -> Result<&'a Value, FieldError> {
  match obj.get(key) {
    Some(Value::Null) | None => Err(FieldError::new(child_path(parent, key), "is required")),
    Some(v) => Ok(v),
  }
}

pub fn as_str<'a>(v: &'a Value, path: &str) -> Result<&'a str, FieldError> {
  v.as_str().ok_or_else(|| wrong_type(path, "string", v))
}

pub fn as_bool(v: &Value, path: &str) -> Result<bool, FieldError> {
  v.as_bool().ok_or_else(|| wrong_type(path, "boolean", v))
}

pub fn as_array<'a>(v: &'a Value, path: &str) -> Result<&'a Vec<Value>, FieldError> {
  v.as_array().ok_or_else(|| wrong_type(path, "array", v))
}

/// Integral JSON number. `2.5` and `"2"` are rejected; values beyond i64 saturate.
pub fn as_int(v: &Value, path: &str) -> Result<i64, FieldError> {
  match v {
    Value::Number(n) if n.is_i64() => n.as_i64().ok_or_else(|| wrong_type(path, "integer", v)),
    Value::Number(n) if n.is_u64() => Ok(i64::MAX),
    _ => Err(wrong_type(path, "integer", v)),
  }
}

pub fn int_in_range(v: &Value, path: &str, min: i64, max: i64) -> Result<u32, FieldError> {
  let n = as_int(v, path)?;
  if n < min {
    return Err(FieldError::new(path, format!("must be at least {min}")));
  }
  if n > max {
    return Err(FieldError::new(path, format!("must be at most {max}")));
  }
  u32::try_from(n).map_err(|_| FieldError::new(path, "is out of range"))
}

pub fn positive_int(v: &Value, path: &str) -> Result<u32, FieldError> {
  int_in_range(v, path, 1, i64::from(u32::MAX))
}

/// Trimmed string of at least `min_len` characters.
pub fn text(v: &Value, path: &str, min_len: usize) -> Result<String, FieldError> {
  let s = as_str(v, path)?;
  if trimmed_len(s) < min_len {
    let msg = if min_len <= 1 {
      "must not be empty".to_string()
    } else {
      format!("must be at least {min_len} characters")
    };
    return Err(FieldError::new(path, msg));
  }
  Ok(s.trim().to_string())
}
