//! Structural validation of step output before it is deserialized.
//!
//! A `Shape` lists the top-level keys a step must (or may) return and the JSON
//! kind of each. A field may have several accepted names; `conform` rewrites
//! whichever one is present to the first (canonical) name.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    String,
    Number,
    Bool,
    Array,
    Object,
}

impl Kind {
    pub fn name(&self) -> &'static str {
        match self {
            Kind::String => "string",
            Kind::Number => "number",
            Kind::Bool   => "bool",
            Kind::Array  => "array",
            Kind::Object => "object",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            Kind::String => value.is_string(),
            Kind::Number => value.is_number(),
            Kind::Bool   => value.is_boolean(),
            Kind::Array  => value.is_array(),
            Kind::Object => value.is_object(),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null      => "null",
        Value::Bool(_)   => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_)  => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
    #[error("missing required key `{0}`")]
    MissingKey(&'static str),
    #[error("key `{key}` should be {expected}, found {found}")]
    WrongKind {
        key: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

#[derive(Debug, Clone)]
struct Field {
    names: Vec<&'static str>,
    kind: Kind,
    required: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Shape {
    fields: Vec<Field>,
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(self, key: &'static str, kind: Kind) -> Self {
        self.field(vec![key], kind, true)
    }

    pub fn optional(self, key: &'static str, kind: Kind) -> Self {
        self.field(vec![key], kind, false)
    }

    /// Required field that may arrive under any of `names`; the first is canonical.
    pub fn required_any(self, names: &[&'static str], kind: Kind) -> Self {
        self.field(names.to_vec(), kind, true)
    }

    fn field(mut self, names: Vec<&'static str>, kind: Kind, required: bool) -> Self {
        debug_assert!(!names.is_empty());
        self.fields.push(Field { names, kind, required });
        self
    }

    /// Validates `value` and returns it with every aliased key renamed to its
    /// canonical name. Optional keys that are null are removed. Numbers sent as numeric strings are accepted for
    /// `Kind::Number` fields and converted.
    pub fn conform(&self, value: Value) -> Result<Value, ShapeError> {
        let mut obj = match value {
            Value::Object(map) => map,
            other => return Err(ShapeError::NotAnObject(kind_of(&other))),
        };

        for field in &self.fields {
            let canonical = field.names[0];
            let found = field
                .names
                .iter()
                .find(|name| obj.get(**name).is_some_and(|v| !v.is_null()))
                .copied();

            let Some(name) = found else {
                if field.required {
                    return Err(ShapeError::MissingKey(canonical));
                }
                // explicit nulls read as absent
                for name in &field.names {
                    obj.remove(*name);
                }
                continue;
            };

            let mut v = obj.remove(name).unwrap_or(Value::Null);
            if field.kind == Kind::Number {
                v = coerce_number(v);
            }
            if !field.kind.matches(&v) {
                return Err(ShapeError::WrongKind {
                    key: canonical,
                    expected: field.kind.name(),
                    found: kind_of(&v),
                });
            }
            obj.insert(canonical.to_string(), v);
        }

        Ok(Value::Object(obj))
    }
}

fn coerce_number(v: Value) -> Value {
    if let Value::String(s) = &v {
        if let Ok(n) = s.trim().trim_end_matches('%').trim().parse::<f64>() {
            if let Some(num) = serde_json::Number::from_f64(n) {
                return Value::Number(num);
            }
        }
    }
    v
}
