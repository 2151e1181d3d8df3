//! Runtime values checked by the validation engine.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::temporal;

// ──────────────────────────────────────────────
// Runtime values
// ──────────────────────────────────────────────

/// A JSON-like runtime value, extended with native date, datetime, uuid,
/// and decimal scalars plus pre-rendered output scalars.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    Uuid(Uuid),
    Date(Date),
    Datetime(OffsetDateTime),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Rendered(RenderedScalar),
}

impl Value {
    /// Runtime type name used in validation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Uuid(_) => "uuid",
            Value::Date(_) => "date",
            Value::Datetime(_) => "datetime",
            Value::Array(_) => "array",
            Value::Map(_) => "dict",
            Value::Rendered(r) => r.kind.type_name(),
        }
    }

    /// Short literal rendering for error messages.
    pub fn repr(&self) -> String {
        match self {
            Value::Null => "null".to_owned(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => format!("{:?}", f),
            Value::Decimal(d) => d.to_string(),
            Value::String(s) => quote(s),
            Value::Uuid(u) => quote(&u.hyphenated().to_string()),
            Value::Date(d) => quote(&temporal::format_date(*d)),
            Value::Datetime(dt) => quote(&temporal::format_datetime(*dt)),
            Value::Array(items) => {
                let parts: Vec<String> = items.iter().map(Value::repr).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Map(map) => {
                let parts: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{}: {}", quote(k), v.repr()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            Value::Rendered(r) if r.kind == RenderedKind::Float => r.text.clone(),
            Value::Rendered(r) => quote(&r.text),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Numeric view for value constraints.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            Value::Decimal(d) => d.to_f64(),
            Value::Rendered(r) => r.number,
            _ => None,
        }
    }

    /// Length for length constraints: characters, elements, or entries.
    pub fn length(&self) -> Option<usize> {
        match self {
            Value::String(s) => Some(s.chars().count()),
            Value::Array(items) => Some(items.len()),
            Value::Map(map) => Some(map.len()),
            _ => None,
        }
    }

    /// Plain text form used by the query-string encoder.
    pub fn to_plain_string(&self) -> Option<String> {
        match self {
            Value::Null => Some("null".to_owned()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(n) => Some(n.to_string()),
            Value::Float(f) => Some(format!("{:?}", f)),
            Value::Decimal(d) => Some(d.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::Uuid(u) => Some(u.hyphenated().to_string()),
            Value::Date(d) => Some(temporal::format_date(*d)),
            Value::Datetime(dt) => Some(temporal::format_datetime(*dt)),
            Value::Rendered(r) => Some(r.text.clone()),
            Value::Array(_) | Value::Map(_) => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

// ──────────────────────────────────────────────
// Pre-rendered output scalars
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderedKind {
    Date,
    Datetime,
    Uuid,
    Float,
}

impl RenderedKind {
    pub fn type_name(self) -> &'static str {
        match self {
            RenderedKind::Date => "date",
            RenderedKind::Datetime => "datetime",
            RenderedKind::Uuid => "uuid",
            RenderedKind::Float => "float",
        }
    }
}

/// A scalar whose JSON output text is fixed ahead of serialization.
///
/// Rendered floats keep their numeric value for constraint checks.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedScalar {
    kind: RenderedKind,
    text: String,
    number: Option<f64>,
}

impl RenderedScalar {
    pub fn date(value: Date) -> Self {
        RenderedScalar {
            kind: RenderedKind::Date,
            text: temporal::format_date(value),
            number: None,
        }
    }

    pub fn datetime(value: OffsetDateTime) -> Self {
        RenderedScalar {
            kind: RenderedKind::Datetime,
            text: temporal::format_datetime(value),
            number: None,
        }
    }

    pub fn uuid(value: Uuid) -> Self {
        RenderedScalar {
            kind: RenderedKind::Uuid,
            text: value.hyphenated().to_string(),
            number: None,
        }
    }

    /// A float rendered with at most `precision` decimals, trailing zeros trimmed.
    pub fn float(value: f64, precision: usize) -> Self {
        let text = format!("{:.*}", precision, value);
        let text = if text.contains('.') {
            text.trim_end_matches('0').trim_end_matches('.').to_owned()
        } else {
            text
        };
        RenderedScalar {
            kind: RenderedKind::Float,
            text,
            number: Some(value),
        }
    }

    pub fn kind(&self) -> RenderedKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
