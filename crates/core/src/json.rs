//! Conversions between runtime values and JSON text.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::model::{temporal, RenderedKind, RenderedScalar, Value};

/// Parse a JSON document. Numbers that fit `i64` become `Int`, all others
/// `Float`.
pub fn parse_json(text: &str) -> Result<Value, serde_json::Error> {
    let raw: serde_json::Value = serde_json::from_str(text)?;
    Ok(from_json(raw))
}

pub fn from_json(raw: serde_json::Value) -> Value {
    match raw {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => Value::Array(items.into_iter().map(from_json).collect()),
        serde_json::Value::Object(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| (k, from_json(v)))
                .collect::<BTreeMap<_, _>>(),
        ),
    }
}

/// Replace native date, datetime, and uuid scalars with their rendered form.
pub fn render_output(value: Value) -> Value {
    match value {
        Value::Date(d) => Value::Rendered(RenderedScalar::date(d)),
        Value::Datetime(dt) => Value::Rendered(RenderedScalar::datetime(dt)),
        Value::Uuid(u) => Value::Rendered(RenderedScalar::uuid(u)),
        Value::Array(items) => Value::Array(items.into_iter().map(render_output).collect()),
        Value::Map(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| (k, render_output(v)))
                .collect(),
        ),
        other => other,
    }
}

// ──────────────────────────────────────────────
// Serialization
// ──────────────────────────────────────────────

/// Maps serialize with keys in sorted order. Native dates, datetimes, and
/// uuids serialize as their ISO / hyphenated text. Rendered floats and
/// decimals are emitted as JSON numbers.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Decimal(d) => number_or_text(&d.to_string(), serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Uuid(u) => u.serialize(serializer),
            Value::Date(d) => serializer.serialize_str(&temporal::format_date(*d)),
            Value::Datetime(dt) => serializer.serialize_str(&temporal::format_datetime(*dt)),
            Value::Array(items) => serializer.collect_seq(items),
            Value::Map(map) => serializer.collect_map(map),
            Value::Rendered(r) if r.kind() == RenderedKind::Float => {
                number_or_text(r.text(), serializer)
            }
            Value::Rendered(r) => serializer.serialize_str(r.text()),
        }
    }
}

fn number_or_text<S: Serializer>(text: &str, serializer: S) -> Result<S::Ok, S::Error> {
    match serde_json::Number::from_str(text) {
        Ok(n) => n.serialize(serializer),
        Err(_) => serializer.serialize_str(text),
    }
}
