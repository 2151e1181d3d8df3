//! URL query-string codec for nested values.
//!
//! A value is flattened to `path=value` pairs, one per scalar leaf. Path
//! segments are map keys or array indexes joined with `.`; each segment and
//! value is percent-encoded. Decoding reverses this and yields a tree of
//! string leaves: scalar types are recovered later by `QUERY_STRING`
//! validation.

use std::collections::BTreeMap;

use crate::error::QueryStringError;
use crate::model::Value;

// ──────────────────────────────────────────────
// Encode
// ──────────────────────────────────────────────

/// Encode a value as a query string with pairs sorted by full key.
///
/// Array indexes sort as text, so arrays longer than ten elements do not
/// decode back. Empty containers below the root encode as `path=`; an empty root encodes
/// as the empty string.
pub fn encode(value: &Value) -> String {
    let mut pairs: Vec<(Vec<String>, String)> = Vec::new();
    flatten(value, &mut Vec::new(), &mut pairs);
    let mut pairs: Vec<(String, String)> = pairs
        .into_iter()
        .map(|(path, value)| (path.join("."), value))
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

fn flatten(value: &Value, path: &mut Vec<String>, out: &mut Vec<(Vec<String>, String)>) {
    match value {
        Value::Map(map) if !map.is_empty() => {
            for (key, child) in map {
                path.push(quote_key(key));
                flatten(child, path, out);
                path.pop();
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, child) in items.iter().enumerate() {
                path.push(index.to_string());
                flatten(child, path, out);
                path.pop();
            }
        }
        Value::Map(_) | Value::Array(_) => {
            if !path.is_empty() {
                out.push((path.clone(), String::new()));
            }
        }
        scalar => {
            let text = scalar.to_plain_string().unwrap_or_default();
            out.push((path.clone(), quote(&text)));
        }
    }
}

/// Percent-encode a value, leaving `A-Za-z0-9-_.~` and `/` as-is.
fn quote(text: &str) -> String {
    urlencoding::encode(text).replace("%2F", "/")
}

/// Percent-encode a key segment. The `.` separator is escaped too.
fn quote_key(text: &str) -> String {
    quote(text).replace('.', "%2E")
}

// ──────────────────────────────────────────────
// Decode
// ──────────────────────────────────────────────

/// Intermediate tree; `Unset` marks a slot created but not yet assigned.
#[derive(Debug)]
enum Node {
    Unset,
    Leaf(String),
    List(Vec<Node>),
    Map(BTreeMap<String, Node>),
}

impl Node {
    fn into_value(self) -> Value {
        match self {
            Node::Unset => Value::Null,
            Node::Leaf(s) => Value::String(s),
            Node::List(items) => Value::Array(items.into_iter().map(Node::into_value).collect()),
            Node::Map(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, v.into_value()))
                    .collect(),
            ),
        }
    }
}

/// Decode a query string into nested maps and arrays of strings.
///
/// The first index of an array must be `0` and each later index must be at
/// most one past the current end.
pub fn decode(query: &str) -> Result<Value, QueryStringError> {
    let mut root = Node::Unset;
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let invalid = || QueryStringError::InvalidPair(pair.to_owned());

        let parts: Vec<&str> = pair.split('=').collect();
        let [key, value] = parts.as_slice() else {
            return Err(invalid());
        };
        let value = unquote(value).ok_or_else(invalid)?;

        let mut slot = &mut root;
        for segment in key.split('.') {
            let segment = unquote(segment).ok_or_else(invalid)?;
            if matches!(slot, Node::Unset) {
                *slot = if segment == "0" {
                    Node::List(Vec::new())
                } else {
                    Node::Map(BTreeMap::new())
                };
            }
            slot = match slot {
                Node::List(items) => {
                    let index: usize = segment.parse().map_err(|_| invalid())?;
                    if index == items.len() {
                        items.push(Node::Unset);
                    } else if index > items.len() {
                        return Err(invalid());
                    }
                    &mut items[index]
                }
                Node::Map(map) => map.entry(segment).or_insert(Node::Unset),
                Node::Leaf(_) | Node::Unset => return Err(invalid()),
            };
        }

        if !matches!(slot, Node::Unset) {
            return Err(QueryStringError::DuplicateKey(pair.to_owned()));
        }
        *slot = Node::Leaf(value);
    }

    Ok(match root {
        Node::Unset => Value::Map(BTreeMap::new()),
        node => node.into_value(),
    })
}

fn unquote(text: &str) -> Option<String> {
    urlencoding::decode(text).ok().map(|s| s.into_owned())
}
