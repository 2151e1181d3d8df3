use rust_decimal::prelude::ToPrimitive;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use super::temporal::{parse_date, parse_datetime};
use super::value::{RenderedKind, Value};
use super::{
    ArrayType, BuiltinType, DictType, EnumType, StructMember, StructType, TypeGraph, TypeId,
    TypeRef, UserType,
};
use crate::error::ValidationError;

static EMPTY_MAP: BTreeMap<String, Value> = BTreeMap::new();

/// Governs coercion and copy semantics of a validation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationMode {
    /// Native values, no coercion; the input is returned as-is.
    Default,
    /// String-valued input decoded from a query string.
    QueryString,
    /// JSON-decoded input; ISO strings become dates, datetimes, and uuids.
    JsonInput,
    /// A handler result about to be serialized; no coercion.
    JsonOutput,
}

impl ValidationMode {
    /// Immutable modes never copy and hand back the caller's value.
    pub fn is_immutable(self) -> bool {
        matches!(self, ValidationMode::Default | ValidationMode::JsonOutput)
    }
}

// ──────────────────────────────────────────────
// Member paths
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of a value within a nested structure, rendered as `a.b[1].c`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberPath {
    segments: Vec<PathSegment>,
}

impl MemberPath {
    pub fn root() -> Self {
        MemberPath::default()
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    pub fn pop(&mut self) {
        self.segments.pop();
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Rendered path, or `None` at the root.
    pub fn render(&self) -> Option<String> {
        if self.is_root() {
            None
        } else {
            Some(self.to_string())
        }
    }

    /// ` for member '<path>'`, or empty at the root.
    pub(crate) fn for_member(&self) -> String {
        match self.render() {
            Some(p) => format!(" for member '{}'", p),
            None => String::new(),
        }
    }
}

impl fmt::Display for MemberPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(k) if i == 0 => write!(f, "{}", k)?,
                PathSegment::Key(k) => write!(f, ".{}", k)?,
                PathSegment::Index(n) => write!(f, "[{}]", n)?,
            }
        }
        Ok(())
    }
}

// ──────────────────────────────────────────────
// Public entry points
// ──────────────────────────────────────────────

impl TypeGraph {
    /// Validate `value` against `ty`.
    ///
    /// Immutable modes return `Cow::Borrowed(value)` on success. Copying
    /// modes return a freshly normalized `Cow::Owned` value.
    pub fn validate<'v>(
        &self,
        ty: &TypeRef,
        value: &'v Value,
        mode: ValidationMode,
    ) -> Result<Cow<'v, Value>, ValidationError> {
        let mut path = MemberPath::root();
        Validator { graph: self, mode }.validate(ty, value, &mut path)
    }

    pub fn validate_type<'v>(
        &self,
        id: TypeId,
        value: &'v Value,
        mode: ValidationMode,
    ) -> Result<Cow<'v, Value>, ValidationError> {
        self.validate(&TypeRef::User(id), value, mode)
    }
}

impl TypeRef {
    pub fn validate<'v>(
        &self,
        graph: &TypeGraph,
        value: &'v Value,
        mode: ValidationMode,
    ) -> Result<Cow<'v, Value>, ValidationError> {
        graph.validate(self, value, mode)
    }
}

// ──────────────────────────────────────────────
// Validator
// ──────────────────────────────────────────────

pub(crate) struct Validator<'g> {
    pub(crate) graph: &'g TypeGraph,
    pub(crate) mode: ValidationMode,
}

impl<'g> Validator<'g> {
    pub(crate) fn validate<'v>(
        &self,
        ty: &TypeRef,
        value: &'v Value,
        path: &mut MemberPath,
    ) -> Result<Cow<'v, Value>, ValidationError> {
        match ty {
            TypeRef::Builtin(kind) => self.scalar(*kind, value, path),
            TypeRef::Array(array) => self.array(array, value, path),
            TypeRef::Dict(dict) => self.dict(dict, value, path),
            TypeRef::User(id) => match self.graph.get(*id) {
                UserType::Struct(st) => self.validate_struct(st, value, path),
                UserType::Enum(en) => self.enumeration(en, value, path),
                UserType::Typedef(td) => {
                    let result = self.validate(&td.target, value, path)?;
                    if let Some(attr) = &td.attr {
                        attr.validate(&result, path)?;
                    }
                    Ok(result)
                }
            },
        }
    }

    pub(crate) fn validate_struct<'v>(
        &self,
        st: &StructType,
        value: &'v Value,
        path: &mut MemberPath,
    ) -> Result<Cow<'v, Value>, ValidationError> {
        let map = match value {
            Value::Map(m) => m,
            Value::String(s) if self.mode == ValidationMode::QueryString && s.is_empty() => {
                &EMPTY_MAP
            }
            _ => return Err(member_error(&st.name, value, path)),
        };

        if st.union && map.len() != 1 {
            return Err(member_error(&st.name, value, path));
        }

        let mut out = BTreeMap::new();
        for member in &st.members {
            path.push(PathSegment::Key(member.name.clone()));
            match map.get(&member.name) {
                None => {
                    if !member.optional && !st.union {
                        return Err(ValidationError::new(
                            format!("Required member '{}' missing", path),
                            path.render(),
                        ));
                    }
                }
                Some(member_value) => {
                    let result = self.member_value(member, member_value, path)?;
                    if !self.mode.is_immutable() {
                        out.insert(member.name.clone(), result.into_owned());
                    }
                }
            }
            path.pop();
        }

        for key in map.keys() {
            if st.member(key).is_none() {
                path.push(PathSegment::Key(key.clone()));
                return Err(ValidationError::new(
                    format!("Unknown member '{}'", path),
                    path.render(),
                ));
            }
        }

        Ok(self.keep(value, || Value::Map(out)))
    }

    fn member_value<'v>(
        &self,
        member: &StructMember,
        value: &'v Value,
        path: &mut MemberPath,
    ) -> Result<Cow<'v, Value>, ValidationError> {
        if member.nullable {
            if matches!(value, Value::Null) {
                return Ok(self.keep(value, || Value::Null));
            }
            if self.mode == ValidationMode::QueryString
                && value.as_str() == Some("null")
                && !self.is_string(&member.ty)
            {
                return Ok(Cow::Owned(Value::Null));
            }
        }
        let result = self.validate(&member.ty, value, path)?;
        if let Some(attr) = &member.attr {
            attr.validate(&result, path)?;
        }
        Ok(result)
    }

    fn array<'v>(
        &self,
        array: &ArrayType,
        value: &'v Value,
        path: &mut MemberPath,
    ) -> Result<Cow<'v, Value>, ValidationError> {
        let items: &[Value] = match value {
            Value::Array(items) => items,
            Value::String(s) if self.mode == ValidationMode::QueryString && s.is_empty() => &[],
            _ => return Err(member_error("array", value, path)),
        };

        let mut out = Vec::new();
        for (index, item) in items.iter().enumerate() {
            path.push(PathSegment::Index(index));
            let result = self.validate(&array.element, item, path)?;
            if let Some(attr) = &array.element_attr {
                attr.validate(&result, path)?;
            }
            if !self.mode.is_immutable() {
                out.push(result.into_owned());
            }
            path.pop();
        }

        Ok(self.keep(value, || Value::Array(out)))
    }

    fn dict<'v>(
        &self,
        dict: &DictType,
        value: &'v Value,
        path: &mut MemberPath,
    ) -> Result<Cow<'v, Value>, ValidationError> {
        let map = match value {
            Value::Map(m) => m,
            Value::String(s) if self.mode == ValidationMode::QueryString && s.is_empty() => {
                &EMPTY_MAP
            }
            _ => return Err(member_error("dict", value, path)),
        };

        let mut out = BTreeMap::new();
        for (key, item) in map {
            // Keys report errors at the path of their value.
            path.push(PathSegment::Key(key.clone()));
            let key_value = Value::String(key.clone());
            let key_result = self.validate(&dict.key, &key_value, path)?;
            if let Some(attr) = &dict.key_attr {
                attr.validate(&key_result, path)?;
            }

            let result = self.validate(&dict.value, item, path)?;
            if let Some(attr) = &dict.value_attr {
                attr.validate(&result, path)?;
            }
            if !self.mode.is_immutable() {
                out.insert(key.clone(), result.into_owned());
            }
            path.pop();
        }

        Ok(self.keep(value, || Value::Map(out)))
    }

    fn enumeration<'v>(
        &self,
        en: &EnumType,
        value: &'v Value,
        path: &MemberPath,
    ) -> Result<Cow<'v, Value>, ValidationError> {
        match value {
            Value::String(s) if en.contains(s) => Ok(self.keep(value, || value.clone())),
            _ => Err(member_error(&en.name, value, path)),
        }
    }

    fn scalar<'v>(
        &self,
        kind: BuiltinType,
        value: &'v Value,
        path: &MemberPath,
    ) -> Result<Cow<'v, Value>, ValidationError> {
        let query_string = self.mode == ValidationMode::QueryString;
        let parses_text = matches!(
            self.mode,
            ValidationMode::QueryString | ValidationMode::JsonInput
        );
        let output = self.mode == ValidationMode::JsonOutput;
        let fail = || member_error(kind.type_name(), value, path);

        match (kind, value) {
            (BuiltinType::Object, _) => Ok(self.keep(value, || value.clone())),

            (BuiltinType::String, Value::String(_)) => Ok(self.keep(value, || value.clone())),

            (BuiltinType::Int, Value::Int(_)) => Ok(self.keep(value, || value.clone())),
            (BuiltinType::Int, Value::Float(f)) if is_integral(*f) => {
                Ok(self.keep(value, || Value::Int(*f as i64)))
            }
            (BuiltinType::Int, Value::Decimal(d)) if d.fract().is_zero() => match d.to_i64() {
                Some(n) => Ok(self.keep(value, || Value::Int(n))),
                None => Err(fail()),
            },
            (BuiltinType::Int, Value::String(s)) if query_string => s
                .trim()
                .parse::<i64>()
                .map(|n| Cow::Owned(Value::Int(n)))
                .map_err(|_| fail()),

            (BuiltinType::Float, Value::Float(_)) => Ok(self.keep(value, || value.clone())),
            (BuiltinType::Float, Value::Int(n)) => Ok(self.keep(value, || Value::Float(*n as f64))),
            (BuiltinType::Float, Value::Decimal(d)) => match d.to_f64() {
                Some(f) => Ok(self.keep(value, || Value::Float(f))),
                None => Err(fail()),
            },
            (BuiltinType::Float, Value::String(s)) if query_string => match s.trim().parse::<f64>()
            {
                Ok(f) if f.is_finite() => Ok(Cow::Owned(Value::Float(f))),
                _ => Err(fail()),
            },
            (BuiltinType::Float, Value::Rendered(r)) if output && r.kind() == RenderedKind::Float => {
                Ok(Cow::Borrowed(value))
            }

            (BuiltinType::Bool, Value::Bool(_)) => Ok(self.keep(value, || value.clone())),
            (BuiltinType::Bool, Value::String(s)) if query_string => match s.as_str() {
                "true" => Ok(Cow::Owned(Value::Bool(true))),
                "false" => Ok(Cow::Owned(Value::Bool(false))),
                _ => Err(fail()),
            },

            (BuiltinType::Uuid, Value::Uuid(_)) if !output => Ok(self.keep(value, || value.clone())),
            (BuiltinType::Uuid, Value::String(s)) if parses_text => uuid::Uuid::parse_str(s.trim())
                .map(|u| Cow::Owned(Value::Uuid(u)))
                .map_err(|_| fail()),

            (BuiltinType::Date, Value::Date(_)) if !output => Ok(self.keep(value, || value.clone())),
            (BuiltinType::Date, Value::String(s)) if parses_text => parse_date(s)
                .map(|d| Cow::Owned(Value::Date(d)))
                .ok_or_else(fail),

            (BuiltinType::Datetime, Value::Datetime(_)) if !output => {
                Ok(self.keep(value, || value.clone()))
            }
            (BuiltinType::Datetime, Value::String(s)) if parses_text => parse_datetime(s)
                .map(|dt| Cow::Owned(Value::Datetime(dt)))
                .ok_or_else(fail),

            (BuiltinType::Uuid, Value::Rendered(r)) if output && r.kind() == RenderedKind::Uuid => {
                Ok(Cow::Borrowed(value))
            }
            (BuiltinType::Date, Value::Rendered(r)) if output && r.kind() == RenderedKind::Date => {
                Ok(Cow::Borrowed(value))
            }
            (BuiltinType::Datetime, Value::Rendered(r))
                if output && r.kind() == RenderedKind::Datetime =>
            {
                Ok(Cow::Borrowed(value))
            }

            _ => Err(fail()),
        }
    }

    fn is_string(&self, ty: &TypeRef) -> bool {
        matches!(
            self.graph.unwrap_typedefs(ty),
            TypeRef::Builtin(BuiltinType::String)
        )
    }

    /// The caller's value in immutable modes, otherwise the normalized copy.
    fn keep<'v>(&self, original: &'v Value, normalized: impl FnOnce() -> Value) -> Cow<'v, Value> {
        if self.mode.is_immutable() {
            Cow::Borrowed(original)
        } else {
            Cow::Owned(normalized())
        }
    }
}

fn is_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
}

pub(crate) fn member_error(type_name: &str, value: &Value, path: &MemberPath) -> ValidationError {
    ValidationError::new(
        format!(
            "Invalid value {} (type '{}'){}, expected type '{}'",
            value.repr(),
            value.type_name(),
            path.for_member(),
            type_name
        ),
        path.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attr, AttrOp};
    use time::macros::{date, datetime};

    fn check(kind: BuiltinType, value: Value, mode: ValidationMode) -> Result<Value, String> {
        TypeGraph::default()
            .validate(&TypeRef::Builtin(kind), &value, mode)
            .map(Cow::into_owned)
            .map_err(|e| e.message)
    }

    #[test]
    fn member_path_rendering() {
        let mut path = MemberPath::root();
        assert_eq!(path.render(), None);
        path.push(PathSegment::Key("a".into()));
        path.push(PathSegment::Index(1));
        path.push(PathSegment::Key("b".into()));
        assert_eq!(path.render().as_deref(), Some("a[1].b"));

        let mut path = MemberPath::root();
        path.push(PathSegment::Index(1));
        path.push(PathSegment::Index(2));
        assert_eq!(path.to_string(), "[1][2]");
    }

    #[test]
    fn int_coercions() {
        use ValidationMode::*;
        assert_eq!(check(BuiltinType::Int, Value::Int(7), Default), Ok(Value::Int(7)));
        assert_eq!(check(BuiltinType::Int, Value::Float(7.0), JsonInput), Ok(Value::Int(7)));
        assert_eq!(
            check(BuiltinType::Int, Value::Float(7.0), Default),
            Ok(Value::Float(7.0))
        );
        assert_eq!(check(BuiltinType::Int, "7".into(), QueryString), Ok(Value::Int(7)));
        assert_eq!(
            check(BuiltinType::Int, Value::Float(7.5), JsonInput),
            Err("Invalid value 7.5 (type 'float'), expected type 'int'".into())
        );
        assert_eq!(
            check(BuiltinType::Int, Value::Bool(true), Default),
            Err("Invalid value true (type 'bool'), expected type 'int'".into())
        );
        assert_eq!(
            check(BuiltinType::Int, "7".into(), JsonInput),
            Err("Invalid value '7' (type 'string'), expected type 'int'".into())
        );
        assert!(check(BuiltinType::Int, "7.0".into(), QueryString).is_err());
    }

    #[test]
    fn float_coercions() {
        use ValidationMode::*;
        assert_eq!(check(BuiltinType::Float, Value::Int(7), JsonInput), Ok(Value::Float(7.0)));
        assert_eq!(check(BuiltinType::Float, "7.5".into(), QueryString), Ok(Value::Float(7.5)));
        assert_eq!(
            check(BuiltinType::Float, "nan".into(), QueryString),
            Err("Invalid value 'nan' (type 'string'), expected type 'float'".into())
        );
        assert!(check(BuiltinType::Float, "inf".into(), QueryString).is_err());
        assert!(check(BuiltinType::Float, Value::Bool(false), QueryString).is_err());
        assert!(check(BuiltinType::Float, "7.5".into(), JsonInput).is_err());
    }

    #[test]
    fn bool_strings_only_in_query_string_mode() {
        use ValidationMode::*;
        assert_eq!(check(BuiltinType::Bool, "true".into(), QueryString), Ok(Value::Bool(true)));
        assert_eq!(check(BuiltinType::Bool, "false".into(), QueryString), Ok(Value::Bool(false)));
        assert!(check(BuiltinType::Bool, "True".into(), QueryString).is_err());
        assert!(check(BuiltinType::Bool, "true".into(), JsonInput).is_err());
        assert!(check(BuiltinType::Bool, Value::Int(1), Default).is_err());
    }

    #[test]
    fn temporal_and_uuid_scalars() {
        use ValidationMode::*;
        assert_eq!(
            check(BuiltinType::Date, "2013-05-26".into(), JsonInput),
            Ok(Value::Date(date!(2013-05-26)))
        );
        assert!(check(BuiltinType::Date, "2013-05-26".into(), Default).is_err());
        assert_eq!(
            check(BuiltinType::Datetime, "2013-05-26T11:01:00+01:00".into(), QueryString),
            Ok(Value::Datetime(datetime!(2013-05-26 10:01:00 UTC)))
        );
        let id = uuid::Uuid::parse_str("184EB00A-DD1C-4E04-B4C6-2A8E0C1DD3B4").unwrap();
        assert_eq!(
            check(
                BuiltinType::Uuid,
                "184EB00A-DD1C-4E04-B4C6-2A8E0C1DD3B4".into(),
                JsonInput
            ),
            Ok(Value::Uuid(id))
        );
        assert!(check(BuiltinType::Uuid, "not-a-uuid".into(), JsonInput).is_err());
        assert_eq!(check(BuiltinType::Uuid, Value::Uuid(id), Default), Ok(Value::Uuid(id)));
    }

    #[test]
    fn json_output_requires_rendered_temporal_scalars() {
        use crate::model::RenderedScalar;
        use ValidationMode::*;
        let id = uuid::Uuid::nil();
        assert_eq!(
            check(BuiltinType::Uuid, Value::Uuid(id), JsonOutput),
            Err(format!(
                "Invalid value '{}' (type 'uuid'), expected type 'uuid'",
                id.hyphenated()
            ))
        );
        let rendered = Value::Rendered(RenderedScalar::uuid(id));
        assert_eq!(check(BuiltinType::Uuid, rendered.clone(), JsonOutput), Ok(rendered));
        let rendered = Value::Rendered(RenderedScalar::date(date!(2013-05-26)));
        assert!(check(BuiltinType::Date, rendered.clone(), JsonOutput).is_ok());
        assert!(check(BuiltinType::Datetime, rendered.clone(), JsonOutput).is_err());
        assert!(check(BuiltinType::Date, rendered, Default).is_err());
        let f = Value::Rendered(RenderedScalar::float(1.5, 2));
        assert!(check(BuiltinType::Float, f, JsonOutput).is_ok());
    }

    #[test]
    fn object_accepts_anything() {
        for mode in [
            ValidationMode::Default,
            ValidationMode::QueryString,
            ValidationMode::JsonInput,
            ValidationMode::JsonOutput,
        ] {
            assert_eq!(check(BuiltinType::Object, Value::Null, mode), Ok(Value::Null));
            assert_eq!(check(BuiltinType::Object, "x".into(), mode), Ok("x".into()));
        }
    }

    #[test]
    fn immutable_modes_return_the_same_reference() {
        let graph = TypeGraph::default();
        let value = Value::Int(5);
        let ty = TypeRef::Builtin(BuiltinType::Int);
        for mode in [ValidationMode::Default, ValidationMode::JsonOutput] {
            match graph.validate(&ty, &value, mode).unwrap() {
                Cow::Borrowed(r) => assert!(std::ptr::eq(r, &value)),
                Cow::Owned(_) => panic!("expected a borrowed result"),
            }
        }
        assert!(matches!(
            graph.validate(&ty, &value, ValidationMode::JsonInput).unwrap(),
            Cow::Owned(Value::Int(5))
        ));
    }

    #[test]
    fn array_with_element_attribute() {
        let mut attr = Attr::new();
        attr.set(AttrOp::Lt, 5.0);
        let ty = TypeRef::Array(Box::new(ArrayType {
            element: TypeRef::Builtin(BuiltinType::Int),
            element_attr: Some(attr),
        }));
        let graph = TypeGraph::default();
        let ok = Value::Array(vec![Value::Int(1), Value::Int(4)]);
        assert!(graph.validate(&ty, &ok, ValidationMode::Default).is_ok());

        let bad = Value::Array(vec![Value::Int(1), Value::Int(5)]);
        let err = graph.validate(&ty, &bad, ValidationMode::Default).unwrap_err();
        assert_eq!(err.message, "Invalid value 5 (type 'int') for member '[1]' [< 5]");
        assert_eq!(err.member.as_deref(), Some("[1]"));

        let qs = Value::String(String::new());
        assert_eq!(
            graph.validate(&ty, &qs, ValidationMode::QueryString).unwrap().into_owned(),
            Value::Array(vec![])
        );
        assert!(graph.validate(&ty, &qs, ValidationMode::JsonInput).is_err());
    }

    #[test]
    fn dict_keys_share_the_value_path() {
        let mut key_attr = Attr::new();
        key_attr.set(AttrOp::LenLt, 2.0);
        let ty = TypeRef::Dict(Box::new(DictType {
            value: TypeRef::Builtin(BuiltinType::Int),
            value_attr: None,
            key: TypeRef::Builtin(BuiltinType::String),
            key_attr: Some(key_attr),
        }));
        let graph = TypeGraph::default();
        let mut map = BTreeMap::new();
        map.insert("a".to_owned(), Value::Int(1));
        map.insert("bc".to_owned(), Value::Int(2));
        let err = graph
            .validate(&ty, &Value::Map(map), ValidationMode::Default)
            .unwrap_err();
        assert_eq!(
            err.message,
            "Invalid value 'bc' (type 'string') for member 'bc' [len < 2]"
        );
    }
}
