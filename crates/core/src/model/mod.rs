//! Resolved type graph produced by `SpecParser::finalize`.
//!
//! Named types live in an arena and are addressed by [`TypeId`]. Member and
//! element types refer to named types by id, so structs that reference each
//! other (directly or through arrays and dicts) need no shared ownership.
//! Anonymous arrays and dicts are owned inline by the usage that declares
//! them.

pub mod attr;
pub mod temporal;
pub mod validate;
pub mod value;

use indexmap::IndexMap;

pub use attr::{Attr, AttrOp, AttrSupport};
pub use validate::{MemberPath, PathSegment, ValidationMode};
pub use value::{RenderedKind, RenderedScalar, Value};

// ──────────────────────────────────────────────
// Type references
// ──────────────────────────────────────────────

/// Built-in scalar types. These carry no per-use state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    String,
    Int,
    Float,
    Bool,
    Uuid,
    Date,
    Datetime,
    Object,
}

impl BuiltinType {
    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "string" => BuiltinType::String,
            "int" => BuiltinType::Int,
            "float" => BuiltinType::Float,
            "bool" => BuiltinType::Bool,
            "uuid" => BuiltinType::Uuid,
            "date" => BuiltinType::Date,
            "datetime" => BuiltinType::Datetime,
            "object" => BuiltinType::Object,
            _ => return None,
        })
    }

    pub fn type_name(self) -> &'static str {
        match self {
            BuiltinType::String => "string",
            BuiltinType::Int => "int",
            BuiltinType::Float => "float",
            BuiltinType::Bool => "bool",
            BuiltinType::Uuid => "uuid",
            BuiltinType::Date => "date",
            BuiltinType::Datetime => "datetime",
            BuiltinType::Object => "object",
        }
    }

    pub fn attr_support(self) -> AttrSupport {
        match self {
            BuiltinType::Int | BuiltinType::Float => AttrSupport::Value,
            BuiltinType::String => AttrSupport::Length,
            _ => AttrSupport::None,
        }
    }
}

/// Index of a named type in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) usize);

#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    Builtin(BuiltinType),
    User(TypeId),
    Array(Box<ArrayType>),
    Dict(Box<DictType>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayType {
    pub element: TypeRef,
    pub element_attr: Option<Attr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DictType {
    pub value: TypeRef,
    pub value_attr: Option<Attr>,
    pub key: TypeRef,
    pub key_attr: Option<Attr>,
}

// ──────────────────────────────────────────────
// Named types
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct StructMember {
    pub name: String,
    pub ty: TypeRef,
    pub optional: bool,
    pub nullable: bool,
    pub attr: Option<Attr>,
    pub doc: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    pub name: String,
    pub union: bool,
    /// Effective members: inherited members in base order, then own members.
    pub members: Vec<StructMember>,
    pub base_types: Vec<TypeId>,
    pub doc: Vec<String>,
    pub(crate) own_start: usize,
}

impl StructType {
    pub fn member(&self, name: &str) -> Option<&StructMember> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Members declared on this type, excluding inherited ones.
    pub fn own_members(&self) -> &[StructMember] {
        &self.members[self.own_start..]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub value: String,
    pub doc: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    pub name: String,
    /// Effective values: inherited values in base order, then own values.
    pub values: Vec<EnumValue>,
    pub base_types: Vec<TypeId>,
    pub doc: Vec<String>,
}

impl EnumType {
    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v.value == value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Typedef {
    pub name: String,
    pub target: TypeRef,
    pub attr: Option<Attr>,
    pub doc: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserType {
    Struct(StructType),
    Enum(EnumType),
    Typedef(Typedef),
}

impl UserType {
    pub fn name(&self) -> &str {
        match self {
            UserType::Struct(s) => &s.name,
            UserType::Enum(e) => &e.name,
            UserType::Typedef(t) => &t.name,
        }
    }

    pub fn doc(&self) -> &[String] {
        match self {
            UserType::Struct(s) => &s.doc,
            UserType::Enum(e) => &e.doc,
            UserType::Typedef(t) => &t.doc,
        }
    }

    pub fn as_struct(&self) -> Option<&StructType> {
        match self {
            UserType::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumType> {
        match self {
            UserType::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_typedef(&self) -> Option<&Typedef> {
        match self {
            UserType::Typedef(t) => Some(t),
            _ => None,
        }
    }
}

// ──────────────────────────────────────────────
// Actions
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub name: String,
    /// `<name>_input` struct
    pub input: TypeId,
    /// `<name>_output` struct
    pub output: TypeId,
    /// `<name>_error` enum
    pub errors: TypeId,
    pub doc: Vec<String>,
    pub doc_group: Option<String>,
}

// ──────────────────────────────────────────────
// Type graph
// ──────────────────────────────────────────────

/// Immutable registry of resolved types and actions.
///
/// Action section types live in the arena but are not registered by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeGraph {
    pub(crate) arena: Vec<UserType>,
    pub(crate) names: IndexMap<String, TypeId>,
    pub(crate) actions: IndexMap<String, Action>,
}

impl TypeGraph {
    pub fn get(&self, id: TypeId) -> &UserType {
        &self.arena[id.0]
    }

    pub fn type_id(&self, name: &str) -> Option<TypeId> {
        self.names.get(name).copied()
    }

    pub fn type_by_name(&self, name: &str) -> Option<&UserType> {
        self.type_id(name).map(|id| self.get(id))
    }

    /// Named types in first-definition order.
    pub fn types(&self) -> impl Iterator<Item = &UserType> + '_ {
        self.names.values().map(|id| self.get(*id))
    }

    pub fn type_count(&self) -> usize {
        self.names.len()
    }

    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions.get(name)
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> + '_ {
        self.actions.values()
    }

    /// Display name of a type reference: a keyword, `array`, `dict`, or the
    /// named type's name.
    pub fn type_name<'g>(&'g self, ty: &TypeRef) -> &'g str {
        match ty {
            TypeRef::Builtin(b) => b.type_name(),
            TypeRef::User(id) => self.get(*id).name(),
            TypeRef::Array(_) => "array",
            TypeRef::Dict(_) => "dict",
        }
    }

    /// Follow typedefs to the first non-typedef reference.
    pub fn unwrap_typedefs<'g>(&'g self, mut ty: &'g TypeRef) -> &'g TypeRef {
        while let TypeRef::User(id) = ty {
            match self.get(*id) {
                UserType::Typedef(t) => ty = &t.target,
                _ => break,
            }
        }
        ty
    }

    pub(crate) fn push(&mut self, ty: UserType) -> TypeId {
        let id = TypeId(self.arena.len());
        self.arena.push(ty);
        id
    }
}
