//! Raw declarations produced by the parser.
//! Names are unresolved strings; resolution happens at finalize.
use crate::model::{Attr, BuiltinType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub file: String,
    pub line: u32,
}

/// A type usage as written.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTypeSpec {
    Builtin(BuiltinType),
    Named(String),
    Array {
        element: Box<RawTypeSpec>,
        element_attr: Option<Attr>,
    },
    Dict {
        key: Box<RawTypeSpec>,
        key_attr: Option<Attr>,
        value: Box<RawTypeSpec>,
        value_attr: Option<Attr>,
    },
}

impl RawTypeSpec {
    /// Every named reference in this usage, outermost first.
    pub fn named_refs(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_refs(&mut out);
        out
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            RawTypeSpec::Builtin(_) => {}
            RawTypeSpec::Named(n) => out.push(n),
            RawTypeSpec::Array { element, .. } => element.collect_refs(out),
            RawTypeSpec::Dict { key, value, .. } => {
                key.collect_refs(out);
                value.collect_refs(out);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawMember {
    pub name: String,
    pub spec: RawTypeSpec,
    pub optional: bool,
    pub nullable: bool,
    pub attr: Option<Attr>,
    pub doc: Vec<String>,
    pub prov: Provenance,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawStruct {
    pub name: String,
    pub union: bool,
    pub bases: Vec<String>,
    pub members: Vec<RawMember>,
    pub doc: Vec<String>,
    pub prov: Provenance,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEnumValue {
    pub value: String,
    pub doc: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawEnum {
    pub name: String,
    pub bases: Vec<String>,
    pub values: Vec<RawEnumValue>,
    pub doc: Vec<String>,
    pub prov: Provenance,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawTypedef {
    pub name: String,
    pub spec: RawTypeSpec,
    pub attr: Option<Attr>,
    pub doc: Vec<String>,
    pub prov: Provenance,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawDecl {
    Struct(RawStruct),
    Enum(RawEnum),
    Typedef(RawTypedef),
}

impl RawDecl {
    pub fn name(&self) -> &str {
        match self {
            RawDecl::Struct(s) => &s.name,
            RawDecl::Enum(e) => &e.name,
            RawDecl::Typedef(t) => &t.name,
        }
    }

    pub fn prov(&self) -> &Provenance {
        match self {
            RawDecl::Struct(s) => &s.prov,
            RawDecl::Enum(e) => &e.prov,
            RawDecl::Typedef(t) => &t.prov,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Input,
    Output,
    Errors,
}

impl Section {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "input" => Some(Section::Input),
            "output" => Some(Section::Output),
            "errors" => Some(Section::Errors),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Section::Input => "input",
            Section::Output => "output",
            Section::Errors => "errors",
        }
    }

    /// Suffix of the synthetic section type name.
    pub fn type_suffix(self) -> &'static str {
        match self {
            Section::Input => "input",
            Section::Output => "output",
            Section::Errors => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawAction {
    pub name: String,
    pub input: Option<RawStruct>,
    pub output: Option<RawStruct>,
    pub errors: Option<RawEnum>,
    pub doc: Vec<String>,
    pub doc_group: Option<String>,
    pub prov: Provenance,
}
