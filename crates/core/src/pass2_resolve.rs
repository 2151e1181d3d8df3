//! Pass 2: reference resolution and usage checks.
//!
//! Each check is attempted as soon as it is recorded. A check whose
//! referenced names are not yet declared waits in the deferred list and is
//! re-evaluated at finalize, when every declaration is known.

use indexmap::IndexMap;
use std::collections::HashSet;

use crate::ast::{Provenance, RawDecl, RawTypeSpec, Section};
use crate::error::CompileError;
use crate::model::{Attr, AttrSupport, BuiltinType};

/// The shape a type usage resolves to once typedefs are unwrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    Builtin(BuiltinType),
    Struct,
    Union,
    Enum,
    Array,
    Dict,
}

impl Kind {
    fn attr_support(self) -> AttrSupport {
        match self {
            Kind::Builtin(b) => b.attr_support(),
            Kind::Array | Kind::Dict => AttrSupport::Length,
            Kind::Struct | Kind::Union | Kind::Enum => AttrSupport::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Unresolved {
    Unknown(String),
    /// Typedef alias chain loops back on itself
    Cycle,
}

/// Map a written name to a usage: scalar keyword or named reference.
pub(crate) fn spec_for_name(name: &str) -> RawTypeSpec {
    match BuiltinType::from_keyword(name) {
        Some(b) => RawTypeSpec::Builtin(b),
        None => RawTypeSpec::Named(name.to_owned()),
    }
}

pub(crate) fn resolve_kind(
    decls: &IndexMap<String, RawDecl>,
    spec: &RawTypeSpec,
) -> Result<Kind, Unresolved> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut cur = spec;
    loop {
        match cur {
            RawTypeSpec::Builtin(b) => return Ok(Kind::Builtin(*b)),
            RawTypeSpec::Array { .. } => return Ok(Kind::Array),
            RawTypeSpec::Dict { .. } => return Ok(Kind::Dict),
            RawTypeSpec::Named(name) => {
                if !seen.insert(name.as_str()) {
                    return Err(Unresolved::Cycle);
                }
                match decls.get(name) {
                    None => return Err(Unresolved::Unknown(name.clone())),
                    Some(RawDecl::Struct(s)) if s.union => return Ok(Kind::Union),
                    Some(RawDecl::Struct(_)) => return Ok(Kind::Struct),
                    Some(RawDecl::Enum(_)) => return Ok(Kind::Enum),
                    Some(RawDecl::Typedef(t)) => cur = &t.spec,
                }
            }
        }
    }
}

// ──────────────────────────────────────────────
// Checks
// ──────────────────────────────────────────────

/// Who is declaring a base type list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BaseRole {
    Struct,
    Enum,
    Action(Section),
}

impl BaseRole {
    fn accepts(self, kind: Kind) -> bool {
        match self {
            BaseRole::Struct => matches!(kind, Kind::Struct | Kind::Union),
            BaseRole::Enum | BaseRole::Action(Section::Errors) => kind == Kind::Enum,
            BaseRole::Action(_) => kind == Kind::Struct,
        }
    }

    fn describe(self) -> String {
        match self {
            BaseRole::Struct => "struct".to_owned(),
            BaseRole::Enum => "enum".to_owned(),
            BaseRole::Action(section) => format!("action {}", section.keyword()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Check {
    /// A named reference must be declared somewhere.
    Known(String),
    /// A base type must be of a kind the declaring role accepts.
    Base { role: BaseRole, name: String },
    /// An attribute must only use operators the target kind supports.
    Attr { target: RawTypeSpec, attr: Attr },
    /// A dict key must be a string or an enum.
    DictKey(RawTypeSpec),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PendingCheck {
    pub check: Check,
    pub prov: Provenance,
}

/// `Ok(None)` passes, `Ok(Some(message))` fails, `Err` waits on resolution.
pub(crate) fn evaluate(
    decls: &IndexMap<String, RawDecl>,
    check: &Check,
) -> Result<Option<String>, Unresolved> {
    match check {
        Check::Known(name) => {
            if decls.contains_key(name) {
                Ok(None)
            } else {
                Err(Unresolved::Unknown(name.clone()))
            }
        }
        Check::Base { role, name } => {
            let kind = resolve_kind(decls, &spec_for_name(name))?;
            if role.accepts(kind) {
                Ok(None)
            } else {
                Ok(Some(format!(
                    "Invalid {} base type '{}'",
                    role.describe(),
                    name
                )))
            }
        }
        Check::Attr { target, attr } => {
            let kind = resolve_kind(decls, target)?;
            Ok(attr
                .first_unsupported(kind.attr_support())
                .map(|syntax| format!("Invalid attribute '{}'", syntax)))
        }
        Check::DictKey(key) => match resolve_kind(decls, key)? {
            Kind::Builtin(BuiltinType::String) | Kind::Enum => Ok(None),
            _ => Ok(Some("Invalid dictionary key type".to_owned())),
        },
    }
}

/// Re-run every deferred check now that all declarations are known.
///
/// Unknown names are reported by their `Known` check only; other checks
/// that still cannot resolve are dropped.
pub(crate) fn run_deferred(
    decls: &IndexMap<String, RawDecl>,
    pending: &[PendingCheck],
) -> Vec<CompileError> {
    let mut errors = Vec::new();
    for p in pending {
        let message = match (evaluate(decls, &p.check), &p.check) {
            (Ok(Some(message)), _) => message,
            (Err(Unresolved::Unknown(name)), Check::Known(_)) => {
                format!("Unknown member type '{}'", name)
            }
            _ => continue,
        };
        errors.push(CompileError::new(&p.prov.file, p.prov.line, message));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{RawEnum, RawStruct, RawTypedef};
    use crate::model::AttrOp;

    fn prov() -> Provenance {
        Provenance {
            file: "t".into(),
            line: 1,
        }
    }

    fn decls() -> IndexMap<String, RawDecl> {
        let mut d = IndexMap::new();
        d.insert(
            "S".into(),
            RawDecl::Struct(RawStruct {
                name: "S".into(),
                union: false,
                bases: vec![],
                members: vec![],
                doc: vec![],
                prov: prov(),
            }),
        );
        d.insert(
            "U".into(),
            RawDecl::Struct(RawStruct {
                name: "U".into(),
                union: true,
                bases: vec![],
                members: vec![],
                doc: vec![],
                prov: prov(),
            }),
        );
        d.insert(
            "E".into(),
            RawDecl::Enum(RawEnum {
                name: "E".into(),
                bases: vec![],
                values: vec![],
                doc: vec![],
                prov: prov(),
            }),
        );
        d.insert(
            "TS".into(),
            RawDecl::Typedef(RawTypedef {
                name: "TS".into(),
                spec: RawTypeSpec::Named("S".into()),
                attr: None,
                doc: vec![],
                prov: prov(),
            }),
        );
        d.insert(
            "Loop".into(),
            RawDecl::Typedef(RawTypedef {
                name: "Loop".into(),
                spec: RawTypeSpec::Named("Loop".into()),
                attr: None,
                doc: vec![],
                prov: prov(),
            }),
        );
        d
    }

    #[test]
    fn resolves_through_typedefs() {
        let d = decls();
        assert_eq!(resolve_kind(&d, &RawTypeSpec::Named("TS".into())), Ok(Kind::Struct));
        assert_eq!(resolve_kind(&d, &RawTypeSpec::Named("U".into())), Ok(Kind::Union));
        assert_eq!(
            resolve_kind(&d, &RawTypeSpec::Named("Nope".into())),
            Err(Unresolved::Unknown("Nope".into()))
        );
        assert_eq!(
            resolve_kind(&d, &RawTypeSpec::Named("Loop".into())),
            Err(Unresolved::Cycle)
        );
    }

    #[test]
    fn base_roles() {
        let d = decls();
        let base = |role, name: &str| {
            evaluate(
                &d,
                &Check::Base {
                    role,
                    name: name.into(),
                },
            )
        };
        assert_eq!(base(BaseRole::Struct, "U"), Ok(None));
        assert_eq!(base(BaseRole::Struct, "TS"), Ok(None));
        assert_eq!(
            base(BaseRole::Struct, "E"),
            Ok(Some("Invalid struct base type 'E'".into()))
        );
        assert_eq!(
            base(BaseRole::Action(Section::Input), "U"),
            Ok(Some("Invalid action input base type 'U'".into()))
        );
        assert_eq!(
            base(BaseRole::Struct, "int"),
            Ok(Some("Invalid struct base type 'int'".into()))
        );
        assert_eq!(base(BaseRole::Action(Section::Errors), "E"), Ok(None));
    }

    #[test]
    fn attribute_support_by_kind() {
        let d = decls();
        let mut attr = Attr::new();
        attr.set(AttrOp::LenGt, 0.0);
        let check = Check::Attr {
            target: RawTypeSpec::Named("S".into()),
            attr: attr.clone(),
        };
        assert_eq!(
            evaluate(&d, &check),
            Ok(Some("Invalid attribute 'len > 0'".into()))
        );
        let check = Check::Attr {
            target: RawTypeSpec::Builtin(BuiltinType::String),
            attr,
        };
        assert_eq!(evaluate(&d, &check), Ok(None));
    }

    #[test]
    fn deferred_unknowns_report_once() {
        let d = decls();
        let pending = vec![
            PendingCheck {
                check: Check::Known("Missing".into()),
                prov: prov(),
            },
            PendingCheck {
                check: Check::DictKey(RawTypeSpec::Named("Missing".into())),
                prov: prov(),
            },
            PendingCheck {
                check: Check::DictKey(RawTypeSpec::Builtin(BuiltinType::Int)),
                prov: prov(),
            },
        ];
        let errors: Vec<String> = run_deferred(&d, &pending)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            errors,
            vec![
                "t:1: error: Unknown member type 'Missing'".to_owned(),
                "t:1: error: Invalid dictionary key type".to_owned(),
            ]
        );
    }
}
