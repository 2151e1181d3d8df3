//! Pass 4: base type composition and type graph construction.
//!
//! A type's effective member (or value) list is the concatenation of each
//! base's effective list in declared order, followed by its own. Names that
//! repeat an inherited one are reported and dropped. Bases of an invalid
//! kind and types on a base cycle contribute nothing.

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

use crate::ast::{
    Provenance, RawAction, RawDecl, RawEnum, RawEnumValue, RawMember, RawStruct, RawTypeSpec,
    Section,
};
use crate::error::CompileError;
use crate::model::{
    Action, ArrayType, DictType, EnumType, EnumValue, StructMember, StructType, TypeGraph, TypeId,
    TypeRef, Typedef, UserType,
};

// ──────────────────────────────────────────────
// Composition
// ──────────────────────────────────────────────

trait Named {
    fn name(&self) -> &str;
}

impl Named for RawMember {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for RawEnumValue {
    fn name(&self) -> &str {
        &self.value
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Composed<T> {
    pub items: Vec<T>,
    /// Index of the first own (non-inherited) item.
    pub own_start: usize,
    /// Names redefined from a base, in first-seen order.
    pub redefined: Vec<String>,
}

fn merge<T: Named + Clone>(inherited: Vec<Vec<T>>, own: &[T]) -> Composed<T> {
    let mut items: Vec<T> = Vec::new();
    let mut redefined: Vec<String> = Vec::new();
    fn note(name: &str, redefined: &mut Vec<String>) {
        if !redefined.iter().any(|n| n == name) {
            redefined.push(name.to_owned());
        }
    }
    for list in inherited {
        for item in list {
            if items.iter().any(|i| i.name() == item.name()) {
                note(item.name(), &mut redefined);
            } else {
                items.push(item);
            }
        }
    }
    let own_start = items.len();
    for item in own {
        if items[..own_start].iter().any(|i| i.name() == item.name()) {
            note(item.name(), &mut redefined);
        } else {
            items.push(item.clone());
        }
    }
    Composed {
        items,
        own_start,
        redefined,
    }
}

pub(crate) struct Composition {
    pub structs: HashMap<String, Composed<RawMember>>,
    pub enums: HashMap<String, Composed<RawEnumValue>>,
    pub sections: HashMap<(String, Section), SectionBody>,
    pub errors: Vec<CompileError>,
}

pub(crate) enum SectionBody {
    Struct(Composed<RawMember>),
    Enum(Composed<RawEnumValue>),
}

struct Composer<'a> {
    decls: &'a IndexMap<String, RawDecl>,
    cyclic: &'a HashSet<String>,
    structs: HashMap<String, Composed<RawMember>>,
    enums: HashMap<String, Composed<RawEnumValue>>,
}

impl<'a> Composer<'a> {
    /// Follow typedef aliases from a base name to a declaration.
    fn resolve(&self, name: &str) -> Option<&'a RawDecl> {
        let mut seen = HashSet::new();
        let mut cur = name;
        loop {
            if !seen.insert(cur) {
                return None;
            }
            match self.decls.get(cur)? {
                RawDecl::Typedef(t) => match &t.spec {
                    RawTypeSpec::Named(next) => cur = next,
                    _ => return None,
                },
                decl => return Some(decl),
            }
        }
    }

    fn usable(&self, name: &str) -> bool {
        !self.cyclic.contains(name)
    }

    fn struct_members(&mut self, s: &'a RawStruct) -> Vec<RawMember> {
        if !self.structs.contains_key(&s.name) {
            let composed = self.compose_struct(s, true);
            self.structs.insert(s.name.clone(), composed);
        }
        self.structs
            .get(&s.name)
            .map(|c| c.items.clone())
            .unwrap_or_default()
    }

    fn enum_values(&mut self, e: &'a RawEnum) -> Vec<RawEnumValue> {
        if !self.enums.contains_key(&e.name) {
            let composed = self.compose_enum(e);
            self.enums.insert(e.name.clone(), composed);
        }
        self.enums
            .get(&e.name)
            .map(|c| c.items.clone())
            .unwrap_or_default()
    }

    /// Action sections pass `allow_union = false`: only plain structs are
    /// valid bases there.
    fn compose_struct(&mut self, s: &'a RawStruct, allow_union: bool) -> Composed<RawMember> {
        let mut inherited = Vec::new();
        if self.usable(&s.name) {
            for base in &s.bases {
                if let Some(RawDecl::Struct(b)) = self.resolve(base) {
                    if self.usable(&b.name) && (allow_union || !b.union) {
                        inherited.push(self.struct_members(b));
                    }
                }
            }
        }
        merge(inherited, &s.members)
    }

    fn compose_enum(&mut self, e: &'a RawEnum) -> Composed<RawEnumValue> {
        let mut inherited = Vec::new();
        if self.usable(&e.name) {
            for base in &e.bases {
                if let Some(RawDecl::Enum(b)) = self.resolve(base) {
                    if self.usable(&b.name) {
                        inherited.push(self.enum_values(b));
                    }
                }
            }
        }
        merge(inherited, &e.values)
    }
}

pub(crate) fn compose<'a>(
    decls: &'a IndexMap<String, RawDecl>,
    actions: &'a IndexMap<String, RawAction>,
    cyclic: &'a HashSet<String>,
) -> Composition {
    let mut composer = Composer {
        decls,
        cyclic,
        structs: HashMap::new(),
        enums: HashMap::new(),
    };
    let mut errors = Vec::new();

    for decl in decls.values() {
        match decl {
            RawDecl::Struct(s) => {
                composer.struct_members(s);
                if let Some(c) = composer.structs.get(&s.name) {
                    report(&mut errors, &s.prov, "member", &c.redefined);
                }
            }
            RawDecl::Enum(e) => {
                composer.enum_values(e);
                if let Some(c) = composer.enums.get(&e.name) {
                    report(&mut errors, &e.prov, "enumeration value", &c.redefined);
                }
            }
            RawDecl::Typedef(_) => {}
        }
    }

    let mut sections = HashMap::new();
    for action in actions.values() {
        for (section, body) in [
            (Section::Input, action.input.as_ref()),
            (Section::Output, action.output.as_ref()),
        ] {
            if let Some(s) = body {
                let c = composer.compose_struct(s, false);
                report(&mut errors, &s.prov, "member", &c.redefined);
                sections.insert((action.name.clone(), section), SectionBody::Struct(c));
            }
        }
        if let Some(e) = &action.errors {
            let c = composer.compose_enum(e);
            report(&mut errors, &e.prov, "enumeration value", &c.redefined);
            sections.insert((action.name.clone(), Section::Errors), SectionBody::Enum(c));
        }
    }

    Composition {
        structs: composer.structs,
        enums: composer.enums,
        sections,
        errors,
    }
}

fn report(errors: &mut Vec<CompileError>, prov: &Provenance, what: &str, names: &[String]) {
    for name in names {
        errors.push(CompileError::new(
            &prov.file,
            prov.line,
            format!("Redefinition of {} '{}' from base type", what, name),
        ));
    }
}

// ──────────────────────────────────────────────
// Graph construction
// ──────────────────────────────────────────────

struct Builder<'a> {
    ids: HashMap<&'a str, TypeId>,
    errors: Vec<CompileError>,
}

impl<'a> Builder<'a> {
    fn type_ref(&mut self, spec: &RawTypeSpec, prov: &Provenance) -> TypeRef {
        match spec {
            RawTypeSpec::Builtin(b) => TypeRef::Builtin(*b),
            RawTypeSpec::Named(name) => match self.ids.get(name.as_str()) {
                Some(id) => TypeRef::User(*id),
                None => {
                    self.errors.push(CompileError::new(
                        &prov.file,
                        prov.line,
                        format!("Unknown member type '{}'", name),
                    ));
                    TypeRef::Builtin(crate::model::BuiltinType::Object)
                }
            },
            RawTypeSpec::Array {
                element,
                element_attr,
            } => TypeRef::Array(Box::new(ArrayType {
                element: self.type_ref(element, prov),
                element_attr: element_attr.clone(),
            })),
            RawTypeSpec::Dict {
                key,
                key_attr,
                value,
                value_attr,
            } => TypeRef::Dict(Box::new(DictType {
                value: self.type_ref(value, prov),
                value_attr: value_attr.clone(),
                key: self.type_ref(key, prov),
                key_attr: key_attr.clone(),
            })),
        }
    }

    fn base_ids(&self, bases: &[String]) -> Vec<TypeId> {
        bases
            .iter()
            .filter_map(|b| self.ids.get(b.as_str()).copied())
            .collect()
    }

    fn struct_type(
        &mut self,
        s: &RawStruct,
        composed: Option<&Composed<RawMember>>,
    ) -> StructType {
        let (raw_members, own_start) = match composed {
            Some(c) => (c.items.as_slice(), c.own_start),
            None => (s.members.as_slice(), 0),
        };
        let members = raw_members
            .iter()
            .map(|m| StructMember {
                name: m.name.clone(),
                ty: self.type_ref(&m.spec, &m.prov),
                optional: m.optional,
                nullable: m.nullable,
                attr: m.attr.clone(),
                doc: m.doc.clone(),
            })
            .collect();
        StructType {
            name: s.name.clone(),
            union: s.union,
            members,
            base_types: self.base_ids(&s.bases),
            doc: s.doc.clone(),
            own_start,
        }
    }

    fn enum_type(&self, e: &RawEnum, composed: Option<&Composed<RawEnumValue>>) -> EnumType {
        let raw_values = composed.map_or(e.values.as_slice(), |c| c.items.as_slice());
        EnumType {
            name: e.name.clone(),
            values: raw_values
                .iter()
                .map(|v| EnumValue {
                    value: v.value.clone(),
                    doc: v.doc.clone(),
                })
                .collect(),
            base_types: self.base_ids(&e.bases),
            doc: e.doc.clone(),
        }
    }
}

pub(crate) fn build_graph(
    decls: &IndexMap<String, RawDecl>,
    actions: &IndexMap<String, RawAction>,
    composition: &Composition,
) -> Result<TypeGraph, Vec<CompileError>> {
    let mut builder = Builder {
        ids: decls
            .keys()
            .enumerate()
            .map(|(i, name)| (name.as_str(), TypeId(i)))
            .collect(),
        errors: Vec::new(),
    };

    let mut graph = TypeGraph::default();
    for (name, decl) in decls {
        let ty = match decl {
            RawDecl::Struct(s) => {
                UserType::Struct(builder.struct_type(s, composition.structs.get(name)))
            }
            RawDecl::Enum(e) => UserType::Enum(builder.enum_type(e, composition.enums.get(name))),
            RawDecl::Typedef(t) => UserType::Typedef(Typedef {
                name: t.name.clone(),
                target: builder.type_ref(&t.spec, &t.prov),
                attr: t.attr.clone(),
                doc: t.doc.clone(),
            }),
        };
        let id = graph.push(ty);
        graph.names.insert(name.clone(), id);
    }

    for action in actions.values() {
        let section = |s: Section| composition.sections.get(&(action.name.clone(), s));

        let input = section_struct(action, Section::Input, action.input.as_ref());
        let input = builder.struct_type(&input, struct_body(section(Section::Input)));
        let output = section_struct(action, Section::Output, action.output.as_ref());
        let output = builder.struct_type(&output, struct_body(section(Section::Output)));
        let errors = match &action.errors {
            Some(e) => e.clone(),
            None => empty_enum(action),
        };
        let errors = builder.enum_type(&errors, enum_body(section(Section::Errors)));

        let input = graph.push(UserType::Struct(input));
        let output = graph.push(UserType::Struct(output));
        let errors = graph.push(UserType::Enum(errors));
        graph.actions.insert(
            action.name.clone(),
            Action {
                name: action.name.clone(),
                input,
                output,
                errors,
                doc: action.doc.clone(),
                doc_group: action.doc_group.clone(),
            },
        );
    }

    if builder.errors.is_empty() {
        Ok(graph)
    } else {
        Err(builder.errors)
    }
}

fn section_struct(action: &RawAction, section: Section, body: Option<&RawStruct>) -> RawStruct {
    match body {
        Some(s) => s.clone(),
        None => RawStruct {
            name: format!("{}_{}", action.name, section.type_suffix()),
            union: false,
            bases: Vec::new(),
            members: Vec::new(),
            doc: Vec::new(),
            prov: action.prov.clone(),
        },
    }
}

fn empty_enum(action: &RawAction) -> RawEnum {
    RawEnum {
        name: format!("{}_{}", action.name, Section::Errors.type_suffix()),
        bases: Vec::new(),
        values: Vec::new(),
        doc: Vec::new(),
        prov: action.prov.clone(),
    }
}

fn struct_body(body: Option<&SectionBody>) -> Option<&Composed<RawMember>> {
    match body {
        Some(SectionBody::Struct(c)) => Some(c),
        _ => None,
    }
}

fn enum_body(body: Option<&SectionBody>) -> Option<&Composed<RawEnumValue>> {
    match body {
        Some(SectionBody::Enum(c)) => Some(c),
        _ => None,
    }
}
