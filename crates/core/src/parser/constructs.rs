use indexmap::IndexMap;

use super::types::Cursor;
use super::{LineParser, Scope};
use crate::ast::{
    Provenance, RawAction, RawDecl, RawEnum, RawEnumValue, RawMember, RawStruct, RawTypeSpec,
    RawTypedef, Section,
};
use crate::model::{Attr, BuiltinType};
use crate::pass2_resolve::{BaseRole, Check};

impl<'p> LineParser<'p> {
    // -- Top-level declarations ---------------------------------

    pub(super) fn define_struct(
        &mut self,
        c: &mut Cursor<'_>,
        union: bool,
        doc: Vec<String>,
        prov: &Provenance,
    ) -> Option<()> {
        let name = c.take_ident()?;
        let bases = if union { Vec::new() } else { c.parse_base_list()? };
        c.finish()?;

        self.register_type(
            RawDecl::Struct(RawStruct {
                name: name.clone(),
                union,
                bases: bases.clone(),
                members: Vec::new(),
                doc,
                prov: prov.clone(),
            }),
            prov,
        );
        self.submit_bases(BaseRole::Struct, &bases, prov);
        self.scope = Scope::Struct(name);
        Some(())
    }

    pub(super) fn define_enum(
        &mut self,
        c: &mut Cursor<'_>,
        doc: Vec<String>,
        prov: &Provenance,
    ) -> Option<()> {
        let name = c.take_ident()?;
        let bases = c.parse_base_list()?;
        c.finish()?;

        self.register_type(
            RawDecl::Enum(RawEnum {
                name: name.clone(),
                bases: bases.clone(),
                values: Vec::new(),
                doc,
                prov: prov.clone(),
            }),
            prov,
        );
        self.submit_bases(BaseRole::Enum, &bases, prov);
        self.scope = Scope::Enum(name);
        Some(())
    }

    pub(super) fn define_typedef(
        &mut self,
        c: &mut Cursor<'_>,
        doc: Vec<String>,
        prov: &Provenance,
    ) -> Option<()> {
        let (spec, attr) = c.parse_typespec()?;
        let name = c.take_ident()?;
        c.finish()?;

        self.register_type(
            RawDecl::Typedef(RawTypedef {
                name,
                spec: spec.clone(),
                attr: attr.clone(),
                doc,
                prov: prov.clone(),
            }),
            prov,
        );
        self.spec.submit_usage(&spec, attr.as_ref(), prov);
        self.scope = Scope::None;
        Some(())
    }

    pub(super) fn define_action(
        &mut self,
        c: &mut Cursor<'_>,
        doc: Vec<String>,
        prov: &Provenance,
    ) -> Option<()> {
        let name = c.take_ident()?;
        c.finish()?;

        if self.spec.actions.contains_key(&name) {
            self.spec
                .error(prov, format!("Redefinition of action '{}'", name));
        }
        self.spec.actions.insert(
            name.clone(),
            RawAction {
                name: name.clone(),
                input: None,
                output: None,
                errors: None,
                doc,
                doc_group: None,
                prov: prov.clone(),
            },
        );
        self.scope = Scope::Action {
            name,
            section: None,
        };
        Some(())
    }

    /// Insert a named declaration; a redefinition replaces the earlier one.
    fn register_type(&mut self, decl: RawDecl, prov: &Provenance) {
        let name = decl.name().to_owned();
        if self.spec.types.contains_key(&name) {
            self.spec
                .error(prov, format!("Redefinition of type '{}'", name));
        }
        self.spec.types.insert(name, decl);
    }

    fn submit_bases(&mut self, role: BaseRole, bases: &[String], prov: &Provenance) {
        for base in bases {
            if BuiltinType::from_keyword(base).is_none() {
                self.spec.submit(Check::Known(base.clone()), prov);
            }
            self.spec.submit(
                Check::Base {
                    role,
                    name: base.clone(),
                },
                prov,
            );
        }
    }

    // -- Body lines ---------------------------------------------

    pub(super) fn section(
        &mut self,
        section: Section,
        bases: Vec<String>,
        doc: Vec<String>,
        prov: &Provenance,
    ) {
        let Scope::Action { name, section: active } = &mut self.scope else {
            self.spec.error(prov, "Action section outside of action scope");
            return;
        };
        let Some(action) = self.spec.actions.get_mut(name.as_str()) else {
            return;
        };

        let type_name = format!("{}_{}", action.name, section.type_suffix());
        let defined = match section {
            Section::Input => action.input.is_some(),
            Section::Output => action.output.is_some(),
            Section::Errors => action.errors.is_some(),
        };
        if defined {
            *active = None;
            self.spec.error(
                prov,
                format!("Redefinition of action {}", section.keyword()),
            );
            return;
        }

        match section {
            Section::Input | Section::Output => {
                let body = Some(RawStruct {
                    name: type_name,
                    union: false,
                    bases: bases.clone(),
                    members: Vec::new(),
                    doc,
                    prov: prov.clone(),
                });
                if section == Section::Input {
                    action.input = body;
                } else {
                    action.output = body;
                }
            }
            Section::Errors => {
                action.errors = Some(RawEnum {
                    name: type_name,
                    bases: bases.clone(),
                    values: Vec::new(),
                    doc,
                    prov: prov.clone(),
                });
            }
        }
        *active = Some(section);
        self.submit_bases(BaseRole::Action(section), &bases, prov);
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn member(
        &mut self,
        name: String,
        spec: RawTypeSpec,
        attr: Option<Attr>,
        optional: bool,
        nullable: bool,
        doc: Vec<String>,
        prov: &Provenance,
    ) {
        let Some(target) = struct_in_scope(&self.scope, &mut self.spec.types, &mut self.spec.actions)
        else {
            self.spec
                .error(prov, "Member definition outside of struct scope");
            return;
        };

        if target.members.iter().any(|m| m.name == name) {
            self.spec
                .error(prov, format!("Redefinition of member '{}'", name));
            return;
        }

        let optional = optional || target.union;
        target.members.push(RawMember {
            name,
            spec: spec.clone(),
            optional,
            nullable,
            attr: attr.clone(),
            doc,
            prov: prov.clone(),
        });
        self.spec.submit_usage(&spec, attr.as_ref(), prov);
    }

    pub(super) fn enum_value(&mut self, value: String, doc: Vec<String>, prov: &Provenance) {
        let Some(target) = enum_in_scope(&self.scope, &mut self.spec.types, &mut self.spec.actions)
        else {
            self.spec
                .error(prov, "Enumeration value outside of enum scope");
            return;
        };

        if target.values.iter().any(|v| v.value == value) {
            self.spec.error(
                prov,
                format!("Redefinition of enumeration value '{}'", value),
            );
            return;
        }
        target.values.push(RawEnumValue { value, doc });
    }
}

fn struct_in_scope<'a>(
    scope: &Scope,
    types: &'a mut IndexMap<String, RawDecl>,
    actions: &'a mut IndexMap<String, RawAction>,
) -> Option<&'a mut RawStruct> {
    match scope {
        Scope::Struct(name) => match types.get_mut(name) {
            Some(RawDecl::Struct(s)) => Some(s),
            _ => None,
        },
        Scope::Action {
            name,
            section: Some(Section::Input),
        } => actions.get_mut(name)?.input.as_mut(),
        Scope::Action {
            name,
            section: Some(Section::Output),
        } => actions.get_mut(name)?.output.as_mut(),
        _ => None,
    }
}

fn enum_in_scope<'a>(
    scope: &Scope,
    types: &'a mut IndexMap<String, RawDecl>,
    actions: &'a mut IndexMap<String, RawAction>,
) -> Option<&'a mut RawEnum> {
    match scope {
        Scope::Enum(name) => match types.get_mut(name) {
            Some(RawDecl::Enum(e)) => Some(e),
            _ => None,
        },
        Scope::Action {
            name,
            section: Some(Section::Errors),
        } => actions.get_mut(name)?.errors.as_mut(),
        _ => None,
    }
}
