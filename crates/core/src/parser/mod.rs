//! Spec parser: a line-oriented, scope-tracking builder.
//!
//! Declarations are accumulated across any number of `parse` calls and
//! resolved into an immutable [`TypeGraph`] by `finalize`. A malformed line
//! records a diagnostic and scanning continues with the next line, so one
//! pass reports every independent error.
use indexmap::IndexMap;

use crate::ast::{Provenance, RawAction, RawDecl, RawTypeSpec, Section};
use crate::error::{CompileError, CompilerError};
use crate::lexer::{lex, LineKind, SourceLine, Token};
use crate::model::{Attr, TypeGraph};
use crate::pass2_resolve::{evaluate, Check, PendingCheck};

mod constructs;
mod types;

use types::Cursor;

// ──────────────────────────────────────────────
// Builder
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct SpecParser {
    pub(crate) types: IndexMap<String, RawDecl>,
    pub(crate) actions: IndexMap<String, RawAction>,
    pub(crate) errors: Vec<CompileError>,
    pub(crate) deferred: Vec<PendingCheck>,
}

impl SpecParser {
    pub fn new() -> Self {
        SpecParser::default()
    }

    /// Feed spec text. Line numbers in diagnostics start at `start_line`.
    pub fn parse(&mut self, text: &str, filename: &str, start_line: u32) {
        let before = self.errors.len();
        let mut p = LineParser {
            spec: self,
            filename,
            scope: Scope::None,
            doc: Vec::new(),
        };
        for line in lex(text, start_line) {
            p.line(&line);
        }
        tracing::debug!(
            file = filename,
            types = self.types.len(),
            actions = self.actions.len(),
            new_errors = self.errors.len() - before,
            "parsed spec text"
        );
    }

    /// Parse and finalize in one step.
    pub fn parse_and_finalize(
        &mut self,
        text: &str,
        filename: &str,
        start_line: u32,
    ) -> Result<TypeGraph, CompilerError> {
        self.parse(text, filename, start_line);
        self.finalize()
    }

    /// Diagnostics recorded while parsing so far; finalize may add more.
    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }

    /// Declared type names in first-definition order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.types.keys().map(String::as_str)
    }

    pub fn action_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.actions.keys().map(String::as_str)
    }

    /// Assign an action's documentation group, carried into the graph built
    /// by the next `finalize`. Returns `false` if no such action is declared.
    pub fn set_doc_group(&mut self, action: &str, group: impl Into<String>) -> bool {
        match self.actions.get_mut(action) {
            Some(a) => {
                a.doc_group = Some(group.into());
                true
            }
            None => false,
        }
    }

    fn error(&mut self, prov: &Provenance, message: impl Into<String>) {
        self.errors
            .push(CompileError::new(&prov.file, prov.line, message));
    }

    /// Check now if every referenced name is known, otherwise defer to finalize.
    fn submit(&mut self, check: Check, prov: &Provenance) {
        match evaluate(&self.types, &check) {
            Ok(None) => {}
            Ok(Some(message)) => self.error(prov, message),
            Err(_) => self.deferred.push(PendingCheck {
                check,
                prov: prov.clone(),
            }),
        }
    }

    /// Record the checks for one type usage: names, attributes, dict keys.
    fn submit_usage(&mut self, spec: &RawTypeSpec, attr: Option<&Attr>, prov: &Provenance) {
        for name in spec.named_refs() {
            self.submit(Check::Known(name.to_owned()), prov);
        }
        self.submit_attrs(spec, attr, prov);
    }

    fn submit_attrs(&mut self, spec: &RawTypeSpec, attr: Option<&Attr>, prov: &Provenance) {
        if let Some(attr) = attr {
            self.submit(
                Check::Attr {
                    target: spec.clone(),
                    attr: attr.clone(),
                },
                prov,
            );
        }
        match spec {
            RawTypeSpec::Array {
                element,
                element_attr,
            } => self.submit_attrs(element, element_attr.as_ref(), prov),
            RawTypeSpec::Dict {
                key,
                key_attr,
                value,
                value_attr,
            } => {
                self.submit(Check::DictKey((**key).clone()), prov);
                self.submit_attrs(key, key_attr.as_ref(), prov);
                self.submit_attrs(value, value_attr.as_ref(), prov);
            }
            RawTypeSpec::Builtin(_) | RawTypeSpec::Named(_) => {}
        }
    }
}

// ──────────────────────────────────────────────
// Line parser
// ──────────────────────────────────────────────

/// The declaration body lines currently attach to.
#[derive(Debug, Clone, PartialEq)]
enum Scope {
    None,
    Struct(String),
    Enum(String),
    Action {
        name: String,
        section: Option<Section>,
    },
}

struct LineParser<'p> {
    spec: &'p mut SpecParser,
    filename: &'p str,
    scope: Scope,
    doc: Vec<String>,
}

impl<'p> LineParser<'p> {
    fn line(&mut self, line: &SourceLine) {
        let prov = Provenance {
            file: self.filename.to_owned(),
            line: line.line,
        };
        match &line.kind {
            LineKind::Blank => self.doc.clear(),
            LineKind::Hidden => {}
            LineKind::Doc(text) => self.doc.push(text.clone()),
            LineKind::Invalid => {
                self.doc.clear();
                self.spec.error(&prov, "Syntax error");
            }
            LineKind::Code { indented, tokens } => {
                let doc = std::mem::take(&mut self.doc);
                let parsed = if *indented {
                    self.body_line(tokens, doc, &prov)
                } else {
                    self.definition_line(tokens, doc, &prov)
                };
                if parsed.is_none() {
                    self.spec.error(&prov, "Syntax error");
                }
            }
        }
    }

    fn definition_line(
        &mut self,
        tokens: &[Token],
        doc: Vec<String>,
        prov: &Provenance,
    ) -> Option<()> {
        let mut c = Cursor::new(tokens);
        if c.eat_word("struct") {
            self.define_struct(&mut c, false, doc, prov)
        } else if c.eat_word("union") {
            self.define_struct(&mut c, true, doc, prov)
        } else if c.eat_word("enum") {
            self.define_enum(&mut c, doc, prov)
        } else if c.eat_word("typedef") {
            self.define_typedef(&mut c, doc, prov)
        } else if c.eat_word("action") {
            self.define_action(&mut c, doc, prov)
        } else {
            None
        }
    }

    /// Section, enum value, or member line; anything else is a syntax error.
    fn body_line(&mut self, tokens: &[Token], doc: Vec<String>, prov: &Provenance) -> Option<()> {
        if let Some(Token::Word(word)) = tokens.first() {
            if let Some(section) = Section::from_keyword(word) {
                let mut c = Cursor::new(&tokens[1..]);
                if let Some(bases) = c.parse_base_list() {
                    if c.at_end() {
                        self.section(section, bases, doc, prov);
                        return Some(());
                    }
                }
            }
        }

        if let [single] = tokens {
            let value = match single {
                Token::Str(s) => Some(s.clone()),
                Token::Word(_) => Cursor::new(tokens).take_ident(),
                _ => None,
            };
            if let Some(value) = value {
                self.enum_value(value, doc, prov);
                return Some(());
            }
        }

        let mut c = Cursor::new(tokens);
        let optional = c.eat_word("optional");
        let nullable = c.eat_word("nullable");
        let (spec, attr) = c.parse_typespec()?;
        let name = c.take_ident()?;
        c.finish()?;
        self.member(name, spec, attr, optional, nullable, doc, prov);
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> SpecParser {
        let mut p = SpecParser::new();
        p.parse(src, "", 1);
        p
    }

    fn messages(p: &SpecParser) -> Vec<String> {
        p.errors().iter().map(ToString::to_string).collect()
    }

    #[test]
    fn scope_errors() {
        let p = parse(
            "action MyAction\n\nstruct MyStruct\n    int a\n\n    input\n    output\n    errors\n\ninput\noutput\nerrors\n",
        );
        assert_eq!(
            messages(&p),
            vec![
                ":6: error: Action section outside of action scope",
                ":7: error: Action section outside of action scope",
                ":8: error: Action section outside of action scope",
                ":10: error: Syntax error",
                ":11: error: Syntax error",
                ":12: error: Syntax error",
            ]
        );
        assert_eq!(p.type_names().count(), 1);
        assert_eq!(p.action_names().count(), 1);
    }

    #[test]
    fn member_and_value_outside_scope() {
        let p = parse("    string a\nenum E\n    int b\nstruct S\n    Foo\n");
        assert_eq!(
            messages(&p),
            vec![
                ":1: error: Member definition outside of struct scope",
                ":3: error: Member definition outside of struct scope",
                ":5: error: Enumeration value outside of enum scope",
            ]
        );
    }

    #[test]
    fn redefinitions_within_a_declaration() {
        let p = parse("struct S\n    int a\n    string a\nenum E\n    bar\n    \"bar\"\n");
        assert_eq!(
            messages(&p),
            vec![
                ":3: error: Redefinition of member 'a'",
                ":6: error: Redefinition of enumeration value 'bar'",
            ]
        );
    }

    #[test]
    fn redefined_type_replaces_the_earlier_one() {
        let p = parse("struct Foo\n    int a\nenum Foo\n    A\n");
        assert_eq!(messages(&p), vec![":3: error: Redefinition of type 'Foo'"]);
        assert!(matches!(p.types.get("Foo"), Some(RawDecl::Enum(_))));
    }

    #[test]
    fn section_redefinition_drops_the_active_section() {
        let p = parse("action Foo\n    input\n        int a\n    output\n        int b\n    input\n        int c\n");
        assert_eq!(
            messages(&p),
            vec![
                ":6: error: Redefinition of action input",
                ":7: error: Member definition outside of struct scope",
            ]
        );
    }

    #[test]
    fn nullable_before_optional_is_a_syntax_error() {
        let p = parse("struct S\n    nullable optional int a\n");
        assert_eq!(messages(&p), vec![":2: error: Syntax error"]);
    }

    #[test]
    fn forward_references_are_deferred() {
        let p = parse("struct S\n    Later a\n    Later(len > 0) b\n");
        assert!(p.errors().is_empty());
        assert_eq!(p.deferred.len(), 3);
    }

    #[test]
    fn known_references_are_checked_immediately() {
        let p = parse("enum E\n    A\nstruct S (E)\n    E(< 2) a\n    int : string{} b\n");
        assert_eq!(
            messages(&p),
            vec![
                ":3: error: Invalid struct base type 'E'",
                ":4: error: Invalid attribute '< 2'",
                ":5: error: Invalid dictionary key type",
            ]
        );
        assert!(p.deferred.is_empty());
    }

    #[test]
    fn doc_comments_attach_to_the_next_line() {
        let p = parse("# Struct doc\n#\n#- hidden\nstruct S\n    # Member doc\n    int a\n\n    # dropped\n\n    int b\n");
        let Some(RawDecl::Struct(s)) = p.types.get("S") else {
            panic!("expected struct");
        };
        assert_eq!(s.doc, vec!["Struct doc".to_owned(), String::new()]);
        assert_eq!(s.members[0].doc, vec!["Member doc".to_owned()]);
        assert!(s.members[1].doc.is_empty());
    }
}
