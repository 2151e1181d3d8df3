//! Pass 3: circular base type detection.
//!
//! Edges run from a struct or enum to each declared base, and from a typedef
//! to the named type it aliases. Strongly connected components are found
//! with Tarjan's algorithm. Every type on a cycle is reported once, naming the first of its bases
//! that leads back into the cycle.

use indexmap::IndexMap;
use std::collections::HashSet;

use crate::ast::{RawDecl, RawTypeSpec};
use crate::error::CompileError;

pub(crate) struct CycleReport {
    pub cyclic: HashSet<String>,
    pub errors: Vec<CompileError>,
}

pub(crate) fn detect_base_cycles(decls: &IndexMap<String, RawDecl>) -> CycleReport {
    let edges: Vec<Vec<usize>> = decls
        .values()
        .map(|decl| {
            base_names(decl)
                .into_iter()
                .filter_map(|name| decls.get_index_of(name))
                .collect()
        })
        .collect();

    let mut tarjan = Tarjan::new(&edges);
    for node in 0..edges.len() {
        if tarjan.index[node].is_none() {
            tarjan.visit(node);
        }
    }

    let mut component_size = vec![0usize; tarjan.components];
    for &c in &tarjan.component {
        component_size[c] += 1;
    }

    let mut report = CycleReport {
        cyclic: HashSet::new(),
        errors: Vec::new(),
    };
    for (node, decl) in decls.values().enumerate() {
        let c = tarjan.component[node];
        let back_edge = edges[node]
            .iter()
            .find(|&&next| tarjan.component[next] == c && (component_size[c] > 1 || next == node));
        if let Some(&next) = back_edge {
            let prov = decl.prov();
            let base = decls
                .get_index(next)
                .map(|(name, _)| name.as_str())
                .unwrap_or_default();
            report.cyclic.insert(decl.name().to_owned());
            report.errors.push(CompileError::new(
                &prov.file,
                prov.line,
                format!("Circular base type detected for type '{}'", base),
            ));
        }
    }
    report
}

fn base_names(decl: &RawDecl) -> Vec<&str> {
    match decl {
        RawDecl::Struct(s) => s.bases.iter().map(String::as_str).collect(),
        RawDecl::Enum(e) => e.bases.iter().map(String::as_str).collect(),
        RawDecl::Typedef(t) => match &t.spec {
            RawTypeSpec::Named(name) => vec![name.as_str()],
            _ => Vec::new(),
        },
    }
}

struct Tarjan<'e> {
    edges: &'e [Vec<usize>],
    next_index: usize,
    index: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    component: Vec<usize>,
    components: usize,
}

impl<'e> Tarjan<'e> {
    fn new(edges: &'e [Vec<usize>]) -> Self {
        let n = edges.len();
        Tarjan {
            edges,
            next_index: 0,
            index: vec![None; n],
            lowlink: vec![0; n],
            on_stack: vec![false; n],
            stack: Vec::new(),
            component: vec![0; n],
            components: 0,
        }
    }

    fn visit(&mut self, node: usize) {
        self.index[node] = Some(self.next_index);
        self.lowlink[node] = self.next_index;
        self.next_index += 1;
        self.stack.push(node);
        self.on_stack[node] = true;

        let edges = self.edges;
        for &next in &edges[node] {
            match self.index[next] {
                None => {
                    self.visit(next);
                    self.lowlink[node] = self.lowlink[node].min(self.lowlink[next]);
                }
                Some(idx) if self.on_stack[next] => {
                    self.lowlink[node] = self.lowlink[node].min(idx);
                }
                Some(_) => {}
            }
        }

        if Some(self.lowlink[node]) == self.index[node] {
            while let Some(member) = self.stack.pop() {
                self.on_stack[member] = false;
                self.component[member] = self.components;
                if member == node {
                    break;
                }
            }
            self.components += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SpecParser;

    fn cycles(src: &str) -> (Vec<String>, Vec<String>) {
        let mut p = SpecParser::new();
        p.parse(src, "", 1);
        let report = detect_base_cycles(&p.types);
        let mut cyclic: Vec<String> = report.cyclic.into_iter().collect();
        cyclic.sort();
        (
            cyclic,
            report.errors.iter().map(ToString::to_string).collect(),
        )
    }

    #[test]
    fn three_struct_cycle_reports_each_type() {
        let (cyclic, errors) = cycles(
            "struct MyStruct (MyStruct2)\n    int a\n\nstruct MyStruct2 (MyStruct3)\n    int b\n\nstruct MyStruct3 (MyStruct)\n    int c\n",
        );
        assert_eq!(cyclic, vec!["MyStruct", "MyStruct2", "MyStruct3"]);
        assert_eq!(
            errors,
            vec![
                ":1: error: Circular base type detected for type 'MyStruct2'",
                ":4: error: Circular base type detected for type 'MyStruct3'",
                ":7: error: Circular base type detected for type 'MyStruct'",
            ]
        );
    }

    #[test]
    fn self_reference_and_tail_into_cycle() {
        let (cyclic, errors) = cycles("struct A (A)\nstruct B (A)\n");
        assert_eq!(cyclic, vec!["A"]);
        assert_eq!(
            errors,
            vec![":1: error: Circular base type detected for type 'A'"]
        );
    }

    #[test]
    fn cycles_through_typedefs() {
        let (cyclic, _) = cycles("struct A (T)\ntypedef A T\nenum E (F)\nenum F (E)\n");
        assert_eq!(cyclic, vec!["A", "E", "F", "T"]);
    }

    #[test]
    fn diamonds_are_not_cycles() {
        let (cyclic, errors) = cycles("struct A\nstruct B (A)\nstruct C (A)\nstruct D (B, C)\n");
        assert!(cyclic.is_empty());
        assert!(errors.is_empty());
    }
}
