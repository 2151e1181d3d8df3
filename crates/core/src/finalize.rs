//! Finalize: run the post-parse passes and build the type graph.

use crate::error::CompilerError;
use crate::model::TypeGraph;
use crate::parser::SpecParser;
use crate::pass2_resolve::run_deferred;
use crate::pass3_bases::detect_base_cycles;
use crate::pass4_compose::{build_graph, compose};

impl SpecParser {
    /// Resolve everything parsed so far.
    ///
    /// Errors are reported in pass order: parse errors, deferred checks,
    /// base cycles, then inheritance redefinitions. The parser is left
    /// untouched, so finalize may be called again after more `parse` calls.
    pub fn finalize(&self) -> Result<TypeGraph, CompilerError> {
        let mut errors = self.errors.clone();
        errors.extend(run_deferred(&self.types, &self.deferred));

        let cycles = detect_base_cycles(&self.types);
        errors.extend(cycles.errors);

        let composition = compose(&self.types, &self.actions, &cycles.cyclic);
        errors.extend(composition.errors.iter().cloned());

        tracing::debug!(
            types = self.types.len(),
            actions = self.actions.len(),
            errors = errors.len(),
            "finalized spec"
        );

        if !errors.is_empty() {
            return Err(CompilerError { errors });
        }
        build_graph(&self.types, &self.actions, &composition)
            .map_err(|errors| CompilerError { errors })
    }
}
