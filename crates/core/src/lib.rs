#![allow(clippy::result_large_err)]
//! actionspec-core: action spec compiler and runtime type model.
//!
//! Compiles the action spec language into an immutable [`TypeGraph`] of
//! structs, unions, enums, typedefs, and actions, and validates runtime
//! values against it.
//!
//! # Public API
//!
//! - [`SpecParser`] -- accumulate spec text with `parse`, resolve with
//!   `finalize`
//! - [`TypeGraph`] -- resolved registry; [`TypeGraph::validate`] checks a
//!   [`Value`] under a [`ValidationMode`]
//! - [`query_string`] -- nested value query-string codec
//! - [`json`] -- JSON parsing, output rendering, and `Serialize` for [`Value`]
//! - [`Action`] -- request decoding and response checking contracts
//! - Errors: [`CompileError`], [`CompilerError`], [`ValidationError`],
//!   [`QueryStringError`], [`ActionError`]
//!
//! Compilation runs as numbered passes: the parser records declarations
//! and immediate checks, pass 2 runs deferred reference checks, pass 3
//! detects base type cycles, and pass 4 composes inherited members and
//! builds the graph.

pub mod action;
pub mod ast;
pub mod error;
mod finalize;
pub mod json;
pub mod lexer;
pub mod model;
pub mod parser;
mod pass2_resolve;
mod pass3_bases;
mod pass4_compose;
pub mod query_string;

// ── Convenience re-exports: key types ────────────────────────────────

pub use action::ActionError;
pub use error::{CompileError, CompilerError, QueryStringError, ValidationError};
pub use model::{
    Action, Attr, AttrOp, BuiltinType, EnumType, EnumValue, MemberPath, RenderedKind,
    RenderedScalar, StructMember, StructType, TypeGraph, TypeId, TypeRef, Typedef, UserType,
    ValidationMode, Value,
};
pub use parser::SpecParser;

// ── Convenience re-exports: entry points ─────────────────────────────

pub use json::{parse_json, render_output};

/// Parse and finalize a single spec text.
pub fn compile(text: &str, filename: &str) -> Result<TypeGraph, CompilerError> {
    SpecParser::new().parse_and_finalize(text, filename, 1)
}
