use serde::{Deserialize, Serialize};
use std::fmt;

/// A single compiler diagnostic. Displays as `<file>:<line>: error: <message>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompileError {
    pub file: String,
    pub line: u32,
    pub message: String,
}

impl CompileError {
    pub fn new(file: &str, line: u32, message: impl Into<String>) -> Self {
        CompileError {
            file: file.to_owned(),
            line,
            message: message.into(),
        }
    }

    pub fn syntax(file: &str, line: u32) -> Self {
        CompileError::new(file, line, "Syntax error")
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: error: {}", self.file, self.line, self.message)
    }
}

/// Aggregate failure raised by `finalize` when any diagnostic was collected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", render_lines(.errors))]
pub struct CompilerError {
    pub errors: Vec<CompileError>,
}

impl CompilerError {
    /// Rendered diagnostics in report order.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

fn render_lines(errors: &[CompileError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// A runtime validation failure. `member` is the rendered member path, if any.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub member: Option<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>, member: Option<String>) -> Self {
        ValidationError {
            message: message.into(),
            member,
        }
    }
}

/// Errors raised while decoding a query string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryStringError {
    #[error("Invalid key/value pair '{0}'")]
    InvalidPair(String),
    #[error("Duplicate key '{0}'")]
    DuplicateKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_display() {
        let e = CompileError::new("foo.spec", 3, "Syntax error");
        assert_eq!(e.to_string(), "foo.spec:3: error: Syntax error");
        assert_eq!(CompileError::syntax("", 1).to_string(), ":1: error: Syntax error");
    }

    #[test]
    fn compiler_error_joins_lines() {
        let err = CompilerError {
            errors: vec![
                CompileError::new("a", 1, "Syntax error"),
                CompileError::new("a", 2, "Unknown member type 'Foo'"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "a:1: error: Syntax error\na:2: error: Unknown member type 'Foo'"
        );
        assert_eq!(err.messages().len(), 2);
    }

    #[test]
    fn query_string_error_text() {
        assert_eq!(
            QueryStringError::DuplicateKey("a=1".into()).to_string(),
            "Duplicate key 'a=1'"
        );
        assert_eq!(
            QueryStringError::InvalidPair("a".into()).to_string(),
            "Invalid key/value pair 'a'"
        );
    }
}
