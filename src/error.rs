//! Compiler error types.
//!
//! One variant per row of the error table: every fatal condition the
//! pipeline can hit carries a line number and the detail named for it.
//! `InternalError` is the escape hatch for the "should never happen"
//! category — an exhaustive dispatch missing a case, not a user mistake.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    UnexpectedCharacter { line: usize, ch: char },
    UnexpectedToken { line: usize, lexeme: String },
    ExpectedDelimiter {
        line: usize,
        expected: &'static str,
        found: String,
    },
    ExpectedExpression { line: usize, context: &'static str },
    AssignToBuiltin { line: usize, name: String },
    ReservedNameDeclared { line: usize, name: String },
    DuplicateFunctionDefinition { name: String },
    InternalError(String),
    /// A formatting error surfaced by a backend's `write!`-based renderer.
    Format(fmt::Error),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::UnexpectedCharacter { line, ch } => {
                write!(f, "line {line}: unexpected character '{ch}'")
            }
            CompileError::UnexpectedToken { line, lexeme } => {
                write!(f, "line {line}: unexpected token '{lexeme}'")
            }
            CompileError::ExpectedDelimiter {
                line,
                expected,
                found,
            } => write!(
                f,
                "line {line}: expected '{expected}', found '{found}'"
            ),
            CompileError::ExpectedExpression { line, context } => {
                write!(f, "line {line}: expected expression {context}")
            }
            CompileError::AssignToBuiltin { line, name } => write!(
                f,
                "line {line}: cannot assign to builtin '{name}'"
            ),
            CompileError::ReservedNameDeclared { line, name } => write!(
                f,
                "line {line}: '{name}' is a reserved name and cannot be declared"
            ),
            CompileError::DuplicateFunctionDefinition { name } => {
                write!(f, "duplicate function definition '{name}'")
            }
            CompileError::InternalError(msg) => write!(f, "internal compiler error: {msg}"),
            CompileError::Format(e) => write!(f, "output generation error: {e}"),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<fmt::Error> for CompileError {
    fn from(e: fmt::Error) -> Self {
        CompileError::Format(e)
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_line_number() {
        let err = CompileError::UnexpectedCharacter { line: 3, ch: '@' };
        assert_eq!(err.to_string(), "line 3: unexpected character '@'");
    }

    #[test]
    fn internal_error_is_distinguishable() {
        let err = CompileError::InternalError("missing match arm".into());
        assert!(err.to_string().contains("internal compiler error"));
    }
}
