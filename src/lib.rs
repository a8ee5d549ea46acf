//! `tealc`: a whole-program compiler lowering Teal source to portable C
//! and to a textual stack intermediate representation.
//!
//! [`compile_source`] threads a program through every stage in order:
//! tokenize, parse, desugar, normalize, convert, generate SIR, optimize,
//! then render whichever backends [`CompilerConfig`] asks for. Each stage
//! is wrapped in a `tracing::debug_span!` so `RUST_LOG=tealc=debug` shows
//! the size of the tree at every boundary.

pub mod ast;
pub mod backend;
pub mod builtins;
pub mod config;
pub mod convert;
pub mod desugar;
pub mod error;
pub mod normalize;
pub mod optimize;
pub mod parser;
pub mod sir;
pub mod sirgen;
pub mod token;

use std::collections::HashSet;

pub use config::{CompilerConfig, EmitTarget};
pub use error::{CompileError, Result};

/// The rendered output of a compile run; either channel is `None` when
/// [`CompilerConfig::emit`] didn't ask for it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompileOutput {
    pub c_source: Option<String>,
    pub sir_text: Option<String>,
}

pub fn compile_source(source: &str, config: &CompilerConfig) -> Result<CompileOutput> {
    let tokens = tracing::debug_span!("tokenize").in_scope(|| {
        let tokens = token::tokenize(source)?;
        tracing::debug!(token_count = tokens.len(), "tokenized");
        Ok::<_, CompileError>(tokens)
    })?;

    let program = tracing::debug_span!("parse").in_scope(|| {
        let program = parser::Parser::parse_tokens(tokens)?;
        tracing::debug!(statement_count = program.statements.len(), "parsed");
        Ok::<_, CompileError>(program)
    })?;

    check_no_duplicate_functions(&program)?;

    let desugared = tracing::debug_span!("desugar")
        .in_scope(|| desugar::desugar_program(program));
    tracing::debug!(statement_count = desugared.statements.len(), "desugared");

    let normalized = tracing::debug_span!("normalize")
        .in_scope(|| normalize::normalize_program(desugared));
    tracing::debug!(statement_count = normalized.statements.len(), "normalized");

    let converted = tracing::debug_span!("convert")
        .in_scope(|| convert::convert_program(normalized));
    tracing::debug!(statement_count = converted.statements.len(), "converted");

    let mut sir_program = tracing::debug_span!("sirgen").in_scope(|| sirgen::generate(converted))?;
    tracing::debug!(instruction_count = sir_program.instruction_count(), "generated SIR");

    if config.optimize {
        sir_program = tracing::debug_span!("optimize").in_scope(|| optimize::optimize(sir_program));
        tracing::debug!(instruction_count = sir_program.instruction_count(), "optimized");
    }

    let c_source = if config.wants_c() {
        Some(tracing::debug_span!("emit_c").in_scope(|| backend::c_emit::emit(&sir_program))?)
    } else {
        None
    };

    let sir_text = if config.wants_sir() {
        Some(tracing::debug_span!("emit_sir").in_scope(|| backend::sir_text::render(&sir_program))?)
    } else {
        None
    };

    Ok(CompileOutput { c_source, sir_text })
}

pub fn compile_file(path: &std::path::Path, config: &CompilerConfig) -> Result<CompileOutput> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| CompileError::InternalError(format!("reading {}: {e}", path.display())))?;
    compile_source(&source, config)
}

/// Where the C backend's output goes for a given source path: `.c`
/// appended to the full path, not substituted for an existing extension,
/// so `program.tl` writes to `program.tl.c` rather than `program.c`.
pub fn c_output_path(source: &std::path::Path) -> std::path::PathBuf {
    let mut name = source.as_os_str().to_os_string();
    name.push(".c");
    std::path::PathBuf::from(name)
}

fn check_no_duplicate_functions(program: &ast::Program) -> Result<()> {
    for statements in program.statement_lists() {
        let mut seen = HashSet::new();
        for name in ast::function_names_in(statements) {
            if !seen.insert(name) {
                return Err(CompileError::DuplicateFunctionDefinition {
                    name: name.to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_trivial_program_to_both_channels() {
        let config = CompilerConfig::default();
        let output = compile_source("x = 1 + 2", &config).unwrap();
        assert!(output.c_source.is_some());
        assert!(output.sir_text.is_some());
    }

    #[test]
    fn duplicate_function_definitions_are_rejected() {
        let config = CompilerConfig::default();
        let err = compile_source("def f(a) do a end\ndef f(b) do b end", &config).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateFunctionDefinition { name } if name == "f"));
    }

    #[test]
    fn duplicate_function_definitions_in_a_nested_body_are_rejected() {
        let config = CompilerConfig::default();
        let err = compile_source(
            "def outer(a) do\ndef g(x) do x end\ndef g(y) do y end\ng(a)\nend",
            &config,
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::DuplicateFunctionDefinition { name } if name == "g"));
    }

    #[test]
    fn same_name_in_disjoint_scopes_is_not_a_duplicate() {
        let config = CompilerConfig::default();
        let output = compile_source(
            "def f(a) do a end\nif 1 < 2 do\ndef f(a) do a end\nend",
            &config,
        )
        .unwrap();
        assert!(output.c_source.is_some());
    }

    #[test]
    fn emit_target_sir_only_skips_c_rendering() {
        let config = CompilerConfig::new().with_emit(EmitTarget::Sir);
        let output = compile_source("x = 1", &config).unwrap();
        assert!(output.c_source.is_none());
        assert!(output.sir_text.is_some());
    }

    #[test]
    fn c_output_path_appends_rather_than_replaces_extension() {
        let path = std::path::Path::new("program.tl");
        assert_eq!(c_output_path(path), std::path::PathBuf::from("program.tl.c"));
    }
}
