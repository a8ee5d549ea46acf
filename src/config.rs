//! Compiler configuration: a small builder, the way the teacher's
//! `CompilerConfig` composes optional settings before a compile runs.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitTarget {
    C,
    Sir,
    Both,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompilerConfig {
    pub optimize: bool,
    pub emit: EmitTarget,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            optimize: true,
            emit: EmitTarget::Both,
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    pub fn with_emit(mut self, emit: EmitTarget) -> Self {
        self.emit = emit;
        self
    }

    pub fn wants_c(&self) -> bool {
        matches!(self.emit, EmitTarget::C | EmitTarget::Both)
    }

    pub fn wants_sir(&self) -> bool {
        matches!(self.emit, EmitTarget::Sir | EmitTarget::Both)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_optimizes_and_emits_both() {
        let config = CompilerConfig::default();
        assert!(config.optimize);
        assert_eq!(config.emit, EmitTarget::Both);
    }

    #[test]
    fn builder_methods_override_defaults() {
        let config = CompilerConfig::new().with_optimize(false).with_emit(EmitTarget::Sir);
        assert!(!config.optimize);
        assert!(config.wants_sir());
        assert!(!config.wants_c());
    }
}
