//! End-to-end scenarios: compile a program and check properties of the
//! rendered SIR and/or C output, rather than re-deriving the whole tree.

use tealc::{CompilerConfig, EmitTarget};

fn compile_sir(source: &str) -> String {
    let config = CompilerConfig::new().with_emit(EmitTarget::Sir);
    tealc::compile_source(source, &config).unwrap().sir_text.unwrap()
}

fn compile_sir_unoptimized(source: &str) -> String {
    let config = CompilerConfig::new().with_emit(EmitTarget::Sir).with_optimize(false);
    tealc::compile_source(source, &config).unwrap().sir_text.unwrap()
}

#[test]
fn print_call_pushes_the_string_then_calls_print() {
    let sir = compile_sir("print('Hello, world')");
    assert!(sir.contains("push_value"));
    assert!(sir.contains("push sym(print)"));
    assert!(sir.contains("call 1"));
    // The call's result is an unused expression statement, so it's dropped,
    // and the program as a whole always terminates with `end`.
    assert!(sir.contains("drop"));
    assert!(sir.trim_end().ends_with("end"));
}

#[test]
fn arithmetic_respects_precedence() {
    // 1 + 2 * 3: the multiplication must bind to a fresh variable that the
    // addition then reads, not the other way around.
    let sir = compile_sir("x = 1 + 2 * 3");
    let multiply_line = sir.lines().position(|l| l.contains("sym(__multiply__)")).unwrap();
    let add_line = sir.lines().position(|l| l.contains("sym(__add__)")).unwrap();
    assert!(multiply_line < add_line);
}

#[test]
fn comparison_chain_reuses_the_shared_middle_operand() {
    let sir = compile_sir("1 < 2 < 3");
    // Exactly two comparisons happen ($0=1<2, $1=2<3): "2" is pushed as a
    // literal value only once.
    let literal_pushes = sir.lines().filter(|l| l.trim_start().starts_with("push_value 2")).count();
    assert_eq!(literal_pushes, 1);
    assert!(sir.contains("sym(__lt__)"));
}

#[test]
fn if_expression_as_rhs_produces_if_else_labels() {
    let sir = compile_sir("x = if a do 1 else 2 end");
    assert!(sir.contains("__if$0__:"));
    assert!(sir.contains("__else$0__:"));
    assert!(sir.contains("__endif$0__:"));
    assert!(sir.contains("jump_if_false"));
}

#[test]
fn function_definition_and_call_site_reverse_pop_order() {
    let sir = compile_sir_unoptimized("def add(a, b) do a + b end\ny = add(1, 2)");
    let add_label = sir.lines().position(|l| l == "add$0:").unwrap();
    let after = &sir.lines().collect::<Vec<_>>()[add_label + 1..];
    // Parameters are bound in reverse of declaration order (b popped first,
    // since the callee is on top of the stack above both arguments).
    let pop_b = after.iter().position(|l| l.contains("pop sym(b)")).unwrap();
    let pop_a = after.iter().position(|l| l.contains("pop sym(a)")).unwrap();
    assert!(pop_b < pop_a);
}

#[test]
fn optimizer_elides_push_then_drop_and_dead_pops() {
    let unoptimized = compile_sir_unoptimized("x = 1\n1");
    let optimized = compile_sir("x = 1\n1");
    assert!(unoptimized.contains("drop"));
    // The bare literal statement "1" becomes push_value+drop with nothing
    // in between, which the first optimizer pass removes entirely.
    let drop_count_before = unoptimized.matches("drop").count();
    let drop_count_after = optimized.matches("drop").count();
    assert!(drop_count_after < drop_count_before);
}

#[test]
fn duplicate_function_definitions_fail_to_compile() {
    let config = CompilerConfig::default();
    let err = tealc::compile_source("def f() do 1 end\ndef f() do 2 end", &config).unwrap_err();
    assert!(matches!(err, tealc::CompileError::DuplicateFunctionDefinition { .. }));
}

#[test]
fn assigning_to_a_builtin_name_fails_to_compile() {
    let config = CompilerConfig::default();
    let err = tealc::compile_source("print = 1", &config).unwrap_err();
    assert!(matches!(err, tealc::CompileError::AssignToBuiltin { .. }));
}

#[test]
fn both_channels_are_emitted_by_default() {
    let config = CompilerConfig::default();
    let output = tealc::compile_source("x = 1", &config).unwrap();
    assert!(output.c_source.is_some());
    assert!(output.sir_text.is_some());
    assert!(output.c_source.unwrap().contains("int main(void)"));
}

#[test]
fn compiled_c_output_is_written_next_to_the_source_with_an_appended_extension() {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("program.tl");
    std::fs::write(&source_path, "print('hi')").unwrap();

    let config = CompilerConfig::default();
    let output = tealc::compile_file(&source_path, &config).unwrap();
    let out_path = tealc::c_output_path(&source_path);
    std::fs::write(&out_path, output.c_source.unwrap()).unwrap();

    assert_eq!(out_path, dir.path().join("program.tl.c"));
    assert!(out_path.exists());
    let written = std::fs::read_to_string(&out_path).unwrap();
    assert!(written.contains("int main(void)"));
}
