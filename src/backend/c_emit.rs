//! C backend: lowers an optimized [`SirProgram`] to a single portable C
//! translation unit.
//!
//! The stack machine the SIR describes is transliterated almost literally:
//! every top-level label (a function definition or `__main__`) becomes its
//! own C function operating on a small value stack, and `if`/`else`
//! labels become local `goto` targets within that function — SIR never
//! jumps across a function boundary, so this split is exact, not a
//! heuristic over otherwise-arbitrary code. Rendering goes through named
//! slots (`standard_libraries`, `symbol_list`, `string_literal_list`,
//! `builtins`, `function_definition_list`, `operator_declarations`,
//! `statements`) the way the teacher's template-based emitter does,
//! except built with `std::fmt::Write` rather than a templating crate.

use std::collections::BTreeSet;
use std::fmt::Write;

use crate::builtins::headers_for;
use crate::error::Result;
use crate::sir::{Entry, Instruction, Literal, Op, Operand, SirProgram};

const BASE_HEADERS: &[&str] = &["stdint.h", "stdio.h", "stdlib.h", "string.h"];

const RUNTIME_PREAMBLE: &str = r#"
typedef enum {
    TAG_INT,
    TAG_STRING,
    TAG_BOOL,
    TAG_CLOSURE,
    TAG_LIST,
    TAG_STRUCT,
    TAG_UNIT,
} ObjectTag;

typedef struct Object Object;

typedef Object (*ClosureFn)(void);

struct Object {
    ObjectTag tag;
    union {
        int64_t integer;
        const char *string;
        int boolean;
        ClosureFn closure;
        struct { Object *items; size_t count; } list;
        struct { const char **keys; Object *values; size_t count; } strct;
    } as;
};

#define STACK_CAPACITY 4096
static Object vm_stack[STACK_CAPACITY];
static size_t vm_sp = 0;

static void vm_push(Object value) {
    if (vm_sp >= STACK_CAPACITY) {
        fprintf(stderr, "teal: value stack overflow\n");
        exit(1);
    }
    vm_stack[vm_sp++] = value;
}

static Object vm_pop(void) {
    if (vm_sp == 0) {
        fprintf(stderr, "teal: value stack underflow\n");
        exit(1);
    }
    return vm_stack[--vm_sp];
}

static Object make_int(int64_t value) {
    Object o;
    o.tag = TAG_INT;
    o.as.integer = value;
    return o;
}

static Object make_string(const char *value) {
    Object o;
    o.tag = TAG_STRING;
    o.as.string = value;
    return o;
}

static Object make_bool(int value) {
    Object o;
    o.tag = TAG_BOOL;
    o.as.boolean = value;
    return o;
}

static Object make_unit(void) {
    Object o;
    o.tag = TAG_UNIT;
    return o;
}

static Object make_closure(ClosureFn fn) {
    Object o;
    o.tag = TAG_CLOSURE;
    o.as.closure = fn;
    return o;
}

static Object make_list(Object *items, size_t count) {
    Object o;
    o.tag = TAG_LIST;
    o.as.list.items = items;
    o.as.list.count = count;
    return o;
}

static Object make_struct(const char **keys, Object *values, size_t count) {
    Object o;
    o.tag = TAG_STRUCT;
    o.as.strct.keys = keys;
    o.as.strct.values = values;
    o.as.strct.count = count;
    return o;
}

static int is_truthy(Object value) {
    switch (value.tag) {
        case TAG_BOOL:
            return value.as.boolean;
        case TAG_UNIT:
            return 0;
        default:
            return 1;
    }
}

static void teal_type_error(const char *what) {
    fprintf(stderr, "teal: type error in %s\n", what);
    exit(1);
}
"#;

const BUILTIN_DEFINITIONS: &str = r#"
static Object builtin_print(Object *args, size_t argc) {
    if (argc != 1) teal_type_error("print");
    switch (args[0].tag) {
        case TAG_INT:
            printf("%lld\n", (long long)args[0].as.integer);
            break;
        case TAG_STRING:
            printf("%s\n", args[0].as.string);
            break;
        case TAG_BOOL:
            printf("%s\n", args[0].as.boolean ? "true" : "false");
            break;
        case TAG_UNIT:
            printf("unit\n");
            break;
        default:
            printf("<object>\n");
            break;
    }
    return make_unit();
}

static Object builtin_pow(Object *args, size_t argc) {
    if (argc != 2 || args[0].tag != TAG_INT || args[1].tag != TAG_INT) teal_type_error("pow");
    int64_t base = args[0].as.integer;
    int64_t exponent = args[1].as.integer;
    int64_t result = 1;
    for (int64_t i = 0; i < exponent; i++) result *= base;
    return make_int(result);
}

static Object builtin_add(Object *args, size_t argc) {
    if (argc != 2 || args[0].tag != TAG_INT || args[1].tag != TAG_INT) teal_type_error("__add__");
    return make_int(args[0].as.integer + args[1].as.integer);
}

static Object builtin_subtract(Object *args, size_t argc) {
    if (argc != 2 || args[0].tag != TAG_INT || args[1].tag != TAG_INT) teal_type_error("__subtract__");
    return make_int(args[0].as.integer - args[1].as.integer);
}

static Object builtin_multiply(Object *args, size_t argc) {
    if (argc != 2 || args[0].tag != TAG_INT || args[1].tag != TAG_INT) teal_type_error("__multiply__");
    return make_int(args[0].as.integer * args[1].as.integer);
}

static Object builtin_integer_divide(Object *args, size_t argc) {
    if (argc != 2 || args[0].tag != TAG_INT || args[1].tag != TAG_INT) teal_type_error("__integer_divide__");
    return make_int(args[0].as.integer / args[1].as.integer);
}

static Object builtin_modular_divide(Object *args, size_t argc) {
    if (argc != 2 || args[0].tag != TAG_INT || args[1].tag != TAG_INT) teal_type_error("__modular_divide__");
    return make_int(args[0].as.integer % args[1].as.integer);
}

static Object builtin_concat(Object *args, size_t argc) {
    if (argc != 2 || args[0].tag != TAG_STRING || args[1].tag != TAG_STRING) teal_type_error("__concat__");
    size_t len = strlen(args[0].as.string) + strlen(args[1].as.string) + 1;
    char *buf = malloc(len);
    if (!buf) teal_type_error("__concat__ allocation");
    snprintf(buf, len, "%s%s", args[0].as.string, args[1].as.string);
    return make_string(buf);
}

static Object builtin_lt(Object *args, size_t argc) {
    if (argc != 2 || args[0].tag != TAG_INT || args[1].tag != TAG_INT) teal_type_error("__lt__");
    return make_bool(args[0].as.integer < args[1].as.integer);
}

static Object builtin_gt(Object *args, size_t argc) {
    if (argc != 2 || args[0].tag != TAG_INT || args[1].tag != TAG_INT) teal_type_error("__gt__");
    return make_bool(args[0].as.integer > args[1].as.integer);
}

static Object builtin_lte(Object *args, size_t argc) {
    if (argc != 2 || args[0].tag != TAG_INT || args[1].tag != TAG_INT) teal_type_error("__lte__");
    return make_bool(args[0].as.integer <= args[1].as.integer);
}

static Object builtin_gte(Object *args, size_t argc) {
    if (argc != 2 || args[0].tag != TAG_INT || args[1].tag != TAG_INT) teal_type_error("__gte__");
    return make_bool(args[0].as.integer >= args[1].as.integer);
}

static Object builtin_eq(Object *args, size_t argc) {
    if (argc != 2) teal_type_error("__eq__");
    if (args[0].tag != args[1].tag) return make_bool(0);
    switch (args[0].tag) {
        case TAG_INT:
            return make_bool(args[0].as.integer == args[1].as.integer);
        case TAG_STRING:
            return make_bool(strcmp(args[0].as.string, args[1].as.string) == 0);
        case TAG_BOOL:
            return make_bool(args[0].as.boolean == args[1].as.boolean);
        default:
            return make_bool(0);
    }
}

static Object builtin_neq(Object *args, size_t argc) {
    Object eq = builtin_eq(args, argc);
    return make_bool(!eq.as.boolean);
}

static Object builtin_negate(Object *args, size_t argc) {
    if (argc != 1 || args[0].tag != TAG_INT) teal_type_error("__negate__");
    return make_int(-args[0].as.integer);
}

static Object builtin_field(Object *args, size_t argc) {
    if (argc != 2 || args[0].tag != TAG_STRUCT || args[1].tag != TAG_STRING) teal_type_error("__field__");
    for (size_t i = 0; i < args[0].as.strct.count; i++) {
        if (strcmp(args[0].as.strct.keys[i], args[1].as.string) == 0) {
            return args[0].as.strct.values[i];
        }
    }
    teal_type_error("__field__ (no such field)");
    return make_unit();
}

static Object builtin_get(Object *args, size_t argc) {
    if (argc != 2 || args[0].tag != TAG_LIST || args[1].tag != TAG_INT) teal_type_error("__get__");
    int64_t index = args[1].as.integer;
    if (index < 0 || (size_t)index >= args[0].as.list.count) teal_type_error("__get__ (index out of range)");
    return args[0].as.list.items[index];
}
"#;

struct ChunkBuilder {
    /// distinct `sym(...)` names, in first-seen order for readability.
    symbols: Vec<String>,
    /// distinct string literal bodies, in first-seen order.
    strings: Vec<String>,
    /// headers pulled in by builtin names actually pushed as closures, kept
    /// separate from `symbols` — a builtin is never read out of `env`, so it
    /// has no business occupying an environment slot.
    headers: BTreeSet<&'static str>,
}

impl ChunkBuilder {
    fn new() -> Self {
        ChunkBuilder {
            symbols: Vec::new(),
            strings: Vec::new(),
            headers: BTreeSet::new(),
        }
    }

    fn symbol_index(&mut self, name: &str) -> usize {
        if let Some(i) = self.symbols.iter().position(|s| s == name) {
            i
        } else {
            self.symbols.push(name.to_string());
            self.symbols.len() - 1
        }
    }

    fn string_index(&mut self, value: &str) -> usize {
        if let Some(i) = self.strings.iter().position(|s| s == value) {
            i
        } else {
            self.strings.push(value.to_string());
            self.strings.len() - 1
        }
    }
}

struct Chunk {
    name: String,
    is_main: bool,
    body: Vec<Entry>,
}

fn is_branch_label(name: &str) -> bool {
    name.starts_with("__if$") || name.starts_with("__else$") || name.starts_with("__endif$")
}

fn split_chunks(entries: &[Entry]) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current: Option<Chunk> = None;
    for entry in entries {
        if let Entry::Label(name) = entry {
            if !is_branch_label(name) {
                if let Some(chunk) = current.take() {
                    chunks.push(chunk);
                }
                current = Some(Chunk {
                    name: name.clone(),
                    is_main: name == "__main__",
                    body: Vec::new(),
                });
                continue;
            }
        }
        if let Some(chunk) = current.as_mut() {
            chunk.body.push(entry.clone());
        }
    }
    if let Some(chunk) = current.take() {
        chunks.push(chunk);
    }
    chunks
}

/// Replaces every character a C identifier can't contain with `_`. SIR
/// branch labels use `$` as a counter separator (`__if$0__`), which is not
/// portable in a C identifier even though some compilers accept it.
fn sanitize_ident(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn builtin_function_name(name: &str) -> Option<&'static str> {
    match name {
        "print" => Some("builtin_print"),
        "pow" => Some("builtin_pow"),
        "__add__" => Some("builtin_add"),
        "__subtract__" => Some("builtin_subtract"),
        "__multiply__" => Some("builtin_multiply"),
        "__integer_divide__" => Some("builtin_integer_divide"),
        "__modular_divide__" => Some("builtin_modular_divide"),
        "__concat__" => Some("builtin_concat"),
        "__lt__" => Some("builtin_lt"),
        "__gt__" => Some("builtin_gt"),
        "__lte__" => Some("builtin_lte"),
        "__gte__" => Some("builtin_gte"),
        "__eq__" => Some("builtin_eq"),
        "__neq__" => Some("builtin_neq"),
        "__negate__" => Some("builtin_negate"),
        "__field__" => Some("builtin_field"),
        "__get__" => Some("builtin_get"),
        _ => None,
    }
}

fn escape_c_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}

pub fn emit(program: &SirProgram) -> Result<String> {
    let chunks = split_chunks(&program.entries);
    let mut builder = ChunkBuilder::new();
    let mut rendered_chunks = Vec::new();
    let mut headers: BTreeSet<&str> = BASE_HEADERS.iter().copied().collect();
    let mut builtin_calls: BTreeSet<&'static str> = BTreeSet::new();

    for chunk in &chunks {
        let rendered = render_chunk(chunk, &mut builder, &mut builtin_calls)?;
        rendered_chunks.push(rendered);
    }

    headers.extend(builder.headers.iter().copied());

    let mut out = String::new();
    writeln!(out, "/* generated by tealc: do not edit by hand */")?;
    for header in &headers {
        writeln!(out, "#include <{header}>")?;
    }
    writeln!(out, "{RUNTIME_PREAMBLE}")?;
    writeln!(out, "{BUILTIN_DEFINITIONS}")?;

    writeln!(out, "/* symbol_list: {} entries */", builder.symbols.len())?;
    for (i, symbol) in builder.symbols.iter().enumerate() {
        writeln!(out, "#define SYM_{} {} /* {} */", i, i, sanitize_ident(symbol))?;
    }
    writeln!(out, "static Object env[{}];", builder.symbols.len().max(1))?;
    writeln!(out)?;

    writeln!(out, "/* string_literal_list: {} entries */", builder.strings.len())?;
    writeln!(out, "static const char *STRING_LITERALS[] = {{")?;
    for value in &builder.strings {
        writeln!(out, "    \"{}\",", escape_c_string(value))?;
    }
    if builder.strings.is_empty() {
        writeln!(out, "    NULL,")?;
    }
    writeln!(out, "}};")?;
    writeln!(out)?;

    writeln!(out, "/* operator_declarations */")?;
    for name in &builtin_calls {
        writeln!(out, "static Object {name}(Object *args, size_t argc);")?;
    }
    writeln!(out)?;

    writeln!(out, "/* function_definition_list */")?;
    for (chunk, rendered) in chunks.iter().zip(rendered_chunks.iter()) {
        if !chunk.is_main {
            out.push_str(rendered);
            out.push('\n');
        }
    }

    writeln!(out, "/* statements */")?;
    for (chunk, rendered) in chunks.iter().zip(rendered_chunks.iter()) {
        if chunk.is_main {
            out.push_str(rendered);
            out.push('\n');
        }
    }

    Ok(out)
}

fn render_chunk(
    chunk: &Chunk,
    builder: &mut ChunkBuilder,
    builtin_calls: &mut BTreeSet<&'static str>,
) -> Result<String> {
    let ident = sanitize_ident(&chunk.name);
    let mut out = String::new();
    if chunk.is_main {
        writeln!(out, "int main(void) {{")?;
    } else {
        writeln!(out, "static Object label_{ident}(void) {{")?;
    }

    for entry in &chunk.body {
        match entry {
            Entry::Label(label) => {
                writeln!(out, "{}:", sanitize_ident(label))?;
            }
            Entry::Instruction(instruction) => {
                render_instruction(instruction, &mut out, builder, builtin_calls)?;
            }
        }
    }

    if chunk.is_main {
        writeln!(out, "    return 0;")?;
    }
    writeln!(out, "}}")?;
    Ok(out)
}

fn render_instruction(
    instruction: &Instruction,
    out: &mut String,
    builder: &mut ChunkBuilder,
    builtin_calls: &mut BTreeSet<&'static str>,
) -> Result<()> {
    match (instruction.op, &instruction.operand) {
        (Op::Push, Operand::Sym(name)) if name == "__unit__" => {
            writeln!(out, "    vm_push(make_unit());")?;
        }
        (Op::Push, Operand::Sym(name)) => {
            if let Some(function) = builtin_function_name(name) {
                builtin_calls.insert(function);
                builder.headers.extend(headers_for(name));
                writeln!(out, "    vm_push(make_closure((ClosureFn){function}));")?;
            } else {
                let idx = builder.symbol_index(name);
                writeln!(out, "    vm_push(env[{idx}]); /* {} */", sanitize_ident(name))?;
            }
        }
        (Op::PushValue, Operand::Value(Literal::Int(value))) => {
            writeln!(out, "    vm_push(make_int({value}));")?;
        }
        (Op::PushValue, Operand::Value(Literal::Str(value))) => {
            let idx = builder.string_index(value);
            writeln!(out, "    vm_push(make_string(STRING_LITERALS[{idx}]));")?;
        }
        (Op::Pop, Operand::Sym(name)) => {
            let idx = builder.symbol_index(name);
            writeln!(out, "    env[{idx}] = vm_pop(); /* {} */", sanitize_ident(name))?;
        }
        (Op::Drop, _) => {
            writeln!(out, "    vm_pop();")?;
        }
        (Op::Call, Operand::Count(count)) => {
            writeln!(out, "    {{")?;
            writeln!(out, "        Object callee = vm_pop();")?;
            writeln!(out, "        Object args[{}];", (*count).max(1))?;
            for i in (0..*count).rev() {
                writeln!(out, "        args[{i}] = vm_pop();")?;
            }
            writeln!(out, "        if (callee.tag != TAG_CLOSURE) teal_type_error(\"call\");")?;
            writeln!(out, "        vm_push(((Object (*)(Object *, size_t))callee.as.closure)(args, {count}));")?;
            writeln!(out, "    }}")?;
        }
        (Op::Close, Operand::Label(label)) => {
            writeln!(
                out,
                "    vm_push(make_closure((ClosureFn)(Object (*)(Object *, size_t))label_{}));",
                sanitize_ident(label)
            )?;
        }
        (Op::Return, _) => {
            writeln!(out, "    return vm_pop();")?;
        }
        (Op::List, Operand::Count(count)) => {
            writeln!(out, "    {{")?;
            writeln!(out, "        Object *items = malloc(sizeof(Object) * {});", (*count).max(1))?;
            for i in (0..*count).rev() {
                writeln!(out, "        items[{i}] = vm_pop();")?;
            }
            writeln!(out, "        vm_push(make_list(items, {count}));")?;
            writeln!(out, "    }}")?;
        }
        (Op::Struct, Operand::Count(count)) => {
            writeln!(out, "    {{")?;
            writeln!(out, "        const char **keys = malloc(sizeof(char *) * {});", (*count).max(1))?;
            writeln!(out, "        Object *values = malloc(sizeof(Object) * {});", (*count).max(1))?;
            for i in (0..*count).rev() {
                writeln!(out, "        values[{i}] = vm_pop();")?;
                writeln!(out, "        keys[{i}] = vm_pop().as.string;")?;
            }
            writeln!(out, "        vm_push(make_struct(keys, values, {count}));")?;
            writeln!(out, "    }}")?;
        }
        (Op::Jump, Operand::Label(label)) => {
            writeln!(out, "    goto {};", sanitize_ident(label))?;
        }
        (Op::JumpIfFalse, Operand::Label(label)) => {
            writeln!(out, "    if (!is_truthy(vm_pop())) goto {};", sanitize_ident(label))?;
        }
        (Op::End, _) => {
            writeln!(out, "    ;")?;
        }
        (op, operand) => {
            return Err(crate::error::CompileError::InternalError(format!(
                "SIR instruction {op:?} with operand {operand:?} has no C translation"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::convert_program;
    use crate::desugar::desugar_program;
    use crate::normalize::normalize_program;
    use crate::optimize::optimize;
    use crate::parser::Parser;
    use crate::sirgen;

    fn emit_c(src: &str) -> String {
        let sir = sirgen::generate(convert_program(normalize_program(desugar_program(
            Parser::parse(src).unwrap(),
        ))))
        .unwrap();
        emit(&optimize(sir)).unwrap()
    }

    #[test]
    fn emits_a_main_function() {
        let source = emit_c("x = 1");
        assert!(source.contains("int main(void)"));
    }

    #[test]
    fn function_definition_becomes_its_own_c_function() {
        let source = emit_c("def add(a, b) do a + b end");
        assert!(source.contains("label_add"));
    }

    #[test]
    fn print_call_pulls_in_stdio_and_the_print_builtin() {
        let source = emit_c("print('hi')");
        assert!(source.contains("#include <stdio.h>"));
        assert!(source.contains("builtin_print"));
    }

    #[test]
    fn branch_labels_are_sanitized_for_c_identifiers() {
        let source = emit_c("x = if a do 1 else 2 end");
        assert!(!source.contains("$"));
    }

    #[test]
    fn pushing_a_builtin_symbol_makes_a_closure_rather_than_reading_env() {
        let source = emit_c("print(1)");
        assert!(source.contains("vm_push(make_closure((ClosureFn)builtin_print));"));
    }

    #[test]
    fn pushing_the_unit_sentinel_makes_a_unit_value() {
        let source = emit_c("def f() do end");
        assert!(source.contains("vm_push(make_unit());"));
    }

    #[test]
    fn builtin_names_do_not_occupy_an_environment_slot() {
        let source = emit_c("print(1)");
        // `print` is pushed as a closure constant, never read from `env`, so
        // it must not appear in the generated symbol_list/env comments.
        assert!(!source.contains("env[0]; /* print */"));
    }
}
