//! SIR generation (C → SIR): lowers the structured tree to a flat,
//! label-addressed instruction stream for a stack machine.
//!
//! Function bodies become separate "referenced entries" addressed by a
//! `close LABEL` at their definition site; the assembled program orders
//! referenced entries first, then the `__main__` label, then the top-level
//! instruction stream. `if`/`else` gets a fresh `(if, else, endif)` label
//! triple from one monotonic counter shared across the whole program, so
//! labels never collide even across nested or sibling branches.

use std::collections::HashMap;

use crate::convert::{CExpr, CProgram, CStatement, CValue};
use crate::error::Result;
use crate::sir::{Entry, Instruction, Literal, Op, Operand, SirProgram};

struct Generator {
    if_counter: u32,
    function_label_counters: HashMap<String, u32>,
}

impl Generator {
    fn new() -> Self {
        Generator {
            if_counter: 0,
            function_label_counters: HashMap::new(),
        }
    }

    fn next_if_labels(&mut self) -> (String, String, String) {
        let k = self.if_counter;
        self.if_counter += 1;
        (
            format!("__if${k}__"),
            format!("__else${k}__"),
            format!("__endif${k}__"),
        )
    }

    /// A closure's entry label is `name$K`, K counted per distinct `name`
    /// rather than from one global counter, so two `def`s that share a
    /// surface name but live in different, non-overlapping scopes never
    /// collide on the same label.
    fn next_function_label(&mut self, name: &str) -> String {
        let k = self.function_label_counters.entry(name.to_string()).or_insert(0);
        let label = format!("{name}${k}");
        *k += 1;
        label
    }
}

pub fn generate(program: CProgram) -> Result<SirProgram> {
    let mut generator = Generator::new();
    let mut referenced = Vec::new();
    let mut main_stream = Vec::new();

    for statement in program.statements {
        generate_statement(statement, &mut main_stream, &mut referenced, &mut generator)?;
    }

    let mut entries = Vec::with_capacity(referenced.len() + main_stream.len() + 2);
    entries.extend(referenced);
    entries.push(Entry::Label("__main__".to_string()));
    entries.extend(main_stream);
    entries.push(Entry::Instruction(Instruction::new(Op::End, Operand::None)));

    Ok(SirProgram { entries })
}

fn generate_statement(
    statement: CStatement,
    out: &mut Vec<Entry>,
    referenced: &mut Vec<Entry>,
    generator: &mut Generator,
) -> Result<()> {
    match statement {
        CStatement::Expression { value } => {
            generate_value(value, out)?;
            out.push(Entry::Instruction(Instruction::new(Op::Drop, Operand::None)));
        }
        CStatement::Assignment { name, value } => {
            generate_value(value, out)?;
            out.push(Entry::Instruction(Instruction::new(Op::Pop, Operand::Sym(name))));
        }
        CStatement::IfElse {
            condition,
            then_body,
            else_body,
        } => generate_if_else(condition, then_body, else_body, out, referenced, generator)?,
        CStatement::FunctionDefinition {
            name,
            parameters,
            body,
        } => generate_function_definition(name, parameters, body, out, referenced, generator)?,
    }
    Ok(())
}

fn generate_if_else(
    condition: CExpr,
    then_body: Vec<CStatement>,
    else_body: Vec<CStatement>,
    out: &mut Vec<Entry>,
    referenced: &mut Vec<Entry>,
    generator: &mut Generator,
) -> Result<()> {
    let (if_label, else_label, endif_label) = generator.next_if_labels();

    generate_operand_push(&condition, out);
    out.push(Entry::Instruction(Instruction::new(
        Op::JumpIfFalse,
        Operand::Label(else_label.clone()),
    )));
    out.push(Entry::Label(if_label));
    for statement in then_body {
        generate_statement(statement, out, referenced, generator)?;
    }
    out.push(Entry::Instruction(Instruction::new(
        Op::Jump,
        Operand::Label(endif_label.clone()),
    )));
    out.push(Entry::Label(else_label));
    for statement in else_body {
        generate_statement(statement, out, referenced, generator)?;
    }
    out.push(Entry::Label(endif_label));
    Ok(())
}

fn generate_function_definition(
    name: String,
    parameters: Vec<String>,
    body: Vec<CStatement>,
    out: &mut Vec<Entry>,
    referenced: &mut Vec<Entry>,
    generator: &mut Generator,
) -> Result<()> {
    let mut body_entries = Vec::new();
    for parameter in parameters.iter().rev() {
        body_entries.push(Entry::Instruction(Instruction::new(
            Op::Pop,
            Operand::Sym(parameter.clone()),
        )));
    }
    for statement in body {
        generate_statement(statement, &mut body_entries, referenced, generator)?;
    }

    // The last bare expression statement in a function body is its return
    // value: strip the `drop` the generic statement rule would have
    // emitted for it and return what's already on the stack. A body with
    // no trailing expression (ends in an assignment, an `if`, or is empty)
    // has no implicit value, so it returns the unit sentinel.
    match body_entries.last() {
        Some(Entry::Instruction(Instruction { op: Op::Drop, .. })) => {
            body_entries.pop();
        }
        _ => {
            body_entries.push(Entry::Instruction(Instruction::new(
                Op::Push,
                Operand::Sym("__unit__".to_string()),
            )));
        }
    }
    body_entries.push(Entry::Instruction(Instruction::new(Op::Return, Operand::None)));

    let label = generator.next_function_label(&name);
    referenced.push(Entry::Label(label.clone()));
    referenced.extend(body_entries);

    out.push(Entry::Instruction(Instruction::new(Op::Close, Operand::Label(label))));
    out.push(Entry::Instruction(Instruction::new(Op::Pop, Operand::Sym(name))));
    Ok(())
}

/// Pushes exactly one value; the call-argument convention is left-to-right
/// argument pushes followed by the callee, so `call N` can pop the callee
/// first and then N arguments already in left-to-right order underneath it.
fn generate_value(value: CValue, out: &mut Vec<Entry>) -> Result<()> {
    match value {
        CValue::Trivial(expr) => generate_operand_push(&expr, out),
        CValue::Call { function, arguments } => {
            let argument_count = arguments.len();
            for argument in &arguments {
                generate_operand_push(argument, out);
            }
            generate_operand_push(&function, out);
            out.push(Entry::Instruction(Instruction::new(
                Op::Call,
                Operand::Count(argument_count),
            )));
        }
        CValue::List(items) => {
            let item_count = items.len();
            for item in &items {
                generate_operand_push(item, out);
            }
            out.push(Entry::Instruction(Instruction::new(Op::List, Operand::Count(item_count))));
        }
        CValue::Struct(fields) => {
            let field_count = fields.len();
            for (name, value) in &fields {
                out.push(Entry::Instruction(Instruction::new(
                    Op::PushValue,
                    Operand::Value(Literal::Str(name.clone())),
                )));
                generate_operand_push(value, out);
            }
            out.push(Entry::Instruction(Instruction::new(
                Op::Struct,
                Operand::Count(field_count),
            )));
        }
    }
    Ok(())
}

fn generate_operand_push(expr: &CExpr, out: &mut Vec<Entry>) {
    let instruction = match expr {
        CExpr::Variable(name) => Instruction::new(Op::Push, Operand::Sym(name.clone())),
        CExpr::IntegerLiteral(value) => Instruction::new(Op::PushValue, Operand::Value(Literal::Int(*value))),
        CExpr::StringLiteral(value) => {
            Instruction::new(Op::PushValue, Operand::Value(Literal::Str(value.clone())))
        }
    };
    out.push(Entry::Instruction(instruction));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::convert_program;
    use crate::desugar::desugar_program;
    use crate::normalize::normalize_program;
    use crate::parser::Parser;

    fn sir(src: &str) -> SirProgram {
        generate(convert_program(normalize_program(desugar_program(
            Parser::parse(src).unwrap(),
        ))))
        .unwrap()
    }

    #[test]
    fn referenced_entries_precede_main_label() {
        let program = sir("def f(a) do a end\nx = 1");
        let main_index = program
            .entries
            .iter()
            .position(|e| matches!(e, Entry::Label(l) if l == "__main__"))
            .unwrap();
        let f_index = program
            .entries
            .iter()
            .position(|e| matches!(e, Entry::Label(l) if l == "f$0"))
            .unwrap();
        assert!(f_index < main_index);
    }

    #[test]
    fn function_body_ends_in_return_not_drop() {
        let program = sir("def f(a) do a end");
        let f_index = program
            .entries
            .iter()
            .position(|e| matches!(e, Entry::Label(l) if l == "f$0"))
            .unwrap();
        let after = &program.entries[f_index + 1..];
        let return_index = after
            .iter()
            .position(|e| matches!(e, Entry::Instruction(i) if i.op == Op::Return))
            .unwrap();
        assert!(!after[..return_index]
            .iter()
            .any(|e| matches!(e, Entry::Instruction(i) if i.op == Op::Drop)));
    }

    #[test]
    fn if_else_allocates_three_distinct_labels() {
        let program = sir("x = if a do 1 else 2 end");
        let labels: Vec<&str> = program
            .entries
            .iter()
            .filter_map(|e| match e {
                Entry::Label(l) if l.starts_with("__if$") || l.starts_with("__else$") || l.starts_with("__endif$") => {
                    Some(l.as_str())
                }
                _ => None,
            })
            .collect();
        assert_eq!(labels.len(), 3);
    }

    #[test]
    fn call_pushes_arguments_before_callee() {
        let program = sir("print(1)");
        let pushes: Vec<&Instruction> = program
            .entries
            .iter()
            .filter_map(|e| match e {
                Entry::Instruction(i) if i.op == Op::Push || i.op == Op::PushValue => Some(i),
                _ => None,
            })
            .collect();
        assert!(matches!(pushes[0].op, Op::PushValue));
        assert!(matches!(&pushes[1].operand, Operand::Sym(name) if name == "print"));
    }

    #[test]
    fn program_ends_with_end_instruction() {
        let program = sir("print(1)");
        assert!(matches!(
            program.entries.last(),
            Some(Entry::Instruction(Instruction { op: Op::End, .. }))
        ));
    }

    #[test]
    fn nested_same_named_functions_get_distinct_labels() {
        let program = sir("def f(a) do a end\nif 1 < 2 do\ndef f(a) do a end\nend");
        let labels: Vec<&str> = program
            .entries
            .iter()
            .filter_map(|e| match e {
                Entry::Label(l) if l.starts_with("f$") => Some(l.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec!["f$0", "f$1"]);
    }
}
