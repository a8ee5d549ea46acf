//! Textual SIR backend: a pretty-printer for [`SirProgram`], mostly useful
//! for tests and for inspecting what the optimizer did.
//!
//! A blank line precedes every label but the first, so a dump reads as
//! naturally separated blocks rather than one unbroken column.

use std::fmt::Write;

use crate::error::Result;
use crate::sir::{Entry, Instruction, Literal, Op, Operand, SirProgram};

pub fn render(program: &SirProgram) -> Result<String> {
    let mut out = String::new();
    let mut first = true;
    for entry in &program.entries {
        match entry {
            Entry::Label(label) => {
                if !first {
                    writeln!(out)?;
                }
                writeln!(out, "{label}:")?;
            }
            Entry::Instruction(instruction) => {
                writeln!(out, "    {}", render_instruction(instruction))?;
            }
        }
        first = false;
    }
    Ok(out)
}

fn render_instruction(instruction: &Instruction) -> String {
    let mnemonic = mnemonic(instruction.op);
    match instruction.op {
        Op::Drop | Op::Return | Op::End => mnemonic.to_string(),
        _ => format!("{mnemonic} {}", render_operand(&instruction.operand)),
    }
}

fn mnemonic(op: Op) -> &'static str {
    match op {
        Op::Push => "push",
        Op::Pop => "pop",
        Op::PushValue => "push_value",
        Op::Call => "call",
        Op::Close => "close",
        Op::Return => "return",
        Op::List => "list",
        Op::Struct => "struct",
        Op::Drop => "drop",
        Op::Jump => "jump",
        Op::JumpIfFalse => "jump_if_false",
        Op::End => "end",
    }
}

fn render_operand(operand: &Operand) -> String {
    match operand {
        Operand::Sym(name) => format!("sym({name})"),
        Operand::Value(Literal::Int(value)) => value.to_string(),
        Operand::Value(Literal::Str(value)) => format!("{value:?}"),
        Operand::Label(label) => label.clone(),
        Operand::Count(count) => count.to_string(),
        Operand::None => "nil".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_label_with_blank_line_separator() {
        let program = SirProgram {
            entries: vec![
                Entry::Label("__main__".to_string()),
                Entry::Instruction(Instruction::new(Op::PushValue, Operand::Value(Literal::Int(1)))),
                Entry::Label("f".to_string()),
                Entry::Instruction(Instruction::new(Op::Return, Operand::None)),
            ],
        };
        let text = render(&program).unwrap();
        assert!(text.starts_with("__main__:\n"));
        assert!(text.contains("\n\nf:\n"));
    }

    #[test]
    fn drop_and_return_render_without_an_operand() {
        let program = SirProgram {
            entries: vec![
                Entry::Label("__main__".to_string()),
                Entry::Instruction(Instruction::new(Op::Drop, Operand::None)),
                Entry::Instruction(Instruction::new(Op::Return, Operand::None)),
            ],
        };
        let text = render(&program).unwrap();
        assert!(text.contains("    drop\n"));
        assert!(text.contains("    return\n"));
    }

    #[test]
    fn symbol_operand_renders_with_sym_wrapper() {
        let program = SirProgram {
            entries: vec![
                Entry::Label("__main__".to_string()),
                Entry::Instruction(Instruction::new(Op::Push, Operand::Sym("x".to_string()))),
            ],
        };
        let text = render(&program).unwrap();
        assert!(text.contains("push sym(x)"));
    }
}
