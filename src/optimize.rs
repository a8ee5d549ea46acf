//! Peephole optimization over a [`SirProgram`]: two linear passes,
//! composed left to right.
//!
//! Operating on the typed `Operand::Sym` variant (rather than a textual
//! `sym(...)` convention) means the liveness scan below can never be
//! fooled by a string literal that merely looks like one.

use crate::sir::{Entry, Instruction, Op, Operand, SirProgram};

pub fn optimize(program: SirProgram) -> SirProgram {
    let entries = elide_push_then_drop(program.entries);
    let entries = rewrite_unused_pops_to_drops(entries);
    SirProgram { entries }
}

/// `push X` immediately followed by `drop` has no effect: both are
/// removed. Labels between them would observably change control flow, so
/// the pair only elides when the instructions are truly adjacent.
fn elide_push_then_drop(entries: Vec<Entry>) -> Vec<Entry> {
    let mut out: Vec<Entry> = Vec::with_capacity(entries.len());
    for entry in entries {
        let is_drop = matches!(&entry, Entry::Instruction(Instruction { op: Op::Drop, .. }));
        let prev_is_push = matches!(
            out.last(),
            Some(Entry::Instruction(Instruction { op: Op::Push | Op::PushValue, .. }))
        );
        if is_drop && prev_is_push {
            out.pop();
        } else {
            out.push(entry);
        }
    }
    out
}

/// A whole-program liveness scan: collect every symbol referenced as an
/// argument to an instruction other than `pop`, then rewrite any `pop
/// sym(X)` where `X` never appears in that set into a plain `drop` — the
/// popped value is discarded rather than bound to a name nothing reads.
fn rewrite_unused_pops_to_drops(entries: Vec<Entry>) -> Vec<Entry> {
    let mut used = std::collections::HashSet::new();
    for entry in &entries {
        if let Entry::Instruction(instruction) = entry {
            if instruction.op == Op::Pop {
                continue;
            }
            if let Operand::Sym(name) = &instruction.operand {
                used.insert(name.clone());
            }
        }
    }

    entries
        .into_iter()
        .map(|entry| match entry {
            Entry::Instruction(Instruction {
                op: Op::Pop,
                operand: Operand::Sym(name),
            }) if !used.contains(&name) => Entry::Instruction(Instruction::new(Op::Drop, Operand::None)),
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prog(entries: Vec<Entry>) -> SirProgram {
        SirProgram { entries }
    }

    #[test]
    fn elides_adjacent_push_drop() {
        let input = prog(vec![
            Entry::Instruction(Instruction::new(Op::PushValue, Operand::Value(crate::sir::Literal::Int(1)))),
            Entry::Instruction(Instruction::new(Op::Drop, Operand::None)),
        ]);
        let output = optimize(input);
        assert!(output.entries.is_empty());
    }

    #[test]
    fn rewrites_pop_of_unused_symbol_to_drop() {
        let input = prog(vec![
            Entry::Instruction(Instruction::new(Op::PushValue, Operand::Value(crate::sir::Literal::Int(1)))),
            Entry::Instruction(Instruction::new(Op::Pop, Operand::Sym("$0".to_string()))),
        ]);
        let output = optimize(input);
        assert!(matches!(
            &output.entries[0],
            Entry::Instruction(Instruction { op: Op::Drop, .. })
        ));
    }

    #[test]
    fn keeps_pop_of_symbol_used_later() {
        let input = prog(vec![
            Entry::Instruction(Instruction::new(Op::PushValue, Operand::Value(crate::sir::Literal::Int(1)))),
            Entry::Instruction(Instruction::new(Op::Pop, Operand::Sym("x".to_string()))),
            Entry::Instruction(Instruction::new(Op::Push, Operand::Sym("x".to_string()))),
        ]);
        let output = optimize(input);
        assert!(matches!(
            &output.entries[1],
            Entry::Instruction(Instruction { op: Op::Pop, operand: Operand::Sym(n) }) if n == "x"
        ));
    }

    #[test]
    fn does_not_elide_push_drop_across_a_label() {
        let input = prog(vec![
            Entry::Instruction(Instruction::new(Op::PushValue, Operand::Value(crate::sir::Literal::Int(1)))),
            Entry::Label("__l__".to_string()),
            Entry::Instruction(Instruction::new(Op::Drop, Operand::None)),
        ]);
        let output = optimize(input);
        assert_eq!(output.entries.len(), 3);
    }
}
