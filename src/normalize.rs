//! Normalization (D → N): rewriting into A-normal form.
//!
//! Every non-trivial subexpression is bound to a fresh `$N` variable before
//! use. The counter resets at the start of the program body and at the
//! start of each function body, so names stay small and local to their
//! scope. Three shapes get special handling beyond plain ANF binding:
//! `if` used as an expression (its value materializes into a result
//! variable initialized to `__unit__` by default), short-circuit `and`
//! (already lowered to `if`/`else` by desugaring), and comparison chains
//! (`a < b < c`, rewritten here into pairwise `and`-combined comparisons
//! that evaluate the shared middle operand exactly once).

use crate::ast::Meta;
use crate::desugar::{DExpr, DProgram, DStatement};

const COMPARATORS: &[&str] = &["__lt__", "__gt__", "__lte__", "__gte__", "__eq__", "__neq__"];

fn is_comparator(name: &str) -> bool {
    COMPARATORS.contains(&name)
}

fn is_comparison_call(expr: &DExpr) -> bool {
    matches!(
        expr,
        DExpr::Call { function, arguments, .. }
            if arguments.len() == 2
                && matches!(&**function, DExpr::Symbol { name, .. } if is_comparator(name))
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum NExpr {
    Variable(String),
    IntegerLiteral(i64),
    StringLiteral(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NValue {
    Trivial(NExpr),
    Call { function: NExpr, arguments: Vec<NExpr> },
    List(Vec<NExpr>),
    Struct(Vec<(String, NExpr)>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NStatement {
    Expression {
        meta: Meta,
        value: NValue,
    },
    Assignment {
        meta: Meta,
        name: String,
        value: NValue,
    },
    IfElse {
        meta: Meta,
        condition: NExpr,
        then_body: Vec<NStatement>,
        else_body: Vec<NStatement>,
    },
    FunctionDefinition {
        meta: Meta,
        name: String,
        parameters: Vec<String>,
        body: Vec<NStatement>,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NProgram {
    pub statements: Vec<NStatement>,
}

struct Counter {
    next: u32,
}

impl Counter {
    fn new() -> Self {
        Counter { next: 0 }
    }

    fn fresh(&mut self) -> String {
        let name = format!("${}", self.next);
        self.next += 1;
        name
    }
}

pub fn normalize_program(program: DProgram) -> NProgram {
    let mut counter = Counter::new();
    let mut statements = Vec::new();
    for statement in program.statements {
        normalize_statement_into(statement, &mut counter, &mut statements);
    }
    NProgram { statements }
}

fn normalize_statement_into(statement: DStatement, counter: &mut Counter, out: &mut Vec<NStatement>) {
    match statement {
        DStatement::Expression { meta, expr } => {
            let value = normalize_to_value(expr, counter, out);
            out.push(NStatement::Expression { meta, value });
        }
        DStatement::Assignment { meta, name, value } => {
            let value = normalize_to_value(value, counter, out);
            out.push(NStatement::Assignment { meta, name, value });
        }
        DStatement::FunctionDefinition {
            meta,
            name,
            parameters,
            body,
        } => {
            let mut fn_counter = Counter::new();
            let mut body_out = Vec::new();
            for stmt in body {
                normalize_statement_into(stmt, &mut fn_counter, &mut body_out);
            }
            out.push(NStatement::FunctionDefinition {
                meta,
                name,
                parameters,
                body: body_out,
            });
        }
    }
}

/// Binds `expr` to a fresh variable if it isn't already trivial, emitting
/// whatever prestatements that requires into `out`.
fn normalize_to_trivial(expr: DExpr, counter: &mut Counter, out: &mut Vec<NStatement>) -> NExpr {
    let meta = expr.meta();
    match expr {
        DExpr::IntegerLiteral { value, .. } => NExpr::IntegerLiteral(value),
        DExpr::StringLiteral { value, .. } => NExpr::StringLiteral(value),
        DExpr::Symbol { name, .. } => NExpr::Variable(name),
        other => match normalize_to_value(other, counter, out) {
            NValue::Trivial(e) => e,
            value => {
                let name = counter.fresh();
                out.push(NStatement::Assignment {
                    meta,
                    name: name.clone(),
                    value,
                });
                NExpr::Variable(name)
            }
        },
    }
}

fn normalize_to_value(expr: DExpr, counter: &mut Counter, out: &mut Vec<NStatement>) -> NValue {
    match expr {
        DExpr::IntegerLiteral { value, .. } => NValue::Trivial(NExpr::IntegerLiteral(value)),
        DExpr::StringLiteral { value, .. } => NValue::Trivial(NExpr::StringLiteral(value)),
        DExpr::Symbol { name, .. } => NValue::Trivial(NExpr::Variable(name)),
        DExpr::ListLiteral { items, .. } => {
            let items = items
                .into_iter()
                .map(|item| normalize_to_trivial(item, counter, out))
                .collect();
            NValue::List(items)
        }
        DExpr::StructLiteral { fields, .. } => {
            let fields = fields
                .into_iter()
                .map(|(name, value)| (name, normalize_to_trivial(value, counter, out)))
                .collect();
            NValue::Struct(fields)
        }
        DExpr::If {
            meta,
            condition,
            then_body,
            else_body,
        } => NValue::Trivial(normalize_if_expr(meta, *condition, then_body, else_body, counter, out)),
        DExpr::Call { function, arguments, .. }
            if is_comparator_symbol(&function) && arguments.len() == 2 && is_comparison_call(&arguments[0]) =>
        {
            let chain = DExpr::Call {
                meta: Meta::new(0),
                function,
                arguments,
            };
            NValue::Trivial(normalize_comparison_chain(chain, counter, out))
        }
        DExpr::Call { function, arguments, .. } => {
            let function = normalize_to_trivial(*function, counter, out);
            let arguments = arguments
                .into_iter()
                .map(|arg| normalize_to_trivial(arg, counter, out))
                .collect();
            NValue::Call { function, arguments }
        }
    }
}

fn is_comparator_symbol(expr: &DExpr) -> bool {
    matches!(expr, DExpr::Symbol { name, .. } if is_comparator(name))
}

/// Walks the left spine of a chained comparison call, collecting
/// `(operator, right_operand)` pairs from leftmost to rightmost, then
/// rebuilds it as pairwise `and`-combined comparisons that reuse the
/// previous right operand as the next left operand.
fn normalize_comparison_chain(expr: DExpr, counter: &mut Counter, out: &mut Vec<NStatement>) -> NExpr {
    let (base, pairs) = flatten_comparison_chain(expr);
    let mut left_var = normalize_to_trivial(base, counter, out);
    let mut result: Option<NExpr> = None;
    for (operator, right) in pairs {
        let right_var = normalize_to_trivial(right, counter, out);
        let cmp_name = counter.fresh();
        out.push(NStatement::Assignment {
            meta: Meta::new(0),
            name: cmp_name.clone(),
            value: NValue::Call {
                function: NExpr::Variable(operator),
                arguments: vec![left_var.clone(), right_var.clone()],
            },
        });
        let cmp_var = NExpr::Variable(cmp_name);
        result = Some(match result {
            None => cmp_var,
            Some(prev) => emit_and(prev, cmp_var, counter, out),
        });
        left_var = right_var;
    }
    match result {
        Some(expr) => expr,
        // The call-site guard (`is_comparison_call(&arguments[0])`) already
        // ensures the chain has at least one comparator pair.
        None => unreachable!("comparison chain must contain at least one comparator"),
    }
}

fn flatten_comparison_chain(expr: DExpr) -> (DExpr, Vec<(String, DExpr)>) {
    match expr {
        DExpr::Call {
            function,
            arguments: mut two_args,
            ..
        } if is_comparator_symbol(&function) && two_args.len() == 2 => {
            let (left, right) = (two_args.remove(0), two_args.remove(0));
            let name = match *function {
                DExpr::Symbol { name, .. } => name,
                _ => unreachable!("comparator guard already checked this is a symbol"),
            };
            if is_comparison_call(&left) {
                let (base, mut pairs) = flatten_comparison_chain(left);
                pairs.push((name, right));
                (base, pairs)
            } else {
                (left, vec![(name, right)])
            }
        }
        other => (other, Vec::new()),
    }
}

fn emit_and(left: NExpr, right: NExpr, counter: &mut Counter, out: &mut Vec<NStatement>) -> NExpr {
    let result_name = counter.fresh();
    out.push(NStatement::Assignment {
        meta: Meta::new(0),
        name: result_name.clone(),
        value: NValue::Trivial(left.clone()),
    });
    out.push(NStatement::IfElse {
        meta: Meta::new(0),
        condition: left,
        then_body: vec![NStatement::Assignment {
            meta: Meta::new(0),
            name: result_name.clone(),
            value: NValue::Trivial(right),
        }],
        else_body: Vec::new(),
    });
    NExpr::Variable(result_name)
}

fn normalize_if_expr(
    meta: Meta,
    condition: DExpr,
    then_body: Vec<DStatement>,
    else_body: Vec<DStatement>,
    counter: &mut Counter,
    out: &mut Vec<NStatement>,
) -> NExpr {
    let condition = normalize_to_trivial(condition, counter, out);
    let result_name = counter.fresh();
    out.push(NStatement::Assignment {
        meta,
        name: result_name.clone(),
        value: NValue::Trivial(NExpr::Variable("__unit__".to_string())),
    });
    let then_body = normalize_block_with_tail_assignment(then_body, &result_name, counter);
    let else_body = normalize_block_with_tail_assignment(else_body, &result_name, counter);
    out.push(NStatement::IfElse {
        meta,
        condition,
        then_body,
        else_body,
    });
    NExpr::Variable(result_name)
}

/// Normalizes a branch body, rewriting a trailing bare expression
/// statement into an assignment to `result_name` so the branch's value
/// materializes into the `if` expression's result variable.
fn normalize_block_with_tail_assignment(
    body: Vec<DStatement>,
    result_name: &str,
    counter: &mut Counter,
) -> Vec<NStatement> {
    let mut out = Vec::new();
    let last_index = body.len().checked_sub(1);
    for (index, statement) in body.into_iter().enumerate() {
        if Some(index) == last_index {
            if let DStatement::Expression { meta, expr } = statement {
                let value = normalize_to_value(expr, counter, &mut out);
                out.push(NStatement::Assignment {
                    meta,
                    name: result_name.to_string(),
                    value,
                });
                continue;
            }
            normalize_statement_into(statement, counter, &mut out);
        } else {
            normalize_statement_into(statement, counter, &mut out);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desugar::desugar_program;
    use crate::parser::Parser;

    fn normalize(src: &str) -> NProgram {
        normalize_program(desugar_program(Parser::parse(src).unwrap()))
    }

    #[test]
    fn literal_assignment_stays_trivial() {
        let program = normalize("x = 1");
        assert_eq!(program.statements.len(), 1);
        match &program.statements[0] {
            NStatement::Assignment { name, value, .. } => {
                assert_eq!(name, "x");
                assert_eq!(*value, NValue::Trivial(NExpr::IntegerLiteral(1)));
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn nested_call_binds_intermediate_to_fresh_variable() {
        let program = normalize("y = 1 + 2 * 3");
        // multiply binds to $0, then the addition uses $0 as a trivial operand.
        assert!(program.statements.len() >= 2);
        let has_fresh = program.statements.iter().any(|s| matches!(
            s,
            NStatement::Assignment { name, .. } if name == "$0"
        ));
        assert!(has_fresh);
    }

    #[test]
    fn comparison_chain_evaluates_middle_operand_once() {
        let program = normalize("1 < 2 < 3");
        let bind_count = program
            .statements
            .iter()
            .filter(|s| matches!(s, NStatement::Assignment { .. }))
            .count();
        // Two comparisons ($0 = 1<2, $1 = 2<3) plus the and-chain's result
        // binding ($2) is the expected minimum shape; "2" is never
        // normalized to a variable twice independently in the call lists.
        assert!(bind_count >= 3);
    }

    #[test]
    fn if_expression_initializes_result_to_unit_by_default() {
        let program = normalize("x = if a do 1 end");
        let initializes_unit = program.statements.iter().any(|s| matches!(
            s,
            NStatement::Assignment { value: NValue::Trivial(NExpr::Variable(v)), .. } if v == "__unit__"
        ));
        assert!(initializes_unit);
    }

    #[test]
    fn function_body_counter_resets_independently_of_top_level() {
        let program = normalize("y = 1 + 2\ndef f(a) do a + 1 end");
        let top_level_fresh = program.statements.iter().any(|s| matches!(
            s,
            NStatement::Assignment { name, .. } if name == "$0"
        ));
        assert!(top_level_fresh);
        match program.statements.last().unwrap() {
            NStatement::FunctionDefinition { body, .. } => {
                let reused_zero = body.iter().any(|s| matches!(
                    s,
                    NStatement::Assignment { name, .. } if name == "$0"
                ));
                assert!(reused_zero);
            }
            other => panic!("expected function definition, got {other:?}"),
        }
    }
}
