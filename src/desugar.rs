//! Desugaring (S → D): operators and sugar collapse to plain calls.
//!
//! Infix operators become calls to reserved builtin names
//! (`a + b` → `__add__(a, b)`), `.` becomes a `__field__` call with the
//! field name as a string literal, list indexing becomes `__get__`, unary
//! negation becomes `__negate__`, and short-circuiting `and`/`or` become
//! `if`/`else` so normalization only ever has to handle one conditional
//! construct.

use crate::ast::{self, InfixLevel, Meta};

#[derive(Debug, Clone, PartialEq)]
pub enum DExpr {
    IntegerLiteral { meta: Meta, value: i64 },
    StringLiteral { meta: Meta, value: String },
    Symbol { meta: Meta, name: String },
    ListLiteral { meta: Meta, items: Vec<DExpr> },
    StructLiteral { meta: Meta, fields: Vec<(String, DExpr)> },
    Call { meta: Meta, function: Box<DExpr>, arguments: Vec<DExpr> },
    If {
        meta: Meta,
        condition: Box<DExpr>,
        then_body: Vec<DStatement>,
        else_body: Vec<DStatement>,
    },
}

impl DExpr {
    pub fn meta(&self) -> Meta {
        match self {
            DExpr::IntegerLiteral { meta, .. }
            | DExpr::StringLiteral { meta, .. }
            | DExpr::Symbol { meta, .. }
            | DExpr::ListLiteral { meta, .. }
            | DExpr::StructLiteral { meta, .. }
            | DExpr::Call { meta, .. }
            | DExpr::If { meta, .. } => *meta,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DStatement {
    Expression { meta: Meta, expr: DExpr },
    Assignment { meta: Meta, name: String, value: DExpr },
    FunctionDefinition {
        meta: Meta,
        name: String,
        parameters: Vec<String>,
        body: Vec<DStatement>,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DProgram {
    pub statements: Vec<DStatement>,
}

fn builtin_name_for_operator(operator: &str) -> &'static str {
    match operator {
        "++" => "__concat__",
        "+" => "__add__",
        "-" => "__subtract__",
        "*" => "__multiply__",
        "//" => "__integer_divide__",
        "%" => "__modular_divide__",
        "<" => "__lt__",
        ">" => "__gt__",
        "<=" => "__lte__",
        ">=" => "__gte__",
        "==" => "__eq__",
        "!=" => "__neq__",
        other => unreachable!("unknown infix operator '{other}' reached desugaring"),
    }
}

fn call(meta: Meta, name: &'static str, arguments: Vec<DExpr>) -> DExpr {
    DExpr::Call {
        meta,
        function: Box::new(DExpr::Symbol {
            meta,
            name: name.to_string(),
        }),
        arguments,
    }
}

pub fn desugar_program(program: ast::Program) -> DProgram {
    DProgram {
        statements: program.statements.into_iter().map(desugar_statement).collect(),
    }
}

fn desugar_statement(statement: ast::Statement) -> DStatement {
    match statement {
        ast::Statement::Expression { meta, expr } => DStatement::Expression {
            meta,
            expr: desugar_expr(expr),
        },
        ast::Statement::Assignment { meta, name, value } => DStatement::Assignment {
            meta,
            name,
            value: desugar_expr(value),
        },
        ast::Statement::FunctionDefinition {
            meta,
            name,
            parameters,
            body,
        } => DStatement::FunctionDefinition {
            meta,
            name,
            parameters,
            body: body.into_iter().map(desugar_statement).collect(),
        },
    }
}

fn desugar_expr(expr: ast::Expr) -> DExpr {
    match expr {
        ast::Expr::IntegerLiteral { meta, value } => DExpr::IntegerLiteral { meta, value },
        ast::Expr::StringLiteral { meta, value } => DExpr::StringLiteral { meta, value },
        ast::Expr::Symbol { meta, name } => DExpr::Symbol { meta, name },
        ast::Expr::Negation { meta, value } => call(meta, "__negate__", vec![desugar_expr(*value)]),
        ast::Expr::Infix {
            meta,
            level: InfixLevel::And,
            left,
            right,
            ..
        } => desugar_and(meta, *left, *right),
        ast::Expr::Infix {
            meta,
            level: InfixLevel::Or,
            left,
            right,
            ..
        } => desugar_or(meta, *left, *right),
        ast::Expr::Infix {
            meta,
            operator,
            left,
            right,
            ..
        } => {
            let name = builtin_name_for_operator(&operator);
            call(meta, name, vec![desugar_expr(*left), desugar_expr(*right)])
        }
        ast::Expr::Dot { meta, object, field } => call(
            meta,
            "__field__",
            vec![desugar_expr(*object), DExpr::StringLiteral { meta, value: field }],
        ),
        ast::Expr::ListLiteral { meta, items } => DExpr::ListLiteral {
            meta,
            items: items.into_iter().map(desugar_expr).collect(),
        },
        ast::Expr::StructLiteral { meta, fields } => DExpr::StructLiteral {
            meta,
            fields: fields
                .into_iter()
                .map(|(name, value)| (name, desugar_expr(value)))
                .collect(),
        },
        ast::Expr::ListIndex { meta, list, index } => {
            call(meta, "__get__", vec![desugar_expr(*list), desugar_expr(*index)])
        }
        ast::Expr::Call {
            meta,
            function,
            arguments,
        } => DExpr::Call {
            meta,
            function: Box::new(desugar_expr(*function)),
            arguments: arguments.into_iter().map(desugar_expr).collect(),
        },
        ast::Expr::If {
            meta,
            condition,
            then_body,
            else_body,
        } => DExpr::If {
            meta,
            condition: Box::new(desugar_expr(*condition)),
            then_body: then_body.into_iter().map(desugar_statement).collect(),
            else_body: else_body.into_iter().map(desugar_statement).collect(),
        },
    }
}

/// `left and right` → `if left do right else false end`
fn desugar_and(meta: Meta, left: ast::Expr, right: ast::Expr) -> DExpr {
    DExpr::If {
        meta,
        condition: Box::new(desugar_expr(left)),
        then_body: vec![DStatement::Expression {
            meta,
            expr: desugar_expr(right),
        }],
        else_body: vec![DStatement::Expression {
            meta,
            expr: DExpr::Symbol {
                meta,
                name: "false".to_string(),
            },
        }],
    }
}

/// `left or right` → `if left do true else right end`
fn desugar_or(meta: Meta, left: ast::Expr, right: ast::Expr) -> DExpr {
    DExpr::If {
        meta,
        condition: Box::new(desugar_expr(left)),
        then_body: vec![DStatement::Expression {
            meta,
            expr: DExpr::Symbol {
                meta,
                name: "true".to_string(),
            },
        }],
        else_body: vec![DStatement::Expression {
            meta,
            expr: desugar_expr(right),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn desugar(src: &str) -> DProgram {
        desugar_program(Parser::parse(src).unwrap())
    }

    #[test]
    fn addition_desugars_to_builtin_call() {
        let program = desugar("x = 1 + 2");
        match &program.statements[0] {
            DStatement::Assignment { value, .. } => match value {
                DExpr::Call { function, arguments, .. } => {
                    assert!(matches!(**function, DExpr::Symbol { ref name, .. } if name == "__add__"));
                    assert_eq!(arguments.len(), 2);
                }
                other => panic!("expected call, got {other:?}"),
            },
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn and_desugars_to_if_with_false_else() {
        let program = desugar("a and b");
        match &program.statements[0] {
            DStatement::Expression { expr, .. } => match expr {
                DExpr::If { else_body, .. } => {
                    assert_eq!(else_body.len(), 1);
                    match &else_body[0] {
                        DStatement::Expression { expr, .. } => {
                            assert!(matches!(expr, DExpr::Symbol { name, .. } if name == "false"));
                        }
                        other => panic!("expected expression statement, got {other:?}"),
                    }
                }
                other => panic!("expected if, got {other:?}"),
            },
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn dot_access_desugars_to_field_call_with_string_literal() {
        let program = desugar("a.name");
        match &program.statements[0] {
            DStatement::Expression { expr, .. } => match expr {
                DExpr::Call { function, arguments, .. } => {
                    assert!(matches!(**function, DExpr::Symbol { ref name, .. } if name == "__field__"));
                    assert!(matches!(&arguments[1], DExpr::StringLiteral { value, .. } if value == "name"));
                }
                other => panic!("expected call, got {other:?}"),
            },
            other => panic!("expected expression statement, got {other:?}"),
        }
    }
}
