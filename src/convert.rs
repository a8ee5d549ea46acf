//! Conversion (N → C): a structural copy that narrows the tree to exactly
//! what SIR generation needs. By this stage every program has already
//! survived parsing, desugaring and normalization, so source line numbers
//! (kept until now purely for diagnostics) are dropped; each variant here
//! has a one-to-one counterpart in [`crate::normalize`], renamed rather
//! than reshaped.

use crate::normalize::{NExpr, NProgram, NStatement, NValue};

#[derive(Debug, Clone, PartialEq)]
pub enum CExpr {
    Variable(String),
    IntegerLiteral(i64),
    StringLiteral(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CValue {
    Trivial(CExpr),
    Call { function: CExpr, arguments: Vec<CExpr> },
    List(Vec<CExpr>),
    Struct(Vec<(String, CExpr)>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CStatement {
    Expression {
        value: CValue,
    },
    Assignment {
        name: String,
        value: CValue,
    },
    IfElse {
        condition: CExpr,
        then_body: Vec<CStatement>,
        else_body: Vec<CStatement>,
    },
    FunctionDefinition {
        name: String,
        parameters: Vec<String>,
        body: Vec<CStatement>,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CProgram {
    pub statements: Vec<CStatement>,
}

pub fn convert_program(program: NProgram) -> CProgram {
    CProgram {
        statements: program.statements.into_iter().map(convert_statement).collect(),
    }
}

fn convert_statement(statement: NStatement) -> CStatement {
    match statement {
        NStatement::Expression { value, .. } => CStatement::Expression {
            value: convert_value(value),
        },
        NStatement::Assignment { name, value, .. } => CStatement::Assignment {
            name,
            value: convert_value(value),
        },
        NStatement::IfElse {
            condition,
            then_body,
            else_body,
            ..
        } => CStatement::IfElse {
            condition: convert_expr(condition),
            then_body: then_body.into_iter().map(convert_statement).collect(),
            else_body: else_body.into_iter().map(convert_statement).collect(),
        },
        NStatement::FunctionDefinition {
            name,
            parameters,
            body,
            ..
        } => CStatement::FunctionDefinition {
            name,
            parameters,
            body: body.into_iter().map(convert_statement).collect(),
        },
    }
}

fn convert_value(value: NValue) -> CValue {
    match value {
        NValue::Trivial(expr) => CValue::Trivial(convert_expr(expr)),
        NValue::Call { function, arguments } => CValue::Call {
            function: convert_expr(function),
            arguments: arguments.into_iter().map(convert_expr).collect(),
        },
        NValue::List(items) => CValue::List(items.into_iter().map(convert_expr).collect()),
        NValue::Struct(fields) => {
            CValue::Struct(fields.into_iter().map(|(name, expr)| (name, convert_expr(expr))).collect())
        }
    }
}

fn convert_expr(expr: NExpr) -> CExpr {
    match expr {
        NExpr::Variable(name) => CExpr::Variable(name),
        NExpr::IntegerLiteral(value) => CExpr::IntegerLiteral(value),
        NExpr::StringLiteral(value) => CExpr::StringLiteral(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desugar::desugar_program;
    use crate::normalize::normalize_program;
    use crate::parser::Parser;

    fn convert(src: &str) -> CProgram {
        convert_program(normalize_program(desugar_program(Parser::parse(src).unwrap())))
    }

    #[test]
    fn drops_metadata_but_keeps_shape() {
        let program = convert("x = 1");
        match &program.statements[0] {
            CStatement::Assignment { name, value } => {
                assert_eq!(name, "x");
                assert_eq!(*value, CValue::Trivial(CExpr::IntegerLiteral(1)));
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn call_arguments_survive_conversion() {
        let program = convert("y = 1 + 2 * 3");
        let has_call = program
            .statements
            .iter()
            .any(|s| matches!(s, CStatement::Assignment { value: CValue::Call { .. }, .. }));
        assert!(has_call);
    }
}
