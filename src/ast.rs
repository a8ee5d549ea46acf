//! Surface syntax tree (S): the direct shape of parsed source, before any
//! desugaring. Every node carries a [`Meta`] so later stages and error
//! messages can still point at a line.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meta {
    pub line: usize,
}

impl Meta {
    pub fn new(line: usize) -> Self {
        Meta { line }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixLevel {
    Addition,
    Multiplication,
    Comparison,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntegerLiteral {
        meta: Meta,
        value: i64,
    },
    StringLiteral {
        meta: Meta,
        value: String,
    },
    Symbol {
        meta: Meta,
        name: String,
    },
    Negation {
        meta: Meta,
        value: Box<Expr>,
    },
    Infix {
        meta: Meta,
        level: InfixLevel,
        operator: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Dot {
        meta: Meta,
        object: Box<Expr>,
        field: String,
    },
    ListLiteral {
        meta: Meta,
        items: Vec<Expr>,
    },
    StructLiteral {
        meta: Meta,
        fields: Vec<(String, Expr)>,
    },
    ListIndex {
        meta: Meta,
        list: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        meta: Meta,
        function: Box<Expr>,
        arguments: Vec<Expr>,
    },
    If {
        meta: Meta,
        condition: Box<Expr>,
        then_body: Vec<Statement>,
        else_body: Vec<Statement>,
    },
}

impl Expr {
    pub fn meta(&self) -> Meta {
        match self {
            Expr::IntegerLiteral { meta, .. }
            | Expr::StringLiteral { meta, .. }
            | Expr::Symbol { meta, .. }
            | Expr::Negation { meta, .. }
            | Expr::Infix { meta, .. }
            | Expr::Dot { meta, .. }
            | Expr::ListLiteral { meta, .. }
            | Expr::StructLiteral { meta, .. }
            | Expr::ListIndex { meta, .. }
            | Expr::Call { meta, .. }
            | Expr::If { meta, .. } => *meta,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Expression {
        meta: Meta,
        expr: Expr,
    },
    Assignment {
        meta: Meta,
        name: String,
        value: Expr,
    },
    FunctionDefinition {
        meta: Meta,
        name: String,
        parameters: Vec<String>,
        body: Vec<Statement>,
    },
}

impl Statement {
    pub fn meta(&self) -> Meta {
        match self {
            Statement::Expression { meta, .. }
            | Statement::Assignment { meta, .. }
            | Statement::FunctionDefinition { meta, .. } => *meta,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    pub fn new(statements: Vec<Statement>) -> Self {
        Program { statements }
    }

    /// Every statement list in the program: the top-level list plus each
    /// nested one (an `if`'s then/else body, a function's body), depth
    /// first. A `def` name only has to be unique within the list it's
    /// declared in, so callers checking for duplicates walk these lists
    /// independently rather than pooling every `def` across the program.
    pub fn statement_lists(&self) -> Vec<&[Statement]> {
        let mut lists = vec![self.statements.as_slice()];
        for statement in &self.statements {
            collect_nested_statement_lists(statement, &mut lists);
        }
        lists
    }
}

fn collect_nested_statement_lists<'a>(statement: &'a Statement, lists: &mut Vec<&'a [Statement]>) {
    match statement {
        Statement::FunctionDefinition { body, .. } => {
            lists.push(body.as_slice());
            for inner in body {
                collect_nested_statement_lists(inner, lists);
            }
        }
        Statement::Expression { expr, .. } | Statement::Assignment { value: expr, .. } => {
            collect_nested_expr_statement_lists(expr, lists);
        }
    }
}

fn collect_nested_expr_statement_lists<'a>(expr: &'a Expr, lists: &mut Vec<&'a [Statement]>) {
    if let Expr::If {
        then_body, else_body, ..
    } = expr
    {
        lists.push(then_body.as_slice());
        lists.push(else_body.as_slice());
        for inner in then_body.iter().chain(else_body.iter()) {
            collect_nested_statement_lists(inner, lists);
        }
    }
}

/// Function names declared directly in one statement list (not recursing
/// into nested bodies), in declaration order.
pub fn function_names_in(statements: &[Statement]) -> Vec<&str> {
    statements
        .iter()
        .filter_map(|s| match s {
            Statement::FunctionDefinition { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_is_accessible_on_every_expr_variant() {
        let e = Expr::IntegerLiteral {
            meta: Meta::new(7),
            value: 1,
        };
        assert_eq!(e.meta().line, 7);
    }

    #[test]
    fn function_names_in_collects_only_defs_from_one_list() {
        let statements = vec![
            Statement::FunctionDefinition {
                meta: Meta::new(1),
                name: "add".into(),
                parameters: vec!["a".into(), "b".into()],
                body: vec![],
            },
            Statement::Expression {
                meta: Meta::new(2),
                expr: Expr::Symbol {
                    meta: Meta::new(2),
                    name: "add".into(),
                },
            },
        ];
        assert_eq!(function_names_in(&statements), vec!["add"]);
    }

    #[test]
    fn statement_lists_descends_into_if_and_function_bodies() {
        let program = Program::new(vec![
            Statement::FunctionDefinition {
                meta: Meta::new(1),
                name: "outer".into(),
                parameters: vec![],
                body: vec![Statement::FunctionDefinition {
                    meta: Meta::new(2),
                    name: "inner".into(),
                    parameters: vec![],
                    body: vec![],
                }],
            },
            Statement::Expression {
                meta: Meta::new(3),
                expr: Expr::If {
                    meta: Meta::new(3),
                    condition: Box::new(Expr::Symbol {
                        meta: Meta::new(3),
                        name: "cond".into(),
                    }),
                    then_body: vec![Statement::FunctionDefinition {
                        meta: Meta::new(4),
                        name: "inner".into(),
                        parameters: vec![],
                        body: vec![],
                    }],
                    else_body: vec![],
                },
            },
        ]);
        let lists = program.statement_lists();
        // top-level, outer's body, the if's then body, the if's else body
        assert_eq!(lists.len(), 4);
        let inner_defs: usize = lists
            .iter()
            .map(|list| function_names_in(list).into_iter().filter(|n| *n == "inner").count())
            .sum();
        assert_eq!(inner_defs, 2);
    }
}
