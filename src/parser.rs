//! Recursive-descent parser: tokens to the surface tree ([`crate::ast`]).
//!
//! Precedence climbs bottom-up through named levels, each one a function
//! that is either a literal expression with postfix `(...)`/`[...]`
//! chaining, or a left-associative binary level built on the level below
//! it. Comparison chains (`a < b < c`) are parsed left-associatively here
//! and rewritten into exactly-once-evaluated pairwise comparisons later,
//! during normalization.

use crate::ast::{Expr, InfixLevel, Meta, Program, Statement};
use crate::builtins::{is_builtin, is_reserved_name};
use crate::error::{CompileError, Result};
use crate::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    pub fn parse(source: &str) -> Result<Program> {
        let tokens = crate::token::tokenize(source)?;
        Self::parse_tokens(tokens)
    }

    pub fn parse_tokens(tokens: Vec<Token>) -> Result<Program> {
        let mut parser = Parser::new(tokens);
        let program = parser.parse_program()?;
        if let Some(tok) = parser.peek() {
            return Err(CompileError::UnexpectedToken {
                line: tok.line,
                lexeme: tok.lexeme.clone(),
            });
        }
        Ok(program)
    }

    pub fn parse_program(&mut self) -> Result<Program> {
        let mut statements = Vec::new();
        self.skip_newlines();
        while !self.at_end() {
            statements.push(self.parse_statement()?);
            self.skip_newlines();
        }
        Ok(Program::new(statements))
    }

    // ---- token-stream helpers ----

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn current_line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        self.pos += 1;
        tok
    }

    fn skip_newlines(&mut self) {
        while self.peek_kind() == Some(TokenKind::Newline) {
            self.pos += 1;
        }
    }

    fn check_symbol(&self, text: &str) -> bool {
        matches!(self.peek(), Some(t) if t.kind == TokenKind::Symbol && t.lexeme == text)
    }

    fn check_keyword(&self, text: &str) -> bool {
        matches!(self.peek(), Some(t) if (t.kind == TokenKind::Keyword || t.kind == TokenKind::Symbol) && t.lexeme == text)
    }

    fn consume_keyword(&mut self, text: &'static str) -> Result<()> {
        if self.check_keyword(text) {
            self.pos += 1;
            Ok(())
        } else {
            let line = self.current_line();
            let found = self
                .peek()
                .map(|t| t.lexeme.clone())
                .unwrap_or_else(|| "end of input".to_string());
            Err(CompileError::ExpectedDelimiter {
                line,
                expected: text,
                found,
            })
        }
    }

    fn consume_kind(&mut self, kind: TokenKind, expected: &'static str) -> Result<Token> {
        if self.peek_kind() == Some(kind) {
            Ok(self.advance())
        } else {
            let line = self.current_line();
            let found = self
                .peek()
                .map(|t| t.lexeme.clone())
                .unwrap_or_else(|| "end of input".to_string());
            Err(CompileError::ExpectedDelimiter {
                line,
                expected,
                found,
            })
        }
    }

    // ---- statements ----

    fn parse_statement(&mut self) -> Result<Statement> {
        if self.check_keyword("def") {
            return self.parse_function_definition();
        }
        if self.is_assignment_ahead() {
            return self.parse_assignment();
        }
        let line = self.current_line();
        let expr = self.parse_or_level()?;
        Ok(Statement::Expression {
            meta: Meta::new(line),
            expr,
        })
    }

    fn is_assignment_ahead(&self) -> bool {
        matches!(
            (self.tokens.get(self.pos), self.tokens.get(self.pos + 1)),
            (Some(a), Some(b)) if a.kind == TokenKind::Symbol && b.kind == TokenKind::AssignmentOperator
        )
    }

    fn parse_assignment(&mut self) -> Result<Statement> {
        let line = self.current_line();
        let name_tok = self.consume_kind(TokenKind::Symbol, "identifier")?;
        if is_builtin(&name_tok.lexeme) {
            return Err(CompileError::AssignToBuiltin {
                line: name_tok.line,
                name: name_tok.lexeme,
            });
        }
        if is_reserved_name(&name_tok.lexeme) {
            return Err(CompileError::ReservedNameDeclared {
                line: name_tok.line,
                name: name_tok.lexeme,
            });
        }
        self.consume_kind(TokenKind::AssignmentOperator, "=")?;
        let value = self.parse_or_level()?;
        Ok(Statement::Assignment {
            meta: Meta::new(line),
            name: name_tok.lexeme,
            value,
        })
    }

    fn parse_function_definition(&mut self) -> Result<Statement> {
        let line = self.current_line();
        self.consume_keyword("def")?;
        let name_tok = self.consume_kind(TokenKind::Symbol, "function name")?;
        if is_builtin(&name_tok.lexeme) {
            return Err(CompileError::AssignToBuiltin {
                line: name_tok.line,
                name: name_tok.lexeme,
            });
        }
        if is_reserved_name(&name_tok.lexeme) {
            return Err(CompileError::ReservedNameDeclared {
                line: name_tok.line,
                name: name_tok.lexeme,
            });
        }
        self.consume_kind(TokenKind::OpenParen, "(")?;
        let mut parameters = Vec::new();
        if self.peek_kind() != Some(TokenKind::CloseParen) {
            loop {
                let param = self.consume_kind(TokenKind::Symbol, "parameter name")?;
                if is_reserved_name(&param.lexeme) {
                    return Err(CompileError::ReservedNameDeclared {
                        line: param.line,
                        name: param.lexeme,
                    });
                }
                parameters.push(param.lexeme);
                self.skip_newlines();
                if self.peek_kind() == Some(TokenKind::Comma) {
                    self.pos += 1;
                    self.skip_newlines();
                    continue;
                }
                break;
            }
        }
        self.consume_kind(TokenKind::CloseParen, ")")?;
        self.consume_keyword("do")?;
        let body = self.parse_block(&["end"])?;
        self.consume_keyword("end")?;
        Ok(Statement::FunctionDefinition {
            meta: Meta::new(line),
            name: name_tok.lexeme,
            parameters,
            body,
        })
    }

    /// Parses statements until a keyword in `terminators` is seen (without
    /// consuming it).
    fn parse_block(&mut self, terminators: &[&str]) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();
        self.skip_newlines();
        while !self.at_end() && !terminators.iter().any(|t| self.check_keyword(t)) {
            statements.push(self.parse_statement()?);
            self.skip_newlines();
        }
        Ok(statements)
    }

    // ---- expressions, precedence low to high in call order ----

    fn parse_or_level(&mut self) -> Result<Expr> {
        let mut left = self.parse_and_level()?;
        while self.check_symbol("or") {
            let meta = Meta::new(self.current_line());
            self.pos += 1;
            let right = self.parse_and_level()?;
            left = Expr::Infix {
                meta,
                level: InfixLevel::Or,
                operator: "or".to_string(),
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and_level(&mut self) -> Result<Expr> {
        let mut left = self.parse_comparison_level()?;
        while self.check_symbol("and") {
            let meta = Meta::new(self.current_line());
            self.pos += 1;
            let right = self.parse_comparison_level()?;
            left = Expr::Infix {
                meta,
                level: InfixLevel::And,
                operator: "and".to_string(),
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_comparison_level(&mut self) -> Result<Expr> {
        let mut left = self.parse_addition_level()?;
        while self.peek_kind() == Some(TokenKind::ComparisonLevelOperator) {
            let op_tok = self.advance();
            let right = self.parse_addition_level()?;
            left = Expr::Infix {
                meta: Meta::new(op_tok.line),
                level: InfixLevel::Comparison,
                operator: op_tok.lexeme,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_addition_level(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplication_level()?;
        while self.peek_kind() == Some(TokenKind::AdditionLevelOperator) {
            let op_tok = self.advance();
            let right = self.parse_multiplication_level()?;
            left = Expr::Infix {
                meta: Meta::new(op_tok.line),
                level: InfixLevel::Addition,
                operator: op_tok.lexeme,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplication_level(&mut self) -> Result<Expr> {
        let mut left = self.parse_negation_level()?;
        while self.peek_kind() == Some(TokenKind::MultiplicationLevelOperator) {
            let op_tok = self.advance();
            let right = self.parse_negation_level()?;
            left = Expr::Infix {
                meta: Meta::new(op_tok.line),
                level: InfixLevel::Multiplication,
                operator: op_tok.lexeme,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_negation_level(&mut self) -> Result<Expr> {
        if self.peek_kind() == Some(TokenKind::AdditionLevelOperator)
            && self.peek().map(|t| t.lexeme.as_str()) == Some("-")
        {
            let meta = Meta::new(self.current_line());
            self.pos += 1;
            let value = self.parse_negation_level()?;
            return Ok(Expr::Negation {
                meta,
                value: Box::new(value),
            });
        }
        self.parse_dot_level()
    }

    fn parse_dot_level(&mut self) -> Result<Expr> {
        let mut expr = self.parse_literal_level()?;
        while self.peek_kind() == Some(TokenKind::Period) {
            let meta = Meta::new(self.current_line());
            self.pos += 1;
            let field_tok = self.consume_kind(TokenKind::Symbol, "field name")?;
            expr = Expr::Dot {
                meta,
                object: Box::new(expr),
                field: field_tok.lexeme,
            };
        }
        Ok(expr)
    }

    /// Literal-level expressions with postfix `(...)`/`[...]` chaining
    /// applied greedily and left-associatively: `f(x)(y)[0]` parses as
    /// `ListIndex(Call(Call(f, x), y), 0)`.
    fn parse_literal_level(&mut self) -> Result<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            match self.peek_kind() {
                Some(TokenKind::OpenParen) => {
                    let meta = Meta::new(self.current_line());
                    self.pos += 1;
                    let arguments = self.parse_comma_separated(TokenKind::CloseParen)?;
                    self.consume_kind(TokenKind::CloseParen, ")")?;
                    expr = Expr::Call {
                        meta,
                        function: Box::new(expr),
                        arguments,
                    };
                }
                Some(TokenKind::OpenBracket) => {
                    let meta = Meta::new(self.current_line());
                    self.pos += 1;
                    self.skip_newlines();
                    let index = self.parse_or_level()?;
                    self.skip_newlines();
                    self.consume_kind(TokenKind::CloseBracket, "]")?;
                    expr = Expr::ListIndex {
                        meta,
                        list: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_comma_separated(&mut self, terminator: TokenKind) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        self.skip_newlines();
        if self.peek_kind() == Some(terminator) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_or_level()?);
            self.skip_newlines();
            if self.peek_kind() == Some(TokenKind::Comma) {
                self.pos += 1;
                self.skip_newlines();
                continue;
            }
            break;
        }
        Ok(items)
    }

    fn parse_atom(&mut self) -> Result<Expr> {
        let line = self.current_line();
        match self.peek_kind() {
            Some(TokenKind::IntegerLiteral) => {
                let tok = self.advance();
                let value = tok.lexeme.parse::<i64>().map_err(|_| CompileError::InternalError(
                    format!("integer literal '{}' failed to parse", tok.lexeme),
                ))?;
                Ok(Expr::IntegerLiteral {
                    meta: Meta::new(tok.line),
                    value,
                })
            }
            Some(TokenKind::SingleQuotedStringLiteral) | Some(TokenKind::DoubleQuotedStringLiteral) => {
                let tok = self.advance();
                let inner = &tok.lexeme[1..tok.lexeme.len() - 1];
                Ok(Expr::StringLiteral {
                    meta: Meta::new(tok.line),
                    value: inner.to_string(),
                })
            }
            Some(TokenKind::OpenParen) if self.struct_literal_follows() => self.parse_struct_literal(),
            Some(TokenKind::OpenParen) => {
                self.pos += 1;
                self.skip_newlines();
                let inner = self.parse_or_level()?;
                self.skip_newlines();
                self.consume_kind(TokenKind::CloseParen, ")")?;
                Ok(inner)
            }
            Some(TokenKind::OpenBracket) => {
                self.pos += 1;
                let items = self.parse_comma_separated(TokenKind::CloseBracket)?;
                self.consume_kind(TokenKind::CloseBracket, "]")?;
                Ok(Expr::ListLiteral {
                    meta: Meta::new(line),
                    items,
                })
            }
            Some(TokenKind::Symbol) if self.check_keyword("if") => self.parse_if_expression(),
            Some(TokenKind::Symbol) => {
                let tok = self.advance();
                Ok(Expr::Symbol {
                    meta: Meta::new(tok.line),
                    name: tok.lexeme,
                })
            }
            _ => Err(CompileError::ExpectedExpression {
                line,
                context: "in expression position",
            }),
        }
    }

    /// `(` is shared by grouping expressions, call-argument lists, and
    /// struct literals; a struct literal is the only one of the three
    /// that can start with `symbol ':'` immediately inside the paren
    /// (skipping any blank lines), so that's the lookahead that picks it
    /// out before committing to either parse.
    fn struct_literal_follows(&self) -> bool {
        let mut i = self.pos + 1;
        while matches!(self.tokens.get(i).map(|t| t.kind), Some(TokenKind::Newline)) {
            i += 1;
        }
        matches!(self.tokens.get(i).map(|t| t.kind), Some(TokenKind::Symbol))
            && matches!(self.tokens.get(i + 1).map(|t| t.kind), Some(TokenKind::Colon))
    }

    fn parse_struct_literal(&mut self) -> Result<Expr> {
        let meta = Meta::new(self.current_line());
        self.consume_kind(TokenKind::OpenParen, "(")?;
        let mut fields = Vec::new();
        self.skip_newlines();
        if self.peek_kind() != Some(TokenKind::CloseParen) {
            loop {
                let key_tok = self.consume_kind(TokenKind::Symbol, "field name")?;
                self.consume_kind(TokenKind::Colon, ":")?;
                let value = self.parse_or_level()?;
                fields.push((key_tok.lexeme, value));
                self.skip_newlines();
                if self.peek_kind() == Some(TokenKind::Comma) {
                    self.pos += 1;
                    self.skip_newlines();
                    continue;
                }
                break;
            }
        }
        self.consume_kind(TokenKind::CloseParen, ")")?;
        Ok(Expr::StructLiteral { meta, fields })
    }

    fn parse_if_expression(&mut self) -> Result<Expr> {
        let meta = Meta::new(self.current_line());
        self.consume_keyword("if")?;
        let condition = self.parse_or_level()?;
        self.consume_keyword("do")?;
        let then_body = self.parse_block(&["else", "end"])?;
        let else_body = if self.check_keyword("else") {
            self.pos += 1;
            self.parse_block(&["end"])?
        } else {
            Vec::new()
        };
        self.consume_keyword("end")?;
        Ok(Expr::If {
            meta,
            condition: Box::new(condition),
            then_body,
            else_body,
        })
    }
}
