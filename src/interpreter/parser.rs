use std::rc::Rc;

use crate::ast::{
    AccessStep, AssignOp, AssignTarget, BinaryOp, CallArg, Expr, ExprKind, Handler, Param,
    Program, Stmt, UnaryOp,
};
use crate::diagnostic::{Diagnostic, Label, Span};
use crate::token::{Token, TokenKind};
use crate::types::TypeExpr;
use crate::value::Value;

/// A lex or parse failure. Parsing is fail-fast: the first violation
/// aborts with the offending line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub line: u32,
    pub span: Option<Span>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: u32) -> Self {
        Self {
            message: message.into(),
            line,
            span: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(self.message.clone());
        if let Some(span) = self.span {
            diag = diag.with_label(Label::primary(span, ""));
        }
        diag
    }
}

/// Lexes and parses a whole script.
pub fn parse_source(source: &str) -> Result<Program, ParseError> {
    let tokens = crate::lexer::tokenize(source)?;
    TokenParser::new(tokens).parse_program()
}

pub struct TokenParser {
    tokens: Vec<Token>,
    current: usize,
}

impl TokenParser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    pub fn parse_program(mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        while self.peek().is_some() {
            statements.push(self.statement()?);
        }
        Ok(Program { statements })
    }

    // Token helpers

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.current).map(|t| &t.kind)
    }

    fn peek_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.current + offset).map(|t| &t.kind)
    }

    fn line(&self) -> u32 {
        self.tokens
            .get(self.current)
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn span(&self) -> Span {
        self.tokens
            .get(self.current)
            .or_else(|| self.tokens.last())
            .map(|t| t.span)
            .unwrap_or_else(Span::dummy)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.current).cloned();
        if token.is_some() {
            self.current += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        match self.peek() {
            Some(token) => std::mem::discriminant(token) == std::mem::discriminant(kind),
            None => false,
        }
    }

    /// Consume the token if it matches; report whether it did.
    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance().unwrap_or_else(|| unreachable!()))
        } else {
            Err(self.error_here(format!("expected {}", what)))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<(String, u32), ParseError> {
        match self.peek() {
            Some(TokenKind::Ident(_)) => {
                let token = self.advance().unwrap_or_else(|| unreachable!());
                match token.kind {
                    TokenKind::Ident(name) => Ok((name, token.line)),
                    _ => unreachable!(),
                }
            }
            _ => Err(self.error_here(format!("expected {}", what))),
        }
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        let message = message.into();
        let message = match self.peek() {
            Some(found) => format!("{}, found {}", message, describe(found)),
            None => format!("{}, found end of input", message),
        };
        ParseError::new(message, self.line()).with_span(self.span())
    }

    // Statements

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        match self.peek() {
            Some(TokenKind::Var) => self.var_statement(),
            Some(TokenKind::If) => self.if_statement(),
            Some(TokenKind::While) => self.while_statement(),
            Some(TokenKind::Do) => self.do_while_statement(),
            Some(TokenKind::For) => self.for_statement(),
            Some(TokenKind::ForEach) => self.foreach_statement(),
            Some(TokenKind::Break) => {
                let line = self.line();
                self.advance();
                self.expect(&TokenKind::Semicolon, "`;` after break")?;
                Ok(Stmt::Break { line })
            }
            Some(TokenKind::Continue) => {
                let line = self.line();
                self.advance();
                self.expect(&TokenKind::Semicolon, "`;` after continue")?;
                Ok(Stmt::Continue { line })
            }
            Some(TokenKind::Function) => {
                self.advance();
                self.function_declaration()
            }
            Some(TokenKind::Return) => self.return_statement(),
            Some(TokenKind::Print) => self.print_statement(),
            Some(TokenKind::Import) => self.import_statement(),
            Some(TokenKind::Try) => self.try_statement(),
            Some(TokenKind::Raise) => self.raise_statement(),
            Some(TokenKind::Screen) => self.screen_statement(),
            Some(TokenKind::Ident(_)) if self.peek_at(1) == Some(&TokenKind::TypeOf) => {
                self.typedef_statement()
            }
            Some(TokenKind::Ident(_)) if self.looks_like_function_decl() => {
                self.function_declaration()
            }
            Some(_) => self.expression_statement(),
            None => Err(self.error_here("expected a statement")),
        }
    }

    fn var_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.advance();
        let (name, _) = self.expect_ident("a variable name")?;
        let ty = if self.eat(&TokenKind::Colon) {
            Some(self.type_expr()?)
        } else {
            None
        };
        let init = if self.eat(&TokenKind::Assign) {
            Some(self.expression()?)
        } else {
            None
        };
        self.expect(&TokenKind::Semicolon, "`;` after variable declaration")?;
        Ok(Stmt::VarDecl {
            name: Rc::from(name.as_str()),
            ty,
            init,
            line,
        })
    }

    fn if_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.advance();
        let condition = self.expression()?;
        let then_branch = self.branch_body()?;
        let else_branch = if self.eat(&TokenKind::Else) {
            if self.check(&TokenKind::If) {
                Some(vec![self.if_statement()?])
            } else {
                Some(self.branch_body()?)
            }
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
            line,
        })
    }

    /// Either a braced block, or `then` followed by one statement.
    fn branch_body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        if self.eat(&TokenKind::Then) {
            Ok(vec![self.statement()?])
        } else if self.check(&TokenKind::LBrace) {
            self.block()
        } else {
            Ok(vec![self.statement()?])
        }
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&TokenKind::LBrace, "`{`")?;
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.peek().is_none() {
                return Err(self.error_here("expected `}`"));
            }
            statements.push(self.statement()?);
        }
        self.expect(&TokenKind::RBrace, "`}`")?;
        Ok(statements)
    }

    fn while_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.advance();
        let condition = self.expression()?;
        let body = self.block()?;
        Ok(Stmt::While {
            condition,
            body,
            line,
        })
    }

    fn do_while_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.advance();
        let body = self.block()?;
        self.expect(&TokenKind::While, "`while` after do-block")?;
        let condition = self.expression()?;
        self.expect(&TokenKind::Semicolon, "`;` after do-while condition")?;
        Ok(Stmt::DoWhile {
            body,
            condition,
            line,
        })
    }

    fn for_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.advance();
        self.expect(&TokenKind::LParen, "`(` after for")?;

        let init = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.simple_statement()?))
        };
        self.expect(&TokenKind::Semicolon, "`;` after for initializer")?;

        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(&TokenKind::Semicolon, "`;` after for condition")?;

        let step = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(Box::new(self.simple_statement()?))
        };
        self.expect(&TokenKind::RParen, "`)` after for clauses")?;

        let body = self.block()?;
        Ok(Stmt::For {
            init,
            condition,
            step,
            body,
            line,
        })
    }

    /// A declaration or assignment without its trailing semicolon, for the
    /// init/step clauses of a `for` header.
    fn simple_statement(&mut self) -> Result<Stmt, ParseError> {
        if self.check(&TokenKind::Var) {
            let line = self.line();
            self.advance();
            let (name, _) = self.expect_ident("a variable name")?;
            let ty = if self.eat(&TokenKind::Colon) {
                Some(self.type_expr()?)
            } else {
                None
            };
            let init = if self.eat(&TokenKind::Assign) {
                Some(self.expression()?)
            } else {
                None
            };
            return Ok(Stmt::VarDecl {
                name: Rc::from(name.as_str()),
                ty,
                init,
                line,
            });
        }
        let line = self.line();
        let expr = self.expression()?;
        self.finish_assignment(expr, line)
    }

    fn foreach_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.advance();
        let (var, _) = self.expect_ident("a loop variable")?;
        self.expect(&TokenKind::In, "`in`")?;
        let iterable = self.expression()?;
        let body = self.block()?;
        Ok(Stmt::ForEach {
            var: Rc::from(var.as_str()),
            iterable,
            body,
            line,
        })
    }

    fn return_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.advance();
        let value = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(&TokenKind::Semicolon, "`;` after return")?;
        Ok(Stmt::Return { value, line })
    }

    fn print_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.advance();
        let value = self.expression()?;
        self.expect(&TokenKind::Semicolon, "`;` after print")?;
        Ok(Stmt::Print { value, line })
    }

    fn import_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.advance();
        let path = match self.peek() {
            Some(TokenKind::Str(_)) => {
                let token = self.advance().unwrap_or_else(|| unreachable!());
                match token.kind {
                    TokenKind::Str(path) => path,
                    _ => unreachable!(),
                }
            }
            _ => return Err(self.error_here("expected a quoted path after import")),
        };
        self.expect(&TokenKind::Semicolon, "`;` after import")?;
        Ok(Stmt::Import { path, line })
    }

    fn try_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.advance();
        let body = self.block()?;
        self.expect(&TokenKind::Exceptions, "`exceptions` after try block")?;
        self.expect(&TokenKind::LBrace, "`{` after exceptions")?;
        let mut handlers = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            handlers.push(self.when_clause()?);
        }
        self.expect(&TokenKind::RBrace, "`}` after exception handlers")?;
        if handlers.is_empty() {
            return Err(ParseError::new(
                "exceptions block needs at least one when clause",
                line,
            ));
        }
        Ok(Stmt::Try {
            body,
            handlers,
            line,
        })
    }

    fn when_clause(&mut self) -> Result<Handler, ParseError> {
        let line = self.line();
        self.expect(&TokenKind::When, "`when`")?;
        let (kind, _) = self.expect_ident("an exception kind")?;
        let binding = if self.eat(&TokenKind::LParen) {
            let (name, _) = self.expect_ident("a handler variable")?;
            self.expect(&TokenKind::RParen, "`)` after handler variable")?;
            Some(Rc::from(name.as_str()))
        } else {
            None
        };
        let body = self.block()?;
        Ok(Handler {
            kind,
            binding,
            body,
            line,
        })
    }

    fn raise_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.advance();
        self.expect(&TokenKind::Exception, "`exception` after raise")?;
        let (kind, _) = self.expect_ident("an exception kind")?;
        let mut args = Vec::new();
        if self.eat(&TokenKind::LParen) {
            if !self.check(&TokenKind::RParen) {
                loop {
                    args.push(self.expression()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(&TokenKind::RParen, "`)` after exception arguments")?;
        }
        self.expect(&TokenKind::Semicolon, "`;` after raise")?;

        match crate::interpreter::error::ErrorKind::from_name(&kind) {
            Some(crate::interpreter::error::ErrorKind::Any) => {
                return Err(ParseError::new("ANY_ERROR cannot be raised", line));
            }
            Some(standard) if args.len() > 1 => {
                return Err(ParseError::new(
                    format!("{} takes at most one argument", standard),
                    line,
                ));
            }
            _ => {}
        }
        Ok(Stmt::Raise { kind, args, line })
    }

    fn typedef_statement(&mut self) -> Result<Stmt, ParseError> {
        let (name, line) = self.expect_ident("a type name")?;
        self.expect(&TokenKind::TypeOf, "`typeof`")?;
        let ty = self.type_expr()?;
        self.expect(&TokenKind::Semicolon, "`;` after type declaration")?;
        Ok(Stmt::TypeDef { name, ty, line })
    }

    fn screen_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.advance();
        let (name, _) = self.expect_ident("a screen name")?;
        let body = self.block()?;
        Ok(Stmt::Screen {
            name: Rc::from(name.as_str()),
            body,
            line,
        })
    }

    /// `name(a, b: int, c = default) [: type] { ... }` with the `function`
    /// keyword already consumed (or omitted entirely).
    fn function_declaration(&mut self) -> Result<Stmt, ParseError> {
        let (name, line) = self.expect_ident("a function name")?;
        self.expect(&TokenKind::LParen, "`(` after function name")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let (param_name, _) = self.expect_ident("a parameter name")?;
                let ty = if self.eat(&TokenKind::Colon) {
                    Some(self.type_expr()?)
                } else {
                    None
                };
                let default = if self.eat(&TokenKind::Assign) {
                    Some(self.expression()?)
                } else {
                    None
                };
                params.push(Param {
                    name: Rc::from(param_name.as_str()),
                    ty,
                    default,
                });
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "`)` after parameters")?;
        let return_ty = if self.eat(&TokenKind::Colon) {
            Some(self.type_expr()?)
        } else {
            None
        };
        let body = self.block()?;
        Ok(Stmt::Function {
            name: Rc::from(name.as_str()),
            params,
            return_ty,
            body: Rc::new(body),
            line,
        })
    }

    /// `name (...)` followed by `{` or `: type {` reads as a function
    /// declaration with the keyword left out.
    fn looks_like_function_decl(&self) -> bool {
        if !matches!(self.peek(), Some(TokenKind::Ident(_))) {
            return false;
        }
        if self.peek_at(1) != Some(&TokenKind::LParen) {
            return false;
        }
        let mut depth = 0usize;
        let mut i = 1;
        loop {
            match self.peek_at(i) {
                Some(TokenKind::LParen) => depth += 1,
                Some(TokenKind::RParen) => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                Some(_) => {}
                None => return false,
            }
            i += 1;
        }
        matches!(
            self.peek_at(i + 1),
            Some(TokenKind::LBrace) | Some(TokenKind::Colon)
        )
    }

    fn expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        let expr = self.expression()?;
        let stmt = self.finish_assignment(expr, line)?;
        self.expect(&TokenKind::Semicolon, "`;` after statement")?;
        Ok(stmt)
    }

    /// After an expression at statement position, recognize `= += -= *= /=`
    /// and the `++`/`--` sugar; anything else stays an expression statement.
    fn finish_assignment(&mut self, expr: Expr, line: u32) -> Result<Stmt, ParseError> {
        let op = match self.peek() {
            Some(TokenKind::Assign) => Some(AssignOp::Set),
            Some(TokenKind::PlusEq) => Some(AssignOp::Add),
            Some(TokenKind::MinusEq) => Some(AssignOp::Sub),
            Some(TokenKind::StarEq) => Some(AssignOp::Mul),
            Some(TokenKind::SlashEq) => Some(AssignOp::Div),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let target = self.expr_to_target(expr)?;
            let value = self.expression()?;
            return Ok(Stmt::Assign {
                target,
                op,
                value,
                line,
            });
        }
        if self.check(&TokenKind::PlusPlus) || self.check(&TokenKind::MinusMinus) {
            let op = if self.check(&TokenKind::PlusPlus) {
                AssignOp::Add
            } else {
                AssignOp::Sub
            };
            self.advance();
            let target = self.expr_to_target(expr)?;
            let value = Expr::new(ExprKind::Literal(Value::Int(1)), line);
            return Ok(Stmt::Assign {
                target,
                op,
                value,
                line,
            });
        }
        Ok(Stmt::Expr(expr))
    }

    fn expr_to_target(&self, expr: Expr) -> Result<AssignTarget, ParseError> {
        let line = expr.line;
        let mut path = Vec::new();
        let mut cursor = expr;
        loop {
            match cursor.kind {
                ExprKind::Identifier(name) => {
                    path.reverse();
                    return Ok(AssignTarget { name, path, line });
                }
                ExprKind::FieldAccess { object, field } => {
                    path.push(AccessStep::Field(field));
                    cursor = *object;
                }
                ExprKind::Index { object, index } => {
                    path.push(AccessStep::Index(*index));
                    cursor = *object;
                }
                _ => {
                    return Err(ParseError::new(
                        "invalid assignment target",
                        line,
                    ));
                }
            }
        }
    }

    // Type expressions

    fn type_expr(&mut self) -> Result<TypeExpr, ParseError> {
        match self.peek() {
            Some(TokenKind::TyByte) => {
                self.advance();
                Ok(TypeExpr::Byte)
            }
            Some(TokenKind::TyInt) => {
                self.advance();
                Ok(TypeExpr::Int)
            }
            Some(TokenKind::TyLong) => {
                self.advance();
                Ok(TypeExpr::Long)
            }
            Some(TokenKind::TyFloat) => {
                self.advance();
                Ok(TypeExpr::Float)
            }
            Some(TokenKind::TyDouble) => {
                self.advance();
                Ok(TypeExpr::Double)
            }
            Some(TokenKind::TyBool) => {
                self.advance();
                Ok(TypeExpr::Bool)
            }
            Some(TokenKind::TyString) => {
                self.advance();
                Ok(TypeExpr::String)
            }
            Some(TokenKind::TyDate) => {
                self.advance();
                Ok(TypeExpr::Date)
            }
            Some(TokenKind::TyJson) => {
                self.advance();
                Ok(TypeExpr::Json)
            }
            Some(TokenKind::TyRecord) => {
                self.advance();
                self.record_type()
            }
            Some(TokenKind::TyArray) => {
                self.advance();
                self.array_type()
            }
            Some(TokenKind::TyQueue) => {
                self.advance();
                self.expect(&TokenKind::Dot, "`.` after queue")?;
                let elem = self.type_expr()?;
                Ok(TypeExpr::Queue(Box::new(elem)))
            }
            Some(TokenKind::Ident(_)) => {
                let (name, _) = self.expect_ident("a type name")?;
                Ok(TypeExpr::Alias(name))
            }
            _ => Err(self.error_here("expected a type")),
        }
    }

    fn record_type(&mut self) -> Result<TypeExpr, ParseError> {
        self.expect(&TokenKind::LBrace, "`{` after record")?;
        let mut fields = Vec::new();
        if !self.check(&TokenKind::RBrace) {
            loop {
                let (name, _) = self.expect_ident("a field name")?;
                self.expect(&TokenKind::Colon, "`:` after field name")?;
                let ty = self.type_expr()?;
                fields.push((name, ty));
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RBrace, "`}` after record fields")?;
        Ok(TypeExpr::Record(fields))
    }

    fn array_type(&mut self) -> Result<TypeExpr, ParseError> {
        let elem = if self.eat(&TokenKind::Dot) {
            Some(Box::new(self.type_expr()?))
        } else {
            None
        };
        let size = if self.eat(&TokenKind::LBracket) {
            let size = match self.peek() {
                Some(TokenKind::Star) => {
                    self.advance();
                    None
                }
                Some(TokenKind::Int(n)) if *n >= 0 => {
                    let n = *n as usize;
                    self.advance();
                    Some(n)
                }
                _ => return Err(self.error_here("expected an array size or `*`")),
            };
            self.expect(&TokenKind::RBracket, "`]` after array size")?;
            size
        } else {
            None
        };
        Ok(TypeExpr::Array { elem, size })
    }

    // Expressions, loosest binding first.

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.and_expr()?;
        while self.check(&TokenKind::Or) {
            let line = self.line();
            self.advance();
            let right = self.and_expr()?;
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op: BinaryOp::Or,
                    right: Box::new(right),
                },
                line,
            );
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.comparison()?;
        while self.check(&TokenKind::And) {
            let line = self.line();
            self.advance();
            let right = self.comparison()?;
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op: BinaryOp::And,
                    right: Box::new(right),
                },
                line,
            );
        }
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Eq) => BinaryOp::Eq,
                Some(TokenKind::NotEq) => BinaryOp::NotEq,
                Some(TokenKind::Greater) => BinaryOp::Greater,
                Some(TokenKind::Less) => BinaryOp::Less,
                Some(TokenKind::GreaterEq) => BinaryOp::GreaterEq,
                Some(TokenKind::LessEq) => BinaryOp::LessEq,
                _ => break,
            };
            let line = self.line();
            self.advance();
            let right = self.additive()?;
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                line,
            );
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => break,
            };
            let line = self.line();
            self.advance();
            let right = self.term()?;
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                line,
            );
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                Some(TokenKind::Percent) => BinaryOp::Mod,
                _ => break,
            };
            let line = self.line();
            self.advance();
            let right = self.unary()?;
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                line,
            );
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            Some(TokenKind::Bang) => Some(UnaryOp::Not),
            Some(TokenKind::Minus) => Some(UnaryOp::Neg),
            _ => None,
        };
        if let Some(op) = op {
            let line = self.line();
            self.advance();
            let expr = self.unary()?;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op,
                    expr: Box::new(expr),
                },
                line,
            ));
        }
        self.power()
    }

    /// `^` is right-associative and binds tighter than unary minus.
    fn power(&mut self) -> Result<Expr, ParseError> {
        let base = self.postfix()?;
        if self.check(&TokenKind::Caret) {
            let line = self.line();
            self.advance();
            let exponent = self.unary()?;
            return Ok(Expr::new(
                ExprKind::Binary {
                    left: Box::new(base),
                    op: BinaryOp::Pow,
                    right: Box::new(exponent),
                },
                line,
            ));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            if self.check(&TokenKind::Dot) {
                let line = self.line();
                self.advance();
                match self.peek() {
                    Some(TokenKind::Length) | Some(TokenKind::Size) => {
                        self.advance();
                        expr = Expr::new(
                            ExprKind::Length {
                                object: Box::new(expr),
                            },
                            line,
                        );
                    }
                    Some(TokenKind::Ident(_)) => {
                        let (field, _) = self.expect_ident("a field name")?;
                        if self.check(&TokenKind::LParen) {
                            expr = self.builtin_call(expr, field, line)?;
                        } else {
                            expr = Expr::new(
                                ExprKind::FieldAccess {
                                    object: Box::new(expr),
                                    field,
                                },
                                line,
                            );
                        }
                    }
                    _ => return Err(self.error_here("expected a field name after `.`")),
                }
            } else if self.check(&TokenKind::LBracket) {
                let line = self.line();
                self.advance();
                let index = self.expression()?;
                self.expect(&TokenKind::RBracket, "`]` after index")?;
                expr = Expr::new(
                    ExprKind::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    },
                    line,
                );
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// `ns.name(args)`. Only a bare identifier can be a namespace.
    fn builtin_call(&mut self, object: Expr, name: String, line: u32) -> Result<Expr, ParseError> {
        let namespace = match object.kind {
            ExprKind::Identifier(ns) => ns.to_string(),
            _ => {
                return Err(ParseError::new(
                    "calls are only supported on namespaces",
                    line,
                ))
            }
        };
        self.expect(&TokenKind::LParen, "`(`")?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.expression()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "`)` after arguments")?;
        Ok(Expr::new(
            ExprKind::BuiltinCall {
                namespace,
                name,
                args,
                line,
            },
            line,
        ))
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        match self.peek() {
            Some(TokenKind::Int(_))
            | Some(TokenKind::Long(_))
            | Some(TokenKind::Num(_))
            | Some(TokenKind::Str(_))
            | Some(TokenKind::True)
            | Some(TokenKind::False)
            | Some(TokenKind::Null) => {
                let token = self.advance().unwrap_or_else(|| unreachable!());
                let value = match token.kind {
                    TokenKind::Int(i) => Value::Int(i),
                    TokenKind::Long(l) => Value::Long(l),
                    TokenKind::Num(x) => Value::Double(x),
                    TokenKind::Str(s) => Value::string(&s),
                    TokenKind::True => Value::Bool(true),
                    TokenKind::False => Value::Bool(false),
                    TokenKind::Null => Value::Null,
                    _ => unreachable!(),
                };
                Ok(Expr::new(ExprKind::Literal(value), line))
            }
            Some(TokenKind::Cast) => {
                self.advance();
                self.expect(&TokenKind::LParen, "`(` after cast")?;
                let expr = self.expression()?;
                self.expect(&TokenKind::Comma, "`,` between cast value and type")?;
                let ty = self.type_expr()?;
                self.expect(&TokenKind::RParen, "`)` after cast")?;
                Ok(Expr::new(
                    ExprKind::Cast {
                        expr: Box::new(expr),
                        ty,
                    },
                    line,
                ))
            }
            Some(TokenKind::TypeOf) => {
                self.advance();
                self.expect(&TokenKind::LParen, "`(` after typeof")?;
                let expr = self.expression()?;
                self.expect(&TokenKind::RParen, "`)` after typeof")?;
                Ok(Expr::new(
                    ExprKind::TypeOf {
                        expr: Box::new(expr),
                    },
                    line,
                ))
            }
            Some(TokenKind::Ident(_)) => {
                let (name, _) = self.expect_ident("an identifier")?;
                if self.check(&TokenKind::LParen) {
                    self.user_call(name, line)
                } else {
                    Ok(Expr::new(
                        ExprKind::Identifier(Rc::from(name.as_str())),
                        line,
                    ))
                }
            }
            // Builtin namespaces that share a spelling with a type keyword,
            // as in `string.len(..)` or `array.push(..)`.
            Some(TokenKind::TyString)
            | Some(TokenKind::TyArray)
            | Some(TokenKind::TyJson)
            | Some(TokenKind::TyQueue)
            | Some(TokenKind::TyDate)
                if self.peek_at(1) == Some(&TokenKind::Dot) =>
            {
                let name = match self.advance().map(|t| t.kind) {
                    Some(TokenKind::TyString) => "string",
                    Some(TokenKind::TyArray) => "array",
                    Some(TokenKind::TyJson) => "json",
                    Some(TokenKind::TyQueue) => "queue",
                    Some(TokenKind::TyDate) => "date",
                    _ => unreachable!(),
                };
                Ok(Expr::new(ExprKind::Identifier(Rc::from(name)), line))
            }
            Some(TokenKind::LParen) => {
                self.advance();
                let expr = self.expression()?;
                self.expect(&TokenKind::RParen, "`)`")?;
                Ok(expr)
            }
            Some(TokenKind::LBracket) => {
                self.advance();
                let elements = self.expr_list(&TokenKind::RBracket)?;
                self.expect(&TokenKind::RBracket, "`]` after array elements")?;
                Ok(Expr::new(ExprKind::Array { elements }, line))
            }
            Some(TokenKind::LBrace) => self.brace_literal(line),
            _ => Err(self.error_here("expected an expression")),
        }
    }

    fn user_call(&mut self, name: String, line: u32) -> Result<Expr, ParseError> {
        self.expect(&TokenKind::LParen, "`(`")?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.call_arg()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "`)` after arguments")?;
        Ok(Expr::new(
            ExprKind::Call {
                name: Rc::from(name.as_str()),
                args,
                line,
            },
            line,
        ))
    }

    fn call_arg(&mut self) -> Result<CallArg, ParseError> {
        if matches!(self.peek(), Some(TokenKind::Ident(_)))
            && self.peek_at(1) == Some(&TokenKind::Assign)
        {
            let (name, _) = self.expect_ident("an argument name")?;
            self.advance();
            let value = self.expression()?;
            return Ok(CallArg::Named { name, value });
        }
        Ok(CallArg::Positional(self.expression()?))
    }

    fn expr_list(&mut self, terminator: &TokenKind) -> Result<Vec<Expr>, ParseError> {
        let mut elements = Vec::new();
        if !self.check(terminator) {
            loop {
                elements.push(self.expression()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        Ok(elements)
    }

    /// `{ "k": v }` is a json object literal; any other braced list is an
    /// array literal. `{}` is the empty json object.
    fn brace_literal(&mut self, line: u32) -> Result<Expr, ParseError> {
        let is_object = matches!(self.peek_at(1), Some(TokenKind::Str(_)) | Some(TokenKind::RBrace))
            && (self.peek_at(1) == Some(&TokenKind::RBrace)
                || self.peek_at(2) == Some(&TokenKind::Colon));
        self.expect(&TokenKind::LBrace, "`{`")?;
        if is_object {
            let mut fields = Vec::new();
            if !self.check(&TokenKind::RBrace) {
                loop {
                    let key = match self.peek() {
                        Some(TokenKind::Str(_)) => {
                            let token = self.advance().unwrap_or_else(|| unreachable!());
                            match token.kind {
                                TokenKind::Str(key) => key,
                                _ => unreachable!(),
                            }
                        }
                        _ => return Err(self.error_here("expected a quoted key")),
                    };
                    self.expect(&TokenKind::Colon, "`:` after key")?;
                    let value = self.expression()?;
                    fields.push((key, value));
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(&TokenKind::RBrace, "`}` after object fields")?;
            return Ok(Expr::new(ExprKind::JsonObject { fields }, line));
        }
        let elements = self.expr_list(&TokenKind::RBrace)?;
        self.expect(&TokenKind::RBrace, "`}` after array elements")?;
        Ok(Expr::new(ExprKind::Array { elements }, line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        parse_source(source).unwrap_or_else(|e| panic!("parse failed: {} (line {})", e.message, e.line))
    }

    fn parse_err(source: &str) -> ParseError {
        parse_source(source).expect_err("expected a parse error")
    }

    #[test]
    fn test_var_with_type_and_init() {
        let program = parse("var n: int = 5;");
        match &program.statements[0] {
            Stmt::VarDecl { name, ty, init, .. } => {
                assert_eq!(name.as_ref(), "n");
                assert_eq!(ty, &Some(TypeExpr::Int));
                assert!(init.is_some());
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_precedence_mul_before_add() {
        let program = parse("var x = 1 + 2 * 3;");
        match &program.statements[0] {
            Stmt::VarDecl { init: Some(expr), .. } => match &expr.kind {
                ExprKind::Binary { op, right, .. } => {
                    assert_eq!(*op, BinaryOp::Add);
                    assert!(matches!(
                        right.kind,
                        ExprKind::Binary { op: BinaryOp::Mul, .. }
                    ));
                }
                other => panic!("unexpected expr {:?}", other),
            },
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_power_is_right_associative() {
        let program = parse("var x = 2 ^ 3 ^ 2;");
        match &program.statements[0] {
            Stmt::VarDecl { init: Some(expr), .. } => match &expr.kind {
                ExprKind::Binary { op, right, .. } => {
                    assert_eq!(*op, BinaryOp::Pow);
                    assert!(matches!(
                        right.kind,
                        ExprKind::Binary { op: BinaryOp::Pow, .. }
                    ));
                }
                other => panic!("unexpected expr {:?}", other),
            },
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_empty_for_header() {
        let program = parse("for (;;) { break; }");
        match &program.statements[0] {
            Stmt::For {
                init,
                condition,
                step,
                ..
            } => {
                assert!(init.is_none());
                assert!(condition.is_none());
                assert!(step.is_none());
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_increment_sugar() {
        let program = parse("var i = 0; i++; i += 2;");
        assert!(matches!(
            &program.statements[1],
            Stmt::Assign { op: AssignOp::Add, .. }
        ));
        assert!(matches!(
            &program.statements[2],
            Stmt::Assign { op: AssignOp::Add, .. }
        ));
    }

    #[test]
    fn test_function_keyword_optional() {
        let with_kw = parse("function add(a, b) { return a + b; }");
        let without = parse("add(a, b) { return a + b; }");
        assert_eq!(with_kw, without);
    }

    #[test]
    fn test_call_vs_declaration() {
        let program = parse("add(1, 2);");
        assert!(matches!(&program.statements[0], Stmt::Expr(_)));
    }

    #[test]
    fn test_named_call_arguments() {
        let program = parse("var x = greet(name = \"Ada\", 1);");
        match &program.statements[0] {
            Stmt::VarDecl { init: Some(expr), .. } => match &expr.kind {
                ExprKind::Call { args, .. } => {
                    assert!(matches!(args[0], CallArg::Named { .. }));
                    assert!(matches!(args[1], CallArg::Positional(_)));
                }
                other => panic!("unexpected expr {:?}", other),
            },
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_try_exceptions_when() {
        let program = parse(
            "try { var x = 1; } exceptions { when math_error(m) { print m; } when any_error { print 0; } }",
        );
        match &program.statements[0] {
            Stmt::Try { handlers, .. } => {
                assert_eq!(handlers.len(), 2);
                assert_eq!(handlers[0].kind, "math_error");
                assert!(handlers[0].binding.is_some());
                assert!(handlers[1].binding.is_none());
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_raise_standard_arity_enforced() {
        let err = parse_err("raise exception math_error(1, 2);");
        assert!(err.message.contains("at most one argument"));
        let err = parse_err("raise exception any_error;");
        assert!(err.message.contains("cannot be raised"));
        parse("raise exception quota(1, 2, 3);");
    }

    #[test]
    fn test_typedef_and_composed_types() {
        let program = parse("id typeof long; user typeof record {name: string, tags: array.int[3]};");
        assert!(matches!(&program.statements[0], Stmt::TypeDef { .. }));
        match &program.statements[1] {
            Stmt::TypeDef { ty: TypeExpr::Record(fields), .. } => {
                assert_eq!(fields[1].0, "tags");
                assert_eq!(
                    fields[1].1,
                    TypeExpr::Array {
                        elem: Some(Box::new(TypeExpr::Int)),
                        size: Some(3),
                    }
                );
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_json_object_vs_array_braces() {
        let program = parse("var j = {\"a\": 1}; var a = {1, 2}; var e = {};");
        assert!(matches!(
            &program.statements[0],
            Stmt::VarDecl { init: Some(Expr { kind: ExprKind::JsonObject { .. }, .. }), .. }
        ));
        assert!(matches!(
            &program.statements[1],
            Stmt::VarDecl { init: Some(Expr { kind: ExprKind::Array { .. }, .. }), .. }
        ));
        assert!(matches!(
            &program.statements[2],
            Stmt::VarDecl { init: Some(Expr { kind: ExprKind::JsonObject { .. }, .. }), .. }
        ));
    }

    #[test]
    fn test_builtin_call_namespacing() {
        let program = parse("var n = string.len(\"abc\");");
        match &program.statements[0] {
            Stmt::VarDecl { init: Some(expr), .. } => match &expr.kind {
                ExprKind::BuiltinCall { namespace, name, args, .. } => {
                    assert_eq!(namespace, "string");
                    assert_eq!(name, "len");
                    assert_eq!(args.len(), 1);
                }
                other => panic!("unexpected expr {:?}", other),
            },
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_length_postfix() {
        let program = parse("var n = xs.length; var m = xs.size;");
        for stmt in &program.statements {
            match stmt {
                Stmt::VarDecl { init: Some(expr), .. } => {
                    assert!(matches!(expr.kind, ExprKind::Length { .. }));
                }
                other => panic!("unexpected statement {:?}", other),
            }
        }
    }

    #[test]
    fn test_parse_is_deterministic() {
        let source = "function f(a, b = 2) { return a ^ b; }\nforeach x in {1, 2} { print x; }";
        assert_eq!(parse(source), parse(source));
    }

    #[test]
    fn test_fail_fast_reports_line() {
        let err = parse_err("var x = 1;\nvar y = ;\nvar z = 3;");
        assert_eq!(err.line, 2);
        assert!(err.message.contains("expected an expression"));
    }

    #[test]
    fn test_break_outside_loop_parses() {
        parse("break;");
        parse("continue;");
    }

    #[test]
    fn test_if_then_single_statement() {
        let program = parse("if x > 1 then print x; else print 0;");
        match &program.statements[0] {
            Stmt::If { then_branch, else_branch, .. } => {
                assert_eq!(then_branch.len(), 1);
                assert_eq!(else_branch.as_ref().map(|b| b.len()), Some(1));
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_screen_declaration() {
        let program = parse("screen main { print \"hi\"; }");
        match &program.statements[0] {
            Stmt::Screen { name, body, .. } => {
                assert_eq!(name.as_ref(), "main");
                assert_eq!(body.len(), 1);
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Ident(name) => format!("`{}`", name),
        TokenKind::Str(_) => "a string".to_string(),
        TokenKind::Int(n) => format!("`{}`", n),
        TokenKind::Long(n) => format!("`{}`", n),
        TokenKind::Num(n) => format!("`{}`", n),
        other => format!("`{:?}`", other),
    }
}
