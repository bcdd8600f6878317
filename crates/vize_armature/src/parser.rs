//! Render-function parser.
//!
//! Recursive descent over the token list produced by [`Tokenizer`]. Nodes are
//! allocated straight into a caller-supplied [`Ast`] arena so that several
//! render functions can share one arena.

use vize_carton::CompactString;
use vize_relief::ast::{Ast, AstId, AstKind, BinaryOp, DeclKind, Property, UnaryOp};

use crate::tokenizer::{Punct, Token, TokenKind, Tokenizer};
use crate::ParseError;

/// Maximum expression/statement nesting accepted by the parser.
pub const MAX_NESTING: usize = 256;

const KEYWORDS: &[&str] = &[
    "function", "return", "const", "let", "if", "else", "true", "false", "null",
];

fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

/// Parser state
pub struct Parser<'a> {
    ast: &'a mut Ast,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(ast: &'a mut Ast, source: &str) -> Result<Self, ParseError> {
        let tokens = Tokenizer::new(source).tokenize()?;
        Ok(Self {
            ast,
            tokens,
            pos: 0,
            depth: 0,
        })
    }

    /// Parse a whole program.
    ///
    /// A leading `function` declaration is parsed as the render function;
    /// anything else is treated as the body of an anonymous one.
    pub fn parse_program(&mut self) -> Result<AstId, ParseError> {
        let root = if self.at_keyword("function") {
            let function = self.parse_function()?;
            self.eat(Punct::Semi);
            function
        } else {
            let mut body = Vec::new();
            loop {
                while self.eat(Punct::Semi) {}
                if self.at_eof() {
                    break;
                }
                body.push(self.parse_statement()?);
            }
            self.ast.alloc(AstKind::Function {
                name: None,
                params: Vec::new(),
                body,
            })
        };
        if !self.at_eof() {
            return Err(self.unexpected("end of input"));
        }
        Ok(root)
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn peek(&self) -> &TokenKind {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> &TokenKind {
        let index = (self.pos + ahead).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn offset(&self) -> usize {
        let index = self.pos.min(self.tokens.len() - 1);
        self.tokens[index].offset
    }

    fn bump(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        kind
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    fn at(&self, punct: Punct) -> bool {
        matches!(self.peek(), TokenKind::Punct(p) if *p == punct)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), TokenKind::Ident(name) if name == keyword)
    }

    fn eat(&mut self, punct: Punct) -> bool {
        if self.at(punct) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: Punct, what: &str) -> Result<(), ParseError> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_ident(&mut self) -> Result<CompactString, ParseError> {
        match self.peek() {
            TokenKind::Ident(name) if !is_keyword(name) => {
                let name = name.clone();
                self.bump();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let found = match self.peek() {
            TokenKind::Ident(name) => format!("`{}`", name),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::Num(_) => "number".to_string(),
            TokenKind::Punct(p) => format!("{:?}", p),
            TokenKind::Eof => "end of input".to_string(),
        };
        ParseError::new(
            format!("expected {}, found {}", expected, found),
            self.offset(),
        )
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ParseError::new("nesting too deep", self.offset()));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_function(&mut self) -> Result<AstId, ParseError> {
        self.bump(); // function
        let name = match self.peek() {
            TokenKind::Ident(_) => Some(self.expect_ident()?),
            _ => None,
        };
        self.expect(Punct::LeftParen, "`(`")?;
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        Ok(self.ast.alloc(AstKind::Function { name, params, body }))
    }

    /// Parameter names up to and including the closing `)`.
    fn parse_params(&mut self) -> Result<Vec<CompactString>, ParseError> {
        let mut params = Vec::new();
        while !self.eat(Punct::RightParen) {
            params.push(self.expect_ident()?);
            if !self.eat(Punct::Comma) {
                self.expect(Punct::RightParen, "`)`")?;
                break;
            }
        }
        Ok(params)
    }

    fn parse_block(&mut self) -> Result<Vec<AstId>, ParseError> {
        self.expect(Punct::LeftBrace, "`{`")?;
        let mut body = Vec::new();
        loop {
            while self.eat(Punct::Semi) {}
            if self.eat(Punct::RightBrace) {
                break;
            }
            if self.at_eof() {
                return Err(self.unexpected("`}`"));
            }
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    /// A braced block or a single statement.
    fn parse_branch(&mut self) -> Result<Vec<AstId>, ParseError> {
        if self.at(Punct::LeftBrace) {
            self.parse_block()
        } else {
            Ok(vec![self.parse_statement()?])
        }
    }

    fn parse_statement(&mut self) -> Result<AstId, ParseError> {
        self.enter()?;
        let stmt = self.parse_statement_inner();
        self.leave();
        stmt
    }

    fn parse_statement_inner(&mut self) -> Result<AstId, ParseError> {
        if self.at_keyword("return") {
            self.bump();
            let argument = if self.at(Punct::Semi) || self.at(Punct::RightBrace) || self.at_eof()
            {
                None
            } else {
                Some(self.parse_expression()?)
            };
            self.eat(Punct::Semi);
            return Ok(self.ast.alloc(AstKind::Return(argument)));
        }

        if self.at_keyword("const") || self.at_keyword("let") {
            let kind = if self.at_keyword("const") {
                DeclKind::Const
            } else {
                DeclKind::Let
            };
            self.bump();
            let name = self.expect_ident()?;
            self.expect(Punct::Assign, "`=`")?;
            let init = self.parse_expression()?;
            self.eat(Punct::Semi);
            return Ok(self.ast.alloc(AstKind::Declare { kind, name, init }));
        }

        if self.at_keyword("if") {
            self.bump();
            self.expect(Punct::LeftParen, "`(`")?;
            let test = self.parse_expression()?;
            self.expect(Punct::RightParen, "`)`")?;
            let consequent = self.parse_branch()?;
            let alternate = if self.at_keyword("else") {
                self.bump();
                Some(self.parse_branch()?)
            } else {
                None
            };
            return Ok(self.ast.alloc(AstKind::If {
                test,
                consequent,
                alternate,
            }));
        }

        if self.at_keyword("function") {
            return Err(ParseError::new(
                "nested function declarations are not supported",
                self.offset(),
            ));
        }

        let expr = self.parse_expression()?;
        self.eat(Punct::Semi);
        Ok(self.ast.alloc(AstKind::Expr(expr)))
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Assignment-level expression: an arrow function or a conditional.
    pub fn parse_expression(&mut self) -> Result<AstId, ParseError> {
        self.enter()?;
        let expr = if self.is_arrow_start() {
            self.parse_arrow()
        } else {
            self.parse_conditional()
        };
        self.leave();
        expr
    }

    fn is_arrow_start(&self) -> bool {
        match self.peek() {
            TokenKind::Ident(name) if !is_keyword(name) => {
                matches!(self.peek_at(1), TokenKind::Punct(Punct::Arrow))
            }
            TokenKind::Punct(Punct::LeftParen) => {
                // `( ident, ident ) =>` or `() =>`
                let mut ahead = 1;
                loop {
                    match self.peek_at(ahead) {
                        TokenKind::Punct(Punct::RightParen) => {
                            return matches!(
                                self.peek_at(ahead + 1),
                                TokenKind::Punct(Punct::Arrow)
                            );
                        }
                        TokenKind::Ident(_) | TokenKind::Punct(Punct::Comma) => ahead += 1,
                        _ => return false,
                    }
                }
            }
            _ => false,
        }
    }

    fn parse_arrow(&mut self) -> Result<AstId, ParseError> {
        let params = if self.eat(Punct::LeftParen) {
            self.parse_params()?
        } else {
            vec![self.expect_ident()?]
        };
        self.expect(Punct::Arrow, "`=>`")?;
        if self.at(Punct::LeftBrace) {
            return Err(ParseError::new(
                "arrow functions must have an expression body",
                self.offset(),
            ));
        }
        let body = self.parse_expression()?;
        Ok(self.ast.alloc(AstKind::Arrow { params, body }))
    }

    fn parse_conditional(&mut self) -> Result<AstId, ParseError> {
        let test = self.parse_binary(0)?;
        if !self.eat(Punct::Question) {
            return Ok(test);
        }
        let consequent = self.parse_expression()?;
        self.expect(Punct::Colon, "`:`")?;
        let alternate = self.parse_expression()?;
        Ok(self.ast.alloc(AstKind::Conditional {
            test,
            consequent,
            alternate,
        }))
    }

    fn binary_op(&self) -> Option<BinaryOp> {
        match self.peek() {
            TokenKind::Punct(Punct::Plus) => Some(BinaryOp::Add),
            TokenKind::Punct(Punct::StrictEq) => Some(BinaryOp::StrictEq),
            TokenKind::Punct(Punct::StrictNotEq) => Some(BinaryOp::StrictNotEq),
            TokenKind::Punct(Punct::AndAnd) => Some(BinaryOp::And),
            TokenKind::Punct(Punct::OrOr) => Some(BinaryOp::Or),
            _ => None,
        }
    }

    /// Precedence climbing over left-associative binary operators.
    fn parse_binary(&mut self, min_prec: u8) -> Result<AstId, ParseError> {
        let mut left = self.parse_unary()?;
        while let Some(op) = self.binary_op() {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.bump();
            let right = self.parse_binary(prec + 1)?;
            left = self.ast.alloc(AstKind::Binary { op, left, right });
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<AstId, ParseError> {
        if self.eat(Punct::Bang) {
            self.enter()?;
            let argument = self.parse_unary();
            self.leave();
            let argument = argument?;
            return Ok(self.ast.alloc(AstKind::Unary {
                op: UnaryOp::Not,
                argument,
            }));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<AstId, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(Punct::Dot) {
                // Keywords are valid property names.
                let property = match self.bump() {
                    TokenKind::Ident(name) => name,
                    _ => return Err(self.unexpected("property name")),
                };
                expr = self.ast.alloc(AstKind::Member {
                    object: expr,
                    property,
                });
            } else if self.eat(Punct::LeftSquare) {
                let index = self.parse_expression()?;
                self.expect(Punct::RightSquare, "`]`")?;
                expr = self.ast.alloc(AstKind::Index {
                    object: expr,
                    index,
                });
            } else if self.eat(Punct::LeftParen) {
                let arguments = self.parse_list(Punct::RightParen)?;
                expr = self.ast.alloc(AstKind::Call {
                    callee: expr,
                    arguments,
                });
            } else {
                return Ok(expr);
            }
        }
    }

    /// Comma-separated expressions up to `close`; a trailing comma is allowed.
    fn parse_list(&mut self, close: Punct) -> Result<Vec<AstId>, ParseError> {
        let mut items = Vec::new();
        while !self.eat(close) {
            items.push(self.parse_expression()?);
            if !self.eat(Punct::Comma) {
                self.expect(close, "closing delimiter")?;
                break;
            }
        }
        Ok(items)
    }

    fn parse_primary(&mut self) -> Result<AstId, ParseError> {
        let offset = self.offset();
        let token = self.peek().clone();
        let expr = match token {
            TokenKind::Str(value) => {
                self.bump();
                self.ast.alloc(AstKind::Str(value))
            }
            TokenKind::Num(value) => {
                self.bump();
                self.ast.alloc(AstKind::Num(value))
            }
            TokenKind::Ident(name) => {
                let kind = match name.as_str() {
                    "true" => AstKind::Bool(true),
                    "false" => AstKind::Bool(false),
                    "null" => AstKind::Null,
                    keyword if is_keyword(keyword) => {
                        return Err(ParseError::new(
                            format!("unexpected keyword `{}`", keyword),
                            offset,
                        ));
                    }
                    _ => AstKind::Ident(name),
                };
                self.bump();
                self.ast.alloc(kind)
            }
            TokenKind::Punct(Punct::LeftParen) => {
                self.bump();
                let expr = self.parse_expression()?;
                self.expect(Punct::RightParen, "`)`")?;
                expr
            }
            TokenKind::Punct(Punct::LeftSquare) => {
                self.bump();
                let elements = self.parse_list(Punct::RightSquare)?;
                self.ast.alloc(AstKind::Array(elements))
            }
            TokenKind::Punct(Punct::LeftBrace) => {
                self.bump();
                self.parse_object()?
            }
            _ => return Err(self.unexpected("expression")),
        };
        Ok(expr)
    }

    fn parse_object(&mut self) -> Result<AstId, ParseError> {
        let mut properties = Vec::new();
        while !self.eat(Punct::RightBrace) {
            let (key, shorthand): (CompactString, bool) = match self.peek() {
                TokenKind::Ident(name) => (name.clone(), true),
                TokenKind::Str(value) => (value.as_str().into(), false),
                _ => return Err(self.unexpected("property key")),
            };
            self.bump();
            let value = if self.eat(Punct::Colon) {
                self.parse_expression()?
            } else if shorthand && !is_keyword(&key) {
                self.ast.alloc(AstKind::Ident(key.clone()))
            } else {
                return Err(self.unexpected("`:`"));
            };
            properties.push(Property { key, value });
            if !self.eat(Punct::Comma) {
                self.expect(Punct::RightBrace, "`}`")?;
                break;
            }
        }
        Ok(self.ast.alloc(AstKind::Object(properties)))
    }
}

/// Parse `source` into `ast`, returning the id of the render function.
pub fn parse_into(ast: &mut Ast, source: &str) -> Result<AstId, ParseError> {
    Parser::new(ast, source)?.parse_program()
}

/// Parse `source` into a fresh arena.
pub fn parse_render_fn(source: &str) -> Result<(Ast, AstId), ParseError> {
    let mut ast = Ast::with_capacity(source.len() / 4);
    let root = parse_into(&mut ast, source)?;
    Ok((ast, root))
}
