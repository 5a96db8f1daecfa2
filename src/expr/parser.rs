//! Tokenizer and recursive-descent parser for scalar expression programs
//!
//! The accepted language is a sequence of assignment statements such as
//! `c = a + b;` with the usual arithmetic operators, parentheses and a few
//! built-in math functions. Every AST node keeps the line/column it came
//! from so runtime errors point at the author's expression, not at any
//! machinery wrapped around it.

use super::{Assign, BinOp, CompileError, Expr, Span, UnaryOp};

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(f32),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Comma,
    Equals,
    Semicolon,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    span: Span,
}

fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    let mut line = 1u32;
    let mut column = 1u32;

    while let Some(&c) = chars.peek() {
        let span = Span { line, column };
        match c {
            '\n' => {
                chars.next();
                line += 1;
                column = 1;
            }
            c if c.is_whitespace() => {
                chars.next();
                column += 1;
            }
            '/' if {
                let mut look = chars.clone();
                look.next();
                look.peek() == Some(&'/')
            } =>
            {
                // Line comment runs to end of line
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                    column += 1;
                }
            }
            '0'..='9' | '.' => {
                let mut text = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        text.push(c);
                        chars.next();
                        column += 1;
                    } else {
                        break;
                    }
                }
                let value = text
                    .parse::<f32>()
                    .map_err(|_| CompileError::BadNumber { text, span })?;
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    span,
                });
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut text = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        text.push(c);
                        chars.next();
                        column += 1;
                    } else {
                        break;
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(text),
                    span,
                });
            }
            _ => {
                let kind = match c {
                    '+' => TokenKind::Plus,
                    '-' => TokenKind::Minus,
                    '*' => TokenKind::Star,
                    '/' => TokenKind::Slash,
                    '%' => TokenKind::Percent,
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    ',' => TokenKind::Comma,
                    '=' => TokenKind::Equals,
                    ';' => TokenKind::Semicolon,
                    other => {
                        return Err(CompileError::UnexpectedChar { ch: other, span });
                    }
                };
                chars.next();
                column += 1;
                tokens.push(Token { kind, span });
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: &TokenKind, what: &'static str) -> Result<Span, CompileError> {
        match self.next() {
            Some(token) if token.kind == *kind => Ok(token.span),
            Some(token) => Err(CompileError::Expected {
                what,
                span: token.span,
            }),
            None => Err(CompileError::UnexpectedEnd { what }),
        }
    }

    fn parse_program(&mut self) -> Result<Vec<Assign>, CompileError> {
        let mut statements = Vec::new();
        while self.peek().is_some() {
            statements.push(self.parse_assign()?);
        }
        Ok(statements)
    }

    fn parse_assign(&mut self) -> Result<Assign, CompileError> {
        let (target, span) = match self.next() {
            Some(Token {
                kind: TokenKind::Ident(name),
                span,
            }) => (name, span),
            Some(token) => {
                return Err(CompileError::Expected {
                    what: "assignment target",
                    span: token.span,
                })
            }
            None => return Err(CompileError::UnexpectedEnd { what: "statement" }),
        };
        self.expect(&TokenKind::Equals, "'='")?;
        let value = self.parse_expr()?;
        self.expect(&TokenKind::Semicolon, "';'")?;
        Ok(Assign {
            target,
            value,
            span,
        })
    }

    fn parse_expr(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_term()?;
        while let Some(token) = self.peek() {
            let op = match token.kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            let span = token.span;
            self.pos += 1;
            let right = self.parse_term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right), span);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_factor()?;
        while let Some(token) = self.peek() {
            let op = match token.kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Rem,
                _ => break,
            };
            let span = token.span;
            self.pos += 1;
            let right = self.parse_factor()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right), span);
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr, CompileError> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Minus,
                span,
            }) => {
                let span = *span;
                self.pos += 1;
                let inner = self.parse_factor()?;
                Ok(Expr::Unary(UnaryOp::Neg, Box::new(inner), span))
            }
            Some(Token {
                kind: TokenKind::Plus,
                ..
            }) => {
                self.pos += 1;
                self.parse_factor()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        match self.next() {
            Some(Token {
                kind: TokenKind::Number(value),
                span,
            }) => Ok(Expr::Number(value, span)),
            Some(Token {
                kind: TokenKind::Ident(name),
                span,
            }) => {
                if matches!(
                    self.peek(),
                    Some(Token {
                        kind: TokenKind::LParen,
                        ..
                    })
                ) {
                    self.pos += 1;
                    let mut args = Vec::new();
                    if !matches!(
                        self.peek(),
                        Some(Token {
                            kind: TokenKind::RParen,
                            ..
                        })
                    ) {
                        loop {
                            args.push(self.parse_expr()?);
                            match self.peek() {
                                Some(Token {
                                    kind: TokenKind::Comma,
                                    ..
                                }) => {
                                    self.pos += 1;
                                }
                                _ => break,
                            }
                        }
                    }
                    self.expect(&TokenKind::RParen, "')'")?;
                    Ok(Expr::Call(name, args, span))
                } else {
                    Ok(Expr::Var(name, span))
                }
            }
            Some(Token {
                kind: TokenKind::LParen,
                ..
            }) => {
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            Some(token) => Err(CompileError::Expected {
                what: "expression",
                span: token.span,
            }),
            None => Err(CompileError::UnexpectedEnd { what: "expression" }),
        }
    }
}

/// Parses a full program of assignment statements.
pub fn parse(source: &str) -> Result<Vec<Assign>, CompileError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_program()
}
