//! Recursive-descent parser for the restricted expression grammar.
//!
//! Precedence, loosest to tightest:
//! `or` > `and` > `not` > comparison/`in` > additive > multiplicative > unary > postfix > primary

use crate::error::ExprError;
use crate::lang::ast::{BinaryOp, Expr, UnaryOp};
use crate::lang::lexer::{tokenize, Token};

pub fn parse(src: &str) -> Result<Expr, ExprError> {
    parse_tokens(tokenize(src)?)
}

pub fn parse_tokens(tokens: Vec<Token>) -> Result<Expr, ExprError> {
    let mut p = Parser { tokens, pos: 0 };
    let expr = p.parse_or()?;
    if p.pos != p.tokens.len() {
        return Err(ExprError::Parse(format!(
            "unexpected trailing input at token {}",
            p.pos
        )));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn eat_ident(&mut self, kw: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(i)) if i == kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_and()?;
        while self.eat_ident("or") {
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinaryOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_not()?;
        while self.eat_ident("and") {
            let rhs = self.parse_not()?;
            lhs = Expr::Binary(BinaryOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, ExprError> {
        if self.eat_ident("not") {
            let inner = self.parse_not()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExprError> {
        let lhs = self.parse_additive()?;
        let op = match self.peek() {
            Some(Token::EqEq) => Some(BinaryOp::Eq),
            Some(Token::NotEq) => Some(BinaryOp::Ne),
            Some(Token::Lt) => Some(BinaryOp::Lt),
            Some(Token::Le) => Some(BinaryOp::Le),
            Some(Token::Gt) => Some(BinaryOp::Gt),
            Some(Token::Ge) => Some(BinaryOp::Ge),
            Some(Token::Ident(i)) if i == "in" => Some(BinaryOp::In),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let rhs = self.parse_additive()?;
            return Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(inner)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.advance();
                    match self.advance() {
                        Some(Token::Ident(name)) => {
                            expr = Expr::Member(Box::new(expr), name);
                        }
                        other => {
                            return Err(ExprError::Parse(format!(
                                "expected identifier after '.', got {other:?}"
                            )))
                        }
                    }
                }
                Some(Token::LBracket) => {
                    self.advance();
                    let index_expr = self.parse_or()?;
                    match self.advance() {
                        Some(Token::RBracket) => {}
                        other => {
                            return Err(ExprError::Parse(format!(
                                "expected ']', got {other:?}"
                            )))
                        }
                    }
                    expr = Expr::Index(Box::new(expr), Box::new(index_expr));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    other => Err(ExprError::Parse(format!("expected ')', got {other:?}"))),
                }
            }
            Some(Token::Ident(ident)) => match ident.as_str() {
                "True" | "true" => Ok(Expr::Bool(true)),
                "False" | "false" => Ok(Expr::Bool(false)),
                "None" | "null" => Ok(Expr::Null),
                _ => Ok(Expr::Ident(ident)),
            },
            other => Err(ExprError::Parse(format!(
                "unexpected token in expression: {other:?}"
            ))),
        }
    }
}

/// Split a `script` statement's tokens on its top-level `=` into
/// `(lhs_tokens, rhs_tokens)`. Errors if there isn't exactly one.
pub fn split_assignment(tokens: Vec<Token>) -> Result<(Vec<Token>, Vec<Token>), ExprError> {
    let positions: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| matches!(t, Token::Assign))
        .map(|(i, _)| i)
        .collect();
    match positions.as_slice() {
        [pos] => {
            let mut lhs = tokens;
            let rhs = lhs.split_off(pos + 1);
            lhs.pop(); // drop the '=' token itself
            Ok((lhs, rhs))
        }
        [] => Err(ExprError::Parse("script statement has no '=' assignment".into())),
        _ => Err(ExprError::Parse("script statement has more than one '='".into())),
    }
}

/// Parse the left-hand side of a `script` assignment statement:
/// `state['key']` or `state.key`. Returns the target key.
pub fn parse_assignment_target_tokens(tokens: Vec<Token>) -> Result<String, ExprError> {
    let mut p = Parser { tokens, pos: 0 };
    match p.advance() {
        Some(Token::Ident(i)) if i == "state" => {}
        other => {
            return Err(ExprError::Parse(format!(
                "script assignment target must start with 'state', got {other:?}"
            )))
        }
    }
    let key = match p.advance() {
        Some(Token::Dot) => match p.advance() {
            Some(Token::Ident(name)) => name,
            other => return Err(ExprError::Parse(format!("expected identifier, got {other:?}"))),
        },
        Some(Token::LBracket) => {
            let key = match p.advance() {
                Some(Token::Str(s)) => s,
                other => return Err(ExprError::Parse(format!("expected string key, got {other:?}"))),
            };
            match p.advance() {
                Some(Token::RBracket) => {}
                other => return Err(ExprError::Parse(format!("expected ']', got {other:?}"))),
            }
            key
        }
        other => {
            return Err(ExprError::Parse(format!(
                "expected '.' or '[' after 'state', got {other:?}"
            )))
        }
    };
    if p.pos != p.tokens.len() {
        return Err(ExprError::Parse("unexpected trailing input in assignment target".into()));
    }
    Ok(key)
}
