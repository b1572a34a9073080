//! Recursive-descent parser for definition expressions
//!
//! The language is a small, side-effect free expression subset:
//!
//! ```text
//! expr_list := test (',' test)* ','?
//! test      := 'lambda' params ':' test | arith
//! arith     := term (('+' | '-') term)*
//! term      := factor (('*' | '/' | '//' | '%') factor)*
//! factor    := ('+' | '-') factor | power
//! power     := primary ('**' factor)?
//! primary   := atom ('(' (test (',' test)* ','?)? ')')*
//! atom      := number | string+ | 'True' | 'False' | ident | '(' expr_list? ')'
//! ```

use std::sync::Arc;

use super::lexer::{Token, TokenKind, lex};
use crate::error::{Result, UnitError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Pos,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

/// Expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Str(String),
    Bool(bool),
    Name {
        name: String,
        span: logos::Span,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Tuple(Vec<Expr>),
    Lambda {
        params: Vec<String>,
        body: Arc<Expr>,
    },
}

impl Expr {
    /// Parse a complete expression
    pub fn parse(source: &str) -> Result<Expr> {
        let tokens = lex(source)?;
        let mut parser = Parser::new(&tokens, source);
        let expr = parser.parse_expr_list()?;
        if !parser.at(TokenKind::Eof) {
            return Err(parser.unexpected("end of expression"));
        }
        Ok(expr)
    }

    /// True if the tree contains a call to the helper `name`
    pub fn calls(&self, name: &str) -> bool {
        match self {
            Expr::Call { callee, args } => {
                matches!(callee.as_ref(), Expr::Name { name: n, .. } if n == name)
                    || callee.calls(name)
                    || args.iter().any(|a| a.calls(name))
            }
            Expr::Unary { expr, .. } => expr.calls(name),
            Expr::Binary { left, right, .. } => left.calls(name) || right.calls(name),
            Expr::Tuple(items) => items.iter().any(|e| e.calls(name)),
            Expr::Lambda { body, .. } => body.calls(name),
            Expr::Number(_) | Expr::Str(_) | Expr::Bool(_) | Expr::Name { .. } => false,
        }
    }

    /// Identifiers used but not bound by an enclosing lambda, in order of appearance
    pub fn free_names(&self) -> Vec<String> {
        let mut bound = Vec::new();
        let mut free = Vec::new();
        self.collect_free(&mut bound, &mut free);
        free
    }

    fn collect_free(&self, bound: &mut Vec<String>, free: &mut Vec<String>) {
        match self {
            Expr::Name { name, .. } => {
                if !bound.contains(name) && !free.contains(name) {
                    free.push(name.clone());
                }
            }
            Expr::Unary { expr, .. } => expr.collect_free(bound, free),
            Expr::Binary { left, right, .. } => {
                left.collect_free(bound, free);
                right.collect_free(bound, free);
            }
            Expr::Call { callee, args } => {
                callee.collect_free(bound, free);
                for arg in args {
                    arg.collect_free(bound, free);
                }
            }
            Expr::Tuple(items) => {
                for item in items {
                    item.collect_free(bound, free);
                }
            }
            Expr::Lambda { params, body } => {
                let depth = bound.len();
                bound.extend(params.iter().cloned());
                body.collect_free(bound, free);
                bound.truncate(depth);
            }
            Expr::Number(_) | Expr::Str(_) | Expr::Bool(_) => {}
        }
    }
}

/// Parser state
struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token], source: &'a str) -> Self {
        Self {
            tokens,
            pos: 0,
            source,
        }
    }

    fn current(&self) -> &Token {
        // lex() always ends the stream with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> TokenKind {
        self.current().kind
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek() == kind
    }

    fn advance(&mut self) -> &Token {
        let index = self.pos.min(self.tokens.len() - 1);
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        &self.tokens[index]
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(kind.describe()))
        }
    }

    fn unexpected(&self, expected: &str) -> UnitError {
        let token = self.current();
        UnitError::parse(
            format!("expected {}, found {}", expected, token.kind.describe()),
            self.source,
            token.span.start,
            token.span.len().max(1),
        )
    }

    /// Tokens that can't start a `test`
    fn ends_list(&self) -> bool {
        matches!(self.peek(), TokenKind::RParen | TokenKind::Eof | TokenKind::Colon)
    }

    fn parse_expr_list(&mut self) -> Result<Expr> {
        let first = self.parse_test()?;
        if !self.at(TokenKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.at(TokenKind::Comma) {
            self.advance();
            if self.ends_list() {
                break;
            }
            items.push(self.parse_test()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn parse_test(&mut self) -> Result<Expr> {
        if !self.at(TokenKind::Lambda) {
            return self.parse_arith();
        }
        self.advance();
        let mut params = Vec::new();
        while !self.at(TokenKind::Colon) {
            let name = self.expect(TokenKind::Ident)?.text.clone();
            if params.contains(&name) {
                return Err(UnitError::parse(
                    format!("duplicate parameter '{name}'"),
                    self.source,
                    self.tokens[self.pos - 1].span.start,
                    name.len(),
                ));
            }
            params.push(name);
            if !self.at(TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(TokenKind::Colon)?;
        let body = self.parse_test()?;
        Ok(Expr::Lambda {
            params,
            body: Arc::new(body),
        })
    }

    fn parse_arith(&mut self) -> Result<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::SlashSlash => BinaryOp::FloorDiv,
                TokenKind::Percent => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_factor()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn parse_factor(&mut self) -> Result<Expr> {
        let op = match self.peek() {
            TokenKind::Plus => UnaryOp::Pos,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.parse_power(),
        };
        self.advance();
        let expr = self.parse_factor()?;
        Ok(Expr::Unary {
            op,
            expr: Box::new(expr),
        })
    }

    /// `**` binds tighter than unary minus on its left, looser on its right
    fn parse_power(&mut self) -> Result<Expr> {
        let base = self.parse_primary()?;
        if !self.at(TokenKind::StarStar) {
            return Ok(base);
        }
        self.advance();
        let exponent = self.parse_factor()?;
        Ok(Expr::Binary {
            op: BinaryOp::Pow,
            left: Box::new(base),
            right: Box::new(exponent),
        })
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let mut expr = self.parse_atom()?;
        while self.at(TokenKind::LParen) {
            self.advance();
            let mut args = Vec::new();
            while !self.at(TokenKind::RParen) {
                args.push(self.parse_test()?);
                if !self.at(TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
            self.expect(TokenKind::RParen)?;
            expr = Expr::Call {
                callee: Box::new(expr),
                args,
            };
        }
        Ok(expr)
    }

    fn parse_atom(&mut self) -> Result<Expr> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::IntLit | TokenKind::FloatLit => {
                self.advance();
                token.text.parse::<f64>().map(Expr::Number).map_err(|_| {
                    UnitError::parse("invalid number", self.source, token.span.start, token.span.len())
                })
            }
            TokenKind::StringLit => {
                // adjacent literals concatenate
                let mut text = String::new();
                while self.at(TokenKind::StringLit) {
                    text.push_str(&unquote(&self.advance().text));
                }
                Ok(Expr::Str(text))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            TokenKind::Ident => {
                self.advance();
                Ok(Expr::Name {
                    name: token.text,
                    span: token.span,
                })
            }
            TokenKind::LParen => {
                self.advance();
                if self.at(TokenKind::RParen) {
                    self.advance();
                    return Ok(Expr::Tuple(Vec::new()));
                }
                let inner = self.parse_expr_list()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            _ => Err(self.unexpected("an expression")),
        }
    }
}

/// Strip the quotes of a string literal and resolve escapes
fn unquote(literal: &str) -> String {
    let inner = &literal[1..literal.len().saturating_sub(1).max(1)];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Structural shape with spans erased
    fn shape(expr: &Expr) -> String {
        match expr {
            Expr::Number(n) => format!("{n}"),
            Expr::Str(s) => format!("{s:?}"),
            Expr::Bool(b) => format!("{b}"),
            Expr::Name { name, .. } => name.clone(),
            Expr::Unary { op, expr } => format!("({op:?} {})", shape(expr)),
            Expr::Binary { op, left, right } => {
                format!("({op:?} {} {})", shape(left), shape(right))
            }
            Expr::Call { callee, args } => format!(
                "{}[{}]",
                shape(callee),
                args.iter().map(shape).collect::<Vec<_>>().join(", ")
            ),
            Expr::Tuple(items) => format!(
                "<{}>",
                items.iter().map(shape).collect::<Vec<_>>().join(", ")
            ),
            Expr::Lambda { params, body } => format!("lambda {}: {}", params.join(","), shape(body)),
        }
    }

    fn parsed(source: &str) -> String {
        shape(&Expr::parse(source).unwrap())
    }

    #[test]
    fn test_precedence() {
        assert_eq!(parsed("kg*m/s**2"), "(Div (Mul kg m) (Pow s 2))");
        assert_eq!(parsed("1 + 2*3"), "(Add 1 (Mul 2 3))");
        assert_eq!(parsed("-2**2"), "(Neg (Pow 2 2))");
        assert_eq!(parsed("s**-1"), "(Pow s (Neg 1))");
        assert_eq!(parsed("2**3**2"), "(Pow 2 (Pow 3 2))");
    }

    #[test]
    fn test_tuples() {
        assert_eq!(parsed("kg*m, True"), "<(Mul kg m), true>");
        assert_eq!(parsed("(1,)"), "<1>");
        assert_eq!(parsed("()"), "<>");
        assert_eq!(parsed("((m), False)"), "<m, false>");
    }

    #[test]
    fn test_calls() {
        assert_eq!(
            parsed("ScalarUnit(1, 'L', \"m\"), True"),
            "<ScalarUnit[1, \"L\", \"m\"], true>"
        );
        assert_eq!(parsed("log(x, 10)"), "log[x, 10]");
    }

    #[test]
    fn test_lambda_pair() {
        assert_eq!(
            parsed("(lambda n: (n + 273.15)*K, lambda T: T/K - 273.15), False"),
            "<<lambda n: (Mul (Add n 273.15) K), lambda T: (Sub (Div T K) 273.15)>, false>"
        );
    }

    #[test]
    fn test_calls_helper() {
        let expr = Expr::parse("ScalarUnit(1, 'L', 'm'), True").unwrap();
        assert!(expr.calls("ScalarUnit"));
        assert!(!Expr::parse("kg*m/s**2, True").unwrap().calls("ScalarUnit"));
    }

    #[test]
    fn test_free_names() {
        let expr = Expr::parse("(lambda n: n*K + offset, lambda T: T/K)").unwrap();
        assert_eq!(expr.free_names(), vec!["K".to_string(), "offset".to_string()]);
        assert!(Expr::parse("lambda x: x").unwrap().free_names().is_empty());
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(parsed(r"'it\'s' 'ok'"), "\"it'sok\"");
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["", "kg*", "(m", "m)", "lambda x, x: 1", "f(1", "1 2", "lambda x x"] {
            assert!(Expr::parse(bad).is_err(), "expected an error for {bad:?}");
        }
    }
}
