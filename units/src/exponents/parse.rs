//! Recursive-descent parser for product-of-powers expressions
//!
//! Grammar (whitespace between factors is an implicit `*`):
//!
//! ```text
//! expr     := factor (op factor)*
//! op       := '*' | '/' | '.'            ('.' only before a symbol or '(')
//! factor   := symbol exponent? | '(' expr ')' exponent? | '1'
//! exponent := ('^' | '**')? (signed-number | '(' signed-number ('/' integer)? ')')
//! ```
//!
//! The output of every [`FormatStyle`](super::FormatStyle) is accepted: HTML
//! and LaTeX markup, Unicode superscripts and the display substitutions are
//! undone by a normalization pass before parsing.

use std::borrow::Cow;

use super::{Exponent, Exponents};
use crate::error::{Result, UnitError};

/// Parse `text` into an exponent map
pub fn parse(text: &str) -> Result<Exponents> {
    let normalized = normalize(text);
    let mut parser = Parser::new(&normalized);
    parser.parse_all()
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Literal rewrites applied before parsing, in order
const REWRITES: &[(&str, &str)] = &[
    ("&nbsp;", "*"),
    ("<sup>", "^"),
    ("</sup>", ""),
    ("\\left(", "("),
    ("\\right)", ")"),
    ("\\,", "*"),
    ("^{\\circ}", "deg"),
    ("\\Omega", "ohm"),
    ("\\AA", "angstrom"),
    ("°", "deg"),
    ("Ω", "ohm"),
    ("Å", "angstrom"),
];

fn normalize(text: &str) -> Cow<'_, str> {
    let needs_work = text.contains(['&', '<', '\\', '^', '°', 'Ω', 'Å'])
        || text.chars().any(|c| from_superscript(c).is_some());
    if !needs_work {
        return Cow::Borrowed(text);
    }

    let mut out = text.to_string();
    for (from, to) in REWRITES {
        if out.contains(from) {
            out = out.replace(from, to);
        }
    }
    out = unwrap_braces(&out, "\\mathrm{", |inner| inner.to_string());
    out = unwrap_braces(&out, "^{", |inner| {
        if inner.contains('/') {
            format!("^({})", inner)
        } else {
            format!("^{}", inner)
        }
    });
    Cow::Owned(superscripts_to_ascii(&out))
}

/// Replace every `open ... }` with `wrap(...)`; an unclosed brace is left alone
fn unwrap_braces(text: &str, open: &str, wrap: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(open) {
        let after = &rest[start + open.len()..];
        let Some(end) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(&wrap(&after[..end]));
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

fn from_superscript(c: char) -> Option<char> {
    Some(match c {
        '⁰' => '0',
        '¹' => '1',
        '²' => '2',
        '³' => '3',
        '⁴' => '4',
        '⁵' => '5',
        '⁶' => '6',
        '⁷' => '7',
        '⁸' => '8',
        '⁹' => '9',
        '⁻' => '-',
        _ => return None,
    })
}

/// `s⁻²` becomes `s^-2`
fn superscripts_to_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        match from_superscript(c) {
            Some(ascii) => {
                if !in_run {
                    out.push('^');
                    in_run = true;
                }
                out.push(ascii);
            }
            None => {
                in_run = false;
                out.push(c);
            }
        }
    }
    out
}

// ============================================================================
// PARSER
// ============================================================================

struct Parser<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

enum Op {
    Mul,
    Div,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).map(|(_, c)| *c)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    /// Byte offset of the current character
    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|(i, _)| *i)
            .unwrap_or(self.src.len())
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn error(&self, message: &str) -> UnitError {
        UnitError::parse(message, self.src, self.offset(), 1)
    }

    fn parse_all(&mut self) -> Result<Exponents> {
        self.skip_whitespace();
        if self.is_at_end() {
            return Ok(Exponents::new());
        }
        let result = self.parse_expr()?;
        self.skip_whitespace();
        match self.peek() {
            None => Ok(result),
            Some(')') => Err(self.error("unmatched closing parenthesis")),
            Some(_) => Err(self.error("unexpected character")),
        }
    }

    fn parse_expr(&mut self) -> Result<Exponents> {
        self.skip_whitespace();
        if matches!(self.peek(), Some('*' | '/')) {
            return Err(self.error("expected a factor before the operator"));
        }
        let mut result = self.parse_factor()?;

        loop {
            self.skip_whitespace();
            let op = match self.peek() {
                None | Some(')') => break,
                Some('*') => {
                    self.advance();
                    Op::Mul
                }
                Some('/') => {
                    self.advance();
                    Op::Div
                }
                Some('.') if self.peek_at(1).is_some_and(|c| is_symbol_start(c) || c == '(') => {
                    self.advance();
                    Op::Mul
                }
                Some(c) if starts_factor(c) => Op::Mul,
                Some(_) => return Err(self.error("unexpected character")),
            };

            self.skip_whitespace();
            if matches!(self.peek(), None | Some(')' | '*' | '/')) {
                return Err(self.error("expected a factor after the operator"));
            }
            let factor = self.parse_factor()?;
            match op {
                Op::Mul => result += &factor,
                Op::Div => result -= &factor,
            }
        }
        Ok(result)
    }

    fn parse_factor(&mut self) -> Result<Exponents> {
        match self.peek() {
            Some('(') => {
                let open = self.offset();
                self.advance();
                self.skip_whitespace();
                if self.peek() == Some(')') {
                    return Err(self.error("empty sub-expression"));
                }
                if self.is_at_end() {
                    return Err(UnitError::parse("unclosed parenthesis", self.src, open, 1));
                }
                let inner = self.parse_expr()?;
                self.skip_whitespace();
                if self.advance() != Some(')') {
                    return Err(UnitError::parse("unclosed parenthesis", self.src, open, 1));
                }
                Ok(match self.parse_exponent()? {
                    Some(exp) => inner.scale(exp),
                    None => inner,
                })
            }
            Some(c) if c.is_ascii_digit() => {
                let start = self.offset();
                match self.parse_number() {
                    Some(n) if n == Exponent::ONE => Ok(Exponents::new()),
                    _ => Err(UnitError::parse(
                        "only the number 1 may stand as a factor",
                        self.src,
                        start,
                        self.offset().saturating_sub(start).max(1),
                    )),
                }
            }
            Some(c) if is_symbol_start(c) => {
                let symbol = self.parse_symbol();
                let exp = self.parse_exponent()?.unwrap_or(Exponent::ONE);
                Ok(Exponents::single(symbol, exp))
            }
            _ => Err(self.error("expected a unit symbol")),
        }
    }

    /// Letters and underscores; digits are allowed once an underscore appeared (`g_0`)
    fn parse_symbol(&mut self) -> String {
        let mut symbol = String::new();
        while let Some(c) = self.peek() {
            if is_symbol_start(c) || (c.is_ascii_digit() && symbol.contains('_')) {
                symbol.push(c);
                self.advance();
            } else {
                break;
            }
        }
        symbol
    }

    /// Optional exponent after a symbol or a parenthesized group
    fn parse_exponent(&mut self) -> Result<Option<Exponent>> {
        let save = self.pos;
        let marked = match (self.peek(), self.peek_at(1)) {
            (Some('^'), _) => {
                self.advance();
                true
            }
            (Some('*'), Some('*')) => {
                self.advance();
                self.advance();
                true
            }
            _ => false,
        };

        let exp = match self.peek() {
            Some('(') => self.parse_fraction()?,
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' => self.parse_signed_number(),
            _ => None,
        };

        match exp {
            Some(exp) => Ok(Some(exp)),
            None if marked => Err(self.error("expected an exponent")),
            None => {
                self.pos = save;
                Ok(None)
            }
        }
    }

    /// `(n)` or `(n/d)`; restores the cursor and returns `None` if the
    /// parenthesis doesn't hold a fraction
    fn parse_fraction(&mut self) -> Result<Option<Exponent>> {
        let save = self.pos;
        let open = self.offset();
        self.advance();
        self.skip_whitespace();

        let Some(numer) = self.parse_signed_number() else {
            self.pos = save;
            return Ok(None);
        };
        self.skip_whitespace();

        let mut denom = None;
        if self.peek() == Some('/') {
            self.advance();
            self.skip_whitespace();
            match self.parse_number() {
                Some(d) => denom = Some(d),
                None => {
                    self.pos = save;
                    return Ok(None);
                }
            }
            self.skip_whitespace();
        }

        if self.peek() != Some(')') {
            self.pos = save;
            return Ok(None);
        }
        self.advance();

        match denom {
            None => Ok(Some(numer)),
            Some(denom) => numer.checked_div(denom).map(Some).ok_or_else(|| {
                UnitError::parse(
                    "zero denominator in exponent",
                    self.src,
                    open,
                    self.offset() - open,
                )
            }),
        }
    }

    fn parse_signed_number(&mut self) -> Option<Exponent> {
        let save = self.pos;
        let negative = match self.peek() {
            Some('-') => {
                self.advance();
                true
            }
            Some('+') => {
                self.advance();
                false
            }
            _ => false,
        };
        match self.parse_number() {
            Some(n) if negative => Some(-n),
            Some(n) => Some(n),
            None => {
                self.pos = save;
                None
            }
        }
    }

    /// Unsigned integer or decimal float, with an optional `e` exponent
    fn parse_number(&mut self) -> Option<Exponent> {
        let start = self.pos;
        let mut text = String::new();
        let mut is_float = false;

        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            text.push(c);
            self.advance();
        }
        if text.is_empty() {
            return None;
        }

        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            text.push('.');
            self.advance();
            while let Some(c) = self.peek().filter(char::is_ascii_digit) {
                text.push(c);
                self.advance();
            }
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            let digit_at = match self.peek_at(1) {
                Some('+' | '-') => 2,
                _ => 1,
            };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                for _ in 0..digit_at {
                    text.extend(self.advance());
                }
                while let Some(c) = self.peek().filter(char::is_ascii_digit) {
                    text.push(c);
                    self.advance();
                }
            }
        }

        let value = if is_float {
            text.parse::<f64>().ok().map(Exponent::Float)
        } else {
            text.parse::<i64>()
                .ok()
                .map(Exponent::Int)
                .or_else(|| text.parse::<f64>().ok().map(Exponent::Float))
        };
        if value.is_none() {
            self.pos = start;
        }
        value
    }
}

fn is_symbol_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn starts_factor(c: char) -> bool {
    is_symbol_start(c) || c == '(' || c.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ex(pairs: &[(&str, Exponent)]) -> Exponents {
        pairs.iter().map(|(s, e)| (*s, *e)).collect()
    }

    fn int(i: i64) -> Exponent {
        Exponent::Int(i)
    }

    #[test]
    fn test_parse_simple_product() {
        let parsed = parse("kg*m2/s2").unwrap();
        assert_eq!(parsed, ex(&[("kg", int(1)), ("m", int(2)), ("s", int(-2))]));
    }

    #[test]
    fn test_parse_empty_is_unity() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("   ").unwrap().is_empty());
        assert!(parse("1").unwrap().is_empty());
    }

    #[test]
    fn test_parse_unity_numerator() {
        assert_eq!(parse("1/s").unwrap(), ex(&[("s", int(-1))]));
    }

    #[test]
    fn test_parse_fraction_and_float_exponents() {
        let parsed = parse("m(1/2)*s(-3/2)").unwrap();
        assert_eq!(parsed.get("m"), Exponent::ratio(1, 2));
        assert_eq!(parsed.get("s"), Exponent::ratio(-3, 2));

        let parsed = parse("m0.5*s-1.5e0").unwrap();
        assert_eq!(parsed.get("m"), Some(Exponent::Float(0.5)));
        assert_eq!(parsed.get("s"), Some(Exponent::Float(-1.5)));
    }

    #[test]
    fn test_parse_group_subtracts() {
        let parsed = parse("kg/(m*s2)").unwrap();
        assert_eq!(parsed, ex(&[("kg", int(1)), ("m", int(-1)), ("s", int(-2))]));
    }

    #[test]
    fn test_parse_group_with_exponent() {
        let parsed = parse("(m/s)2").unwrap();
        assert_eq!(parsed, ex(&[("m", int(2)), ("s", int(-2))]));
    }

    #[test]
    fn test_parse_caret_and_double_star() {
        assert_eq!(parse("m^2").unwrap(), parse("m2").unwrap());
        assert_eq!(parse("m**2 / s**(1/2)").unwrap().get("s"), Exponent::ratio(-1, 2));
    }

    #[test]
    fn test_parse_implicit_and_dot_multiplication() {
        assert_eq!(parse("kg m2 s-2").unwrap(), parse("kg*m2/s2").unwrap());
        assert_eq!(parse("kg.m2/s2").unwrap(), parse("kg*m2/s2").unwrap());
    }

    #[test]
    fn test_parse_repeated_symbol_accumulates() {
        assert_eq!(parse("m*m/m/m").unwrap(), Exponents::new());
    }

    #[test]
    fn test_parse_underscore_symbols_keep_digits() {
        let parsed = parse("g_0^2*k_B").unwrap();
        assert_eq!(parsed.get("g_0"), Some(int(2)));
        assert_eq!(parsed.get("k_B"), Some(int(1)));
    }

    #[test]
    fn test_parse_markup() {
        let expected = parse("kg*m2/s2").unwrap();
        assert_eq!(parse("kg&nbsp;m<sup>2</sup>&nbsp;s<sup>-2</sup>").unwrap(), expected);
        assert_eq!(parse(r"\mathrm{kg}\,\mathrm{m}^2\,\mathrm{s}^{-2}").unwrap(), expected);
        assert_eq!(parse("kg m² s⁻²").unwrap(), expected);
    }

    #[test]
    fn test_parse_display_substitutions() {
        assert_eq!(parse("°").unwrap(), ex(&[("deg", int(1))]));
        assert_eq!(parse("kΩ").unwrap(), ex(&[("kohm", int(1))]));
        assert_eq!(parse(r"\mathrm{\Omega}").unwrap(), ex(&[("ohm", int(1))]));
        assert_eq!(parse(r"\mathrm{m}^{1/2}").unwrap().get("m"), Exponent::ratio(1, 2));
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["*m", "/s", "m*", "m/", "(m", "m)", "()", "m^", "2*m", "m/(s*)", "m$"] {
            assert!(parse(bad).is_err(), "expected an error for {bad:?}");
        }
    }

    #[test]
    fn test_parse_error_is_a_parse_variant() {
        match parse("m/") {
            Err(UnitError::Parse { src, .. }) => assert_eq!(src, "m/"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_huge_exponents_do_not_overflow() {
        let parsed = parse("m9223372036854775807*m").unwrap();
        assert!(matches!(parsed.get("m"), Some(Exponent::Float(_))));
        assert!(parse("m(1/9223372036854775807)*m(1/9223372036854775806)").is_ok());
        assert!(parse("s-9223372036854775807/s2").is_ok());
    }

    #[test]
    fn test_zero_denominator_is_an_error() {
        assert!(parse("m(1/0)").is_err());
    }
}
