//! Tokens of the definition expression language

use logos::Logos;

use crate::error::{Result, UnitError};

/// A token with its kind, byte span and text
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: logos::Span,
    pub text: String,
}

/// Token kinds recognized by the lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Logos)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum TokenKind {
    #[token("lambda")]
    Lambda,
    #[token("True")]
    True,
    #[token("False")]
    False,

    // Literals
    #[regex(r"[0-9]+", priority = 2)]
    IntLit,
    // 3.14, 3.14e10, 1e-10, .5
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?|[0-9]+[eE][+-]?[0-9]+|\.[0-9]+([eE][+-]?[0-9]+)?")]
    FloatLit,
    #[regex(r#""([^"\\]|\\.)*""#)]
    #[regex(r#"'([^'\\]|\\.)*'"#)]
    StringLit,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", priority = 1)]
    Ident,

    // Operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("**")]
    StarStar,
    #[token("/")]
    Slash,
    #[token("//")]
    SlashSlash,
    #[token("%")]
    Percent,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,

    Eof,
}

impl TokenKind {
    /// Human-readable name for error messages
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Lambda => "'lambda'",
            TokenKind::True => "'True'",
            TokenKind::False => "'False'",
            TokenKind::IntLit | TokenKind::FloatLit => "a number",
            TokenKind::StringLit => "a string",
            TokenKind::Ident => "an identifier",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::StarStar => "'**'",
            TokenKind::Slash => "'/'",
            TokenKind::SlashSlash => "'//'",
            TokenKind::Percent => "'%'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::Eof => "end of expression",
        }
    }
}

/// Lex an expression into tokens, ending with [`TokenKind::Eof`]
pub fn lex(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let kind = match result {
            Ok(kind) => kind,
            Err(_) => {
                return Err(UnitError::parse(
                    format!("unexpected character {:?}", &source[span.clone()]),
                    source,
                    span.start,
                    span.len(),
                ));
            }
        };

        tokens.push(Token {
            kind,
            span: span.clone(),
            text: source[span].to_string(),
        });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: source.len()..source.len(),
        text: String::new(),
    });

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_lex_numbers() {
        let tokens = lex("42 3.5 1e-3 .25").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::IntLit);
        assert_eq!(tokens[1].kind, TokenKind::FloatLit);
        assert_eq!(tokens[2].kind, TokenKind::FloatLit);
        assert_eq!(tokens[2].text, "1e-3");
        assert_eq!(tokens[3].kind, TokenKind::FloatLit);
        assert_eq!(tokens[4].kind, TokenKind::Eof);
    }

    #[test]
    fn test_lex_operators() {
        assert_eq!(
            kinds("+ - * ** / // %"),
            vec![
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::StarStar,
                TokenKind::Slash,
                TokenKind::SlashSlash,
                TokenKind::Percent,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_lambda_definition() {
        assert_eq!(
            kinds("(lambda n: n*K, True)"),
            vec![
                TokenKind::LParen,
                TokenKind::Lambda,
                TokenKind::Ident,
                TokenKind::Colon,
                TokenKind::Ident,
                TokenKind::Star,
                TokenKind::Ident,
                TokenKind::Comma,
                TokenKind::True,
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_strings() {
        let tokens = lex(r#"'L/T' "kg*m""#).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::StringLit);
        assert_eq!(tokens[0].text, "'L/T'");
        assert_eq!(tokens[1].text, "\"kg*m\"");
    }

    #[test]
    fn test_identifiers_are_not_keywords() {
        assert_eq!(kinds("lambdas k_B"), vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn test_lex_error() {
        assert!(matches!(lex("m $ s"), Err(UnitError::Parse { .. })));
    }
}
