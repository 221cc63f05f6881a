//! Tokenizer for the formatting configuration DSL, built on logos.
//!
//! Keywords are not separate tokens: statement and spacing names are plain
//! identifiers, recognized by the parser in context, so grammar labels such
//! as `group` or `text` remain usable as anchors.

use logos::Logos;
use trellis_common::span::{Span, MAX_SOURCE_LEN};

use crate::error::{ConfigError, ConfigErrorKind};

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub(crate) enum TokenKind {
    #[regex(r"//[^\n]*")]
    LineComment,

    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,

    #[regex(r"[0-9]+")]
    Int,
    #[regex(r#""([^"\\]|\\.)*""#)]
    Str,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
}

impl TokenKind {
    /// How the token kind is named in error messages.
    pub(crate) fn describe(self) -> &'static str {
        match self {
            TokenKind::LineComment => "comment",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::Semi => "`;`",
            TokenKind::Colon => "`:`",
            TokenKind::Comma => "`,`",
            TokenKind::Int => "number",
            TokenKind::Str => "string",
            TokenKind::Ident => "identifier",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token<'s> {
    pub kind: TokenKind,
    pub text: &'s str,
    pub span: Span,
}

/// Split `source` into tokens, dropping comments.
pub(crate) fn lex(source: &str) -> Result<Vec<Token<'_>>, ConfigError> {
    if source.len() > MAX_SOURCE_LEN {
        return Err(ConfigError::new(
            ConfigErrorKind::SourceTooLong(source.len()),
            Span::empty_at(0),
        ));
    }
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);
    while let Some(result) = lexer.next() {
        let span = Span::from_range(lexer.span());
        match result {
            Ok(TokenKind::LineComment) => continue,
            Ok(kind) => tokens.push(Token {
                kind,
                text: lexer.slice(),
                span,
            }),
            Err(()) => return Err(ConfigError::new(ConfigErrorKind::InvalidToken, span)),
        }
    }
    Ok(tokens)
}

/// The contents of a string token with escape sequences processed.
pub(crate) fn unescape(literal: &str) -> String {
    let inner = literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(literal);
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('\\') => result.push('\\'),
            Some('"') => result.push('"'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}
