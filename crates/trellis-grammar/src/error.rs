//! Error types for grammar construction and parsing.

use std::fmt;

use trellis_common::span::Span;

/// A problem found while resolving a grammar definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// Two rules share a name.
    DuplicateRule(String),
    /// A rule references a rule that was never defined.
    UnknownRule { rule: String, reference: String },
    /// The designated trivia rule was never defined.
    UnknownTriviaRule(String),
    /// A regex term failed to compile.
    InvalidRegex {
        rule: String,
        pattern: String,
        message: String,
    },
    /// A rule or group has no alternatives.
    EmptyRule(String),
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateRule(name) => write!(f, "rule `{name}` is defined more than once"),
            Self::UnknownRule { rule, reference } => {
                write!(f, "rule `{rule}` references undefined rule `{reference}`")
            }
            Self::UnknownTriviaRule(name) => write!(f, "trivia rule `{name}` is not defined"),
            Self::InvalidRegex {
                rule,
                pattern,
                message,
            } => write!(f, "invalid regex /{pattern}/ in rule `{rule}`: {message}"),
            Self::EmptyRule(name) => write!(f, "rule `{name}` has no alternatives"),
        }
    }
}

impl std::error::Error for GrammarError {}

/// A parse error with location information and optional related span.
///
/// Parse errors carry the furthest position the parser reached, a
/// human-readable message listing what was expected there, and an optional
/// related span for context (e.g. "rule started here").
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// Human-readable description of what went wrong.
    pub message: String,
    /// Primary source location where the error was detected.
    pub span: Span,
    /// Optional related location with context message.
    pub related: Option<(String, Span)>,
}

impl ParseError {
    /// Create a new parse error with just a message and span.
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            related: None,
        }
    }

    /// Create a parse error with a related span for additional context.
    pub fn with_related(
        message: impl Into<String>,
        span: Span,
        related_message: impl Into<String>,
        related_span: Span,
    ) -> Self {
        Self {
            message: message.into(),
            span,
            related: Some((related_message.into(), related_span)),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}
