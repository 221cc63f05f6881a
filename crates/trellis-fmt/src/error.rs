//! Error types for configuration, unparser generation and unparsing.

use std::fmt;

use trellis_common::span::{Span, MAX_SOURCE_LEN};
use trellis_grammar::ParseError;

use crate::config::AnchorKey;

/// A formatting-configuration DSL error with location information.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    pub kind: ConfigErrorKind,
    pub span: Span,
}

impl ConfigError {
    pub fn new(kind: ConfigErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The specific kind of configuration error.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigErrorKind {
    /// A character sequence that is not a token.
    InvalidToken,
    /// A token other than the expected one.
    Unexpected { expected: String, found: String },
    /// A statement keyword that does not exist.
    UnknownStatement(String),
    /// A spacing name that does not exist.
    UnknownSpacing(String),
    /// `rule` blocks cannot be nested.
    NestedRule,
    /// `preserve` is only valid at global scope.
    PreserveInRule,
    /// An integer literal out of range.
    InvalidNumber(String),
    /// The configuration text is longer than a span can address.
    SourceTooLong(usize),
}

impl fmt::Display for ConfigErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidToken => write!(f, "invalid token"),
            Self::Unexpected { expected, found } => write!(f, "expected {expected}, found {found}"),
            Self::UnknownStatement(s) => write!(f, "unknown statement `{s}`"),
            Self::UnknownSpacing(s) => write!(f, "unknown spacing `{s}`"),
            Self::NestedRule => write!(f, "`rule` blocks cannot be nested"),
            Self::PreserveInRule => write!(f, "`preserve` is only allowed at global scope"),
            Self::InvalidNumber(s) => write!(f, "invalid number `{s}`"),
            Self::SourceTooLong(len) => write!(
                f,
                "configuration is {len} bytes, longer than the {MAX_SOURCE_LEN} byte limit"
            ),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for ConfigError {}

/// A problem found once, while building an unparser from a grammar and a
/// configuration, independent of any input.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationError {
    /// A required item is suppressed from the CST but its text cannot be
    /// regenerated from the grammar alone.
    NotRegenerable { rule: String, item: String },
    /// Two dispositions (`omit`/`render`) were given for one anchor in one scope.
    DuplicateDisposition { rule: Option<String>, anchor: AnchorKey },
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRegenerable { rule, item } => write!(
                f,
                "rule `{rule}`: required item {item} is suppressed from the CST and cannot be regenerated"
            ),
            Self::DuplicateDisposition { rule: Some(rule), anchor } => {
                write!(f, "rule `{rule}`: more than one disposition for `{anchor}`")
            }
            Self::DuplicateDisposition { rule: None, anchor } => {
                write!(f, "more than one disposition for `{anchor}`")
            }
        }
    }
}

impl std::error::Error for GenerationError {}

/// The kind of accumulator frame a structural error is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameName {
    Group,
    Indent,
    Join,
}

impl fmt::Display for FrameName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group => write!(f, "group"),
            Self::Indent => write!(f, "nest"),
            Self::Join => write!(f, "join"),
        }
    }
}

/// Formatting directives that do not nest properly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    /// A close that does not match the innermost open frame.
    Mismatched {
        closing: FrameName,
        open: Option<FrameName>,
    },
    /// A frame still open when its content was needed.
    Unclosed(FrameName),
}

impl fmt::Display for StructuralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mismatched {
                closing,
                open: Some(open),
            } => write!(
                f,
                "improperly nested formatting directives: `{closing}` closed while `{open}` is open"
            ),
            Self::Mismatched {
                closing,
                open: None,
            } => write!(
                f,
                "improperly nested formatting directives: `{closing}` closed but never opened"
            ),
            Self::Unclosed(open) => write!(
                f,
                "improperly nested formatting directives: `{open}` is never closed"
            ),
        }
    }
}

impl std::error::Error for StructuralError {}

/// Failure of one unparse call.
#[derive(Debug, Clone, PartialEq)]
pub enum UnparseError {
    /// The requested start rule does not exist.
    UnknownRule(String),
    /// The CST does not match the grammar for this rule.
    Mismatch { rule: String },
    /// Formatting directives do not nest.
    Structural(StructuralError),
}

impl fmt::Display for UnparseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRule(rule) => write!(f, "unknown rule `{rule}`"),
            Self::Mismatch { rule } => {
                write!(f, "syntax tree does not match any alternative of rule `{rule}`")
            }
            Self::Structural(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for UnparseError {}

impl From<StructuralError> for UnparseError {
    fn from(err: StructuralError) -> Self {
        Self::Structural(err)
    }
}

/// Any failure of the parse → unparse → render pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatError {
    Parse(ParseError),
    Generation(GenerationError),
    Unparse(UnparseError),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "parse error: {err}"),
            Self::Generation(err) => write!(f, "{err}"),
            Self::Unparse(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for FormatError {}

impl From<ParseError> for FormatError {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

impl From<GenerationError> for FormatError {
    fn from(err: GenerationError) -> Self {
        Self::Generation(err)
    }
}

impl From<UnparseError> for FormatError {
    fn from(err: UnparseError) -> Self {
        Self::Unparse(err)
    }
}
