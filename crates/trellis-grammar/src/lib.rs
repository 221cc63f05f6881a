//! Trellis grammar: the grammar object model and a PEG interpreter producing
//! a concrete syntax tree.
//!
//! This crate defines the rule table the formatter is driven by and parses
//! source text against it. The resulting CST keeps every matched span,
//! including whitespace and comments matched by the grammar's trivia rule,
//! so the formatter can reproduce the input exactly or reformat it.

pub mod cst;
pub mod error;
pub mod grammar;
mod parser;

pub use cst::{debug_tree, CstChild, CstNode, CstValue};
pub use error::{GrammarError, ParseError};
pub use grammar::{
    Alternative, CstDisposition, Grammar, GrammarBuilder, Item, Pattern, Quantifier, Rule, RuleId,
    Separator, Term,
};

use trellis_common::span::{Span, MAX_SOURCE_LEN};

/// Parse `source` as the rule called `rule`.
///
/// The whole input must be consumed. On failure the error points at the
/// furthest position the parser reached. Sources longer than
/// [`MAX_SOURCE_LEN`] bytes are rejected before parsing.
#[tracing::instrument(level = "debug", skip(grammar, source), fields(len = source.len()))]
pub fn parse(grammar: &Grammar, rule: &str, source: &str) -> Result<CstNode, ParseError> {
    let id = grammar
        .rule_id(rule)
        .ok_or_else(|| ParseError::new(format!("unknown rule `{rule}`"), Span::empty_at(0)))?;
    if source.len() > MAX_SOURCE_LEN {
        return Err(ParseError::new(
            format!("source is {} bytes, longer than the {MAX_SOURCE_LEN} byte limit", source.len()),
            Span::empty_at(0),
        ));
    }
    parser::Parser::new(grammar, source).parse(id)
}
