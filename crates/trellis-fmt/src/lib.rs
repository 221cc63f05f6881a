//! Trellis formatter.
//!
//! This crate turns a concrete syntax tree back into text, driven by the
//! grammar that produced it and a formatting configuration. It works by:
//!
//! 1. Walking the CST against the grammar to produce a raw `Doc` in which
//!    spacing decisions are still deferred (`walker`)
//! 2. Resolving the deferred spacing against preserved trivia and the
//!    configured anchors into a final `Doc` (`resolve`)
//! 3. Printing the document to a string, respecting line width (`printer`)
//!
//! With the default configuration and full trivia preservation the output
//! is the input, byte for byte.

pub mod accumulator;
pub mod config;
pub mod diagnostics;
pub mod doc;
pub mod error;
pub mod printer;
pub mod resolve;
pub mod walker;

pub use accumulator::{Accumulator, Checkpoint};
pub use config::{
    AnchorConfig, AnchorKey, Disposition, FormattingConfiguration, Operation, Position,
    RuleConfig, SelectorKind, TriviaPolicy,
};
pub use diagnostics::{render_config_error, render_parse_error};
pub use doc::{Doc, SeparatorSpacing};
pub use error::{
    ConfigError, ConfigErrorKind, FormatError, FrameName, GenerationError, StructuralError,
    UnparseError,
};
pub use printer::{render, RenderConfig};
pub use resolve::{merge_spacing, resolve};
pub use walker::Unparser;

use trellis_grammar::Grammar;

/// Parse `source` as `rule`, unparse it under `config` and render it.
///
/// # Example
///
/// ```
/// use trellis_fmt::{format_source, FormattingConfiguration, RenderConfig};
/// use trellis_grammar::grammar::{lit, regex, seq, GrammarBuilder};
///
/// let grammar = GrammarBuilder::new()
///     .rule("pair", [seq().then(regex("[a-z]+")).ws(lit("=")).ws(regex("[0-9]+"))])
///     .trivia_rule("_", [seq().then(regex(r"\s+"))])
///     .build()
///     .unwrap();
/// let config = FormattingConfiguration::parse(r#"before "=" { nbsp; } after "=" { nbsp; }"#).unwrap();
/// let formatted = format_source(&grammar, &config, "pair", "x=1", &RenderConfig::default()).unwrap();
/// assert_eq!(formatted, "x = 1");
/// ```
#[tracing::instrument(level = "debug", skip(grammar, config, source, render_config), fields(len = source.len()))]
pub fn format_source(
    grammar: &Grammar,
    config: &FormattingConfiguration,
    rule: &str,
    source: &str,
    render_config: &RenderConfig,
) -> Result<String, FormatError> {
    let node = trellis_grammar::parse(grammar, rule, source)?;
    let unparser = Unparser::new(grammar, config)?;
    let doc = unparser.unparse(rule, &node, source)?;
    Ok(printer::render(&doc, render_config))
}

#[cfg(test)]
mod idempotency_tests {
    use super::*;
    use trellis_grammar::grammar::{group, lit, regex, rule_ref, seq, GrammarBuilder};

    fn assignments() -> Grammar {
        GrammarBuilder::new()
            .rule(
                "program",
                [seq().then(rule_ref("assign").many()).trailing(trellis_grammar::Separator::WsAllowed)],
            )
            .rule(
                "assign",
                [seq()
                    .ws(regex("[a-z]+").label("name"))
                    .ws(lit("="))
                    .ws(group([seq().then(regex("[0-9]+"))]))
                    .ws(lit(";"))],
            )
            .trivia_rule("_", [seq().then(regex(r"\s+"))])
            .build()
            .unwrap()
    }

    const CONFIG: &str = r#"
        preserve none;
        before "=" { nbsp; }
        after "=" { nbsp; }
        after ";" { hard; }
    "#;

    fn assert_idempotent(name: &str, source: &str) {
        let grammar = assignments();
        let config = FormattingConfiguration::parse(CONFIG).unwrap();
        let render_config = RenderConfig::default();
        let formatted = format_source(&grammar, &config, "program", source, &render_config).unwrap();
        let double_formatted =
            format_source(&grammar, &config, "program", &formatted, &render_config).unwrap();
        assert_eq!(
            formatted, double_formatted,
            "Idempotency failed for: {}\nFirst:  {:?}\nSecond: {:?}",
            name, formatted, double_formatted
        );
    }

    #[test]
    fn idempotent_empty_program() {
        assert_idempotent("empty", "");
    }

    #[test]
    fn idempotent_single_assignment() {
        assert_idempotent("single", "x=1;");
    }

    #[test]
    fn idempotent_messy_spacing() {
        assert_idempotent("messy", "  a   =2 ;b= 3;\n\n\nc =4;  ");
    }

    #[test]
    fn format_source_reports_parse_errors() {
        let grammar = assignments();
        let err = format_source(
            &grammar,
            &FormattingConfiguration::new(),
            "program",
            "x = ;",
            &RenderConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, FormatError::Parse(_)), "{err:?}");
    }
}
