//! Render configuration and parse errors as labelled source snippets
//! using ariadne. Output is uncolored so it can be compared in tests.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use trellis_common::span::Span;
use trellis_grammar::ParseError;

use crate::error::{ConfigError, ConfigErrorKind};

fn config_error_code(kind: &ConfigErrorKind) -> &'static str {
    match kind {
        ConfigErrorKind::InvalidToken => "C0001",
        ConfigErrorKind::Unexpected { .. } => "C0002",
        ConfigErrorKind::UnknownStatement(_) => "C0003",
        ConfigErrorKind::UnknownSpacing(_) => "C0004",
        ConfigErrorKind::NestedRule => "C0005",
        ConfigErrorKind::PreserveInRule => "C0006",
        ConfigErrorKind::InvalidNumber(_) => "C0007",
        ConfigErrorKind::SourceTooLong(_) => "C0008",
    }
}

/// Clamp a span to the source and widen empty spans to one character,
/// which ariadne needs to draw a label.
fn clamp(span: Span, source: &str) -> Range<usize> {
    let len = source.len();
    let start = (span.start as usize).min(len);
    let end = (span.end as usize).min(len).max(start);
    if start == end {
        start..(end + 1).min(len)
    } else {
        start..end
    }
}

fn write(report: Report<'_, Range<usize>>, source: &str) -> String {
    let mut buf = Vec::new();
    if report.write(Source::from(source), &mut buf).is_err() {
        return String::new();
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Render a formatting-configuration error against the DSL source.
pub fn render_config_error(error: &ConfigError, source: &str) -> String {
    let range = clamp(error.span, source);
    let label = match &error.kind {
        ConfigErrorKind::Unexpected { expected, .. } => format!("expected {expected} here"),
        ConfigErrorKind::UnknownSpacing(_) => {
            "spacing is one of nil, nbsp, bsp, soft, hard, blank".to_string()
        }
        ConfigErrorKind::NestedRule => "rule blocks only appear at the top level".to_string(),
        _ => error.kind.to_string(),
    };
    let report = Report::build(ReportKind::Error, range.clone())
        .with_code(config_error_code(&error.kind))
        .with_message(error.kind.to_string())
        .with_config(Config::default().with_color(false))
        .with_label(Label::new(range).with_message(label).with_color(Color::Red))
        .finish();
    write(report, source)
}

/// Render a parse error against the input it was produced from.
pub fn render_parse_error(error: &ParseError, source: &str) -> String {
    let range = clamp(error.span, source);
    let mut builder = Report::build(ReportKind::Error, range.clone())
        .with_code("P0001")
        .with_message(&error.message)
        .with_config(Config::default().with_color(false))
        .with_label(Label::new(range).with_message("here").with_color(Color::Red));
    if let Some((message, span)) = &error.related {
        builder = builder.with_label(
            Label::new(clamp(*span, source))
                .with_message(message)
                .with_color(Color::Blue),
        );
    }
    write(builder.finish(), source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormattingConfiguration;

    #[test]
    fn config_error_report_points_at_token() {
        let source = "after x { hard }";
        let err = FormattingConfiguration::parse(source).unwrap_err();
        let output = render_config_error(&err, source);
        assert!(output.contains("C0002"), "{output}");
        assert!(output.contains("expected `;`, found `}`"), "{output}");
        assert!(output.contains("after x { hard }"), "{output}");
    }

    #[test]
    fn error_at_end_of_input_still_renders() {
        let source = "omit x";
        let err = FormattingConfiguration::parse(source).unwrap_err();
        let output = render_config_error(&err, source);
        assert!(output.contains("found end of input"), "{output}");
    }

    #[test]
    fn parse_error_report_includes_related_label() {
        let source = "(1 + 2";
        let err = ParseError::with_related(
            "expected \")\", found end of input",
            Span::new(6, 6),
            "group opened here",
            Span::new(0, 1),
        );
        let output = render_parse_error(&err, source);
        assert!(output.contains("P0001"), "{output}");
        assert!(output.contains("group opened here"), "{output}");
    }

    #[test]
    fn clamp_widens_empty_spans() {
        assert_eq!(clamp(Span::new(2, 2), "abcd"), 2..3);
        assert_eq!(clamp(Span::new(4, 4), "abcd"), 4..4);
        assert_eq!(clamp(Span::new(1, 9), "abcd"), 1..4);
    }
}
