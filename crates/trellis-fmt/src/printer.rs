//! Wadler-Lindig printer for resolved documents.
//!
//! The printer converts a [`Doc`] into a string by deciding at each `Group`
//! boundary whether to render flat (all on one line) or broken (with line
//! breaks and indentation), based on the configured line width.
//!
//! Indentation is written lazily, when the first character of a line is
//! printed, so blank lines carry no trailing spaces. Nothing is appended at
//! the end of the output: a document that reproduces its source exactly
//! renders to exactly that source.

use serde::Deserialize;

use crate::doc::Doc;

/// Layout settings for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Columns per indentation level. Default: 4.
    pub indent_width: u32,
    /// Line width above which groups break. Default: 80.
    pub max_width: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            indent_width: 4,
            max_width: 80,
        }
    }
}

impl RenderConfig {
    /// Read settings from TOML, defaulting missing fields.
    ///
    /// ```
    /// use trellis_fmt::RenderConfig;
    ///
    /// let config = RenderConfig::from_toml_str("max_width = 100").unwrap();
    /// assert_eq!(config.max_width, 100);
    /// assert_eq!(config.indent_width, 4);
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Whether the current context is rendering flat or broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Flat,
    Break,
}

/// A command on the printer's work stack.
#[derive(Debug)]
struct PrintCmd<'a> {
    indent: usize,
    mode: Mode,
    doc: &'a Doc,
}

/// Output buffer that tracks the column and defers indentation.
struct Output {
    out: String,
    col: usize,
    /// Indentation owed to the current line, written before its first text.
    pending: Option<usize>,
}

impl Output {
    fn text(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        if let Some(indent) = self.pending.take() {
            self.out.extend(std::iter::repeat(' ').take(indent));
        }
        self.out.push_str(s);
        self.col = match s.rfind('\n') {
            Some(i) => s[i + 1..].chars().count(),
            None => self.col + s.chars().count(),
        };
    }

    fn newlines(&mut self, count: u32, indent: usize) {
        for _ in 0..count {
            self.out.push('\n');
        }
        self.pending = Some(indent);
        self.col = indent;
    }
}

/// Render a resolved document as text.
///
/// Control nodes are ignored and join lists are rendered with their
/// separator between items, so an unresolved document still prints.
pub fn render(doc: &Doc, config: &RenderConfig) -> String {
    let unit = config.indent_width as usize;
    let max_width = config.max_width as usize;
    let mut out = Output {
        out: String::new(),
        col: 0,
        pending: None,
    };
    let mut stack: Vec<PrintCmd> = vec![PrintCmd {
        indent: 0,
        mode: Mode::Break,
        doc,
    }];

    while let Some(cmd) = stack.pop() {
        match cmd.doc {
            Doc::Empty | Doc::AfterSpacing(_) | Doc::BeforeSpacing(_) | Doc::SeparatorSpacing(_) => {}

            Doc::Text(s) | Doc::Comment(s) => out.text(s),

            Doc::NbSpace => out.text(" "),

            Doc::OptSpace => match cmd.mode {
                Mode::Flat => out.text(" "),
                Mode::Break => out.newlines(1, cmd.indent),
            },

            Doc::SoftBreak => {
                if cmd.mode == Mode::Break {
                    out.newlines(1, cmd.indent);
                }
            }

            Doc::HardBreak(blank) => out.newlines(blank + 1, cmd.indent),

            Doc::Indent(child, amount) => {
                let by = amount.map_or(unit, |n| n as usize);
                stack.push(PrintCmd {
                    indent: cmd.indent + by,
                    mode: cmd.mode,
                    doc: child,
                });
            }

            Doc::Group(child) => {
                let flat_width = measure_flat(child);
                let mode = if flat_width != usize::MAX && out.col + flat_width <= max_width {
                    Mode::Flat
                } else {
                    Mode::Break
                };
                stack.push(PrintCmd {
                    indent: cmd.indent,
                    mode,
                    doc: child,
                });
            }

            Doc::Seq(parts) => {
                // Push in reverse order so the first element is processed first.
                for part in parts.iter().rev() {
                    stack.push(PrintCmd {
                        indent: cmd.indent,
                        mode: cmd.mode,
                        doc: part,
                    });
                }
            }

            Doc::JoinList(items, separator) => {
                for (i, item) in items.iter().enumerate().rev() {
                    stack.push(PrintCmd {
                        indent: cmd.indent,
                        mode: cmd.mode,
                        doc: item,
                    });
                    if i > 0 {
                        stack.push(PrintCmd {
                            indent: cmd.indent,
                            mode: cmd.mode,
                            doc: separator,
                        });
                    }
                }
            }
        }
    }

    out.out
}

/// Width of a document rendered flat.
///
/// Returns `usize::MAX` if it contains a `HardBreak` or text with a newline,
/// neither of which can fit on one line.
fn measure_flat(doc: &Doc) -> usize {
    match doc {
        Doc::Empty | Doc::SoftBreak => 0,
        Doc::AfterSpacing(_) | Doc::BeforeSpacing(_) | Doc::SeparatorSpacing(_) => 0,
        Doc::Text(s) | Doc::Comment(s) => {
            if s.contains('\n') {
                usize::MAX
            } else {
                s.chars().count()
            }
        }
        Doc::OptSpace | Doc::NbSpace => 1,
        Doc::HardBreak(_) => usize::MAX,
        Doc::Indent(child, _) | Doc::Group(child) => measure_flat(child),
        Doc::Seq(parts) => sum_widths(parts.iter().map(measure_flat)),
        Doc::JoinList(items, separator) => {
            let gaps = items.len().saturating_sub(1);
            let separators = std::iter::repeat(measure_flat(separator)).take(gaps);
            sum_widths(items.iter().map(measure_flat).chain(separators))
        }
    }
}

fn sum_widths(widths: impl Iterator<Item = usize>) -> usize {
    let mut total: usize = 0;
    for w in widths {
        if w == usize::MAX {
            return usize::MAX;
        }
        total = total.saturating_add(w);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::*;

    fn narrow(max_width: u32) -> RenderConfig {
        RenderConfig {
            indent_width: 2,
            max_width,
        }
    }

    #[test]
    fn group_fits_renders_flat() {
        let doc = group(seq([text("a"), Doc::OptSpace, text("b")]));
        assert_eq!(render(&doc, &RenderConfig::default()), "a b");
    }

    #[test]
    fn group_too_wide_breaks() {
        let doc = group(seq([text("aaaa"), Doc::OptSpace, text("bbbb")]));
        assert_eq!(render(&doc, &narrow(5)), "aaaa\nbbbb");
    }

    #[test]
    fn soft_break_vanishes_when_flat() {
        let doc = group(seq([text("("), Doc::SoftBreak, text("x"), Doc::SoftBreak, text(")")]));
        assert_eq!(render(&doc, &RenderConfig::default()), "(x)");
        assert_eq!(render(&doc, &narrow(2)), "(\nx\n)");
    }

    #[test]
    fn nbsp_never_breaks() {
        let doc = group(seq([text("aaaa"), Doc::NbSpace, text("bbbb")]));
        assert_eq!(render(&doc, &narrow(3)), "aaaa bbbb");
    }

    #[test]
    fn hard_break_forces_group_to_break() {
        let doc = group(seq([text("a"), Doc::OptSpace, text("b"), hardline(), text("c")]));
        assert_eq!(render(&doc, &RenderConfig::default()), "a\nb\nc");
    }

    #[test]
    fn blank_lines_have_no_indentation() {
        let doc = seq([
            text("{"),
            indent(seq([hardline(), text("a"), blank(1), text("b")])),
            hardline(),
            text("}"),
        ]);
        assert_eq!(render(&doc, &narrow(80)), "{\n  a\n\n  b\n}");
    }

    #[test]
    fn explicit_indent_amount() {
        let doc = seq([text("x"), indent_by(seq([hardline(), text("y")]), 3)]);
        assert_eq!(render(&doc, &RenderConfig::default()), "x\n   y");
    }

    #[test]
    fn text_with_newline_resets_column() {
        let doc = seq([
            text("abc\nd"),
            group(seq([text("12"), Doc::OptSpace, text("34")])),
        ]);
        // Column is 1 after the text, so "12 34" still fits in width 6.
        assert_eq!(render(&doc, &narrow(6)), "abc\nd12 34");
        assert_eq!(measure_flat(&text("a\nb")), usize::MAX);
    }

    #[test]
    fn comments_render_verbatim() {
        let doc = seq([text("x"), Doc::NbSpace, comment("# note")]);
        assert_eq!(render(&doc, &RenderConfig::default()), "x # note");
    }

    #[test]
    fn join_lists_render_with_separator() {
        let doc = join(text(", "), vec![text("a"), text("b"), text("c")]);
        assert_eq!(render(&doc, &RenderConfig::default()), "a, b, c");
        assert_eq!(measure_flat(&doc), 7);
    }

    #[test]
    fn empty_document_renders_nothing() {
        assert_eq!(render(&Doc::Empty, &RenderConfig::default()), "");
    }

    #[test]
    fn render_config_from_toml() {
        let config = RenderConfig::from_toml_str("indent_width = 2\nmax_width = 40\n").unwrap();
        assert_eq!(config, narrow(40));
        assert_eq!(RenderConfig::from_toml_str("").unwrap(), RenderConfig::default());
        assert!(RenderConfig::from_toml_str("max_width = \"wide\"").is_err());
    }
}
