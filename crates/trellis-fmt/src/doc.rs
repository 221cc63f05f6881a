//! Document algebra for formatted output.
//!
//! A [`Doc`] captures formatting intent (text, spacing, groups, indentation)
//! without committing to a layout until rendering. During unparsing the tree
//! also carries *control* nodes ([`Doc::AfterSpacing`], [`Doc::BeforeSpacing`],
//! [`Doc::SeparatorSpacing`]) that defer spacing decisions to the resolver,
//! and [`Doc::JoinList`] wrappers that the resolver expands. A final
//! document contains neither.

/// A document node in the Wadler-Lindig style.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Doc {
    /// Literal text to emit verbatim.
    Text(String),
    /// Comment text preserved from the source, emitted verbatim.
    Comment(String),
    /// A space in flat mode; a newline + indent in broken mode.
    OptSpace,
    /// Always a space, never a line break.
    NbSpace,
    /// Nothing in flat mode; a newline + indent in broken mode.
    SoftBreak,
    /// Always a newline, followed by `n` blank lines.
    HardBreak(u32),
    /// Try to render the child flat. If it exceeds the remaining line width,
    /// render it broken instead.
    Group(Box<Doc>),
    /// Indent line breaks inside the child. `None` uses the renderer's unit.
    Indent(Box<Doc>, Option<u32>),
    /// A sequence of nodes rendered in order.
    Seq(Vec<Doc>),
    /// Items joined by a separator; expanded by the resolver.
    JoinList(Vec<Doc>, Box<Doc>),
    /// Produces no output.
    Empty,
    /// Spacing requested after an item.
    AfterSpacing(Box<Doc>),
    /// Spacing requested before an item.
    BeforeSpacing(Box<Doc>),
    /// A grammar separator slot.
    SeparatorSpacing(SeparatorSpacing),
}

/// The deferred decision at one grammar separator slot.
///
/// `spacing` is the configured default for the slot; `preserved_trivia` is
/// source trivia kept at the slot. One without the other is the common case;
/// a node with neither that is not `required` carries no information.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SeparatorSpacing {
    pub spacing: Option<Box<Doc>>,
    pub preserved_trivia: Option<Box<Doc>>,
    pub required: bool,
}

impl SeparatorSpacing {
    pub fn with_spacing(spacing: Doc, required: bool) -> Self {
        Self {
            spacing: Some(Box::new(spacing)),
            preserved_trivia: None,
            required,
        }
    }

    pub fn with_trivia(trivia: Doc, required: bool) -> Self {
        Self {
            spacing: None,
            preserved_trivia: Some(Box::new(trivia)),
            required,
        }
    }

    pub fn has_trivia(&self) -> bool {
        self.preserved_trivia.is_some()
    }

    /// Whether this node carries nothing and may be dropped.
    pub fn is_vacuous(&self) -> bool {
        self.spacing.is_none() && self.preserved_trivia.is_none() && !self.required
    }
}

impl Doc {
    /// Whether this is one of the stage-(a) control nodes.
    pub fn is_control(&self) -> bool {
        matches!(
            self,
            Doc::AfterSpacing(_) | Doc::BeforeSpacing(_) | Doc::SeparatorSpacing(_)
        )
    }

    /// Whether this is one of the whitespace variants.
    pub fn is_whitespace(&self) -> bool {
        matches!(
            self,
            Doc::OptSpace | Doc::NbSpace | Doc::SoftBreak | Doc::HardBreak(_)
        )
    }

    /// Whether this node may render as a line break.
    pub fn is_line_break(&self) -> bool {
        matches!(self, Doc::OptSpace | Doc::SoftBreak | Doc::HardBreak(_))
    }

    /// Whether the tree still contains control nodes or join lists.
    pub fn is_final(&self) -> bool {
        match self {
            Doc::AfterSpacing(_) | Doc::BeforeSpacing(_) | Doc::SeparatorSpacing(_) => false,
            Doc::JoinList(..) => false,
            Doc::Group(inner) | Doc::Indent(inner, _) => inner.is_final(),
            Doc::Seq(items) => items.iter().all(Doc::is_final),
            _ => true,
        }
    }

    /// The children of a sequence, or the node itself as a one-element list.
    pub fn into_items(self) -> Vec<Doc> {
        match self {
            Doc::Seq(items) => items,
            Doc::Empty => Vec::new(),
            other => vec![other],
        }
    }
}

// ── Helper constructors ─────────────────────────────────────────────────

/// Create a `Text` node from a string-like value.
pub fn text(s: impl Into<String>) -> Doc {
    Doc::Text(s.into())
}

/// Create a `Comment` node from a string-like value.
pub fn comment(s: impl Into<String>) -> Doc {
    Doc::Comment(s.into())
}

/// Create a `HardBreak` with no blank lines.
pub fn hardline() -> Doc {
    Doc::HardBreak(0)
}

/// Create a `HardBreak` followed by `n` blank lines.
pub fn blank(n: u32) -> Doc {
    Doc::HardBreak(n)
}

/// Create a `Group` that tries flat layout first, breaking if it exceeds width.
pub fn group(doc: Doc) -> Doc {
    Doc::Group(Box::new(doc))
}

/// Create an `Indent` by the renderer's indent unit.
pub fn indent(doc: Doc) -> Doc {
    Doc::Indent(Box::new(doc), None)
}

/// Create an `Indent` by an explicit number of columns.
pub fn indent_by(doc: Doc, amount: u32) -> Doc {
    Doc::Indent(Box::new(doc), Some(amount))
}

/// Create a `JoinList` of `items` separated by `separator`.
pub fn join(separator: Doc, items: Vec<Doc>) -> Doc {
    Doc::JoinList(items, Box::new(separator))
}

/// Create a sequence in canonical shape.
///
/// Nested sequences are flattened and `Empty` elements dropped; an empty
/// result is `Empty` and a single element is returned unwrapped.
pub fn seq(parts: impl IntoIterator<Item = Doc>) -> Doc {
    let mut items = Vec::new();
    for part in parts {
        match part {
            Doc::Empty => {}
            Doc::Seq(inner) => items.extend(inner.into_iter().filter(|d| *d != Doc::Empty)),
            other => items.push(other),
        }
    }
    match items.len() {
        0 => Doc::Empty,
        1 => items.pop().unwrap_or(Doc::Empty),
        _ => Doc::Seq(items),
    }
}

pub fn after_spacing(spacing: Doc) -> Doc {
    Doc::AfterSpacing(Box::new(spacing))
}

pub fn before_spacing(spacing: Doc) -> Doc {
    Doc::BeforeSpacing(Box::new(spacing))
}

pub fn separator_spacing(spacing: SeparatorSpacing) -> Doc {
    Doc::SeparatorSpacing(spacing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_flattens_nested_sequences() {
        let doc = seq([text("a"), seq([text("b"), text("c")]), text("d")]);
        assert_eq!(
            doc,
            Doc::Seq(vec![text("a"), text("b"), text("c"), text("d")])
        );
    }

    #[test]
    fn seq_drops_empty_and_unwraps_singletons() {
        assert_eq!(seq([Doc::Empty, text("a"), Doc::Empty]), text("a"));
        assert_eq!(seq([Doc::Empty, Doc::Empty]), Doc::Empty);
        assert_eq!(seq(Vec::new()), Doc::Empty);
    }

    #[test]
    fn seq_does_not_flatten_through_groups() {
        let doc = seq([text("a"), group(seq([text("b"), text("c")]))]);
        assert_eq!(
            doc,
            Doc::Seq(vec![
                text("a"),
                group(Doc::Seq(vec![text("b"), text("c")]))
            ])
        );
    }

    #[test]
    fn control_nodes_are_not_final() {
        let raw = seq([
            text("a"),
            group(seq([after_spacing(Doc::NbSpace), text("b")])),
        ]);
        assert!(!raw.is_final());
        assert!(seq([text("a"), group(text("b"))]).is_final());
        assert!(!join(Doc::NbSpace, vec![text("a")]).is_final());
    }

    #[test]
    fn vacuous_separator() {
        assert!(SeparatorSpacing::default().is_vacuous());
        assert!(!SeparatorSpacing::with_spacing(Doc::Empty, false).is_vacuous());
        assert!(!SeparatorSpacing {
            required: true,
            ..Default::default()
        }
        .is_vacuous());
    }
}
