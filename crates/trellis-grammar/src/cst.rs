//! Concrete syntax tree types.
//!
//! A [`CstNode`] is produced for every matched rule. Its children appear in
//! source order and are each wrapped in a [`CstChild`] cell carrying the
//! grammar label of the item that produced them. Nested groups and quantified
//! items do not create nodes of their own: their children are flattened into
//! the enclosing rule's child list, so the unparser can walk a rule's
//! alternative and the child list in lock-step.

use std::fmt::Write;

use trellis_common::span::Span;

use crate::grammar::{Grammar, RuleId};

/// A matched rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CstNode {
    pub rule: RuleId,
    pub span: Span,
    pub children: Vec<CstChild>,
}

/// One child of a [`CstNode`], tagged with the label of the item that matched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CstChild {
    pub label: Option<String>,
    pub value: CstValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CstValue {
    /// A matched rule reference.
    Node(CstNode),
    /// A matched literal or regex, as a span of the source.
    Span(Span),
    /// Whitespace and comments matched by the grammar's trivia rule.
    Trivia(CstNode),
}

impl CstNode {
    /// The source text covered by this node.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        self.span.slice(source).unwrap_or("")
    }
}

impl CstChild {
    pub fn span(&self) -> Span {
        match &self.value {
            CstValue::Node(node) | CstValue::Trivia(node) => node.span,
            CstValue::Span(span) => *span,
        }
    }

    pub fn as_trivia(&self) -> Option<&CstNode> {
        match &self.value {
            CstValue::Trivia(node) => Some(node),
            _ => None,
        }
    }
}

/// Render a CST as an indented tree, one element per line.
///
/// Rule nodes print as `name@start..end`, spans as their quoted text and
/// trivia nodes with a `~` prefix. Labels precede the element as `label=`.
pub fn debug_tree(grammar: &Grammar, node: &CstNode, source: &str) -> String {
    let mut out = String::new();
    write_node(grammar, node, source, None, "", 0, &mut out);
    out
}

fn write_node(
    grammar: &Grammar,
    node: &CstNode,
    source: &str,
    label: Option<&str>,
    prefix: &str,
    depth: usize,
    out: &mut String,
) {
    let indent = "  ".repeat(depth);
    let label = label.map(|l| format!("{l}=")).unwrap_or_default();
    let _ = writeln!(
        out,
        "{indent}{label}{prefix}{}@{}..{}",
        grammar.rule_name(node.rule),
        node.span.start,
        node.span.end
    );
    for child in &node.children {
        let label = child.label.as_deref();
        match &child.value {
            CstValue::Node(inner) => write_node(grammar, inner, source, label, "", depth + 1, out),
            CstValue::Trivia(inner) => write_node(grammar, inner, source, label, "~", depth + 1, out),
            CstValue::Span(span) => {
                let label = label.map(|l| format!("{l}=")).unwrap_or_default();
                let _ = writeln!(
                    out,
                    "{}{label}{:?}@{}..{}",
                    "  ".repeat(depth + 1),
                    span.slice(source).unwrap_or(""),
                    span.start,
                    span.end
                );
            }
        }
    }
}
