//! Grammar-driven PEG interpreter producing a [`CstNode`].
//!
//! The parser walks the grammar's rule table directly: ordered choice over
//! alternatives, greedy repetition, no memoization and no left recursion.
//! Every non-`NoWs` separator slot tries the grammar's trivia rule and keeps
//! a non-empty match as a `Trivia` child, so the CST carries all whitespace
//! and comments needed to reproduce the input byte for byte.
//!
//! Failures are tracked at the furthest position reached, together with the
//! set of terminals that were expected there and the innermost rule that was
//! already in progress when that position was first reached.

use trellis_common::span::Span;

use crate::cst::{CstChild, CstNode, CstValue};
use crate::error::ParseError;
use crate::grammar::{Alternative, Grammar, Item, Quantifier, RuleId, Separator, Term};

pub(crate) struct Parser<'g, 's> {
    grammar: &'g Grammar,
    source: &'s str,
    /// Furthest byte offset at which a terminal failed to match.
    furthest: usize,
    /// Terminals expected at `furthest`.
    expected: Vec<String>,
    /// Nonzero while matching trivia, whose failures are not reported.
    quiet: u32,
    /// Rules being matched, innermost last, with their start offsets.
    rules: Vec<(RuleId, usize)>,
    /// Innermost rule that started before `furthest`.
    context: Option<(RuleId, usize)>,
}

impl<'g, 's> Parser<'g, 's> {
    pub(crate) fn new(grammar: &'g Grammar, source: &'s str) -> Self {
        Self {
            grammar,
            source,
            furthest: 0,
            expected: Vec::new(),
            quiet: 0,
            rules: Vec::new(),
            context: None,
        }
    }

    /// Parse `rule` over the whole source.
    pub(crate) fn parse(mut self, rule: RuleId) -> Result<CstNode, ParseError> {
        let node = self.parse_rule(rule, 0, false);
        match node {
            Some(node) if node.span.end as usize == self.source.len() => Ok(node),
            Some(node) => {
                self.expect(node.span.end as usize, "end of input");
                Err(self.error())
            }
            None => Err(self.error()),
        }
    }

    fn error(&self) -> ParseError {
        let next = self.source[self.furthest..].chars().next();
        let end = self.furthest + next.map_or(0, char::len_utf8);
        let span = Span::from_range(self.furthest..end);
        let found = match next {
            Some(c) => format!("{c:?}"),
            None => "end of input".to_string(),
        };
        let mut expected = self.expected.clone();
        expected.sort();
        expected.dedup();
        let message = match expected.as_slice() {
            [] => format!("unexpected {found}"),
            [one] => format!("expected {one}, found {found}"),
            many => format!("expected one of {}, found {found}", many.join(", ")),
        };
        match self.context {
            Some((rule, start)) => {
                let first = self.source[start..].chars().next().map_or(0, char::len_utf8);
                ParseError::with_related(
                    message,
                    span,
                    format!("while parsing `{}`", self.grammar.rule(rule).name),
                    Span::from_range(start..start + first),
                )
            }
            None => ParseError::new(message, span),
        }
    }

    /// Record that `what` was expected at `pos`.
    fn expect(&mut self, pos: usize, what: impl Into<String>) {
        if self.quiet > 0 {
            return;
        }
        if pos > self.furthest {
            self.furthest = pos;
            self.expected.clear();
            self.context = self.rules.iter().rev().find(|(_, start)| *start < pos).copied();
        }
        if pos == self.furthest {
            self.expected.push(what.into());
        }
    }

    fn parse_rule(&mut self, id: RuleId, start: usize, in_trivia: bool) -> Option<CstNode> {
        let rule = self.grammar.rule(id);
        let in_trivia = in_trivia || rule.is_trivia;
        self.rules.push((id, start));
        let mut matched = None;
        for (index, alt) in rule.alternatives.iter().enumerate() {
            let mut pos = start;
            let mut children = Vec::new();
            if self.parse_alternative(alt, in_trivia, &mut pos, &mut children) {
                tracing::trace!(rule = %rule.name, alternative = index, start, end = pos, "rule matched");
                matched = Some(CstNode {
                    rule: id,
                    span: Span::from_range(start..pos),
                    children,
                });
                break;
            }
        }
        self.rules.pop();
        matched
    }

    fn parse_alternative(
        &mut self,
        alt: &Alternative,
        in_trivia: bool,
        pos: &mut usize,
        children: &mut Vec<CstChild>,
    ) -> bool {
        for (sep, item) in &alt.items {
            if !self.parse_item(*sep, item, in_trivia, pos, children) {
                return false;
            }
        }
        self.parse_slot(alt.trailing, in_trivia, pos, children)
    }

    fn parse_item(
        &mut self,
        sep: Separator,
        item: &Item,
        in_trivia: bool,
        pos: &mut usize,
        children: &mut Vec<CstChild>,
    ) -> bool {
        match item.quantifier {
            Quantifier::One => self.parse_occurrence(sep, item, in_trivia, pos, children),
            Quantifier::Optional => {
                self.try_occurrence(sep, item, in_trivia, pos, children);
                true
            }
            Quantifier::ZeroOrMore | Quantifier::OneOrMore => {
                let mut count = 0;
                loop {
                    let before = *pos;
                    if !self.try_occurrence(sep, item, in_trivia, pos, children) {
                        break;
                    }
                    count += 1;
                    if *pos == before {
                        break;
                    }
                }
                count >= item.quantifier.min()
            }
        }
    }

    /// One occurrence that rolls back position and children on failure.
    fn try_occurrence(
        &mut self,
        sep: Separator,
        item: &Item,
        in_trivia: bool,
        pos: &mut usize,
        children: &mut Vec<CstChild>,
    ) -> bool {
        let saved_pos = *pos;
        let saved_len = children.len();
        if self.parse_occurrence(sep, item, in_trivia, pos, children) {
            true
        } else {
            *pos = saved_pos;
            children.truncate(saved_len);
            false
        }
    }

    /// The item's separator slot followed by one match of its term.
    ///
    /// A suppressed item drops its whole occurrence, slot trivia included.
    fn parse_occurrence(
        &mut self,
        sep: Separator,
        item: &Item,
        in_trivia: bool,
        pos: &mut usize,
        children: &mut Vec<CstChild>,
    ) -> bool {
        let saved_len = children.len();
        if !self.parse_slot(sep, in_trivia, pos, children) {
            return false;
        }
        if !self.parse_term(item, in_trivia, pos, children) {
            return false;
        }
        if item.is_suppressed() {
            children.truncate(saved_len);
        }
        true
    }

    fn parse_slot(
        &mut self,
        sep: Separator,
        in_trivia: bool,
        pos: &mut usize,
        children: &mut Vec<CstChild>,
    ) -> bool {
        if sep == Separator::NoWs {
            return true;
        }
        if in_trivia {
            let rest = &self.source[*pos..];
            let len = rest.len() - rest.trim_start().len();
            if len > 0 {
                children.push(CstChild {
                    label: None,
                    value: CstValue::Span(Span::from_range(*pos..*pos + len)),
                });
                *pos += len;
                return true;
            }
        } else if let Some(trivia) = self.grammar.trivia_rule() {
            self.quiet += 1;
            let matched = self.parse_rule(trivia, *pos, true);
            self.quiet -= 1;
            if let Some(node) = matched {
                if !node.span.is_empty() {
                    *pos = node.span.end as usize;
                    children.push(CstChild {
                        label: None,
                        value: CstValue::Trivia(node),
                    });
                    return true;
                }
            }
        } else {
            return true;
        }
        if sep.is_required() {
            self.expect(*pos, "whitespace");
            return false;
        }
        true
    }

    fn parse_term(
        &mut self,
        item: &Item,
        in_trivia: bool,
        pos: &mut usize,
        children: &mut Vec<CstChild>,
    ) -> bool {
        match &item.term {
            Term::Literal(text) => {
                if self.source[*pos..].starts_with(text.as_str()) {
                    let end = *pos + text.len();
                    push_span(children, item, *pos, end);
                    *pos = end;
                    true
                } else {
                    self.expect(*pos, format!("{text:?}"));
                    false
                }
            }
            Term::Regex(pattern) => match pattern.match_at(self.source, *pos) {
                Some(end) => {
                    push_span(children, item, *pos, end);
                    *pos = end;
                    true
                }
                None => {
                    self.expect(*pos, format!("{pattern:?}"));
                    false
                }
            },
            Term::Rule(id) => match self.parse_rule(*id, *pos, in_trivia) {
                Some(node) => {
                    *pos = node.span.end as usize;
                    children.push(CstChild {
                        label: item.label.clone(),
                        value: CstValue::Node(node),
                    });
                    true
                }
                None => false,
            },
            Term::Group(alternatives) => {
                for alt in alternatives {
                    let saved_pos = *pos;
                    let saved_len = children.len();
                    if self.parse_alternative(alt, in_trivia, pos, children) {
                        return true;
                    }
                    *pos = saved_pos;
                    children.truncate(saved_len);
                }
                false
            }
        }
    }
}

fn push_span(children: &mut Vec<CstChild>, item: &Item, start: usize, end: usize) {
    children.push(CstChild {
        label: item.label.clone(),
        value: CstValue::Span(Span::from_range(start..end)),
    });
}
