//! Stage one of unparsing: walk a CST against the grammar that produced it.
//!
//! The walk follows a rule's alternatives and the node's child list in
//! lock-step and appends to an [`Accumulator`]. Spacing is not decided here:
//! every separator slot becomes a [`Doc::SeparatorSpacing`] carrying either
//! the preserved source trivia or the configured default, and spacing
//! operations become [`Doc::AfterSpacing`] / [`Doc::BeforeSpacing`] nodes.
//! The resolver turns those into concrete whitespace afterwards.
//!
//! A mismatch between grammar and CST is ordinary control flow (`Ok(false)`
//! or `Ok(None)`), used by ordered choice and optional items. Only
//! improperly nested formatting directives abort the walk.

use trellis_grammar::{
    Alternative, CstChild, CstNode, CstValue, Grammar, Item, Quantifier, RuleId, Separator, Term,
};

use crate::accumulator::Accumulator;
use crate::config::{
    AnchorKey, Disposition, FormattingConfiguration, Operation, Position, SelectorKind,
};
use crate::doc::{self, Doc, SeparatorSpacing};
use crate::error::{GenerationError, UnparseError};
use crate::resolve;

/// Whether the CST matched; `Err` only for structural failures.
type Matched = Result<bool, UnparseError>;

/// Turns CSTs of one grammar back into documents under one configuration.
///
/// Construction validates the grammar and configuration together, so every
/// generation error surfaces before any input is seen.
#[derive(Debug, Clone, Copy)]
pub struct Unparser<'a> {
    grammar: &'a Grammar,
    config: &'a FormattingConfiguration,
}

impl<'a> Unparser<'a> {
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn new(
        grammar: &'a Grammar,
        config: &'a FormattingConfiguration,
    ) -> Result<Self, GenerationError> {
        if let Some((rule, anchor)) = config.conflicts().first() {
            return Err(GenerationError::DuplicateDisposition {
                rule: rule.clone(),
                anchor: anchor.clone(),
            });
        }
        for (_, rule) in grammar.rules() {
            for alt in &rule.alternatives {
                check_regenerable(grammar, &rule.name, alt)?;
            }
        }
        tracing::debug!(rules = grammar.rules().count(), "unparser generated");
        Ok(Self { grammar, config })
    }

    pub fn grammar(&self) -> &'a Grammar {
        self.grammar
    }

    pub fn config(&self) -> &'a FormattingConfiguration {
        self.config
    }

    /// The stage-one document for `node`, control nodes and joins included.
    #[tracing::instrument(level = "debug", skip(self, node, source))]
    pub fn unparse_raw(&self, rule: &str, node: &CstNode, source: &str) -> Result<Doc, UnparseError> {
        let id = self
            .grammar
            .rule_id(rule)
            .ok_or_else(|| UnparseError::UnknownRule(rule.to_string()))?;
        let mismatch = || UnparseError::Mismatch {
            rule: rule.to_string(),
        };
        if node.rule != id {
            return Err(mismatch());
        }
        let walk = Walk {
            grammar: self.grammar,
            config: self.config,
            source,
        };
        let acc = walk.rule(id, node, false)?.ok_or_else(mismatch)?;
        Ok(acc.finish()?)
    }

    /// The resolved document for `node`, ready to render.
    pub fn unparse(&self, rule: &str, node: &CstNode, source: &str) -> Result<Doc, UnparseError> {
        let raw = self.unparse_raw(rule, node, source)?;
        Ok(resolve::resolve(raw))
    }
}

fn check_regenerable(grammar: &Grammar, rule: &str, alt: &Alternative) -> Result<(), GenerationError> {
    for (_, item) in &alt.items {
        if item.is_suppressed() && item.quantifier.min() > 0 && !is_regenerable(&item.term) {
            tracing::debug!(rule, "suppressed item cannot be regenerated");
            return Err(GenerationError::NotRegenerable {
                rule: rule.to_string(),
                item: describe_item(grammar, item),
            });
        }
        if let Term::Group(alternatives) = &item.term {
            for nested in alternatives {
                check_regenerable(grammar, rule, nested)?;
            }
        }
    }
    Ok(())
}

/// Whether the text of `term` follows from the grammar alone.
fn is_regenerable(term: &Term) -> bool {
    match term {
        Term::Literal(_) => true,
        Term::Group(alternatives) => alternatives.first().is_some_and(|alt| {
            alt.items
                .iter()
                .filter(|(_, item)| item.quantifier.min() > 0)
                .all(|(_, item)| is_regenerable(&item.term))
        }),
        Term::Rule(_) | Term::Regex(_) => false,
    }
}

fn describe_item(grammar: &Grammar, item: &Item) -> String {
    let term = match &item.term {
        Term::Rule(id) => format!("`{}`", grammar.rule_name(*id)),
        Term::Literal(text) => format!("{text:?}"),
        Term::Regex(pattern) => format!("{pattern:?}"),
        Term::Group(_) => "(...)".to_string(),
    };
    match &item.label {
        Some(label) => format!("{label}={term}"),
        None => term,
    }
}

/// Per-rule walking context.
#[derive(Clone, Copy)]
struct Scope<'c> {
    /// Name used for configuration lookups.
    rule: &'c str,
    children: &'c [CstChild],
    in_trivia: bool,
}

/// One unparse call.
struct Walk<'a> {
    grammar: &'a Grammar,
    config: &'a FormattingConfiguration,
    source: &'a str,
}

impl Walk<'_> {
    /// First alternative of `id` that consumes every child of `node`.
    fn rule(&self, id: RuleId, node: &CstNode, in_trivia: bool) -> Result<Option<Accumulator>, UnparseError> {
        let rule = self.grammar.rule(id);
        let scope = Scope {
            rule: &rule.name,
            children: &node.children,
            in_trivia: in_trivia || rule.is_trivia,
        };
        for (index, alt) in rule.alternatives.iter().enumerate() {
            let mut acc = Accumulator::new();
            let mut pos = 0;
            self.boundary(scope, SelectorKind::RuleStart, &mut acc)?;
            if self.alternative(scope, alt, &mut pos, &mut acc)? && pos == node.children.len() {
                self.boundary(scope, SelectorKind::RuleEnd, &mut acc)?;
                tracing::trace!(rule = %rule.name, alternative = index, "alternative matched");
                return Ok(Some(acc));
            }
        }
        tracing::trace!(rule = %rule.name, "no alternative matched");
        Ok(None)
    }

    fn alternative(&self, scope: Scope<'_>, alt: &Alternative, pos: &mut usize, acc: &mut Accumulator) -> Matched {
        for (sep, item) in &alt.items {
            if !self.item(scope, *sep, item, pos, acc)? {
                return Ok(false);
            }
        }
        self.slot(scope, alt.trailing, pos, acc)
    }

    fn item(
        &self,
        scope: Scope<'_>,
        sep: Separator,
        item: &Item,
        pos: &mut usize,
        acc: &mut Accumulator,
    ) -> Matched {
        if item.is_suppressed() {
            for _ in 0..item.quantifier.min() {
                self.synthesized(scope, sep, item, acc)?;
            }
            return Ok(true);
        }
        match item.quantifier {
            Quantifier::One => self.occurrence(scope, sep, item, pos, acc),
            Quantifier::Optional => {
                self.try_occurrence(scope, sep, item, pos, acc)?;
                Ok(true)
            }
            Quantifier::ZeroOrMore | Quantifier::OneOrMore => {
                let mut count = 0;
                loop {
                    let before = *pos;
                    if !self.try_occurrence(scope, sep, item, pos, acc)? {
                        break;
                    }
                    count += 1;
                    if *pos == before {
                        break;
                    }
                }
                Ok(count >= item.quantifier.min())
            }
        }
    }

    /// One occurrence, committed only if it matches.
    fn try_occurrence(
        &self,
        scope: Scope<'_>,
        sep: Separator,
        item: &Item,
        pos: &mut usize,
        acc: &mut Accumulator,
    ) -> Matched {
        let checkpoint = acc.checkpoint();
        let mut at = *pos;
        if self.occurrence(scope, sep, item, &mut at, acc)? {
            acc.commit(checkpoint);
            *pos = at;
            Ok(true)
        } else {
            acc.rollback(checkpoint);
            Ok(false)
        }
    }

    /// The item's separator slot followed by one match of its term.
    fn occurrence(
        &self,
        scope: Scope<'_>,
        sep: Separator,
        item: &Item,
        pos: &mut usize,
        acc: &mut Accumulator,
    ) -> Matched {
        if !self.slot(scope, sep, pos, acc)? {
            return Ok(false);
        }
        self.emit(scope, item, acc, |acc| self.term(scope, item, pos, acc))
    }

    /// An occurrence of a suppressed item, rebuilt from the grammar.
    fn synthesized(&self, scope: Scope<'_>, sep: Separator, item: &Item, acc: &mut Accumulator) -> Result<(), UnparseError> {
        if sep != Separator::NoWs {
            acc.append_control(self.default_spacing(scope.rule, sep));
        }
        let content = self.regenerate(scope.rule, &item.term);
        self.emit(scope, item, acc, |acc| {
            acc.append_content(content);
            Ok(true)
        })?;
        Ok(())
    }

    fn regenerate(&self, rule: &str, term: &Term) -> Doc {
        match term {
            Term::Literal(text) => doc::text(text.as_str()),
            Term::Group(alternatives) => {
                let mut parts = Vec::new();
                if let Some(alt) = alternatives.first() {
                    for (sep, item) in &alt.items {
                        for _ in 0..item.quantifier.min() {
                            if *sep != Separator::NoWs {
                                parts.push(self.default_spacing(rule, *sep));
                            }
                            parts.push(self.regenerate(rule, &item.term));
                        }
                    }
                }
                doc::seq(parts)
            }
            // Rejected by `Unparser::new`.
            Term::Rule(_) | Term::Regex(_) => Doc::Empty,
        }
    }

    /// Wrap an item's content in its anchor operations and disposition.
    fn emit(
        &self,
        scope: Scope<'_>,
        item: &Item,
        acc: &mut Accumulator,
        content: impl FnOnce(&mut Accumulator) -> Matched,
    ) -> Matched {
        if scope.in_trivia {
            return content(acc);
        }
        let disposition = self.config.item_disposition(scope.rule, item);
        let spacing = disposition == Disposition::Normal;
        let (before, after) = self.item_operations(scope.rule, item);

        apply(&before, Position::Before, spacing, acc)?;
        let matched = match disposition {
            Disposition::Normal => content(acc)?,
            Disposition::Omit => content(&mut Accumulator::new())?,
            Disposition::RenderAs(replacement) => {
                let matched = content(&mut Accumulator::new())?;
                if matched {
                    acc.append_content(replacement);
                }
                matched
            }
        };
        if !matched {
            return Ok(false);
        }
        apply(&after, Position::After, spacing, acc)?;
        Ok(true)
    }

    /// Operations before and after an item, label and literal anchors
    /// nested so the label's enclose the literal's.
    fn item_operations(&self, rule: &str, item: &Item) -> (Vec<Operation>, Vec<Operation>) {
        let lookup = |position: Position, kind: SelectorKind, value: Option<&str>| match value {
            Some(value) => {
                self.config
                    .anchor_config(rule, &AnchorKey::new(position, kind, value))
                    .operations
            }
            None => Vec::new(),
        };
        let label = item.label.as_deref();
        let literal = item.literal();

        let mut before = lookup(Position::Before, SelectorKind::Label, label);
        before.extend(lookup(Position::Before, SelectorKind::Literal, literal));
        let mut after = lookup(Position::After, SelectorKind::Literal, literal);
        after.extend(lookup(Position::After, SelectorKind::Label, label));
        (before, after)
    }

    fn boundary(&self, scope: Scope<'_>, kind: SelectorKind, acc: &mut Accumulator) -> Result<(), UnparseError> {
        if scope.in_trivia {
            return Ok(());
        }
        for position in [Position::Before, Position::After] {
            let config = self
                .config
                .anchor_config(scope.rule, &AnchorKey::new(position, kind, ""));
            apply(&config.operations, position, true, acc)?;
        }
        Ok(())
    }

    fn default_spacing(&self, rule: &str, sep: Separator) -> Doc {
        let spacing = self.config.spacing_for_separator(rule, sep);
        doc::separator_spacing(SeparatorSpacing::with_spacing(spacing, sep.is_required()))
    }

    /// A separator slot: preserved trivia if the policy keeps it, else the
    /// configured default.
    fn slot(&self, scope: Scope<'_>, sep: Separator, pos: &mut usize, acc: &mut Accumulator) -> Matched {
        if sep == Separator::NoWs {
            return Ok(true);
        }
        let child = scope.children.get(*pos);

        if scope.in_trivia {
            // Whitespace inside a trivia rule is matched but not reproduced.
            let whitespace = child.is_some_and(|c| {
                c.label.is_none()
                    && matches!(&c.value, CstValue::Span(span)
                        if span.slice(self.source).is_some_and(|t| !t.is_empty() && t.trim().is_empty()))
            });
            if whitespace {
                *pos += 1;
            } else if sep.is_required() {
                return Ok(false);
            }
            acc.append_control(self.default_spacing(scope.rule, sep));
            return Ok(true);
        }

        if let Some(trivia) = child.and_then(CstChild::as_trivia) {
            *pos += 1;
            if !acc.last_was_trivia() && self.preserves(trivia) {
                let Some(inner) = self.rule(trivia.rule, trivia, true)? else {
                    return Ok(false);
                };
                let preserved = inner.finish()?;
                acc.append_trivia(doc::separator_spacing(SeparatorSpacing::with_trivia(
                    preserved,
                    sep.is_required(),
                )));
                return Ok(true);
            }
        }
        acc.append_control(self.default_spacing(scope.rule, sep));
        Ok(true)
    }

    fn preserves(&self, trivia: &CstNode) -> bool {
        let kinds = trivia.children.iter().filter_map(|child| match &child.value {
            CstValue::Node(node) => Some(self.grammar.rule_name(node.rule)),
            _ => None,
        });
        self.config.trivia_policy().preserves(kinds)
    }

    fn term(&self, scope: Scope<'_>, item: &Item, pos: &mut usize, acc: &mut Accumulator) -> Matched {
        if let Term::Group(alternatives) = &item.term {
            for alt in alternatives {
                let checkpoint = acc.checkpoint();
                let mut at = *pos;
                if self.alternative(scope, alt, &mut at, acc)? {
                    acc.commit(checkpoint);
                    *pos = at;
                    return Ok(true);
                }
                acc.rollback(checkpoint);
            }
            return Ok(false);
        }

        let Some(child) = scope.children.get(*pos) else {
            return Ok(false);
        };
        if child.label.as_deref() != item.label.as_deref() {
            return Ok(false);
        }
        match (&item.term, &child.value) {
            (Term::Rule(id), CstValue::Node(node)) if node.rule == *id => {
                let Some(inner) = self.rule(*id, node, scope.in_trivia)? else {
                    return Ok(false);
                };
                acc.merge(inner)?;
            }
            (Term::Literal(text), CstValue::Span(span)) => {
                if span.slice(self.source) != Some(text.as_str()) {
                    return Ok(false);
                }
                acc.append_content(token(scope, text));
            }
            (Term::Regex(pattern), CstValue::Span(span)) => {
                let Some(text) = span.slice(self.source) else {
                    return Ok(false);
                };
                if pattern.match_at(text, 0) != Some(text.len()) {
                    return Ok(false);
                }
                acc.append_content(token(scope, text));
            }
            _ => return Ok(false),
        }
        *pos += 1;
        Ok(true)
    }
}

/// Source text of a terminal; non-blank text inside trivia is a comment.
fn token(scope: Scope<'_>, text: &str) -> Doc {
    if scope.in_trivia && !text.trim().is_empty() {
        doc::comment(text)
    } else {
        doc::text(text)
    }
}

/// Execute anchor operations. Spacing operations are skipped when
/// `spacing` is false.
fn apply(ops: &[Operation], position: Position, spacing: bool, acc: &mut Accumulator) -> Result<(), UnparseError> {
    for op in ops {
        match op {
            Operation::Spacing(doc) => {
                if spacing {
                    acc.append_control(match position {
                        Position::Before => doc::before_spacing(doc.clone()),
                        Position::After => doc::after_spacing(doc.clone()),
                    });
                }
            }
            Operation::GroupBegin => acc.open_group(),
            Operation::GroupEnd => acc.close_group()?,
            Operation::IndentBegin(amount) => acc.open_indent(*amount),
            Operation::IndentEnd => acc.close_indent()?,
            Operation::JoinBegin(separator) => acc.open_join(separator.clone()),
            Operation::JoinEnd => acc.close_join()?,
        }
    }
    Ok(())
}
