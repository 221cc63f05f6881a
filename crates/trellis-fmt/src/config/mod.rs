//! Formatting configuration: separator spacing defaults, anchor-keyed
//! operations and item dispositions, at global and per-rule scope.
//!
//! Operations attach to anchors, positions immediately before or after an
//! item (selected by label or literal text) or at the start or end of a
//! rule. A lookup at an anchor returns the merged view of the global and
//! rule-scoped entries; see [`FormattingConfiguration::anchor_config`].
//!
//! Configurations are usually compiled from the DSL with
//! [`FormattingConfiguration::parse`], but can also be assembled directly.

mod dsl;
mod lexer;

use std::fmt;
use std::str::FromStr;

use rustc_hash::{FxHashMap, FxHashSet};
use trellis_grammar::{Item, Separator};

use crate::doc::Doc;
use crate::error::ConfigError;

/// Which side of the selected element an anchor sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    Before,
    After,
}

/// What an anchor selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectorKind {
    /// Items carrying a grammar label.
    Label,
    /// Literal items with this exact text.
    Literal,
    RuleStart,
    RuleEnd,
}

/// The address of one anchor, `(position, kind, value)`.
///
/// Rule boundary anchors have an empty value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnchorKey {
    pub position: Position,
    pub kind: SelectorKind,
    pub value: String,
}

impl AnchorKey {
    pub fn new(position: Position, kind: SelectorKind, value: impl Into<String>) -> Self {
        Self {
            position,
            kind,
            value: value.into(),
        }
    }

    pub fn label(position: Position, label: impl Into<String>) -> Self {
        Self::new(position, SelectorKind::Label, label)
    }

    pub fn literal(position: Position, text: impl Into<String>) -> Self {
        Self::new(position, SelectorKind::Literal, text)
    }

    pub fn rule_start(position: Position) -> Self {
        Self::new(position, SelectorKind::RuleStart, "")
    }

    pub fn rule_end(position: Position) -> Self {
        Self::new(position, SelectorKind::RuleEnd, "")
    }

    /// The same selector on the other side.
    pub fn at(&self, position: Position) -> Self {
        Self {
            position,
            ..self.clone()
        }
    }
}

impl fmt::Display for AnchorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let position = match self.position {
            Position::Before => "before",
            Position::After => "after",
        };
        let kind = match self.kind {
            SelectorKind::Label => "label",
            SelectorKind::Literal => "literal",
            SelectorKind::RuleStart => "rule_start",
            SelectorKind::RuleEnd => "rule_end",
        };
        write!(f, "{position}:{kind}:{}", self.value)
    }
}

/// A string that is not of the form `<before|after>:<kind>:<value>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidAnchorKey(pub String);

impl fmt::Display for InvalidAnchorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid anchor key `{}`", self.0)
    }
}

impl std::error::Error for InvalidAnchorKey {}

impl FromStr for AnchorKey {
    type Err = InvalidAnchorKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidAnchorKey(s.to_string());
        let mut parts = s.splitn(3, ':');
        let position = match parts.next() {
            Some("before") => Position::Before,
            Some("after") => Position::After,
            _ => return Err(invalid()),
        };
        let kind = match parts.next() {
            Some("label") => SelectorKind::Label,
            Some("literal") => SelectorKind::Literal,
            Some("rule_start") => SelectorKind::RuleStart,
            Some("rule_end") => SelectorKind::RuleEnd,
            _ => return Err(invalid()),
        };
        let value = parts.next().ok_or_else(invalid)?;
        let boundary = matches!(kind, SelectorKind::RuleStart | SelectorKind::RuleEnd);
        if boundary != value.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(position, kind, value))
    }
}

/// One formatting directive attached to an anchor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    Spacing(Doc),
    GroupBegin,
    GroupEnd,
    /// `None` indents by the renderer's unit.
    IndentBegin(Option<u32>),
    IndentEnd,
    /// Open a join with this separator.
    JoinBegin(Doc),
    JoinEnd,
}

impl Operation {
    pub fn is_end(&self) -> bool {
        matches!(
            self,
            Operation::GroupEnd | Operation::IndentEnd | Operation::JoinEnd
        )
    }

    pub fn is_spacing(&self) -> bool {
        matches!(self, Operation::Spacing(_))
    }
}

/// How an item's content is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Disposition {
    #[default]
    Normal,
    Omit,
    RenderAs(Doc),
}

/// Everything configured at one anchor.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnchorConfig {
    pub operations: Vec<Operation>,
    pub disposition: Option<Disposition>,
}

impl AnchorConfig {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty() && self.disposition.is_none()
    }
}

/// Overrides for one rule.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleConfig {
    pub ws_allowed: Option<Doc>,
    pub ws_required: Option<Doc>,
    pub anchors: FxHashMap<AnchorKey, AnchorConfig>,
}

/// Which trivia is reproduced in the output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TriviaPolicy {
    /// Preserve all trivia.
    #[default]
    All,
    /// Preserve trivia containing a child of one of these rules. An empty
    /// set preserves nothing.
    Only(FxHashSet<String>),
}

impl TriviaPolicy {
    pub fn none() -> Self {
        TriviaPolicy::Only(FxHashSet::default())
    }

    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TriviaPolicy::Only(names.into_iter().map(Into::into).collect())
    }

    /// Whether trivia whose child rules are `names` is preserved.
    pub fn preserves<'a>(&self, mut names: impl Iterator<Item = &'a str>) -> bool {
        match self {
            TriviaPolicy::All => true,
            TriviaPolicy::Only(set) => names.any(|name| set.contains(name)),
        }
    }
}

/// Global defaults, per-rule overrides and the anchor table.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattingConfiguration {
    ws_allowed: Doc,
    ws_required: Doc,
    anchors: FxHashMap<AnchorKey, AnchorConfig>,
    rules: FxHashMap<String, RuleConfig>,
    trivia_policy: TriviaPolicy,
    /// Anchors given a second disposition within one scope.
    conflicts: Vec<(Option<String>, AnchorKey)>,
}

impl Default for FormattingConfiguration {
    fn default() -> Self {
        Self {
            ws_allowed: Doc::Empty,
            ws_required: Doc::NbSpace,
            anchors: FxHashMap::default(),
            rules: FxHashMap::default(),
            trivia_policy: TriviaPolicy::All,
            conflicts: Vec::new(),
        }
    }
}

impl FormattingConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a configuration from DSL text.
    #[tracing::instrument(level = "debug", skip_all, fields(len = text.len()))]
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        dsl::parse(text)
    }

    fn rule_mut(&mut self, rule: &str) -> &mut RuleConfig {
        self.rules.entry(rule.to_string()).or_default()
    }

    fn anchors_mut(&mut self, rule: Option<&str>) -> &mut FxHashMap<AnchorKey, AnchorConfig> {
        match rule {
            Some(rule) => &mut self.rule_mut(rule).anchors,
            None => &mut self.anchors,
        }
    }

    pub fn set_ws_allowed(&mut self, rule: Option<&str>, spacing: Doc) {
        match rule {
            Some(rule) => self.rule_mut(rule).ws_allowed = Some(spacing),
            None => self.ws_allowed = spacing,
        }
    }

    pub fn set_ws_required(&mut self, rule: Option<&str>, spacing: Doc) {
        match rule {
            Some(rule) => self.rule_mut(rule).ws_required = Some(spacing),
            None => self.ws_required = spacing,
        }
    }

    /// Attach an operation at `key`.
    ///
    /// End operations are prepended, everything else appended, so directives
    /// that share an anchor close in reverse order of their opening.
    pub fn add_operation(&mut self, rule: Option<&str>, key: AnchorKey, op: Operation) {
        let entry = self.anchors_mut(rule).entry(key).or_default();
        if op.is_end() {
            entry.operations.insert(0, op);
        } else {
            entry.operations.push(op);
        }
    }

    /// Set the disposition at `key`. A second disposition for the same key
    /// in the same scope is kept out and recorded as a conflict.
    pub fn set_disposition(&mut self, rule: Option<&str>, key: AnchorKey, disposition: Disposition) {
        let entry = self.anchors_mut(rule).entry(key.clone()).or_default();
        if entry.disposition.is_some() {
            self.conflicts.push((rule.map(str::to_string), key));
        } else {
            entry.disposition = Some(disposition);
        }
    }

    pub fn set_trivia_policy(&mut self, policy: TriviaPolicy) {
        self.trivia_policy = policy;
    }

    pub fn trivia_policy(&self) -> &TriviaPolicy {
        &self.trivia_policy
    }

    /// Anchors that were given more than one disposition in one scope, in
    /// the order they were found.
    pub fn conflicts(&self) -> &[(Option<String>, AnchorKey)] {
        &self.conflicts
    }

    pub fn rule_config(&self, rule: &str) -> Option<&RuleConfig> {
        self.rules.get(rule)
    }

    /// The default spacing for a separator slot in `rule`.
    pub fn spacing_for_separator(&self, rule: &str, separator: Separator) -> Doc {
        let overrides = self.rules.get(rule);
        match separator {
            Separator::NoWs => Doc::Empty,
            Separator::WsAllowed => overrides
                .and_then(|r| r.ws_allowed.clone())
                .unwrap_or_else(|| self.ws_allowed.clone()),
            Separator::WsRequired => overrides
                .and_then(|r| r.ws_required.clone())
                .unwrap_or_else(|| self.ws_required.clone()),
        }
    }

    /// The merged global and rule-scoped configuration at `key`.
    ///
    /// Rule spacing replaces global spacing entirely. Global begins come
    /// first and global ends last, so global directives always enclose the
    /// rule's own. The rule's disposition wins when present.
    pub fn anchor_config(&self, rule: &str, key: &AnchorKey) -> AnchorConfig {
        let global = self.anchors.get(key);
        let local = self.rules.get(rule).and_then(|r| r.anchors.get(key));
        match (global, local) {
            (None, None) => AnchorConfig::default(),
            (Some(global), None) => global.clone(),
            (None, Some(local)) => local.clone(),
            (Some(global), Some(local)) => {
                let local_spacing = local.operations.iter().any(Operation::is_spacing);
                let keep = |op: &&Operation| !(local_spacing && op.is_spacing());
                let mut operations: Vec<Operation> = global
                    .operations
                    .iter()
                    .filter(keep)
                    .filter(|op| !op.is_end())
                    .cloned()
                    .collect();
                operations.extend(local.operations.iter().cloned());
                operations.extend(global.operations.iter().filter(|op| op.is_end()).cloned());
                AnchorConfig {
                    operations,
                    disposition: local
                        .disposition
                        .clone()
                        .or_else(|| global.disposition.clone()),
                }
            }
        }
    }

    /// The disposition of `item` in `rule`: by label first, then by literal.
    pub fn item_disposition(&self, rule: &str, item: &Item) -> Disposition {
        let by_label = item
            .label
            .as_ref()
            .map(|label| AnchorKey::label(Position::Before, label.as_str()));
        let by_literal = item
            .literal()
            .map(|text| AnchorKey::literal(Position::Before, text));
        by_label
            .into_iter()
            .chain(by_literal)
            .find_map(|key| self.anchor_config(rule, &key).disposition)
            .unwrap_or_default()
    }
}
