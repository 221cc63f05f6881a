//! Grammar object model.
//!
//! A [`Grammar`] is a table of rules. Each rule is an ordered list of
//! alternatives; each alternative is a sequence of items, and every item is
//! preceded by a separator slot that states the whitespace contract between
//! it and whatever came before. Rule references are resolved to [`RuleId`]s
//! and regex terms are compiled once, when the grammar is built, so both the
//! parser and the unparser work from a fully checked table.
//!
//! Grammars are assembled with [`GrammarBuilder`] and the item/alternative
//! constructors in this module:
//!
//! ```
//! use trellis_grammar::grammar::{lit, regex, rule_ref, group, seq, GrammarBuilder};
//!
//! let grammar = GrammarBuilder::new()
//!     .rule("expr", [seq()
//!         .then(rule_ref("term"))
//!         .ws(group([seq().then(lit("+").label("operator")).ws(rule_ref("term"))]).many())])
//!     .rule("term", [seq().then(regex("[0-9]+"))])
//!     .trivia_rule("_", [seq().then(regex(r"\s+"))])
//!     .build()
//!     .unwrap();
//! assert!(grammar.rule_id("expr").is_some());
//! ```

use std::fmt;

use regex::Regex;
use rustc_hash::FxHashMap;

use crate::error::GrammarError;

/// Index of a rule inside its [`Grammar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(u32);

impl RuleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The whitespace contract of a separator slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Separator {
    /// No whitespace may appear here.
    NoWs,
    /// Whitespace may appear here.
    WsAllowed,
    /// Whitespace must appear here.
    WsRequired,
}

impl Separator {
    pub fn is_required(self) -> bool {
        self == Separator::WsRequired
    }
}

/// How many times an item may occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    One,
    /// `?`
    Optional,
    /// `*`
    ZeroOrMore,
    /// `+`
    OneOrMore,
}

impl Quantifier {
    /// The smallest number of occurrences this quantifier accepts.
    pub fn min(self) -> usize {
        match self {
            Quantifier::One | Quantifier::OneOrMore => 1,
            Quantifier::Optional | Quantifier::ZeroOrMore => 0,
        }
    }

    /// Whether more than one occurrence may be matched.
    pub fn repeats(self) -> bool {
        matches!(self, Quantifier::ZeroOrMore | Quantifier::OneOrMore)
    }
}

/// Whether a matched item leaves a child in the CST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CstDisposition {
    #[default]
    Include,
    /// Matched by the parser but absent from the CST.
    Suppress,
}

/// A compiled regex term, anchored at the position it is matched from.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    fn compile(source: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{source})"))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// The pattern as written in the grammar.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match at byte offset `pos` of `input`, returning the end offset.
    pub fn match_at(&self, input: &str, pos: usize) -> Option<usize> {
        let rest = input.get(pos..)?;
        self.regex.find(rest).map(|m| pos + m.end())
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.source)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// What an item matches.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// A reference to another rule.
    Rule(RuleId),
    /// Exact literal text.
    Literal(String),
    /// A regex-matched span of source text.
    Regex(Pattern),
    /// Parenthesized nested alternatives.
    Group(Vec<Alternative>),
}

/// One element of an alternative.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub label: Option<String>,
    pub term: Term,
    pub quantifier: Quantifier,
    pub disposition: CstDisposition,
}

impl Item {
    /// The literal text of a literal item.
    pub fn literal(&self) -> Option<&str> {
        match &self.term {
            Term::Literal(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_suppressed(&self) -> bool {
        self.disposition == CstDisposition::Suppress
    }
}

/// A sequence of items, each preceded by its separator slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    pub items: Vec<(Separator, Item)>,
    /// Slot after the last item.
    pub trailing: Separator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: String,
    pub alternatives: Vec<Alternative>,
    /// Set on the grammar's trivia rule.
    pub is_trivia: bool,
}

/// A fully resolved grammar.
#[derive(Debug, Clone)]
pub struct Grammar {
    rules: Vec<Rule>,
    by_name: FxHashMap<String, RuleId>,
    trivia: Option<RuleId>,
}

impl Grammar {
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.index()]
    }

    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.by_name.get(name).copied()
    }

    pub fn rule_name(&self, id: RuleId) -> &str {
        &self.rules[id.index()].name
    }

    /// The rule matched at whitespace-permitting separator slots, if any.
    pub fn trivia_rule(&self) -> Option<RuleId> {
        self.trivia
    }

    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules
            .iter()
            .enumerate()
            .map(|(i, rule)| (RuleId(i as u32), rule))
    }
}

// ── Builder ─────────────────────────────────────────────────────────────

/// An unresolved term, as written through the builder API.
#[derive(Debug, Clone)]
enum TermDef {
    Rule(String),
    Literal(String),
    Regex(String),
    Group(Vec<AltDef>),
}

/// An item under construction. See [`rule_ref`], [`lit`], [`regex`] and [`group`].
#[derive(Debug, Clone)]
pub struct ItemDef {
    label: Option<String>,
    term: TermDef,
    quantifier: Quantifier,
    disposition: CstDisposition,
}

impl ItemDef {
    fn new(term: TermDef) -> Self {
        Self {
            label: None,
            term,
            quantifier: Quantifier::One,
            disposition: CstDisposition::Include,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// `?`
    pub fn optional(mut self) -> Self {
        self.quantifier = Quantifier::Optional;
        self
    }

    /// `*`
    pub fn many(mut self) -> Self {
        self.quantifier = Quantifier::ZeroOrMore;
        self
    }

    /// `+`
    pub fn some(mut self) -> Self {
        self.quantifier = Quantifier::OneOrMore;
        self
    }

    /// Match the item but leave it out of the CST.
    pub fn suppress(mut self) -> Self {
        self.disposition = CstDisposition::Suppress;
        self
    }
}

/// A reference to the rule called `name`.
pub fn rule_ref(name: impl Into<String>) -> ItemDef {
    ItemDef::new(TermDef::Rule(name.into()))
}

/// Exact literal text.
pub fn lit(text: impl Into<String>) -> ItemDef {
    ItemDef::new(TermDef::Literal(text.into()))
}

/// A span matched by a regex.
pub fn regex(pattern: impl Into<String>) -> ItemDef {
    ItemDef::new(TermDef::Regex(pattern.into()))
}

/// Nested alternatives.
pub fn group(alternatives: impl IntoIterator<Item = AltDef>) -> ItemDef {
    ItemDef::new(TermDef::Group(alternatives.into_iter().collect()))
}

/// An alternative under construction.
#[derive(Debug, Clone)]
pub struct AltDef {
    items: Vec<(Separator, ItemDef)>,
    trailing: Separator,
}

/// Start an empty alternative.
pub fn seq() -> AltDef {
    AltDef {
        items: Vec::new(),
        trailing: Separator::NoWs,
    }
}

impl AltDef {
    /// Append an item with no whitespace before it.
    pub fn then(self, item: ItemDef) -> Self {
        self.sep(Separator::NoWs, item)
    }

    /// Append an item that may be preceded by whitespace.
    pub fn ws(self, item: ItemDef) -> Self {
        self.sep(Separator::WsAllowed, item)
    }

    /// Append an item that must be preceded by whitespace.
    pub fn req(self, item: ItemDef) -> Self {
        self.sep(Separator::WsRequired, item)
    }

    pub fn sep(mut self, separator: Separator, item: ItemDef) -> Self {
        self.items.push((separator, item));
        self
    }

    /// Set the slot after the last item.
    pub fn trailing(mut self, separator: Separator) -> Self {
        self.trailing = separator;
        self
    }
}

struct RuleDef {
    name: String,
    alternatives: Vec<AltDef>,
}

/// Collects rule definitions and resolves them into a [`Grammar`].
#[derive(Default)]
pub struct GrammarBuilder {
    rules: Vec<RuleDef>,
    trivia: Option<String>,
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, name: impl Into<String>, alternatives: impl IntoIterator<Item = AltDef>) -> Self {
        self.rules.push(RuleDef {
            name: name.into(),
            alternatives: alternatives.into_iter().collect(),
        });
        self
    }

    /// Define a rule and make it the grammar's trivia rule.
    pub fn trivia_rule(
        mut self,
        name: impl Into<String>,
        alternatives: impl IntoIterator<Item = AltDef>,
    ) -> Self {
        let name = name.into();
        self.trivia = Some(name.clone());
        self.rule(name, alternatives)
    }

    /// Mark an already defined (or later defined) rule as the trivia rule.
    pub fn trivia(mut self, name: impl Into<String>) -> Self {
        self.trivia = Some(name.into());
        self
    }

    pub fn build(self) -> Result<Grammar, GrammarError> {
        let mut by_name = FxHashMap::default();
        for (i, def) in self.rules.iter().enumerate() {
            if by_name.insert(def.name.clone(), RuleId(i as u32)).is_some() {
                return Err(GrammarError::DuplicateRule(def.name.clone()));
            }
        }

        let trivia = match &self.trivia {
            Some(name) => Some(
                *by_name
                    .get(name)
                    .ok_or_else(|| GrammarError::UnknownTriviaRule(name.clone()))?,
            ),
            None => None,
        };

        let mut rules = Vec::with_capacity(self.rules.len());
        for (i, def) in self.rules.iter().enumerate() {
            if def.alternatives.is_empty() {
                return Err(GrammarError::EmptyRule(def.name.clone()));
            }
            let resolver = Resolver {
                by_name: &by_name,
                rule: &def.name,
            };
            let alternatives = def
                .alternatives
                .iter()
                .map(|alt| resolver.alternative(alt))
                .collect::<Result<Vec<_>, _>>()?;
            rules.push(Rule {
                name: def.name.clone(),
                alternatives,
                is_trivia: trivia == Some(RuleId(i as u32)),
            });
        }

        tracing::debug!(rules = rules.len(), "grammar built");
        Ok(Grammar {
            rules,
            by_name,
            trivia,
        })
    }
}

/// Resolves one rule's definitions against the name table.
struct Resolver<'a> {
    by_name: &'a FxHashMap<String, RuleId>,
    rule: &'a str,
}

impl Resolver<'_> {
    fn alternative(&self, def: &AltDef) -> Result<Alternative, GrammarError> {
        let items = def
            .items
            .iter()
            .map(|(sep, item)| Ok((*sep, self.item(item)?)))
            .collect::<Result<Vec<_>, GrammarError>>()?;
        Ok(Alternative {
            items,
            trailing: def.trailing,
        })
    }

    fn item(&self, def: &ItemDef) -> Result<Item, GrammarError> {
        let term = match &def.term {
            TermDef::Rule(name) => Term::Rule(*self.by_name.get(name).ok_or_else(|| {
                GrammarError::UnknownRule {
                    rule: self.rule.to_string(),
                    reference: name.clone(),
                }
            })?),
            TermDef::Literal(text) => Term::Literal(text.clone()),
            TermDef::Regex(source) => {
                Term::Regex(Pattern::compile(source).map_err(|e| GrammarError::InvalidRegex {
                    rule: self.rule.to_string(),
                    pattern: source.clone(),
                    message: e.to_string(),
                })?)
            }
            TermDef::Group(alts) => {
                if alts.is_empty() {
                    return Err(GrammarError::EmptyRule(self.rule.to_string()));
                }
                Term::Group(
                    alts.iter()
                        .map(|alt| self.alternative(alt))
                        .collect::<Result<Vec<_>, _>>()?,
                )
            }
        };
        Ok(Item {
            label: def.label.clone(),
            term,
            quantifier: def.quantifier,
            disposition: def.disposition,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arithmetic() -> Grammar {
        GrammarBuilder::new()
            .rule(
                "expr",
                [seq()
                    .then(rule_ref("term"))
                    .ws(group([seq().then(lit("+").label("operator")).ws(rule_ref("term"))]).many())],
            )
            .rule("term", [seq().then(regex("[0-9]+"))])
            .trivia_rule("_", [seq().then(regex(r"\s+"))])
            .build()
            .unwrap()
    }

    #[test]
    fn rule_references_are_resolved() {
        let grammar = arithmetic();
        let expr = grammar.rule(grammar.rule_id("expr").unwrap());
        let (sep, first) = &expr.alternatives[0].items[0];
        assert_eq!(*sep, Separator::NoWs);
        assert_eq!(first.term, Term::Rule(grammar.rule_id("term").unwrap()));
    }

    #[test]
    fn trivia_rule_is_marked() {
        let grammar = arithmetic();
        let trivia = grammar.trivia_rule().unwrap();
        assert_eq!(grammar.rule_name(trivia), "_");
        assert!(grammar.rule(trivia).is_trivia);
        assert!(!grammar.rule(grammar.rule_id("expr").unwrap()).is_trivia);
    }

    #[test]
    fn unknown_reference_is_an_error() {
        let err = GrammarBuilder::new()
            .rule("a", [seq().then(rule_ref("b"))])
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            GrammarError::UnknownRule {
                rule: "a".into(),
                reference: "b".into()
            }
        );
    }

    #[test]
    fn duplicate_rule_is_an_error() {
        let err = GrammarBuilder::new()
            .rule("a", [seq().then(lit("x"))])
            .rule("a", [seq().then(lit("y"))])
            .build()
            .unwrap_err();
        assert_eq!(err, GrammarError::DuplicateRule("a".into()));
    }

    #[test]
    fn invalid_regex_is_an_error() {
        let err = GrammarBuilder::new()
            .rule("a", [seq().then(regex("[0-9"))])
            .build()
            .unwrap_err();
        assert!(matches!(err, GrammarError::InvalidRegex { ref pattern, .. } if pattern == "[0-9"));
    }

    #[test]
    fn pattern_matches_only_at_position() {
        let pattern = Pattern::compile("[a-z]+").unwrap();
        assert_eq!(pattern.match_at("12abc3", 2), Some(5));
        assert_eq!(pattern.match_at("12abc3", 0), None);
        assert_eq!(pattern.match_at("abc", 10), None);
    }

    #[test]
    fn quantifier_minimums() {
        assert_eq!(Quantifier::One.min(), 1);
        assert_eq!(Quantifier::OneOrMore.min(), 1);
        assert_eq!(Quantifier::Optional.min(), 0);
        assert_eq!(Quantifier::ZeroOrMore.min(), 0);
        assert!(Quantifier::ZeroOrMore.repeats());
        assert!(!Quantifier::Optional.repeats());
    }
}
