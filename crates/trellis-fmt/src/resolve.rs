//! Stage two of unparsing: collapse control nodes into concrete spacing.
//!
//! Resolution runs in four passes over the raw document:
//!
//! 1. **Join expansion** replaces every [`Doc::JoinList`] with a sequence in
//!    which a trivia-carrying separator node is inserted once into each gap
//!    between two content items.
//! 2. **Boundary extraction** moves control nodes at the edges of groups and
//!    indents out of them, so they meet the control nodes just outside.
//! 3. **Pattern resolution** rewrites each flat list, innermost first, with
//!    the local rules below until no control node remains. Rules never look
//!    past a content node, so each run of adjacent control nodes (with the
//!    `"\n"` text in front of it, for rule e) is rewritten on its own and the
//!    list is rebuilt in a single pass.
//! 4. **Break sinking** moves a line break that ended up directly in front
//!    of an indent back inside it.
//!
//! The rewrite rules, highest priority first:
//!
//! | rule | pattern                  | result                                     |
//! |------|--------------------------|--------------------------------------------|
//! | a    | `B B` / `A A` / `S S`    | one node; trivia beats spacing             |
//! | b    | `A S B`                  | trivia, else `merge(a, b)`                 |
//! | c    | `A S`                    | trivia, else the after-spacing             |
//! | d    | `S B`                    | trivia, else the before-spacing            |
//! | e    | `"\n" S`                 | hard break                                 |
//! | f    | `S`                      | trivia, else spacing                       |
//! | g    | `A` / `B`                | dropped                                    |
//!
//! where `A`, `B` and `S` are after-, before- and separator-spacing nodes.

use crate::doc::{self, Doc, SeparatorSpacing};

/// Resolve a raw document into a final one.
#[tracing::instrument(level = "trace", skip_all)]
pub fn resolve(doc: Doc) -> Doc {
    let expanded = expand_joins(doc);
    let Extracted {
        mut leading,
        body,
        trailing,
    } = extract(expanded);
    leading.extend(body.into_items());
    leading.extend(trailing);
    sink_breaks(resolve_list(leading))
}

// ── Spacing strength ────────────────────────────────────────────────────

/// Total order of the whitespace variants. Other documents are unranked.
fn strength(doc: &Doc) -> Option<(u8, u32)> {
    match doc {
        Doc::Empty => Some((0, 0)),
        Doc::SoftBreak => Some((1, 0)),
        Doc::NbSpace => Some((2, 0)),
        Doc::OptSpace => Some((3, 0)),
        Doc::HardBreak(n) => Some((4, *n)),
        _ => None,
    }
}

/// The stronger of two spacings.
///
/// Hard breaks beat optional spaces, which beat non-breaking spaces, which
/// beat soft breaks; between hard breaks the one with more blank lines
/// wins. A custom document beats any whitespace, and between two custom
/// documents, or two equal ones, the first is kept.
pub fn merge_spacing(a: Doc, b: Doc) -> Doc {
    match (strength(&a), strength(&b)) {
        (Some(sa), Some(sb)) if sb > sa => b,
        (Some(_), None) => b,
        _ => a,
    }
}

fn merge_optional(a: Option<Box<Doc>>, b: Option<Box<Doc>>) -> Option<Box<Doc>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(Box::new(merge_spacing(*a, *b))),
        (a, b) => a.or(b),
    }
}

// ── Pass 1: join expansion ──────────────────────────────────────────────

fn expand_joins(doc: Doc) -> Doc {
    match doc {
        Doc::JoinList(items, separator) => {
            let items = items.into_iter().map(expand_joins).collect();
            interleave(items, *separator)
        }
        Doc::Group(inner) => doc::group(expand_joins(*inner)),
        Doc::Indent(inner, amount) => Doc::Indent(Box::new(expand_joins(*inner)), amount),
        Doc::Seq(items) => doc::seq(items.into_iter().map(expand_joins)),
        other => other,
    }
}

/// Insert the join separator once into every gap between content items.
///
/// Inside a gap the separator goes right after the first separator slot,
/// where it collapses with it; a gap without a slot gets it after its
/// leading after-spacing run.
fn interleave(items: Vec<Doc>, separator: Doc) -> Doc {
    let mut out = Vec::with_capacity(items.len() * 2);
    let mut gap: Vec<Doc> = Vec::new();
    let mut seen_content = false;
    for item in items {
        if item == Doc::Empty {
            continue;
        }
        if item.is_control() {
            gap.push(item);
            continue;
        }
        if seen_content {
            let at = match gap.iter().position(|d| matches!(d, Doc::SeparatorSpacing(_))) {
                Some(index) => index + 1,
                None => gap
                    .iter()
                    .position(|d| !matches!(d, Doc::AfterSpacing(_)))
                    .unwrap_or(gap.len()),
            };
            let joint = SeparatorSpacing::with_trivia(separator.clone(), false);
            gap.insert(at, doc::separator_spacing(joint));
        }
        out.append(&mut gap);
        out.push(item);
        seen_content = true;
    }
    out.append(&mut gap);
    doc::seq(out)
}

// ── Pass 2: boundary extraction ─────────────────────────────────────────

struct Extracted {
    leading: Vec<Doc>,
    body: Doc,
    trailing: Vec<Doc>,
}

fn is_leading(doc: &Doc) -> bool {
    matches!(doc, Doc::BeforeSpacing(_) | Doc::SeparatorSpacing(_))
}

fn is_trailing(doc: &Doc) -> bool {
    matches!(doc, Doc::AfterSpacing(_) | Doc::SeparatorSpacing(_))
}

fn extract(doc: Doc) -> Extracted {
    match doc {
        Doc::Group(inner) => {
            let Extracted {
                leading,
                body,
                trailing,
            } = extract(*inner);
            Extracted {
                leading,
                body: doc::group(body),
                trailing,
            }
        }
        Doc::Indent(inner, amount) => {
            let Extracted {
                leading,
                body,
                trailing,
            } = extract(*inner);
            Extracted {
                leading,
                body: Doc::Indent(Box::new(body), amount),
                trailing,
            }
        }
        Doc::Seq(items) => {
            let mut flat = Vec::with_capacity(items.len());
            for item in items {
                let Extracted {
                    leading,
                    body,
                    trailing,
                } = extract(item);
                flat.extend(leading);
                if body != Doc::Empty {
                    flat.push(body);
                }
                flat.extend(trailing);
            }
            let start = flat.iter().take_while(|d| is_leading(d)).count();
            let mut rest = flat.split_off(start);
            let end = rest.len() - rest.iter().rev().take_while(|d| is_trailing(d)).count();
            let trailing = rest.split_off(end);
            Extracted {
                leading: flat,
                body: doc::seq(rest),
                trailing,
            }
        }
        control if is_leading(&control) => Extracted {
            leading: vec![control],
            body: Doc::Empty,
            trailing: Vec::new(),
        },
        control @ Doc::AfterSpacing(_) => Extracted {
            leading: Vec::new(),
            body: Doc::Empty,
            trailing: vec![control],
        },
        other => Extracted {
            leading: Vec::new(),
            body: other,
            trailing: Vec::new(),
        },
    }
}

// ── Pass 3: pattern resolution ──────────────────────────────────────────

/// An element of the working list. Settled elements are finished output
/// that no rewrite rule looks into.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Doc(Doc),
    Settled(Doc),
}

impl Cell {
    fn after(&self) -> Option<&Doc> {
        match self {
            Cell::Doc(Doc::AfterSpacing(spacing)) => Some(spacing),
            _ => None,
        }
    }

    fn before(&self) -> Option<&Doc> {
        match self {
            Cell::Doc(Doc::BeforeSpacing(spacing)) => Some(spacing),
            _ => None,
        }
    }

    fn separator(&self) -> Option<&SeparatorSpacing> {
        match self {
            Cell::Doc(Doc::SeparatorSpacing(sep)) => Some(sep),
            _ => None,
        }
    }

    fn is_control(&self) -> bool {
        matches!(self, Cell::Doc(doc) if doc.is_control())
    }

    fn is_newline(&self) -> bool {
        matches!(self, Cell::Doc(Doc::Text(text)) if text == "\n")
    }

    fn into_doc(self) -> Doc {
        match self {
            Cell::Doc(doc) | Cell::Settled(doc) => doc,
        }
    }
}

fn resolve_list(items: Vec<Doc>) -> Doc {
    let cells: Vec<Cell> = items
        .into_iter()
        .map(|item| match item {
            Doc::Group(inner) => Cell::Doc(doc::group(resolve_list(inner.into_items()))),
            Doc::Indent(inner, amount) => {
                Cell::Doc(Doc::Indent(Box::new(resolve_list(inner.into_items())), amount))
            }
            Doc::Seq(inner) => Cell::Doc(resolve_list(inner)),
            other => Cell::Doc(other),
        })
        .collect();
    let mut out: Vec<Cell> = Vec::with_capacity(cells.len());
    let mut run: Vec<Cell> = Vec::new();
    for cell in cells {
        if cell.is_control() {
            if run.is_empty() && out.last().is_some_and(Cell::is_newline) {
                run.extend(out.pop());
            }
            run.push(cell);
            continue;
        }
        flush_run(&mut run, &mut out);
        out.push(cell);
    }
    flush_run(&mut run, &mut out);
    doc::seq(out.into_iter().map(Cell::into_doc))
}

/// Rewrite one run of control nodes to a fixed point and move it to `out`.
fn flush_run(run: &mut Vec<Cell>, out: &mut Vec<Cell>) {
    if run.is_empty() {
        return;
    }
    while rewrite(run) {}
    out.append(run);
}

/// Apply the highest-priority rule that matches anywhere in the run.
/// Returns whether anything changed.
fn rewrite(cells: &mut Vec<Cell>) -> bool {
    let rules: [(&str, fn(&mut Vec<Cell>, usize) -> bool); 7] = [
        ("collapse", collapse),
        ("after-separator-before", after_separator_before),
        ("after-separator", after_separator),
        ("separator-before", separator_before),
        ("newline-separator", newline_separator),
        ("separator", lone_separator),
        ("boundary", lone_boundary),
    ];
    for (name, rule) in rules {
        for index in 0..cells.len() {
            if rule(cells, index) {
                tracing::trace!(rule = name, index, "rewrite applied");
                return true;
            }
        }
    }
    false
}

/// The spacing a separator decides on by itself, with the `required` guard.
fn guarded(result: Doc, sep: &SeparatorSpacing) -> Doc {
    if sep.required && result == Doc::Empty {
        sep.spacing
            .as_deref()
            .filter(|spacing| **spacing != Doc::Empty)
            .cloned()
            .unwrap_or(Doc::NbSpace)
    } else {
        result
    }
}

fn settle(cells: &mut Vec<Cell>, range: std::ops::Range<usize>, result: Option<Doc>) {
    let replacement = result.map(|doc| Cell::Settled(resolve(doc)));
    cells.splice(range, replacement);
}

/// Rule (a): adjacent nodes of one kind.
fn collapse(cells: &mut Vec<Cell>, i: usize) -> bool {
    let Some(next) = cells.get(i + 1) else {
        return false;
    };
    let merged = match (&cells[i], next) {
        (Cell::Doc(Doc::BeforeSpacing(a)), Cell::Doc(Doc::BeforeSpacing(b))) => {
            doc::before_spacing(merge_spacing((**a).clone(), (**b).clone()))
        }
        (Cell::Doc(Doc::AfterSpacing(a)), Cell::Doc(Doc::AfterSpacing(b))) => {
            doc::after_spacing(merge_spacing((**a).clone(), (**b).clone()))
        }
        (Cell::Doc(Doc::SeparatorSpacing(a)), Cell::Doc(Doc::SeparatorSpacing(b))) => {
            match (a.has_trivia(), b.has_trivia()) {
                // Adjacent trivia stays as it is.
                (true, true) => return false,
                (true, false) => doc::separator_spacing(SeparatorSpacing {
                    required: a.required || b.required,
                    ..a.clone()
                }),
                (false, true) => doc::separator_spacing(SeparatorSpacing {
                    required: a.required || b.required,
                    ..b.clone()
                }),
                (false, false) => doc::separator_spacing(SeparatorSpacing {
                    spacing: merge_optional(a.spacing.clone(), b.spacing.clone()),
                    preserved_trivia: None,
                    required: a.required || b.required,
                }),
            }
        }
        _ => return false,
    };
    cells.splice(i..i + 2, [Cell::Doc(merged)]);
    true
}

/// Rule (b).
fn after_separator_before(cells: &mut Vec<Cell>, i: usize) -> bool {
    let (Some(after), Some(sep), Some(before)) = (
        cells.get(i).and_then(Cell::after),
        cells.get(i + 1).and_then(Cell::separator),
        cells.get(i + 2).and_then(Cell::before),
    ) else {
        return false;
    };
    let result = match &sep.preserved_trivia {
        Some(trivia) => (**trivia).clone(),
        None => guarded(merge_spacing(after.clone(), before.clone()), sep),
    };
    settle(cells, i..i + 3, Some(result));
    true
}

/// Rules (c) and (d) share this shape: a boundary spacing next to a slot.
fn boundary_with_separator(boundary: &Doc, sep: &SeparatorSpacing) -> Option<Doc> {
    match &sep.preserved_trivia {
        Some(trivia) => Some((**trivia).clone()),
        None if sep.spacing.is_some() || sep.required => Some(guarded(boundary.clone(), sep)),
        None => None,
    }
}

/// Rule (c).
fn after_separator(cells: &mut Vec<Cell>, i: usize) -> bool {
    let (Some(after), Some(sep)) = (
        cells.get(i).and_then(Cell::after),
        cells.get(i + 1).and_then(Cell::separator),
    ) else {
        return false;
    };
    let result = boundary_with_separator(after, sep);
    settle(cells, i..i + 2, result);
    true
}

/// Rule (d).
fn separator_before(cells: &mut Vec<Cell>, i: usize) -> bool {
    let (Some(sep), Some(before)) = (
        cells.get(i).and_then(Cell::separator),
        cells.get(i + 1).and_then(Cell::before),
    ) else {
        return false;
    };
    let result = boundary_with_separator(before, sep);
    settle(cells, i..i + 2, result);
    true
}

/// Rule (e).
fn newline_separator(cells: &mut Vec<Cell>, i: usize) -> bool {
    let newline = matches!(&cells[i], Cell::Doc(Doc::Text(text)) if text == "\n");
    let spaced = cells
        .get(i + 1)
        .and_then(Cell::separator)
        .is_some_and(|sep| sep.spacing.is_some() && !sep.has_trivia());
    if !(newline && spaced) {
        return false;
    }
    cells.splice(i..i + 2, [Cell::Settled(doc::hardline())]);
    true
}

/// Rule (f).
fn lone_separator(cells: &mut Vec<Cell>, i: usize) -> bool {
    let Some(sep) = cells[i].separator() else {
        return false;
    };
    let result = match (&sep.preserved_trivia, &sep.spacing) {
        (Some(trivia), _) => Some((**trivia).clone()),
        (None, Some(spacing)) => Some(guarded((**spacing).clone(), sep)),
        (None, None) if sep.required => Some(Doc::NbSpace),
        (None, None) => None,
    };
    settle(cells, i..i + 1, result);
    true
}

/// Rule (g).
fn lone_boundary(cells: &mut Vec<Cell>, i: usize) -> bool {
    if cells[i].after().is_none() && cells[i].before().is_none() {
        return false;
    }
    cells.remove(i);
    true
}

// ── Pass 4: break sinking ───────────────────────────────────────────────

fn sink_breaks(doc: Doc) -> Doc {
    match doc {
        Doc::Group(inner) => doc::group(sink_breaks(*inner)),
        Doc::Indent(inner, amount) => Doc::Indent(Box::new(sink_breaks(*inner)), amount),
        Doc::Seq(items) => {
            let mut out: Vec<Doc> = Vec::with_capacity(items.len());
            for item in items.into_iter().map(sink_breaks) {
                match item {
                    Doc::Indent(inner, amount) if out.last().is_some_and(Doc::is_line_break) => {
                        let brk = out.pop().unwrap_or(Doc::Empty);
                        out.push(Doc::Indent(Box::new(doc::seq([brk, *inner])), amount));
                    }
                    other => out.push(other),
                }
            }
            doc::seq(out)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::{after_spacing, before_spacing, comment, group, indent, join, separator_spacing, text};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn sep(spacing: Doc) -> Doc {
        separator_spacing(SeparatorSpacing::with_spacing(spacing, false))
    }

    fn trivia(doc: Doc) -> Doc {
        separator_spacing(SeparatorSpacing::with_trivia(doc, false))
    }

    fn spacing() -> impl Strategy<Value = Doc> {
        prop_oneof![
            Just(Doc::Empty),
            Just(Doc::SoftBreak),
            Just(Doc::NbSpace),
            Just(Doc::OptSpace),
            (0u32..4).prop_map(Doc::HardBreak),
        ]
    }

    proptest! {
        #[test]
        fn merge_is_idempotent(s in spacing()) {
            prop_assert_eq!(merge_spacing(s.clone(), s.clone()), s);
        }

        #[test]
        fn merge_is_commutative_on_whitespace(a in spacing(), b in spacing()) {
            prop_assert_eq!(merge_spacing(a.clone(), b.clone()), merge_spacing(b, a));
        }

        #[test]
        fn before_runs_collapse(run in prop::collection::vec(spacing(), 1..6)) {
            let expected = run.iter().cloned().reduce(merge_spacing).unwrap();
            let mut items = vec![text("a"), sep(Doc::Empty)];
            items.extend(run.into_iter().map(before_spacing));
            items.push(text("b"));
            prop_assert_eq!(resolve(Doc::Seq(items)), doc::seq([text("a"), expected, text("b")]));
        }

        #[test]
        fn after_runs_collapse(run in prop::collection::vec(spacing(), 1..6)) {
            let expected = run.iter().cloned().reduce(merge_spacing).unwrap();
            let mut items = vec![text("a")];
            items.extend(run.into_iter().map(after_spacing));
            items.push(sep(Doc::Empty));
            items.push(text("b"));
            prop_assert_eq!(resolve(Doc::Seq(items)), doc::seq([text("a"), expected, text("b")]));
        }

        #[test]
        fn trivia_beats_boundary_spacing(a in spacing(), b in spacing(), s in spacing()) {
            let raw = Doc::Seq(vec![
                text("x"),
                after_spacing(a),
                sep(s),
                trivia(comment("/* c */")),
                before_spacing(b),
                text("y"),
            ]);
            prop_assert_eq!(
                resolve(raw),
                Doc::Seq(vec![text("x"), comment("/* c */"), text("y")])
            );
        }
    }

    #[test]
    fn merge_order() {
        assert_eq!(merge_spacing(Doc::HardBreak(2), Doc::HardBreak(1)), Doc::HardBreak(2));
        assert_eq!(merge_spacing(Doc::HardBreak(0), Doc::HardBreak(1)), Doc::HardBreak(1));
        assert_eq!(merge_spacing(Doc::NbSpace, Doc::OptSpace), Doc::OptSpace);
        assert_eq!(merge_spacing(Doc::SoftBreak, Doc::NbSpace), Doc::NbSpace);
        assert_eq!(merge_spacing(Doc::Empty, Doc::SoftBreak), Doc::SoftBreak);
        assert_eq!(merge_spacing(Doc::OptSpace, Doc::HardBreak(0)), Doc::HardBreak(0));
        assert_eq!(merge_spacing(Doc::HardBreak(3), text(";")), text(";"));
        assert_eq!(merge_spacing(text(","), text(";")), text(","));
    }

    #[test]
    fn after_separator_before_merges() {
        let raw = Doc::Seq(vec![
            text("a"),
            after_spacing(Doc::NbSpace),
            sep(Doc::Empty),
            before_spacing(Doc::HardBreak(0)),
            text("b"),
        ]);
        assert_eq!(resolve(raw), Doc::Seq(vec![text("a"), Doc::HardBreak(0), text("b")]));
    }

    #[test]
    fn after_spacing_replaces_separator_default() {
        let raw = Doc::Seq(vec![text("a"), after_spacing(Doc::NbSpace), sep(Doc::OptSpace), text("b")]);
        assert_eq!(resolve(raw), Doc::Seq(vec![text("a"), Doc::NbSpace, text("b")]));
    }

    #[test]
    fn vacuous_separator_drops_boundary() {
        let raw = Doc::Seq(vec![
            text("a"),
            after_spacing(Doc::NbSpace),
            separator_spacing(SeparatorSpacing::default()),
            text("b"),
        ]);
        assert_eq!(resolve(raw), Doc::Seq(vec![text("a"), text("b")]));
    }

    #[test]
    fn required_separator_never_resolves_to_nothing() {
        let required = separator_spacing(SeparatorSpacing::with_spacing(Doc::Empty, true));
        let raw = Doc::Seq(vec![text("let"), after_spacing(Doc::Empty), required, text("x")]);
        assert_eq!(resolve(raw), Doc::Seq(vec![text("let"), Doc::NbSpace, text("x")]));
    }

    #[test]
    fn lone_boundary_spacing_is_dropped() {
        let raw = Doc::Seq(vec![text("a"), after_spacing(Doc::HardBreak(0)), text("b")]);
        assert_eq!(resolve(raw), Doc::Seq(vec![text("a"), text("b")]));
    }

    #[test]
    fn separators_collapse_with_trivia_priority() {
        let raw = Doc::Seq(vec![text("a"), sep(Doc::NbSpace), trivia(text("  ")), sep(Doc::HardBreak(0)), text("b")]);
        assert_eq!(resolve(raw), Doc::Seq(vec![text("a"), text("  "), text("b")]));

        let raw = Doc::Seq(vec![text("a"), sep(Doc::NbSpace), sep(Doc::SoftBreak), text("b")]);
        assert_eq!(resolve(raw), Doc::Seq(vec![text("a"), Doc::NbSpace, text("b")]));
    }

    #[test]
    fn adjacent_trivia_is_kept() {
        let raw = Doc::Seq(vec![text("a"), trivia(text(" ")), trivia(comment("#c")), text("b")]);
        assert_eq!(
            resolve(raw),
            Doc::Seq(vec![text("a"), text(" "), comment("#c"), text("b")])
        );
    }

    #[test]
    fn newline_text_before_separator_is_a_hard_break() {
        let raw = Doc::Seq(vec![text("a"), text("\n"), sep(Doc::NbSpace), text("b")]);
        assert_eq!(resolve(raw), Doc::Seq(vec![text("a"), Doc::HardBreak(0), text("b")]));
    }

    #[test]
    fn preserved_newline_is_not_rewritten() {
        let raw = Doc::Seq(vec![text("a"), trivia(text("\n")), sep(Doc::NbSpace), text("b")]);
        assert_eq!(resolve(raw), Doc::Seq(vec![text("a"), text("\n"), text("b")]));
    }

    #[test]
    fn boundaries_leave_groups() {
        // The after-spacing at the end of the group meets the slot outside it.
        let raw = Doc::Seq(vec![
            group(Doc::Seq(vec![text("a"), after_spacing(Doc::OptSpace)])),
            sep(Doc::Empty),
            text("b"),
        ]);
        assert_eq!(
            resolve(raw),
            Doc::Seq(vec![group(text("a")), Doc::OptSpace, text("b")])
        );
    }

    #[test]
    fn nested_control_nodes_resolve_in_place() {
        let raw = group(Doc::Seq(vec![text("a"), sep(Doc::SoftBreak), text("b")]));
        assert_eq!(resolve(raw), group(Doc::Seq(vec![text("a"), Doc::SoftBreak, text("b")])));
    }

    #[test]
    fn break_before_indent_sinks_into_it() {
        let raw = Doc::Seq(vec![
            text("{"),
            after_spacing(Doc::HardBreak(0)),
            indent(Doc::Seq(vec![sep(Doc::Empty), text("x")])),
            sep(Doc::HardBreak(0)),
            text("}"),
        ]);
        assert_eq!(
            resolve(raw),
            Doc::Seq(vec![
                text("{"),
                indent(Doc::Seq(vec![Doc::HardBreak(0), text("x")])),
                Doc::HardBreak(0),
                text("}"),
            ])
        );
    }

    #[test]
    fn join_separator_goes_into_each_gap_once() {
        let raw = join(
            Doc::HardBreak(0),
            vec![text("abc"), sep(Doc::Empty), text(","), sep(Doc::Empty), text("def")],
        );
        assert_eq!(
            resolve(raw),
            Doc::Seq(vec![
                text("abc"),
                Doc::HardBreak(0),
                text(","),
                Doc::HardBreak(0),
                text("def"),
            ])
        );
    }

    #[test]
    fn join_without_slots_separates_items() {
        let raw = join(text(", "), vec![text("a"), text("b"), text("c")]);
        assert_eq!(
            resolve(raw),
            Doc::Seq(vec![text("a"), text(", "), text("b"), text(", "), text("c")])
        );
    }

    #[test]
    fn resolved_documents_are_final() {
        let raw = Doc::Seq(vec![
            before_spacing(Doc::NbSpace),
            group(Doc::Seq(vec![
                sep(Doc::OptSpace),
                join(Doc::SoftBreak, vec![text("a"), after_spacing(Doc::NbSpace), text("b")]),
            ])),
            after_spacing(Doc::NbSpace),
        ]);
        assert!(resolve(raw).is_final());
    }

    #[test]
    fn long_lists_resolve_each_gap_independently() {
        let count = 20_000;
        let mut raw = Vec::with_capacity(count * 4);
        let mut expected = Vec::with_capacity(count * 2);
        for index in 0..count {
            if index > 0 {
                raw.push(after_spacing(Doc::NbSpace));
                raw.push(sep(Doc::Empty));
                raw.push(before_spacing(Doc::HardBreak(0)));
                expected.push(Doc::HardBreak(0));
            }
            raw.push(text("x"));
            expected.push(text("x"));
        }
        assert_eq!(resolve(Doc::Seq(raw)), Doc::Seq(expected));
    }

    #[test]
    fn newline_rule_sees_the_text_in_front_of_a_run() {
        let raw = Doc::Seq(vec![
            text("a"),
            text("\n"),
            sep(Doc::NbSpace),
            sep(Doc::Empty),
            text("b"),
            text("\n"),
            after_spacing(Doc::NbSpace),
            text("c"),
        ]);
        assert_eq!(
            resolve(raw),
            Doc::Seq(vec![
                text("a"),
                Doc::HardBreak(0),
                text("b"),
                text("\n"),
                text("c"),
            ])
        );
    }
}
