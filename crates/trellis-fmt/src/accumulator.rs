//! Builder for the raw document of one unparse walk.
//!
//! The accumulator appends fragments to the innermost open frame. Opening a
//! group, indent or join pushes a frame; closing it wraps everything
//! appended since the matching open into the corresponding [`Doc`] and
//! appends that to the parent frame. Frames must close in stack order.
//!
//! Each frame also remembers whether its last fragment was trivia, so the
//! walker never places preserved trivia directly after preserved trivia.
//!
//! While a [`Checkpoint`] is open every change is journaled, so a failed
//! speculative match is undone in time proportional to what it appended
//! rather than to the size of the whole document.

use crate::doc::{self, Doc};
use crate::error::{FrameName, StructuralError};

#[derive(Debug, Clone, PartialEq)]
enum FrameKind {
    Root,
    Group,
    Indent(Option<u32>),
    Join(Doc),
}

impl FrameKind {
    fn name(&self) -> Option<FrameName> {
        match self {
            FrameKind::Root => None,
            FrameKind::Group => Some(FrameName::Group),
            FrameKind::Indent(_) => Some(FrameName::Indent),
            FrameKind::Join(_) => Some(FrameName::Join),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Frame {
    kind: FrameKind,
    content: Vec<Doc>,
    last_trivia: bool,
}

impl Frame {
    fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            content: Vec::new(),
            last_trivia: false,
        }
    }
}

/// Inverse of one change, replayed by [`Accumulator::rollback`].
#[derive(Debug, Clone, PartialEq)]
enum Undo {
    /// One fragment was pushed onto the top frame.
    Pushed { last_trivia: bool },
    /// The top frame's content grew from `len`.
    Extended { len: usize, last_trivia: bool },
    /// A frame was opened.
    Opened,
    /// `frame` was closed and its wrapped form pushed onto the new top.
    Closed { frame: Frame, last_trivia: bool },
}

/// A position in an accumulator's history to roll back to.
#[derive(Debug)]
#[must_use = "a checkpoint must be committed or rolled back"]
pub struct Checkpoint {
    mark: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator {
    /// `frames[0]` is the root frame and is never popped.
    frames: Vec<Frame>,
    journal: Vec<Undo>,
    /// Checkpoints taken and not yet committed or rolled back.
    open_checkpoints: usize,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::new(FrameKind::Root)],
            journal: Vec::new(),
            open_checkpoints: 0,
        }
    }

    /// Start journaling changes so they can be undone.
    pub fn checkpoint(&mut self) -> Checkpoint {
        self.open_checkpoints += 1;
        Checkpoint {
            mark: self.journal.len(),
        }
    }

    /// Keep everything appended since `checkpoint`.
    pub fn commit(&mut self, checkpoint: Checkpoint) {
        debug_assert!(checkpoint.mark <= self.journal.len());
        self.release();
    }

    /// Undo everything appended, opened or closed since `checkpoint`.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        while self.journal.len() > checkpoint.mark {
            let Some(undo) = self.journal.pop() else {
                break;
            };
            match undo {
                Undo::Pushed { last_trivia } => {
                    let top = self.top();
                    top.content.pop();
                    top.last_trivia = last_trivia;
                }
                Undo::Extended { len, last_trivia } => {
                    let top = self.top();
                    top.content.truncate(len);
                    top.last_trivia = last_trivia;
                }
                Undo::Opened => {
                    self.frames.pop();
                }
                Undo::Closed { frame, last_trivia } => {
                    let top = self.top();
                    top.content.pop();
                    top.last_trivia = last_trivia;
                    self.frames.push(frame);
                }
            }
        }
        self.release();
    }

    fn release(&mut self) {
        self.open_checkpoints = self.open_checkpoints.saturating_sub(1);
        if self.open_checkpoints == 0 {
            self.journal.clear();
        }
    }

    fn record(&mut self, undo: Undo) {
        if self.open_checkpoints > 0 {
            self.journal.push(undo);
        }
    }

    fn record_push(&mut self) {
        if self.open_checkpoints > 0 {
            let last_trivia = self.last_was_trivia();
            self.journal.push(Undo::Pushed { last_trivia });
        }
    }

    fn top(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Whether the most recently appended fragment was trivia.
    pub fn last_was_trivia(&self) -> bool {
        self.frames.last().is_some_and(|f| f.last_trivia)
    }

    /// Whether every opened frame has been closed.
    pub fn is_closed(&self) -> bool {
        self.frames.len() == 1
    }

    /// Whether nothing has been appended at all.
    pub fn is_empty(&self) -> bool {
        self.is_closed() && self.frames[0].content.is_empty()
    }

    pub fn append_content(&mut self, doc: Doc) {
        self.record_push();
        let top = self.top();
        top.content.push(doc);
        top.last_trivia = false;
    }

    pub fn append_trivia(&mut self, doc: Doc) {
        self.record_push();
        let top = self.top();
        top.content.push(doc);
        top.last_trivia = true;
    }

    /// Append a spacing control node. The trivia flag is left as is.
    pub fn append_control(&mut self, doc: Doc) {
        self.record_push();
        self.top().content.push(doc);
    }

    /// Splice a fully closed accumulator's content into this one.
    ///
    /// The trivia flag follows `other` unless `other` is empty.
    pub fn merge(&mut self, other: Accumulator) -> Result<(), StructuralError> {
        if let Some(open) = other.frames.last().and_then(|f| f.kind.name()) {
            return Err(StructuralError::Unclosed(open));
        }
        let Some(root) = other.frames.into_iter().next() else {
            return Ok(());
        };
        if root.content.is_empty() {
            return Ok(());
        }
        if self.open_checkpoints > 0 {
            let top = self.top();
            let undo = Undo::Extended {
                len: top.content.len(),
                last_trivia: top.last_trivia,
            };
            self.journal.push(undo);
        }
        let top = self.top();
        top.content.extend(root.content);
        top.last_trivia = root.last_trivia;
        Ok(())
    }

    pub fn open_group(&mut self) {
        self.record(Undo::Opened);
        self.frames.push(Frame::new(FrameKind::Group));
    }

    pub fn close_group(&mut self) -> Result<(), StructuralError> {
        let frame = self.pop(FrameName::Group)?;
        self.push_closed(doc::group(doc::seq(frame.content)), frame.last_trivia);
        Ok(())
    }

    pub fn open_indent(&mut self, amount: Option<u32>) {
        self.record(Undo::Opened);
        self.frames.push(Frame::new(FrameKind::Indent(amount)));
    }

    pub fn close_indent(&mut self) -> Result<(), StructuralError> {
        let frame = self.pop(FrameName::Indent)?;
        let FrameKind::Indent(amount) = frame.kind else {
            unreachable!("pop checked the frame kind");
        };
        let body = Box::new(doc::seq(frame.content));
        self.push_closed(Doc::Indent(body, amount), frame.last_trivia);
        Ok(())
    }

    pub fn open_join(&mut self, separator: Doc) {
        self.record(Undo::Opened);
        self.frames.push(Frame::new(FrameKind::Join(separator)));
    }

    pub fn close_join(&mut self) -> Result<(), StructuralError> {
        let frame = self.pop(FrameName::Join)?;
        let FrameKind::Join(separator) = frame.kind else {
            unreachable!("pop checked the frame kind");
        };
        let items = doc::seq(frame.content).into_items();
        self.push_closed(Doc::JoinList(items, Box::new(separator)), frame.last_trivia);
        Ok(())
    }

    /// The accumulated document. Fails if a frame is still open.
    pub fn finish(mut self) -> Result<Doc, StructuralError> {
        if let Some(open) = self.frames.last().and_then(|f| f.kind.name()) {
            return Err(StructuralError::Unclosed(open));
        }
        let root = self.frames.swap_remove(0);
        Ok(doc::seq(root.content))
    }

    fn pop(&mut self, closing: FrameName) -> Result<Frame, StructuralError> {
        let open = self.frames.last().and_then(|f| f.kind.name());
        match self.frames.pop() {
            Some(frame) if open == Some(closing) => {
                if self.open_checkpoints > 0 {
                    let last_trivia = self.last_was_trivia();
                    self.journal.push(Undo::Closed {
                        frame: frame.clone(),
                        last_trivia,
                    });
                }
                Ok(frame)
            }
            popped => {
                self.frames.extend(popped);
                Err(StructuralError::Mismatched { closing, open })
            }
        }
    }

    fn push_closed(&mut self, wrapped: Doc, last_trivia: bool) {
        let top = self.top();
        top.content.push(wrapped);
        top.last_trivia = last_trivia;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::{group, indent_by, text};
    use pretty_assertions::assert_eq;

    #[test]
    fn nested_frames_compose_into_one_tree() {
        let mut acc = Accumulator::new();
        acc.append_content(text("a"));
        acc.open_group();
        acc.append_content(text("b"));
        acc.open_indent(Some(2));
        acc.append_content(text("c"));
        acc.close_indent().unwrap();
        acc.close_group().unwrap();
        assert_eq!(
            acc.finish().unwrap(),
            Doc::Seq(vec![
                text("a"),
                group(Doc::Seq(vec![text("b"), indent_by(text("c"), 2)])),
            ])
        );
    }

    #[test]
    fn closing_the_wrong_kind_is_structural() {
        let mut acc = Accumulator::new();
        acc.open_group();
        acc.open_indent(None);
        assert_eq!(
            acc.close_group(),
            Err(StructuralError::Mismatched {
                closing: FrameName::Group,
                open: Some(FrameName::Indent),
            })
        );
    }

    #[test]
    fn closing_without_open_is_structural() {
        let mut acc = Accumulator::new();
        assert_eq!(
            acc.close_join(),
            Err(StructuralError::Mismatched {
                closing: FrameName::Join,
                open: None,
            })
        );
    }

    #[test]
    fn finish_with_open_frame_fails() {
        let mut acc = Accumulator::new();
        acc.open_join(Doc::NbSpace);
        assert_eq!(acc.finish(), Err(StructuralError::Unclosed(FrameName::Join)));
    }

    #[test]
    fn close_join_builds_list_form() {
        let mut acc = Accumulator::new();
        acc.open_join(text(","));
        acc.append_content(text("x"));
        acc.close_join().unwrap();
        acc.open_join(text(","));
        acc.append_content(text("y"));
        acc.append_content(text("z"));
        acc.close_join().unwrap();
        assert_eq!(
            acc.finish().unwrap(),
            Doc::Seq(vec![
                Doc::JoinList(vec![text("x")], Box::new(text(","))),
                Doc::JoinList(vec![text("y"), text("z")], Box::new(text(","))),
            ])
        );
    }

    #[test]
    fn trivia_flag_tracks_last_fragment() {
        let mut acc = Accumulator::new();
        assert!(!acc.last_was_trivia());
        acc.append_trivia(text(" "));
        assert!(acc.last_was_trivia());
        acc.append_content(text("x"));
        assert!(!acc.last_was_trivia());
        acc.append_trivia(text(" "));
        acc.append_control(Doc::SeparatorSpacing(Default::default()));
        assert!(acc.last_was_trivia());
    }

    #[test]
    fn closing_a_frame_carries_its_trivia_flag_out() {
        let mut acc = Accumulator::new();
        acc.open_group();
        acc.append_trivia(text(" "));
        acc.close_group().unwrap();
        assert!(acc.last_was_trivia());
    }

    #[test]
    fn merge_keeps_flag_unless_other_is_empty() {
        let mut acc = Accumulator::new();
        acc.append_trivia(text(" "));
        acc.merge(Accumulator::new()).unwrap();
        assert!(acc.last_was_trivia());

        let mut other = Accumulator::new();
        other.append_content(text("b"));
        acc.merge(other).unwrap();
        assert!(!acc.last_was_trivia());
        assert_eq!(acc.finish().unwrap(), Doc::Seq(vec![text(" "), text("b")]));
    }

    #[test]
    fn merge_rejects_open_accumulator() {
        let mut other = Accumulator::new();
        other.open_group();
        assert_eq!(
            Accumulator::new().merge(other),
            Err(StructuralError::Unclosed(FrameName::Group))
        );
    }

    #[test]
    fn rollback_undoes_appends_and_frames() {
        let mut acc = Accumulator::new();
        acc.append_content(text("a"));
        acc.open_group();
        acc.append_trivia(text(" "));
        let before = acc.clone();

        let checkpoint = acc.checkpoint();
        acc.append_content(text("b"));
        acc.close_group().unwrap();
        acc.open_indent(None);
        let mut inner = Accumulator::new();
        inner.append_content(text("c"));
        acc.merge(inner).unwrap();
        acc.rollback(checkpoint);

        assert_eq!(acc, before);
        assert!(acc.last_was_trivia());
        acc.close_group().unwrap();
        assert_eq!(
            acc.finish().unwrap(),
            Doc::Seq(vec![text("a"), group(text(" "))])
        );
    }

    #[test]
    fn inner_commit_is_undone_by_outer_rollback() {
        let mut acc = Accumulator::new();
        acc.append_content(text("a"));
        let outer = acc.checkpoint();
        acc.append_content(text("b"));
        let inner = acc.checkpoint();
        acc.append_content(text("c"));
        acc.commit(inner);
        acc.rollback(outer);
        assert_eq!(acc.finish().unwrap(), text("a"));
    }

    #[test]
    fn committed_changes_survive() {
        let mut acc = Accumulator::new();
        let checkpoint = acc.checkpoint();
        acc.open_group();
        acc.append_content(text("x"));
        acc.commit(checkpoint);
        acc.close_group().unwrap();
        assert_eq!(acc.finish().unwrap(), group(text("x")));
    }
}
