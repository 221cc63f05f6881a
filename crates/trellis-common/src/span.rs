use std::ops::Range;

/// Longest source text a [`Span`] can address.
///
/// Offsets are stored as `u32`. Entry points that build spans over a whole
/// input (`trellis_grammar::parse`, the configuration lexer) reject longer
/// sources up front.
pub const MAX_SOURCE_LEN: usize = u32::MAX as usize;

/// Byte-offset span into source text. Start is inclusive, end is exclusive.
///
/// CST spans, grammar errors and configuration errors all point into their
/// source as byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Create a new span from byte offsets.
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "span start ({start}) must be <= end ({end})");
        Self { start, end }
    }

    /// Create a span from `usize` offsets, or `None` if either offset is
    /// beyond [`MAX_SOURCE_LEN`].
    pub fn try_from_range(range: Range<usize>) -> Option<Self> {
        let start = u32::try_from(range.start).ok()?;
        let end = u32::try_from(range.end).ok()?;
        Some(Self::new(start, end))
    }

    /// Create a span from `usize` offsets, as produced by `str` APIs.
    ///
    /// Offsets beyond [`MAX_SOURCE_LEN`] saturate; callers check the source
    /// length before building spans into it.
    pub fn from_range(range: Range<usize>) -> Self {
        let clamp = |offset: usize| u32::try_from(offset).unwrap_or(u32::MAX);
        Self::new(clamp(range.start), clamp(range.end))
    }

    /// An empty span at `offset`.
    pub fn empty_at(offset: u32) -> Self {
        Self::new(offset, offset)
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Whether the span is empty (zero-length).
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The span as a `usize` range, for slicing and for diagnostics.
    pub fn range(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }

    /// The text this span covers in `source`.
    ///
    /// Returns `None` if the span lies outside `source` or splits a
    /// UTF-8 character.
    pub fn slice<'s>(&self, source: &'s str) -> Option<&'s str> {
        source.get(self.range())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_new_and_len() {
        let span = Span::new(5, 10);
        assert_eq!(span.start, 5);
        assert_eq!(span.end, 10);
        assert_eq!(span.len(), 5);
        assert!(!span.is_empty());
    }

    #[test]
    fn span_slice_extracts_source_text() {
        let source = "let x = 42";
        assert_eq!(Span::new(4, 5).slice(source), Some("x"));
        assert_eq!(Span::from_range(8..10).slice(source), Some("42"));
        assert_eq!(Span::new(8, 40).slice(source), None);
    }

    #[test]
    fn span_empty_at() {
        let span = Span::empty_at(7);
        assert!(span.is_empty());
        assert_eq!(span.range(), 7..7);
    }

    #[test]
    fn offsets_within_u32_convert() {
        assert_eq!(Span::try_from_range(3..9), Some(Span::new(3, 9)));
        assert_eq!(Span::from_range(0..MAX_SOURCE_LEN), Span::new(0, u32::MAX));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn offsets_past_u32_are_rejected() {
        let too_far = MAX_SOURCE_LEN + 1;
        assert_eq!(Span::try_from_range(0..too_far), None);
        assert_eq!(Span::try_from_range(too_far..too_far), None);
        assert_eq!(Span::from_range(0..too_far), Span::new(0, u32::MAX));
    }
}
