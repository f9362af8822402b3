//! Rewritable text that remembers where it came from
//!
//! Expansion rewrites template text many times over: variables, loop
//! bindings, spliced block output, each placeholder pass. Every rewrite goes
//! through [`MappedText`], so a placeholder found in rewritten text can still
//! be reported against the template the user wrote.

use std::ops::Range;

use crate::parser::ast::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Piece {
    /// Byte range in the mapped text
    range: Range<usize>,
    /// Source range the piece stands for
    origin: Span,
    /// Byte-for-byte copy of its origin
    verbatim: bool,
}

/// A string plus, for every byte, the source range it was produced from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedText {
    text: String,
    /// Contiguous, in order, covering all of `text`
    pieces: Vec<Piece>,
}

impl MappedText {
    /// Source text, mapped onto itself
    pub fn new(source: &str) -> Self {
        let mut text = Self::default();
        text.push_piece(source, 0..source.len(), true);
        text
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Append text produced in place of the source range `origin`
    pub fn push_generated(&mut self, text: &str, origin: Span) {
        self.push_piece(text, origin, false);
    }

    /// Append part of another mapped text, keeping its origins
    pub fn push_slice(&mut self, other: &MappedText, range: Range<usize>) {
        for piece in &other.pieces {
            let start = piece.range.start.max(range.start);
            let end = piece.range.end.min(range.end);
            if start >= end {
                continue;
            }
            let origin = if piece.verbatim {
                let from = piece.origin.start + (start - piece.range.start);
                from..from + (end - start)
            } else {
                piece.origin.clone()
            };
            self.push_piece(&other.text[start..end], origin, piece.verbatim);
        }
    }

    pub fn append(&mut self, other: &MappedText) {
        self.push_slice(other, 0..other.len());
    }

    pub fn slice(&self, range: Range<usize>) -> MappedText {
        let mut out = MappedText::default();
        out.push_slice(self, range);
        out
    }

    /// Replace `range` with another mapped text
    pub fn splice(&self, range: Range<usize>, replacement: &MappedText) -> MappedText {
        let mut out = self.slice(0..range.start);
        out.append(replacement);
        out.push_slice(self, range.end..self.len());
        out
    }

    /// Replace non-overlapping ranges given in ascending order
    pub fn replace_ranges<I>(&self, edits: I) -> MappedText
    where
        I: IntoIterator<Item = (Range<usize>, String)>,
    {
        let mut out = MappedText::default();
        let mut cursor = 0;
        for (range, replacement) in edits {
            out.push_slice(self, cursor..range.start);
            out.push_generated(&replacement, self.origin(range.clone()));
            cursor = range.end;
        }
        out.push_slice(self, cursor..self.len());
        out
    }

    /// Replace every occurrence of `pattern`, left to right
    pub fn replace_all(&self, pattern: &str, replacement: &str) -> MappedText {
        let edits: Vec<_> = self
            .text
            .match_indices(pattern)
            .map(|(i, _)| (i..i + pattern.len(), replacement.to_string()))
            .collect();
        if edits.is_empty() {
            return self.clone();
        }
        self.replace_ranges(edits)
    }

    /// Source range behind a range of this text
    pub fn origin(&self, range: Range<usize>) -> Span {
        let start = self.map_start(range.start);
        if range.end <= range.start {
            return start..start;
        }
        start..self.map_end(range.end).max(start)
    }

    fn map_start(&self, pos: usize) -> usize {
        let i = self.pieces.partition_point(|p| p.range.end <= pos);
        match self.pieces.get(i) {
            Some(p) if p.verbatim => p.origin.start + (pos - p.range.start),
            Some(p) => p.origin.start,
            None => self.pieces.last().map_or(0, |p| p.origin.end),
        }
    }

    fn map_end(&self, pos: usize) -> usize {
        let i = self.pieces.partition_point(|p| p.range.end < pos);
        match self.pieces.get(i) {
            Some(p) if p.verbatim => p.origin.start + (pos - p.range.start),
            Some(p) => p.origin.end,
            None => self.pieces.last().map_or(0, |p| p.origin.end),
        }
    }

    fn push_piece(&mut self, text: &str, origin: Span, verbatim: bool) {
        if text.is_empty() {
            return;
        }
        let start = self.text.len();
        self.text.push_str(text);
        let end = self.text.len();

        if let Some(last) = self.pieces.last_mut() {
            if verbatim && last.verbatim && last.origin.end == origin.start {
                last.range.end = end;
                last.origin.end = origin.end;
                return;
            }
        }
        self.pieces.push(Piece {
            range: start..end,
            origin,
            verbatim,
        });
    }
}
