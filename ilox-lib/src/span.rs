//! This module provides the [`Span`], [`WithSpan`], and [`LineOffsets`] types.

use std::{cmp, fmt, hash::Hash, ops::Deref};

/// A section of source code, measured as byte indices into the source.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct Span {
    /// The index of the start of the span.
    pub start: usize,

    /// The index of the end of the span (inclusive).
    pub end: usize,
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if cfg!(debug_assertions) {
            f.debug_struct("Span")
                .field("start", &self.start)
                .field("end", &self.end)
                .finish()
        } else {
            write!(f, "")
        }
    }
}

impl Span {
    /// Join two spans.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            start: cmp::min(self.start, other.start),
            end: cmp::max(self.end, other.end),
        }
    }

    /// Join this span with another one in-place.
    pub fn mut_union(&mut self, other: &Self) {
        *self = self.union(other);
    }
}

/// Wrap a value with a [`Span`].
pub struct WithSpan<T> {
    /// The span of the value.
    pub span: Span,

    /// The value itself.
    pub value: T,
}

impl<T: Clone> Clone for WithSpan<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            span: self.span,
        }
    }
}

impl<T: Copy> Copy for WithSpan<T> {}

impl<T: fmt::Debug> fmt::Debug for WithSpan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if cfg!(debug_assertions) {
            f.debug_struct("WithSpan")
                .field("value", &self.value)
                .field("span", &self.span)
                .finish()
        } else {
            write!(f, "{:?}", self.value)
        }
    }
}

impl<T: PartialEq> PartialEq for WithSpan<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.span == other.span
    }
}

impl<T: Eq> Eq for WithSpan<T> {}

impl<T: Hash> Hash for WithSpan<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.span.hash(state);
        self.value.hash(state);
    }
}

impl<T> From<WithSpan<T>> for Span {
    fn from(value: WithSpan<T>) -> Self {
        value.span
    }
}

impl<T> From<&WithSpan<T>> for Span {
    fn from(value: &WithSpan<T>) -> Self {
        value.span
    }
}

impl<T> Deref for WithSpan<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

/// A set of line offsets for getting line and column numbers from [`Span`]s.
pub struct LineOffsets {
    /// The byte indices of the first character of each line.
    offsets: Box<[usize]>,

    /// The total length of the source in bytes.
    len: usize,
}

impl LineOffsets {
    /// Create a new set of line offsets.
    pub fn new(data: &str) -> Self {
        let mut offsets = vec![0];

        for (idx, c) in data.char_indices() {
            if c == '\n' {
                offsets.push(idx + 1);
            }
        }

        Self {
            offsets: offsets.into(),
            len: data.len(),
        }
    }

    /// Get the 1-based line and column numbers for the given byte offset.
    pub fn line_and_col(&self, offset: usize) -> (usize, usize) {
        assert!(
            offset <= self.len,
            "Span offset must be within length of source code: offset={offset}"
        );

        let (line, line_start) = match self.offsets.binary_search(&offset) {
            Ok(line_idx) => (line_idx + 1, self.offsets[line_idx]),
            Err(line_idx) => (line_idx, self.offsets[line_idx.saturating_sub(1)]),
        };

        (line, offset - line_start + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_and_col() {
        let offsets = LineOffsets::new("var a = 1;\nprint a;\n");

        assert_eq!(offsets.line_and_col(0), (1, 1));
        assert_eq!(offsets.line_and_col(4), (1, 5));
        assert_eq!(offsets.line_and_col(11), (2, 1));
        assert_eq!(offsets.line_and_col(17), (2, 7));
    }

    #[test]
    fn multi_line_strings() {
        let offsets = LineOffsets::new("var s = \"one\ntwo\";\nprint s;");

        // The token after a multi-line string lands on the right line.
        assert_eq!(offsets.line_and_col(19), (3, 1));
    }
}
