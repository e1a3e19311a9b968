//! Source location spans.

use std::fmt;

/// Source location of a node.
///
/// The parser fills in the line and the byte range it consumed. Nodes built
/// programmatically (tests, reflected calls) use [`Span::DUMMY`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    /// 1-based source line, 0 when unknown.
    pub line: u32,
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Span for generated nodes.
    pub const DUMMY: Span = Span {
        line: 0,
        start: 0,
        end: 0,
    };

    #[inline]
    pub const fn new(line: u32, start: u32, end: u32) -> Self {
        Span { line, start, end }
    }

    /// Whether this span points at real source.
    #[inline]
    pub const fn is_known(&self) -> bool {
        self.line != 0
    }

    /// Merge two spans into one covering both.
    #[inline]
    #[must_use]
    pub fn merge(self, other: Span) -> Span {
        Span {
            line: if self.line == 0 { other.line } else { self.line.min(other.line.max(1)) },
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}..{}", self.line, self.start, self.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_known() {
            write!(f, "line {}", self.line)
        } else {
            write!(f, "<generated>")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Span::new(12, 0, 4).to_string(), "line 12");
        assert_eq!(Span::DUMMY.to_string(), "<generated>");
    }

    #[test]
    fn test_merge_keeps_known_line() {
        let merged = Span::DUMMY.merge(Span::new(3, 10, 20));
        assert_eq!(merged.line, 3);
        assert_eq!(merged.start, 0);
        assert_eq!(merged.end, 20);
    }
}
