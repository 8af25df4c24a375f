/// A single textual change reported by the external formatter.
///
/// Offsets address the *original* content the formatter was given, never an
/// intermediate state. A list of replacements for one document is sorted by
/// ascending `offset` and free of overlapping ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// Starting byte offset into the original content (inclusive)
    pub offset: usize,
    /// Number of bytes removed starting at `offset`
    pub length: usize,
    /// Text inserted at `offset` after removal (empty means pure deletion)
    pub text: String,
}

impl Replacement {
    pub fn new(offset: usize, length: usize, text: impl Into<String>) -> Self {
        Self {
            offset,
            length,
            text: text.into(),
        }
    }

    /// Exclusive end of the replaced range, saturating at `usize::MAX` so
    /// an impossible range is rejected by the buffer instead of wrapping.
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.length)
    }

    /// True when nothing is removed, only `text` is inserted.
    pub fn is_insertion(&self) -> bool {
        self.length == 0
    }

    /// True when a non-empty range is removed and nothing is put back.
    pub fn is_deletion(&self) -> bool {
        self.length > 0 && self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_has_zero_length() {
        let r = Replacement::new(5, 0, "X");
        assert!(r.is_insertion());
        assert!(!r.is_deletion());
        assert_eq!(r.end(), 5);
    }

    #[test]
    fn test_deletion_has_empty_text() {
        let r = Replacement::new(2, 3, "");
        assert!(r.is_deletion());
        assert!(!r.is_insertion());
        assert_eq!(r.end(), 5);
    }

    #[test]
    fn test_end_saturates() {
        let r = Replacement::new(usize::MAX, 1, "x");
        assert_eq!(r.end(), usize::MAX);
    }

    #[test]
    fn test_zero_length_empty_text_is_not_deletion() {
        let r = Replacement::new(0, 0, "");
        assert!(r.is_insertion());
        assert!(!r.is_deletion());
    }
}
