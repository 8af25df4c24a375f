use crate::buffer::{BufferError, TextBuffer};
use crate::replacement::Replacement;
use thiserror::Error;

/// The buffer rejected a replacement. Offsets that fail here were not valid
/// against the original content, which the formatter guarantees they are.
#[derive(Error, Debug)]
#[error("Failed to apply replacement #{index} (offset {offset}, length {length}): {source}")]
pub struct ApplyError {
    pub index: usize,
    pub offset: usize,
    pub length: usize,
    #[source]
    pub source: BufferError,
}

/// Counts of what an application changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    /// Zero-length replacements (pure insertions)
    pub insertions: usize,
    /// Replacements that removed at least one byte
    pub replacements: usize,
    /// Subset of `replacements` that put no text back
    pub deletions: usize,
    pub bytes_inserted: usize,
    pub bytes_removed: usize,
}

impl ApplySummary {
    pub fn total(&self) -> usize {
        self.insertions + self.replacements
    }
}

/// Apply `replacements` to `buffer`.
///
/// `replacements` must be sorted by ascending offset, non-overlapping, and
/// expressed against the buffer's content before this call. They are applied
/// last to first, so every edit still to be applied sits entirely before the
/// region already touched and its original offset stays valid.
///
/// Stops at the first buffer failure. Replacements applied before the failure
/// are left in place.
pub fn apply_replacements<B>(
    buffer: &mut B,
    replacements: &[Replacement],
) -> Result<ApplySummary, ApplyError>
where
    B: TextBuffer + ?Sized,
{
    let mut summary = ApplySummary::default();

    for (index, replacement) in replacements.iter().enumerate().rev() {
        let result = if replacement.is_insertion() {
            buffer.insert(replacement.offset, &replacement.text)
        } else {
            buffer.replace_range(replacement.offset, replacement.end(), &replacement.text)
        };

        result.map_err(|source| ApplyError {
            index,
            offset: replacement.offset,
            length: replacement.length,
            source,
        })?;

        if replacement.is_insertion() {
            summary.insertions += 1;
        } else {
            summary.replacements += 1;
            if replacement.is_deletion() {
                summary.deletions += 1;
            }
        }
        summary.bytes_inserted += replacement.text.len();
        summary.bytes_removed += replacement.length;
    }

    log::debug!(
        "applied {} replacement(s): +{} -{} bytes",
        summary.total(),
        summary.bytes_inserted,
        summary.bytes_removed
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every call so tests can check the order edits reach the buffer.
    #[derive(Default)]
    struct RecordingBuffer {
        content: String,
        calls: Vec<(usize, usize, String)>,
    }

    impl TextBuffer for RecordingBuffer {
        fn insert(&mut self, offset: usize, text: &str) -> Result<(), BufferError> {
            self.calls.push((offset, offset, text.to_string()));
            TextBuffer::insert(&mut self.content, offset, text)
        }

        fn replace_range(
            &mut self,
            start: usize,
            end: usize,
            text: &str,
        ) -> Result<(), BufferError> {
            self.calls.push((start, end, text.to_string()));
            TextBuffer::replace_range(&mut self.content, start, end, text)
        }

        fn len(&self) -> usize {
            self.content.len()
        }
    }

    #[test]
    fn test_empty_list_leaves_buffer_unchanged() {
        let mut buf = String::from("ABCDEFGHIJ");
        let summary = apply_replacements(&mut buf, &[]).unwrap();
        assert_eq!(buf, "ABCDEFGHIJ");
        assert_eq!(summary, ApplySummary::default());
    }

    #[test]
    fn test_single_insertion() {
        let mut buf = String::from("ABCDEFGHIJ");
        let summary = apply_replacements(&mut buf, &[Replacement::new(5, 0, "X")]).unwrap();
        assert_eq!(buf, "ABCDEXFGHIJ");
        assert_eq!(summary.insertions, 1);
        assert_eq!(summary.replacements, 0);
    }

    #[test]
    fn test_single_replacement() {
        let mut buf = String::from("ABCDEFGHIJ");
        let summary = apply_replacements(&mut buf, &[Replacement::new(2, 3, "Z")]).unwrap();
        assert_eq!(buf, "ABZFGHIJ");
        assert_eq!(summary.bytes_removed, 3);
        assert_eq!(summary.bytes_inserted, 1);
    }

    #[test]
    fn test_pure_deletion() {
        let mut buf = String::from("int  x;");
        let summary = apply_replacements(&mut buf, &[Replacement::new(3, 1, "")]).unwrap();
        assert_eq!(buf, "int x;");
        assert_eq!(summary.replacements, 1);
        assert_eq!(summary.deletions, 1);
    }

    #[test]
    fn test_deletions_counted_separately() {
        let mut buf = String::from("a  b;;");
        let edits = [Replacement::new(1, 2, " "), Replacement::new(5, 1, "")];
        let summary = apply_replacements(&mut buf, &edits).unwrap();
        assert_eq!(buf, "a b;");
        assert_eq!(summary.replacements, 2);
        assert_eq!(summary.deletions, 1);
    }

    #[test]
    fn test_range_ending_past_usize_max_is_an_error() {
        let mut buf = String::from("abc");
        let err = apply_replacements(&mut buf, &[Replacement::new(usize::MAX, 1, "x")])
            .unwrap_err();
        assert!(matches!(err.source, BufferError::InvalidRange { .. }));
        assert_eq!(buf, "abc");
    }

    #[test]
    fn test_applies_from_last_to_first() {
        let mut buf = RecordingBuffer {
            content: "ABCDEFGH".to_string(),
            ..Default::default()
        };
        let edits = [Replacement::new(1, 1, "X"), Replacement::new(5, 1, "Y")];
        apply_replacements(&mut buf, &edits).unwrap();

        assert_eq!(buf.content, "AXCDEYGH");
        assert_eq!(
            buf.calls,
            vec![(5, 6, "Y".to_string()), (1, 2, "X".to_string())]
        );
    }

    #[test]
    fn test_length_changing_edits_keep_offsets_valid() {
        let mut buf = String::from("if(a){b;}");
        let edits = [
            Replacement::new(2, 0, " "),
            Replacement::new(5, 0, " "),
            Replacement::new(6, 0, "\n  "),
            Replacement::new(8, 0, "\n"),
        ];
        apply_replacements(&mut buf, &edits).unwrap();
        assert_eq!(buf, "if (a) {\n  b;\n}");
    }

    #[test]
    fn test_buffer_failure_is_propagated() {
        let mut buf = String::from("short");
        let edits = [Replacement::new(1, 1, "x"), Replacement::new(40, 2, "y")];
        let err = apply_replacements(&mut buf, &edits).unwrap_err();

        assert_eq!(err.index, 1);
        assert_eq!(err.offset, 40);
        assert!(matches!(err.source, BufferError::InvalidRange { .. }));
        assert_eq!(buf, "short");
    }

    #[test]
    fn test_works_through_trait_object() {
        let mut buf = String::from("a=b");
        let dyn_buf: &mut dyn TextBuffer = &mut buf;
        apply_replacements(dyn_buf, &[Replacement::new(1, 1, " = ")]).unwrap();
        assert_eq!(buf, "a = b");
    }
}
