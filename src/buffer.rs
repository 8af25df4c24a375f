use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// A live, mutable text buffer addressed by byte offsets into its *current*
/// content.
///
/// This is the only capability the applicator needs from a host editor.
pub trait TextBuffer {
    /// Insert `text` before the byte at `offset`.
    fn insert(&mut self, offset: usize, text: &str) -> Result<(), BufferError>;

    /// Replace the bytes in `[start, end)` with `text`.
    fn replace_range(&mut self, start: usize, end: usize, text: &str) -> Result<(), BufferError>;

    /// Current length in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Error, Debug)]
pub enum BufferError {
    #[error("Invalid byte range: [{start}, {end}) in buffer of length {len}")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("Offset {offset} is not on a UTF-8 character boundary")]
    NotCharBoundary { offset: usize },

    #[error("{path} changed on disk since it was opened")]
    ChangedOnDisk { path: PathBuf },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF-8 validation error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

fn check_range(content: &str, start: usize, end: usize) -> Result<(), BufferError> {
    if start > end || end > content.len() {
        return Err(BufferError::InvalidRange {
            start,
            end,
            len: content.len(),
        });
    }
    for offset in [start, end] {
        if !content.is_char_boundary(offset) {
            return Err(BufferError::NotCharBoundary { offset });
        }
    }
    Ok(())
}

impl TextBuffer for String {
    fn insert(&mut self, offset: usize, text: &str) -> Result<(), BufferError> {
        check_range(self, offset, offset)?;
        self.insert_str(offset, text);
        Ok(())
    }

    fn replace_range(&mut self, start: usize, end: usize, text: &str) -> Result<(), BufferError> {
        check_range(self, start, end)?;
        String::replace_range(self, start..end, text);
        Ok(())
    }

    fn len(&self) -> usize {
        String::len(self)
    }
}

/// Result of saving a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "SaveResult tells whether the file was written"]
pub enum SaveResult {
    /// Content was written to disk
    Written { path: PathBuf, bytes: usize },
    /// Nothing changed since the document was opened
    Unchanged { path: PathBuf },
}

/// A file-backed text buffer.
///
/// Remembers an xxh3 fingerprint of the bytes it was opened from so a save
/// never clobbers a file that was modified by someone else in the meantime.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    content: String,
    original_hash: u64,
    modified: bool,
}

impl Document {
    /// Read `path` into a new document.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, BufferError> {
        let path = path.into();
        let bytes = fs::read(&path)?;
        let original_hash = xxh3_64(&bytes);
        let content = String::from_utf8(bytes)?;
        Ok(Self {
            path,
            content,
            original_hash,
            modified: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// True once any insertion or replacement has been applied.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Write the document back to its file if it was modified.
    ///
    /// Fails with [`BufferError::ChangedOnDisk`] when the file no longer holds
    /// the bytes it was opened from.
    pub fn save(&mut self) -> Result<SaveResult, BufferError> {
        if !self.modified {
            return Ok(SaveResult::Unchanged {
                path: self.path.clone(),
            });
        }

        let on_disk = fs::read(&self.path)?;
        if xxh3_64(&on_disk) != self.original_hash {
            return Err(BufferError::ChangedOnDisk {
                path: self.path.clone(),
            });
        }

        atomic_write(&self.path, self.content.as_bytes())?;

        // Update mtime so build tools notice the rewrite
        let now = filetime::FileTime::now();
        filetime::set_file_mtime(&self.path, now)?;

        self.original_hash = xxh3_64(self.content.as_bytes());
        self.modified = false;
        log::debug!("saved {} ({} bytes)", self.path.display(), self.content.len());

        Ok(SaveResult::Written {
            path: self.path.clone(),
            bytes: self.content.len(),
        })
    }
}

impl TextBuffer for Document {
    fn insert(&mut self, offset: usize, text: &str) -> Result<(), BufferError> {
        TextBuffer::insert(&mut self.content, offset, text)?;
        self.modified |= !text.is_empty();
        Ok(())
    }

    fn replace_range(&mut self, start: usize, end: usize, text: &str) -> Result<(), BufferError> {
        if self.content.get(start..end) == Some(text) {
            return Ok(());
        }
        TextBuffer::replace_range(&mut self.content, start, end, text)?;
        self.modified = true;
        Ok(())
    }

    fn len(&self) -> usize {
        self.content.len()
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or the original file is left untouched.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), BufferError> {
    // Same directory keeps the rename on one filesystem
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    // Keep the original permissions across the rename
    if let Ok(metadata) = fs::metadata(path) {
        temp.as_file().set_permissions(metadata.permissions())?;
    }

    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
