//! Format On Save: apply clang-format replacement reports to live buffers
//!
//! Instead of reloading a whole buffer with formatted output, the formatter
//! is asked for a list of byte-offset replacements
//! (`clang-format --output-replacements-xml`) which are applied surgically to
//! the open document, keeping cursor and undo context intact.
//!
//! # Architecture
//!
//! ```text
//! formatter output ─▶ decode ─▶ [Replacement] ─▶ apply_replacements ─▶ TextBuffer
//! ```
//!
//! - [`decode`] turns the XML report into [`Replacement`]s, preserving
//!   whitespace exactly.
//! - [`apply_replacements`] applies them last to first against any
//!   [`TextBuffer`], so original offsets stay valid without delta tracking.
//! - [`FormatOnSave`] is the save-event handler a host wires up; the
//!   [`Formatter`] it runs is injectable.
//!
//! # Example
//!
//! ```
//! use format_on_save::{apply_replacements, decode};
//!
//! let report = "<replacements><replacement offset='3' length='2'> </replacement></replacements>";
//! let decoded = decode(report).unwrap();
//!
//! let mut buffer = String::from("int  x;");
//! apply_replacements(&mut buffer, &decoded.replacements).unwrap();
//! assert_eq!(buffer, "int x;");
//! ```

pub mod apply;
pub mod buffer;
pub mod config;
pub mod decode;
pub mod formatter;
pub mod replacement;
pub mod session;

// Re-exports
pub use apply::{apply_replacements, ApplyError, ApplySummary};
pub use buffer::{BufferError, Document, SaveResult, TextBuffer};
pub use config::{
    discover, load_from_path, load_from_str, ConfigError, ConfigOrigin, FormatConfig,
};
pub use decode::{decode, DecodeError, DecodedReport, SkippedRecord};
pub use formatter::{ClangFormat, FormatRequest, Formatter, FormatterError, FormatterOutput};
pub use replacement::Replacement;
pub use session::{
    FormatOnSave, Qualification, SaveEvent, SaveOutcome, SessionError, SkipReason,
};
