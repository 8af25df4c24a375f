//! Format-on-save handler.
//!
//! A host calls [`FormatOnSave::on_saved`] from its "document saved" event
//! with the original content and a handle to the live buffer. The handler
//! decides whether the file qualifies, runs the formatter, decodes its report
//! and applies it. Persisting the buffer afterwards is left to the host, once,
//! after `on_saved` returns.

use std::path::Path;
use thiserror::Error;

use crate::apply::{apply_replacements, ApplyError, ApplySummary};
use crate::buffer::TextBuffer;
use crate::config::FormatConfig;
use crate::decode::{decode, SkippedRecord};
use crate::formatter::{FormatRequest, Formatter, FormatterError};

/// Failures a host must not ignore.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("formatter error: {0}")]
    Formatter(#[from] FormatterError),

    #[error("apply error: {0}")]
    Apply(#[from] ApplyError),
}

/// Why a file was not handed to the formatter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    UnsupportedExtension,
    NoStyleFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Qualification {
    Format,
    Skip(SkipReason),
}

/// What happened to the buffer for one save event.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "SaveOutcome tells whether the buffer needs saving"]
pub enum SaveOutcome {
    /// The file does not qualify for formatting
    Skipped(SkipReason),
    /// The formatter ran but exited unsuccessfully; buffer untouched
    FormatterFailed {
        status: Option<i32>,
        output: String,
    },
    /// The report was untrustworthy; buffer untouched
    Aborted { reason: String },
    /// Nothing to apply
    Unchanged {
        skipped: Vec<SkippedRecord>,
        incomplete_format: bool,
    },
    /// Replacements were applied to the buffer
    Applied {
        summary: ApplySummary,
        skipped: Vec<SkippedRecord>,
        incomplete_format: bool,
    },
}

impl SaveOutcome {
    /// True when the buffer was changed and should be saved.
    pub fn is_modified(&self) -> bool {
        matches!(self, SaveOutcome::Applied { .. })
    }

    /// Records the report contained but which could not be applied.
    pub fn skipped(&self) -> &[SkippedRecord] {
        match self {
            SaveOutcome::Unchanged { skipped, .. } | SaveOutcome::Applied { skipped, .. } => {
                skipped
            }
            _ => &[],
        }
    }
}

/// Context of one "document saved" event.
pub struct SaveEvent<'a, B: TextBuffer + ?Sized> {
    /// Path of the saved document
    pub path: &'a Path,
    /// Root the style file is searched in and the formatter runs from
    pub project_root: &'a Path,
    /// Content the formatter sees; must equal the buffer's current content
    pub original: &'a str,
    pub buffer: &'a mut B,
}

pub struct FormatOnSave<F> {
    config: FormatConfig,
    formatter: F,
}

impl<F: Formatter> FormatOnSave<F> {
    pub fn new(config: FormatConfig, formatter: F) -> Self {
        Self { config, formatter }
    }

    pub fn config(&self) -> &FormatConfig {
        &self.config
    }

    /// Decide whether `path` should be formatted.
    pub fn qualifies(&self, path: &Path, project_root: &Path) -> Qualification {
        if !self.config.matches_extension(path) {
            return Qualification::Skip(SkipReason::UnsupportedExtension);
        }
        if self.config.require_style_file && self.config.find_style_file(project_root).is_none() {
            return Qualification::Skip(SkipReason::NoStyleFile);
        }
        Qualification::Format
    }

    /// Handle one save event.
    ///
    /// Recoverable problems (formatter exit status, untrustworthy report,
    /// skipped records) are logged and reported through [`SaveOutcome`].
    /// Only a formatter that cannot be run or a buffer that rejects an edit
    /// is an error.
    pub fn on_saved<B>(&self, event: SaveEvent<'_, B>) -> Result<SaveOutcome, SessionError>
    where
        B: TextBuffer + ?Sized,
    {
        let SaveEvent {
            path,
            project_root,
            original,
            buffer,
        } = event;

        if let Qualification::Skip(reason) = self.qualifies(path, project_root) {
            log::debug!("not formatting {}: {:?}", path.display(), reason);
            return Ok(SaveOutcome::Skipped(reason));
        }

        let request = FormatRequest {
            path,
            working_dir: project_root,
            content: original,
        };
        let output = self.formatter.format(&request)?;
        if !output.is_success() {
            let combined = output.combined();
            log::warn!(
                "formatter exited with status {:?} for {}: {}",
                output.status,
                path.display(),
                combined.trim()
            );
            return Ok(SaveOutcome::FormatterFailed {
                status: output.status,
                output: combined,
            });
        }

        let report = match decode(&output.stdout) {
            Ok(report) => report,
            Err(err) => {
                log::warn!("{}: {err}; no replacements applied", path.display());
                return Ok(SaveOutcome::Aborted {
                    reason: err.to_string(),
                });
            }
        };

        if report.incomplete_format {
            log::warn!("{}: formatter reported incomplete formatting", path.display());
        }
        if !report.skipped.is_empty() {
            log::warn!(
                "{}: skipped {} replacement(s) with unparseable offset/length",
                path.display(),
                report.skipped.len()
            );
        }

        if report.is_empty() {
            log::debug!("{}: already formatted", path.display());
            return Ok(SaveOutcome::Unchanged {
                skipped: report.skipped,
                incomplete_format: report.incomplete_format,
            });
        }

        let summary = apply_replacements(buffer, &report.replacements)?;
        log::info!(
            "{}: applied {} replacement(s)",
            path.display(),
            summary.total()
        );

        Ok(SaveOutcome::Applied {
            summary,
            skipped: report.skipped,
            incomplete_format: report.incomplete_format,
        })
    }
}
