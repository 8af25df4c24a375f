//! External formatter seam.
//!
//! The formatter is an out-of-process oracle: it receives the original
//! content and answers with a replacement report on stdout. [`Formatter`] is
//! the injection point, [`ClangFormat`] the real process runner. Any closure
//! with the right signature is a `Formatter` too, which is how tests avoid
//! spawning processes.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormatterError {
    #[error("No formatter executable detected at '{executable}': {message}")]
    NotFound { executable: PathBuf, message: String },

    #[error("Failed to spawn '{executable}': {source}")]
    Spawn {
        executable: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to exchange data with the formatter: {0}")]
    Io(#[from] std::io::Error),
}

/// Input handed to the formatter for one save event.
#[derive(Debug, Clone, Copy)]
pub struct FormatRequest<'a> {
    /// File the content belongs to (drives style lookup and language detection)
    pub path: &'a Path,
    /// Directory the formatter runs in
    pub working_dir: &'a Path,
    /// Original content, exactly as the replacement offsets will address it
    pub content: &'a str,
}

/// Captured result of one formatter run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatterOutput {
    /// Exit status, `None` if the process was killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl FormatterOutput {
    /// Successful run with `stdout` as the report.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Some(0)
    }

    /// Stdout and stderr joined, for diagnostics.
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// Produces a replacement report for some content.
pub trait Formatter {
    fn format(&self, request: &FormatRequest<'_>) -> Result<FormatterOutput, FormatterError>;
}

impl<F> Formatter for F
where
    F: Fn(&FormatRequest<'_>) -> Result<FormatterOutput, FormatterError>,
{
    fn format(&self, request: &FormatRequest<'_>) -> Result<FormatterOutput, FormatterError> {
        self(request)
    }
}

/// Runs `clang-format --output-replacements-xml` on the original content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClangFormat {
    pub executable: PathBuf,
    /// Value for `-style=` (`file` reads the nearest `.clang-format`)
    pub style: String,
    pub fallback_style: Option<String>,
}

impl Default for ClangFormat {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("clang-format"),
            style: "file".to_string(),
            fallback_style: None,
        }
    }
}

impl ClangFormat {
    pub fn new(executable: impl Into<PathBuf>, style: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            style: style.into(),
            fallback_style: None,
        }
    }

    pub fn with_fallback_style(mut self, fallback_style: impl Into<String>) -> Self {
        self.fallback_style = Some(fallback_style.into());
        self
    }

    /// Check the executable is usable and return its version line.
    pub fn version(&self) -> Result<String, FormatterError> {
        let output = Command::new(&self.executable)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| FormatterError::NotFound {
                executable: self.executable.clone(),
                message: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            return Err(FormatterError::NotFound {
                executable: self.executable.clone(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(stdout.trim().to_string())
    }

    fn args(&self, path: &Path) -> Vec<String> {
        let mut args = vec![
            "--output-replacements-xml".to_string(),
            format!("-style={}", self.style),
        ];
        if let Some(fallback) = &self.fallback_style {
            args.push(format!("--fallback-style={fallback}"));
        }
        args.push(format!("--assume-filename={}", path.display()));
        args
    }
}

impl Formatter for ClangFormat {
    fn format(&self, request: &FormatRequest<'_>) -> Result<FormatterOutput, FormatterError> {
        let mut child = Command::new(&self.executable)
            .current_dir(request.working_dir)
            .args(self.args(request.path))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| FormatterError::Spawn {
                executable: self.executable.clone(),
                source,
            })?;

        // Feed stdin from a separate thread so a full stdout pipe cannot
        // deadlock against our write.
        let mut stdin = child.stdin.take().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "formatter stdin unavailable")
        })?;
        let content = request.content.to_owned();
        let writer = thread::spawn(move || stdin.write_all(content.as_bytes()));

        let output = child.wait_with_output()?;
        match writer.join() {
            Ok(Ok(())) => {}
            // The formatter may exit before reading all input (bad style, etc.)
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(FormatterError::Io(e)),
            Err(_) => {
                return Err(FormatterError::Io(std::io::Error::other(
                    "formatter stdin writer panicked",
                )))
            }
        }

        log::debug!(
            "{} exited with {:?} for {}",
            self.executable.display(),
            output.status.code(),
            request.path.display()
        );

        Ok(FormatterOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
