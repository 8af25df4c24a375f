use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::formatter::ClangFormat;

fn default_executable() -> PathBuf {
    PathBuf::from("clang-format")
}

fn default_style() -> String {
    "file".to_string()
}

fn default_extensions() -> Vec<String> {
    ["cpp", "cxx", "c", "cc", "hpp", "hxx", "h"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_require_style_file() -> bool {
    true
}

fn default_style_file_names() -> Vec<String> {
    vec![".clang-format".to_string(), "_clang-format".to_string()]
}

/// Settings for format-on-save.
///
/// Every field has a default, so an empty file is a valid config.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FormatConfig {
    /// Formatter executable, looked up on `PATH` when not absolute
    #[serde(default = "default_executable")]
    pub executable: PathBuf,
    /// Value passed as `-style=`
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default)]
    pub fallback_style: Option<String>,
    /// File extensions (without the dot) that are formatted on save
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Only format when the project root holds a style file
    #[serde(default = "default_require_style_file")]
    pub require_style_file: bool,
    #[serde(default = "default_style_file_names")]
    pub style_file_names: Vec<String>,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            style: default_style(),
            fallback_style: None,
            extensions: default_extensions(),
            require_style_file: default_require_style_file(),
            style_file_names: default_style_file_names(),
        }
    }
}

impl FormatConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.executable.as_os_str().is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "executable",
            });
        }
        if self.style.trim().is_empty() {
            issues.push(ValidationIssue::MissingField { field: "style" });
        }
        if self
            .fallback_style
            .as_deref()
            .is_some_and(|s| s.trim().is_empty())
        {
            issues.push(ValidationIssue::MissingField {
                field: "fallback_style",
            });
        }
        if self.extensions.is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "extensions",
            });
        }
        for ext in &self.extensions {
            if ext.is_empty() || ext.contains('.') || ext.chars().any(char::is_whitespace) {
                issues.push(ValidationIssue::InvalidExtension(ext.clone()));
            }
        }
        if self.require_style_file && self.style_file_names.is_empty() {
            issues.push(ValidationIssue::InvalidCombo {
                message: "require_style_file needs at least one entry in style_file_names"
                    .to_string(),
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// True when `path` has one of the configured extensions.
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }

    /// First style file found directly inside `root`, if any.
    pub fn find_style_file(&self, root: &Path) -> Option<PathBuf> {
        self.style_file_names
            .iter()
            .map(|name| root.join(name))
            .find(|candidate| candidate.is_file())
    }

    /// Build the clang-format runner described by this config.
    pub fn formatter(&self) -> ClangFormat {
        let formatter = ClangFormat::new(&self.executable, &self.style);
        match &self.fallback_style {
            Some(fallback) => formatter.with_fallback_style(fallback),
            None => formatter,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    MissingField { field: &'static str },
    InvalidExtension(String),
    InvalidCombo { message: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { field } => {
                write!(f, "config field '{field}' must not be empty")
            }
            ValidationIssue::InvalidExtension(ext) => write!(
                f,
                "invalid extension '{ext}': use the bare extension without a dot, e.g. \"cpp\""
            ),
            ValidationIssue::InvalidCombo { message } => {
                write!(f, "invalid configuration: {message}")
            }
        }
    }
}
