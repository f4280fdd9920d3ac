//! Error taxonomy for schema resolution, filtering and editing.
//!
//! Every fatal condition names the file it came from. Warnings are plain values
//! (see [`Warning`]) and never travel through these enums.

use std::path::PathBuf;

use thiserror::Error;

pub type ResolveResult<T> = Result<T, ResolveError>;

/// Fatal resolution failures.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no MCI schema file found in {dir} (looked for mci.json, mci.yaml, mci.yml)")]
    SchemaNotFound { dir: PathBuf },

    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(
        "toolset '{name}' referenced by {referenced_by} not found in {library_dir} (looked for {})",
        .tried.join(", ")
    )]
    ToolsetNotFound {
        name: String,
        library_dir: PathBuf,
        tried: Vec<String>,
        referenced_by: PathBuf,
    },

    #[error("failed to parse {path} as {format}: {message}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },

    #[error("invalid schema {path}: {message}")]
    Schema { path: PathBuf, message: String },

    #[error("circular toolset reference: {}", .chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    #[error(transparent)]
    Filter(#[from] FilterSpecError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Malformed `kind:value,...` filter strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterSpecError {
    #[error(
        "invalid filter specification '{0}': expected 'type:value1,value2,...' where type is one of: only, except, tags, without-tags, toolsets"
    )]
    MissingSeparator(String),

    #[error(
        "invalid filter type '{0}': valid types are only, except, tags, without-tags (withoutTags), toolsets"
    )]
    UnknownKind(String),

    #[error("no values provided for filter type '{0}'")]
    EmptyValues(String),
}

/// Failures of the in-place schema editor. No variant is raised after the
/// target file has been touched.
#[derive(Debug, Error)]
pub enum EditError {
    #[error("schema file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("unsupported schema file format: {path} (expected .json, .yaml or .yml)")]
    UnsupportedFormat { path: PathBuf },

    #[error("failed to parse {path} as {format}: {message}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },

    #[error("invalid toolset addition: {0}")]
    Validation(String),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Non-fatal finding surfaced next to a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub message: String,
    pub suggestion: Option<String>,
}

impl Warning {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.suggestion {
            Some(s) => write!(f, "{} ({})", self.message, s),
            None => f.write_str(&self.message),
        }
    }
}
