//! File discovery for root schemas and toolset files.

use std::path::{Path, PathBuf};

use crate::error::{ResolveError, ResolveResult};

/// Root schema names tried in order when searching a directory.
pub const ROOT_FILE_NAMES: [&str; 3] = ["mci.json", "mci.yaml", "mci.yml"];

/// Toolset file suffixes tried in order under the library directory.
pub const TOOLSET_EXTENSIONS: [&str; 3] = [".mci.json", ".mci.yaml", ".mci.yml"];

/// Serialisation family of a schema file, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    Json,
    Yaml,
}

impl SchemaFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(SchemaFormat::Json),
            "yaml" | "yml" => Some(SchemaFormat::Yaml),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SchemaFormat::Json => "JSON",
            SchemaFormat::Yaml => "YAML",
        }
    }
}

/// First of `mci.json`, `mci.yaml`, `mci.yml` present in `dir`.
pub fn find_schema_file(dir: &Path) -> Option<PathBuf> {
    ROOT_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// Use `explicit` verbatim when given, otherwise search `dir`.
pub fn locate_root(explicit: Option<&Path>, dir: &Path) -> ResolveResult<PathBuf> {
    match explicit {
        Some(path) if path.is_file() => Ok(path.to_path_buf()),
        Some(path) => Err(ResolveError::FileNotFound {
            path: path.to_path_buf(),
        }),
        None => find_schema_file(dir).ok_or_else(|| ResolveError::SchemaNotFound {
            dir: dir.to_path_buf(),
        }),
    }
}

/// Look up `<library_dir>/<name>.mci.{json,yaml,yml}`. On failure returns the
/// file names that were tried.
pub fn find_toolset_file(library_dir: &Path, name: &str) -> Result<PathBuf, Vec<String>> {
    let candidates: Vec<String> = TOOLSET_EXTENSIONS
        .iter()
        .map(|ext| format!("{}{}", name, ext))
        .collect();
    candidates
        .iter()
        .map(|file| library_dir.join(file))
        .find(|p| p.is_file())
        .ok_or(candidates)
}
