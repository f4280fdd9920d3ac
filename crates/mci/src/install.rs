//! Project scaffolding from bundled templates.

use std::fmt;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::env::LIBRARY_DIR_NAME;

const ROOT_JSON: &str = include_str!("../templates/mci.json");
const ROOT_YAML: &str = include_str!("../templates/mci.yaml");
const EXAMPLE_TOOLSET: &str = include_str!("../templates/example_toolset.mci.json");
const GITIGNORE: &str = include_str!("../templates/gitignore");

const GITIGNORE_ENTRY: &str = "mcp/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallAction {
    Created,
    Skipped,
    Updated,
}

impl fmt::Display for InstallAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InstallAction::Created => "created",
            InstallAction::Skipped => "skipped",
            InstallAction::Updated => "updated",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallEntry {
    pub path: PathBuf,
    pub action: InstallAction,
}

#[derive(Debug, Default)]
pub struct InstallReport {
    pub entries: Vec<InstallEntry>,
}

impl InstallReport {
    fn record(&mut self, path: PathBuf, action: InstallAction) {
        tracing::debug!("install: {} {}", action, path.display());
        self.entries.push(InstallEntry { path, action });
    }

    pub fn action_for(&self, path: &Path) -> Option<InstallAction> {
        self.entries
            .iter()
            .find(|e| e.path == path)
            .map(|e| e.action)
    }
}

/// Scaffold an MCI project in `dir`. Existing files are left alone.
pub fn install(dir: &Path, yaml: bool) -> anyhow::Result<InstallReport> {
    let mut report = InstallReport::default();

    let (root_name, root_template) = if yaml {
        ("mci.yaml", ROOT_YAML)
    } else {
        ("mci.json", ROOT_JSON)
    };
    write_new(&dir.join(root_name), root_template, &mut report)?;

    let library = dir.join(LIBRARY_DIR_NAME);
    if library.is_dir() {
        report.record(library.clone(), InstallAction::Skipped);
    } else {
        fs::create_dir_all(&library)
            .with_context(|| format!("failed to create {}", library.display()))?;
        report.record(library.clone(), InstallAction::Created);
    }

    ensure_gitignore(&library.join(".gitignore"), &mut report)?;
    write_new(
        &library.join("example_toolset.mci.json"),
        EXAMPLE_TOOLSET,
        &mut report,
    )?;

    tracing::info!("install finished in {}", dir.display());
    Ok(report)
}

fn write_new(path: &Path, content: &str, report: &mut InstallReport) -> anyhow::Result<()> {
    if path.exists() {
        report.record(path.to_path_buf(), InstallAction::Skipped);
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    report.record(path.to_path_buf(), InstallAction::Created);
    Ok(())
}

fn ensure_gitignore(path: &Path, report: &mut InstallReport) -> anyhow::Result<()> {
    if !path.exists() {
        return write_new(path, GITIGNORE, report);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    if content.lines().any(|l| l.trim() == GITIGNORE_ENTRY) {
        report.record(path.to_path_buf(), InstallAction::Skipped);
        return Ok(());
    }
    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let prefix = if content.is_empty() || content.ends_with('\n') {
        ""
    } else {
        "\n"
    };
    writeln!(file, "{}{}", prefix, GITIGNORE_ENTRY)
        .with_context(|| format!("failed to update {}", path.display()))?;
    report.record(path.to_path_buf(), InstallAction::Updated);
    Ok(())
}
