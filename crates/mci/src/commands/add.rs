use std::process::ExitCode;

use anyhow::Context as _;

use mci::FilterSpec;
use mci::editor::{EditAction, EditStrategy, add_toolset_reference};
use mci::schema::find_schema_file;

use super::current_dir;
use crate::cli::AddArgs;

pub fn run(args: AddArgs) -> anyhow::Result<ExitCode> {
    let path = match args.path {
        Some(p) => p,
        None => {
            let cwd = current_dir()?;
            find_schema_file(&cwd).with_context(|| {
                format!(
                    "no mci.json or mci.yaml in {}; run `mci install` first",
                    cwd.display()
                )
            })?
        }
    };

    let filter = args
        .filter
        .as_deref()
        .map(FilterSpec::parse)
        .transpose()
        .context("invalid --filter")?;
    let (kind, values) = match &filter {
        Some(spec) => (Some(spec.kind().cli_name()), Some(spec.joined_values())),
        None => (None, None),
    };

    let outcome = add_toolset_reference(&path, &args.toolset, kind, values.as_deref())
        .with_context(|| format!("failed to update {}", path.display()))?;

    let verb = match outcome.action {
        EditAction::Added => "added",
        EditAction::Updated => "updated",
        EditAction::Unchanged => "already present:",
    };
    let scope = filter.map(|f| format!(" ({})", f)).unwrap_or_default();
    println!(
        "{} toolset {}{} in {}",
        verb,
        outcome.name,
        scope,
        outcome.path.display()
    );
    if outcome.strategy == EditStrategy::Reserialized {
        eprintln!(
            "warning: {} was rewritten in normalised form; comments and layout may have changed",
            outcome.path.display()
        );
    }
    Ok(ExitCode::SUCCESS)
}
