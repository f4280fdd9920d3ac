//! One function per subcommand. Each returns the process exit code; fatal
//! failures come back as errors and are printed by `main`.

mod add;
mod install;
mod list;
mod validate;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;

use mci::config::UserConfig;
use mci::{EnvironmentMapping, ResolutionRequest, Warning};

use crate::cli::{Command, SourceArgs};

pub fn run(command: Command, user_cfg: Option<&UserConfig>) -> anyhow::Result<ExitCode> {
    match command {
        Command::List(args) => list::run(args, user_cfg),
        Command::Validate(args) => validate::run(args),
        Command::Add(args) => add::run(args),
        Command::Install(args) => install::run(args),
    }
}

fn current_dir() -> anyhow::Result<PathBuf> {
    std::env::current_dir().context("failed to determine the current directory")
}

/// Build a request from the shared flags, capturing the process environment
/// once.
fn request_for(source: &SourceArgs) -> anyhow::Result<ResolutionRequest> {
    let cli_env: EnvironmentMapping = source.env.iter().cloned().collect();
    let mut request = ResolutionRequest::new(current_dir()?)
        .with_process_env(EnvironmentMapping::capture_process())
        .with_cli_env(cli_env);
    if let Some(file) = &source.file {
        request = request.with_file(file);
    }
    Ok(request)
}

fn print_warnings(warnings: &[Warning]) {
    for w in warnings {
        eprintln!("warning: {}", w);
    }
}
