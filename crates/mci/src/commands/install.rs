use std::process::ExitCode;

use super::current_dir;
use crate::cli::InstallArgs;

pub fn run(args: InstallArgs) -> anyhow::Result<ExitCode> {
    let dir = match args.dir {
        Some(d) => d,
        None => current_dir()?,
    };
    let report = mci::install::install(&dir, args.yaml)?;
    for entry in &report.entries {
        println!("{:>8}  {}", entry.action.to_string(), entry.path.display());
    }
    Ok(ExitCode::SUCCESS)
}
