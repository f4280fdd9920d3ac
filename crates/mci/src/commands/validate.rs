use std::process::ExitCode;

use mci::pipeline;

use super::{print_warnings, request_for};
use crate::cli::ValidateArgs;

pub fn run(args: ValidateArgs) -> anyhow::Result<ExitCode> {
    let report = pipeline::validate(&request_for(&args.source)?);
    print_warnings(&report.warnings);

    if !report.is_valid() {
        for e in &report.errors {
            eprintln!("error: {}", e);
        }
        eprintln!("validation failed with {} error(s)", report.errors.len());
        return Ok(ExitCode::FAILURE);
    }

    match &report.schema_path {
        Some(path) => println!("{} is valid ({} tools)", path.display(), report.tool_count),
        None => println!("schema is valid ({} tools)", report.tool_count),
    }
    Ok(ExitCode::SUCCESS)
}
