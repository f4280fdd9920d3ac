mod cli;
mod commands;
mod logging;

use std::process::ExitCode;

use clap::Parser as _;

use crate::cli::Cli;
use crate::logging::{init_tracing, mci_home};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let home = mci_home();
    let (user_cfg, cfg_error) = match mci::config::load_user_config(&home) {
        Ok(cfg) => (cfg, None),
        Err(e) => (None, Some(e)),
    };
    init_tracing(&home, user_cfg.as_ref());
    if let Some(e) = cfg_error {
        tracing::warn!("ignoring user config: {:#}", e);
    }
    tracing::debug!("mci home: {}", home.display());

    match commands::run(cli.command, user_cfg.as_ref()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
