use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "mci")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resolve, inspect and edit MCI tool configurations")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the resolved tools
    List(ListArgs),

    /// Check a schema and its toolsets for errors
    Validate(ValidateArgs),

    /// Add or update a toolset reference in the root schema
    Add(AddArgs),

    /// Scaffold a new MCI project
    Install(InstallArgs),
}

/// Inputs shared by every command that resolves a schema.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Schema file to use instead of searching the current directory
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Environment override, highest precedence (repeatable)
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Filter as TYPE:VALUES, e.g. tags:api,read (repeatable, all must match)
    #[arg(long = "filter", value_name = "SPEC")]
    pub filters: Vec<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Include tags, execution type and input schema
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Toolset name (file mci/<name>.mci.json|yaml|yml)
    pub toolset: String,

    /// Filter for this toolset as TYPE:VALUES
    #[arg(long, value_name = "SPEC")]
    pub filter: Option<String>,

    /// Schema file to edit instead of searching the current directory
    #[arg(short, long)]
    pub path: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Write mci.yaml instead of mci.json
    #[arg(long)]
    pub yaml: bool,

    /// Target directory (defaults to the current directory)
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
    mci::env::parse_override(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory as _;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn list_collects_repeated_flags() {
        let cli = Cli::try_parse_from([
            "mci", "list", "-e", "A=1", "--env", "B=x=y", "--filter", "tags:a", "--filter",
            "except:b", "--format", "json",
        ])
        .unwrap();
        let Command::List(args) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(
            args.source.env,
            vec![("A".into(), "1".into()), ("B".into(), "x=y".into())]
        );
        assert_eq!(args.filters, vec!["tags:a", "except:b"]);
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn env_without_equals_is_a_usage_error() {
        let err = Cli::try_parse_from(["mci", "validate", "-e", "NOEQUALS"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn add_takes_name_filter_and_path() {
        let cli = Cli::try_parse_from([
            "mci", "add", "github", "--filter", "only:a,b", "--path", "custom.yaml",
        ])
        .unwrap();
        let Command::Add(args) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(args.toolset, "github");
        assert_eq!(args.filter.as_deref(), Some("only:a,b"));
        assert_eq!(args.path, Some(PathBuf::from("custom.yaml")));
    }
}
