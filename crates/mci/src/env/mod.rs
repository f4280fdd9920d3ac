//! Environment resolution.
//!
//! Four tiers merged lowest to highest: `<root>/mci/.env`, `<root>/.env`, the
//! process snapshot, CLI overrides. The process environment is taken as an
//! explicit input so resolution never touches the real environment.

mod dotenv;
mod mapping;

use std::path::Path;

pub use dotenv::{load_dotenv_file, parse_dotenv};
pub use mapping::EnvironmentMapping;

/// Directory under the project root that holds toolset files and the
/// library-level `.env`.
pub const LIBRARY_DIR_NAME: &str = "mci";

/// Merge every tier into one mapping for the project rooted at `root_dir`.
pub fn resolve(
    root_dir: &Path,
    process: &EnvironmentMapping,
    cli_overrides: &EnvironmentMapping,
) -> EnvironmentMapping {
    let library_env = load_dotenv_file(&root_dir.join(LIBRARY_DIR_NAME).join(".env"));
    let project_env = load_dotenv_file(&root_dir.join(".env"));

    let mut merged = EnvironmentMapping::new();
    for tier in [&library_env, &project_env, process, cli_overrides] {
        merged.merge(tier);
    }
    tracing::debug!(
        "resolved {} environment variable(s) ({} from mci/.env, {} from .env, {} overrides)",
        merged.len(),
        library_env.len(),
        project_env.len(),
        cli_overrides.len()
    );
    merged
}

/// Parse one `KEY=VALUE` override as given on the command line.
pub fn parse_override(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        Some(_) => Err(format!("missing variable name in '{}'", raw)),
        None => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn mapping(pairs: &[(&str, &str)]) -> EnvironmentMapping {
        pairs.iter().copied().collect()
    }

    #[test]
    fn tier_precedence() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("mci")).unwrap();
        fs::write(dir.path().join("mci/.env"), "K=1\nLIB_ONLY=lib\n").unwrap();
        fs::write(dir.path().join(".env"), "K=2\n").unwrap();

        let none = EnvironmentMapping::new();
        let cli = mapping(&[("K", "3")]);

        let env = resolve(dir.path(), &none, &cli);
        assert_eq!(env.get("K"), Some("3"));
        assert_eq!(env.get("LIB_ONLY"), Some("lib"));

        let env = resolve(dir.path(), &none, &none);
        assert_eq!(env.get("K"), Some("2"));

        fs::remove_file(dir.path().join(".env")).unwrap();
        fs::remove_file(dir.path().join("mci/.env")).unwrap();
        let process = mapping(&[("K", "4")]);
        let env = resolve(dir.path(), &process, &none);
        assert_eq!(env.get("K"), Some("4"));
    }

    #[test]
    fn process_beats_dotenv_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".env"), "K=file\n").unwrap();
        let env = resolve(dir.path(), &mapping(&[("K", "proc")]), &EnvironmentMapping::new());
        assert_eq!(env.get("K"), Some("proc"));
    }

    #[test]
    fn missing_files_are_not_errors() {
        let dir = tempfile::tempdir().unwrap();
        let env = resolve(dir.path(), &EnvironmentMapping::new(), &EnvironmentMapping::new());
        assert!(env.is_empty());
    }

    #[test]
    fn override_parsing() {
        assert_eq!(
            parse_override("A=b=c").unwrap(),
            ("A".to_string(), "b=c".to_string())
        );
        assert_eq!(parse_override("EMPTY=").unwrap(), ("EMPTY".to_string(), String::new()));
        assert!(parse_override("NOEQUALS").is_err());
        assert!(parse_override("=value").is_err());
    }
}
