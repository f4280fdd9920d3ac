//! Protocol-server declarations (`mcp_servers`) and executable lookups.
//!
//! Only stdio-style entries carrying a `command` are checked. A missing
//! executable is reported as a [`Warning`] and never fails resolution.

use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;

use crate::env::EnvironmentMapping;
use crate::error::Warning;

/// A server declared under `mcp_servers`; only the launch command matters here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDeclaration {
    pub name: String,
    pub command: Option<String>,
}

/// Read the `mcp_servers` (or `mcpServers`) object of a schema document.
/// Non-object values are ignored.
pub fn parse_servers(doc: &JsonValue) -> Vec<ServerDeclaration> {
    let Some(map) = doc
        .get("mcp_servers")
        .or_else(|| doc.get("mcpServers"))
        .and_then(|m| m.as_object())
    else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(name, def)| parse_stdio_like(name, def))
        .collect()
}

fn parse_stdio_like(name: &str, def: &JsonValue) -> Option<ServerDeclaration> {
    let def = def.as_object()?;
    let command = def
        .get("command")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);
    Some(ServerDeclaration {
        name: name.to_string(),
        command,
    })
}

/// One warning per declared command that cannot be found.
pub fn check_commands(
    servers: &[ServerDeclaration],
    declared_in: &Path,
    env: &EnvironmentMapping,
) -> Vec<Warning> {
    servers
        .iter()
        .filter_map(|srv| {
            let command = srv.command.as_deref()?;
            if find_executable(command, env.get("PATH")).is_some() {
                return None;
            }
            tracing::debug!("server '{}' command '{}' not found", srv.name, command);
            Some(
                Warning::new(format!(
                    "MCP server command not found in PATH: {} (server: {}, declared in {})",
                    command,
                    srv.name,
                    declared_in.display()
                ))
                .with_suggestion("Install the command or ensure it's in your PATH"),
            )
        })
        .collect()
}

/// Resolve `command` the way a shell would: directly when it contains a path
/// separator, otherwise through each entry of `path_var`.
pub fn find_executable(command: &str, path_var: Option<&str>) -> Option<PathBuf> {
    let direct = Path::new(command);
    if direct.components().count() > 1 {
        return is_executable(direct).then(|| direct.to_path_buf());
    }
    let path_var = path_var?;
    std::env::split_paths(path_var)
        .flat_map(|dir| candidate_names(command).into_iter().map(move |n| dir.join(n)))
        .find(|p| is_executable(p))
}

#[cfg(windows)]
fn candidate_names(command: &str) -> Vec<String> {
    let mut names = vec![command.to_string()];
    if Path::new(command).extension().is_none() {
        names.extend([".exe", ".cmd", ".bat"].iter().map(|e| format!("{}{}", command, e)));
    }
    names
}

#[cfg(not(windows))]
fn candidate_names(command: &str) -> Vec<String> {
    vec![command.to_string()]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt as _;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
