//! `.env` file parsing.
//!
//! Accepted lines are `KEY=VALUE` with an optional leading `export `. Blank
//! lines, `#` comments and anything that does not look like an assignment are
//! skipped one line at a time; a bad line never discards the rest of the file.

use std::path::Path;

use super::EnvironmentMapping;

/// Parse `.env` content into a mapping. Later duplicates win.
pub fn parse_dotenv(content: &str) -> EnvironmentMapping {
    content.lines().filter_map(parse_line).collect()
}

/// Read and parse a `.env` file. A missing or unreadable file yields an empty
/// mapping.
pub fn load_dotenv_file(path: &Path) -> EnvironmentMapping {
    if !path.is_file() {
        return EnvironmentMapping::new();
    }
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let vars = parse_dotenv(&content);
            tracing::debug!("loaded {} variable(s) from {}", vars.len(), path.display());
            vars
        }
        Err(e) => {
            tracing::debug!("ignoring unreadable env file {}: {}", path.display(), e);
            EnvironmentMapping::new()
        }
    }
}

fn parse_line(raw: &str) -> Option<(String, String)> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = match line.strip_prefix("export") {
        Some(rest) if rest.starts_with(char::is_whitespace) => rest.trim_start(),
        _ => line,
    };
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if !is_valid_key(key) {
        return None;
    }
    Some((key.to_string(), unquote(value.trim()).to_string()))
}

fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 {
        for q in ['"', '\''] {
            if value.starts_with(q) && value.ends_with(q) {
                return &value[1..value.len() - 1];
            }
        }
    }
    value
}
