use serde::Deserialize;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

/// `<MCI_HOME>/config.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    pub logging: Option<LoggingCfg>,
    pub defaults: Option<DefaultsCfg>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingCfg {
    pub to_file: Option<bool>,
    pub dir: Option<String>,
    pub json: Option<bool>,
    pub compact: Option<bool>,
    pub pretty: Option<bool>,
    pub level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultsCfg {
    /// Filter specs applied when a command gets no `--filter`.
    pub filters: Option<Vec<String>>,
}

impl UserConfig {
    pub fn default_filters(&self) -> &[String] {
        self.defaults
            .as_ref()
            .and_then(|d| d.filters.as_deref())
            .unwrap_or_default()
    }
}

pub fn load_user_config(mci_home: &Path) -> anyhow::Result<Option<UserConfig>> {
    let path = mci_home.join("config.toml");
    if !path.exists() {
        return Ok(None);
    }
    let s = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let cfg: UserConfig =
        toml::from_str(&s).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(Some(cfg))
}

/// `~/` expansion against the process `HOME`.
pub fn expand_home(path: &str) -> PathBuf {
    expand_home_with(path, std::env::var("HOME").ok().as_deref())
}

/// `~/` expansion against an explicit home; without one the path is unchanged.
pub fn expand_home_with(path: &str, home: Option<&str>) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = home
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}
