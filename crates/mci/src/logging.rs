use std::path::PathBuf;

use env_flags::env_flags;
use once_cell::sync::OnceCell;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, Layer, Registry, prelude::*};

use mci::config::{UserConfig, expand_home};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Json,
    Compact,
    Pretty,
    Full,
}

static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// `MCI_HOME`, else `$HOME/.mci`, else `./.mci`.
pub fn mci_home() -> PathBuf {
    env_flags! {
        /// MCI home directory (absolute). Defaults to $HOME/.mci
        MCI_HOME: &str = "";
    }
    if !(*MCI_HOME).is_empty() {
        PathBuf::from((*MCI_HOME).to_string())
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".mci")
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".mci")
    }
}

/// Install the global subscriber. Logs always go to stderr so stdout carries
/// only command output.
pub fn init_tracing(mci_home: &std::path::Path, user_cfg: Option<&UserConfig>) {
    env_flags! {
        /// Tracing filter, e.g. "info" or "mci=debug". Overrides RUST_LOG when set.
        MCI_LOG: &str = "";
        RUST_LOG: &str = "warn";
        /// JSON formatting for logs
        MCI_LOG_JSON: bool = false;
        /// Compact single-line formatting (ignored if MCI_LOG_JSON=true)
        MCI_LOG_COMPACT: bool = true;
        /// Pretty multi-line formatting (ignored if JSON or compact is on)
        MCI_LOG_PRETTY: bool = false;
        /// Also log to a daily file under <MCI_HOME>/logs or MCI_LOG_DIR
        MCI_LOG_TO_FILE: bool = false;
        /// Explicit log directory
        MCI_LOG_DIR: &str = "";
    }

    let env_set = |k: &str| std::env::var_os(k).is_some();

    let mut filter_spec = if !(*MCI_LOG).is_empty() {
        (*MCI_LOG).to_string()
    } else {
        (*RUST_LOG).to_string()
    };
    let mut json = *MCI_LOG_JSON;
    let mut compact = *MCI_LOG_COMPACT;
    let mut pretty = *MCI_LOG_PRETTY;
    let mut to_file = *MCI_LOG_TO_FILE;
    let mut log_dir: Option<PathBuf> = if !(*MCI_LOG_DIR).is_empty() {
        Some(PathBuf::from((*MCI_LOG_DIR).to_string()))
    } else {
        None
    };

    if let Some(cfg) = user_cfg.and_then(|c| c.logging.as_ref()) {
        if !(env_set("MCI_LOG") || env_set("RUST_LOG"))
            && let Some(level) = cfg.level.as_ref()
        {
            filter_spec = level.clone();
        }
        if !env_set("MCI_LOG_JSON")
            && let Some(v) = cfg.json
        {
            json = v;
        }
        if !env_set("MCI_LOG_COMPACT")
            && let Some(v) = cfg.compact
        {
            compact = v;
        }
        if !env_set("MCI_LOG_PRETTY")
            && let Some(v) = cfg.pretty
        {
            pretty = v;
        }
        if !env_set("MCI_LOG_TO_FILE")
            && let Some(v) = cfg.to_file
        {
            to_file = v;
        }
        if !env_set("MCI_LOG_DIR")
            && let Some(dir) = cfg.dir.as_ref()
        {
            log_dir = Some(expand_home(dir));
        }
    }

    let style = if json {
        Style::Json
    } else if compact {
        Style::Compact
    } else if pretty {
        Style::Pretty
    } else {
        Style::Full
    };

    let filter = EnvFilter::try_new(filter_spec).unwrap_or_else(|_| EnvFilter::new("warn"));
    let mut layers: Vec<BoxedLayer> = vec![fmt_layer(style, std::io::stderr, true)];

    let mut dir_error = None;
    if to_file {
        let dir = log_dir.unwrap_or_else(|| mci_home.join("logs"));
        match std::fs::create_dir_all(&dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(dir, "mci.log");
                let (nb, guard) = tracing_appender::non_blocking(appender);
                let _ = FILE_GUARD.set(guard);
                layers.push(fmt_layer(style, nb, false));
            }
            Err(e) => dir_error = Some((dir, e)),
        }
    }

    let subscriber = tracing_subscriber::registry().with(layers).with(filter);
    if let Err(e) = subscriber.try_init() {
        tracing::debug!("tracing already set: {:?}", e);
    }
    if let Some((dir, e)) = dir_error {
        tracing::warn!("failed to create log dir {}: {}", dir.display(), e);
    }
}

fn fmt_layer<W>(style: Style, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let base = tracing_subscriber::fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_target(true)
        .with_ansi(ansi)
        .with_writer(writer);
    match style {
        Style::Json => base.json().boxed(),
        Style::Compact => base.compact().boxed(),
        Style::Pretty => base.pretty().boxed(),
        Style::Full => base.boxed(),
    }
}
