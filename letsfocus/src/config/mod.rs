//! Configuration system for the `letsfocus` command-line client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/letsfocus/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    server: ServerFileConfig,
    view: ViewFileConfig,
}

/// `[server]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    url: Option<String>,
    token: Option<String>,
}

/// `[view]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ViewFileConfig {
    preferences_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the task server.
    pub server_url: String,
    /// Bearer token; required for every API call.
    pub token: Option<String>,
    /// Where saved view preferences live.
    pub preferences_file: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".to_string(),
            token: None,
            preferences_file: default_preferences_file(),
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, file))
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: ConfigFile) -> Self {
        let defaults = Self::default();
        Self {
            server_url: cli
                .server_url
                .clone()
                .or(file.server.url)
                .unwrap_or(defaults.server_url),
            token: cli.token.clone().or(file.server.token),
            preferences_file: cli
                .preferences
                .clone()
                .or(file.view.preferences_file)
                .unwrap_or(defaults.preferences_file),
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Focused to-do lists from the terminal")]
pub struct CliArgs {
    /// Base URL of the task server.
    #[arg(long, env = "LETSFOCUS_URL")]
    pub server_url: Option<String>,

    /// Session token sent as `Authorization: Bearer`.
    #[arg(long, env = "LETSFOCUS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Path to config file (default: `~/.config/letsfocus/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the saved view preferences.
    #[arg(long)]
    pub preferences: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "LETSFOCUS_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/letsfocus.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Client subcommands.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show tasks through the saved view, optionally overriding it.
    List {
        /// Sort key: manual, due_date, priority, created_at, title.
        #[arg(long)]
        sort: Option<String>,
        /// Reverse the sort direction.
        #[arg(long)]
        desc: bool,
        /// Include completed tasks.
        #[arg(long)]
        all: bool,
        /// Only tasks with this tag.
        #[arg(long)]
        tag: Option<String>,
        /// Only focus tasks.
        #[arg(long)]
        focus: bool,
        /// Only tasks whose title or description contains this text.
        #[arg(long)]
        search: Option<String>,
        /// Store these settings as the saved view.
        #[arg(long)]
        save: bool,
    },
    /// Add a task at the end of the list.
    Add {
        title: String,
        /// Priority: low, medium, high.
        #[arg(long)]
        priority: Option<String>,
        /// Pin to the focus view.
        #[arg(long)]
        focus: bool,
        /// Tag (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Move a task to a new position (1-based) in the manual order.
    Move {
        /// Task id, or its current 1-based position.
        task: String,
        /// Target 1-based position.
        to: usize,
    },
    /// Re-space the whole manual order.
    Renormalize,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn default_preferences_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("letsfocus")
        .join("view.toml")
}

/// Load and parse a TOML config file.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("letsfocus").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
