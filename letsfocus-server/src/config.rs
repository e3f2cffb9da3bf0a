//! Configuration system for the Let's Focus server.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/letsfocus-server/config.toml`)
//! 4. Compiled defaults

use std::path::PathBuf;

use letsfocus_proto::order::{DEFAULT_MIN_GAP, DEFAULT_RENORMALIZE_SPACING};

/// Errors that can occur when loading server configuration.
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

    /// A `--session` argument was not of the form `token:owner`.
    #[error("invalid session {0:?}: expected TOKEN:OWNER")]
    InvalidSession(String),

    /// The ordering thresholds are unusable.
    #[error("invalid ordering settings: {0}")]
    InvalidOrdering(String),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure for the server.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerConfigFile {
    server: ServerFileConfig,
    ordering: OrderingFileConfig,
    auth: AuthFileConfig,
}

/// `[server]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    bind_addr: Option<String>,
    data_file: Option<PathBuf>,
}

/// `[ordering]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct OrderingFileConfig {
    min_gap: Option<f64>,
    renormalize_spacing: Option<f64>,
}

/// `[auth]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct AuthFileConfig {
    sessions: Vec<SessionEntry>,
}

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// CLI arguments for the server.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Let's Focus task server")]
pub struct ServerCliArgs {
    /// Address to bind the HTTP server to.
    #[arg(short, long, env = "LETSFOCUS_ADDR")]
    pub bind: Option<String>,

    /// Path to config file (default: `~/.config/letsfocus-server/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Snapshot file used to persist tasks across restarts.
    #[arg(long, env = "LETSFOCUS_DATA_FILE")]
    pub data_file: Option<PathBuf>,

    /// Extra session in `TOKEN:OWNER` form (repeatable).
    #[arg(long = "session")]
    pub sessions: Vec<String>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "LETSFOCUS_LOG")]
    pub log_level: String,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// A bearer token and the owner it authenticates.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct SessionEntry {
    pub token: String,
    pub owner: String,
}

/// Thresholds for fractional ordering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderingConfig {
    /// Neighbour gap below which the owner's list is re-normalized.
    pub min_gap: f64,
    /// Spacing between consecutive orders after re-normalization.
    pub renormalize_spacing: f64,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            min_gap: DEFAULT_MIN_GAP,
            renormalize_spacing: DEFAULT_RENORMALIZE_SPACING,
        }
    }
}

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to (e.g., `0.0.0.0:8080`).
    pub bind_addr: String,
    /// Optional snapshot file; `None` keeps tasks in memory only.
    pub data_file: Option<PathBuf>,
    /// Ordering thresholds.
    pub ordering: OrderingConfig,
    /// Known sessions, file entries first, then CLI entries.
    pub sessions: Vec<SessionEntry>,
    /// Log level filter string.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            data_file: None,
            ordering: OrderingConfig::default(),
            sessions: Vec::new(),
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an error.
    /// If no `--config` is given, the default path is tried and missing file
    /// is treated as empty config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed, a `--session` value is malformed, or the ordering
    /// thresholds are not positive and finite.
    pub fn load(cli: &ServerCliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, file)
    }

    /// Resolve a `ServerConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    fn resolve(cli: &ServerCliArgs, file: ServerConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let ordering = OrderingConfig {
            min_gap: file.ordering.min_gap.unwrap_or(defaults.ordering.min_gap),
            renormalize_spacing: file
                .ordering
                .renormalize_spacing
                .unwrap_or(defaults.ordering.renormalize_spacing),
        };
        validate_ordering(ordering)?;

        let mut sessions = file.auth.sessions;
        for raw in &cli.sessions {
            sessions.push(parse_session(raw)?);
        }

        Ok(Self {
            bind_addr: cli
                .bind
                .clone()
                .or(file.server.bind_addr)
                .unwrap_or(defaults.bind_addr),
            data_file: cli.data_file.clone().or(file.server.data_file),
            ordering,
            sessions,
            log_level: cli.log_level.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_ordering(ordering: OrderingConfig) -> Result<(), ConfigError> {
    let OrderingConfig {
        min_gap,
        renormalize_spacing,
    } = ordering;
    if !min_gap.is_finite() || min_gap <= 0.0 {
        return Err(ConfigError::InvalidOrdering(format!(
            "min_gap must be positive, got {min_gap}"
        )));
    }
    if !renormalize_spacing.is_finite() || renormalize_spacing <= min_gap * 2.0 {
        return Err(ConfigError::InvalidOrdering(format!(
            "renormalize_spacing must exceed twice min_gap, got {renormalize_spacing}"
        )));
    }
    Ok(())
}

fn parse_session(raw: &str) -> Result<SessionEntry, ConfigError> {
    match raw.split_once(':') {
        Some((token, owner)) if !token.is_empty() && !owner.is_empty() => Ok(SessionEntry {
            token: token.to_string(),
            owner: owner.to_string(),
        }),
        _ => Err(ConfigError::InvalidSession(raw.to_string())),
    }
}

/// Load and parse a TOML config file for the server.
fn load_config_file(
    explicit_path: Option<&std::path::Path>,
) -> Result<ServerConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ServerConfigFile::default());
        };
        config_dir.join("letsfocus-server").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ServerConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
