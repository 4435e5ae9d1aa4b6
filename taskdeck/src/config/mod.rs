//! Configuration system for the board.
//!
//! Supports layered configuration with the following priority (highest
//! first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskdeck/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

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
    board: BoardFileConfig,
    session: SessionFileConfig,
}

/// `[board]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct BoardFileConfig {
    guard_window_ms: Option<u64>,
    defer_delay_ms: Option<u64>,
    notice_timeout_ms: Option<u64>,
    order_step: Option<i64>,
    channel_capacity: Option<usize>,
}

/// `[session]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SessionFileConfig {
    user_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Board timing and ordering knobs (used by `BoardSession`).
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// How long after a local optimistic edit incoming feed snapshots
    /// are deferred rather than applied.
    pub guard_window: Duration,
    /// How long after arrival a deferred snapshot is reapplied
    /// (guard window plus a settling margin).
    pub defer_delay: Duration,
    /// How long a transient notice stays visible before auto-dismissal.
    pub notice_timeout: Duration,
    /// Spacing between renumbered order values.
    pub order_step: i64,
    /// Capacity of the command/event channels.
    pub channel_capacity: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            guard_window: Duration::from_millis(1000),
            defer_delay: Duration::from_millis(1500),
            notice_timeout: Duration::from_millis(2000),
            order_step: 1000,
            channel_capacity: 64,
        }
    }
}

/// Fully resolved application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Signed-in user id for the demo session.
    pub user_id: String,
    /// Board knobs.
    pub board: BoardConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_id: "demo-user".to_string(),
            board: BoardConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration by merging CLI args and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicitly named config file cannot
    /// be read or any file fails to parse.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve an `AppConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default. Separated from `load()` to enable
    /// unit testing without CLI parsing.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();
        let board_defaults = defaults.board;

        Self {
            user_id: cli
                .user_id
                .clone()
                .or_else(|| file.session.user_id.clone())
                .unwrap_or(defaults.user_id),
            board: BoardConfig {
                guard_window: file
                    .board
                    .guard_window_ms
                    .map_or(board_defaults.guard_window, Duration::from_millis),
                defer_delay: file
                    .board
                    .defer_delay_ms
                    .map_or(board_defaults.defer_delay, Duration::from_millis),
                notice_timeout: file
                    .board
                    .notice_timeout_ms
                    .map_or(board_defaults.notice_timeout, Duration::from_millis),
                order_step: file.board.order_step.unwrap_or(board_defaults.order_step),
                channel_capacity: file
                    .board
                    .channel_capacity
                    .unwrap_or(board_defaults.channel_capacity),
            },
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Kanban task board with optimistic sync")]
pub struct CliArgs {
    /// Signed-in user id for the demo session.
    #[arg(long, env = "TASKDECK_USER")]
    pub user_id: Option<String>,

    /// Path to config file (default: `~/.config/taskdeck/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKDECK_LOG")]
    pub log_level: String,

    /// Path to a log file (default: stderr).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and a missing
/// file is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            // No config dir available: use defaults.
            return Ok(ConfigFile::default());
        };
        config_dir.join("taskdeck").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
