//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `FTW_ROOT_FOLDER` environment variable
//! 3. `root_folder` key in the TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable config file is never fatal: the service logs a
//! warning and runs on defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "FTW_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "ftw.db";

/// Governance ledger location relative to the root folder
pub const GOVERNANCE_LEDGER_FILE: &str = "artifacts/governance-ledger.json";

/// Logging section of the TOML config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Service configuration read from `config.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database and ledger artifacts
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Content classifier endpoint; `None` makes every classification fail
    /// over to the crypto processor
    #[serde(default)]
    pub classifier_url: Option<String>,

    /// Interval for the in-process drop scheduler, 0 disables it
    #[serde(default)]
    pub drop_scheduler_interval_secs: u64,

    /// How old an admin request timestamp may be
    #[serde(default = "default_auth_window_ms")]
    pub auth_window_ms: i64,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            bind_address: default_bind_address(),
            port: default_port(),
            classifier_url: None,
            drop_scheduler_interval_secs: 0,
            auth_window_ms: default_auth_window_ms(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5780
}

fn default_auth_window_ms() -> i64 {
    30_000
}

impl TomlConfig {
    /// Parse a config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Read a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Load the config
    ///
    /// An explicit path must exist and parse. Without one, the first default
    /// config file is used; if it is unusable the defaults apply.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let config = Self::from_file(path)?;
            debug!("Loaded config from {}", path.display());
            return Ok(config);
        }

        let Some(path) = default_config_file() else {
            return Ok(Self::default());
        };
        match Self::from_file(&path) {
            Ok(config) => {
                debug!("Loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Ok(Self::default())
            }
        }
    }
}

/// First existing config file in the platform search order
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("ftw").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/ftw/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("ftw"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/ftw"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("ftw"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/ftw"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("ftw"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\ftw"))
    } else {
        PathBuf::from("./ftw_data")
    }
}

/// Resolves the root folder across CLI, environment, TOML and defaults
pub struct RootFolderResolver<'a> {
    cli_arg: Option<PathBuf>,
    toml: Option<&'a TomlConfig>,
}

impl<'a> RootFolderResolver<'a> {
    pub fn new() -> Self {
        Self {
            cli_arg: None,
            toml: None,
        }
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml(mut self, config: &'a TomlConfig) -> Self {
        self.toml = Some(config);
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = self.toml.and_then(|c| c.root_folder.clone()) {
            return path;
        }

        default_root_folder()
    }
}

impl Default for RootFolderResolver<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Creates the root folder layout and hands out paths inside it
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root and artifacts directories (idempotent)
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(self.root.join("artifacts"))?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    pub fn governance_ledger_path(&self) -> PathBuf {
        self.root.join(GOVERNANCE_LEDGER_FILE)
    }
}
