//! Bootstrap configuration loading
//!
//! Configuration file resolution order:
//! 1. Command-line `--config` argument (highest priority)
//! 2. `AUDIOFORM_CONFIG` environment variable
//! 3. `~/.config/audioform/config.toml` (platform config dir)
//! 4. `/etc/audioform/config.toml` (Linux only)
//! 5. Compiled defaults (fallback)
//!
//! A missing config file is never fatal: the service logs a warning and starts
//! on compiled defaults. A file that exists but does not parse is an error.

use crate::tenants::TenantTable;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "AUDIOFORM_CONFIG";

/// Default table name for stored submissions
pub const DEFAULT_TABLE: &str = "audio_form_responses";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// SQLite database file (sqlite store only)
    ///
    /// If not specified, falls back to the platform data directory.
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Directory holding `intro.mp3` and `employment.mp3`
    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,

    /// Upper bound on a single submission insert
    #[serde(default = "default_submit_timeout_ms")]
    pub submit_timeout_ms: u64,

    /// Idle sessions older than this are evicted
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Delay before the confirmation page returns to the landing route
    #[serde(default = "default_redirect_delay_secs")]
    pub redirect_delay_secs: u64,

    /// Route the confirmation page returns to
    #[serde(default = "default_landing_path")]
    pub landing_path: String,

    /// Bearer token protecting the reporting API (unset disables the check)
    #[serde(default)]
    pub dashboard_token: Option<String>,

    /// Submission store backend
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Tenant routes (empty means the built-in table)
    #[serde(default)]
    pub tenants: Vec<TenantConfig>,
}

/// Which submission store the service writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Local SQLite database
    #[default]
    Sqlite,
    /// Hosted PostgREST-style table endpoint
    Rest,
    /// In-process store, lost on restart
    Memory,
}

impl std::str::FromStr for StoreKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreKind::Sqlite),
            "rest" => Ok(StoreKind::Rest),
            "memory" => Ok(StoreKind::Memory),
            other => Err(Error::Config(format!("Unknown store kind: {}", other))),
        }
    }
}

/// Submission store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub kind: StoreKind,

    /// Base URL of the hosted backend (rest store only)
    #[serde(default)]
    pub url: Option<String>,

    /// API key sent with every request (rest store only)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Table holding submissions
    #[serde(default = "default_table")]
    pub table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            url: None,
            api_key: None,
            table: default_table(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
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

/// One `[[tenants]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct TenantConfig {
    pub path: String,
    pub company: String,
}

fn default_port() -> u16 {
    5730
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_audio_dir() -> PathBuf {
    PathBuf::from("audio")
}

fn default_submit_timeout_ms() -> u64 {
    10_000
}

fn default_session_ttl_secs() -> u64 {
    3600
}

fn default_redirect_delay_secs() -> u64 {
    5
}

fn default_landing_path() -> String {
    "/".to_string()
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            database_path: None,
            audio_dir: default_audio_dir(),
            submit_timeout_ms: default_submit_timeout_ms(),
            session_ttl_secs: default_session_ttl_secs(),
            redirect_delay_secs: default_redirect_delay_secs(),
            landing_path: default_landing_path(),
            dashboard_token: None,
            store: StoreConfig::default(),
            logging: LoggingConfig::default(),
            tenants: Vec::new(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.submit_timeout_ms == 0 {
            return Err(Error::Config("submit_timeout_ms must be positive".to_string()));
        }
        if !self.landing_path.starts_with('/') {
            return Err(Error::Config(format!(
                "landing_path must start with '/': {}",
                self.landing_path
            )));
        }
        if self.store.kind == StoreKind::Rest && self.store.url.is_none() {
            return Err(Error::Config("store.url is required for the rest store".to_string()));
        }
        for tenant in &self.tenants {
            if !tenant.path.starts_with('/') {
                return Err(Error::Config(format!(
                    "tenant path must start with '/': {}",
                    tenant.path
                )));
            }
        }
        Ok(())
    }

    /// Database file, falling back to the platform data directory
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(default_database_path)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Tenant table from `[[tenants]]`, or the built-in table when none are listed
    pub fn tenant_table(&self) -> TenantTable {
        if self.tenants.is_empty() {
            TenantTable::builtin()
        } else {
            TenantTable::from_pairs(
                self.tenants
                    .iter()
                    .map(|t| (t.path.clone(), t.company.clone())),
            )
        }
    }
}

/// Locate the config file following the documented priority order
///
/// Returns `None` when no candidate exists; callers then use compiled defaults.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: User config directory
    if let Some(path) = dirs::config_dir().map(|d| d.join("audioform").join("config.toml")) {
        if path.exists() {
            return Some(path);
        }
    }

    // Priority 4: System-wide config (Linux)
    if cfg!(target_os = "linux") {
        let system = PathBuf::from("/etc/audioform/config.toml");
        if system.exists() {
            return Some(system);
        }
    }

    None
}

/// Load configuration, degrading to compiled defaults when no file is available
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = resolve_config_path(cli_arg) else {
        info!("No config file found, using compiled defaults");
        return Ok(TomlConfig::default());
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let config = TomlConfig::from_toml_str(&content)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
            info!("Loaded config from {}", path.display());
            Ok(config)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("audioform"))
        .unwrap_or_else(|| PathBuf::from("./audioform_data"))
        .join("audioform.db")
}
