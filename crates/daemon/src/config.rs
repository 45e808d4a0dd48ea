// Daemon configuration
//
// Sources, later ones winning: built-in defaults, optional TOML file
// (devdash.toml or $DEVDASH_CONFIG), DEVDASH_* environment variables.

use anyhow::{bail, Context, Result};
use devdash_storage::Engine;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://~/.devdash/dashboard.db";
const DEFAULT_CONFIG_FILE: &str = "devdash.toml";
const ENV_PREFIX: &str = "DEVDASH";

#[derive(Clone, Deserialize)]
pub struct DaemonConfig {
    pub database_url: String,
    /// Operator hint only; the attached schema binding decides
    pub engine: Option<String>,
    pub max_connections: u32,
    /// Base64 AES-256 key for OAuth token storage
    pub token_key: Option<String>,
    pub retention_days: i64,
    pub cleanup_interval_hours: u64,
    pub stats_interval_secs: u64,
    pub log_format: String,
    pub log_dir: Option<String>,
}

impl DaemonConfig {
    pub fn load() -> Result<Self> {
        let path = std::env::var(format!("{}_CONFIG", ENV_PREFIX))
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path, None)
    }

    /// `env` replaces the process environment (tests)
    pub fn load_from(path: &Path, env: Option<HashMap<String, String>>) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("database_url", DEFAULT_DATABASE_URL)?
            .set_default("max_connections", 10)?
            .set_default("retention_days", 7)?
            .set_default("cleanup_interval_hours", 24)?
            .set_default("stats_interval_secs", 60)?
            .set_default("log_format", "pretty")?
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .context("Failed to read configuration")?;

        let config: DaemonConfig = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            bail!("max_connections must be at least 1");
        }
        if self.retention_days < 0 {
            bail!("retention_days must not be negative");
        }
        if self.cleanup_interval_hours == 0 || self.stats_interval_secs == 0 {
            bail!("cleanup_interval_hours and stats_interval_secs must be positive");
        }
        self.engine_hint()?;
        Ok(())
    }

    pub fn engine_hint(&self) -> Result<Option<Engine>> {
        self.engine
            .as_deref()
            .map(|hint| hint.parse::<Engine>())
            .transpose()
            .map_err(Into::into)
    }

    /// Database URL with `~` expanded in SQLite paths
    pub fn resolved_database_url(&self) -> String {
        match self.database_url.strip_prefix("sqlite://") {
            Some(path) => format!("sqlite://{}", shellexpand::tilde(path)),
            None => self.database_url.clone(),
        }
    }

    /// Filesystem path of a file-backed SQLite database
    pub fn sqlite_path(&self) -> Option<PathBuf> {
        let url = self.resolved_database_url();
        let path = url.strip_prefix("sqlite://")?;
        let path = path.split('?').next().unwrap_or(path);
        (!path.is_empty() && !path.contains(":memory:")).then(|| PathBuf::from(path))
    }
}

// token_key and database credentials stay out of logs
impl std::fmt::Debug for DaemonConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scheme = self.database_url.split(':').next().unwrap_or_default();
        f.debug_struct("DaemonConfig")
            .field("database", &scheme)
            .field("engine", &self.engine)
            .field("max_connections", &self.max_connections)
            .field("token_key", &self.token_key.as_ref().map(|_| "<redacted>"))
            .field("retention_days", &self.retention_days)
            .field("cleanup_interval_hours", &self.cleanup_interval_hours)
            .field("stats_interval_secs", &self.stats_interval_secs)
            .field("log_format", &self.log_format)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}
