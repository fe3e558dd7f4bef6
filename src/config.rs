use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Port the service listens on when neither the config file nor
/// `SBERT_SERVICE_PORT` says otherwise.
pub const DEFAULT_PORT: u16 = 3005;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SbertConfig {
    pub server: ServerConfig,
    pub embedding: EmbeddingConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
    pub intra_threads: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClientConfig {
    pub service_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            log_level: "info".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_sbert_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
            intra_threads: 4,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service_url: format!("http://localhost:{DEFAULT_PORT}"),
        }
    }
}

/// Returns `~/.sbert/`, or `./.sbert/` when no home directory is known.
pub fn default_sbert_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sbert")
}

/// Returns the config file path: `$SBERT_CONFIG` or `~/.sbert/config.toml`.
pub fn default_config_path() -> PathBuf {
    match std::env::var("SBERT_CONFIG") {
        Ok(path) => PathBuf::from(path),
        Err(_) => default_sbert_dir().join("config.toml"),
    }
}

impl SbertConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            SbertConfig::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides (SBERT_SERVICE_PORT, SBERT_HOST,
    /// SBERT_LOG_LEVEL, SBERT_MODEL_DIR, SBERT_SERVICE_URL).
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("SBERT_SERVICE_PORT") {
            self.server.port = parse_port(&val)?;
        }
        if let Ok(val) = std::env::var("SBERT_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("SBERT_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("SBERT_MODEL_DIR") {
            self.embedding.cache_dir = val;
        }
        if let Ok(val) = std::env::var("SBERT_SERVICE_URL") {
            self.client.service_url = val;
        }
        Ok(())
    }

    /// `host:port` the HTTP service binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl EmbeddingConfig {
    /// Resolve the model cache directory, expanding `~` if needed.
    pub fn resolved_cache_dir(&self) -> PathBuf {
        expand_tilde(&self.cache_dir)
    }
}

fn parse_port(val: &str) -> Result<u16> {
    val.trim()
        .parse()
        .with_context(|| format!("invalid SBERT_SERVICE_PORT: {val:?}"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
