use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Result, ScrobbleMendError};

/// Top-level application configuration.
///
/// Loaded from an optional TOML file layered under `SCROBBLE_MEND_*`
/// environment variables. Missing API credentials are a fatal
/// configuration error detected at load time, before any request is
/// attempted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub lastfm: LastFmConfig,
    pub server: ServerConfig,
    pub delete: DeleteConfig,
}

/// Upstream service endpoints and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastFmConfig {
    /// API key issued by the upstream service
    pub api_key: String,
    /// Shared secret used to sign authenticated requests
    pub api_secret: String,
    /// Web-service root for signed and unsigned API calls
    pub api_url: String,
    /// Website root, used for the auth redirect and the web delete endpoint
    pub www_url: String,
}

/// Where the internal HTTP surface listens and how it addresses itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP server
    pub bind: String,
    /// Externally visible base URL, used in auth callback and redirects
    pub public_url: String,
}

/// Pacing for the sequential delete loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteConfig {
    /// Fixed pause between consecutive deletion requests, in milliseconds
    pub delay_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            lastfm: LastFmConfig {
                api_key: String::new(),
                api_secret: String::new(),
                api_url: "https://ws.audioscrobbler.com/2.0/".to_string(),
                www_url: "https://www.last.fm".to_string(),
            },
            server: ServerConfig {
                bind: "127.0.0.1:3000".to_string(),
                public_url: "http://localhost:3000".to_string(),
            },
            delete: DeleteConfig { delay_ms: 1000 },
        }
    }
}

impl AppConfig {
    /// Candidate configuration file locations, in order of preference.
    pub fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("scrobble-mend.toml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("scrobble-mend").join("config.toml"));
        }
        paths
    }

    /// Load configuration from the default file locations and environment.
    ///
    /// Priority: environment variables over the configuration file over
    /// built-in defaults.
    pub fn load() -> Result<Self> {
        Self::load_with_file::<&str>(None)
    }

    /// Load configuration with an explicit config file path.
    pub fn load_with_file<P: AsRef<Path>>(config_file: Option<P>) -> Result<Self> {
        let mut builder = Config::builder().add_source(
            Config::try_from(&Self::default())
                .map_err(|e| ScrobbleMendError::Config(e.to_string()))?,
        );

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path.as_ref()));
        } else {
            for candidate in Self::default_config_paths() {
                if candidate.exists() {
                    builder = builder.add_source(File::from(candidate));
                    break;
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("SCROBBLE_MEND")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ScrobbleMendError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations missing the upstream credentials.
    pub fn validate(&self) -> Result<()> {
        if self.lastfm.api_key.is_empty() {
            return Err(ScrobbleMendError::Config(
                "lastfm.api_key is not set (SCROBBLE_MEND__LASTFM__API_KEY)".to_string(),
            ));
        }
        if self.lastfm.api_secret.is_empty() {
            return Err(ScrobbleMendError::Config(
                "lastfm.api_secret is not set (SCROBBLE_MEND__LASTFM__API_SECRET)".to_string(),
            ));
        }
        Ok(())
    }
}
