//! Configuration for a shinode node agent.
//!
//! One TOML file describes one node: where the host lives, the device id,
//! and how to find the bearer token. `SHINODE_*` environment variables
//! override file values. [`Config::to_agent_config`] validates the result
//! and produces a [`shinode_core::AgentConfig`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shinode_core::{AgentConfig, BatchPolicy, TlsMode};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no token configured for device '{device_id}'")]
    NoToken { device_id: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config ─────────────────────────────────────────────────────

/// On-disk node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Host base URL (e.g., "https://host.example/api/nodes").
    #[serde(default, deserialize_with = "string_or_number")]
    pub host: String,

    /// Numeric ids (`device_id = 1234`) are accepted and kept as text.
    #[serde(default, deserialize_with = "string_or_number")]
    pub device_id: String,

    /// Bearer token (plaintext; prefer `token_env`).
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub token: Option<String>,

    /// Environment variable name containing the bearer token.
    pub token_env: Option<String>,

    /// Path to a PEM CA certificate for the host.
    pub ca_cert: Option<PathBuf>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// "fail-fast" or "collect-partial".
    #[serde(default = "default_batch_policy")]
    pub batch_policy: String,

    #[serde(default = "default_initial_sense")]
    pub initial_sense: bool,

    /// Runner tick in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: String::new(),
            device_id: String::new(),
            token: None,
            token_env: None,
            ca_cert: None,
            timeout: default_timeout(),
            batch_policy: default_batch_policy(),
            initial_sense: default_initial_sense(),
            tick_ms: default_tick_ms(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_batch_policy() -> String {
    BatchPolicy::default().to_string()
}
fn default_initial_sense() -> bool {
    true
}
fn default_tick_ms() -> u64 {
    1000
}

/// A TOML scalar where a string is expected.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Int(n) => n.to_string(),
            Self::UInt(n) => n.to_string(),
            Self::Float(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Scalar::deserialize(deserializer).map(Scalar::into_string)
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Scalar>::deserialize(deserializer).map(|v| v.map(Scalar::into_string))
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "shinode", "shinode").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("shinode");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Loading / saving ────────────────────────────────────────────────

/// Load the config from the platform path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Keys read verbatim from the environment. The `Env` provider would parse
/// `SHINODE_TOKEN=007` as the number 7.
const STRING_KEYS: [&str; 4] = ["host", "device_id", "token", "token_env"];

/// Load the config from `path` plus `SHINODE_*` environment overrides.
///
/// A missing file is not an error; defaults and environment still apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let mut figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SHINODE_").ignore(&STRING_KEYS));

    for key in STRING_KEYS {
        if let Ok(value) = std::env::var(format!("SHINODE_{}", key.to_uppercase())) {
            figment = figment.merge(Serialized::default(key, value));
        }
    }

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Write `cfg` as TOML, creating parent directories.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution ────────────────────────────────────────────────

/// Resolve the bearer token: `token_env` lookup first, then plaintext.
pub fn resolve_token(cfg: &Config) -> Result<SecretString, ConfigError> {
    if let Some(ref env_name) = cfg.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    if let Some(ref token) = cfg.token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoToken {
        device_id: cfg.device_id.clone(),
    })
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Validate and convert into the agent's runtime configuration.
    pub fn to_agent_config(&self) -> Result<AgentConfig, ConfigError> {
        let host: url::Url = self.host.parse().map_err(|_| ConfigError::Validation {
            field: "host".into(),
            reason: format!("invalid URL: '{}'", self.host),
        })?;

        if self.device_id.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "device_id".into(),
                reason: "must not be empty".into(),
            });
        }

        if self.tick_ms == 0 {
            return Err(ConfigError::Validation {
                field: "tick_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }

        let batch_policy: BatchPolicy =
            self.batch_policy
                .parse()
                .map_err(|reason| ConfigError::Validation {
                    field: "batch_policy".into(),
                    reason,
                })?;

        let token = resolve_token(self)?;

        let tls = match self.ca_cert {
            Some(ref ca_path) => TlsMode::CustomCa(ca_path.clone()),
            None => TlsMode::System,
        };

        let mut agent = AgentConfig::new(host, self.device_id.clone(), token);
        agent.tls = tls;
        agent.timeout = Duration::from_secs(self.timeout);
        agent.batch_policy = batch_policy;
        agent.initial_sense = self.initial_sense;
        agent.tick = Duration::from_millis(self.tick_ms);
        Ok(agent)
    }
}
