// ── Runtime agent configuration ──
//
// Describes how to reach the host and how the agent behaves. Carries the
// bearer token but never touches disk; `shinode-config` builds one of
// these from a TOML file and the environment.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

use shinode_api::TlsMode;

/// What a sensor or controller batch does when one member fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchPolicy {
    /// The first failure fails the whole batch; nothing is posted.
    #[default]
    FailFast,
    /// Failures become per-item error entries and the batch is posted.
    CollectPartial,
}

impl fmt::Display for BatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailFast => f.write_str("fail-fast"),
            Self::CollectPartial => f.write_str("collect-partial"),
        }
    }
}

impl FromStr for BatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail-fast" => Ok(Self::FailFast),
            "collect-partial" => Ok(Self::CollectPartial),
            other => Err(format!(
                "expected 'fail-fast' or 'collect-partial', got '{other}'"
            )),
        }
    }
}

/// Configuration for one node agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Host base URL; the handshake is a GET on this URL.
    pub host: Url,
    pub device_id: String,
    /// Static bearer credential.
    pub token: SecretString,
    pub tls: TlsMode,
    /// Per-request transport timeout.
    pub timeout: Duration,
    pub batch_policy: BatchPolicy,
    /// Report a first batch of readings right after the handshake.
    pub initial_sense: bool,
    /// How often `ConfiguredAgent::run` calls `sync()`; handed to the agent
    /// by `NodeAgent::from_config`. The host's polling interval
    /// still decides whether a call does any work.
    pub tick: Duration,
}

impl AgentConfig {
    pub fn new(host: Url, device_id: impl Into<String>, token: SecretString) -> Self {
        Self {
            host,
            device_id: device_id.into(),
            token,
            tls: TlsMode::default(),
            timeout: Duration::from_secs(30),
            batch_policy: BatchPolicy::default(),
            initial_sense: true,
            tick: Duration::from_secs(1),
        }
    }
}
