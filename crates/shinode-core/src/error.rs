// ── Core error types ──
//
// Agent-level errors. Transport failures from `shinode-api` are folded
// into connection / authentication / API variants by the `From` impl;
// capability failures carry the name of the sensor or controller.

use std::fmt;

use thiserror::Error;

/// Which half of the local configuration disagreed with the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchKind {
    Sensors,
    Controllers,
}

impl fmt::Display for MismatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensors => f.write_str("sensor"),
            Self::Controllers => f.write_str("control"),
        }
    }
}

/// Error returned by a sensor or controller implementation.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CapabilityError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CapabilityError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying driver error.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Handshake ────────────────────────────────────────────────────
    /// Local sensors or controllers are not all declared by the host.
    #[error("host {kind} data does not match node config (missing: {})", .missing.join(", "))]
    ConfigMismatch {
        kind: MismatchKind,
        missing: Vec<String>,
    },

    // ── Capabilities ─────────────────────────────────────────────────
    #[error("no controller named '{name}'")]
    UnknownController { name: String },

    #[error("duplicate {kind} name '{name}'")]
    DuplicateCapability { kind: MismatchKind, name: String },

    #[error("{name}: {source}")]
    Capability {
        name: String,
        #[source]
        source: CapabilityError,
    },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to host at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Host request timed out")]
    Timeout,

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Errors that no amount of re-polling will fix: the host disagrees
    /// with the node's configuration or refuses its token.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigMismatch { .. } | Self::AuthenticationFailed { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<shinode_api::Error> for CoreError {
    fn from(err: shinode_api::Error) -> Self {
        match err {
            shinode_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            shinode_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            shinode_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            shinode_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            shinode_api::Error::Host { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            shinode_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
