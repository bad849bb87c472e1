use thiserror::Error;

/// Top-level error type for the `shinode-api` crate.
///
/// Covers every failure mode of talking to the host: authentication,
/// transport, non-success responses, and body decoding.
/// `shinode-core` maps these into agent-level diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The host rejected the bearer token (401 / 403), or the token
    /// could not be encoded as a header value.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS trust root or client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Host ────────────────────────────────────────────────────────
    /// Non-success status from the host (other than auth failures).
    #[error("Host error (HTTP {status}): {message}")]
    Host { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the host refused our credentials.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Host { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Host { status, .. } => Some(*status),
            _ => None,
        }
    }
}
