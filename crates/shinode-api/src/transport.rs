// Transport configuration for building the reqwest::Client that talks
// to the host. Trust roots, timeout, and the bearer header live here so
// `HostClient` only deals with URLs and bodies.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

const USER_AGENT: &str = concat!("shinode/", env!("CARGO_PKG_VERSION"));

/// TLS trust mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsMode {
    /// Use the bundled / system certificate store.
    #[default]
    System,
    /// Trust an additional root CA from the given PEM file.
    CustomCa(PathBuf),
}

/// Transport configuration for the host HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` that sends `Authorization: Bearer <token>`
    /// on every request.
    pub fn build_client(&self, token: &SecretString) -> Result<reqwest::Client, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer_header(token)?);

        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers);

        if let TlsMode::CustomCa(path) = &self.tls {
            let cert_pem = std::fs::read(path)
                .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
            let cert = reqwest::Certificate::from_pem(&cert_pem)
                .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}

/// Encode a token as a sensitive `Bearer` header value.
pub fn bearer_header(token: &SecretString) -> Result<HeaderValue, Error> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret())).map_err(
        |e| Error::Authentication {
            message: format!("invalid token header value: {e}"),
        },
    )?;
    value.set_sensitive(true);
    Ok(value)
}
