// Async HTTP client for the shinode host.
//
// Endpoints (relative to the host base URL):
//   GET  /                      handshake, returns HostConfig
//   POST /{device_id}/sense     sensor batch, returns control actions
//   POST /{device_id}/control   controller outcomes, response ignored
// Auth: `Authorization: Bearer <token>` default header.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::host::Host;
use crate::transport::TransportConfig;
use crate::types::{ControllerInput, HostConfig, ReportEntry};

const SENSE_PATH: &str = "sense";
const CONTROL_PATH: &str = "control";

/// Async client for the host API.
#[derive(Clone)]
pub struct HostClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HostClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a bearer token and transport config.
    pub fn new(
        base_url: &str,
        token: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client(token)?;
        Self::from_reqwest(base_url, http)
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Parse the base URL and make sure it ends with `/` so relative
    /// joins stay under it.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        if url.cannot_be_a_base() {
            return Err(Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// `{base}/{device_id}/{leaf}`, with the device id percent-encoded
    /// as a single path segment.
    fn device_url(&self, device_id: &str, leaf: &str) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(device_id)
            .push(leaf);
        Ok(url)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        Self::handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, Error> {
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        Self::handle_response(resp).await
    }

    async fn post_no_response<B: Serialize + Sync + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<(), Error> {
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        Self::handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    /// Check the status only; the body is never read on success.
    async fn handle_empty(resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Error::Authentication {
                message: format!("host rejected bearer token (HTTP {})", status.as_u16()),
            };
        }

        let raw = resp.text().await.unwrap_or_default();
        let message = if raw.trim().is_empty() {
            status.to_string()
        } else {
            raw.chars().take(200).collect()
        };

        Error::Host {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl Host for HostClient {
    async fn handshake(&self) -> Result<HostConfig, Error> {
        self.get(self.base_url.clone()).await
    }

    async fn report_sense(
        &self,
        device_id: &str,
        entries: &[ReportEntry],
    ) -> Result<Vec<ControllerInput>, Error> {
        let url = self.device_url(device_id, SENSE_PATH)?;
        self.post(url, entries).await
    }

    async fn report_control(&self, device_id: &str, entries: &[ReportEntry]) -> Result<(), Error> {
        let url = self.device_url(device_id, CONTROL_PATH)?;
        self.post_no_response(url, entries).await
    }
}
