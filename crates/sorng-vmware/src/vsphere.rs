//! vSphere REST API HTTP client with session-based authentication.
//!
//! Communicates with vCenter via `https://{host}:{port}/api/...`.
//! Manages the session lifecycle (create / delete) and provides typed helpers.
//! The session id sits behind a lock so one client can be shared (`Arc`)
//! between the inventory service and the change feeds it hands out.

use crate::error::{VmwareError, VmwareErrorKind, VmwareResult};
use crate::types::VsphereConfig;

use log::{debug, warn};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::RwLock;

const SESSION_HEADER: &str = "vmware-api-session-id";

/// vSphere REST API client.
pub struct VsphereClient {
    client: Client,
    base_url: String,
    session_id: RwLock<Option<String>>,
    config: VsphereConfig,
}

impl VsphereClient {
    /// Build a new client from config (does NOT create a session yet).
    pub fn new(config: &VsphereConfig) -> VmwareResult<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VmwareError::connection(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: format!("https://{}:{}", config.host, config.port),
            session_id: RwLock::new(None),
            config: config.clone(),
        })
    }

    /// Point the client at a plain-HTTP stub.
    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn config(&self) -> &VsphereConfig {
        &self.config
    }

    // ── Session management ──────────────────────────────────────────

    /// Create a new API session (POST /api/session).
    pub async fn login(&self) -> VmwareResult<()> {
        let url = format!("{}/api/session", self.base_url);

        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VmwareError::from(e)
                } else {
                    VmwareError::connection(format!("Cannot reach {}: {e}", self.config.host))
                }
            })?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(VmwareError::auth(format!(
                "Invalid credentials for {} on {}",
                self.config.username, self.config.host
            )));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(VmwareError::api(status.as_u16(), format!("Login failed: {body}")));
        }

        // Session ID comes back as a quoted JSON string
        let session_id: String = Self::parse_response(resp).await?;
        *self.session_id.write().await = Some(session_id);
        debug!("Opened vSphere session on {}", self.config.host);
        Ok(())
    }

    /// Delete the current session (DELETE /api/session). A no-op when
    /// there is no session.
    pub async fn logout(&self) -> VmwareResult<()> {
        let Some(sid) = self.session_id.write().await.take() else {
            return Ok(());
        };
        let url = format!("{}/api/session", self.base_url);
        let resp = self.client.delete(&url).header(SESSION_HEADER, sid).send().await?;
        Self::check_status(resp).await?;
        debug!("Closed vSphere session on {}", self.config.host);
        Ok(())
    }

    // ── HTTP helpers ────────────────────────────────────────────────

    async fn authorized(&self, builder: RequestBuilder) -> VmwareResult<RequestBuilder> {
        let sid = self
            .session_id
            .read()
            .await
            .clone()
            .ok_or_else(|| VmwareError::auth("Not logged in: no active session"))?;
        Ok(builder.header(SESSION_HEADER, sid))
    }

    /// GET a JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> VmwareResult<T> {
        self.get_with_params(path, &[]).await
    }

    /// GET a JSON response with query params. Repeated keys are sent as
    /// repeated query parameters (`names=a&names=b`).
    pub async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> VmwareResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.authorized(self.client.get(&url)).await?;
        let resp = builder.query(params).send().await?;
        let resp = Self::check_status(resp).await?;
        Self::parse_response(resp).await
    }

    /// POST with no body. Success responses carry no body either.
    pub async fn post_empty(&self, path: &str) -> VmwareResult<()> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.authorized(self.client.post(&url)).await?.send().await?;
        Self::check_status(resp).await?;
        Ok(())
    }

    /// DELETE a resource.
    pub async fn delete(&self, path: &str) -> VmwareResult<()> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.authorized(self.client.delete(&url)).await?.send().await?;
        Self::check_status(resp).await?;
        Ok(())
    }

    // ── Internal helpers ────────────────────────────────────────────

    pub(crate) async fn check_status(resp: Response) -> VmwareResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let path = resp.url().path().to_string();
        let body = resp.text().await.unwrap_or_default();
        Err(Self::status_error(status, &path, &body))
    }

    fn status_error(status: StatusCode, path: &str, body: &str) -> VmwareError {
        let code = status.as_u16();
        match status {
            StatusCode::UNAUTHORIZED => VmwareError::auth(format!("Session expired or invalid: {body}")),
            StatusCode::FORBIDDEN => VmwareError::access(format!("Access denied to {path}: {body}")),
            StatusCode::NOT_FOUND => {
                let mut err = VmwareError::api(code, format!("Resource not found: {path}"));
                err.resource = Some(path.to_string());
                err
            }
            _ => {
                warn!("vSphere API error {code} on {path}");
                VmwareError::new(VmwareErrorKind::ApiError(code), format!("API error {code}: {body}"))
            }
        }
    }

    async fn parse_response<T: DeserializeOwned>(resp: Response) -> VmwareResult<T> {
        let text = resp
            .text()
            .await
            .map_err(|e| VmwareError::parse(format!("Failed to read response body: {e}")))?;

        if text.is_empty() {
            // Some vSphere endpoints return an empty body for success
            return serde_json::from_str("null")
                .map_err(|e| VmwareError::parse(format!("Cannot deserialise empty response: {e}")));
        }

        serde_json::from_str(&text).map_err(|e| {
            let end = text.char_indices().nth(500).map_or(text.len(), |(i, _)| i);
            VmwareError::parse(format!("JSON parse error: {e}, body: {}", &text[..end]))
        })
    }
}
