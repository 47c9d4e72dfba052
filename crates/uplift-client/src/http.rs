//! HTTP client for the uplift daemon

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use url::Url;

use uplift_api::{
    requests::{CancelRequest, UpgradeRequest},
    responses::{
        ActiveUpgradeView, AuditRecordView, DispatchResponse, ErrorResponse, HealthResponse,
        HostView,
    },
};

use crate::error::{ClientError, Result};

/// HTTP client for communicating with the uplift daemon
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
}

impl HttpClient {
    /// Create a new HTTP client
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    /// Create a new HTTP client with custom `reqwest::Client`
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid.
    pub fn with_client(base_url: impl AsRef<str>, client: Client) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        Ok(Self { client, base_url })
    }

    /// Build a full URL from a path
    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(ClientError::Url)
    }

    /// WebSocket URL of the daemon's event stream
    ///
    /// # Errors
    /// Returns an error if the base URL cannot carry a ws scheme.
    pub fn events_url(&self) -> Result<Url> {
        let mut url = self.url("/ws/events")?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme).map_err(|()| {
            ClientError::WebSocket(format!("cannot derive websocket url from {}", self.base_url))
        })?;
        Ok(url)
    }

    /// Turn a non-success response into `ClientError::Api`
    async fn check(response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(api_error(status, &body))
    }

    /// Perform a GET request and deserialize the response
    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = Self::check(self.client.get(url).send().await?).await?;
        Ok(response.json().await?)
    }

    /// Perform a POST request with JSON body
    async fn post(&self, path: &str, body: impl serde::Serialize) -> Result<Response> {
        let url = self.url(path)?;
        Self::check(self.client.post(url).json(&body).send().await?).await
    }

    // System endpoints

    /// Get daemon health status
    ///
    /// # Errors
    /// Returns an error if the request fails or the daemon returns an error.
    pub async fn health(&self) -> Result<HealthResponse> {
        self.get(self.url("/health")?).await
    }

    // Upgrade endpoints

    /// Trigger an upgrade
    ///
    /// Returns once the daemon accepted it; the outcome shows up in the history.
    ///
    /// # Errors
    /// Returns `ClientError::Api` with the daemon's reason code when rejected.
    pub async fn trigger_upgrade(&self, request: &UpgradeRequest) -> Result<DispatchResponse> {
        Ok(self.post("/api/upgrade", request).await?.json().await?)
    }

    /// Cancel a running upgrade
    ///
    /// # Errors
    /// Returns `ClientError::Api` with code `NOT_IN_FLIGHT` if nothing is running.
    pub async fn cancel_upgrade(&self, request: &CancelRequest) -> Result<()> {
        self.post("/api/upgrade/cancel", request).await?;
        Ok(())
    }

    /// Upgrades currently running
    ///
    /// # Errors
    /// Returns an error if the request fails or the daemon returns an error.
    pub async fn active_upgrades(&self) -> Result<Vec<ActiveUpgradeView>> {
        self.get(self.url("/api/upgrade/active")?).await
    }

    // Inventory endpoints

    /// List all hosts
    ///
    /// # Errors
    /// Returns an error if the request fails or the daemon returns an error.
    pub async fn list_hosts(&self) -> Result<Vec<HostView>> {
        self.get(self.url("/api/hosts")?).await
    }

    /// Get a single host by id
    ///
    /// # Errors
    /// Returns an error if the request fails or the daemon returns an error.
    pub async fn get_host(&self, id: &str) -> Result<HostView> {
        let mut url = self.url("/api/hosts/")?;
        url.path_segments_mut()
            .map_err(|()| ClientError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(id);
        self.get(url).await
    }

    // Audit endpoints

    /// Upgrade history, for one host or all
    ///
    /// # Errors
    /// Returns an error if the request fails or the daemon returns an error.
    pub async fn history(&self, host_id: Option<&str>) -> Result<Vec<AuditRecordView>> {
        self.get(self.history_url(host_id)?).await
    }

    fn history_url(&self, host_id: Option<&str>) -> Result<Url> {
        let mut url = self.url("/api/history")?;
        if let Some(id) = host_id {
            url.query_pairs_mut().append_pair("hostId", id);
        }
        Ok(url)
    }
}

/// Build an API error from a status and response body
fn api_error(status: u16, body: &str) -> ClientError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) => ClientError::Api {
            status,
            code: err.code,
            message: err.message,
        },
        Err(_) => ClientError::Api {
            status,
            code: "UNKNOWN".to_string(),
            message: body.to_string(),
        },
    }
}
