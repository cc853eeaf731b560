use std::time::Duration;

use log::{debug, error, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONNECTION};
use reqwest::{Client, Response};
use url::Url;

use crate::auth::Credentials;
use crate::error::{Result, TeamCityError};

pub const REST_MOUNT: &str = "app/rest/";
pub const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECONDS: u64 = 10;
const DEFAULT_RETRY_DELAY_MILLIS: u64 = 500;

/// Transport settings for a [`TeamCityClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Upper bound for a whole request, body included
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Extra attempts after a failed connection
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECONDS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MILLIS),
            user_agent: concat!("tcrest/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Authenticated session against one TeamCity server.
///
/// All requests go through a single pooled connection and resolve against
/// `https://{server}/app/rest/`.
pub struct TeamCityClient {
    client: Client,
    base_url: Url,
    credentials: Credentials,
    settings: ClientSettings,
}

impl TeamCityClient {
    /// Opens a session against `https://{server_name}/app/rest/`.
    ///
    /// A handshake request is sent to the base URL right away. Its failure is
    /// logged and otherwise ignored, so the returned client is usable even if
    /// the server is currently unreachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot be built from `server_name` or
    /// the HTTP client cannot be created.
    pub async fn connect(
        server_name: &str,
        credentials: Credentials,
        settings: ClientSettings,
    ) -> Result<Self> {
        Self::connect_to_root(&format!("https://{server_name}"), credentials, settings).await
    }

    /// Like [`TeamCityClient::connect`], with an explicit scheme and host
    /// (e.g. `http://localhost:8111`).
    pub async fn connect_to_root(
        root: &str,
        credentials: Credentials,
        settings: ClientSettings,
    ) -> Result<Self> {
        let client = Self::new(root, credentials, settings)?;
        client.handshake().await;
        Ok(client)
    }

    fn new(root: &str, credentials: Credentials, settings: ClientSettings) -> Result<Self> {
        let base_url = rest_base_url(root)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(settings.user_agent.as_str())
            .gzip(true)
            .deflate(true)
            .timeout(settings.timeout)
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|e| TeamCityError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            credentials,
            settings,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        self.credentials.username()
    }

    async fn handshake(&self) {
        match self.send(&self.base_url).await {
            Ok(response) => debug!(
                "Handshake with {} returned {}",
                self.base_url,
                response.status()
            ),
            Err(e) => warn!("Handshake with TeamCity failed: {e} (url: {})", self.base_url),
        }
    }

    /// Joins a resource path onto the REST mount. A leading `/` is ignored;
    /// anything that would land outside `app/rest/` is rejected.
    pub fn resolve(&self, relative_path: &str) -> Result<Url> {
        let invalid = |reason: String| TeamCityError::InvalidUrl {
            path: relative_path.to_string(),
            reason,
        };

        let url = self
            .base_url
            .join(relative_path.trim_start_matches('/'))
            .map_err(|e| invalid(e.to_string()))?;

        if !url.as_str().starts_with(self.base_url.as_str()) {
            return Err(invalid(format!("resolves outside {}", self.base_url)));
        }

        Ok(url)
    }

    /// Issues a GET for `relative_path` and returns the response as received.
    ///
    /// The status code is not checked. Transport failures come back as
    /// [`TeamCityError::Transport`] after connection retries are exhausted.
    pub async fn get(&self, relative_path: &str) -> Result<Response> {
        let url = match self.resolve(relative_path) {
            Ok(url) => url,
            Err(e) => {
                error!("{e}");
                return Err(e);
            }
        };

        debug!("GET {url}");
        match self.send(&url).await {
            Ok(response) => Ok(response),
            Err(e) => {
                error!("TeamCity request failed: {e}");
                Err(e)
            }
        }
    }

    /// Sends a GET, retrying only when the connection itself could not be
    /// established.
    async fn send(&self, url: &Url) -> Result<Response> {
        let mut retry_count = 0;
        loop {
            let request = self
                .client
                .get(url.clone())
                .basic_auth(self.credentials.username(), Some(self.credentials.password()));

            match request.send().await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_connect() && retry_count < self.settings.max_retries => {
                    retry_count += 1;
                    warn!(
                        "Connection to {} failed ({}), retrying ({}/{})...",
                        url, e, retry_count, self.settings.max_retries
                    );
                    if !self.settings.retry_delay.is_zero() {
                        tokio::time::sleep(self.settings.retry_delay).await;
                    }
                }
                Err(source) => {
                    return Err(TeamCityError::Transport {
                        url: url.to_string(),
                        source,
                    })
                }
            }
        }
    }
}

/// Builds `{root}/app/rest/`, keeping any path prefix of `root`.
pub fn rest_base_url(root: &str) -> Result<Url> {
    let root = format!("{}/", root.trim_end_matches('/'));

    let base = Url::parse(&root)
        .map_err(|e| TeamCityError::Config(format!("Invalid server URL '{root}': {e}")))?;
    if base.host_str().map_or(true, str::is_empty) {
        return Err(TeamCityError::Config(format!(
            "Invalid server URL '{root}': missing host"
        )));
    }

    base.join(REST_MOUNT)
        .map_err(|e| TeamCityError::Config(format!("Invalid REST base URL: {e}")))
}
