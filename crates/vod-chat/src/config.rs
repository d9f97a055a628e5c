use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use rustls::{ClientConfig, crypto::ring};
use rustls_platform_verifier::BuilderVerifierExt;
use tracing::debug;
use url::Url;

use crate::error::{ChatlogError, Result};

pub const DEFAULT_API_BASE: &str = "https://api.twitch.tv";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Media type selecting the v5 flavour of the kraken API.
pub const KRAKEN_V5_ACCEPT: &str = "application/vnd.twitchtv.v5+json";

pub const CLIENT_ID_ENV: &str = "TWITCH_CLIENT_ID";
pub const API_BASE_ENV: &str = "VOD_CHAT_API_BASE";

/// Options for talking to the comment API
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Scheme and host of the API, without a trailing slash
    pub base_url: String,

    /// Client credential sent as `Client-ID`
    pub client_id: Option<String>,

    /// User agent string
    pub user_agent: String,

    /// Overall timeout for a single request, zero disables it
    pub timeout: Duration,

    /// Connection timeout, zero disables it
    pub connect_timeout: Duration,

    /// Extra headers sent with every request
    pub headers: HeaderMap,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_owned(),
            client_id: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            headers: ApiConfig::get_default_headers(),
        }
    }
}

impl ApiConfig {
    /// Defaults overridden by `TWITCH_CLIENT_ID` and `VOD_CHAT_API_BASE`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(client_id) = std::env::var(CLIENT_ID_ENV)
            && !client_id.is_empty()
        {
            config.client_id = Some(client_id);
        }
        if let Ok(base_url) = std::env::var(API_BASE_ENV)
            && !base_url.is_empty()
        {
            config = config.with_base_url(base_url);
        }
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_owned();
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static(KRAKEN_V5_ACCEPT),
        );
        default_headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );
        default_headers
    }

    /// Check that `base_url` is an absolute http(s) URL.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            ChatlogError::configuration(format!("invalid base url `{}`: {e}", self.base_url))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(ChatlogError::configuration(format!(
                "unsupported scheme `{scheme}` in base url"
            ))),
        }
    }

    /// Headers for a request, including the client credential when set.
    pub(crate) fn request_headers(&self) -> Result<HeaderMap> {
        let mut headers = self.headers.clone();
        if let Some(client_id) = &self.client_id {
            let value = HeaderValue::from_str(client_id).map_err(|e| {
                ChatlogError::configuration(format!("invalid client id: {e}"))
            })?;
            headers.insert("Client-ID", value);
        }
        Ok(headers)
    }
}

/// Create a reqwest Client with the provided configuration
pub fn create_client(config: &ApiConfig) -> Result<Client> {
    config.validate()?;
    let provider = Arc::new(ring::default_provider());

    let tls_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| ChatlogError::configuration(format!("TLS protocol versions: {e}")))?
        .with_platform_verifier()
        .map_err(|e| ChatlogError::configuration(format!("TLS verifier: {e}")))?
        .with_no_client_auth();

    let mut client_builder = Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(config.request_headers()?)
        .use_preconfigured_tls(tls_config);

    if !config.timeout.is_zero() {
        client_builder = client_builder.timeout(config.timeout);
    }

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    debug!(base_url = %config.base_url, "Creating API client");
    client_builder.build().map_err(ChatlogError::from)
}
