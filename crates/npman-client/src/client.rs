//! The API client: session management and the direct resource operations.

use std::time::Duration;

use log::{debug, error};
use reqwest::Method;
use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use npman_common::{Certificate, Config, Expand, ProxyHost, ProxyHostUpdate, expand_param};

use crate::credentials::{Credential, TokenRequest, TokenResponse};
use crate::error::{Error, extract_message};

/// Client for a Nginx Proxy Manager instance.
///
/// Authenticates eagerly on [`Client::connect`] and refreshes its bearer
/// token lazily before any request once the refresh deadline passes. Every
/// operation issues exactly one HTTP call (the provisioning workflows in this
/// crate compose several operations); nothing is retried.
///
/// Operations take `&mut self` because they may replace the stored
/// credential, which also means one instance cannot be shared across tasks —
/// create one client per task if you need parallelism. The pooled connection
/// is released when the client is dropped.
///
/// # Examples
///
/// ```no_run
/// use npman_client::Client;
/// use npman_common::Config;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::new("http://localhost:81", "admin@example.com")
///     .with_secret("changeme");
/// let mut client = Client::connect(config).await?;
///
/// for host in client.get_all_proxy_hosts(&[], None).await? {
///     println!("{} -> {}:{}", host.domain_names.join(", "), host.forward_host, host.forward_port);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    identity: String,
    secret: SecretString,
    credential: Credential,
}

// Custom Debug implementation to avoid exposing the secret or token.
impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("identity", &self.identity)
            .field("secret", &"[REDACTED]")
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Connect to an instance: validate the configuration, build the
    /// transport, and authenticate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] when the configuration is unusable
    /// (missing secret, malformed base URL) and [`Error::Auth`] when the
    /// token request is rejected or its response lacks a token.
    pub async fn connect(config: Config) -> Result<Self, Error> {
        let secret = config
            .secret
            .clone()
            .ok_or_else(|| Error::InvalidRequest("config is missing the account secret".into()))?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        url::Url::parse(&base_url)
            .map_err(|e| Error::InvalidRequest(format!("invalid base URL '{base_url}': {e}")))?;

        let mut builder = reqwest::Client::builder();
        if let Some(seconds) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        let http = builder
            .build()
            .map_err(|e| Error::InvalidRequest(format!("failed to build HTTP transport: {e}")))?;

        let credential = Self::authenticate(&http, &base_url, &config.identity, &secret).await?;

        Ok(Self {
            http,
            base_url,
            identity: config.identity,
            secret,
            credential,
        })
    }

    /// The identity this client authenticated as.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Obtain a fresh bearer credential from the token endpoint.
    async fn authenticate(
        http: &reqwest::Client,
        base_url: &str,
        identity: &str,
        secret: &SecretString,
    ) -> Result<Credential, Error> {
        let url = format!("{base_url}/api/tokens");
        debug!("POST {url}");

        let body = TokenRequest {
            identity,
            secret: secret.expose_secret(),
        };
        let response = http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Auth(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!(
                "token request rejected with status {}: {}",
                status.as_u16(),
                extract_message(&text)
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("token response missing or malformed: {e}")))?;

        Ok(Credential::issued_now(token.token))
    }

    /// Replace the credential when its refresh deadline has passed.
    ///
    /// Called before every request; there is no background refresh.
    async fn ensure_valid_token(&mut self) -> Result<(), Error> {
        if self.credential.needs_refresh(chrono::Utc::now()) {
            debug!("bearer token past its refresh deadline, re-authenticating");
            self.credential =
                Self::authenticate(&self.http, &self.base_url, &self.identity, &self.secret)
                    .await?;
        }
        Ok(())
    }

    /// Issue one authenticated request and surface non-success as
    /// [`Error::Api`] with the server's error detail.
    async fn send(
        &mut self,
        method: Method,
        path: &str,
        query: &[(&'static str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, Error> {
        self.ensure_valid_token().await?;

        let url = format!("{}/api{}", self.base_url, path);
        debug!("{method} {url}");

        let mut request = self.http.request(method.clone(), &url).header(
            AUTHORIZATION,
            format!("Bearer {}", self.credential.token().expose_secret()),
        );
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = match extract_message(&text) {
                m if m.is_empty() => status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
                m => m,
            };
            error!("{method} {url} failed with status {}: {message}", status.as_u16());
            return Err(Error::Api {
                status: Some(status.as_u16()),
                message,
            });
        }

        Ok(response)
    }

    pub(crate) async fn request_json<T: DeserializeOwned>(
        &mut self,
        method: Method,
        path: &str,
        query: &[(&'static str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<T, Error> {
        let response = self.send(method, path, query, body).await?;
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| Error::InvalidResponse(format!("failed to decode response body: {e}")))
    }

    /// For endpoints whose success is a `204`, an empty body, or a bare
    /// `true`; the body is not parsed at all.
    async fn request_empty(
        &mut self,
        method: Method,
        path: &str,
    ) -> Result<(), Error> {
        self.send(method, path, &[], None).await?;
        Ok(())
    }

    pub(crate) fn encode<B: serde::Serialize>(body: &B) -> Result<serde_json::Value, Error> {
        serde_json::to_value(body)
            .map_err(|e| Error::InvalidRequest(format!("failed to encode request body: {e}")))
    }

    // ---- proxy hosts -------------------------------------------------------

    /// Fetch a single proxy host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] on any non-success response (404 for an unknown
    /// id).
    pub async fn get_proxy_host(
        &mut self,
        host_id: u32,
        expand: &[Expand],
    ) -> Result<ProxyHost, Error> {
        let query = expand_query(expand);
        self.request_json(Method::GET, &format!("/nginx/proxy-hosts/{host_id}"), &query, None)
            .await
    }

    /// List all proxy hosts.
    ///
    /// `search` is passed through as the server-side `query` parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] on any non-success response.
    pub async fn get_all_proxy_hosts(
        &mut self,
        expand: &[Expand],
        search: Option<&str>,
    ) -> Result<Vec<ProxyHost>, Error> {
        let mut query = expand_query(expand);
        if let Some(search) = search {
            query.push(("query", search.to_string()));
        }
        self.request_json(Method::GET, "/nginx/proxy-hosts", &query, None)
            .await
    }

    /// Update a proxy host.
    ///
    /// This is a partial update: the request body contains exactly the fields
    /// provided in `update` and the server preserves everything else. The
    /// current state is never fetched first, so concurrent edits to other
    /// fields are not clobbered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] on any non-success response.
    pub async fn update_proxy_host(
        &mut self,
        host_id: u32,
        update: &ProxyHostUpdate,
    ) -> Result<ProxyHost, Error> {
        let body = Self::encode(update)?;
        self.request_json(
            Method::PUT,
            &format!("/nginx/proxy-hosts/{host_id}"),
            &[],
            Some(body),
        )
        .await
    }

    /// Enable a proxy host via the dedicated `enable` endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] on any non-success response.
    pub async fn enable_proxy_host(&mut self, host_id: u32) -> Result<(), Error> {
        self.request_empty(Method::POST, &format!("/nginx/proxy-hosts/{host_id}/enable"))
            .await
    }

    /// Disable a proxy host via the dedicated `disable` endpoint.
    ///
    /// The host keeps its configuration and certificate; traffic stops being
    /// served until it is enabled again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] on any non-success response.
    pub async fn disable_proxy_host(&mut self, host_id: u32) -> Result<(), Error> {
        self.request_empty(Method::POST, &format!("/nginx/proxy-hosts/{host_id}/disable"))
            .await
    }

    /// Delete a proxy host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] on any non-success response (carrying status
    /// 404 for an unknown id).
    pub async fn delete_proxy_host(&mut self, host_id: u32) -> Result<(), Error> {
        self.request_empty(Method::DELETE, &format!("/nginx/proxy-hosts/{host_id}"))
            .await
    }

    // ---- certificates ------------------------------------------------------

    /// List all certificates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] on any non-success response.
    pub async fn get_all_certificates(
        &mut self,
        expand: &[Expand],
    ) -> Result<Vec<Certificate>, Error> {
        let query = expand_query(expand);
        self.request_json(Method::GET, "/nginx/certificates", &query, None)
            .await
    }

    /// Delete a certificate.
    ///
    /// Fails if the certificate is still attached to a host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] on any non-success response.
    pub async fn delete_certificate(&mut self, certificate_id: u32) -> Result<(), Error> {
        self.request_empty(Method::DELETE, &format!("/nginx/certificates/{certificate_id}"))
            .await
    }
}

fn expand_query(expand: &[Expand]) -> Vec<(&'static str, String)> {
    expand_param(expand)
        .map(|value| vec![("expand", value)])
        .unwrap_or_default()
}
