//! HTTP transport for the platform's REST and legacy XML resources

use crate::auth::{AccessToken, Credentials, TokenResponse};
use crate::error::{ApiError, ApiResult};
use crate::xml::XmlDocument;
use chrono::Utc;
use reqwest::header::{ACCEPT, LOCATION};
use reqwest::{Method, Response, StatusCode, Url};
use std::time::Duration;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_REDIRECTS: usize = 10;
const TOKEN_PATH: &str = "api/oauth/token";

/// Build an absolute endpoint URL from the configured base URL
///
/// # Errors
/// Returns [`ApiError::BadUrl`] if the result is not an http(s) URL
pub fn endpoint(base_url: &str, path: &str) -> ApiResult<Url> {
    let raw = format!(
        "{}/{}",
        base_url.trim().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let url = Url::parse(&raw).map_err(|e| ApiError::BadUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Ok(url),
        _ => Err(ApiError::BadUrl(raw)),
    }
}

/// Thin, cloneable wrapper around a configured `reqwest` client.
///
/// Hostname verification is disabled so on-premise servers fronted by a
/// certificate issued for another name (typically a cloud wildcard) still
/// work; the certificate chain is still validated. Redirects are followed
/// here rather than by `reqwest` so that a POST keeps its method and body;
/// only same-origin redirects are followed.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl ApiClient {
    /// Create a client with the given per-request timeout
    ///
    /// # Errors
    /// Returns an error if the TLS backend cannot be initialised
    pub fn new(timeout: Duration) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_hostnames(true)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("eaudit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self { http, timeout })
    }

    /// Same connection pool with a different per-request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Exchange client credentials for a bearer token
    ///
    /// # Errors
    /// Returns [`ApiError::AuthenticationFailed`] if the server refuses the exchange
    pub async fn authenticate(&self, credentials: &Credentials) -> ApiResult<AccessToken> {
        let url = endpoint(&credentials.base_url, TOKEN_PATH)?;
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ];

        let issued_at = Utc::now();
        let response = self
            .send(Method::POST, &url, None, "application/json", Some(&form[..]))
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::AuthenticationFailed {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        Ok(token.into_token(issued_at))
    }

    /// GET a JSON resource and return the raw body
    ///
    /// # Errors
    /// Returns an error for transport failures and non-2xx responses
    pub async fn get_json(&self, url: &Url, token: &AccessToken) -> ApiResult<Vec<u8>> {
        let response = self
            .send(Method::GET, url, Some(token), "application/json", None)
            .await?;
        let response = check_status(response, url).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// GET an XML resource and parse it into an element tree
    ///
    /// # Errors
    /// Returns [`ApiError::Decode`] if the body is not well-formed XML
    pub async fn get_xml(&self, url: &Url, token: &AccessToken) -> ApiResult<XmlDocument> {
        let response = self
            .send(Method::GET, url, Some(token), "application/xml", None)
            .await?;
        let response = check_status(response, url).await?;
        let body = response.text().await?;
        XmlDocument::parse(&body)
    }

    /// DELETE a resource
    ///
    /// # Errors
    /// Returns an error for transport failures and non-2xx responses
    pub async fn delete(&self, url: &Url, token: &AccessToken) -> ApiResult<()> {
        let response = self
            .send(Method::DELETE, url, Some(token), "application/xml", None)
            .await?;
        check_status(response, url).await?;
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        url: &Url,
        token: Option<&AccessToken>,
        accept: &str,
        form: Option<&[(&str, &str)]>,
    ) -> ApiResult<Response> {
        let mut target = url.clone();

        for _ in 0..=MAX_REDIRECTS {
            let mut request = self
                .http
                .request(method.clone(), target.clone())
                .timeout(self.timeout)
                .header(ACCEPT, accept);
            if let Some(token) = token {
                request = request.bearer_auth(token.secret());
            }
            if let Some(form) = form {
                request = request.form(form);
            }

            let response = request.send().await?;
            if !response.status().is_redirection() {
                return Ok(response);
            }

            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);
            let Some(location) = location else {
                return Ok(response);
            };
            let next = target
                .join(&location)
                .map_err(|e| ApiError::BadUrl(format!("{location}: {e}")))?;
            // Credentials and form bodies stay on the configured server
            if next.origin() != url.origin() {
                tracing::warn!(from = %target, to = %next, "refusing cross-origin redirect");
                return Err(ApiError::CrossOriginRedirect {
                    from: target.to_string(),
                    to: next.to_string(),
                });
            }
            tracing::debug!(from = %target, to = %next, %method, "following redirect");
            target = next;
        }

        Err(ApiError::TooManyRedirects(url.to_string()))
    }
}

/// Map non-2xx responses onto the error taxonomy
async fn check_status(response: Response, url: &Url) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ApiError::InsufficientPermissions {
            endpoint: url.path().to_string(),
        });
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::BadResponse {
        status: status.as_u16(),
        body,
    })
}
