//! Credentials and bearer tokens

use crate::client::ApiClient;
use crate::error::ApiResult;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::fmt;

/// Tokens are treated as expired this long before the server says so
const EXPIRY_SKEW_SECS: i64 = 30;

/// API client credentials for the client-credentials grant
#[derive(Clone)]
pub struct Credentials {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// A bearer token and its absolute expiry
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Bearer value for the Authorization header
    pub fn secret(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the token should be refreshed before the next request
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SKEW_SECS) >= self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Body of a successful token exchange
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds
    pub expires_in: i64,
}

impl TokenResponse {
    pub(crate) fn into_token(self, issued_at: DateTime<Utc>) -> AccessToken {
        AccessToken::new(
            self.access_token,
            issued_at + Duration::seconds(self.expires_in.max(0)),
        )
    }
}

/// Caller-owned authentication state: credentials plus the current token
#[derive(Debug, Clone)]
pub struct Session {
    client: ApiClient,
    credentials: Credentials,
    token: Option<AccessToken>,
}

impl Session {
    #[must_use]
    pub fn new(client: ApiClient, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
            token: None,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn base_url(&self) -> &str {
        &self.credentials.base_url
    }

    /// Current token, exchanging credentials for a new one when missing or expired
    ///
    /// # Errors
    /// Returns an error if the token exchange fails
    pub async fn token(&mut self) -> ApiResult<AccessToken> {
        if let Some(token) = self.token.as_ref().filter(|t| !t.is_expired()) {
            return Ok(token.clone());
        }

        let token = self.client.authenticate(&self.credentials).await?;
        tracing::debug!(expires_at = %token.expires_at(), "obtained access token");
        self.token = Some(token.clone());
        Ok(token)
    }
}
