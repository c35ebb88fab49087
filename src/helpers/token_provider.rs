// Token Provider for the now-playing widget
//
// Exchanges the long-lived refresh token for a short-lived bearer token by
// calling the Spotify accounts service. Stateless per call: nothing is
// cached or persisted, the upstream JSON body is handed back verbatim.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::Credentials;
use crate::helpers::http_client::{new_http_client, HttpClient};

/// Spotify OAuth token endpoint
pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

// Token exchange error types
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Token endpoint error: {0}")]
    UpstreamError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TokenError>;

/// Token refresh response as returned by the accounts service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub scope: Option<String>,
    pub expires_in: u64,
    pub refresh_token: Option<String>,
}

/// Exchanges the configured refresh token for bearer tokens.
///
/// The credential set is immutable for the lifetime of the provider and the
/// provider holds no session: every `refresh` call is one outbound request.
#[derive(Debug, Clone)]
pub struct TokenProvider {
    credentials: Credentials,
    token_url: String,
    http: Box<dyn HttpClient>,
}

impl TokenProvider {
    /// Create a provider talking to the real Spotify accounts service
    pub fn new(credentials: Credentials) -> Self {
        Self::with_http_client(credentials, SPOTIFY_TOKEN_URL, new_http_client(10))
    }

    /// Create a provider with a custom endpoint and HTTP client
    pub fn with_http_client(
        credentials: Credentials,
        token_url: &str,
        http: Box<dyn HttpClient>,
    ) -> Self {
        TokenProvider {
            credentials,
            token_url: token_url.to_string(),
            http,
        }
    }

    /// Build the HTTP Basic authorization header from the client credentials
    pub fn basic_auth_header(&self) -> String {
        let raw = format!(
            "{}:{}",
            self.credentials.client_id, self.credentials.client_secret
        );
        format!("Basic {}", BASE64.encode(raw))
    }

    /// Exchange the refresh token for a fresh access token.
    ///
    /// The credential set is validated before any network call; a missing
    /// value fails with `ConfigError` without touching the network. On
    /// success the upstream JSON body is returned verbatim.
    pub fn refresh(&self) -> Result<Value> {
        self.credentials.validate().map_err(TokenError::ConfigError)?;

        let auth = self.basic_auth_header();
        let headers = [("Authorization", auth.as_str())];
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", self.credentials.refresh_token.as_str()),
        ];

        info!("Refreshing Spotify access token");
        match self.http.post_form_with_headers(&self.token_url, &form, &headers) {
            Ok(value) => {
                debug!("Token refresh succeeded");
                Ok(value)
            }
            Err(e) => {
                error!("Failed to refresh Spotify token: {}", e);
                Err(TokenError::UpstreamError(e.to_string()))
            }
        }
    }

    /// Typed view of the refresh response, used by the poller
    pub fn refresh_token_response(&self) -> Result<TokenResponse> {
        let value = self.refresh()?;
        let parsed: TokenResponse = serde_json::from_value(value)?;
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::http_client::mock::ScriptedHttpClient;
    use crate::helpers::http_client::HttpClientError;
    use serde_json::json;

    fn test_credentials() -> Credentials {
        Credentials {
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
            refresh_token: "test-refresh".to_string(),
        }
    }

    fn token_body() -> Value {
        json!({
            "access_token": "fresh-token",
            "token_type": "Bearer",
            "scope": "user-read-currently-playing",
            "expires_in": 3600
        })
    }

    #[test]
    fn test_basic_auth_header_decodes_to_credentials() {
        let provider = TokenProvider::with_http_client(
            test_credentials(),
            "http://token.test/",
            Box::new(ScriptedHttpClient::new()),
        );

        let header = provider.basic_auth_header();
        let encoded = header.strip_prefix("Basic ").unwrap();
        let decoded = BASE64.decode(encoded).unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), "test-client:test-secret");
    }

    #[test]
    fn test_missing_credential_fails_without_network_call() {
        let http = ScriptedHttpClient::new();
        let mut credentials = test_credentials();
        credentials.client_secret = String::new();

        let provider = TokenProvider::with_http_client(
            credentials,
            "http://token.test/",
            Box::new(http.clone()),
        );

        match provider.refresh() {
            Err(TokenError::ConfigError(msg)) => assert!(msg.contains("client_secret")),
            other => panic!("expected ConfigError, got {:?}", other),
        }
        assert_eq!(http.request_count(), 0);
    }

    #[test]
    fn test_refresh_sends_form_body_and_returns_body_verbatim() {
        let http = ScriptedHttpClient::new();
        http.push(Ok(token_body()));

        let provider = TokenProvider::with_http_client(
            test_credentials(),
            "http://token.test/",
            Box::new(http.clone()),
        );

        let body = provider.refresh().unwrap();
        assert_eq!(body, token_body());

        let requests = http.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].url, "http://token.test/");
        assert!(requests[0]
            .form
            .contains(&("grant_type".to_string(), "refresh_token".to_string())));
        assert!(requests[0]
            .form
            .contains(&("refresh_token".to_string(), "test-refresh".to_string())));
        let auth = requests[0]
            .headers
            .iter()
            .find(|(name, _)| name == "Authorization")
            .map(|(_, value)| value.clone())
            .unwrap();
        assert!(auth.starts_with("Basic "));
    }

    #[test]
    fn test_upstream_failure_maps_to_upstream_error() {
        let http = ScriptedHttpClient::new();
        http.push(Err(HttpClientError::ServerError {
            status: 502,
            body: "bad gateway".to_string(),
        }));

        let provider = TokenProvider::with_http_client(
            test_credentials(),
            "http://token.test/",
            Box::new(http),
        );

        match provider.refresh() {
            Err(TokenError::UpstreamError(msg)) => assert!(msg.contains("502")),
            other => panic!("expected UpstreamError, got {:?}", other),
        }
    }

    #[test]
    fn test_typed_response_parses_token_fields() {
        let http = ScriptedHttpClient::new();
        http.push(Ok(token_body()));

        let provider = TokenProvider::with_http_client(
            test_credentials(),
            "http://token.test/",
            Box::new(http),
        );

        let token = provider.refresh_token_response().unwrap();
        assert_eq!(token.access_token, "fresh-token");
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, 3600);
        assert!(token.refresh_token.is_none());
    }
}
