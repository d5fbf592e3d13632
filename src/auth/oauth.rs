//! OAuth2 client-credentials token acquisition against Azure AD.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::{debug, error, info};

use super::credentials::AppCredentials;
use crate::config::{ApiConfig, Config};
use crate::error::AuthError;
use crate::secret::{redact_preview, SecretString};

/// The single scope requested: Microsoft Graph's statically consented permissions.
pub const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

const CLIENT_CREDENTIALS_GRANT: &str = "client_credentials";

/// Bearer token for Microsoft Graph, used for exactly one run.
#[derive(Debug, Clone)]
pub struct AccessToken {
    value: SecretString,
    token_type: String,
    expires_at: Option<DateTime<Utc>>,
    scope: String,
}

impl AccessToken {
    pub fn new(value: impl Into<SecretString>) -> Self {
        Self {
            value: value.into(),
            token_type: "Bearer".to_string(),
            expires_at: None,
            scope: GRAPH_DEFAULT_SCOPE.to_string(),
        }
    }

    /// The raw bearer string, for the `Authorization` header only.
    pub fn secret(&self) -> &SecretString {
        &self.value
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }
}

/// Token response from Azure AD. Everything is optional so a missing token is
/// reported as such rather than as a parse failure.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<SecretString>,
    token_type: Option<String>,
    expires_in: Option<i64>,
}

/// Error body returned by the authority on rejected requests.
#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

/// Acquires application tokens with the client-credentials grant.
pub struct TokenAcquirer {
    api: ApiConfig,
    http_client: reqwest::Client,
}

impl TokenAcquirer {
    /// Create a new token acquirer from configuration.
    pub fn new(config: &Config) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.api.timeout())
            .connect_timeout(config.api.connect_timeout())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AuthError::Client(e.to_string()))?;

        Ok(Self {
            api: config.api.clone(),
            http_client,
        })
    }

    /// Request a Graph token for the application. One attempt, no retry.
    pub async fn acquire(&self, credentials: &AppCredentials) -> Result<AccessToken, AuthError> {
        let token_endpoint = self.api.token_url(credentials.tenant_id());

        info!(
            "Acquiring access token for client {} from authority {}",
            credentials.client_id(),
            self.api.authority_url(credentials.tenant_id())
        );

        let params = [
            ("client_id", credentials.client_id()),
            ("client_secret", credentials.client_secret().expose()),
            ("grant_type", CLIENT_CREDENTIALS_GRANT),
            ("scope", GRAPH_DEFAULT_SCOPE),
        ];

        let response = self
            .http_client
            .post(&token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !status.is_success() {
            error!("Token request failed: HTTP {} - {}", status, body);
            let details = serde_json::from_str::<OAuthErrorResponse>(&body).ok();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                code: details.as_ref().and_then(|d| d.error.clone()),
                description: details.and_then(|d| d.error_description),
            });
        }

        let token_response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            error!("Unreadable token response: {}", e);
            AuthError::MissingToken
        })?;

        let value = match token_response.access_token {
            Some(value) if !value.is_empty() => value,
            _ => return Err(AuthError::MissingToken),
        };

        // Out-of-range lifetimes are treated as "no expiry" rather than overflowing.
        let expires_at = token_response
            .expires_in
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime));

        info!(
            "Access token acquired successfully ({}, {} chars)",
            redact_preview(value.expose()),
            value.len()
        );
        if let Some(expires_at) = expires_at {
            debug!("Access token expires at {}", expires_at);
        }

        let mut token = AccessToken::new(value);
        if let Some(token_type) = token_response.token_type {
            token.token_type = token_type;
        }
        token.expires_at = expires_at;

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN_PATH: &str = "/test-tenant/oauth2/v2.0/token";

    fn credentials() -> AppCredentials {
        AppCredentials::new("test-client", "test-tenant", "test-secret").unwrap()
    }

    async fn acquirer_for(server: &MockServer) -> TokenAcquirer {
        let config = Config::for_tests(&server.uri(), &server.uri());
        TokenAcquirer::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_acquire_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=test-client"))
            .and(body_string_contains("client_secret=test-secret"))
            .and(body_string_contains(
                "scope=https%3A%2F%2Fgraph.microsoft.com%2F.default",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "Bearer",
                "expires_in": 3599,
                "ext_expires_in": 3599,
                "access_token": "eyJ0eXAiOiJKV1QiLCJhbGciOi"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = acquirer_for(&server)
            .await
            .acquire(&credentials())
            .await
            .unwrap();

        assert_eq!(token.secret().expose(), "eyJ0eXAiOiJKV1QiLCJhbGciOi");
        assert_eq!(token.token_type(), "Bearer");
        assert_eq!(token.scope(), GRAPH_DEFAULT_SCOPE);
        assert!(token.expires_at().unwrap() > Utc::now());
        assert!(!format!("{:?}", token).contains("eyJ0"));
    }

    #[tokio::test]
    async fn test_acquire_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": "invalid_client",
                "error_description": "AADSTS7000215: Invalid client secret provided."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = acquirer_for(&server)
            .await
            .acquire(&credentials())
            .await
            .unwrap_err();

        match err {
            AuthError::Rejected {
                status,
                code,
                description,
            } => {
                assert_eq!(status, 401);
                assert_eq!(code.as_deref(), Some("invalid_client"));
                assert!(description.unwrap().starts_with("AADSTS7000215"));
            }
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_acquire_rejected_without_json() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
            .mount(&server)
            .await;

        let err = acquirer_for(&server)
            .await
            .acquire(&credentials())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AuthError::Rejected {
                status: 503,
                code: None,
                description: None
            }
        ));
    }

    #[tokio::test]
    async fn test_acquire_missing_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "Bearer",
                "expires_in": 3599
            })))
            .mount(&server)
            .await;

        let err = acquirer_for(&server)
            .await
            .acquire(&credentials())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
    }

    #[tokio::test]
    async fn test_acquire_empty_or_garbled_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "access_token": "" })),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let acquirer = acquirer_for(&server).await;
        assert!(matches!(
            acquirer.acquire(&credentials()).await,
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            acquirer.acquire(&credentials()).await,
            Err(AuthError::MissingToken)
        ));
    }

    #[tokio::test]
    async fn test_acquire_out_of_range_expiry() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok",
                "expires_in": i64::MAX
            })))
            .mount(&server)
            .await;

        let token = acquirer_for(&server)
            .await
            .acquire(&credentials())
            .await
            .unwrap();
        assert_eq!(token.secret().expose(), "tok");
        assert!(token.expires_at().is_none());
    }

    #[tokio::test]
    async fn test_acquire_unreachable_authority() {
        // Nothing listens on the discard port locally.
        let config = Config::for_tests("http://127.0.0.1:9", "http://127.0.0.1:9");
        let acquirer = TokenAcquirer::new(&config).unwrap();

        let err = acquirer.acquire(&credentials()).await.unwrap_err();
        assert!(matches!(err, AuthError::Network(_)));
    }
}
