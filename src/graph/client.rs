//! Microsoft Graph API client for looking up users by mail nickname.

use reqwest::Client;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::models::LookupResult;
use crate::auth::AccessToken;
use crate::config::Config;
use crate::error::QueryError;

/// Graph header used to correlate a request with service-side logs.
const CLIENT_REQUEST_ID_HEADER: &str = "client-request-id";

/// Exact-match OData filter on `mailNickname`.
///
/// The nickname is substituted verbatim. A nickname containing `'` therefore
/// yields an invalid or altered filter expression.
pub fn mail_nickname_filter(nickname: &str) -> String {
    format!("mailNickname eq '{}'", nickname)
}

/// Full `/users` URL with the percent-encoded filter as `$filter`.
pub fn users_query_url(graph_base_url: &str, nickname: &str) -> String {
    format!(
        "{}/users?$filter={}",
        graph_base_url.trim_end_matches('/'),
        urlencoding::encode(&mail_nickname_filter(nickname))
    )
}

/// Directory API client for the user listing endpoint.
pub struct DirectoryLookup {
    graph_base_url: String,
    http_client: Client,
}

impl DirectoryLookup {
    /// Create a new directory client.
    pub fn new(config: &Config) -> Result<Self, QueryError> {
        let http_client = Client::builder()
            .timeout(config.api.timeout())
            .connect_timeout(config.api.connect_timeout())
            .build()
            .map_err(|e| QueryError::Client(e.to_string()))?;

        Ok(Self {
            graph_base_url: config.api.graph_base_url.clone(),
            http_client,
        })
    }

    /// Find users whose `mailNickname` equals `nickname`. Only the first page is read.
    pub async fn find_by_mail_nickname(
        &self,
        token: &AccessToken,
        nickname: &str,
    ) -> Result<LookupResult, QueryError> {
        if nickname.contains('\'') {
            warn!(
                "Nickname {:?} contains a single quote; the filter is sent unescaped",
                nickname
            );
        }

        let url = users_query_url(&self.graph_base_url, nickname);
        let request_id = Uuid::new_v4().to_string();

        info!("Querying user by mail nickname: {}", nickname);
        debug!("GET {} ({}: {})", url, CLIENT_REQUEST_ID_HEADER, request_id);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token.secret().expose())
            .header(CLIENT_REQUEST_ID_HEADER, &request_id)
            .send()
            .await
            .map_err(|e| QueryError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                "Failed to retrieve user: HTTP {} (request {}) - {}",
                status, request_id, body
            );
            return Err(QueryError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| QueryError::Network(e.to_string()))?;
        debug!("Response received: {}", body);

        let result = LookupResult::from_body(&body);
        match &result {
            LookupResult::NotFound => info!("No user matched '{}'", nickname),
            LookupResult::Found(users) => info!("{} user(s) matched '{}'", users.len(), nickname),
            LookupResult::Malformed(_) => {
                warn!("Unexpected response format (request {})", request_id)
            }
        }

        Ok(result)
    }
}
