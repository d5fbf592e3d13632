//! Error types for the aadlookup pipeline.
//!
//! Uses `thiserror` for library-style errors with automatic `Display` and `Error` implementations.
//! Each pipeline stage has its own error type; `AppError` ties them together for `main`.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Directory query error: {0}")]
    Query(#[from] QueryError),
}

/// Configuration errors. All of these abort the run before any network call.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read configuration file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required configuration property '{0}'")]
    MissingKey(&'static str),

    #[error("Invalid URL for '{key}': {reason}")]
    InvalidUrl { key: &'static str, reason: String },
}

/// Token acquisition errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authority rejected the token request (HTTP {status}){}", format_oauth_error(.code, .description))]
    Rejected {
        status: u16,
        code: Option<String>,
        description: Option<String>,
    },

    #[error("Token request failed: {0}")]
    Network(String),

    #[error("Authority response did not contain an access token")]
    MissingToken,

    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

/// Directory API errors. A response that arrives but cannot be understood is not an
/// error; see `LookupResult::Malformed`.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Graph API returned HTTP {status} {reason}")]
    Status {
        status: u16,
        reason: String,
        body: String,
    },

    #[error("Graph API request failed: {0}")]
    Network(String),

    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

fn format_oauth_error(code: &Option<String>, description: &Option<String>) -> String {
    match (code, description) {
        (Some(code), Some(description)) => format!(": {} - {}", code, description),
        (Some(code), None) => format!(": {}", code),
        (None, Some(description)) => format!(": {}", description),
        (None, None) => String::new(),
    }
}

impl QueryError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl AppError {
    /// Name of the pipeline stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration",
            Self::Auth(_) => "token acquisition",
            Self::Query(_) => "directory query",
        }
    }

    /// Returns a user-friendly message for console output.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Config(ConfigError::MissingKey(_)) => {
                "One or more configuration properties are missing. Please ensure clientId, \
                 tenantId, clientSecret, and nickname are set."
            }
            Self::Config(_) => "Unable to read configuration. Please check the config file.",
            Self::Auth(AuthError::Rejected { status: 400..=401, .. }) => {
                "The identity authority rejected the application credentials."
            }
            Self::Auth(AuthError::Network(_)) | Self::Query(QueryError::Network(_)) => {
                "Network error. Check your connection."
            }
            Self::Auth(_) => "Failed to acquire an access token.",
            Self::Query(e) => match e.status() {
                Some(401) => "Unauthorized (401): the access token was not accepted.",
                Some(403) => "Forbidden (403): the application lacks permission to read users.",
                Some(429) => "Rate limited (429): too many requests.",
                _ => "Failed to retrieve user.",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        let err = AppError::Config(ConfigError::MissingKey("clientSecret"));
        assert!(err.user_message().contains("clientSecret"));

        let err = AppError::Query(QueryError::Status {
            status: 403,
            reason: "Forbidden".into(),
            body: String::new(),
        });
        assert_eq!(
            err.user_message(),
            "Forbidden (403): the application lacks permission to read users."
        );
    }

    #[test]
    fn test_stage() {
        assert_eq!(AppError::from(AuthError::MissingToken).stage(), "token acquisition");
        assert_eq!(
            AppError::from(QueryError::Network("timeout".into())).stage(),
            "directory query"
        );
    }

    #[test]
    fn test_rejected_display() {
        let err = AuthError::Rejected {
            status: 401,
            code: Some("invalid_client".into()),
            description: Some("AADSTS7000215: Invalid client secret provided.".into()),
        };
        assert_eq!(
            err.to_string(),
            "Authority rejected the token request (HTTP 401): invalid_client - \
             AADSTS7000215: Invalid client secret provided."
        );

        let err = AuthError::Rejected {
            status: 500,
            code: None,
            description: None,
        };
        assert_eq!(err.to_string(), "Authority rejected the token request (HTTP 500)");
    }

    #[test]
    fn test_query_status() {
        let err = QueryError::Status {
            status: 401,
            reason: "Unauthorized".into(),
            body: String::new(),
        };
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "Graph API returned HTTP 401 Unauthorized");
        assert_eq!(QueryError::Network("x".into()).status(), None);
    }
}
