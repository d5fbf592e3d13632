//! Data models for the Graph user listing and its classification.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// Name and principal name of a matched user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub display_name: String,
    pub user_principal_name: String,
}

impl UserSummary {
    pub fn new(display_name: impl Into<String>, user_principal_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            user_principal_name: user_principal_name.into(),
        }
    }
}

impl fmt::Display for UserSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "User: {}, UserPrincipalName: {}",
            self.display_name, self.user_principal_name
        )
    }
}

/// Outcome of a successful (2xx) directory query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    /// The `value` array was empty.
    NotFound,
    /// One summary per element of `value`, in response order.
    Found(Vec<UserSummary>),
    /// The body was not JSON or had no `value` array. Carries the raw payload.
    Malformed(String),
}

/// Page of `/users` results. Elements and the paging link stay loosely typed so an odd
/// field never hides the rest of the page.
#[derive(Debug, Deserialize)]
struct UserListResponse {
    value: Vec<Value>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<Value>,
}

/// String field of a user element; missing, `null` or non-string values read as empty.
fn string_field(user: &Value, key: &str) -> String {
    user.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

impl From<&Value> for UserSummary {
    fn from(user: &Value) -> Self {
        Self::new(
            string_field(user, "displayName"),
            string_field(user, "userPrincipalName"),
        )
    }
}

impl LookupResult {
    /// Classify a response body. Never fails: anything unexpected becomes `Malformed`.
    pub fn from_body(raw: &str) -> Self {
        let page: UserListResponse = match serde_json::from_str(raw) {
            Ok(page) => page,
            Err(e) => {
                warn!("Failed to parse JSON response: {}", e);
                return Self::Malformed(raw.to_string());
            }
        };

        if let Some(next_link) = page.next_link {
            warn!(
                "More results are available ({}); only the first page is reported",
                next_link
            );
        }

        if page.value.is_empty() {
            Self::NotFound
        } else {
            Self::Found(page.value.iter().map(UserSummary::from).collect())
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Matched users; empty unless `Found`.
    pub fn users(&self) -> &[UserSummary] {
        match self {
            Self::Found(users) => users,
            _ => &[],
        }
    }

    /// Human-readable status lines for the console.
    pub fn report_lines(&self) -> Vec<String> {
        match self {
            Self::NotFound => vec!["User not found.".to_string()],
            Self::Found(users) => {
                let mut lines = Vec::with_capacity(users.len() + 1);
                lines.push(format!("User found. Number of users: {}", users.len()));
                lines.extend(users.iter().map(ToString::to_string));
                lines
            }
            Self::Malformed(_) => vec!["Unexpected response format.".to_string()],
        }
    }
}
