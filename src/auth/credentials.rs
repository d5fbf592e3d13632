//! Application identity used for the client-credentials grant.

use crate::error::ConfigError;
use crate::secret::SecretString;

/// Client id, tenant id and client secret of the app registration.
///
/// Constructed once from configuration and never mutated. All three fields are
/// guaranteed non-empty, so a token request can never be built from a blank value.
#[derive(Debug, Clone)]
pub struct AppCredentials {
    client_id: String,
    tenant_id: String,
    client_secret: SecretString,
}

impl AppCredentials {
    pub fn new(
        client_id: impl Into<String>,
        tenant_id: impl Into<String>,
        client_secret: impl Into<SecretString>,
    ) -> Result<Self, ConfigError> {
        let client_id = client_id.into();
        let tenant_id = tenant_id.into();
        let client_secret = client_secret.into();

        if client_id.trim().is_empty() {
            return Err(ConfigError::MissingKey("clientId"));
        }
        if tenant_id.trim().is_empty() {
            return Err(ConfigError::MissingKey("tenantId"));
        }
        if client_secret.is_empty() {
            return Err(ConfigError::MissingKey("clientSecret"));
        }

        Ok(Self {
            client_id,
            tenant_id,
            client_secret,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn client_secret(&self) -> &SecretString {
        &self.client_secret
    }
}
