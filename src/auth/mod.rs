//! Azure AD authentication module.
//!
//! Provides the application identity and the OAuth2 client-credentials
//! token acquisition used to call Microsoft Graph as the application itself.

pub mod credentials;
pub mod oauth;

pub use credentials::AppCredentials;
pub use oauth::{AccessToken, TokenAcquirer};
