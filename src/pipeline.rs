//! The lookup run: credentials, then token, then directory query.

use tracing::{debug, info};

use crate::auth::TokenAcquirer;
use crate::config::Config;
use crate::error::AppError;
use crate::graph::{DirectoryLookup, LookupResult};

/// Run one lookup. Each stage must succeed before the next one starts; the
/// first failure ends the run.
pub async fn run(config: &Config) -> Result<LookupResult, AppError> {
    let credentials = config.credentials()?;
    let nickname = config.nickname()?;

    info!("Initializing Azure AD authentication...");
    let acquirer = TokenAcquirer::new(config)?;
    let token = acquirer.acquire(&credentials).await?;
    debug!(
        "{} token for {} (expires at {:?})",
        token.token_type(),
        token.scope(),
        token.expires_at()
    );

    let lookup = DirectoryLookup::new(config)?;
    let result = lookup.find_by_mail_nickname(&token, nickname).await?;
    info!(
        "Lookup complete: match={} users={}",
        result.is_found(),
        result.users().len()
    );

    Ok(result)
}
