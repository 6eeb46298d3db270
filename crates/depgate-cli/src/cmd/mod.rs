pub mod check;
pub mod config;
pub mod inventory;
pub mod ping;
pub mod scan;
pub mod watch;

use std::sync::Arc;

use anyhow::Context;
use depgate_core::{Config, CredentialProvider, DepgateError, EnvCredentials, HttpValidationClient};

/// Credentials read from `DEPGATE_TOKEN` at call time.
pub(crate) fn credentials() -> Arc<EnvCredentials> {
    Arc::new(EnvCredentials::default())
}

/// Fail early with a readable message when no token is configured.
pub(crate) fn require_credential(creds: &dyn CredentialProvider) -> anyhow::Result<()> {
    if creds.credential().is_none() {
        return Err(DepgateError::CredentialMissing.into());
    }
    Ok(())
}

pub(crate) fn http_client(
    config: &Config,
    creds: Arc<dyn CredentialProvider>,
) -> anyhow::Result<HttpValidationClient> {
    HttpValidationClient::new(
        &config.api_url,
        creds,
        config.connect_timeout(),
        config.request_timeout(),
    )
    .context("failed to build validation client")
}

pub(crate) fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to start async runtime")
}
