//! Run driver: credentials, repository list, then one upsert per repository.

use tracing::{error, info};

use ghfilters_providers::MailSettingsApi;
use ghfilters_providers::gmail::{GmailAuthenticator, GmailConfig, OAuthCredentials};

use crate::config::Settings;
use crate::error::{ClientError, ClientResult};
use crate::upsert::{RunSummary, Upserter};

/// Runs the whole tool once. Stops at the first failing repository.
pub async fn run(settings: &Settings) -> ClientResult<RunSummary> {
    let credentials = OAuthCredentials::from_file(&settings.client_secret_path)
        .map_err(|e| ClientError::Config(e.message().to_string()))?;

    let config = GmailConfig::new(credentials)
        .with_token_path(settings.token_path.clone())
        .with_callback_port(settings.callback_port)
        .with_timeout(settings.timeout);
    let gmail = GmailAuthenticator::new(config)?.client().await?;

    let repos = settings.source.repositories().await?;
    info!("{} repositories to process", repos.len());

    let summary = upsert_all(&gmail, &repos, settings.resolve_existing_labels).await?;
    info!("run complete: {}", summary);
    Ok(summary)
}

/// Upserts label and filter for each repository, in order.
pub async fn upsert_all(
    api: &dyn MailSettingsApi,
    repos: &[String],
    resolve_existing: bool,
) -> ClientResult<RunSummary> {
    let mut upserter = Upserter::new(api, resolve_existing);

    for repo in repos {
        if let Err(e) = upserter.upsert(repo).await {
            error!("{}: {}", repo, e);
            return Err(ClientError::repository(repo.as_str(), e));
        }
    }

    Ok(upserter.summary())
}
