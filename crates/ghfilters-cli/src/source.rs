//! Where repository names come from.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use ghfilters_providers::{GitHubClient, ProviderResult, list_local_repos};

/// Source of the repository list.
#[derive(Clone)]
pub enum RepoSource {
    /// Immediate subdirectories of a checkout directory.
    Local { dir: PathBuf },
    /// Repositories a GitHub user watches, narrowed to one organization.
    Watched {
        user: String,
        org_prefix: String,
        api_base: String,
        token: Option<String>,
        timeout: Duration,
    },
}

impl RepoSource {
    /// Returns the repository names, in listing order.
    pub async fn repositories(&self) -> ProviderResult<Vec<String>> {
        match self {
            Self::Local { dir } => {
                info!("listing local checkouts in {}", dir.display());
                list_local_repos(dir)
            }
            Self::Watched {
                user,
                org_prefix,
                api_base,
                token,
                timeout,
            } => {
                info!("listing repositories watched by {}", user);
                GitHubClient::new(api_base.as_str(), token.clone(), *timeout)?
                    .watched_repos(user, org_prefix)
                    .await
            }
        }
    }
}

impl fmt::Debug for RepoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local { dir } => f.debug_struct("Local").field("dir", dir).finish(),
            Self::Watched {
                user,
                org_prefix,
                api_base,
                token,
                timeout,
            } => f
                .debug_struct("Watched")
                .field("user", user)
                .field("org_prefix", org_prefix)
                .field("api_base", api_base)
                .field("token", &token.as_ref().map(|_| "<redacted>"))
                .field("timeout", timeout)
                .finish(),
        }
    }
}
