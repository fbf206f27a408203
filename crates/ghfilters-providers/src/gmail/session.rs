//! Credential acquisition for the Gmail API.
//!
//! Turns a [`GmailConfig`] into an authorized [`GmailClient`], using the
//! cached token when possible and the interactive consent flow otherwise.

use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};

use super::client::GmailClient;
use super::config::GmailConfig;
use super::oauth::OAuthClient;
use super::tokens::{CachedToken, TokenCache};

/// Where the token used for a session came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// Cached token used as-is.
    Cache,
    /// Cached token refreshed against the token endpoint.
    Refreshed,
    /// Fresh token from the browser consent flow.
    Browser,
}

/// Obtains authorized Gmail clients.
#[derive(Debug)]
pub struct GmailAuthenticator {
    config: GmailConfig,
    token_cache: TokenCache,
    oauth_client: OAuthClient,
}

impl GmailAuthenticator {
    /// Creates an authenticator. Performs no I/O.
    pub fn new(config: GmailConfig) -> ProviderResult<Self> {
        config.validate().map_err(ProviderError::configuration)?;

        let token_cache = TokenCache::new(&config.token_path);
        let oauth_client = OAuthClient::new(&config)?;

        Ok(Self {
            config,
            token_cache,
            oauth_client,
        })
    }

    /// Returns an authorized Gmail client.
    pub async fn client(&self) -> ProviderResult<GmailClient> {
        let (tokens, source) = self.acquire_token().await?;
        debug!("using token from {:?}", source);
        GmailClient::new(&self.config.api_base, tokens.access_token, self.config.timeout)
    }

    /// Returns a usable token, refreshing or re-authorizing as needed.
    pub async fn acquire_token(&self) -> ProviderResult<(CachedToken, TokenSource)> {
        match self.plan() {
            CachePlan::Use(tokens) => return Ok((tokens, TokenSource::Cache)),
            CachePlan::Refresh {
                tokens,
                refresh_token,
            } => {
                let tokens = self.refresh(tokens, &refresh_token).await?;
                return Ok((tokens, TokenSource::Refreshed));
            }
            CachePlan::Authorize => {}
        }

        let tokens = self.oauth_client.authorize().await?;
        self.token_cache.write(&tokens)?;
        Ok((tokens, TokenSource::Browser))
    }

    /// Decides what to do with the cache without touching the network.
    fn plan(&self) -> CachePlan {
        let Some(tokens) = self.cached_token() else {
            return CachePlan::Authorize;
        };

        if !tokens.covers(&self.config.scopes) {
            info!("cached token lacks required scopes, re-authorizing");
            return CachePlan::Authorize;
        }
        if !tokens.needs_refresh() {
            return CachePlan::Use(tokens);
        }
        match tokens.refresh_token.clone() {
            Some(refresh_token) => CachePlan::Refresh {
                tokens,
                refresh_token,
            },
            None => {
                info!("cached token expired and cannot be refreshed, re-authorizing");
                CachePlan::Authorize
            }
        }
    }

    /// Loads the cache, treating an unreadable file as absent.
    fn cached_token(&self) -> Option<CachedToken> {
        match self.token_cache.read() {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(
                    "ignoring token cache {}: {}",
                    self.token_cache.path().display(),
                    e
                );
                None
            }
        }
    }

    async fn refresh(
        &self,
        mut tokens: CachedToken,
        refresh_token: &str,
    ) -> ProviderResult<CachedToken> {
        debug!("refreshing expired access token");
        let (access_token, expires_in) = self.oauth_client.refresh_token(refresh_token).await?;
        tokens.apply_refresh(access_token, expires_in);
        self.token_cache.write(&tokens)?;
        Ok(tokens)
    }
}

#[derive(Debug, PartialEq)]
enum CachePlan {
    Use(CachedToken),
    Refresh {
        tokens: CachedToken,
        refresh_token: String,
    },
    Authorize,
}
