//! Client configuration.
//!
//! Settings live in an optional `config.toml` at
//! `~/.config/create-github-gmail-filters/config.toml` by default. Command
//! line flags take precedence over the file, and the file over built-in
//! defaults.
//!
//! The GitHub token supports secret references:
//! - `pass::path/in/store`, resolved via `pass show`
//! - `env::VAR_NAME`, read from the environment
//! - plain text, used as-is

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use ghfilters_providers::GITHUB_API_BASE;
use ghfilters_providers::gmail::GmailConfig;

use crate::cli::Cli;
use crate::error::{ClientError, ClientResult};
use crate::secret;
use crate::source::RepoSource;

/// Application directory name under the config dir.
const APP_NAME: &str = "create-github-gmail-filters";

/// Default client-secret file, relative to the working directory.
pub const DEFAULT_CLIENT_SECRET: &str = "client_secret.json";

/// Default organization prefix for watched repositories.
pub const DEFAULT_ORG_PREFIX: &str = "github/";

// ---------------------------------------------------------------------------
// ClientConfig (config.toml)
// ---------------------------------------------------------------------------

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Gmail / OAuth settings.
    pub gmail: GmailSettings,

    /// GitHub settings.
    pub github: GitHubSettings,
}

/// Gmail / OAuth settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GmailSettings {
    /// Path to the OAuth client secret JSON.
    pub client_secret_path: Option<PathBuf>,

    /// Path of the cached token.
    pub token_path: Option<PathBuf>,

    /// Port of the OAuth callback listener.
    pub callback_port: Option<u16>,

    /// HTTP request timeout in seconds.
    pub timeout_secs: Option<u64>,

    /// Look up labels that already exist so their filters can be created.
    pub resolve_existing_labels: Option<bool>,
}

/// GitHub settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GitHubSettings {
    /// User whose subscriptions are listed.
    pub user: Option<String>,

    /// Prefix a subscription's full name must start with.
    pub org_prefix: Option<String>,

    /// Directory holding local checkouts.
    pub checkout_dir: Option<PathBuf>,

    /// API token (supports `pass::` and `env::` prefixes).
    pub token: Option<String>,
}

impl ClientConfig {
    /// Loads configuration from `path`, or from the default path if `None`.
    ///
    /// A missing default file yields defaults; a missing explicit file is an
    /// error.
    pub fn load(path: Option<&Path>) -> ClientResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read config {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            ClientError::Config(format!("failed to parse config {}: {}", path.display(), e))
        })
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME)
            .join("config.toml")
    }
}

// ---------------------------------------------------------------------------
// Settings (flags merged over config.toml)
// ---------------------------------------------------------------------------

/// Effective settings of one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub client_secret_path: PathBuf,
    pub token_path: PathBuf,
    pub callback_port: u16,
    pub timeout: Duration,
    pub resolve_existing_labels: bool,
    pub source: RepoSource,
}

impl Settings {
    /// Merges command-line flags over the config file.
    pub fn resolve(cli: &Cli, config: &ClientConfig) -> ClientResult<Self> {
        let gmail = &config.gmail;
        let github = &config.github;

        let client_secret_path = cli
            .client_secret
            .clone()
            .or_else(|| gmail.client_secret_path.clone())
            .map(|p| expand_home(&p))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CLIENT_SECRET));

        let token_path = cli
            .token_cache
            .clone()
            .or_else(|| gmail.token_path.clone())
            .map(|p| expand_home(&p))
            .unwrap_or_else(GmailConfig::default_token_path);

        let callback_port = cli
            .port
            .or(gmail.callback_port)
            .unwrap_or(GmailConfig::DEFAULT_CALLBACK_PORT);
        if callback_port == 0 {
            return Err(ClientError::Config(
                "callback port must be non-zero".to_string(),
            ));
        }

        let timeout = Duration::from_secs(
            gmail
                .timeout_secs
                .unwrap_or(GmailConfig::DEFAULT_TIMEOUT_SECS),
        );

        let resolve_existing_labels =
            !cli.no_resolve_existing && gmail.resolve_existing_labels.unwrap_or(true);

        let source = if cli.local {
            let dir = cli
                .github_dir
                .clone()
                .or_else(|| github.checkout_dir.clone())
                .map(|p| expand_home(&p))
                .unwrap_or_else(default_checkout_dir);
            RepoSource::Local { dir }
        } else {
            let user = cli
                .user
                .clone()
                .or_else(|| github.user.clone())
                .filter(|u| !u.is_empty())
                .ok_or_else(|| {
                    ClientError::Config(
                        "no GitHub user: pass --user, set [github] user, or set $USER"
                            .to_string(),
                    )
                })?;
            let org_prefix = cli
                .org_prefix
                .clone()
                .or_else(|| github.org_prefix.clone())
                .unwrap_or_else(|| DEFAULT_ORG_PREFIX.to_string());
            RepoSource::Watched {
                user,
                org_prefix,
                api_base: GITHUB_API_BASE.to_string(),
                token: github_token(github.token.as_deref())?,
                timeout,
            }
        };

        Ok(Self {
            client_secret_path,
            token_path,
            callback_port,
            timeout,
            resolve_existing_labels,
            source,
        })
    }
}

/// Resolves the GitHub token from the config value, falling back to
/// `$GITHUB_TOKEN`.
fn github_token(configured: Option<&str>) -> ClientResult<Option<String>> {
    match configured {
        Some(value) => secret::resolve(value)
            .map(Some)
            .map_err(|e| ClientError::Config(format!("failed to resolve GitHub token: {}", e))),
        None => Ok(std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty())),
    }
}

/// `$HOME/github`.
fn default_checkout_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("github")
}

/// Expands a leading `~/` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
