//! Token cache at `~/.credentials/create-github-gmail-filters.json`.
//!
//! A cached token lets later runs skip the browser. The file is created
//! with mode 0600 inside a 0700 directory and replaced atomically.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

/// Seconds shaved off the reported lifetime so a token is refreshed before
/// Google starts rejecting it.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// A token as stored in the cache file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default = "bearer")]
    pub token_type: String,

    /// Absent when the server did not report a lifetime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,

    /// Scopes the token was granted for.
    #[serde(default)]
    pub scopes: Vec<String>,
}

fn bearer() -> String {
    "Bearer".to_string()
}

fn expiry_in(secs: i64) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(secs - EXPIRY_MARGIN_SECS)
}

impl CachedToken {
    /// Builds a token from a token-endpoint grant.
    pub fn from_grant(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            token_type: bearer(),
            expiry: expires_in.map(expiry_in),
            scopes,
        }
    }

    /// True once the access token is (nearly) expired.
    pub fn needs_refresh(&self) -> bool {
        self.expiry.is_some_and(|expiry| Utc::now() >= expiry)
    }

    /// True if every scope in `required` was granted.
    pub fn covers(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Replaces the access token after a refresh grant. The refresh token
    /// and scopes are kept.
    pub fn apply_refresh(&mut self, access_token: impl Into<String>, expires_in: Option<i64>) {
        self.access_token = access_token.into();
        self.expiry = expires_in.map(expiry_in);
    }
}

/// The cache file.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the cached token.
    ///
    /// `Ok(None)` when there is no cache file; a configuration error when the
    /// file exists but does not hold a token.
    pub fn read(&self) -> ProviderResult<Option<CachedToken>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no token cache at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(ProviderError::configuration(format!(
                    "failed to read token cache {}: {}",
                    self.path.display(),
                    e
                ))
                .with_source(e));
            }
        };

        let token = serde_json::from_str(&content).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to parse token cache {}: {}",
                self.path.display(),
                e
            ))
        })?;
        debug!("loaded token cache from {}", self.path.display());
        Ok(Some(token))
    }

    /// Writes `token`, replacing any previous cache.
    pub fn write(&self, token: &CachedToken) -> ProviderResult<()> {
        info!("saving credential file to {}", self.path.display());

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            create_private_dir(dir).map_err(|e| {
                ProviderError::io(format!("failed to create {}: {}", dir.display(), e))
                    .with_source(e)
            })?;
        }

        let json = serde_json::to_vec_pretty(token)
            .map_err(|e| ProviderError::internal(format!("failed to encode token: {}", e)))?;

        let staging = self.path.with_extension("json.tmp");
        write_private_file(&staging, &json)
            .and_then(|()| fs::rename(&staging, &self.path))
            .map_err(|e| {
                let _ = fs::remove_file(&staging);
                ProviderError::io(format!(
                    "failed to write token cache {}: {}",
                    self.path.display(),
                    e
                ))
                .with_source(e)
            })
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    if dir.is_dir() {
        return Ok(());
    }
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}

fn write_private_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
