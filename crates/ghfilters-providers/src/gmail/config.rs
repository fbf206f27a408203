//! Gmail provider configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ProviderError, ProviderResult};

/// OAuth 2.0 credentials for Google API access.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID from Google Cloud Console.
    pub client_id: String,
    /// The OAuth 2.0 client secret from Google Cloud Console.
    pub client_secret: String,
}

/// Structure of Google's OAuth client-secret JSON file.
///
/// Supports multiple formats:
/// 1. Google Cloud Console format with "installed" or "web" section
/// 2. Flat format with client_id and client_secret at root level
#[derive(Debug, Deserialize)]
pub struct GoogleCredentialsFile {
    /// Credentials for installed (desktop) applications.
    pub installed: Option<NestedCredentials>,
    /// Credentials for web applications.
    pub web: Option<NestedCredentials>,
    /// Direct client_id (flat format).
    pub client_id: Option<String>,
    /// Direct client_secret (flat format).
    pub client_secret: Option<String>,
}

/// OAuth credentials within a nested section of the credentials JSON file.
#[derive(Debug, Deserialize)]
pub struct NestedCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads OAuth credentials from a client-secret JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(format!(
                "unable to read client secret file {}: {}",
                path.display(),
                e
            ))
            .with_source(e)
        })?;
        Self::from_json(&content)
    }

    /// Parses OAuth credentials from a client-secret JSON string.
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let file: GoogleCredentialsFile = serde_json::from_str(json).map_err(|e| {
            ProviderError::configuration(format!("unable to parse client secret file: {}", e))
        })?;

        if let Some(creds) = file.installed.or(file.web) {
            return Ok(Self::new(creds.client_id, creds.client_secret));
        }

        if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret) {
            return Ok(Self::new(client_id, client_secret));
        }

        Err(ProviderError::configuration(
            "client secret file must contain an 'installed'/'web' section or 'client_id'/'client_secret' at root level",
        ))
    }

    /// Validates that the credentials appear to be correctly formatted.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Configuration for the Gmail provider.
#[derive(Debug, Clone)]
pub struct GmailConfig {
    /// OAuth credentials for API access.
    pub credentials: OAuthCredentials,

    /// Path of the cached token file.
    ///
    /// Defaults to `~/.credentials/create-github-gmail-filters.json`.
    pub token_path: PathBuf,

    /// Fixed port of the loopback OAuth callback listener.
    pub callback_port: u16,

    /// Request timeout.
    pub timeout: Duration,

    /// OAuth scopes to request.
    pub scopes: Vec<String>,

    /// Base URL of the Gmail REST API.
    pub api_base: String,

    /// Google authorization endpoint.
    pub auth_url: String,

    /// Google token endpoint.
    pub token_url: String,
}

impl GmailConfig {
    /// Name of the cached token file under `~/.credentials`.
    pub const TOKEN_FILE_NAME: &'static str = "create-github-gmail-filters.json";

    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Default port of the callback listener.
    pub const DEFAULT_CALLBACK_PORT: u16 = 9292;

    /// Scopes needed to read mail metadata, manage labels, and manage filters.
    pub const DEFAULT_SCOPES: [&'static str; 3] = [
        "https://www.googleapis.com/auth/gmail.readonly",
        "https://www.googleapis.com/auth/gmail.labels",
        "https://www.googleapis.com/auth/gmail.settings.basic",
    ];

    pub const DEFAULT_API_BASE: &'static str = "https://gmail.googleapis.com/gmail/v1";
    pub const DEFAULT_AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    pub const DEFAULT_TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    /// Creates a new Gmail configuration with the given credentials.
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            token_path: Self::default_token_path(),
            callback_port: Self::DEFAULT_CALLBACK_PORT,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            scopes: Self::DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            api_base: Self::DEFAULT_API_BASE.to_string(),
            auth_url: Self::DEFAULT_AUTH_URL.to_string(),
            token_url: Self::DEFAULT_TOKEN_URL.to_string(),
        }
    }

    /// Returns the default token cache path.
    pub fn default_token_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".credentials")
            .join(Self::TOKEN_FILE_NAME)
    }

    /// Sets the token cache path.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Sets the callback listener port.
    pub fn with_callback_port(mut self, port: u16) -> Self {
        self.callback_port = port;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Points the client at a different Gmail API base URL.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Points the OAuth client at different authorization/token endpoints.
    pub fn with_oauth_endpoints(
        mut self,
        auth_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        self.auth_url = auth_url.into();
        self.token_url = token_url.into();
        self
    }

    /// Returns the redirect URI registered for the callback listener.
    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/callback", self.callback_port)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.credentials
            .validate()
            .map_err(|e| format!("invalid credentials: {}", e))?;

        if self.scopes.is_empty() {
            return Err("at least one OAuth scope is required".to_string());
        }

        if self.callback_port == 0 {
            return Err("callback port must be non-zero".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_credentials() -> OAuthCredentials {
        OAuthCredentials::new("test-client.apps.googleusercontent.com", "test-secret")
    }

    #[test]
    fn credentials_validation() {
        assert!(test_credentials().validate().is_ok());
        assert!(OAuthCredentials::new("", "secret").validate().is_err());
        assert!(OAuthCredentials::new("id", "").validate().is_err());
    }

    #[test]
    fn config_defaults() {
        let config = GmailConfig::new(test_credentials());
        assert_eq!(config.callback_port, 9292);
        assert_eq!(config.scopes.len(), 3);
        assert!(
            config
                .scopes
                .contains(&"https://www.googleapis.com/auth/gmail.settings.basic".to_string())
        );
        assert!(config.token_path.ends_with(".credentials/create-github-gmail-filters.json"));
        assert_eq!(config.redirect_uri(), "http://127.0.0.1:9292/callback");
    }

    #[test]
    fn config_validation() {
        let config = GmailConfig::new(test_credentials());
        assert!(config.validate().is_ok());

        let no_scopes = GmailConfig::new(test_credentials()).with_scopes(vec![]);
        assert!(no_scopes.validate().is_err());

        let no_port = GmailConfig::new(test_credentials()).with_callback_port(0);
        assert!(no_port.validate().is_err());
    }

    #[test]
    fn config_builder_methods() {
        let config = GmailConfig::new(test_credentials())
            .with_token_path("/tmp/token.json")
            .with_callback_port(9393)
            .with_timeout(Duration::from_secs(5))
            .with_api_base("http://127.0.0.1:1234")
            .with_oauth_endpoints("http://auth", "http://token");

        assert_eq!(config.token_path, PathBuf::from("/tmp/token.json"));
        assert_eq!(config.redirect_uri(), "http://127.0.0.1:9393/callback");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.api_base, "http://127.0.0.1:1234");
        assert_eq!(config.auth_url, "http://auth");
        assert_eq!(config.token_url, "http://token");
    }

    #[test]
    fn credentials_from_json_installed() {
        let json = r#"{
            "installed": {
                "client_id": "test-id.apps.googleusercontent.com",
                "client_secret": "test-secret",
                "project_id": "my-project",
                "redirect_uris": ["http://localhost"]
            }
        }"#;

        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "test-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "test-secret");
    }

    #[test]
    fn credentials_from_json_web() {
        let json = r#"{
            "web": {
                "client_id": "web-id.apps.googleusercontent.com",
                "client_secret": "web-secret"
            }
        }"#;

        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "web-id.apps.googleusercontent.com");
    }

    #[test]
    fn credentials_from_json_flat() {
        let json = r#"{
            "client_id": "flat-id.apps.googleusercontent.com",
            "client_secret": "flat-secret"
        }"#;

        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_secret, "flat-secret");
    }

    #[test]
    fn credentials_from_json_invalid() {
        let err = OAuthCredentials::from_json(r#"{ "other": {} }"#).unwrap_err();
        assert_eq!(err.code(), crate::ProviderErrorCode::ConfigurationError);
        assert!(err.message().contains("client_id"));
    }

    #[test]
    fn credentials_from_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let err = OAuthCredentials::from_file(tmp.path().join("client_secret.json")).unwrap_err();
        assert_eq!(err.code(), crate::ProviderErrorCode::ConfigurationError);
        assert!(err.message().contains("unable to read client secret file"));
    }
}
