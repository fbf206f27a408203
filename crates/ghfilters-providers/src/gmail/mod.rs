//! Gmail access: OAuth, token cache, and the labels/filters REST client.
//!
//! # Authentication Flow
//!
//! 1. The user supplies the client-secret JSON from Google Cloud Console
//! 2. A cached token under `~/.credentials` is used if present and valid
//! 3. An expired token with a refresh token is refreshed in place
//! 4. Otherwise a listener is bound on the fixed callback port, the browser
//!    is opened on Google's consent page, and the redirect's code is
//!    exchanged for tokens, which are then cached
//!
//! # Example
//!
//! ```ignore
//! use ghfilters_providers::gmail::{GmailAuthenticator, GmailConfig, OAuthCredentials};
//!
//! let credentials = OAuthCredentials::from_file("client_secret.json")?;
//! let auth = GmailAuthenticator::new(GmailConfig::new(credentials))?;
//! let gmail = auth.client().await?;
//! ```

mod client;
mod config;
mod oauth;
mod session;
mod tokens;

pub use client::GmailClient;
pub use config::{GmailConfig, OAuthCredentials};
pub use oauth::{CallbackOutcome, OAuthClient, PkceFlow, parse_callback_request};
pub use session::{GmailAuthenticator, TokenSource};
pub use tokens::{CachedToken, TokenCache};
