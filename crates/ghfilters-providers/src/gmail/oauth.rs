//! OAuth 2.0 PKCE flow for the Gmail API.
//!
//! Authorization Code flow with PKCE, using a loopback redirect on a fixed
//! local port.
//!
//! # Flow Overview
//!
//! 1. Generate a code verifier, its SHA-256 challenge, and a random state
//! 2. Bind the callback listener on the configured port
//! 3. Open the user's browser to Google's consent page
//! 4. Google redirects to the listener with the authorization code
//! 5. The listener thread hands the code to the caller over a channel
//! 6. Exchange the code (with verifier) for access and refresh tokens

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::error::{ProviderError, ProviderResult};

use super::config::{GmailConfig, OAuthCredentials};
use super::tokens::CachedToken;

/// The PKCE code verifier length (in bytes, before base64 encoding).
const CODE_VERIFIER_LENGTH: usize = 32;

/// Read/write timeout applied to each callback connection.
const CALLBACK_IO_TIMEOUT: Duration = Duration::from_secs(10);

const SUCCESS_PAGE: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=UTF-8\r\nConnection: close\r\n\r\n\
    <html><body><h2>Success!</h2>\
    <h3>Auth completed, check your console window for status during Gmail API calls</h3>\
    </body></html>";

const FAILURE_PAGE: &str = "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html; charset=UTF-8\r\nConnection: close\r\n\r\n\
    <html><body><h2>Authorization Failed</h2>\
    <p>Check your console window for details. You can close this window.</p>\
    </body></html>";

/// What the browser redirect carried back to the listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The user granted access.
    Code {
        code: String,
        state: Option<String>,
    },
    /// The user (or Google) refused; carries the `error` parameter.
    Denied(String),
}

impl CallbackOutcome {
    /// Returns the authorization code if access was granted and `state`
    /// matches the one sent to the consent page.
    pub fn into_code(self, expected_state: &str) -> ProviderResult<String> {
        match self {
            Self::Code { code, state } if state.as_deref() == Some(expected_state) => Ok(code),
            Self::Code { .. } => Err(ProviderError::authentication(
                "OAuth state mismatch - possible CSRF attack",
            )),
            Self::Denied(error) => Err(ProviderError::authentication(format!(
                "authorization denied: {}",
                error
            ))),
        }
    }
}

/// Parses the request line of a callback request.
///
/// Returns `None` for requests that carry neither `code` nor `error`
/// (a browser fetching `/favicon.ico`, for instance), so the listener keeps
/// waiting for the real redirect.
pub fn parse_callback_request(request_line: &str) -> Option<CallbackOutcome> {
    let mut parts = request_line.split_whitespace();
    if parts.next()? != "GET" {
        return None;
    }
    let target = parts.next()?;
    let url = url::Url::parse(&format!("http://127.0.0.1{}", target)).ok()?;

    let mut code = None;
    let mut state = None;
    let mut denied = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" if !value.is_empty() => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => denied = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = denied {
        return Some(CallbackOutcome::Denied(error));
    }
    code.map(|code| CallbackOutcome::Code { code, state })
}

/// OAuth client for the Gmail scopes.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
    auth_url: String,
    token_url: String,
    callback_port: u16,
    redirect_uri: String,
    scopes: Vec<String>,
}

impl OAuthClient {
    /// Creates an OAuth client from the Gmail configuration.
    pub fn new(config: &GmailConfig) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            credentials: config.credentials.clone(),
            http_client,
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            callback_port: config.callback_port,
            redirect_uri: config.redirect_uri(),
            scopes: config.scopes.clone(),
        })
    }

    /// Runs the interactive consent flow and returns the obtained tokens.
    ///
    /// Blocks until the browser redirect reaches the callback listener.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The callback port cannot be bound
    /// - The user denies authorization or the state does not match
    /// - Token exchange fails
    pub async fn authorize(&self) -> ProviderResult<CachedToken> {
        let pkce = PkceFlow::new();

        let listener = Self::bind_callback_listener(self.callback_port)?;
        let auth_url = pkce.build_auth_url(
            &self.auth_url,
            &self.credentials.client_id,
            &self.redirect_uri,
            &self.scopes,
        );

        info!("starting OAuth flow, opening browser...");
        eprintln!("\nGo to the following link in your browser to authorize access:\n\n{}\n", auth_url);
        if let Err(e) = open::that(&auth_url) {
            warn!("failed to open browser: {}", e);
        }

        let outcome = tokio::task::spawn_blocking(move || Self::wait_for_callback(listener))
            .await
            .map_err(|e| ProviderError::internal(format!("callback listener failed: {}", e)))??;

        let code = outcome.into_code(&pkce.state)?;

        info!("received authorization code, exchanging for tokens...");
        self.exchange_code(&code, &pkce.verifier).await
    }

    /// Refreshes an expired access token using the refresh token.
    ///
    /// Returns the new access token and its lifetime in seconds.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> ProviderResult<(String, Option<i64>)> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let token_response = self.post_token_request(&params, "token refresh").await?;

        info!("successfully refreshed access token");
        Ok((token_response.access_token, token_response.expires_in))
    }

    /// Exchanges an authorization code for tokens.
    async fn exchange_code(&self, code: &str, verifier: &str) -> ProviderResult<CachedToken> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let token_response = self.post_token_request(&params, "token exchange").await?;

        info!("successfully obtained tokens");
        Ok(CachedToken::from_grant(
            token_response.access_token,
            token_response.refresh_token,
            token_response.expires_in,
            self.scopes.clone(),
        ))
    }

    async fn post_token_request(
        &self,
        params: &[(&str, &str)],
        what: &str,
    ) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("{} request failed: {}", what, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "{} failed ({}): {}",
                what, status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid token response: {}", e))
        })
    }

    /// Binds the callback listener on the fixed loopback port.
    fn bind_callback_listener(port: u16) -> ProviderResult<TcpListener> {
        let listener = TcpListener::bind(("127.0.0.1", port)).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to bind OAuth callback listener on port {}: {}",
                port, e
            ))
            .with_source(e)
        })?;
        debug!("bound callback listener on port {}", port);
        Ok(listener)
    }

    /// Waits for the redirect carrying the authorization code.
    ///
    /// The accept loop runs on its own thread and hands exactly one outcome
    /// back through a channel.
    fn wait_for_callback(listener: TcpListener) -> ProviderResult<CallbackOutcome> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => {
                        if let Some(outcome) = Self::handle_callback(stream, CALLBACK_IO_TIMEOUT) {
                            let _ = tx.send(outcome);
                            return;
                        }
                    }
                    Err(e) => {
                        error!("failed to accept connection: {}", e);
                    }
                }
            }
        });

        rx.recv()
            .map_err(|_| ProviderError::internal("callback channel disconnected"))
    }

    /// Handles one connection on the callback listener.
    fn handle_callback(mut stream: TcpStream, io_timeout: Duration) -> Option<CallbackOutcome> {
        let _ = stream.set_read_timeout(Some(io_timeout));
        let _ = stream.set_write_timeout(Some(io_timeout));

        let mut request_line = String::new();
        if BufReader::new(&stream).read_line(&mut request_line).is_err() {
            return None;
        }

        let outcome = parse_callback_request(&request_line);
        let page = match outcome {
            Some(CallbackOutcome::Code { .. }) => SUCCESS_PAGE,
            _ => FAILURE_PAGE,
        };
        let _ = stream.write_all(page.as_bytes());
        let _ = stream.flush();

        outcome
    }
}

/// PKCE flow state and utilities.
///
/// Implements RFC 7636 (Proof Key for Code Exchange).
#[derive(Debug)]
pub struct PkceFlow {
    /// The code verifier (high-entropy random string).
    pub verifier: String,
    /// The code challenge (SHA-256 hash of verifier, base64url encoded).
    pub challenge: String,
    /// Random state for CSRF protection.
    pub state: String,
}

impl PkceFlow {
    /// Creates a new PKCE flow with random verifier and state.
    pub fn new() -> Self {
        let verifier = Self::generate_verifier();
        let challenge = Self::compute_challenge(&verifier);
        let state = Self::generate_state();

        Self {
            verifier,
            challenge,
            state,
        }
    }

    fn generate_verifier() -> String {
        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..CODE_VERIFIER_LENGTH).map(|_| rng.random()).collect();
        URL_SAFE_NO_PAD.encode(&bytes)
    }

    fn compute_challenge(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }

    fn generate_state() -> String {
        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..16).map(|_| rng.random()).collect();
        URL_SAFE_NO_PAD.encode(&bytes)
    }

    /// Builds the authorization URL for the consent page.
    pub fn build_auth_url(
        &self,
        auth_endpoint: &str,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> String {
        let scope = scopes.join(" ");

        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            auth_endpoint,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scope),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

/// Response from Google's token endpoint.
#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}
