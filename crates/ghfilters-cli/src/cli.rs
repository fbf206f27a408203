//! Command-line interface definition.

use std::path::PathBuf;

use clap::Parser;

/// Create a Gmail label and inbox filter for every GitHub repository you
/// watch (or have checked out locally), so notification mail is labeled and
/// archived automatically.
#[derive(Debug, Parser)]
#[command(name = "create-github-gmail-filters")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Build repo list from local checkouts instead of GitHub subscriptions
    #[arg(long)]
    pub local: bool,

    /// Path to configuration file
    #[arg(long, short, env = "GHFILTERS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Path to the OAuth client secret JSON from Google Cloud Console
    #[arg(long)]
    pub client_secret: Option<PathBuf>,

    /// Path of the cached OAuth token
    #[arg(long)]
    pub token_cache: Option<PathBuf>,

    /// Port of the local OAuth callback listener
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory holding local checkouts (with --local)
    #[arg(long)]
    pub github_dir: Option<PathBuf>,

    /// GitHub user whose subscriptions are listed
    #[arg(long, env = "USER")]
    pub user: Option<String>,

    /// Only keep subscriptions whose full name starts with this prefix
    #[arg(long)]
    pub org_prefix: Option<String>,

    /// Skip looking up labels that already exist, so their filters are not created
    #[arg(long)]
    pub no_resolve_existing: bool,
}
