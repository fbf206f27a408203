//! Command-line driver for `create-github-gmail-filters`.
//!
//! Resolves settings from flags and `config.toml`, lists repositories, and
//! upserts one Gmail label and filter per repository.

pub mod cli;
pub mod config;
pub mod error;
pub mod run;
pub mod secret;
pub mod source;
pub mod upsert;

pub use cli::Cli;
pub use config::{ClientConfig, Settings};
pub use error::{ClientError, ClientResult};
pub use run::run;
pub use source::RepoSource;
pub use upsert::{RunSummary, Upserter};
