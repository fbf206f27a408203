//! Gmail and GitHub access for the filter tool.
//!
//! - [`gmail`] - OAuth consent flow, token cache, labels/filters client
//! - [`github`] - watched repositories of a user
//! - [`local`] - repositories checked out in a local directory
//! - [`MailSettingsApi`] - the mailbox seam used by the upserter
//! - [`ProviderError`] - error taxonomy shared by all of the above

pub mod error;
pub mod github;
pub mod gmail;
pub mod local;
pub mod provider;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use github::{GITHUB_API_BASE, GitHubClient, Subscription};
pub use local::list_local_repos;
pub use provider::{BoxFuture, MailSettingsApi};
