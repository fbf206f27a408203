//! Mail settings abstraction.
//!
//! [`MailSettingsApi`] is the seam between the label/filter upserter and the
//! Gmail REST client, so the upsert rules can be exercised without a server.

use std::future::Future;
use std::pin::Pin;

use ghfilters_core::{Filter, Label};

use crate::error::ProviderResult;

/// A boxed future for async trait methods.
///
/// Boxed futures keep the trait object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Label and filter operations of a mailbox.
///
/// Implementations report "already exists" responses as errors whose
/// [`is_conflict`](crate::ProviderError::is_conflict) returns true; deciding
/// that a conflict is harmless is left to the caller.
pub trait MailSettingsApi: Send + Sync {
    /// Creates a label and returns it with its server-assigned ID.
    fn create_label<'a>(&'a self, label: &'a Label) -> BoxFuture<'a, ProviderResult<Label>>;

    /// Looks up an existing label by exact name.
    fn find_label<'a>(&'a self, name: &'a str) -> BoxFuture<'a, ProviderResult<Option<Label>>>;

    /// Creates a filter.
    fn create_filter<'a>(&'a self, filter: &'a Filter) -> BoxFuture<'a, ProviderResult<Filter>>;
}
