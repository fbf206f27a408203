//! Label and filter upserts.
//!
//! Creation is attempted unconditionally and an "already exists" conflict
//! counts as success, so reruns converge on the same mailbox state. Any other
//! error is returned to the caller, which ends the run.

use std::fmt;

use tracing::{debug, info};

use ghfilters_core::{Filter, Label};
use ghfilters_providers::{MailSettingsApi, ProviderResult};

/// Counts of what a run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub repositories: usize,
    pub labels_created: usize,
    pub labels_existing: usize,
    pub filters_created: usize,
    pub filters_existing: usize,
    pub filters_skipped: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} repositories: labels {} created / {} existing, filters {} created / {} existing / {} skipped",
            self.repositories,
            self.labels_created,
            self.labels_existing,
            self.filters_created,
            self.filters_existing,
            self.filters_skipped
        )
    }
}

/// Ensures labels and filters exist, tallying the outcome.
pub struct Upserter<'a> {
    api: &'a dyn MailSettingsApi,
    resolve_existing: bool,
    summary: RunSummary,
}

impl<'a> Upserter<'a> {
    /// Creates an upserter. With `resolve_existing`, a label that already
    /// exists is looked up by name so its filter can still be created.
    pub fn new(api: &'a dyn MailSettingsApi, resolve_existing: bool) -> Self {
        Self {
            api,
            resolve_existing,
            summary: RunSummary::default(),
        }
    }

    /// Ensures the label for `repo` exists.
    ///
    /// Returns the label when its identity is known: freshly created, or
    /// found after a conflict. Returns `None` on a conflict without lookup
    /// or when the lookup finds nothing.
    pub async fn ensure_label(&mut self, repo: &str) -> ProviderResult<Option<Label>> {
        let wanted = Label::for_repo(repo);
        info!("creating label {}", wanted.name);

        match self.api.create_label(&wanted).await {
            Ok(label) => {
                debug!("label {} created with id {:?}", label.name, label.id);
                self.summary.labels_created += 1;
                Ok(Some(label))
            }
            Err(e) if e.is_conflict() => {
                info!("label {} already exists", wanted.name);
                self.summary.labels_existing += 1;
                if !self.resolve_existing {
                    return Ok(None);
                }
                let found = self.api.find_label(&wanted.name).await?;
                if found.is_none() {
                    debug!("existing label {} not found in label list", wanted.name);
                }
                Ok(found)
            }
            Err(e) => Err(e),
        }
    }

    /// Ensures the routing filter for `repo` exists.
    ///
    /// Skipped (returns `None`) when `label` is absent or has no usable ID.
    pub async fn ensure_filter(
        &mut self,
        label: Option<&Label>,
        repo: &str,
    ) -> ProviderResult<Option<Filter>> {
        let Some(filter) = label.and_then(|label| Filter::for_repo(label, repo)) else {
            info!("no usable label for {}, skipping filter", repo);
            self.summary.filters_skipped += 1;
            return Ok(None);
        };

        info!("creating filter for {}", repo);
        match self.api.create_filter(&filter).await {
            Ok(created) => {
                debug!("filter for {} created with id {:?}", repo, created.id);
                self.summary.filters_created += 1;
                Ok(Some(created))
            }
            Err(e) if e.is_conflict() => {
                info!("filter for {} already exists", repo);
                self.summary.filters_existing += 1;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Label then filter for one repository.
    pub async fn upsert(&mut self, repo: &str) -> ProviderResult<()> {
        let label = self.ensure_label(repo).await?;
        self.ensure_filter(label.as_ref(), repo).await?;
        self.summary.repositories += 1;
        Ok(())
    }

    /// Returns the tally so far.
    pub fn summary(&self) -> RunSummary {
        self.summary
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use ghfilters_providers::{BoxFuture, ProviderError, ProviderErrorCode};

    /// Gmail's answer to a filter whose criteria already exist.
    const DUPLICATE_FILTER_BODY: &str = r#"{"error": {"code": 400, "message": "Filter already exists", "status": "FAILED_PRECONDITION"}}"#;

    /// In-memory mailbox that answers like Gmail: a duplicate label is a 409,
    /// a duplicate filter a 400 "Filter already exists".
    #[derive(Default)]
    pub(crate) struct FakeMailbox {
        pub(crate) labels: Mutex<HashMap<String, String>>,
        pub(crate) filters: Mutex<Vec<Filter>>,
        /// Names that conflict but never show up in the label list.
        pub(crate) hidden_labels: Vec<String>,
        /// Names whose creation fails with a server error.
        pub(crate) failing_labels: Vec<String>,
        pub(crate) calls: Mutex<Vec<String>>,
    }

    impl FakeMailbox {
        pub(crate) fn with_label(self, name: &str, id: &str) -> Self {
            self.labels
                .lock()
                .unwrap()
                .insert(name.to_string(), id.to_string());
            self
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub(crate) fn filters(&self) -> Vec<Filter> {
            self.filters.lock().unwrap().clone()
        }
    }

    impl MailSettingsApi for FakeMailbox {
        fn create_label<'a>(&'a self, label: &'a Label) -> BoxFuture<'a, ProviderResult<Label>> {
            Box::pin(async move {
                self.calls
                    .lock()
                    .unwrap()
                    .push(format!("create_label {}", label.name));
                if self.failing_labels.contains(&label.name) {
                    return Err(ProviderError::new(
                        ProviderErrorCode::ServerError,
                        "backend error",
                    ));
                }
                if self.hidden_labels.contains(&label.name) {
                    return Err(ProviderError::conflict("Label name exists or conflicts"));
                }
                let mut labels = self.labels.lock().unwrap();
                if labels.contains_key(&label.name) {
                    return Err(ProviderError::conflict("Label name exists or conflicts"));
                }
                let id = format!("Label_{}", labels.len() + 1);
                labels.insert(label.name.clone(), id.clone());
                Ok(Label {
                    id: Some(id),
                    ..label.clone()
                })
            })
        }

        fn find_label<'a>(
            &'a self,
            name: &'a str,
        ) -> BoxFuture<'a, ProviderResult<Option<Label>>> {
            Box::pin(async move {
                self.calls.lock().unwrap().push(format!("find_label {}", name));
                Ok(self.labels.lock().unwrap().get(name).map(|id| Label {
                    id: Some(id.clone()),
                    name: name.to_string(),
                    message_list_visibility: None,
                    label_list_visibility: None,
                    label_type: Some("user".to_string()),
                }))
            })
        }

        fn create_filter<'a>(
            &'a self,
            filter: &'a Filter,
        ) -> BoxFuture<'a, ProviderResult<Filter>> {
            Box::pin(async move {
                let to = filter.criteria.to.clone().unwrap_or_default();
                self.calls.lock().unwrap().push(format!("create_filter {}", to));
                let mut filters = self.filters.lock().unwrap();
                if filters.iter().any(|f| f.criteria == filter.criteria) {
                    return Err(ProviderError::from_status(
                        reqwest::StatusCode::BAD_REQUEST,
                        DUPLICATE_FILTER_BODY,
                    ));
                }
                let created = Filter {
                    id: Some(format!("Filter_{}", filters.len() + 1)),
                    ..filter.clone()
                };
                filters.push(created.clone());
                Ok(created)
            })
        }
    }

    #[tokio::test]
    async fn ensure_label_twice_is_not_fatal() {
        let mailbox = FakeMailbox::default();
        let mut upserter = Upserter::new(&mailbox, true);

        let first = upserter.ensure_label("linguist").await.unwrap().unwrap();
        let second = upserter.ensure_label("linguist").await.unwrap().unwrap();
        assert_eq!(first.id, second.id);

        let summary = upserter.summary();
        assert_eq!(summary.labels_created, 1);
        assert_eq!(summary.labels_existing, 1);
    }

    #[tokio::test]
    async fn conflict_without_lookup_yields_none() {
        let mailbox = FakeMailbox::default().with_label("github/hub", "Label_9");
        let mut upserter = Upserter::new(&mailbox, false);

        assert!(upserter.ensure_label("hub").await.unwrap().is_none());
        assert_eq!(mailbox.calls(), vec!["create_label github/hub"]);
    }

    #[tokio::test]
    async fn conflict_resolves_existing_label() {
        let mailbox = FakeMailbox::default().with_label("github/hub", "Label_9");
        let mut upserter = Upserter::new(&mailbox, true);

        upserter.upsert("hub").await.unwrap();

        let filters = mailbox.filters();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].action.add_label_ids, vec!["Label_9"]);
    }

    #[tokio::test]
    async fn unresolvable_conflict_skips_filter() {
        let mailbox = FakeMailbox {
            hidden_labels: vec!["github/ghost".to_string()],
            ..FakeMailbox::default()
        };
        let mut upserter = Upserter::new(&mailbox, true);

        upserter.upsert("ghost").await.unwrap();

        assert_eq!(
            mailbox.calls(),
            vec!["create_label github/ghost", "find_label github/ghost"]
        );
        assert!(mailbox.filters().is_empty());
        assert_eq!(upserter.summary().filters_skipped, 1);
    }

    #[tokio::test]
    async fn blank_label_id_skips_filter() {
        let mailbox = FakeMailbox::default();
        let mut upserter = Upserter::new(&mailbox, true);
        let label = Label {
            id: Some("  ".to_string()),
            ..Label::for_repo("linguist")
        };

        let filter = upserter
            .ensure_filter(Some(&label), "linguist")
            .await
            .unwrap();
        assert!(filter.is_none());
        assert!(mailbox.calls().is_empty());
    }

    #[tokio::test]
    async fn filter_routes_notifications() {
        let mailbox = FakeMailbox::default();
        let mut upserter = Upserter::new(&mailbox, true);

        upserter.upsert("linguist").await.unwrap();

        let filters = mailbox.filters();
        assert_eq!(filters.len(), 1);
        let filter = &filters[0];
        assert_eq!(
            filter.criteria.to.as_deref(),
            Some("linguist@noreply.github.com")
        );
        assert_eq!(filter.criteria.subject.as_deref(), Some("[github/linguist]"));
        assert_eq!(filter.action.remove_label_ids, vec!["INBOX"]);
    }

    #[tokio::test]
    async fn filter_conflict_is_success() {
        let mailbox = FakeMailbox::default();
        let mut upserter = Upserter::new(&mailbox, true);

        upserter.upsert("linguist").await.unwrap();
        upserter.upsert("linguist").await.unwrap();

        let summary = upserter.summary();
        assert_eq!(summary.repositories, 2);
        assert_eq!(summary.filters_created, 1);
        assert_eq!(summary.filters_existing, 1);
        assert_eq!(mailbox.filters().len(), 1);
    }

    #[tokio::test]
    async fn other_errors_are_fatal() {
        let mailbox = FakeMailbox {
            failing_labels: vec!["github/broken".to_string()],
            ..FakeMailbox::default()
        };
        let mut upserter = Upserter::new(&mailbox, true);

        let err = upserter.upsert("broken").await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ServerError);
        assert!(mailbox.filters().is_empty());
    }

    #[test]
    fn summary_display() {
        let summary = RunSummary {
            repositories: 2,
            labels_created: 1,
            labels_existing: 1,
            filters_created: 1,
            filters_existing: 0,
            filters_skipped: 1,
        };
        assert_eq!(
            summary.to_string(),
            "2 repositories: labels 1 created / 1 existing, filters 1 created / 0 existing / 1 skipped"
        );
    }
}
