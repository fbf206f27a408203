//! Gmail label and filter types.
//!
//! These mirror the Gmail v1 REST resources closely enough to be sent and
//! received as-is, and carry the naming rules that tie a repository to its
//! label, its notification address, and its subject tag.

use serde::{Deserialize, Serialize};

/// Prefix of every label created for a repository.
pub const LABEL_PREFIX: &str = "github/";

/// Domain GitHub sends notification mail from.
pub const NOREPLY_DOMAIN: &str = "noreply.github.com";

/// System label removed by every filter so matching mail skips the inbox.
pub const INBOX_LABEL_ID: &str = "INBOX";

/// Returns the label name for a repository (`github/<repo>`).
pub fn label_name(repo: &str) -> String {
    format!("{LABEL_PREFIX}{repo}")
}

/// Returns the per-repository notification address (`<repo>@noreply.github.com`).
pub fn noreply_address(repo: &str) -> String {
    format!("{repo}@{NOREPLY_DOMAIN}")
}

/// Returns the subject tag GitHub puts in notification mail for a label.
pub fn subject_tag(label_name: &str) -> String {
    format!("[{label_name}]")
}

/// A Gmail label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    /// Server-assigned identifier; absent until the label has been created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Display name, e.g. `github/linguist`.
    pub name: String,

    /// Whether messages carrying the label show in the message list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_list_visibility: Option<String>,

    /// Whether the label shows in the label list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_list_visibility: Option<String>,

    /// `user` or `system`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub label_type: Option<String>,
}

impl Label {
    /// Creates the label to request for a repository, with the fixed
    /// visibility settings used for every repository label.
    pub fn for_repo(repo: &str) -> Self {
        Self {
            id: None,
            name: label_name(repo),
            message_list_visibility: Some("show".to_string()),
            label_list_visibility: Some("labelShowIfUnread".to_string()),
            label_type: Some("user".to_string()),
        }
    }

    /// Returns the server ID if the label has a usable one.
    pub fn usable_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

/// Matching rules of a filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

/// What a filter does to matching mail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterAction {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add_label_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove_label_ids: Vec<String>,
}

/// A Gmail filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub criteria: FilterCriteria,
    pub action: FilterAction,
}

impl Filter {
    /// Builds the routing filter for `repo` that applies `label` and archives.
    ///
    /// Returns `None` when the label has no usable server ID.
    pub fn for_repo(label: &Label, repo: &str) -> Option<Self> {
        let label_id = label.usable_id()?;

        Some(Self {
            id: None,
            criteria: FilterCriteria {
                to: Some(noreply_address(repo)),
                subject: Some(subject_tag(&label.name)),
            },
            action: FilterAction {
                add_label_ids: vec![label_id.to_string()],
                remove_label_ids: vec![INBOX_LABEL_ID.to_string()],
            },
        })
    }
}
