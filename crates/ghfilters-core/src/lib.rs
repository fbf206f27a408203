//! Core types: labels, filters, naming rules, logging setup

pub mod mail;
pub mod tracing;

pub use mail::{
    Filter, FilterAction, FilterCriteria, INBOX_LABEL_ID, LABEL_PREFIX, Label, NOREPLY_DOMAIN,
    label_name, noreply_address, subject_tag,
};
pub use tracing::{LogConfig, LogError, LogFormat, init_logging};
