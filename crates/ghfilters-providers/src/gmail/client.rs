//! Gmail REST client for labels and filters.

use std::time::Duration;

use ghfilters_core::{Filter, Label};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, MailSettingsApi};

/// Gmail API client authorized with a bearer token.
#[derive(Debug)]
pub struct GmailClient {
    http_client: reqwest::Client,
    access_token: String,
    api_base: String,
}

impl GmailClient {
    /// Creates a Gmail client for the given API base and access token.
    pub fn new(
        api_base: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            access_token: access_token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Creates a label. A 409 surfaces as a conflict error.
    pub async fn create_label(&self, label: &Label) -> ProviderResult<Label> {
        let url = format!("{}/users/me/labels", self.api_base);
        debug!("POST {} name={}", url, label.name);
        let request = self.http_client.post(&url).json(label);
        self.send(request).await
    }

    /// Lists the user's labels.
    pub async fn list_labels(&self) -> ProviderResult<Vec<Label>> {
        let url = format!("{}/users/me/labels", self.api_base);
        debug!("GET {}", url);
        let list: LabelListResponse = self.send(self.http_client.get(&url)).await?;
        Ok(list.labels)
    }

    /// Creates a filter. A duplicate (Gmail answers 400 "Filter already
    /// exists") surfaces as a conflict error.
    pub async fn create_filter(&self, filter: &Filter) -> ProviderResult<Filter> {
        let url = format!("{}/users/me/settings/filters", self.api_base);
        debug!("POST {} to={:?}", url, filter.criteria.to);
        let request = self.http_client.post(&url).json(filter);
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> ProviderResult<T> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| {
                let err = if e.is_timeout() {
                    ProviderError::network("request timeout")
                } else if e.is_connect() {
                    ProviderError::network(format!("connection failed: {}", e))
                } else {
                    ProviderError::network(format!("request failed: {}", e))
                };
                err.with_provider("gmail")
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read response: {}", e)).with_provider("gmail")
        })?;

        if !status.is_success() {
            return Err(ProviderError::from_status(status, &body).with_provider("gmail"));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
                .with_provider("gmail")
        })
    }
}

impl MailSettingsApi for GmailClient {
    fn create_label<'a>(&'a self, label: &'a Label) -> BoxFuture<'a, ProviderResult<Label>> {
        Box::pin(GmailClient::create_label(self, label))
    }

    fn find_label<'a>(&'a self, name: &'a str) -> BoxFuture<'a, ProviderResult<Option<Label>>> {
        Box::pin(async move {
            let labels = self.list_labels().await?;
            Ok(labels.into_iter().find(|label| label.name == name))
        })
    }

    fn create_filter<'a>(&'a self, filter: &'a Filter) -> BoxFuture<'a, ProviderResult<Filter>> {
        Box::pin(GmailClient::create_filter(self, filter))
    }
}

/// Response from the labels.list endpoint.
#[derive(Debug, Deserialize)]
struct LabelListResponse {
    #[serde(default)]
    labels: Vec<Label>,
}
