//! GitHub subscriptions client.
//!
//! Lists the repositories a user watches, following `Link` pagination, and
//! narrows them down to one organization.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};

/// Base URL of the GitHub REST API.
pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Page size requested from the subscriptions endpoint.
const PER_PAGE: u32 = 100;

/// Upper bound on pages followed for one listing.
const MAX_PAGES: usize = 1000;

static NEXT_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<([^>]+)>\s*;\s*rel="next""#).expect("valid next-link regex")
});

/// One element of the subscriptions listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    /// `owner/name`.
    pub full_name: Option<String>,
    /// Repository name without the owner.
    pub name: Option<String>,
}

/// Keeps subscriptions whose `full_name` starts with `prefix` and returns
/// their names, in listing order.
pub fn names_with_prefix(subscriptions: &[Subscription], prefix: &str) -> Vec<String> {
    subscriptions
        .iter()
        .filter(|sub| {
            sub.full_name
                .as_deref()
                .is_some_and(|full_name| full_name.starts_with(prefix))
        })
        .filter_map(|sub| sub.name.clone())
        .collect()
}

/// Extracts the `rel="next"` target from a `Link` header.
pub fn next_page_link(link_header: &str) -> Option<String> {
    NEXT_LINK
        .captures(link_header)
        .map(|caps| caps[1].to_string())
}

/// GitHub REST client.
#[derive(Debug)]
pub struct GitHubClient {
    http_client: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl GitHubClient {
    /// Creates a GitHub client. `token` is optional; anonymous requests work
    /// for public subscriptions.
    pub fn new(
        api_base: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("create-github-gmail-filters/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Returns the names of repositories `user` watches whose full name
    /// starts with `prefix`.
    pub async fn watched_repos(&self, user: &str, prefix: &str) -> ProviderResult<Vec<String>> {
        let subscriptions = self.subscriptions(user).await?;
        let names = names_with_prefix(&subscriptions, prefix);
        info!(
            "{} of {} watched repositories match {:?}",
            names.len(),
            subscriptions.len(),
            prefix
        );
        Ok(names)
    }

    /// Fetches every page of `user`'s subscriptions.
    ///
    /// Each page URL is fetched at most once; a `next` link back to a page
    /// already seen ends the listing.
    pub async fn subscriptions(&self, user: &str) -> ProviderResult<Vec<Subscription>> {
        let mut all = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(format!(
            "{}/users/{}/subscriptions?per_page={}",
            self.api_base,
            urlencoding::encode(user),
            PER_PAGE
        ));

        while let Some(url) = next.take() {
            if seen.len() >= MAX_PAGES {
                warn!("stopping after {} pages of subscriptions", MAX_PAGES);
                break;
            }
            if !seen.insert(url.clone()) {
                warn!("next link {} points to a page already fetched, stopping", url);
                break;
            }
            let (page, link) = self.subscriptions_page(&url).await?;
            debug!("fetched {} subscriptions from {}", page.len(), url);
            all.extend(page);
            next = link.as_deref().and_then(next_page_link);
        }

        Ok(all)
    }

    async fn subscriptions_page(
        &self,
        url: &str,
    ) -> ProviderResult<(Vec<Subscription>, Option<String>)> {
        let mut request = self
            .http_client
            .get(url)
            .header("Accept", "application/vnd.github+json");
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            ProviderError::network(format!("failed to read watch list from {}: {}", url, e))
                .with_provider("github")
        })?;

        let status = response.status();
        let link = response
            .headers()
            .get("Link")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body = response.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read response: {}", e)).with_provider("github")
        })?;

        if !status.is_success() {
            return Err(ProviderError::from_status(status, &body).with_provider("github"));
        }

        let page: Vec<Subscription> = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse watch list: {}", e))
                .with_provider("github")
        })?;

        Ok((page, link))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorCode;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sub(full_name: &str, name: &str) -> Subscription {
        Subscription {
            full_name: Some(full_name.to_string()),
            name: Some(name.to_string()),
        }
    }

    fn client(server: &MockServer, token: Option<&str>) -> GitHubClient {
        GitHubClient::new(server.uri(), token.map(String::from), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn prefix_filter_excludes_other_owners() {
        let subs = vec![
            sub("github/linguist", "linguist"),
            sub("rails/rails", "rails"),
            sub("githubber/tool", "tool"),
            sub("github/docs", "docs"),
        ];
        assert_eq!(names_with_prefix(&subs, "github/"), vec!["linguist", "docs"]);
    }

    #[test]
    fn prefix_filter_skips_incomplete_entries() {
        let subs = vec![
            Subscription {
                full_name: None,
                name: Some("orphan".to_string()),
            },
            Subscription {
                full_name: Some("github/nameless".to_string()),
                name: None,
            },
        ];
        assert!(names_with_prefix(&subs, "github/").is_empty());
    }

    #[test]
    fn parse_subscription_listing() {
        let json = r#"[
            {"id": 1, "name": "linguist", "full_name": "github/linguist", "private": false},
            {"id": 2, "name": "rails", "full_name": "rails/rails"}
        ]"#;
        let subs: Vec<Subscription> = serde_json::from_str(json).unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].name.as_deref(), Some("linguist"));
    }

    #[test]
    fn next_link_parsing() {
        let header = r#"<https://api.github.com/user/1/subscriptions?per_page=100&page=2>; rel="next", <https://api.github.com/user/1/subscriptions?per_page=100&page=5>; rel="last""#;
        assert_eq!(
            next_page_link(header).as_deref(),
            Some("https://api.github.com/user/1/subscriptions?per_page=100&page=2")
        );

        let last_page = r#"<https://api.github.com/user/1/subscriptions?page=1>; rel="prev", <https://api.github.com/user/1/subscriptions?page=1>; rel="first""#;
        assert_eq!(next_page_link(last_page), None);
    }

    #[tokio::test]
    async fn watched_repos_follows_pagination() {
        let server = MockServer::start().await;
        let page2 = format!("{}/user/7/subscriptions?per_page=100&page=2", server.uri());

        Mock::given(method("GET"))
            .and(path("/users/octocat/subscriptions"))
            .and(query_param("per_page", "100"))
            .and(header("user-agent", format!("create-github-gmail-filters/{}", env!("CARGO_PKG_VERSION")).as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Link", format!(r#"<{}>; rel="next""#, page2).as_str())
                    .set_body_json(serde_json::json!([
                        {"name": "linguist", "full_name": "github/linguist"},
                        {"name": "rails", "full_name": "rails/rails"}
                    ])),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/user/7/subscriptions"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "docs", "full_name": "github/docs"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let repos = client(&server, None)
            .watched_repos("octocat", "github/")
            .await
            .unwrap();
        assert_eq!(repos, vec!["linguist", "docs"]);
    }

    #[tokio::test]
    async fn pagination_stops_on_repeated_next_link() {
        let server = MockServer::start().await;
        let first = format!("{}/users/octocat/subscriptions?per_page=100", server.uri());
        let page2 = format!("{}/user/7/subscriptions?per_page=100&page=2", server.uri());

        Mock::given(method("GET"))
            .and(path("/users/octocat/subscriptions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Link", format!(r#"<{}>; rel="next""#, page2).as_str())
                    .set_body_json(serde_json::json!([
                        {"name": "linguist", "full_name": "github/linguist"}
                    ])),
            )
            .expect(1)
            .mount(&server)
            .await;

        // The second page links back to the first.
        Mock::given(method("GET"))
            .and(path("/user/7/subscriptions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Link", format!(r#"<{}>; rel="next""#, first).as_str())
                    .set_body_json(serde_json::json!([
                        {"name": "docs", "full_name": "github/docs"}
                    ])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let subs = client(&server, None).subscriptions("octocat").await.unwrap();
        assert_eq!(subs.len(), 2);
    }

    #[tokio::test]
    async fn pagination_stops_on_self_referencing_page() {
        let server = MockServer::start().await;
        let own = format!("{}/users/octocat/subscriptions?per_page=100", server.uri());

        Mock::given(method("GET"))
            .and(path("/users/octocat/subscriptions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Link", format!(r#"<{}>; rel="next""#, own).as_str())
                    .set_body_json(serde_json::json!([
                        {"name": "linguist", "full_name": "github/linguist"}
                    ])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let repos = client(&server, None)
            .watched_repos("octocat", "github/")
            .await
            .unwrap();
        assert_eq!(repos, vec!["linguist"]);
    }

    #[tokio::test]
    async fn token_is_sent_as_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/octocat/subscriptions"))
            .and(header("authorization", "Bearer ghp_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let repos = client(&server, Some("ghp_test"))
            .watched_repos("octocat", "github/")
            .await
            .unwrap();
        assert!(repos.is_empty());
    }

    #[tokio::test]
    async fn unknown_user_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/nobody/subscriptions"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(serde_json::json!({"message": "Not Found"})),
            )
            .mount(&server)
            .await;

        let err = client(&server, None)
            .watched_repos("nobody", "github/")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NotFound);
        assert_eq!(err.provider(), Some("github"));
    }

    #[tokio::test]
    async fn malformed_listing_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/octocat/subscriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"not\": \"a list\"}"))
            .mount(&server)
            .await;

        let err = client(&server, None)
            .watched_repos("octocat", "github/")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::InvalidResponse);
    }
}
