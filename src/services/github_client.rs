//! GitHub API client.
//!
//! Provides HTTP client for the GitHub REST API v3 with authentication and
//! pagination. Endpoints are resolved against the account's API endpoint so
//! GitHub Enterprise instances work the same as github.com.

use crate::error::AppError;
use crate::models::Account;
use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// GitHub API client configuration.
#[derive(Debug, Clone)]
pub struct GitHubClientConfig {
    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// User-Agent header value. GitHub rejects requests without one.
    pub user_agent: String,
}

impl Default for GitHubClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "hubdesk-sync".to_string(),
        }
    }
}

/// API surface the sync engine consumes.
///
/// Kept behind a trait so tests can substitute a canned implementation.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Fetch every open pull request for a repository.
    async fn fetch_open_pull_requests(
        &self,
        account: &Account,
        owner: &str,
        name: &str,
    ) -> Result<Vec<ApiPullRequest>, AppError>;

    /// Fetch the combined commit status for one ref.
    async fn fetch_combined_status(
        &self,
        account: &Account,
        owner: &str,
        name: &str,
        sha: &str,
    ) -> Result<ApiCombinedStatus, AppError>;
}

/// GitHub user from API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
    pub login: String,
}

/// Repository from API (nested inside pull request refs).
#[derive(Debug, Clone, Deserialize)]
pub struct ApiRepository {
    pub owner: ApiUser,
    pub name: String,
    pub clone_url: Option<String>,
    pub html_url: Option<String>,
}

/// One side of a pull request from API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiRefInfo {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
    /// `null` when the source repository has been deleted.
    pub repo: Option<ApiRepository>,
}

/// Pull request from API (GET /repos/:owner/:repo/pulls).
#[derive(Debug, Clone, Deserialize)]
pub struct ApiPullRequest {
    pub number: i64,
    pub title: String,
    pub created_at: String,
    pub user: ApiUser,
    pub head: ApiRefInfo,
    pub base: ApiRefInfo,
}

/// Combined commit status from API (GET /repos/:owner/:repo/commits/:ref/status).
#[derive(Debug, Clone, Deserialize)]
pub struct ApiCombinedStatus {
    pub state: String,
    pub total_count: i64,
    pub statuses: Vec<ApiStatusCheck>,
}

/// Individual check result inside a combined status.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiStatusCheck {
    pub id: i64,
    pub state: String,
    pub context: String,
}

/// GitHub API client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
}

impl GitHubClient {
    /// Create a new GitHub client.
    pub fn new(config: GitHubClientConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(config.user_agent)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Build the full URL for an API path on the account's endpoint.
    fn api_url(account: &Account, path: &str) -> String {
        format!("{}{}", account.endpoint.trim_end_matches('/'), path)
    }

    /// Build a GET request with the account's auth header.
    fn get(&self, account: &Account, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header(header::AUTHORIZATION, format!("token {}", account.token))
            .header(header::ACCEPT, "application/vnd.github.v3+json")
    }

    /// Handle API response errors.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
        endpoint: &str,
    ) -> Result<T, AppError> {
        let status = response.status();

        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| AppError::internal(format!("Failed to parse response: {}", e)))
        } else if status == StatusCode::UNAUTHORIZED {
            // 401 Unauthorized - token is expired or revoked
            Err(AppError::authentication(
                "GitHub token rejected. Please re-authenticate.",
            ))
        } else {
            let status_code = status.as_u16();
            let body = response.text().await.unwrap_or_default();
            // GitHub returns errors as {"message": "..."}
            let body_message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from));

            let message = match (status, &body_message) {
                (StatusCode::FORBIDDEN, _) => "Access denied or rate limit exceeded".to_string(),
                (StatusCode::NOT_FOUND, _) => "Resource not found".to_string(),
                (_, Some(msg)) => msg.clone(),
                _ => format!("Request failed ({}): {}", status_code, body),
            };

            Err(AppError::github_api_full(&message, status_code, endpoint))
        }
    }

    /// Fetch all pages of a paginated endpoint.
    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        account: &Account,
        endpoint: &str,
        query: Option<&impl Serialize>,
    ) -> Result<Vec<T>, AppError> {
        let mut all_data = Vec::new();
        let mut page = 1u32;

        loop {
            let url = Self::api_url(account, endpoint);
            let mut request = self.get(account, &url);

            if let Some(q) = query {
                request = request.query(q);
            }
            request = request.query(&[("page", page.to_string()), ("per_page", "100".to_string())]);

            let response = request.send().await?;
            let next_page = response
                .headers()
                .get(header::LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(next_page_from_link);
            let data = self.handle_response::<Vec<T>>(response, endpoint).await?;

            all_data.extend(data);

            match next_page {
                Some(next) => page = next,
                None => break,
            }
        }

        Ok(all_data)
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn fetch_open_pull_requests(
        &self,
        account: &Account,
        owner: &str,
        name: &str,
    ) -> Result<Vec<ApiPullRequest>, AppError> {
        let endpoint = format!("/repos/{}/{}/pulls", owner, name);
        self.get_all_pages(account, &endpoint, Some(&[("state", "open")]))
            .await
    }

    async fn fetch_combined_status(
        &self,
        account: &Account,
        owner: &str,
        name: &str,
        sha: &str,
    ) -> Result<ApiCombinedStatus, AppError> {
        let endpoint = format!("/repos/{}/{}/commits/{}/status", owner, name, sha);
        let url = Self::api_url(account, &endpoint);
        let response = self.get(account, &url).send().await?;
        self.handle_response(response, &endpoint).await
    }
}

/// Extract the next page number from a Link header value.
///
/// GitHub paginates with `Link: <url>; rel="next", <url>; rel="last"`.
fn next_page_from_link(link: &str) -> Option<u32> {
    for part in link.split(',') {
        let mut sections = part.split(';');
        let url = match sections.next() {
            Some(url) => url.trim().trim_start_matches('<').trim_end_matches('>'),
            None => continue,
        };

        if !sections.any(|s| s.trim() == r#"rel="next""#) {
            continue;
        }

        return url
            .split(['?', '&'])
            .find_map(|param| param.strip_prefix("page="))
            .and_then(|p| p.parse().ok());
    }

    None
}
