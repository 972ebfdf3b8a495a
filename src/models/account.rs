//! Authenticated account model.

use serde::{Deserialize, Serialize};

/// An authenticated user on GitHub or a GitHub Enterprise instance.
///
/// Accounts are owned by the consuming application (which handles sign-in
/// and token storage); the sync core only reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// User login, e.g. `octocat`.
    pub login: String,

    /// API endpoint, e.g. `https://api.github.com`.
    pub endpoint: String,

    /// Personal access token or OAuth token.
    pub token: String,
}

impl Account {
    /// Create an account with a normalized endpoint.
    pub fn new(
        login: impl Into<String>,
        endpoint: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            login: login.into(),
            endpoint: Self::normalize_endpoint(&endpoint.into()),
            token: token.into(),
        }
    }

    /// Normalize the endpoint by removing trailing slashes.
    pub fn normalize_endpoint(url: &str) -> String {
        url.trim_end_matches('/').to_string()
    }
}
