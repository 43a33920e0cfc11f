//! Minimal Mastodon REST client.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Errors from the Mastodon server.
#[derive(Debug, Error)]
pub enum MastodonError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} failed with {status}: {body}")]
    Api {
        endpoint: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Status visibility per the Mastodon API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Unlisted,
}

/// Body of `POST /api/v1/statuses`.
#[derive(Debug, Clone, Serialize)]
pub struct NewStatus {
    pub status: String,
    pub language: &'static str,
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_reply_to_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Status {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Account {
    acct: String,
}

/// Client bound to one Mastodon account.
#[derive(Clone)]
pub struct MastodonClient {
    http: Client,
    server: String,
    // The app credentials are only exercised by OAuth token flows, which
    // this client does not perform; posting needs the access token alone.
    #[allow(dead_code)]
    client_id: String,
    #[allow(dead_code)]
    client_secret: String,
    access_token: String,
}

impl MastodonClient {
    pub fn new(
        server: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, MastodonError> {
        Ok(Self {
            http: Client::builder().timeout(Duration::from_secs(30)).build()?,
            server: server.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            access_token: access_token.into(),
        })
    }

    /// Check the credentials by fetching the account they belong to.
    pub async fn verify_credentials(&self) -> Result<(), MastodonError> {
        let endpoint = "/api/v1/accounts/verify_credentials";
        let response = self
            .http
            .get(format!("{}{}", self.server, endpoint))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let account: Account = Self::decode(endpoint, response).await?;
        info!(acct = %account.acct, "Credentials verified");
        Ok(())
    }

    /// Post one status.
    pub async fn post_status(&self, status: NewStatus) -> Result<Status, MastodonError> {
        let endpoint = "/api/v1/statuses";
        let response = self
            .http
            .post(format!("{}{}", self.server, endpoint))
            .bearer_auth(&self.access_token)
            .json(&status)
            .send()
            .await?;
        Self::decode(endpoint, response).await
    }

    async fn decode<R: for<'de> Deserialize<'de>>(
        endpoint: &'static str,
        response: reqwest::Response,
    ) -> Result<R, MastodonError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MastodonError::Api {
                endpoint,
                status,
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_status_serializes_snake_case_visibility() {
        let status = NewStatus {
            status: "地震".to_string(),
            language: "ja",
            visibility: Visibility::Unlisted,
            in_reply_to_id: Some("123".to_string()),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["visibility"], "unlisted");
        assert_eq!(json["in_reply_to_id"], "123");
        assert_eq!(json["language"], "ja");
    }

    #[test]
    fn reply_id_is_omitted_when_absent() {
        let status = NewStatus {
            status: "地震".to_string(),
            language: "ja",
            visibility: Visibility::Public,
            in_reply_to_id: None,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["visibility"], "public");
        assert!(json.get("in_reply_to_id").is_none());
    }
}
