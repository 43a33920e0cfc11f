//! Minimal client for the mixi2 mercury API.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://mixi.social";
const CREATE_POST_PATH: &str = "/com.mixi.mercury.api.PostService/CreatePost";

/// Errors from the mixi2 API.
#[derive(Debug, Error)]
pub enum Mixi2Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CreatePost failed with {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Debug, Serialize)]
struct CreatePostRequest {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePostResponse {
    post: PostView,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostView {
    post_id: String,
}

/// Client authenticated with the key/token pair of one account.
#[derive(Clone)]
pub struct Mixi2Client {
    http: Client,
    base_url: String,
    auth_key: String,
    auth_token: String,
}

impl Mixi2Client {
    pub fn new(
        auth_key: impl Into<String>,
        auth_token: impl Into<String>,
        user_agent: &str,
    ) -> Result<Self, Mixi2Error> {
        Ok(Self {
            http: Client::builder()
                .user_agent(user_agent)
                .timeout(Duration::from_secs(30))
                .build()?,
            base_url: DEFAULT_BASE_URL.to_string(),
            auth_key: auth_key.into(),
            auth_token: auth_token.into(),
        })
    }

    /// Create one post; returns its id.
    pub async fn create_post(&self, text: impl Into<String>) -> Result<String, Mixi2Error> {
        let request = CreatePostRequest { text: text.into() };
        let response = self
            .http
            .post(format!("{}{}", self.base_url, CREATE_POST_PATH))
            .header("x-auth-key", &self.auth_key)
            .bearer_auth(&self.auth_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Mixi2Error::Api { status, body });
        }
        let created: CreatePostResponse = response.json().await?;
        Ok(created.post.post_id)
    }
}
