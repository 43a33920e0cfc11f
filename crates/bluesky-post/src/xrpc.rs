//! Minimal XRPC client for the handful of AT Protocol calls we make.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::auth::AuthInfo;
use crate::record::{FeedPost, StrongRef};

/// Errors from the PDS.
#[derive(Debug, Error)]
pub enum XrpcError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("auth file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XRPC {nsid} failed with {status}: {body}")]
    Api {
        nsid: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRecordRequest {
    repo: String,
    collection: &'static str,
    record: FeedPost,
}

#[derive(Debug, Deserialize)]
struct SessionView {
    did: String,
    #[serde(default)]
    handle: Option<String>,
}

/// Client bound to one PDS account.
///
/// The dispatcher's single consumer loop is the only caller, so the client
/// owns its credentials directly and is the sole writer of the auth file.
pub struct XrpcClient {
    http: Client,
    host: String,
    auth_path: PathBuf,
    auth: AuthInfo,
}

impl XrpcClient {
    /// Load the auth file and validate the session, refreshing once if the
    /// stored access token has already expired. A second validation failure
    /// is fatal.
    pub async fn connect(
        host: impl Into<String>,
        auth_path: impl Into<PathBuf>,
    ) -> Result<Self, XrpcError> {
        let auth_path = auth_path.into();
        let auth = AuthInfo::load(&auth_path)?;
        let mut client = Self {
            http: Client::builder().timeout(Duration::from_secs(30)).build()?,
            host: host.into(),
            auth_path,
            auth,
        };
        if let Err(err) = client.get_session().await {
            warn!(error = %err, "Failed to validate session, trying refresh");
            client.refresh_session().await?;
            client.get_session().await?;
        }
        Ok(client)
    }

    /// Validate the current session against the PDS.
    pub async fn get_session(&self) -> Result<(), XrpcError> {
        let session: SessionView = self
            .get("com.atproto.server.getSession", &self.auth.access_jwt)
            .await?;
        info!(did = %session.did, handle = ?session.handle, "Session is valid");
        Ok(())
    }

    /// Exchange the refresh token for a new session and persist it.
    pub async fn refresh_session(&mut self) -> Result<(), XrpcError> {
        let auth: AuthInfo = self
            .post_empty("com.atproto.server.refreshSession", &self.auth.refresh_jwt)
            .await?;
        auth.save(&self.auth_path)?;
        info!(did = %auth.did, "Session refreshed");
        self.auth = auth;
        Ok(())
    }

    /// Create a feed post record; returns its strong ref for threading.
    pub async fn create_record(&self, record: FeedPost) -> Result<StrongRef, XrpcError> {
        let request = CreateRecordRequest {
            repo: self.auth.did.clone(),
            collection: "app.bsky.feed.post",
            record,
        };
        let nsid = "com.atproto.repo.createRecord";
        let response = self
            .http
            .post(self.xrpc_url(nsid))
            .bearer_auth(&self.auth.access_jwt)
            .json(&request)
            .send()
            .await?;
        Self::decode(nsid, response).await
    }

    /// The account DID.
    pub fn did(&self) -> &str {
        &self.auth.did
    }

    fn xrpc_url(&self, nsid: &str) -> String {
        format!("{}/xrpc/{}", self.host, nsid)
    }

    async fn get<R: for<'de> Deserialize<'de>>(
        &self,
        nsid: &'static str,
        token: &str,
    ) -> Result<R, XrpcError> {
        let response = self
            .http
            .get(self.xrpc_url(nsid))
            .bearer_auth(token)
            .send()
            .await?;
        Self::decode(nsid, response).await
    }

    async fn post_empty<R: for<'de> Deserialize<'de>>(
        &self,
        nsid: &'static str,
        token: &str,
    ) -> Result<R, XrpcError> {
        let response = self
            .http
            .post(self.xrpc_url(nsid))
            .bearer_auth(token)
            .send()
            .await?;
        Self::decode(nsid, response).await
    }

    async fn decode<R: for<'de> Deserialize<'de>>(
        nsid: &'static str,
        response: reqwest::Response,
    ) -> Result<R, XrpcError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(XrpcError::Api { nsid, status, body });
        }
        Ok(response.json().await?)
    }
}
