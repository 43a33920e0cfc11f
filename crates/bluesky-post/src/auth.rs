//! Persisted PDS session credentials.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::xrpc::XrpcError;

/// Contents of the auth file, as written by `goat` and friends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthInfo {
    pub did: String,
    pub access_jwt: String,
    pub refresh_jwt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
}

impl AuthInfo {
    /// Load credentials from the auth file.
    pub fn load(path: &Path) -> Result<Self, XrpcError> {
        let data = std::fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Persist credentials via a temp file and an atomic rename, so a crash
    /// mid-write never leaves a truncated auth file behind.
    pub fn save(&self, path: &Path) -> Result<(), XrpcError> {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let mut file = match dir {
            Some(dir) => tempfile::NamedTempFile::new_in(dir)?,
            None => tempfile::NamedTempFile::new_in(".")?,
        };
        serde_json::to_writer(&mut file, self)?;
        file.persist(path).map_err(|err| err.error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bsky.auth");

        let auth = AuthInfo {
            did: "did:plc:abc123".to_string(),
            access_jwt: "access".to_string(),
            refresh_jwt: "refresh".to_string(),
            handle: Some("quake.example.test".to_string()),
        };
        auth.save(&path).unwrap();

        let loaded = AuthInfo::load(&path).unwrap();
        assert_eq!(loaded.did, "did:plc:abc123");
        assert_eq!(loaded.access_jwt, "access");
        assert_eq!(loaded.refresh_jwt, "refresh");
    }

    #[test]
    fn auth_file_uses_camel_case_keys() {
        let auth = AuthInfo {
            did: "did:plc:abc123".to_string(),
            access_jwt: "access".to_string(),
            refresh_jwt: "refresh".to_string(),
            handle: None,
        };
        let json = serde_json::to_value(&auth).unwrap();
        assert!(json.get("accessJwt").is_some());
        assert!(json.get("refreshJwt").is_some());
        assert!(json.get("handle").is_none());
    }
}
