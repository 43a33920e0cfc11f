//! Signing key handling.

use nostr_sdk::prelude::*;
use tracing::warn;

/// Parse a bech32 `nsec`, or generate a throwaway key when none is given.
///
/// The generated secret is logged so a test run can be repeated with the
/// same identity.
pub fn load_keys(nsec: Option<&str>) -> Result<Keys, nostr_sdk::nostr::key::Error> {
    match nsec {
        Some(nsec) if !nsec.is_empty() => Keys::parse(nsec),
        _ => {
            let keys = Keys::generate();
            match keys.secret_key().to_bech32() {
                Ok(generated) => warn!(nsec = %generated, "No secret key, generated one"),
                Err(_) => warn!("No secret key, generated one"),
            }
            Ok(keys)
        }
    }
}
