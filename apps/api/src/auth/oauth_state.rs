//! Pending OAuth 2.0 PKCE authorizations, keyed by their opaque `state`.
//!
//! Each entry is consumed at most once and expires after the TTL. Expired
//! entries are purged whenever a new authorization begins.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub const DEFAULT_STATE_TTL: Duration = Duration::from_secs(10 * 60);
pub const AUTHORIZE_URL: &str = "https://twitter.com/i/oauth2/authorize";
pub const SCOPES: &[&str] = &["tweet.read", "users.read", "dm.write", "dm.read"];

/// What the login endpoint hands to the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAuthorization {
    pub state: String,
    pub code_challenge: String,
}

struct Entry {
    verifier: String,
    created_at: Instant,
}

pub struct OAuthStateStore {
    ttl: Duration,
    pending: Mutex<HashMap<String, Entry>>,
}

impl OAuthStateStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn begin(&self) -> PendingAuthorization {
        self.begin_at(Instant::now())
    }

    /// Consumes the verifier stored under `state`. `None` for unknown, already
    /// used, or expired states.
    pub fn take(&self, state: &str) -> Option<String> {
        self.take_at(state, Instant::now())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn begin_at(&self, now: Instant) -> PendingAuthorization {
        let state = Uuid::new_v4().simple().to_string();
        let verifier = new_verifier();
        let code_challenge = code_challenge(&verifier);

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|_, entry| now.saturating_duration_since(entry.created_at) < self.ttl);
        pending.insert(
            state.clone(),
            Entry {
                verifier,
                created_at: now,
            },
        );

        PendingAuthorization {
            state,
            code_challenge,
        }
    }

    fn take_at(&self, state: &str, now: Instant) -> Option<String> {
        let entry = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(state)?;
        (now.saturating_duration_since(entry.created_at) < self.ttl).then_some(entry.verifier)
    }
}

impl Default for OAuthStateStore {
    fn default() -> Self {
        Self::new(DEFAULT_STATE_TTL)
    }
}

/// 32 random bytes, base64url without padding (43 chars).
fn new_verifier() -> String {
    let mut bytes = [0u8; 32];
    bytes[..16].copy_from_slice(Uuid::new_v4().as_bytes());
    bytes[16..].copy_from_slice(Uuid::new_v4().as_bytes());
    URL_SAFE_NO_PAD.encode(bytes)
}

/// S256 challenge: `base64url_nopad(sha256(verifier))`.
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Builds the authorize URL the user is redirected to.
pub fn authorization_url(
    client_id: &str,
    redirect_uri: &str,
    pending: &PendingAuthorization,
) -> Result<reqwest::Url> {
    let scope = SCOPES.join(" ");
    let url = reqwest::Url::parse_with_params(
        AUTHORIZE_URL,
        &[
            ("response_type", "code"),
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
            ("scope", scope.as_str()),
            ("state", pending.state.as_str()),
            ("code_challenge", pending.code_challenge.as_str()),
            ("code_challenge_method", "S256"),
        ],
    )
    .context("failed to build authorize URL")?;
    Ok(url)
}
