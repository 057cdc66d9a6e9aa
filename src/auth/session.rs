//! Server-side sessions behind signed cookies.
//!
//! # Cookie Format
//!
//! The cookie value is the session id followed by its HMAC-SHA256 tag:
//!
//! ```text
//! comic_session = {session_id}.{hex(HMAC-SHA256(secret, session_id))}
//! ```
//!
//! The session itself (email, Drive access token, expiry) never leaves the
//! server. A cookie with a bad tag is treated as absent; tags are compared in
//! constant time.

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info};

use super::oauth::SignedInUser;
use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "comic_session";

/// How long a sign-in may sit on the consent screen.
pub const SIGN_IN_TTL: Duration = Duration::from_secs(10 * 60);

/// Minimum accepted signing key length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

// =============================================================================
// Session
// =============================================================================

/// An authenticated user with a Drive bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub access_token: String,
    /// Epoch milliseconds at which the access token expires
    pub expires_at: u64,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= epoch_millis()
    }

    /// Remaining lifetime, zero once expired.
    pub fn remaining(&self) -> Duration {
        Duration::from_millis(self.expires_at.saturating_sub(epoch_millis()))
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

// =============================================================================
// Cookie signing
// =============================================================================

/// Signs and verifies session ids carried in cookies.
#[derive(Clone)]
pub struct SessionSigner {
    secret_key: Vec<u8>,
}

impl SessionSigner {
    pub fn new(secret_key: impl AsRef<[u8]>) -> Self {
        Self {
            secret_key: secret_key.as_ref().to_vec(),
        }
    }

    /// Cookie value for `session_id`.
    pub fn sign(&self, session_id: &str) -> String {
        format!("{}.{}", session_id, hex::encode(self.tag(session_id)))
    }

    /// The session id inside a cookie value, if its tag is valid.
    pub fn verify<'a>(&self, cookie_value: &'a str) -> Option<&'a str> {
        let (session_id, tag) = cookie_value.rsplit_once('.')?;
        if session_id.is_empty() {
            return None;
        }
        let provided = hex::decode(tag).ok()?;
        let expected = self.tag(session_id);

        if provided.ct_eq(&expected).into() {
            Some(session_id)
        } else {
            None
        }
    }

    fn tag(&self, message: &str) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret_key).expect("HMAC can take key of any size");
        mac.update(message.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

// =============================================================================
// Session store
// =============================================================================

struct PendingSignIn {
    callback_url: String,
    started_at: Instant,
}

/// In-memory sessions and in-flight OAuth states.
pub struct SessionStore {
    signer: SessionSigner,
    sessions: RwLock<HashMap<String, Session>>,
    pending: Mutex<HashMap<String, PendingSignIn>>,
}

impl SessionStore {
    pub fn new(signer: SessionSigner) -> Self {
        Self {
            signer,
            sessions: RwLock::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn signer(&self) -> &SessionSigner {
        &self.signer
    }

    /// Record a new sign-in attempt and return its `state` value.
    pub async fn begin_sign_in(&self, callback_url: impl Into<String>) -> String {
        let state = random_token();
        let mut pending = self.pending.lock().await;
        pending.retain(|_, p| p.started_at.elapsed() < SIGN_IN_TTL);
        pending.insert(
            state.clone(),
            PendingSignIn {
                callback_url: callback_url.into(),
                started_at: Instant::now(),
            },
        );
        state
    }

    /// Consume a `state` value, returning the callback URL it was started with.
    ///
    /// Each state is accepted once.
    pub async fn finish_sign_in(&self, state: &str) -> Result<String, AuthError> {
        let mut pending = self.pending.lock().await;
        match pending.remove(state) {
            Some(p) if p.started_at.elapsed() < SIGN_IN_TTL => Ok(p.callback_url),
            _ => Err(AuthError::InvalidState),
        }
    }

    /// Create a session for `user`; returns it with its signed cookie value.
    pub async fn create(&self, user: SignedInUser) -> (Session, String) {
        let id = random_token();
        let expires_at = epoch_millis().saturating_add(user.expires_in.saturating_mul(1000));
        let session = Session {
            id: id.clone(),
            email: user.email,
            name: user.name,
            access_token: user.access_token,
            expires_at,
        };

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| !s.is_expired());
        sessions.insert(id.clone(), session.clone());
        info!(email = %session.email, "Session created");

        (session, self.signer.sign(&id))
    }

    /// Look up the live session behind a cookie value.
    ///
    /// Expired sessions are removed and reported as absent.
    pub async fn resolve(&self, cookie_value: &str) -> Option<Session> {
        let id = self.signer.verify(cookie_value)?;

        let session = self.sessions.read().await.get(id).cloned()?;
        if session.is_expired() {
            debug!(email = %session.email, "Session expired");
            self.sessions.write().await.remove(id);
            return None;
        }
        Some(session)
    }

    /// Remove the session behind a cookie value, if any.
    pub async fn destroy(&self, cookie_value: &str) -> bool {
        let Some(id) = self.signer.verify(cookie_value) else {
            return false;
        };
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            info!("Session destroyed");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
