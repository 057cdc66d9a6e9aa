//! Sign-in and sessions.
//!
//! - [`oauth`]: the Google authorization-code flow behind [`IdentityProvider`]
//! - [`session`]: server-side sessions referenced by signed cookies
//! - [`AccessPolicy`]: the single-email allow-list applied at sign-in

pub mod oauth;
pub mod session;

pub use oauth::{GoogleOAuth, IdentityProvider, OAuthConfig, SignedInUser, GOOGLE_SCOPES};
pub use session::{Session, SessionSigner, SessionStore, MIN_SECRET_LEN, SESSION_COOKIE};

use crate::error::AuthError;

/// Allows sign-in for exactly one email address.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    allowed_email: String,
}

impl AccessPolicy {
    pub fn new(allowed_email: impl Into<String>) -> Self {
        Self {
            allowed_email: allowed_email.into().trim().to_string(),
        }
    }

    pub fn allowed_email(&self) -> &str {
        &self.allowed_email
    }

    /// Email comparison ignores ASCII case and surrounding whitespace.
    pub fn allows(&self, email: &str) -> bool {
        !self.allowed_email.is_empty() && email.trim().eq_ignore_ascii_case(&self.allowed_email)
    }

    pub fn check(&self, email: &str) -> Result<(), AuthError> {
        if self.allows(email) {
            Ok(())
        } else {
            Err(AuthError::AccessDenied {
                email: email.to_string(),
            })
        }
    }
}

/// Restrict a post-sign-in redirect to a path on this site.
///
/// Anything that is not a plain absolute path (`//host`, `https://...`,
/// empty) becomes `/`.
pub fn local_redirect(target: Option<&str>) -> String {
    match target {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}
