//! Google OAuth 2.0 authorization-code flow.
//!
//! The app is a confidential client: the browser is sent to Google's consent
//! screen with a random `state`, and the callback's `code` is exchanged
//! server-side for an access token that also carries the Drive read scope.
//! The signed-in email comes from the userinfo endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::AuthError;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

/// Profile, email and read-only Drive access.
pub const GOOGLE_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/drive.readonly",
];

/// Token lifetime assumed when the provider omits `expires_in`.
const DEFAULT_EXPIRES_IN: u64 = 3600;

/// The outcome of a successful code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInUser {
    pub email: String,
    pub name: Option<String>,
    pub access_token: String,
    /// Seconds until `access_token` expires
    pub expires_in: u64,
}

/// An OAuth identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Consent-screen URL carrying `state`.
    fn authorize_url(&self, state: &str) -> Result<String, AuthError>;

    /// Exchange an authorization code for a token and the user's identity.
    async fn exchange_code(&self, code: &str) -> Result<SignedInUser, AuthError>;
}

/// OAuth client settings.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Absolute URL of the callback route
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl OAuthConfig {
    /// Settings for Google with the scopes the reader needs.
    pub fn google(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            scopes: GOOGLE_SCOPES.iter().map(|s| s.to_string()).collect(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
    #[serde(default)]
    name: Option<String>,
}

/// Google implementation of [`IdentityProvider`].
#[derive(Clone)]
pub struct GoogleOAuth {
    config: OAuthConfig,
    http: Client,
}

impl GoogleOAuth {
    pub fn new(config: OAuthConfig, http: Client) -> Self {
        Self { config, http }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    async fn fetch_user(&self, access_token: &str) -> Result<UserInfo, AuthError> {
        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            warn!(status, "Userinfo request failed");
            return Err(AuthError::TokenExchange(format!(
                "userinfo endpoint returned {}",
                status
            )));
        }

        response
            .json::<UserInfo>()
            .await
            .map_err(|e| AuthError::TokenExchange(format!("invalid userinfo response: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for GoogleOAuth {
    fn authorize_url(&self, state: &str) -> Result<String, AuthError> {
        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| AuthError::Provider(format!("invalid auth URL: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", state)
            .append_pair("prompt", "consent");

        Ok(url.into())
    }

    #[instrument(skip(self, code))]
    async fn exchange_code(&self, code: &str) -> Result<SignedInUser, AuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(status, error = %body, "Token endpoint rejected the authorization code");
            return Err(AuthError::TokenExchange(format!(
                "token endpoint returned {}",
                status
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::TokenExchange(format!("invalid token response: {}", e)))?;

        let user = self.fetch_user(&token.access_token).await?;
        if user.email_verified == Some(false) {
            return Err(AuthError::TokenExchange("email not verified".to_string()));
        }
        let email = user
            .email
            .ok_or_else(|| AuthError::TokenExchange("no email in userinfo".to_string()))?;

        let expires_in = token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);
        debug!(expires_in, "Exchanged authorization code");

        Ok(SignedInUser {
            email,
            name: user.name,
            access_token: token.access_token,
            expires_in,
        })
    }
}
