//! Session cookies, extractors and sign-in routes.
//!
//! # Sign-in Flow
//!
//! ```text
//! GET /api/auth/signin?callbackUrl=/comics
//!     └─▶ 303 to Google consent (state recorded server-side)
//! GET /api/auth/callback/google?code=..&state=..
//!     ├─ state unknown / code missing / provider error ─▶ 303 /?error=OAuthCallback
//!     ├─ email not allowed                              ─▶ 303 /?error=AccessDenied
//!     └─ ok: Set-Cookie comic_session=..                ─▶ 303 callbackUrl
//! GET|POST /api/auth/signout
//!     └─▶ session dropped, cookie cleared, 303 /
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Query, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::handlers::{ApiError, AppState};
use crate::auth::{local_redirect, Session, SessionStore, SESSION_COOKIE};
use crate::drive::DriveSource;
use crate::error::AuthError;

/// Path of the sign-in route.
pub const SIGNIN_PATH: &str = "/api/auth/signin";

/// Path of the OAuth callback route (the redirect URI registered with Google).
pub const CALLBACK_PATH: &str = "/api/auth/callback/google";

// =============================================================================
// Cookies
// =============================================================================

/// Value of the session cookie in a request, if present.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value carrying a session for `max_age_secs`.
pub fn session_set_cookie(value: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, value, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie.
pub fn session_clear_cookie(secure: bool) -> String {
    session_set_cookie("", 0, secure)
}

fn with_cookie(mut response: Response, cookie: &str) -> Response {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => warn!("Could not encode session cookie: {}", e),
    }
    response
}

// =============================================================================
// Extractors
// =============================================================================

/// The current session, if the request carries a valid one.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<Session>);

impl<S> FromRequestParts<S> for MaybeSession
where
    Arc<SessionStore>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(cookie) = session_cookie(&parts.headers) else {
            return Ok(MaybeSession(None));
        };
        let store = Arc::<SessionStore>::from_ref(state);
        Ok(MaybeSession(store.resolve(&cookie).await))
    }
}

/// A valid session; requests without one are rejected with `401`.
#[derive(Debug, Clone)]
pub struct RequireSession(pub Session);

impl<S> FromRequestParts<S> for RequireSession
where
    Arc<SessionStore>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match MaybeSession::from_request_parts(parts, state).await {
            Ok(MaybeSession(Some(session))) => Ok(RequireSession(session)),
            _ => Err(ApiError::from(AuthError::SessionRequired)),
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SignInQueryParams {
    #[serde(rename = "callbackUrl")]
    pub callback_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQueryParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Body of `GET /api/auth/session`; both fields absent when signed out.
#[derive(Debug, Serialize, Default)]
pub struct SessionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,

    /// Epoch milliseconds at which the session ends
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<u64>,
}

/// `GET /api/auth/signin?callbackUrl=`
pub async fn signin_handler<D: DriveSource>(
    State(state): State<AppState<D>>,
    Query(query): Query<SignInQueryParams>,
) -> Result<Redirect, ApiError> {
    let callback = local_redirect(query.callback_url.as_deref());
    let oauth_state = state.sessions.begin_sign_in(callback).await;
    let url = state.identity.authorize_url(&oauth_state)?;
    Ok(Redirect::to(&url))
}

/// `GET /api/auth/callback/google?code=&state=`
pub async fn callback_handler<D: DriveSource>(
    State(state): State<AppState<D>>,
    Query(query): Query<CallbackQueryParams>,
) -> Response {
    match complete_sign_in(&state, query).await {
        Ok((target, cookie)) => with_cookie(Redirect::to(&target).into_response(), &cookie),
        Err(err) => {
            let code = match &err {
                AuthError::AccessDenied { email } => {
                    warn!(email = %email, "Sign-in denied");
                    "AccessDenied"
                }
                other => {
                    warn!("Sign-in failed: {}", other);
                    "OAuthCallback"
                }
            };
            Redirect::to(&format!("/?error={}", code)).into_response()
        }
    }
}

async fn complete_sign_in<D: DriveSource>(
    state: &AppState<D>,
    query: CallbackQueryParams,
) -> Result<(String, String), AuthError> {
    if let Some(error) = query.error {
        return Err(AuthError::Provider(error));
    }
    let oauth_state = query.state.ok_or(AuthError::InvalidState)?;
    let target = state.sessions.finish_sign_in(&oauth_state).await?;
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or(AuthError::MissingCode)?;

    let user = state.identity.exchange_code(&code).await?;
    state.policy.check(&user.email)?;

    let max_age = user.expires_in;
    let (session, cookie_value) = state.sessions.create(user).await;
    info!(email = %session.email, "Signed in");

    Ok((
        target,
        session_set_cookie(&cookie_value, max_age, state.secure_cookies),
    ))
}

/// `GET|POST /api/auth/signout`
pub async fn signout_handler<D: DriveSource>(
    State(state): State<AppState<D>>,
    headers: HeaderMap,
) -> Response {
    if let Some(cookie) = session_cookie(&headers) {
        state.sessions.destroy(&cookie).await;
    }
    with_cookie(
        Redirect::to("/").into_response(),
        &session_clear_cookie(state.secure_cookies),
    )
}

/// `GET /api/auth/session`
pub async fn session_handler(MaybeSession(session): MaybeSession) -> Json<SessionResponse> {
    Json(match session {
        Some(session) => SessionResponse {
            user: Some(SessionUser {
                email: session.email,
                name: session.name,
            }),
            expires: Some(session.expires_at),
        },
        None => SessionResponse::default(),
    })
}

/// Redirect to sign-in, returning to `path` afterwards.
pub fn signin_redirect(path: &str) -> Response {
    let target = format!("{}?callbackUrl={}", SIGNIN_PATH, urlencoding::encode(path));
    Redirect::to(&target).into_response()
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

// =============================================================================
// Tests
// =============================================================================
