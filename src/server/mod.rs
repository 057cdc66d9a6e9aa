//! HTTP server layer for the comic reader.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │   /api/comics/...   /api/proxy-image   /api/auth/...   /comics  │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌───────────┐  ┌──────────┐  │
//! │  │  handlers   │  │    auth     │  │  viewer   │  │  routes  │  │
//! │  │   (JSON)    │  │  (cookies)  │  │  (HTML)   │  │ (router) │  │
//! │  └─────────────┘  └─────────────┘  └───────────┘  └──────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod handlers;
pub mod routes;
pub mod viewer;

pub use auth::{
    session_clear_cookie, session_cookie, session_set_cookie, signin_redirect, MaybeSession,
    RequireSession, SessionResponse, SessionUser, CALLBACK_PATH, SIGNIN_PATH,
};
pub use handlers::{
    health_handler, AppState, ApiError, CountResponse, ErrorResponse, HealthResponse,
    PagesQueryParams, ProxyQueryParams, RevalidateQueryParams,
};
pub use routes::{create_router, RouterConfig};
