//! Router configuration for the comic reader.
//!
//! # Route Structure
//!
//! ```text
//! /health                          - Health check (public)
//! /                                - Sign-in / landing page (public)
//! /comics, /comics/{id}            - HTML pages (redirect to sign-in)
//! /api/comics/...                  - Library JSON (session required)
//! /api/proxy-image                 - Image proxy (session on cache miss)
//! /api/revalidate                  - Listing cache invalidation (public)
//! /api/auth/...                    - Sign-in, callback, sign-out, session
//! ```
//!
//! # Example
//!
//! ```ignore
//! use comic_reader::server::{create_router, AppState, RouterConfig};
//!
//! let state = AppState::new(library, proxy, sessions, identity, policy);
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(state, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{routing::get, Router};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::{
    callback_handler, session_handler, signin_handler, signout_handler, CALLBACK_PATH,
    SIGNIN_PATH,
};
use super::handlers::{
    health_handler, page_count_handler, pages_handler, proxy_image_handler, revalidate_handler,
    volume_handler, volumes_handler, AppState,
};
use super::viewer::{home_page_handler, library_page_handler, reader_page_handler};
use crate::drive::DriveSource;
use crate::library::PROXY_PATH;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Any CORS origin, tracing enabled.
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
pub fn create_router<D>(state: AppState<D>, config: RouterConfig) -> Router
where
    D: DriveSource + 'static,
{
    let api_routes = Router::new()
        .route("/api/comics", get(volumes_handler::<D>))
        .route("/api/comics/{id}", get(volume_handler::<D>))
        .route("/api/comics/{id}/pages", get(pages_handler::<D>))
        .route("/api/comics/{id}/pages/count", get(page_count_handler::<D>))
        .route(PROXY_PATH, get(proxy_image_handler::<D>))
        .route(
            "/api/revalidate",
            get(revalidate_handler::<D>).post(revalidate_handler::<D>),
        );

    let auth_routes = Router::new()
        .route(SIGNIN_PATH, get(signin_handler::<D>))
        .route(CALLBACK_PATH, get(callback_handler::<D>))
        .route(
            "/api/auth/signout",
            get(signout_handler::<D>).post(signout_handler::<D>),
        )
        .route("/api/auth/session", get(session_handler));

    let page_routes = Router::new()
        .route("/", get(home_page_handler))
        .route("/comics", get(library_page_handler::<D>))
        .route("/comics/{id}", get(reader_page_handler::<D>));

    let router = Router::new()
        .route("/health", get(health_handler))
        .merge(api_routes)
        .merge(auth_routes)
        .merge(page_routes)
        .with_state(state)
        .layer(build_cors_layer(&config));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
