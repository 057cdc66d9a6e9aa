//! # Comic Reader
//!
//! A personal comic reader for a Google Drive folder of volumes.
//!
//! One Google account signs in. The server lists the volume folders under a
//! root folder, serves each volume's pages in numeric order through a
//! paginated API, and proxies the page images through an in-memory LRU cache.
//!
//! ## Architecture
//!
//! - [`drive`] - Google Drive API v3 adapter behind the [`DriveSource`] trait
//! - [`auth`] - Google OAuth, the single-email policy and signed sessions
//! - [`library`] - Volumes, numeric sorting, pagination and display URLs
//! - [`proxy`] - Image proxy with an LRU + TTL byte cache
//! - [`reader`] - Reading-view state machine (navigation, fallbacks, prefetch)
//! - [`server`] - Axum router, JSON handlers and HTML pages
//! - [`config`] - CLI and environment configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use comic_reader::{
//!     create_router, AccessPolicy, AppState, GoogleDriveClient, GoogleOAuth, ImageProxy,
//!     LibraryService, OAuthConfig, RouterConfig, SessionSigner, SessionStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let http = reqwest::Client::new();
//!     let drive = Arc::new(GoogleDriveClient::new(http.clone()));
//!     let oauth = OAuthConfig::google("id", "secret", "http://localhost:3000/api/auth/callback/google");
//!
//!     let state = AppState::new(
//!         LibraryService::new(drive.clone()),
//!         ImageProxy::new(drive),
//!         SessionStore::new(SessionSigner::new("0123456789abcdef0123456789abcdef")),
//!         Arc::new(GoogleOAuth::new(oauth, http)),
//!         AccessPolicy::new("reader@example.com"),
//!     );
//!
//!     let router = create_router(state, RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod drive;
pub mod error;
pub mod library;
pub mod proxy;
pub mod reader;
pub mod server;

// Re-export commonly used types
pub use auth::{
    AccessPolicy, GoogleOAuth, IdentityProvider, OAuthConfig, Session, SessionSigner,
    SessionStore, SignedInUser,
};
pub use config::{Config, Environment};
pub use drive::{DriveFile, DriveFolder, DriveMedia, DriveSource, GoogleDriveClient};
pub use error::{AuthError, DriveError, LibraryError, ProxyError};
pub use library::{
    compare_names, paginate, LibraryService, PageEntry, PageFile, PageListing, PageRequest,
    PaginationMeta, Volume, VolumeList,
};
pub use proxy::{ImageCache, ImageCacheKey, ImageProxy, ImageResponse};
pub use reader::{Effect, LoadPhase, ReaderState};
pub use server::{create_router, AppState, ErrorResponse, RouterConfig};
