//! Comic Reader - a private reader for comics stored in Google Drive.
//!
//! This binary starts the HTTP server and configures all components.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use comic_reader::{
    config::Config,
    server::{create_router, AppState, RouterConfig},
    AccessPolicy, GoogleDriveClient, GoogleOAuth, ImageProxy, LibraryService, OAuthConfig,
    SessionSigner, SessionStore,
};

/// Timeout for outbound Drive and OAuth requests.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Configuration:");
    info!("  Root folder: {}", config.root_folder);
    info!("  Allowed account: {}", config.allowed_email);
    info!("  Redirect URI: {}", config.redirect_uri());
    info!(
        "  Image cache: {} entries, {}s TTL",
        config.cache_images, config.cache_ttl_secs
    );
    info!("  Environment: {:?}", config.environment);

    let http = match reqwest::Client::builder().timeout(HTTP_TIMEOUT).build() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let drive = Arc::new(GoogleDriveClient::new(http.clone()));
    let library = LibraryService::with_root_folder(Arc::clone(&drive), config.root_folder.clone());
    let proxy = ImageProxy::with_cache_limits(drive, config.cache_images, config.cache_ttl());
    let sessions = SessionStore::new(SessionSigner::new(&config.session_secret));
    let identity = GoogleOAuth::new(
        OAuthConfig::google(
            config.google_client_id.clone(),
            config.google_client_secret.clone(),
            config.redirect_uri(),
        ),
        http,
    );

    let state = AppState::new(
        library,
        proxy,
        sessions,
        Arc::new(identity),
        AccessPolicy::new(config.allowed_email.clone()),
    )
    .with_secure_cookies(config.is_production());

    let router = create_router(state, build_router_config(&config));

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on: http://{}", addr);
    info!("  Open {} in your browser to sign in", config.public_url);

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "comic_reader=debug,tower_http=debug"
    } else {
        "comic_reader=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new().with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}
