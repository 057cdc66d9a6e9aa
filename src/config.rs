//! Configuration management for the comic reader.
//!
//! All options come from command-line arguments with environment fallbacks.
//!
//! # Environment Variables
//!
//! - `COMIC_HOST` - Server bind address (default: 0.0.0.0)
//! - `COMIC_PORT` - Server port (default: 3000)
//! - `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET` - OAuth client (required)
//! - `COMIC_ALLOWED_EMAIL` - The one account allowed to sign in (required)
//! - `COMIC_PUBLIC_URL` - Public base URL used for the OAuth redirect
//! - `COMIC_SESSION_SECRET` - HMAC key for session cookies (at least 32 bytes)
//! - `COMIC_ENV` - `development` or `production`
//! - `COMIC_ROOT_FOLDER` - Drive folder holding the volumes (default: INVINCIBLE)
//! - `COMIC_CACHE_IMAGES` - Max proxied images to cache (default: 200)
//! - `COMIC_CACHE_TTL_SECS` - Image cache TTL in seconds (default: 7 days)
//! - `COMIC_CORS_ORIGINS` - Allowed CORS origins, comma-separated

use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::auth::MIN_SECRET_LEN;
use crate::library::DEFAULT_ROOT_FOLDER;
use crate::proxy::{DEFAULT_IMAGE_CACHE_ENTRIES, DEFAULT_IMAGE_CACHE_TTL};
use crate::server::CALLBACK_PATH;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default public base URL.
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:3000";

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Environment {
    Development,
    Production,
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// Comic Reader - a private reader for comics stored in Google Drive.
#[derive(Parser, Debug, Clone)]
#[command(name = "comic-reader")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "COMIC_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "COMIC_PORT")]
    pub port: u16,

    /// Public base URL of this server, used to build the OAuth redirect URI.
    #[arg(long, default_value = DEFAULT_PUBLIC_URL, env = "COMIC_PUBLIC_URL")]
    pub public_url: String,

    /// Deployment environment. Production marks cookies `Secure`.
    #[arg(long, value_enum, default_value_t = Environment::Development, env = "COMIC_ENV")]
    pub environment: Environment,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// Google OAuth client id.
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    pub google_client_id: String,

    /// Google OAuth client secret.
    #[arg(long, env = "GOOGLE_CLIENT_SECRET")]
    pub google_client_secret: String,

    /// The only Google account allowed to sign in.
    #[arg(long, env = "COMIC_ALLOWED_EMAIL")]
    pub allowed_email: String,

    /// Secret key for HMAC-SHA256 signed session cookies.
    #[arg(long, env = "COMIC_SESSION_SECRET")]
    pub session_secret: String,

    // =========================================================================
    // Library Configuration
    // =========================================================================
    /// Name of the Drive folder that contains one folder per volume.
    #[arg(long, default_value = DEFAULT_ROOT_FOLDER, env = "COMIC_ROOT_FOLDER")]
    pub root_folder: String,

    /// Maximum number of proxied images to keep in cache.
    #[arg(long, default_value_t = DEFAULT_IMAGE_CACHE_ENTRIES, env = "COMIC_CACHE_IMAGES")]
    pub cache_images: usize,

    /// Image cache time-to-live in seconds.
    #[arg(long, default_value_t = DEFAULT_IMAGE_CACHE_TTL.as_secs(), env = "COMIC_CACHE_TTL_SECS")]
    pub cache_ttl_secs: u64,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "COMIC_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.google_client_id.trim().is_empty() || self.google_client_secret.trim().is_empty()
        {
            return Err(
                "Google OAuth credentials are required. \
                 Set GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET"
                    .to_string(),
            );
        }

        if !self.allowed_email.contains('@') {
            return Err(
                "An allowed email is required. Set --allowed-email or COMIC_ALLOWED_EMAIL"
                    .to_string(),
            );
        }

        if self.session_secret.len() < MIN_SECRET_LEN {
            return Err(format!(
                "Session secret must be at least {} bytes. Set --session-secret or COMIC_SESSION_SECRET",
                MIN_SECRET_LEN
            ));
        }

        if url::Url::parse(&self.public_url).is_err() {
            return Err(format!("Invalid public URL: {}", self.public_url));
        }

        if self.root_folder.trim().is_empty() {
            return Err("root_folder must not be empty".to_string());
        }

        if self.cache_images == 0 {
            return Err("cache_images must be greater than 0".to_string());
        }
        if self.cache_ttl_secs == 0 {
            return Err("cache_ttl_secs must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// OAuth redirect URI registered with Google.
    pub fn redirect_uri(&self) -> String {
        format!("{}{}", self.public_url.trim_end_matches('/'), CALLBACK_PATH)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

// =============================================================================
// Tests
// =============================================================================
