use thiserror::Error;

/// Errors returned by the Google Drive adapter
#[derive(Debug, Clone, Error)]
pub enum DriveError {
    /// Drive API answered with a non-success status
    #[error("Drive API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// File or folder does not exist (or is not visible to the token)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors from the library layer (volumes, page listings)
#[derive(Debug, Clone, Error)]
pub enum LibraryError {
    /// No session or the session carries no access token
    #[error("Authentication required")]
    NotAuthenticated,

    /// The requested volume folder does not exist
    #[error("Comic volume not found: {0}")]
    VolumeNotFound(String),

    /// The root folder holding all volumes could not be located
    #[error("Root folder not found: {0}")]
    RootFolderNotFound(String),

    /// Any other Drive failure
    #[error("Upstream error: {0}")]
    Upstream(#[from] DriveError),
}

/// Errors from the image proxy
#[derive(Debug, Clone, Error)]
pub enum ProxyError {
    /// The `id` query parameter is missing or empty
    #[error("File ID is required")]
    MissingFileId,

    /// No bearer token available for the upstream fetch
    #[error("Authentication required")]
    NotAuthenticated,

    /// Upstream answered with a non-success status (mirrored to the client)
    #[error("Failed to fetch image: {status} {message}")]
    UpstreamFetch { status: u16, message: String },

    /// Transport or decoding failure talking to Drive
    #[error("Upstream error: {0}")]
    Upstream(DriveError),
}

impl From<DriveError> for ProxyError {
    fn from(err: DriveError) -> Self {
        match err {
            DriveError::Api { status, message } => ProxyError::UpstreamFetch { status, message },
            DriveError::NotFound(message) => ProxyError::UpstreamFetch {
                status: 404,
                message,
            },
            other => ProxyError::Upstream(other),
        }
    }
}

/// Errors raised during sign-in and session handling
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The identity provider returned an email outside the allow-list
    #[error("Sign-in denied for {email}")]
    AccessDenied { email: String },

    /// The OAuth `state` parameter is unknown or already used
    #[error("Invalid or expired OAuth state")]
    InvalidState,

    /// The callback carried no authorization code
    #[error("Missing authorization code")]
    MissingCode,

    /// The provider reported an error on the callback (e.g. consent refused)
    #[error("Identity provider error: {0}")]
    Provider(String),

    /// Code exchange or user-info lookup failed
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// No valid session on a protected route
    #[error("Authentication required")]
    SessionRequired,
}
