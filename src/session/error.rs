//! Error types for the authenticated session.

use thiserror::Error;

/// Errors raised while talking to the service through the session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The configured base URL cannot be parsed or joined.
    #[error("invalid base URL: {url}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-success HTTP response.
    #[error("HTTP {status} requesting {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// A page did not contain a fragment the session depends on.
    #[error("expected {fragment} not found on {url}")]
    MissingMarkup {
        /// The page URL.
        url: String,
        /// Human-readable description of the missing fragment.
        fragment: &'static str,
    },

    /// Credentials were rejected.
    #[error("[AUTH] login failed for {user}: invalid credentials")]
    Authentication {
        /// Account the login was attempted for.
        user: String,
    },
}

impl SessionError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a network error from a reqwest error, promoting timeouts.
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a missing-markup error.
    pub fn missing_markup(url: impl Into<String>, fragment: &'static str) -> Self {
        Self::MissingMarkup {
            url: url.into(),
            fragment,
        }
    }

    /// Creates an authentication error.
    pub fn authentication(user: impl Into<String>) -> Self {
        Self::Authentication { user: user.into() }
    }

    /// True for rejected credentials.
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}
