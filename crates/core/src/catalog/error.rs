use thiserror::Error;

/// Message shown when the catalog has no match.
pub const NOT_FOUND_MESSAGE: &str = "Movie not found";
/// Message shown for any transport-level failure.
pub const FETCH_FAILED_MESSAGE: &str = "Something went wrong with fetching the movies";

/// Errors raised while talking to the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Transport failure (connection, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("catalog returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The service reported no match (`"Response": "False"`).
    #[error("not found: {0}")]
    NotFound(String),

    /// The payload did not match the expected schema.
    #[error("parse error: {0}")]
    Parse(String),
}

impl CatalogError {
    /// Whether this is the "no matches" outcome rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound(_))
    }

    /// Short message suitable for the UI.
    pub fn user_message(&self) -> &'static str {
        if self.is_not_found() {
            NOT_FOUND_MESSAGE
        } else {
            FETCH_FAILED_MESSAGE
        }
    }
}
