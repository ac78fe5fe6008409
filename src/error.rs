use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by the catalog client and by startup configuration.
///
/// Views translate these into an error panel with a retry link; nothing in
/// the client retries on its own.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog answered with a non-success status, or the request never
    /// got a status at all (connection refused, DNS failure).
    #[error("catalog request failed{}: {message}", status_suffix(.status))]
    Remote {
        status: Option<u16>,
        message: String,
    },

    #[error("catalog did not respond within {after:?}")]
    Timeout { after: Duration },

    /// Success status but the body was empty, not JSON, or failed validation.
    #[error("catalog returned an unusable response: {0}")]
    EmptyResponse(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("movie id must be a positive integer, got {0}")]
    InvalidId(u64),
}

impl CatalogError {
    /// Short text shown to the user next to the retry link.
    pub fn user_message(&self) -> &'static str {
        match self {
            CatalogError::Remote { status: Some(404), .. } => "That movie could not be found.",
            CatalogError::Remote { status: None, .. } => {
                "Could not reach the movie catalog. Check your connection and try again."
            }
            CatalogError::Remote { .. } => "The movie catalog returned an error. Please try again.",
            CatalogError::Timeout { .. } => "The movie catalog took too long to respond.",
            CatalogError::EmptyResponse(_) => "The movie catalog sent back something unexpected.",
            CatalogError::Configuration(_) => "The application is not configured correctly.",
            CatalogError::InvalidId(_) => "That is not a valid movie id.",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CatalogError::Remote { .. }
                | CatalogError::Timeout { .. }
                | CatalogError::EmptyResponse(_)
        )
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}
