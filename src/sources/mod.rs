//! Source collaborators
//!
//! Thin clients for the sites that supply post image URLs to the OCR
//! pipeline. Unauthenticated, no retry, no rate limiting.

pub mod boilerlink;
pub mod instagram;

pub use boilerlink::BoilerLinkClient;
pub use instagram::InstagramClient;

use crate::http::HttpError;

/// Errors raised while talking to a source site
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("request to {url} failed: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response is missing `{0}`")]
    MissingField(&'static str),
}
