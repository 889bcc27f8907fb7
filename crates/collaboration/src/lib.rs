/// Bookmark persistence for collaborative review.
/// Backends own the authoritative copy and lock checks; the store keeps the
/// local snapshot the timeline paints from.
use thiserror::Error;
use timeline::{BookmarkId, TimelineError};

mod backend;
pub use backend::*;

mod store;
pub use store::*;

/// Every variant displays as the message shown to the user.
#[derive(Debug, Error)]
pub enum CollaborationError {
    #[error("network error: {0}")]
    NetworkError(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("bookmark not found: {0}")]
    BookmarkNotFound(BookmarkId),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error(transparent)]
    Timeline(#[from] TimelineError),
}

impl From<serde_json::Error> for CollaborationError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CollaborationError>;
