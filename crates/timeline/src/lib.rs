//! Timeline interaction core for collaborative video review.
//!
//! Everything in this crate is synchronous and side-effect free apart from the
//! [`TimelineInteraction`] session object, which owns the ephemeral drag,
//! selection and naming state. Hosts paint what the layout functions return
//! and forward pointer events to the interaction object.

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod config;
pub use config::*;
mod viewport;
pub use viewport::*;
mod zoom;
pub use zoom::*;
mod timecode;
pub use timecode::*;
mod ruler;
pub use ruler::*;
mod tiles;
pub use tiles::*;
mod bookmark;
pub use bookmark::*;
mod lock;
pub use lock::*;
mod hit;
pub use hit::*;
mod drag;
pub use drag::*;

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("bookmark {id} is locked by {holder}")]
    Locked { id: BookmarkId, holder: String },
    #[error("invalid range: {start_ms}..{end_ms}")]
    InvalidRange { start_ms: i64, end_ms: i64 },
}

pub type Result<T> = std::result::Result<T, TimelineError>;

/// Frame index at the viewport's frame rate. Negative values never reach the
/// cache; they are clamped to 0 at the mapping boundary.
pub type Frame = i64;

/// Identifier of a collaborator as handed out by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
