use serde::{Deserialize, Serialize};

use crate::{Bookmark, BookmarkId, Result, TimelineError, UserId};

/// The collaborator driving this timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    #[serde(default)]
    pub display_name: String,
    /// Admins and show owners may edit through other people's locks.
    #[serde(default)]
    pub privileged: bool,
}

impl Actor {
    pub fn new(id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            privileged: false,
        }
    }

    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }
}

/// Mutations a gesture or command may attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutation {
    Move,
    ResizeStart,
    ResizeEnd,
    Rename,
    Delete,
}

/// Lock state from the point of view of one actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LockStatus {
    Unlocked,
    HeldBySelf,
    HeldByOther { holder: String },
}

/// Why a gesture on a bookmark was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockRejection {
    pub bookmark_id: BookmarkId,
    pub mutation: Mutation,
    pub holder: String,
}

/// Unlocked, held by the actor, or the actor is privileged.
///
/// Locks are advisory data from the backend; this only spares the user a
/// gesture the backend would refuse.
pub fn can_mutate(bookmark: &Bookmark, actor_id: &UserId, privileged: bool) -> bool {
    match &bookmark.locked_by_id {
        None => true,
        Some(holder) => holder == actor_id || privileged,
    }
}

pub fn lock_status(bookmark: &Bookmark, actor: &Actor) -> LockStatus {
    match &bookmark.locked_by_id {
        None => LockStatus::Unlocked,
        Some(holder) if *holder == actor.id => LockStatus::HeldBySelf,
        Some(holder) => LockStatus::HeldByOther {
            holder: holder_name(bookmark, holder),
        },
    }
}

/// Gate for one intended mutation; the error names the lock holder.
pub fn check_mutation(bookmark: &Bookmark, actor: &Actor, mutation: Mutation) -> Result<()> {
    if can_mutate(bookmark, &actor.id, actor.privileged) {
        return Ok(());
    }
    let holder = bookmark
        .locked_by_id
        .as_ref()
        .map(|id| holder_name(bookmark, id))
        .unwrap_or_default();
    tracing::debug!(
        target = "bookmarks",
        bookmark = %bookmark.id,
        ?mutation,
        holder = %holder,
        "mutation refused by lock"
    );
    Err(TimelineError::Locked {
        id: bookmark.id.clone(),
        holder,
    })
}

pub(crate) fn rejection(bookmark: &Bookmark, mutation: Mutation) -> LockRejection {
    LockRejection {
        bookmark_id: bookmark.id.clone(),
        mutation,
        holder: bookmark
            .locked_by_id
            .as_ref()
            .map(|id| holder_name(bookmark, id))
            .unwrap_or_default(),
    }
}

fn holder_name(bookmark: &Bookmark, holder: &UserId) -> String {
    bookmark
        .locked_by_display_name
        .clone()
        .unwrap_or_else(|| holder.to_string())
}
