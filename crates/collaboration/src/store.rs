/// Local bookmark snapshot with optimistic writes.
///
/// Updates and deletes are applied to the snapshot before the backend
/// answers so the timeline keeps showing where the user dropped the bookmark.
/// When the backend refuses, the snapshot is reverted to the last
/// server-confirmed state and the error is handed back for display.
use std::sync::Arc;

use serde::Serialize;
use timeline::{
    check_mutation, Actor, Bookmark, BookmarkId, BookmarkSet, Mutation, TimelineContext,
    TimelineIntent, TimelineViewport,
};
use tracing::{debug, warn};

use crate::{BookmarkBackend, BookmarkPatch, CollaborationError, Result};

/// What a dispatched intent ended up doing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Nothing to persist; the host moves its player.
    Seek { time_sec: f64 },
    /// Waiting for the user to name the range.
    NamePending { start_ms: i64, end_ms: i64 },
    Created { bookmark: Bookmark },
    Updated { bookmark: Bookmark },
    Deleted { bookmark_id: BookmarkId },
}

pub struct BookmarkStore {
    backend: Arc<dyn BookmarkBackend>,
    actor: Actor,
    bookmarks: BookmarkSet,
    last_error: Option<String>,
}

impl BookmarkStore {
    pub fn new(backend: Arc<dyn BookmarkBackend>, actor: Actor) -> Self {
        Self {
            backend,
            actor,
            bookmarks: BookmarkSet::new(),
            last_error: None,
        }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn bookmarks(&self) -> &BookmarkSet {
        &self.bookmarks
    }

    /// Message of the most recent failed write, until the next success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Borrowed inputs for the interaction state machine.
    pub fn context<'a>(
        &'a self,
        viewport: &'a TimelineViewport,
        playhead_sec: f64,
    ) -> TimelineContext<'a> {
        TimelineContext {
            viewport,
            bookmarks: &self.bookmarks,
            actor: &self.actor,
            playhead_sec,
        }
    }

    /// Replaces the snapshot with the backend's list.
    pub async fn refresh(&mut self) -> Result<()> {
        let list = self.backend.list_bookmarks().await?;
        self.bookmarks = BookmarkSet::from_vec(list);
        Ok(())
    }

    /// Merges a change made by another collaborator.
    pub fn apply_remote(&mut self, bookmark: Bookmark) {
        self.bookmarks.upsert(bookmark);
    }

    pub fn remove_remote(&mut self, id: &BookmarkId) {
        self.bookmarks.remove(id);
    }

    pub async fn dispatch(&mut self, intent: TimelineIntent) -> Result<DispatchOutcome> {
        let result = match intent {
            TimelineIntent::Seek { time_sec } => return Ok(DispatchOutcome::Seek { time_sec }),
            TimelineIntent::NameRequested { start_ms, end_ms } => {
                return Ok(DispatchOutcome::NamePending { start_ms, end_ms })
            }
            TimelineIntent::CreateRange {
                start_ms,
                end_ms,
                label,
            } => self.create(start_ms, end_ms, label).await,
            TimelineIntent::UpdateBookmark {
                bookmark_id,
                start_ms,
                end_ms,
            } => {
                self.update(&bookmark_id, BookmarkPatch::range(start_ms, end_ms))
                    .await
            }
            TimelineIntent::DeleteBookmark { bookmark_id } => self.delete(&bookmark_id).await,
        };

        self.settle(result)
    }

    pub async fn rename(&mut self, id: &BookmarkId, label: &str) -> Result<DispatchOutcome> {
        let result = self.update(id, BookmarkPatch::label(label)).await;
        self.settle(result)
    }

    /// Keeps `last_error` in step with the latest write.
    fn settle(&mut self, result: Result<DispatchOutcome>) -> Result<DispatchOutcome> {
        match &result {
            Ok(_) => self.last_error = None,
            Err(err) => self.last_error = Some(err.to_string()),
        }
        result
    }

    async fn create(
        &mut self,
        start_ms: i64,
        end_ms: i64,
        label: Option<String>,
    ) -> Result<DispatchOutcome> {
        let bookmark = self
            .backend
            .create_bookmark(&self.actor, start_ms, end_ms, label)
            .await?;
        self.bookmarks.upsert(bookmark.clone());
        Ok(DispatchOutcome::Created { bookmark })
    }

    async fn update(&mut self, id: &BookmarkId, patch: BookmarkPatch) -> Result<DispatchOutcome> {
        let confirmed = self
            .bookmarks
            .get(id)
            .cloned()
            .ok_or_else(|| CollaborationError::BookmarkNotFound(id.clone()))?;
        // refused locally, never sent
        check_mutation(&confirmed, &self.actor, patch.mutation(&confirmed))?;
        let optimistic = patch.apply_to(&confirmed)?;
        self.bookmarks.upsert(optimistic);

        match self.backend.update_bookmark(&self.actor, id, patch).await {
            Ok(bookmark) => {
                self.bookmarks.upsert(bookmark.clone());
                Ok(DispatchOutcome::Updated { bookmark })
            }
            Err(err) => {
                warn!(target = "bookmarks", bookmark = %id, error = %err, "update failed, reverting");
                self.bookmarks.upsert(confirmed);
                Err(err)
            }
        }
    }

    async fn delete(&mut self, id: &BookmarkId) -> Result<DispatchOutcome> {
        let confirmed = self
            .bookmarks
            .get(id)
            .cloned()
            .ok_or_else(|| CollaborationError::BookmarkNotFound(id.clone()))?;
        check_mutation(&confirmed, &self.actor, Mutation::Delete)?;
        self.bookmarks.remove(id);

        match self.backend.delete_bookmark(&self.actor, id).await {
            Ok(()) => {
                debug!(target = "bookmarks", bookmark = %id, "bookmark deleted");
                Ok(DispatchOutcome::Deleted {
                    bookmark_id: id.clone(),
                })
            }
            Err(err) => {
                warn!(target = "bookmarks", bookmark = %id, error = %err, "delete failed, restoring");
                self.bookmarks.upsert(confirmed);
                Err(err)
            }
        }
    }
}
