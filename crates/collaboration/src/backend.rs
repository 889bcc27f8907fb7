/// Backend bookmark contract and an in-memory reference implementation
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use timeline::{
    can_mutate, check_mutation, validate_range, Actor, Bookmark, BookmarkId, Mutation,
    TimelineError,
};

use crate::{CollaborationError, Result};

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl BookmarkPatch {
    pub fn range(start_ms: i64, end_ms: i64) -> Self {
        Self {
            start_ms: Some(start_ms),
            end_ms: Some(end_ms),
            label: None,
        }
    }

    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    /// The mutation this patch amounts to for the lock gate.
    pub fn mutation(&self, current: &Bookmark) -> Mutation {
        let start_changed = self.start_ms.is_some_and(|s| s != current.start_ms);
        let end_changed = self.end_ms.is_some_and(|e| e != current.end_ms);
        match (start_changed, end_changed) {
            (true, true) => Mutation::Move,
            (true, false) => Mutation::ResizeStart,
            (false, true) => Mutation::ResizeEnd,
            (false, false) => Mutation::Rename,
        }
    }

    /// Applies the patch to a copy of `bookmark`, validating the result.
    pub fn apply_to(&self, bookmark: &Bookmark) -> timeline::Result<Bookmark> {
        let mut next = bookmark.clone();
        next.set_range(
            self.start_ms.unwrap_or(bookmark.start_ms),
            self.end_ms.unwrap_or(bookmark.end_ms),
        )?;
        if let Some(label) = &self.label {
            next.label = Some(label.clone());
        }
        Ok(next)
    }
}

/// Remote bookmark API for one video.
///
/// Every call is fallible; the error's `Display` is surfaced to the user
/// as-is.
#[async_trait::async_trait]
pub trait BookmarkBackend: Send + Sync {
    async fn list_bookmarks(&self) -> Result<Vec<Bookmark>>;

    async fn create_bookmark(
        &self,
        actor: &Actor,
        start_ms: i64,
        end_ms: i64,
        label: Option<String>,
    ) -> Result<Bookmark>;

    async fn update_bookmark(
        &self,
        actor: &Actor,
        id: &BookmarkId,
        patch: BookmarkPatch,
    ) -> Result<Bookmark>;

    async fn delete_bookmark(&self, actor: &Actor, id: &BookmarkId) -> Result<()>;

    /// Claims the advisory lock for `actor`.
    async fn lock_bookmark(&self, actor: &Actor, id: &BookmarkId) -> Result<Bookmark>;

    async fn unlock_bookmark(&self, actor: &Actor, id: &BookmarkId) -> Result<Bookmark>;
}

#[derive(Debug, Default)]
struct BackendState {
    bookmarks: BTreeMap<BookmarkId, Bookmark>,
    fail_next: Option<CollaborationError>,
}

/// Reference backend that keeps bookmarks in memory and enforces locks
/// authoritatively, the way a server would.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<BackendState>,
    calls: AtomicUsize,
    latency: Option<Duration>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bookmarks(bookmarks: impl IntoIterator<Item = Bookmark>) -> Self {
        let backend = Self::new();
        {
            let mut state = backend.state.lock();
            for bookmark in bookmarks {
                state.bookmarks.insert(bookmark.id.clone(), bookmark);
            }
        }
        backend
    }

    /// Seeds the backend from a JSON array of bookmarks in the API's
    /// camelCase form.
    pub fn from_json(json: &str) -> Result<Self> {
        let bookmarks: Vec<Bookmark> = serde_json::from_str(json)?;
        Ok(Self::with_bookmarks(bookmarks))
    }

    /// Simulated round-trip delay applied to every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes the next call fail with `err` without touching any state.
    pub fn fail_next(&self, err: CollaborationError) {
        self.state.lock().fail_next = Some(err);
    }

    /// Number of calls that reached the backend, failed ones included.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn get(&self, id: &BookmarkId) -> Option<Bookmark> {
        self.state.lock().bookmarks.get(id).cloned()
    }

    /// Sets or clears a lock directly, as another collaborator would.
    pub fn force_lock(&self, id: &BookmarkId, holder: Option<(&Actor, &str)>) -> Result<Bookmark> {
        let mut state = self.state.lock();
        let bookmark = state
            .bookmarks
            .get_mut(id)
            .ok_or_else(|| CollaborationError::BookmarkNotFound(id.clone()))?;
        match holder {
            Some((actor, name)) => {
                bookmark.locked_by_id = Some(actor.id.clone());
                bookmark.locked_by_display_name = Some(name.to_string());
            }
            None => {
                bookmark.locked_by_id = None;
                bookmark.locked_by_display_name = None;
            }
        }
        Ok(bookmark.clone())
    }

    async fn enter(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match self.state.lock().fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl BookmarkBackend for InMemoryBackend {
    async fn list_bookmarks(&self) -> Result<Vec<Bookmark>> {
        self.enter().await?;
        Ok(self.state.lock().bookmarks.values().cloned().collect())
    }

    async fn create_bookmark(
        &self,
        actor: &Actor,
        start_ms: i64,
        end_ms: i64,
        label: Option<String>,
    ) -> Result<Bookmark> {
        self.enter().await?;
        validate_range(start_ms, end_ms)?;

        let id = BookmarkId::new(uuid::Uuid::new_v4().to_string());
        let mut bookmark = Bookmark::new(id.clone(), start_ms, end_ms, actor.id.clone());
        bookmark.label = label;
        self.state.lock().bookmarks.insert(id, bookmark.clone());
        tracing::debug!(target = "bookmarks", bookmark = %bookmark.id, start_ms, end_ms, "bookmark created");
        Ok(bookmark)
    }

    async fn update_bookmark(
        &self,
        actor: &Actor,
        id: &BookmarkId,
        patch: BookmarkPatch,
    ) -> Result<Bookmark> {
        self.enter().await?;
        let mut state = self.state.lock();
        let current = state
            .bookmarks
            .get_mut(id)
            .ok_or_else(|| CollaborationError::BookmarkNotFound(id.clone()))?;
        check_mutation(current, actor, patch.mutation(current))?;
        let next = patch.apply_to(current)?;
        *current = next.clone();
        Ok(next)
    }

    async fn delete_bookmark(&self, actor: &Actor, id: &BookmarkId) -> Result<()> {
        self.enter().await?;
        let mut state = self.state.lock();
        let current = state
            .bookmarks
            .get(id)
            .ok_or_else(|| CollaborationError::BookmarkNotFound(id.clone()))?;
        check_mutation(current, actor, Mutation::Delete)?;
        state.bookmarks.remove(id);
        Ok(())
    }

    async fn lock_bookmark(&self, actor: &Actor, id: &BookmarkId) -> Result<Bookmark> {
        self.enter().await?;
        let mut state = self.state.lock();
        let current = state
            .bookmarks
            .get_mut(id)
            .ok_or_else(|| CollaborationError::BookmarkNotFound(id.clone()))?;
        if let Some(holder) = &current.locked_by_id {
            if *holder != actor.id && !actor.privileged {
                return Err(TimelineError::Locked {
                    id: id.clone(),
                    holder: current
                        .locked_by_display_name
                        .clone()
                        .unwrap_or_else(|| holder.to_string()),
                }
                .into());
            }
        }
        current.locked_by_id = Some(actor.id.clone());
        current.locked_by_display_name = Some(actor.display_name.clone());
        Ok(current.clone())
    }

    async fn unlock_bookmark(&self, actor: &Actor, id: &BookmarkId) -> Result<Bookmark> {
        self.enter().await?;
        let mut state = self.state.lock();
        let current = state
            .bookmarks
            .get_mut(id)
            .ok_or_else(|| CollaborationError::BookmarkNotFound(id.clone()))?;
        if !can_mutate(current, &actor.id, actor.privileged) {
            return Err(CollaborationError::PermissionDenied(format!(
                "only the lock holder can unlock bookmark {id}"
            )));
        }
        current.locked_by_id = None;
        current.locked_by_display_name = None;
        Ok(current.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timeline::UserId;

    fn actor(id: &str) -> Actor {
        Actor::new(UserId::new(id), id.to_uppercase())
    }

    fn seeded() -> InMemoryBackend {
        InMemoryBackend::with_bookmarks([Bookmark::new(
            BookmarkId::new("b1"),
            1000,
            2000,
            UserId::new("sam"),
        )])
    }

    #[test]
    fn patch_classifies_mutation() {
        let b = Bookmark::new(BookmarkId::new("b"), 1000, 2000, UserId::new("u"));
        assert_eq!(BookmarkPatch::range(1500, 2500).mutation(&b), Mutation::Move);
        assert_eq!(BookmarkPatch::range(1200, 2000).mutation(&b), Mutation::ResizeStart);
        assert_eq!(BookmarkPatch::range(1000, 2400).mutation(&b), Mutation::ResizeEnd);
        assert_eq!(BookmarkPatch::label("x").mutation(&b), Mutation::Rename);
        assert!(BookmarkPatch::range(3000, 2000).apply_to(&b).is_err());
    }

    #[test]
    fn patch_wire_form_omits_absent_fields() {
        let json = serde_json::to_string(&BookmarkPatch::range(1, 2)).unwrap();
        assert_eq!(json, r#"{"startMs":1,"endMs":2}"#);
    }

    #[tokio::test]
    async fn create_validates_range() {
        let backend = InMemoryBackend::new();
        let sam = actor("sam");
        assert!(backend.create_bookmark(&sam, 500, 500, None).await.is_err());
        let created = backend
            .create_bookmark(&sam, 0, 500, Some("cold open".into()))
            .await
            .unwrap();
        assert_eq!(created.created_by_id, sam.id);
        assert_eq!(backend.list_bookmarks().await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn lock_holder_excludes_others() {
        let backend = seeded();
        let (sam, kim) = (actor("sam"), actor("kim"));
        let id = BookmarkId::new("b1");

        backend.lock_bookmark(&sam, &id).await.unwrap();
        let err = backend
            .update_bookmark(&kim, &id, BookmarkPatch::range(0, 900))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "bookmark b1 is locked by SAM");
        assert!(backend.lock_bookmark(&kim, &id).await.is_err());
        assert!(backend.delete_bookmark(&kim, &id).await.is_err());
        assert!(backend.unlock_bookmark(&kim, &id).await.is_err());

        // privileged actors edit through the lock
        let admin = actor("admin").privileged();
        let moved = backend
            .update_bookmark(&admin, &id, BookmarkPatch::range(0, 900))
            .await
            .unwrap();
        assert_eq!((moved.start_ms, moved.end_ms), (0, 900));

        backend.unlock_bookmark(&sam, &id).await.unwrap();
        backend.delete_bookmark(&kim, &id).await.unwrap();
        assert!(backend.get(&id).is_none());
    }

    #[tokio::test]
    async fn injected_failure_hits_one_call() {
        let backend = seeded();
        let sam = actor("sam");
        backend.fail_next(CollaborationError::NetworkError("offline".into()));
        let err = backend
            .update_bookmark(&sam, &BookmarkId::new("b1"), BookmarkPatch::range(0, 900))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "network error: offline");
        assert_eq!(backend.get(&BookmarkId::new("b1")).unwrap().start_ms, 1000);

        backend
            .update_bookmark(&sam, &BookmarkId::new("b1"), BookmarkPatch::range(0, 900))
            .await
            .unwrap();
        assert_eq!(backend.call_count(), 2);
    }

    #[test]
    fn seeds_from_api_json() {
        let backend = InMemoryBackend::from_json(
            r#"[{"id":"a","startMs":0,"endMs":500,"createdById":"u1","lockedById":"u2"}]"#,
        )
        .unwrap();
        assert!(backend.get(&BookmarkId::new("a")).unwrap().is_locked());
        assert!(InMemoryBackend::from_json("{").is_err());
    }
}
