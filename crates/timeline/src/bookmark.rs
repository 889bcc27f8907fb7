/// Bookmarks (reviewed time ranges), the in-progress selection and the
/// drag-preview override.

use serde::{Deserialize, Serialize};

use crate::{Result, TimelineError, UserId};

/// Backend-assigned, opaque bookmark identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookmarkId(pub String);

impl BookmarkId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for BookmarkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A reviewed time range as the backend reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: BookmarkId,
    #[serde(default)]
    pub label: Option<String>,
    pub start_ms: i64,
    pub end_ms: i64,
    #[serde(default)]
    pub locked_by_id: Option<UserId>,
    #[serde(default)]
    pub locked_by_display_name: Option<String>,
    pub created_by_id: UserId,
}

impl Bookmark {
    pub fn new(id: BookmarkId, start_ms: i64, end_ms: i64, created_by_id: UserId) -> Self {
        Self {
            id,
            label: None,
            start_ms,
            end_ms,
            locked_by_id: None,
            locked_by_display_name: None,
            created_by_id,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn locked_by(mut self, user: UserId, display_name: impl Into<String>) -> Self {
        self.locked_by_id = Some(user);
        self.locked_by_display_name = Some(display_name.into());
        self
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }

    pub fn start_sec(&self) -> f64 {
        self.start_ms as f64 / 1000.0
    }

    pub fn end_sec(&self) -> f64 {
        self.end_ms as f64 / 1000.0
    }

    pub fn contains_ms(&self, ms: i64) -> bool {
        ms >= self.start_ms && ms < self.end_ms
    }

    pub fn is_locked(&self) -> bool {
        self.locked_by_id.is_some()
    }

    /// Replaces the range, rejecting anything that is not `0 <= start < end`.
    pub fn set_range(&mut self, start_ms: i64, end_ms: i64) -> Result<()> {
        validate_range(start_ms, end_ms)?;
        self.start_ms = start_ms;
        self.end_ms = end_ms;
        Ok(())
    }
}

pub fn validate_range(start_ms: i64, end_ms: i64) -> Result<()> {
    if start_ms < 0 || end_ms <= start_ms {
        return Err(TimelineError::InvalidRange { start_ms, end_ms });
    }
    Ok(())
}

/// Uncommitted position of the bookmark being dragged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DragPreview {
    pub bookmark_id: BookmarkId,
    pub start_ms: i64,
    pub end_ms: i64,
}

/// Range being carved out for a new bookmark.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SelectionRange {
    pub start_sec: Option<f64>,
    pub end_sec: Option<f64>,
}

impl SelectionRange {
    pub fn new(start_sec: f64, end_sec: f64) -> Self {
        Self {
            start_sec: Some(start_sec.min(end_sec)),
            end_sec: Some(start_sec.max(end_sec)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start_sec.is_none() && self.end_sec.is_none()
    }

    /// Both bounds, ordered, when both are set.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        match (self.start_sec, self.end_sec) {
            (Some(a), Some(b)) => Some((a.min(b), a.max(b))),
            _ => None,
        }
    }

    pub fn span_sec(&self) -> f64 {
        self.bounds().map(|(a, b)| b - a).unwrap_or(0.0)
    }

    /// Moves the start, never past the end.
    pub fn set_start(&mut self, start_sec: f64) {
        self.start_sec = Some(match self.end_sec {
            Some(end) => start_sec.min(end),
            None => start_sec,
        });
    }

    /// Moves the end, never before the start.
    pub fn set_end(&mut self, end_sec: f64) {
        self.end_sec = Some(match self.start_sec {
            Some(start) => end_sec.max(start),
            None => end_sec,
        });
    }

    pub fn clear(&mut self) {
        self.start_sec = None;
        self.end_sec = None;
    }
}

/// Read-mostly snapshot of the bookmarks on one video, ordered by start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookmarkSet {
    bookmarks: Vec<Bookmark>,
}

impl BookmarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(mut bookmarks: Vec<Bookmark>) -> Self {
        bookmarks.sort_by(|a, b| (a.start_ms, &a.id).cmp(&(b.start_ms, &b.id)));
        Self { bookmarks }
    }

    pub fn len(&self) -> usize {
        self.bookmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bookmark> {
        self.bookmarks.iter()
    }

    pub fn as_slice(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn get(&self, id: &BookmarkId) -> Option<&Bookmark> {
        self.bookmarks.iter().find(|b| &b.id == id)
    }

    /// Inserts or replaces by id, keeping start order.
    pub fn upsert(&mut self, bookmark: Bookmark) {
        self.bookmarks.retain(|b| b.id != bookmark.id);
        let pos = self
            .bookmarks
            .partition_point(|b| (b.start_ms, &b.id) < (bookmark.start_ms, &bookmark.id));
        self.bookmarks.insert(pos, bookmark);
    }

    pub fn remove(&mut self, id: &BookmarkId) -> Option<Bookmark> {
        let pos = self.bookmarks.iter().position(|b| &b.id == id)?;
        Some(self.bookmarks.remove(pos))
    }

    /// Bookmarks covering `ms`.
    pub fn at_ms(&self, ms: i64) -> Vec<&Bookmark> {
        self.bookmarks.iter().filter(|b| b.contains_ms(ms)).collect()
    }

    /// Range to paint for `bookmark`, honouring an active drag preview.
    pub fn effective_range(&self, bookmark: &Bookmark, preview: Option<&DragPreview>) -> (i64, i64) {
        match preview {
            Some(p) if p.bookmark_id == bookmark.id => (p.start_ms, p.end_ms),
            _ => (bookmark.start_ms, bookmark.end_ms),
        }
    }
}

impl FromIterator<Bookmark> for BookmarkSet {
    fn from_iter<I: IntoIterator<Item = Bookmark>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bm(id: &str, start: i64, end: i64) -> Bookmark {
        Bookmark::new(BookmarkId::new(id), start, end, UserId::new("u1"))
    }

    #[test]
    fn deserializes_backend_json() {
        let json = r#"{
            "id": "bm-1",
            "label": "intro",
            "startMs": 5000,
            "endMs": 15000,
            "lockedById": "u2",
            "lockedByDisplayName": "Sam",
            "createdById": "u1"
        }"#;
        let b: Bookmark = serde_json::from_str(json).unwrap();
        assert_eq!(b.id, BookmarkId::new("bm-1"));
        assert_eq!(b.duration_ms(), 10_000);
        assert_eq!(b.locked_by_id, Some(UserId::new("u2")));

        let minimal: Bookmark =
            serde_json::from_str(r#"{"id":"x","startMs":0,"endMs":1,"createdById":"u1"}"#).unwrap();
        assert!(!minimal.is_locked());
        assert!(minimal.label.is_none());
    }

    #[test]
    fn set_keeps_start_order() {
        let mut set: BookmarkSet = vec![bm("b", 9000, 9500), bm("a", 1000, 2000)].into_iter().collect();
        set.upsert(bm("c", 3000, 4000));
        let ids: Vec<_> = set.iter().map(|b| b.id.0.as_str()).collect();
        assert_eq!(ids, ["a", "c", "b"]);

        set.upsert(bm("a", 10_000, 11_000));
        let ids: Vec<_> = set.iter().map(|b| b.id.0.as_str()).collect();
        assert_eq!(ids, ["c", "b", "a"]);
        assert_eq!(set.len(), 3);

        assert!(set.remove(&BookmarkId::new("c")).is_some());
        assert!(set.remove(&BookmarkId::new("c")).is_none());
        assert_eq!(set.at_ms(9200).len(), 1);
    }

    #[test]
    fn rejects_collapsed_ranges() {
        let mut b = bm("a", 0, 10);
        assert!(b.set_range(50, 50).is_err());
        assert!(b.set_range(-1, 50).is_err());
        b.set_range(20, 30).unwrap();
        assert_eq!((b.start_ms, b.end_ms), (20, 30));
    }

    #[test]
    fn selection_bounds_stay_ordered() {
        let mut sel = SelectionRange::default();
        assert!(sel.is_empty());
        sel.set_start(4.0);
        sel.set_end(2.0);
        assert_eq!(sel.bounds(), Some((4.0, 4.0)));
        sel.set_end(6.5);
        sel.set_start(9.0);
        assert_eq!(sel.bounds(), Some((6.5, 6.5)));
        sel.set_start(1.5);
        assert_eq!(sel.span_sec(), 5.0);
        sel.clear();
        assert!(sel.is_empty());
    }

    #[test]
    fn preview_overrides_painted_range() {
        let set: BookmarkSet = vec![bm("a", 1000, 2000), bm("b", 3000, 4000)].into_iter().collect();
        let preview = DragPreview {
            bookmark_id: BookmarkId::new("a"),
            start_ms: 1500,
            end_ms: 2500,
        };
        let a = set.get(&BookmarkId::new("a")).unwrap();
        let b = set.get(&BookmarkId::new("b")).unwrap();
        assert_eq!(set.effective_range(a, Some(&preview)), (1500, 2500));
        assert_eq!(set.effective_range(b, Some(&preview)), (3000, 4000));
    }
}
