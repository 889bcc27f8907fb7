use serde::{Deserialize, Serialize};

use crate::{BookmarkId, BookmarkSet, InteractionConfig, SelectionRange, TimelineViewport};

/// Horizontal band of the timeline the pointer is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    /// Time ruler; every press there scrubs the playhead.
    Ruler,
    /// Bookmark track.
    Track,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    Start,
    End,
}

/// What a pointer press landed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget {
    Playhead,
    InHandle,
    OutHandle,
    BookmarkBody(BookmarkId),
    BookmarkEdge(BookmarkId, Edge),
    EmptyTrack,
}

/// Classifies a press at `x`.
///
/// Priority on the track: selection handles, playhead, bookmark edges and
/// bodies (the latest-starting bookmark wins where they overlap), then empty
/// track.
pub fn hit_test(
    viewport: &TimelineViewport,
    bookmarks: &BookmarkSet,
    selection: &SelectionRange,
    playhead_sec: f64,
    config: &InteractionConfig,
    x: f64,
    lane: Lane,
) -> HitTarget {
    if lane == Lane::Ruler {
        return HitTarget::Playhead;
    }

    if let Some((start, end)) = selection.bounds() {
        let d_in = (x - viewport.time_to_pixel(start)).abs();
        let d_out = (x - viewport.time_to_pixel(end)).abs();
        let tol = config.selection_handle_px;
        match (d_in <= tol, d_out <= tol) {
            // collapsed selection: grab the out handle unless clearly nearer the in one
            (true, true) if d_in < d_out => return HitTarget::InHandle,
            (true, true) => return HitTarget::OutHandle,
            (true, false) => return HitTarget::InHandle,
            (false, true) => return HitTarget::OutHandle,
            (false, false) => {}
        }
    }

    if (x - viewport.time_to_pixel(playhead_sec)).abs() <= config.playhead_hit_px {
        return HitTarget::Playhead;
    }

    for bookmark in bookmarks.as_slice().iter().rev() {
        let sx = viewport.time_to_pixel(bookmark.start_sec());
        let ex = viewport.time_to_pixel(bookmark.end_sec());
        // narrow bookmarks keep a third of their width as grabbable body
        let handle = config.edge_handle_px.min((ex - sx).max(0.0) / 3.0);
        if (x - sx).abs() <= handle {
            return HitTarget::BookmarkEdge(bookmark.id.clone(), Edge::Start);
        }
        if (x - ex).abs() <= handle {
            return HitTarget::BookmarkEdge(bookmark.id.clone(), Edge::End);
        }
        if x > sx && x < ex {
            return HitTarget::BookmarkBody(bookmark.id.clone());
        }
    }

    HitTarget::EmptyTrack
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bookmark, UserId};

    fn bm(id: &str, start: i64, end: i64) -> Bookmark {
        Bookmark::new(BookmarkId::new(id), start, end, UserId::new("u"))
    }

    /// 100 px per second.
    fn viewport() -> TimelineViewport {
        TimelineViewport::new(60.0, 25.0, 1000.0)
    }

    fn hit(set: &BookmarkSet, selection: &SelectionRange, x: f64, lane: Lane) -> HitTarget {
        hit_test(&viewport(), set, selection, 30.0, &InteractionConfig::default(), x, lane)
    }

    #[test]
    fn ruler_always_scrubs() {
        let set: BookmarkSet = vec![bm("a", 0, 5000)].into_iter().collect();
        assert_eq!(hit(&set, &SelectionRange::default(), 200.0, Lane::Ruler), HitTarget::Playhead);
    }

    #[test]
    fn edges_bodies_and_empty_track() {
        let set: BookmarkSet = vec![bm("a", 1000, 4000)].into_iter().collect();
        let none = SelectionRange::default();
        let a = BookmarkId::new("a");
        assert_eq!(hit(&set, &none, 103.0, Lane::Track), HitTarget::BookmarkEdge(a.clone(), Edge::Start));
        assert_eq!(hit(&set, &none, 396.0, Lane::Track), HitTarget::BookmarkEdge(a.clone(), Edge::End));
        assert_eq!(hit(&set, &none, 250.0, Lane::Track), HitTarget::BookmarkBody(a));
        assert_eq!(hit(&set, &none, 600.0, Lane::Track), HitTarget::EmptyTrack);
        // playhead at 30s
        assert_eq!(hit(&set, &none, 3003.0, Lane::Track), HitTarget::Playhead);
    }

    #[test]
    fn playhead_beats_bookmarks_and_handles_beat_playhead() {
        let set: BookmarkSet = vec![bm("a", 29_000, 31_000)].into_iter().collect();
        let vp = viewport().with_scroll(2500.0);
        let cfg = InteractionConfig::default();
        // playhead at 30s sits at x=500
        let none = SelectionRange::default();
        assert_eq!(hit_test(&vp, &set, &none, 30.0, &cfg, 503.0, Lane::Track), HitTarget::Playhead);

        let sel = SelectionRange::new(30.0, 32.0);
        assert_eq!(hit_test(&vp, &set, &sel, 30.0, &cfg, 501.0, Lane::Track), HitTarget::InHandle);
        assert_eq!(hit_test(&vp, &set, &sel, 30.0, &cfg, 698.0, Lane::Track), HitTarget::OutHandle);
    }

    #[test]
    fn latest_bookmark_wins_overlap() {
        let set: BookmarkSet = vec![bm("a", 1000, 5000), bm("b", 2000, 3000)].into_iter().collect();
        let none = SelectionRange::default();
        assert_eq!(
            hit(&set, &none, 250.0, Lane::Track),
            HitTarget::BookmarkBody(BookmarkId::new("b"))
        );
        assert_eq!(
            hit(&set, &none, 400.0, Lane::Track),
            HitTarget::BookmarkBody(BookmarkId::new("a"))
        );
    }

    #[test]
    fn narrow_bookmark_keeps_a_body() {
        // 90ms wide: 9px, handles shrink to 3px
        let set: BookmarkSet = vec![bm("n", 1000, 1090)].into_iter().collect();
        let none = SelectionRange::default();
        assert_eq!(
            hit(&set, &none, 104.5, Lane::Track),
            HitTarget::BookmarkBody(BookmarkId::new("n"))
        );
        assert_eq!(
            hit(&set, &none, 101.0, Lane::Track),
            HitTarget::BookmarkEdge(BookmarkId::new("n"), Edge::Start)
        );
    }

    #[test]
    fn collapsed_selection_prefers_out_handle() {
        let set = BookmarkSet::new();
        let sel = SelectionRange::new(5.0, 5.0);
        assert_eq!(hit(&set, &sel, 500.0, Lane::Track), HitTarget::OutHandle);
    }
}
