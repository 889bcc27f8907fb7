/// Pointer gesture arbitration for the bookmark timeline.
///
/// A press is classified once and keeps its mode until release or cancel.
/// All transitions run synchronously; commits are derived from the release
/// coordinates, never from the last move sample.

use serde::Serialize;
use tracing::debug;

use crate::lock::rejection;
use crate::{
    can_mutate, hit_test, Actor, Bookmark, BookmarkId, BookmarkSet, DragPreview, Edge,
    HitTarget, InteractionConfig, Lane, LockRejection, Mutation, SelectionRange,
    TimelineViewport,
};

/// Press position in both spaces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DragAnchor {
    pub pixel_x: f64,
    pub time_sec: f64,
}

/// Gesture kind, fixed for the lifetime of a drag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DragMode {
    Playhead,
    InHandle,
    OutHandle,
    Selection,
    BookmarkMove {
        bookmark_id: BookmarkId,
        origin_start_ms: i64,
        origin_end_ms: i64,
    },
    BookmarkResize {
        bookmark_id: BookmarkId,
        edge: Edge,
        origin_start_ms: i64,
        origin_end_ms: i64,
    },
}

impl DragMode {
    pub fn bookmark_id(&self) -> Option<&BookmarkId> {
        match self {
            Self::BookmarkMove { bookmark_id, .. } | Self::BookmarkResize { bookmark_id, .. } => {
                Some(bookmark_id)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DragSession {
    pub mode: DragMode,
    pub anchor: DragAnchor,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Shift: grab the nearer bound of an existing selection.
    pub extend: bool,
}

/// What the host should do in response to an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum TimelineIntent {
    Seek {
        time_sec: f64,
    },
    /// A drag-to-create finished; ask the user for a name, then call
    /// [`TimelineInteraction::confirm_name`] or [`TimelineInteraction::cancel_name`].
    NameRequested {
        start_ms: i64,
        end_ms: i64,
    },
    CreateRange {
        start_ms: i64,
        end_ms: i64,
        label: Option<String>,
    },
    UpdateBookmark {
        bookmark_id: BookmarkId,
        start_ms: i64,
        end_ms: i64,
    },
    DeleteBookmark {
        bookmark_id: BookmarkId,
    },
}

/// Read-only inputs refreshed by the host on every render.
#[derive(Debug, Clone, Copy)]
pub struct TimelineContext<'a> {
    pub viewport: &'a TimelineViewport,
    pub bookmarks: &'a BookmarkSet,
    pub actor: &'a Actor,
    pub playhead_sec: f64,
}

impl TimelineContext<'_> {
    /// Time under `x`, kept inside the timeline. An unknown duration
    /// (metadata still loading) bounds it only below.
    fn time_at(&self, x: f64) -> f64 {
        let time_sec = self.viewport.pixel_to_time(x).max(0.0);
        match self.viewport.duration() {
            d if d > 0.0 => time_sec.min(d),
            _ => time_sec,
        }
    }
}

/// Range awaiting a name from the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingRange {
    pub start_ms: i64,
    pub end_ms: i64,
}

/// Ephemeral interaction state: the one drag session, the selection being
/// carved out, the drag preview and the naming step.
#[derive(Debug, Clone, Default)]
pub struct TimelineInteraction {
    config: InteractionConfig,
    session: Option<DragSession>,
    selection: SelectionRange,
    preview: Option<DragPreview>,
    pending: Option<PendingRange>,
    selected_bookmark: Option<BookmarkId>,
    rejection: Option<LockRejection>,
}

impl TimelineInteraction {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn selection(&self) -> &SelectionRange {
        &self.selection
    }

    pub fn drag_preview(&self) -> Option<&DragPreview> {
        self.preview.as_ref()
    }

    pub fn pending_range(&self) -> Option<PendingRange> {
        self.pending
    }

    pub fn selected_bookmark(&self) -> Option<&BookmarkId> {
        self.selected_bookmark.as_ref()
    }

    /// Most recent gesture refused by a lock, for "locked by …" feedback.
    pub fn last_rejection(&self) -> Option<&LockRejection> {
        self.rejection.as_ref()
    }

    pub fn pointer_down(
        &mut self,
        ctx: &TimelineContext<'_>,
        x: f64,
        lane: Lane,
        modifiers: Modifiers,
    ) -> Option<TimelineIntent> {
        if self.session.is_some() {
            debug!(target = "drag", "pointer-down during an active drag ignored");
            return None;
        }
        self.rejection = None;
        if self.pending.take().is_some() {
            debug!(target = "drag", "new gesture discards the unnamed range");
            self.selection.clear();
        }

        let target = hit_test(
            ctx.viewport,
            ctx.bookmarks,
            &self.selection,
            ctx.playhead_sec,
            &self.config,
            x,
            lane,
        );
        let anchor = DragAnchor {
            pixel_x: x,
            time_sec: ctx.time_at(x),
        };

        let mode = match target {
            HitTarget::Playhead => {
                self.session = Some(DragSession {
                    mode: DragMode::Playhead,
                    anchor,
                });
                return Some(TimelineIntent::Seek {
                    time_sec: anchor.time_sec,
                });
            }
            HitTarget::InHandle => DragMode::InHandle,
            HitTarget::OutHandle => DragMode::OutHandle,
            HitTarget::EmptyTrack if modifiers.extend => match self.selection.bounds() {
                Some((start, end)) => {
                    if (anchor.time_sec - start).abs() <= (anchor.time_sec - end).abs() {
                        self.selection.set_start(anchor.time_sec);
                        DragMode::InHandle
                    } else {
                        self.selection.set_end(anchor.time_sec);
                        DragMode::OutHandle
                    }
                }
                None => {
                    self.session = Some(DragSession {
                        mode: DragMode::Playhead,
                        anchor,
                    });
                    return Some(TimelineIntent::Seek {
                        time_sec: anchor.time_sec,
                    });
                }
            },
            HitTarget::EmptyTrack => {
                self.selection = SelectionRange::new(anchor.time_sec, anchor.time_sec);
                DragMode::Selection
            }
            HitTarget::BookmarkBody(id) => {
                let bookmark = ctx.bookmarks.get(&id)?;
                self.begin_bookmark_edit(ctx, bookmark, None)?
            }
            HitTarget::BookmarkEdge(id, edge) => {
                let bookmark = ctx.bookmarks.get(&id)?;
                self.begin_bookmark_edit(ctx, bookmark, Some(edge))?
            }
        };

        debug!(target = "drag", ?mode, x, "drag started");
        self.session = Some(DragSession { mode, anchor });
        None
    }

    /// Refuses at press time when the actor may not touch the bookmark, so a
    /// locked bookmark never shows a drag it cannot commit.
    fn begin_bookmark_edit(
        &mut self,
        ctx: &TimelineContext<'_>,
        bookmark: &Bookmark,
        edge: Option<Edge>,
    ) -> Option<DragMode> {
        let mutation = match edge {
            None => Mutation::Move,
            Some(Edge::Start) => Mutation::ResizeStart,
            Some(Edge::End) => Mutation::ResizeEnd,
        };
        self.selected_bookmark = Some(bookmark.id.clone());

        if !can_mutate(bookmark, &ctx.actor.id, ctx.actor.privileged) {
            let refused = rejection(bookmark, mutation);
            debug!(
                target = "drag",
                bookmark = %bookmark.id,
                holder = %refused.holder,
                "drag refused: bookmark locked"
            );
            self.rejection = Some(refused);
            return None;
        }

        self.preview = Some(DragPreview {
            bookmark_id: bookmark.id.clone(),
            start_ms: bookmark.start_ms,
            end_ms: bookmark.end_ms,
        });
        let bookmark_id = bookmark.id.clone();
        Some(match edge {
            None => DragMode::BookmarkMove {
                bookmark_id,
                origin_start_ms: bookmark.start_ms,
                origin_end_ms: bookmark.end_ms,
            },
            Some(edge) => DragMode::BookmarkResize {
                bookmark_id,
                edge,
                origin_start_ms: bookmark.start_ms,
                origin_end_ms: bookmark.end_ms,
            },
        })
    }

    pub fn pointer_move(&mut self, ctx: &TimelineContext<'_>, x: f64) -> Option<TimelineIntent> {
        let session = self.session.clone()?;
        match &session.mode {
            DragMode::Playhead => {
                return Some(TimelineIntent::Seek {
                    time_sec: ctx.time_at(x),
                })
            }
            DragMode::InHandle => self.selection.set_start(ctx.time_at(x)),
            DragMode::OutHandle => self.selection.set_end(ctx.time_at(x)),
            DragMode::Selection => {
                // the anchor stays pinned; the pointer side follows
                self.selection = SelectionRange::new(session.anchor.time_sec, ctx.time_at(x));
            }
            DragMode::BookmarkMove { bookmark_id, .. }
            | DragMode::BookmarkResize { bookmark_id, .. } => {
                let (start_ms, end_ms) = self.candidate(ctx, &session, x);
                self.preview = Some(DragPreview {
                    bookmark_id: bookmark_id.clone(),
                    start_ms,
                    end_ms,
                });
            }
        }
        None
    }

    pub fn pointer_up(&mut self, ctx: &TimelineContext<'_>, x: f64) -> Option<TimelineIntent> {
        let session = self.session.take()?;
        self.preview = None;

        match &session.mode {
            DragMode::Playhead => Some(TimelineIntent::Seek {
                time_sec: ctx.time_at(x),
            }),
            DragMode::Selection => {
                let selection = SelectionRange::new(session.anchor.time_sec, ctx.time_at(x));
                if selection.span_sec() <= self.config.min_selection_sec {
                    self.selection.clear();
                    return None;
                }
                self.selection = selection;
                let (start_ms, end_ms) = selection_ms(&selection)?;
                self.pending = Some(PendingRange { start_ms, end_ms });
                Some(TimelineIntent::NameRequested { start_ms, end_ms })
            }
            DragMode::InHandle | DragMode::OutHandle => {
                if session.mode == DragMode::InHandle {
                    self.selection.set_start(ctx.time_at(x));
                } else {
                    self.selection.set_end(ctx.time_at(x));
                }
                self.take_selection_as_range()
            }
            DragMode::BookmarkMove { bookmark_id, .. }
            | DragMode::BookmarkResize { bookmark_id, .. } => {
                let Some(bookmark) = ctx.bookmarks.get(bookmark_id) else {
                    debug!(target = "drag", bookmark = %bookmark_id, "bookmark vanished mid-drag");
                    return None;
                };
                // the lock may have been taken by someone else during the drag
                if !can_mutate(bookmark, &ctx.actor.id, ctx.actor.privileged) {
                    self.rejection = Some(rejection(bookmark, mutation_of(&session.mode)));
                    return None;
                }
                let (start_ms, end_ms) = self.candidate(ctx, &session, x);
                if (start_ms, end_ms) == (bookmark.start_ms, bookmark.end_ms) {
                    return None;
                }
                debug!(target = "drag", bookmark = %bookmark_id, start_ms, end_ms, "bookmark edit committed");
                Some(TimelineIntent::UpdateBookmark {
                    bookmark_id: bookmark_id.clone(),
                    start_ms,
                    end_ms,
                })
            }
        }
    }

    /// Plain click (press and release without a drag): seeks on the ruler or
    /// empty track, selects and seeks to a bookmark's start when on one.
    pub fn click(&mut self, ctx: &TimelineContext<'_>, x: f64, lane: Lane) -> Option<TimelineIntent> {
        if self.session.is_some() {
            return None;
        }
        let target = hit_test(
            ctx.viewport,
            ctx.bookmarks,
            &self.selection,
            ctx.playhead_sec,
            &self.config,
            x,
            lane,
        );
        match target {
            HitTarget::BookmarkBody(id) | HitTarget::BookmarkEdge(id, _) => {
                let start = ctx.bookmarks.get(&id)?.start_sec();
                self.selected_bookmark = Some(id);
                Some(TimelineIntent::Seek { time_sec: start })
            }
            HitTarget::EmptyTrack | HitTarget::Playhead => {
                if lane == Lane::Track {
                    self.selected_bookmark = None;
                }
                Some(TimelineIntent::Seek {
                    time_sec: ctx.time_at(x),
                })
            }
            HitTarget::InHandle | HitTarget::OutHandle => None,
        }
    }

    /// Explicit cancel (escape key, pointer lost): back to idle without
    /// emitting anything.
    pub fn cancel(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(target = "drag", mode = ?session.mode, "drag cancelled");
        }
        self.preview = None;
        self.pending = None;
        self.selection.clear();
    }

    /// Host teardown: drops every piece of ephemeral state so nothing leaks
    /// into a remount.
    pub fn teardown(&mut self) {
        self.cancel();
        self.rejection = None;
        self.selected_bookmark = None;
    }

    pub fn mark_in(&mut self, time_sec: f64) {
        if !self.is_dragging() {
            self.selection.set_start(time_sec.max(0.0));
        }
    }

    pub fn mark_out(&mut self, time_sec: f64) {
        if !self.is_dragging() {
            self.selection.set_end(time_sec.max(0.0));
        }
    }

    /// Turns discrete in/out marks into a bookmark immediately.
    pub fn commit_marks(&mut self) -> Option<TimelineIntent> {
        if self.is_dragging() {
            return None;
        }
        self.take_selection_as_range()
    }

    pub fn clear_marks(&mut self) {
        if !self.is_dragging() {
            self.selection.clear();
        }
    }

    pub fn confirm_name(&mut self, label: &str) -> Option<TimelineIntent> {
        let pending = self.pending.take()?;
        self.selection.clear();
        let label = label.trim();
        Some(TimelineIntent::CreateRange {
            start_ms: pending.start_ms,
            end_ms: pending.end_ms,
            label: (!label.is_empty()).then(|| label.to_string()),
        })
    }

    pub fn cancel_name(&mut self) {
        if self.pending.take().is_some() {
            self.selection.clear();
        }
    }

    pub fn delete_selected(&mut self, ctx: &TimelineContext<'_>) -> Option<TimelineIntent> {
        if self.is_dragging() {
            return None;
        }
        let id = self.selected_bookmark.clone()?;
        let Some(bookmark) = ctx.bookmarks.get(&id) else {
            self.selected_bookmark = None;
            return None;
        };
        if !can_mutate(bookmark, &ctx.actor.id, ctx.actor.privileged) {
            self.rejection = Some(rejection(bookmark, Mutation::Delete));
            return None;
        }
        self.selected_bookmark = None;
        Some(TimelineIntent::DeleteBookmark { bookmark_id: id })
    }

    fn take_selection_as_range(&mut self) -> Option<TimelineIntent> {
        let selection = std::mem::take(&mut self.selection);
        if selection.span_sec() <= self.config.min_selection_sec {
            return None;
        }
        let (start_ms, end_ms) = selection_ms(&selection)?;
        Some(TimelineIntent::CreateRange {
            start_ms,
            end_ms,
            label: None,
        })
    }

    /// Bookmark range implied by a pointer at `x` for a bookmark-editing
    /// session. Moves keep the duration and stay inside the timeline; resizes
    /// keep at least `min_bookmark_ms` between the edges.
    ///
    /// The offset is measured in time, so scrolling or zooming during the
    /// drag does not shift the result away from the pointer.
    fn candidate(&self, ctx: &TimelineContext<'_>, session: &DragSession, x: f64) -> (i64, i64) {
        let viewport = ctx.viewport;
        let delta_ms = seconds_to_ms(ctx.time_at(x) - session.anchor.time_sec);
        let min_len = self.config.min_bookmark_ms.max(1);
        // an unknown duration (metadata still loading) leaves the end unbounded
        let limit = match viewport.duration_ms() {
            0 => i64::MAX,
            ms => ms,
        };

        match &session.mode {
            DragMode::BookmarkMove {
                origin_start_ms,
                origin_end_ms,
                ..
            }
            | DragMode::BookmarkResize {
                origin_start_ms,
                origin_end_ms,
                ..
            } if delta_ms == 0 => (*origin_start_ms, *origin_end_ms),
            DragMode::BookmarkMove {
                origin_start_ms,
                origin_end_ms,
                ..
            } => {
                let length = origin_end_ms - origin_start_ms;
                let max_start = limit.saturating_sub(length).max(0);
                let start = origin_start_ms.saturating_add(delta_ms).clamp(0, max_start);
                (start, start + length)
            }
            DragMode::BookmarkResize {
                edge: Edge::Start,
                origin_start_ms,
                origin_end_ms,
                ..
            } => {
                let start = origin_start_ms
                    .saturating_add(delta_ms)
                    .min(origin_end_ms - min_len)
                    .max(0);
                (start, (*origin_end_ms).max(start + min_len))
            }
            DragMode::BookmarkResize {
                edge: Edge::End,
                origin_start_ms,
                origin_end_ms,
                ..
            } => {
                let end = origin_end_ms
                    .saturating_add(delta_ms)
                    .min(limit)
                    .max(origin_start_ms + min_len);
                (*origin_start_ms, end)
            }
            _ => (0, 0),
        }
    }
}

fn mutation_of(mode: &DragMode) -> Mutation {
    match mode {
        DragMode::BookmarkResize {
            edge: Edge::Start, ..
        } => Mutation::ResizeStart,
        DragMode::BookmarkResize { edge: Edge::End, .. } => Mutation::ResizeEnd,
        _ => Mutation::Move,
    }
}

fn seconds_to_ms(seconds: f64) -> i64 {
    let ms = (seconds * 1000.0).round();
    if ms.is_finite() {
        ms as i64
    } else {
        0
    }
}

fn selection_ms(selection: &SelectionRange) -> Option<(i64, i64)> {
    let (start, end) = selection.bounds()?;
    Some((seconds_to_ms(start), seconds_to_ms(end)))
}
