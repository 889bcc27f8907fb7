use std::sync::Arc;

use anyhow::Result;
use collaboration::{BookmarkStore, CollaborationError, DispatchOutcome, InMemoryBackend};
use serde::{Deserialize, Serialize};
use timeline::{
    Actor, BookmarkId, InteractionConfig, Lane, Modifiers, TimelineIntent, TimelineInteraction,
    TimelineViewport, UserId, ZoomController,
};
use tracing::debug;

fn track() -> Lane {
    Lane::Track
}

/// One scripted input event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Down {
        x: f64,
        #[serde(default = "track")]
        lane: Lane,
        #[serde(default)]
        shift: bool,
    },
    Move {
        x: f64,
    },
    Up {
        x: f64,
    },
    Click {
        x: f64,
        #[serde(default = "track")]
        lane: Lane,
    },
    Cancel,
    Name {
        label: String,
    },
    CancelName,
    MarkIn {
        t: f64,
    },
    MarkOut {
        t: f64,
    },
    CommitMarks,
    ClearMarks,
    Delete,
    ZoomIn,
    ZoomOut,
    Fit,
    ZoomAt {
        x: f64,
        factor: f64,
    },
    Scroll {
        dx: f64,
    },
    /// Another collaborator takes the lock on `id`.
    RemoteLock {
        id: BookmarkId,
        user: UserId,
        name: String,
    },
    /// The backend refuses the next write with `message`.
    FailNext {
        message: String,
    },
}

/// What one step did, printed as a JSON line.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub step: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<TimelineIntent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<DispatchOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refused_by: Option<String>,
}

/// Drives an interaction and a bookmark store from a script, the way a UI
/// host would from real pointer events.
pub struct Replay {
    viewport: TimelineViewport,
    zoom: ZoomController,
    interaction: TimelineInteraction,
    backend: Arc<InMemoryBackend>,
    store: BookmarkStore,
    playhead_sec: f64,
}

impl Replay {
    pub async fn new(
        backend: Arc<InMemoryBackend>,
        actor: Actor,
        viewport: TimelineViewport,
        config: InteractionConfig,
    ) -> Result<Self> {
        let mut store = BookmarkStore::new(backend.clone(), actor);
        store.refresh().await?;
        Ok(Self {
            viewport: viewport.with_config(&config),
            zoom: ZoomController::new(config),
            interaction: TimelineInteraction::new(config),
            backend,
            store,
            playhead_sec: 0.0,
        })
    }

    pub fn store(&self) -> &BookmarkStore {
        &self.store
    }

    pub fn viewport(&self) -> &TimelineViewport {
        &self.viewport
    }

    pub fn playhead_sec(&self) -> f64 {
        self.playhead_sec
    }

    pub async fn run(&mut self, steps: &[Step]) -> Result<Vec<StepRecord>> {
        let mut records = Vec::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            records.push(self.apply(index, step).await?);
        }
        Ok(records)
    }

    async fn apply(&mut self, index: usize, step: &Step) -> Result<StepRecord> {
        debug!(target = "drag", step = index, ?step, "replay step");
        let intent = {
            let ctx = self.store.context(&self.viewport, self.playhead_sec);
            let ti = &mut self.interaction;
            match step {
                Step::Down { x, lane, shift } => {
                    ti.pointer_down(&ctx, *x, *lane, Modifiers { extend: *shift })
                }
                Step::Move { x } => ti.pointer_move(&ctx, *x),
                Step::Up { x } => ti.pointer_up(&ctx, *x),
                Step::Click { x, lane } => ti.click(&ctx, *x, *lane),
                Step::Cancel => {
                    ti.cancel();
                    None
                }
                Step::Name { label } => ti.confirm_name(label),
                Step::CancelName => {
                    ti.cancel_name();
                    None
                }
                Step::MarkIn { t } => {
                    ti.mark_in(*t);
                    None
                }
                Step::MarkOut { t } => {
                    ti.mark_out(*t);
                    None
                }
                Step::CommitMarks => ti.commit_marks(),
                Step::ClearMarks => {
                    ti.clear_marks();
                    None
                }
                Step::Delete => ti.delete_selected(&ctx),
                _ => None,
            }
        };

        match step {
            Step::ZoomIn => self.viewport = self.zoom.zoom_in(self.viewport),
            Step::ZoomOut => self.viewport = self.zoom.zoom_out(self.viewport),
            Step::Fit => self.viewport = self.zoom.fit_to_window(self.viewport),
            Step::ZoomAt { x, factor } => {
                self.viewport = self.zoom.zoom_at(self.viewport, *x, *factor)
            }
            Step::Scroll { dx } => self.viewport = self.zoom.scroll_by(self.viewport, *dx),
            Step::RemoteLock { id, user, name } => {
                let holder = Actor::new(user.clone(), name.clone());
                let locked = self.backend.force_lock(id, Some((&holder, name.as_str())))?;
                self.store.apply_remote(locked);
            }
            Step::FailNext { message } => self
                .backend
                .fail_next(CollaborationError::NetworkError(message.clone())),
            _ => {}
        }

        let mut record = StepRecord {
            step: index,
            intent: intent.clone(),
            outcome: None,
            error: None,
            refused_by: None,
        };
        if let Some(intent) = intent {
            match self.store.dispatch(intent).await {
                Ok(outcome) => {
                    if let DispatchOutcome::Seek { time_sec } = outcome {
                        self.playhead_sec = time_sec;
                        self.viewport = self.zoom.reveal_time(self.viewport, time_sec);
                    }
                    record.outcome = Some(outcome);
                }
                Err(err) => record.error = Some(err.to_string()),
            }
        }
        if matches!(step, Step::Down { .. } | Step::Up { .. } | Step::Delete) {
            record.refused_by = self
                .interaction
                .last_rejection()
                .map(|r| r.holder.clone());
        }
        Ok(record)
    }
}
