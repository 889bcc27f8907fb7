use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use timeline::TimelineViewport;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use crate::FrameScheduler;

/// Runs the scheduler in the background once the viewport has been quiet for
/// the debounce period, and never while the user is dragging.
///
/// A newer viewport or the start of a drag cancels the run in flight. The
/// cancelled run first lets its current seek finish (bounded by the seek
/// timeout), then seeks back to the position it found, and only then sends
/// [`PreviewEvent::RunFinished`](crate::PreviewEvent). Nothing seeks the
/// source after that event until the drag ends, so a host that scrubs the
/// same source should reapply its latest scrub position once it sees the
/// event.
pub struct PreviewDriver {
    viewports: watch::Sender<Option<TimelineViewport>>,
    dragging: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PreviewDriver {
    /// Must be called from within a tokio runtime.
    pub fn spawn(scheduler: Arc<FrameScheduler>) -> Self {
        let debounce = scheduler.config().debounce();
        let (viewports, viewport_rx) = watch::channel(None);
        let (dragging, drag_rx) = watch::channel(false);
        let task = tokio::spawn(drive(scheduler, viewport_rx, drag_rx, debounce));
        Self {
            viewports,
            dragging,
            task,
        }
    }

    pub fn viewport_changed(&self, viewport: TimelineViewport) {
        self.viewports.send_replace(Some(viewport));
    }

    pub fn set_dragging(&self, dragging: bool) {
        self.dragging.send_if_modified(|current| {
            let changed = *current != dragging;
            *current = dragging;
            changed
        });
    }

    /// Stops accepting changes and waits for any run in flight to wind down.
    pub async fn shutdown(self) {
        let Self {
            viewports,
            dragging,
            task,
        } = self;
        drop(viewports);
        drop(dragging);
        let _ = task.await;
    }
}

async fn drive(
    scheduler: Arc<FrameScheduler>,
    mut viewports: watch::Receiver<Option<TimelineViewport>>,
    mut dragging: watch::Receiver<bool>,
    debounce: Duration,
) {
    let mut deadline: Option<Instant> = None;
    loop {
        let is_dragging = *dragging.borrow();
        tokio::select! {
            changed = viewports.changed() => {
                if changed.is_err() {
                    break;
                }
                deadline = Some(Instant::now() + debounce);
            }
            changed = dragging.changed() => {
                if changed.is_err() {
                    break;
                }
                // the quiet period restarts when a drag ends
                if !*dragging.borrow() && deadline.is_some() {
                    deadline = Some(Instant::now() + debounce);
                }
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() && !is_dragging => {
                deadline = None;
                let latest = *viewports.borrow_and_update();
                let Some(viewport) = latest else {
                    continue;
                };

                let cancel = AtomicBool::new(false);
                let run = scheduler.run(&viewport, &cancel);
                tokio::pin!(run);
                let mut closed = false;
                let report = loop {
                    if closed {
                        break (&mut run).await;
                    }
                    tokio::select! {
                        report = &mut run => break report,
                        changed = viewports.changed() => {
                            cancel.store(true, Ordering::Relaxed);
                            match changed {
                                Ok(()) => deadline = Some(Instant::now() + debounce),
                                Err(_) => closed = true,
                            }
                        }
                        changed = dragging.changed() => {
                            match changed {
                                Ok(()) if *dragging.borrow() => {
                                    cancel.store(true, Ordering::Relaxed);
                                    deadline = Some(Instant::now() + debounce);
                                }
                                Ok(()) => {}
                                Err(_) => {
                                    cancel.store(true, Ordering::Relaxed);
                                    closed = true;
                                }
                            }
                        }
                    }
                };
                if report.cancelled {
                    debug!(target = "preview", "capture run superseded");
                }
                if closed {
                    break;
                }
            }
        }
    }
}
