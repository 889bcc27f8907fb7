use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::Serialize;
use timeline::{Frame, TimelineViewport};
use tracing::{debug, info, warn};

use crate::{
    needed_frames, wait_until_ready, PreviewConfig, PreviewError, Result, SharedFrameCache,
    VideoSource,
};

/// Outcome of one scheduling run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CaptureReport {
    /// Frames the run set out to capture.
    pub requested: Vec<Frame>,
    pub captured: Vec<Frame>,
    pub timed_out: Vec<Frame>,
    pub failed: Vec<Frame>,
    pub cancelled: bool,
    /// The source never became ready; nothing was attempted.
    pub source_not_ready: bool,
}

impl CaptureReport {
    pub fn is_noop(&self) -> bool {
        self.requested.is_empty()
    }
}

/// Notifications for whoever paints the tiles.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewEvent {
    FrameCaptured { frame: Frame },
    RunFinished(CaptureReport),
}

pub struct FrameScheduler {
    source: Arc<dyn VideoSource>,
    cache: SharedFrameCache,
    config: PreviewConfig,
    events: Option<Sender<PreviewEvent>>,
}

impl FrameScheduler {
    pub fn new(source: Arc<dyn VideoSource>, cache: SharedFrameCache, config: PreviewConfig) -> Self {
        Self {
            source,
            cache,
            config,
            events: None,
        }
    }

    pub fn with_events(mut self, events: Sender<PreviewEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    pub fn cache(&self) -> &SharedFrameCache {
        &self.cache
    }

    /// Captures whatever the visible tiles of `viewport` lack. Running it
    /// again for an unchanged viewport does nothing.
    pub async fn run(&self, viewport: &TimelineViewport, cancel: &AtomicBool) -> CaptureReport {
        let needed = needed_frames(viewport, &self.cache.lock());
        self.capture_frames(&needed, viewport.frame_rate, cancel).await
    }

    pub async fn capture_frames(
        &self,
        frames: &[Frame],
        frame_rate: f64,
        cancel: &AtomicBool,
    ) -> CaptureReport {
        let mut report = CaptureReport {
            requested: frames.to_vec(),
            ..CaptureReport::default()
        };
        if frames.is_empty() {
            return report;
        }
        if !(frame_rate.is_finite() && frame_rate > 0.0) {
            warn!(target = "preview", frame_rate, "capture skipped: no usable frame rate");
            report.failed = frames.to_vec();
            return self.finish(report);
        }

        let ready = wait_until_ready(
            self.source.as_ref(),
            self.config.ready_timeout(),
            self.config.ready_poll(),
        )
        .await;
        if !ready {
            let err = PreviewError::NotReady(self.config.ready_timeout());
            warn!(target = "preview", error = %err, frames = frames.len(), "capture abandoned");
            report.source_not_ready = true;
            return self.finish(report);
        }

        let original = self.source.position_sec();
        debug!(
            target = "preview",
            frames = frames.len(),
            batch = self.config.batch_size(),
            position = original,
            "capture run started"
        );

        'batches: for batch in frames.chunks(self.config.batch_size()) {
            for &frame in batch {
                if cancel.load(Ordering::Relaxed) {
                    report.cancelled = true;
                    break 'batches;
                }
                if self.cache.lock().contains(frame) {
                    continue;
                }
                match self.capture_one(frame, frame_rate).await {
                    Ok(still) => {
                        self.cache.lock().insert(frame, still);
                        report.captured.push(frame);
                        if let Some(tx) = &self.events {
                            let _ = tx.send(PreviewEvent::FrameCaptured { frame });
                        }
                    }
                    Err(err @ PreviewError::SeekTimeout { .. }) => {
                        warn!(target = "preview", frame, error = %err, "frame skipped");
                        report.timed_out.push(frame);
                    }
                    Err(err) => {
                        warn!(target = "preview", frame, error = %err, "frame skipped");
                        report.failed.push(frame);
                    }
                }
            }
            tokio::task::yield_now().await;
        }

        self.restore_position(original).await;
        self.finish(report)
    }

    async fn capture_one(&self, frame: Frame, frame_rate: f64) -> Result<RgbaImage> {
        let time_sec = frame as f64 / frame_rate;
        let timeout = self.config.seek_timeout();
        match tokio::time::timeout(timeout, self.source.seek(time_sec)).await {
            Err(_) => {
                return Err(PreviewError::SeekTimeout {
                    frame,
                    after: timeout,
                })
            }
            Ok(result) => result?,
        }

        let (width, height) = (self.config.still_width, self.config.still_height);
        let still = self.source.capture_still(width, height).await?;
        if still.dimensions() == (width, height) {
            Ok(still)
        } else {
            Ok(imageops::resize(&still, width, height, FilterType::Triangle))
        }
    }

    async fn restore_position(&self, original: f64) {
        let timeout = self.config.seek_timeout();
        match tokio::time::timeout(timeout, self.source.seek(original)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(target = "preview", position = original, error = %err, "failed to restore playback position")
            }
            Err(_) => {
                warn!(target = "preview", position = original, "restoring playback position timed out")
            }
        }
    }

    fn finish(&self, report: CaptureReport) -> CaptureReport {
        info!(
            target = "preview",
            requested = report.requested.len(),
            captured = report.captured.len(),
            timed_out = report.timed_out.len(),
            failed = report.failed.len(),
            cancelled = report.cancelled,
            "capture run finished"
        );
        if let Some(tx) = &self.events {
            let _ = tx.send(PreviewEvent::RunFinished(report.clone()));
        }
        report
    }
}
