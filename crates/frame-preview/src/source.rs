use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use image::{Rgba, RgbaImage};
use parking_lot::Mutex;

use crate::{PreviewError, Result};

/// The player the user is watching. Seeking it moves what they see, so
/// anything that seeks for its own purposes has to put it back.
#[async_trait::async_trait]
pub trait VideoSource: Send + Sync {
    fn duration_sec(&self) -> f64;

    fn position_sec(&self) -> f64;

    /// Metadata loaded and seekable.
    fn is_ready(&self) -> bool;

    /// Resolves once the decoder has the frame at `time_sec` on screen.
    async fn seek(&self, time_sec: f64) -> Result<()>;

    /// Grabs the frame currently on screen, scaled to `width`x`height`.
    async fn capture_still(&self, width: u32, height: u32) -> Result<RgbaImage>;
}

/// Polls until `source` is ready or `timeout` elapses. Returns immediately,
/// without suspending, when the source is already ready.
pub async fn wait_until_ready(source: &dyn VideoSource, timeout: Duration, poll: Duration) -> bool {
    if source.is_ready() {
        return true;
    }
    tokio::time::timeout(timeout, async {
        loop {
            tokio::time::sleep(poll).await;
            if source.is_ready() {
                break;
            }
        }
    })
    .await
    .is_ok()
}

/// Source that paints each still from its timestamp, for headless hosts and
/// tests. Seeks to stalled timestamps never resolve.
#[derive(Debug)]
pub struct SyntheticSource {
    duration_sec: f64,
    ready: AtomicBool,
    position: Mutex<f64>,
    seek_latency: Duration,
    stalled: Mutex<Vec<f64>>,
    broken: Mutex<Vec<f64>>,
    seeks: Mutex<Vec<f64>>,
    captures: Mutex<Vec<f64>>,
}

impl SyntheticSource {
    pub fn new(duration_sec: f64) -> Self {
        Self {
            duration_sec,
            ready: AtomicBool::new(true),
            position: Mutex::new(0.0),
            seek_latency: Duration::ZERO,
            stalled: Mutex::new(Vec::new()),
            broken: Mutex::new(Vec::new()),
            seeks: Mutex::new(Vec::new()),
            captures: Mutex::new(Vec::new()),
        }
    }

    pub fn with_seek_latency(mut self, latency: Duration) -> Self {
        self.seek_latency = latency;
        self
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn set_position(&self, time_sec: f64) {
        *self.position.lock() = time_sec;
    }

    /// Seeks to `time_sec` will hang.
    pub fn stall_at(&self, time_sec: f64) {
        self.stalled.lock().push(time_sec);
    }

    /// Captures at `time_sec` will fail.
    pub fn break_at(&self, time_sec: f64) {
        self.broken.lock().push(time_sec);
    }

    /// Every seek target requested so far, in order.
    pub fn seek_log(&self) -> Vec<f64> {
        self.seeks.lock().clone()
    }

    /// Positions at which stills were captured.
    pub fn capture_log(&self) -> Vec<f64> {
        self.captures.lock().clone()
    }

    fn matches(list: &Mutex<Vec<f64>>, time_sec: f64) -> bool {
        list.lock().iter().any(|t| (t - time_sec).abs() < 1e-6)
    }
}

#[async_trait::async_trait]
impl VideoSource for SyntheticSource {
    fn duration_sec(&self) -> f64 {
        self.duration_sec
    }

    fn position_sec(&self) -> f64 {
        *self.position.lock()
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn seek(&self, time_sec: f64) -> Result<()> {
        self.seeks.lock().push(time_sec);
        if !time_sec.is_finite() || time_sec < 0.0 {
            return Err(PreviewError::Seek(format!("invalid position {time_sec}")));
        }
        if Self::matches(&self.stalled, time_sec) {
            std::future::pending::<()>().await;
        }
        if !self.seek_latency.is_zero() {
            tokio::time::sleep(self.seek_latency).await;
        }
        *self.position.lock() = time_sec.min(self.duration_sec);
        Ok(())
    }

    async fn capture_still(&self, width: u32, height: u32) -> Result<RgbaImage> {
        let position = self.position_sec();
        if Self::matches(&self.broken, position) {
            return Err(PreviewError::Capture(format!("decoder error at {position}s")));
        }
        self.captures.lock().push(position);

        let progress = if self.duration_sec > 0.0 {
            (position / self.duration_sec).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let shade = (progress * 255.0) as u8;
        Ok(RgbaImage::from_fn(width, height, |x, _| {
            let ramp = (x * 255 / width.max(1)) as u8;
            Rgba([shade, ramp, 255 - shade, 255])
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn ready_wait_polls_until_ready() {
        let source = Arc::new(SyntheticSource::new(10.0));
        source.set_ready(false);
        let flip = source.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            flip.set_ready(true);
        });
        let ready = wait_until_ready(
            source.as_ref(),
            Duration::from_secs(10),
            Duration::from_millis(50),
        )
        .await;
        assert!(ready);
    }

    #[tokio::test(start_paused = true)]
    async fn ready_wait_gives_up() {
        let source = SyntheticSource::new(10.0);
        source.set_ready(false);
        let ready =
            wait_until_ready(&source, Duration::from_secs(10), Duration::from_millis(50)).await;
        assert!(!ready);
    }

    #[tokio::test]
    async fn paints_requested_size() {
        let source = SyntheticSource::new(10.0);
        source.seek(5.0).await.unwrap();
        let still = source.capture_still(80, 45).await.unwrap();
        assert_eq!(still.dimensions(), (80, 45));
        assert_eq!(source.capture_log(), vec![5.0]);

        source.break_at(5.0);
        assert!(source.capture_still(80, 45).await.is_err());
    }
}
