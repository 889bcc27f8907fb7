/// Capture runs against a synthetic source on tokio's paused clock.
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use frame_preview::*;
use image::RgbaImage;
use timeline::{thumbnail_tiles, ThumbnailEndpoint, TileSource, TimelineViewport};

/// 96 px/s at 30 fps: one tile per second.
fn viewport(duration: f64, width: f64) -> TimelineViewport {
    TimelineViewport::new(duration, 30.0, width).with_zoom(0.8)
}

fn scheduler(source: &Arc<SyntheticSource>, cache: &SharedFrameCache) -> FrameScheduler {
    FrameScheduler::new(source.clone(), cache.clone(), PreviewConfig::default())
}

#[tokio::test(start_paused = true)]
async fn test_cached_frames_are_not_recaptured() {
    let source = Arc::new(SyntheticSource::new(120.0));
    let cache = FrameCache::shared();
    cache.lock().insert(30, RgbaImage::new(80, 45));
    let vp = viewport(120.0, 288.0);

    let report = scheduler(&source, &cache)
        .run(&vp, &AtomicBool::new(false))
        .await;
    assert_eq!(report.requested, vec![0, 60]);
    assert_eq!(report.captured, vec![0, 60]);
    assert_eq!(source.capture_log(), vec![0.0, 2.0]);
    assert_eq!(cache.lock().frames(), vec![0, 30, 60]);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_frame_falls_back_to_server_tile() {
    let source = Arc::new(SyntheticSource::new(120.0));
    source.stall_at(3.0);
    let cache = FrameCache::shared();
    let vp = viewport(120.0, 384.0);

    let report = scheduler(&source, &cache)
        .run(&vp, &AtomicBool::new(false))
        .await;
    assert_eq!(report.captured, vec![0, 30, 60]);
    assert_eq!(report.timed_out, vec![90]);
    assert!(!cache.lock().contains(90));

    let endpoint = ThumbnailEndpoint::new("https://cdn.example/v/42/{second}.jpg");
    let tiles = thumbnail_tiles(&vp, &*cache.lock(), Some(&endpoint));
    assert_eq!(tiles[0].source, TileSource::Captured { frame: 0 });
    assert_eq!(
        tiles[3].source,
        TileSource::Remote {
            url: "https://cdn.example/v/42/3.jpg".to_string()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_source_that_never_loads_is_left_alone() {
    let source = Arc::new(SyntheticSource::new(120.0));
    source.set_ready(false);
    let cache = FrameCache::shared();

    let started = tokio::time::Instant::now();
    let report = scheduler(&source, &cache)
        .run(&viewport(120.0, 288.0), &AtomicBool::new(false))
        .await;
    assert!(report.source_not_ready);
    assert!(report.captured.is_empty());
    assert!(source.seek_log().is_empty());
    assert!(cache.lock().is_empty());
    assert!(started.elapsed() >= Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_playback_position_is_restored() {
    let source = Arc::new(SyntheticSource::new(120.0).with_seek_latency(Duration::from_millis(30)));
    source.set_position(47.5);
    let cache = FrameCache::shared();

    let report = scheduler(&source, &cache)
        .run(&viewport(120.0, 288.0), &AtomicBool::new(false))
        .await;
    assert_eq!(report.captured.len(), 3);
    assert_eq!(source.position_sec(), 47.5);
    assert_eq!(source.seek_log().last(), Some(&47.5));
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_viewport_is_a_noop() {
    let source = Arc::new(SyntheticSource::new(120.0));
    let cache = FrameCache::shared();
    let sched = scheduler(&source, &cache);
    let vp = viewport(120.0, 288.0);

    sched.run(&vp, &AtomicBool::new(false)).await;
    let seeks = source.seek_log().len();
    let again = sched.run(&vp, &AtomicBool::new(false)).await;
    assert!(again.is_noop());
    assert_eq!(source.seek_log().len(), seeks);
}

#[tokio::test(start_paused = true)]
async fn test_batches_yield_to_other_tasks() {
    let source = Arc::new(SyntheticSource::new(120.0));
    let cache = FrameCache::shared();
    let sched = scheduler(&source, &cache);
    let frames: Vec<_> = (0..12).map(|s| s * 30).collect();

    let ticks = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = ticks.clone();
    let ui = tokio::spawn(async move {
        loop {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            tokio::task::yield_now().await;
        }
    });

    let report = sched.capture_frames(&frames, 30.0, &AtomicBool::new(false)).await;
    ui.abort();
    assert_eq!(report.captured.len(), 12);
    assert!(ticks.load(std::sync::atomic::Ordering::SeqCst) > 0);
}

#[tokio::test(start_paused = true)]
async fn test_events_reach_tile_consumer() {
    let source = Arc::new(SyntheticSource::new(120.0));
    let cache = FrameCache::shared();
    let (tx, rx) = crossbeam_channel::unbounded();
    let sched = scheduler(&source, &cache).with_events(tx);

    sched
        .run(&viewport(120.0, 288.0), &AtomicBool::new(false))
        .await;
    let events: Vec<PreviewEvent> = rx.try_iter().collect();
    assert_eq!(
        &events[..3],
        &[
            PreviewEvent::FrameCaptured { frame: 0 },
            PreviewEvent::FrameCaptured { frame: 30 },
            PreviewEvent::FrameCaptured { frame: 60 },
        ]
    );
    assert!(matches!(events.last(), Some(PreviewEvent::RunFinished(r)) if r.captured.len() == 3));
}

#[tokio::test(start_paused = true)]
async fn test_driver_cancels_on_drag_and_resumes() {
    let source = Arc::new(SyntheticSource::new(120.0).with_seek_latency(Duration::from_millis(100)));
    source.set_position(10.0);
    let cache = FrameCache::shared();
    let sched = Arc::new(scheduler(&source, &cache));
    let driver = PreviewDriver::spawn(sched);

    driver.viewport_changed(viewport(120.0, 288.0));
    // debounce elapses at 1000ms, first seek lands at 1100ms
    tokio::time::sleep(Duration::from_millis(1150)).await;
    driver.set_dragging(true);
    tokio::time::sleep(Duration::from_millis(500)).await;
    let captured_during_drag = cache.lock().len();
    assert!(captured_during_drag < 3);
    assert_eq!(source.position_sec(), 10.0);

    driver.set_dragging(false);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(cache.lock().len(), 3);
    assert_eq!(source.position_sec(), 10.0);
    driver.shutdown().await;
}
