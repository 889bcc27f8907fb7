use std::collections::HashMap;
use std::sync::Arc;

use image::RgbaImage;
use parking_lot::Mutex;
use timeline::{tile_frames, Frame, FrameLookup, TimelineViewport};

/// Captured stills by frame index. Entries are only ever added; a frame that
/// failed to capture simply has no entry.
#[derive(Debug, Default, Clone)]
pub struct FrameCache {
    frames: HashMap<Frame, Arc<RgbaImage>>,
}

/// Cache handle shared by the scheduler and the tile painter.
pub type SharedFrameCache = Arc<Mutex<FrameCache>>;

impl FrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedFrameCache {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn contains(&self, frame: Frame) -> bool {
        self.frames.contains_key(&frame)
    }

    pub fn get(&self, frame: Frame) -> Option<Arc<RgbaImage>> {
        self.frames.get(&frame).cloned()
    }

    pub fn insert(&mut self, frame: Frame, still: RgbaImage) -> Arc<RgbaImage> {
        let still = Arc::new(still);
        self.frames.insert(frame, still.clone());
        still
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Cached frame indices, ascending.
    pub fn frames(&self) -> Vec<Frame> {
        let mut frames: Vec<Frame> = self.frames.keys().copied().collect();
        frames.sort_unstable();
        frames
    }

    /// Drops everything, e.g. when the video changes.
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl FrameLookup for FrameCache {
    fn has_frame(&self, frame: Frame) -> bool {
        self.contains(frame)
    }
}

/// Frames of `wanted` that have no still yet, order preserved.
pub fn missing_frames(wanted: &[Frame], cache: &FrameCache) -> Vec<Frame> {
    wanted
        .iter()
        .copied()
        .filter(|frame| !cache.contains(*frame))
        .collect()
}

/// What the visible tiles still lack. Empty means there is nothing to do.
pub fn needed_frames(viewport: &TimelineViewport, cache: &FrameCache) -> Vec<Frame> {
    missing_frames(&tile_frames(viewport), cache)
}
