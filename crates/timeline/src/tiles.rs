use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::{Frame, TimelineViewport};

/// On-screen width a tile aims for before snapping.
pub const TILE_TARGET_WIDTH_PX: f64 = 96.0;

/// Allowed seconds-per-tile, so tile boundaries land on round timestamps.
pub const TILE_STEPS_SEC: [f64; 8] = [0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0];

/// Answers whether a locally captured still exists for a frame.
pub trait FrameLookup {
    fn has_frame(&self, frame: Frame) -> bool;
}

impl FrameLookup for HashSet<Frame> {
    fn has_frame(&self, frame: Frame) -> bool {
        self.contains(&frame)
    }
}

impl FrameLookup for BTreeSet<Frame> {
    fn has_frame(&self, frame: Frame) -> bool {
        self.contains(&frame)
    }
}

/// Server-rendered per-second previews. `{second}` in the template is replaced
/// with the whole second being requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailEndpoint {
    pub template: String,
}

impl ThumbnailEndpoint {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn url_for_second(&self, second: u64) -> Option<String> {
        if self.template.is_empty() {
            return None;
        }
        Some(self.template.replace("{second}", &second.to_string()))
    }
}

/// Where a tile's image comes from, best first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum TileSource {
    Captured { frame: Frame },
    Remote { url: String },
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThumbnailTile {
    pub index: i64,
    pub time_sec: f64,
    pub frame: Frame,
    pub x_px: f64,
    pub width_px: f64,
    pub source: TileSource,
}

/// Snaps the seconds covered by a [`TILE_TARGET_WIDTH_PX`] tile to the
/// nearest allowed step.
pub fn tile_step_sec(pixels_per_second: f64) -> f64 {
    let last = TILE_STEPS_SEC[TILE_STEPS_SEC.len() - 1];
    if !(pixels_per_second.is_finite() && pixels_per_second > 0.0) {
        return last;
    }
    let raw = TILE_TARGET_WIDTH_PX / pixels_per_second;
    TILE_STEPS_SEC
        .iter()
        .copied()
        .min_by(|a, b| (a - raw).abs().total_cmp(&(b - raw).abs()))
        .unwrap_or(last)
}

/// `(index, start time)` of every tile that starts inside the content and
/// overlaps the visible window.
pub fn tile_slots(viewport: &TimelineViewport) -> Vec<(i64, f64)> {
    let pps = viewport.pixels_per_second();
    let duration = viewport.duration();
    if pps == 0.0 || duration == 0.0 {
        return Vec::new();
    }
    let step = tile_step_sec(pps);
    let (start, end) = viewport.visible_time_range();
    if end <= start {
        return Vec::new();
    }

    let first = (start / step).floor() as i64;
    let last = ((end / step).ceil() as i64 - 1).max(first);
    (first..=last)
        .map(|index| (index, index as f64 * step))
        .filter(|(_, time)| *time < duration)
        .collect()
}

/// Frame indices the visible tiles want, ascending and deduplicated.
pub fn tile_frames(viewport: &TimelineViewport) -> Vec<Frame> {
    let frames: BTreeSet<Frame> = tile_slots(viewport)
        .into_iter()
        .map(|(_, time)| viewport.frame_at(time))
        .collect();
    frames.into_iter().collect()
}

/// Lays out the visible ribbon, resolving each tile through the three-tier
/// fallback: captured frame, server URL, placeholder.
pub fn thumbnail_tiles(
    viewport: &TimelineViewport,
    frames: &dyn FrameLookup,
    endpoint: Option<&ThumbnailEndpoint>,
) -> Vec<ThumbnailTile> {
    let step = tile_step_sec(viewport.pixels_per_second());
    let width_px = step * viewport.pixels_per_second();
    tile_slots(viewport)
        .into_iter()
        .map(|(index, time_sec)| {
            let frame = viewport.frame_at(time_sec);
            let source = if frames.has_frame(frame) {
                TileSource::Captured { frame }
            } else if let Some(url) =
                endpoint.and_then(|e| e.url_for_second(time_sec.floor() as u64))
            {
                TileSource::Remote { url }
            } else {
                TileSource::Placeholder
            };
            ThumbnailTile {
                index,
                time_sec,
                frame,
                x_px: viewport.time_to_pixel(time_sec),
                width_px,
                source,
            }
        })
        .collect()
}
