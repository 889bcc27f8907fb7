use serde::{Deserialize, Serialize};

use crate::{Frame, InteractionConfig};

/// Horizontal pixels per frame at zoom 1.0 unless configured otherwise.
pub const DEFAULT_PIXELS_PER_FRAME: f64 = 4.0;

/// Zoom, scroll and container geometry that decide which slice of the video's
/// duration is visible.
///
/// Every derived quantity is finite. Any computation that would produce NaN
/// or infinity (zero frame rate, zero zoom, duration not loaded yet) falls
/// back to 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelineViewport {
    pub zoom: f64,
    pub scroll_offset_px: f64,
    pub container_width_px: f64,
    pub pixels_per_frame: f64,
    pub frame_rate: f64,
    pub duration_sec: f64,
}

impl TimelineViewport {
    pub fn new(duration_sec: f64, frame_rate: f64, container_width_px: f64) -> Self {
        Self {
            zoom: 1.0,
            scroll_offset_px: 0.0,
            container_width_px,
            pixels_per_frame: DEFAULT_PIXELS_PER_FRAME,
            frame_rate,
            duration_sec,
        }
    }

    pub fn with_config(mut self, config: &InteractionConfig) -> Self {
        self.pixels_per_frame = config.pixels_per_frame;
        self
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_scroll(mut self, scroll_offset_px: f64) -> Self {
        self.scroll_offset_px = scroll_offset_px;
        self
    }

    /// Screen pixels per second of video, or 0 when the scale is degenerate.
    pub fn pixels_per_second(&self) -> f64 {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !(valid(self.frame_rate) && valid(self.pixels_per_frame) && valid(self.zoom)) {
            return 0.0;
        }
        finite_or_zero(self.frame_rate * self.pixels_per_frame * self.zoom)
    }

    pub fn time_to_pixel(&self, time_sec: f64) -> f64 {
        let pps = self.pixels_per_second();
        if pps == 0.0 || !time_sec.is_finite() {
            return 0.0;
        }
        finite_or_zero(time_sec * pps - self.scroll_offset_px)
    }

    pub fn pixel_to_time(&self, x: f64) -> f64 {
        let pps = self.pixels_per_second();
        if pps == 0.0 || !x.is_finite() {
            return 0.0;
        }
        finite_or_zero((x + self.scroll_offset_px) / pps)
    }

    /// Converts a pixel distance into seconds, ignoring scroll.
    pub fn pixels_to_seconds(&self, dx: f64) -> f64 {
        let pps = self.pixels_per_second();
        if pps == 0.0 || !dx.is_finite() {
            return 0.0;
        }
        finite_or_zero(dx / pps)
    }

    pub fn duration(&self) -> f64 {
        if self.duration_sec.is_finite() {
            self.duration_sec.max(0.0)
        } else {
            0.0
        }
    }

    pub fn duration_ms(&self) -> i64 {
        (self.duration() * 1000.0).round() as i64
    }

    pub fn container_width(&self) -> f64 {
        if self.container_width_px.is_finite() {
            self.container_width_px.max(0.0)
        } else {
            0.0
        }
    }

    /// Width of the whole duration at the current zoom.
    pub fn content_width_px(&self) -> f64 {
        finite_or_zero(self.duration() * self.pixels_per_second())
    }

    pub fn max_scroll_px(&self) -> f64 {
        (self.content_width_px() - self.container_width()).max(0.0)
    }

    /// Time span covered by the container, clamped to the content.
    pub fn visible_time_range(&self) -> (f64, f64) {
        let duration = self.duration();
        let start = self.pixel_to_time(0.0).clamp(0.0, duration);
        let end = self
            .pixel_to_time(self.container_width())
            .clamp(start, duration);
        (start, end)
    }

    /// Nearest frame index to `time_sec`, never negative.
    pub fn frame_at(&self, time_sec: f64) -> Frame {
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) || !time_sec.is_finite() {
            return 0;
        }
        let frame = (time_sec * self.frame_rate).round();
        if frame.is_finite() {
            (frame as Frame).max(0)
        } else {
            0
        }
    }

    pub fn time_of_frame(&self, frame: Frame) -> f64 {
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return 0.0;
        }
        finite_or_zero(frame as f64 / self.frame_rate)
    }
}

pub(crate) fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn viewport() -> TimelineViewport {
        TimelineViewport::new(120.0, 30.0, 1000.0)
    }

    #[test]
    fn maps_time_with_zoom_and_scroll() {
        let vp = viewport().with_zoom(0.5).with_scroll(30.0);
        // 30 fps * 4 px * 0.5 = 60 px/s
        assert_eq!(vp.pixels_per_second(), 60.0);
        assert_eq!(vp.time_to_pixel(2.0), 90.0);
        assert_eq!(vp.pixel_to_time(90.0), 2.0);
    }

    #[test]
    fn round_trip_within_sub_pixel() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2_000 {
            let vp = viewport()
                .with_zoom(rng.gen_range(0.01..10.0))
                .with_scroll(rng.gen_range(0.0..50_000.0));
            let t = rng.gen_range(0.0..=vp.duration_sec);
            let back = vp.pixel_to_time(vp.time_to_pixel(t));
            // one pixel at the most zoomed-in scale, in seconds
            let tolerance = 1.0 / vp.pixels_per_second();
            assert!((back - t).abs() <= tolerance, "t={t} back={back}");
        }
    }

    #[test]
    fn degenerate_inputs_map_to_zero() {
        let vp = viewport();
        assert_eq!(vp.time_to_pixel(f64::NAN), 0.0);
        assert_eq!(vp.time_to_pixel(f64::INFINITY), 0.0);
        assert_eq!(vp.pixel_to_time(f64::NEG_INFINITY), 0.0);

        for zoom in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let vp = viewport().with_zoom(zoom);
            assert_eq!(vp.time_to_pixel(10.0), 0.0);
            assert_eq!(vp.pixel_to_time(10.0), 0.0);
        }

        let mut vp = viewport();
        vp.frame_rate = 0.0;
        assert_eq!(vp.pixel_to_time(500.0), 0.0);
        assert_eq!(vp.frame_at(3.0), 0);

        let vp = viewport().with_scroll(f64::NAN);
        assert_eq!(vp.time_to_pixel(1.0), 0.0);
    }

    #[test]
    fn visible_range_is_clamped_to_content() {
        let vp = viewport().with_zoom(0.25);
        // 30 px/s, container shows 33.3s
        let (start, end) = vp.visible_time_range();
        assert_eq!(start, 0.0);
        assert!((end - 1000.0 / 30.0).abs() < 1e-9);

        let tail = viewport().with_zoom(0.25).with_scroll(vp.max_scroll_px() + 500.0);
        let (_, end) = tail.visible_time_range();
        assert_eq!(end, 120.0);
    }

    #[test]
    fn frames_round_to_nearest() {
        let vp = viewport();
        assert_eq!(vp.frame_at(1.0), 30);
        assert_eq!(vp.frame_at(1.49 / 30.0), 0);
        assert_eq!(vp.frame_at(-2.0), 0);
        assert_eq!(vp.time_of_frame(90), 3.0);
    }
}
