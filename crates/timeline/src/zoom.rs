use crate::viewport::finite_or_zero;
use crate::{InteractionConfig, TimelineViewport};

/// Smallest zoom ever handed out, even with a zero floor configured.
const ABSOLUTE_MIN_ZOOM: f64 = 1e-6;

/// Interactive zoom range for a viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomBounds {
    /// Whole duration squeezed into `min_zoom_span_px`.
    pub min: f64,
    /// `max_zoom_window_sec` stretched over the full container.
    pub max: f64,
}

impl ZoomBounds {
    pub fn clamp(&self, zoom: f64) -> f64 {
        if zoom.is_finite() {
            zoom.clamp(self.min, self.max)
        } else {
            self.min
        }
    }

    pub fn contains(&self, zoom: f64) -> bool {
        zoom >= self.min && zoom <= self.max
    }
}

/// Zoom and scroll transitions. Each takes a viewport by value and returns
/// the next one; nothing here holds state besides configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZoomController {
    config: InteractionConfig,
}

impl ZoomController {
    pub fn new(config: InteractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    /// Zoom at which the full duration exactly fills the container, floored so
    /// a huge duration or a zero-width container never yields a zero zoom.
    /// With no duration (metadata still loading) the neutral zoom 1.0 is used.
    pub fn fit_zoom(&self, viewport: &TimelineViewport) -> f64 {
        let floor = self.config.fit_zoom_floor.max(ABSOLUTE_MIN_ZOOM);
        let unit = unit_pixels_per_second(viewport);
        let duration = viewport.duration();
        if unit == 0.0 || duration == 0.0 {
            return 1.0_f64.max(floor);
        }
        finite_or_zero(viewport.container_width() / (duration * unit)).max(floor)
    }

    pub fn bounds(&self, viewport: &TimelineViewport) -> ZoomBounds {
        let fit = self.fit_zoom(viewport);
        let floor = self.config.fit_zoom_floor.max(ABSOLUTE_MIN_ZOOM);
        let unit = unit_pixels_per_second(viewport);
        let duration = viewport.duration();

        let raw_min = if unit > 0.0 && duration > 0.0 {
            self.config.min_zoom_span_px / (duration * unit)
        } else {
            fit
        };
        let raw_max = if unit > 0.0 && self.config.max_zoom_window_sec > 0.0 {
            viewport.container_width() / (self.config.max_zoom_window_sec * unit)
        } else {
            fit
        };

        // fit-to-window must always land inside the range
        let min = finite_or(raw_min, fit).max(floor).min(fit);
        let max = finite_or(raw_max, fit).max(fit).max(min);
        ZoomBounds { min, max }
    }

    pub fn set_zoom(&self, viewport: TimelineViewport, zoom: f64) -> TimelineViewport {
        self.zoom_at(viewport, 0.0, zoom / valid_zoom(viewport.zoom))
    }

    pub fn zoom_in(&self, viewport: TimelineViewport) -> TimelineViewport {
        self.zoom_at(viewport, 0.0, self.config.zoom_step)
    }

    pub fn zoom_out(&self, viewport: TimelineViewport) -> TimelineViewport {
        self.zoom_at(viewport, 0.0, 1.0 / self.config.zoom_step)
    }

    /// Multiplies zoom by `factor` while keeping the time under `anchor_px`
    /// fixed on screen.
    pub fn zoom_at(
        &self,
        viewport: TimelineViewport,
        anchor_px: f64,
        factor: f64,
    ) -> TimelineViewport {
        let bounds = self.bounds(&viewport);
        let anchor_px = finite_or_zero(anchor_px);
        let anchor_time = viewport.pixel_to_time(anchor_px);

        let mut next = viewport;
        next.zoom = bounds.clamp(valid_zoom(viewport.zoom) * factor);
        let scroll = anchor_time * next.pixels_per_second() - anchor_px;
        self.set_scroll(next, scroll)
    }

    pub fn fit_to_window(&self, viewport: TimelineViewport) -> TimelineViewport {
        let mut next = viewport;
        next.zoom = self.fit_zoom(&viewport);
        next.scroll_offset_px = 0.0;
        next
    }

    pub fn set_scroll(&self, viewport: TimelineViewport, scroll_px: f64) -> TimelineViewport {
        let mut next = viewport;
        next.scroll_offset_px = finite_or_zero(scroll_px).clamp(0.0, viewport.max_scroll_px());
        next
    }

    pub fn scroll_by(&self, viewport: TimelineViewport, dx: f64) -> TimelineViewport {
        self.set_scroll(viewport, viewport.scroll_offset_px + finite_or_zero(dx))
    }

    /// Scrolls the least amount that brings `time_sec` into view.
    pub fn reveal_time(&self, viewport: TimelineViewport, time_sec: f64) -> TimelineViewport {
        let x = viewport.time_to_pixel(time_sec);
        let width = viewport.container_width();
        if x < 0.0 {
            self.scroll_by(viewport, x)
        } else if x > width {
            self.scroll_by(viewport, x - width)
        } else {
            viewport
        }
    }
}

fn unit_pixels_per_second(viewport: &TimelineViewport) -> f64 {
    viewport.with_zoom(1.0).pixels_per_second()
}

fn valid_zoom(zoom: f64) -> f64 {
    if zoom.is_finite() && zoom > 0.0 {
        zoom
    } else {
        1.0
    }
}

fn finite_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        fallback
    }
}
