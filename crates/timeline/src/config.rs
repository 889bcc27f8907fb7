use serde::{Deserialize, Serialize};

/// Tunables for mapping, zoom and gesture arbitration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Horizontal pixels one frame occupies at zoom 1.0.
    pub pixels_per_frame: f64,
    /// Shortest bookmark a resize may produce.
    pub min_bookmark_ms: i64,
    /// Selections at or below this span are treated as accidental clicks.
    pub min_selection_sec: f64,
    pub zoom_step: f64,
    /// Lower bound applied to the fit-to-window zoom.
    pub fit_zoom_floor: f64,
    /// Width the whole duration occupies at maximum zoom-out.
    pub min_zoom_span_px: f64,
    /// Seconds that fill the container at maximum zoom-in.
    pub max_zoom_window_sec: f64,
    pub playhead_hit_px: f64,
    pub edge_handle_px: f64,
    pub selection_handle_px: f64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            pixels_per_frame: 4.0,
            min_bookmark_ms: 100,
            min_selection_sec: 0.1,
            zoom_step: 1.5,
            fit_zoom_floor: 0.01,
            min_zoom_span_px: 100.0,
            max_zoom_window_sec: 10.0,
            playhead_hit_px: 6.0,
            edge_handle_px: 6.0,
            selection_handle_px: 6.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: InteractionConfig =
            serde_json::from_str(r#"{ "min_bookmark_ms": 250 }"#).unwrap();
        assert_eq!(cfg.min_bookmark_ms, 250);
        assert_eq!(cfg.pixels_per_frame, 4.0);
        assert_eq!(cfg.zoom_step, 1.5);
    }
}
