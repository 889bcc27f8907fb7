use serde::Serialize;

use crate::{format_timecode, TimelineViewport};

/// Major tick intervals, coarsest first.
pub const RULER_LADDER_SEC: [f64; 10] = [600.0, 300.0, 120.0, 60.0, 30.0, 10.0, 5.0, 2.0, 1.0, 0.5];

/// Closest two labels may sit on screen.
pub const MIN_LABEL_SPACING_PX: f64 = 80.0;

const MAX_TICKS: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickKind {
    Major,
    Minor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RulerTick {
    pub time_sec: f64,
    pub x_px: f64,
    pub kind: TickKind,
    pub label: Option<String>,
}

/// Finest ladder rung whose labels stay at least [`MIN_LABEL_SPACING_PX`]
/// apart at `pixels_per_second`. Falls back to the coarsest rung.
pub fn ruler_interval(pixels_per_second: f64) -> f64 {
    RULER_LADDER_SEC
        .iter()
        .rev()
        .copied()
        .find(|interval| interval * pixels_per_second >= MIN_LABEL_SPACING_PX)
        .unwrap_or(RULER_LADDER_SEC[0])
}

/// Ticks inside the visible window only. Majors sit on the ladder interval and
/// are always labelled; minors sit halfway between and are labelled only when
/// they are themselves far enough apart, which only happens on the finest rung.
pub fn ruler_ticks(viewport: &TimelineViewport) -> Vec<RulerTick> {
    let pps = viewport.pixels_per_second();
    if pps == 0.0 {
        return Vec::new();
    }

    let major = ruler_interval(pps);
    let minor = major / 2.0;
    let label_minor = minor * pps >= MIN_LABEL_SPACING_PX;

    let (start, end) = viewport.visible_time_range();
    let first = (start / minor).ceil() as i64;
    let last = (end / minor).floor() as i64;

    let mut ticks = Vec::new();
    for k in first..=last {
        if ticks.len() >= MAX_TICKS {
            break;
        }
        let time_sec = k as f64 * minor;
        let kind = if k % 2 == 0 { TickKind::Major } else { TickKind::Minor };
        let label = match kind {
            TickKind::Major => Some(format_timecode(time_sec)),
            TickKind::Minor if label_minor => Some(format_timecode(time_sec)),
            TickKind::Minor => None,
        };
        ticks.push(RulerTick {
            time_sec,
            x_px: viewport.time_to_pixel(time_sec),
            kind,
            label,
        });
    }
    ticks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_follows_zoom() {
        // 120 px/s: one second is wide enough for a label
        assert_eq!(ruler_interval(120.0), 1.0);
        assert_eq!(ruler_interval(200.0), 0.5);
        assert_eq!(ruler_interval(10.0), 10.0);
        assert_eq!(ruler_interval(0.01), 600.0);
    }

    #[test]
    fn only_visible_ticks_are_produced() {
        // two-hour video, 120 px/s, scrolled to 1h
        let vp = TimelineViewport::new(7200.0, 30.0, 960.0).with_scroll(3600.0 * 120.0);
        let ticks = ruler_ticks(&vp);
        assert_eq!(ticks.first().unwrap().time_sec, 3600.0);
        assert_eq!(ticks.last().unwrap().time_sec, 3608.0);
        assert_eq!(ticks.len(), 17);
        assert!(ticks.iter().all(|t| t.x_px >= 0.0 && t.x_px <= 960.0));
    }

    #[test]
    fn majors_labelled_minors_not() {
        let vp = TimelineViewport::new(60.0, 30.0, 500.0);
        let ticks = ruler_ticks(&vp);
        let major = ticks.iter().find(|t| t.time_sec == 2.0).unwrap();
        assert_eq!(major.kind, TickKind::Major);
        assert_eq!(major.label.as_deref(), Some("0:02"));
        let minor = ticks.iter().find(|t| t.time_sec == 2.5).unwrap();
        assert_eq!(minor.kind, TickKind::Minor);
        assert!(minor.label.is_none());
    }

    #[test]
    fn finest_rung_labels_minors() {
        // 480 px/s: 0.25s minors are 120px apart
        let vp = TimelineViewport::new(60.0, 30.0, 500.0).with_zoom(4.0);
        let ticks = ruler_ticks(&vp);
        let minor = ticks.iter().find(|t| t.time_sec == 0.25).unwrap();
        assert_eq!(minor.kind, TickKind::Minor);
        assert_eq!(minor.label.as_deref(), Some("0:00.25"));
    }

    #[test]
    fn degenerate_viewport_has_no_ticks() {
        let vp = TimelineViewport::new(60.0, 0.0, 500.0);
        assert!(ruler_ticks(&vp).is_empty());
    }
}
