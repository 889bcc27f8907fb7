use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Capture tuning. Durations are stored in milliseconds so the struct reads
/// naturally from JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Frames captured between cooperative yields.
    pub batch_size: usize,
    pub seek_timeout_ms: u64,
    pub ready_timeout_ms: u64,
    pub ready_poll_ms: u64,
    /// Quiet period after the last viewport change before capturing.
    pub debounce_ms: u64,
    pub still_width: u32,
    pub still_height: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            seek_timeout_ms: 2000,
            ready_timeout_ms: 10_000,
            ready_poll_ms: 50,
            debounce_ms: 1000,
            still_width: 80,
            still_height: 45,
        }
    }
}

impl PreviewConfig {
    pub fn seek_timeout(&self) -> Duration {
        Duration::from_millis(self.seek_timeout_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn ready_poll(&self) -> Duration {
        Duration::from_millis(self.ready_poll_ms.max(1))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: PreviewConfig = serde_json::from_str(r#"{ "seek_timeout_ms": 500 }"#).unwrap();
        assert_eq!(cfg.seek_timeout(), Duration::from_millis(500));
        assert_eq!(cfg.batch_size, 5);
        assert_eq!((cfg.still_width, cfg.still_height), (80, 45));
    }

    #[test]
    fn zero_batch_still_makes_progress() {
        let cfg = PreviewConfig {
            batch_size: 0,
            ..PreviewConfig::default()
        };
        assert_eq!(cfg.batch_size(), 1);
    }
}
