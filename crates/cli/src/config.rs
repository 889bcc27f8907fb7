use std::path::Path;

use anyhow::{Context, Result};
use frame_preview::PreviewConfig;
use serde::{Deserialize, Serialize};
use timeline::{InteractionConfig, ThumbnailEndpoint};

/// Everything tunable, as read from `--config`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub interaction: InteractionConfig,
    pub preview: PreviewConfig,
    /// Tier-2 thumbnail URL template; tiles skip straight to placeholders
    /// without one.
    pub thumbnails: Option<ThumbnailEndpoint>,
}

impl ReviewConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse config {}", path.display()))
    }
}
