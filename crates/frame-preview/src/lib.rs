//! Frame-preview capture for the timeline's thumbnail ribbon.
//!
//! The [`FrameScheduler`] fills a shared [`FrameCache`] with small stills by
//! seeking the one video source the user is also watching, so every run
//! restores the playback position it found. [`PreviewDriver`] debounces
//! viewport changes and keeps capture out of the way of drags.

use std::time::Duration;

use thiserror::Error;
use timeline::Frame;

mod config;
pub use config::*;
mod source;
pub use source::*;
mod cache;
pub use cache::*;
mod scheduler;
pub use scheduler::*;
mod driver;
pub use driver::*;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("video source not ready after {0:?}")]
    NotReady(Duration),
    #[error("seek to frame {frame} timed out after {after:?}")]
    SeekTimeout { frame: Frame, after: Duration },
    #[error("seek failed: {0}")]
    Seek(String),
    #[error("capture failed: {0}")]
    Capture(String),
}

pub type Result<T> = std::result::Result<T, PreviewError>;
