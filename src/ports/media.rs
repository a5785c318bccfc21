use crate::error::BoxError;
use async_trait::async_trait;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MediaInfo {
    pub has_video: bool,
    pub duration_secs: f64,
}

impl MediaInfo {
    /// A usable encode has a video stream and a positive duration.
    pub fn is_playable(&self) -> bool {
        self.has_video && self.duration_secs > 0.0
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, BoxError>;
}
