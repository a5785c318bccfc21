use crate::error::BoxError;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CdnInvalidator: Send + Sync {
    /// Request invalidation of `paths` on `distribution_id`.
    /// Returns a reference to the created invalidation for logging.
    async fn invalidate(&self, distribution_id: &str, paths: &[String]) -> Result<String, BoxError>;
}
