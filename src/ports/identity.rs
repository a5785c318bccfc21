use crate::error::BoxError;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProbe: Send + Sync {
    /// Resolve credentials and return the caller's identity (ARN)
    async fn caller_identity(&self) -> Result<String, BoxError>;
}
