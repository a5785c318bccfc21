use crate::error::BoxError;
use async_trait::async_trait;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// GET `url` and return the status with the body as text
    async fn get_text(&self, url: &str) -> Result<HttpResponse, BoxError>;
}
