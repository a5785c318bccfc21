use crate::error::BoxError;
use crate::ports::cdn::CdnInvalidator;
use async_trait::async_trait;
use aws_sdk_cloudfront::types::{InvalidationBatch, Paths};
use aws_sdk_cloudfront::Client;
use std::time::{SystemTime, UNIX_EPOCH};

/// CloudFrontAdapter implements CdnInvalidator for AWS CloudFront.
#[derive(Clone)]
pub struct CloudFrontAdapter {
    client: Client,
}

impl CloudFrontAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn caller_reference() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("pipewright-{}", nanos)
}

#[async_trait]
impl CdnInvalidator for CloudFrontAdapter {
    async fn invalidate(&self, distribution_id: &str, paths: &[String]) -> Result<String, BoxError> {
        let paths = Paths::builder()
            .quantity(paths.len() as i32)
            .set_items(Some(paths.to_vec()))
            .build()?;
        let batch = InvalidationBatch::builder()
            .paths(paths)
            .caller_reference(caller_reference())
            .build()?;

        let resp = self
            .client
            .create_invalidation()
            .distribution_id(distribution_id)
            .invalidation_batch(batch)
            .send()
            .await?;

        Ok(resp
            .location()
            .map(str::to_string)
            .unwrap_or_else(|| format!("distribution {}", distribution_id)))
    }
}
