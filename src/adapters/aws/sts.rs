use crate::error::BoxError;
use crate::ports::identity::IdentityProbe;
use async_trait::async_trait;
use aws_sdk_sts::Client;

/// StsAdapter resolves credentials by asking STS who the caller is.
#[derive(Clone)]
pub struct StsAdapter {
    client: Client,
}

impl StsAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IdentityProbe for StsAdapter {
    async fn caller_identity(&self) -> Result<String, BoxError> {
        let resp = self.client.get_caller_identity().send().await?;
        Ok(resp
            .arn()
            .or(resp.account())
            .unwrap_or("unknown identity")
            .to_string())
    }
}
