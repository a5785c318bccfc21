//! AWS SDK adapters: S3 object store, CloudFront invalidation, STS identity.

pub mod cloudfront;
pub mod s3;
pub mod sts;

pub use cloudfront::CloudFrontAdapter;
pub use s3::S3Adapter;
pub use sts::StsAdapter;

/// Loads the shared SDK configuration, honoring an explicit profile.
pub async fn load_config(profile: Option<&str>) -> aws_config::SdkConfig {
    let loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    match profile {
        Some(profile) => loader.profile_name(profile).load().await,
        None => loader.load().await,
    }
}
