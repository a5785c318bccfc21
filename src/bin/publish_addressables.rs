//! Publish Addressables Binary
//!
//! Mirrors one platform's Addressables build output (`ServerData/<Platform>`)
//! to S3 and invalidates the matching CloudFront path.
//!
//! Environment Variables:
//! - ADDRESSABLES_UPLOAD_ENABLED: must be 1/true/yes/on, otherwise nothing happens
//! - ADDRESSABLES_S3_PATH: s3://bucket/prefix, bucket/prefix or file:///dir
//! - ADDRESSABLES_CLOUDFRONT_DISTRIBUTION_ID: optional
//! - ADDRESSABLES_BUILD_ROOT: local build root (default ServerData)
//! - AWS_PROFILE: optional credential profile

use clap::Parser;
use pipewright::adapters::aws::{self, CloudFrontAdapter, S3Adapter};
use pipewright::adapters::local::FsStore;
use pipewright::application::mirror::Invalidation;
use pipewright::application::publisher::{self, Preparation, PublishService};
use pipewright::config::{self, PublishConfig};
use pipewright::domain::destination::Destination;
use pipewright::{cli, console, telemetry};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(version, about = "Upload Addressables bundles and invalidate the CDN")]
struct Args {
    /// Target platform: android or ios
    platform: Option<String>,

    /// Flat KEY=VALUE file loaded before reading the environment
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Print the publish report as JSON
    #[arg(long)]
    json: bool,
}

fn skipped(json: bool, reason: &str) -> anyhow::Result<()> {
    if json {
        cli::print_json(true, &serde_json::json!({ "skipped": reason }))
    } else {
        console::ok(reason);
        Ok(())
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    config::load_env_files(args.env_file.as_deref())?;
    let config = PublishConfig::from_env();

    let plan = match publisher::prepare(&config, args.platform.as_deref().unwrap_or_default())? {
        Preparation::Disabled => {
            let reason = format!("{} is not enabled, skipping upload", PublishConfig::FLAG);
            skipped(args.json, &reason)?;
            return Ok(ExitCode::SUCCESS);
        }
        Preparation::NothingToUpload { source } => {
            skipped(args.json, &format!("nothing to upload in {}", source.display()))?;
            return Ok(ExitCode::SUCCESS);
        }
        Preparation::Ready(plan) => plan,
    };

    if !args.json {
        console::step(format!(
            "syncing {} file(s) from {} to {}",
            plan.files.len(),
            plan.source.display(),
            plan.destination
        ));
    }

    let report = match &plan.destination {
        Destination::S3 { bucket, .. } => {
            let sdk = aws::load_config(config.aws_profile.as_deref()).await;
            let store = S3Adapter::new(aws_sdk_s3::Client::new(&sdk), bucket.clone());
            let cdn = CloudFrontAdapter::new(aws_sdk_cloudfront::Client::new(&sdk));
            PublishService::new(store, Some(cdn)).publish(&plan).await?
        }
        Destination::Local { root, .. } => {
            PublishService::new(FsStore::new(root.clone()), None::<CloudFrontAdapter>)
                .publish(&plan)
                .await?
        }
    };

    if args.json {
        cli::print_json(true, &report)?;
        return Ok(ExitCode::SUCCESS);
    }
    console::ok(format!("{}: {}", report.destination, report.summary));
    match &report.invalidation {
        Invalidation::Created { path, id } => {
            console::ok(format!("invalidation {} created for {}", id, path))
        }
        Invalidation::Skipped { reason } => {
            console::warn(format!("CDN invalidation skipped: {}", reason))
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args::<Args>() {
        Ok(args) => args,
        Err(code) => return code,
    };
    telemetry::init();
    cli::finish(run(args).await)
}
