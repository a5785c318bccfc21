//! Data Sync Binary
//!
//! Downloads the published spreadsheet exports listed in the sheet file,
//! mirrors them to the config bucket and invalidates the CDN. `check` runs
//! the same chain as a smoke test without writing anything.
//!
//! Environment Variables:
//! - SHEETS_FILE: name=url list (default sheets.env)
//! - CONFIG_S3_PATH: s3://bucket/prefix, bucket/prefix or file:///dir
//! - CONFIG_CLOUDFRONT_DISTRIBUTION_ID: optional
//! - DATASYNC_OUTPUT_DIR: download directory (default Assets/StreamingAssets/Config)
//! - DATASYNC_HTTP_TIMEOUT_SECS: per-request timeout (default 10)
//! - AWS_PROFILE: optional credential profile

use clap::{Parser, Subcommand};
use pipewright::adapters::aws::{self, CloudFrontAdapter, S3Adapter, StsAdapter};
use pipewright::adapters::local::{FsStore, ReqwestFetcher};
use pipewright::application::datasync::{self, DataSyncService, SyncTarget};
use pipewright::application::mirror::Invalidation;
use pipewright::config::{self, DataSyncConfig};
use pipewright::domain::checks::CheckReport;
use pipewright::domain::destination::Destination;
use pipewright::{cli, console, telemetry};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(version, about = "Sync published spreadsheet config data to the CDN")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Flat KEY=VALUE file loaded before reading the environment
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Print the check report or the sync report as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Smoke-test the sheet list, credentials, bucket and every sheet URL
    Check,
    /// Download every sheet and mirror the CSV files to the destination
    Run,
}

async fn check(config: &DataSyncConfig, json: bool) -> anyhow::Result<ExitCode> {
    let mut report = CheckReport::default();
    if let Some(target) = datasync::preflight(config, &mut report) {
        let fetcher = ReqwestFetcher::new(config.http_timeout).map_err(|e| anyhow::anyhow!(e))?;
        match &target.destination {
            Destination::S3 { bucket, .. } => {
                let sdk = aws::load_config(config.aws_profile.as_deref()).await;
                DataSyncService::new(
                    fetcher,
                    S3Adapter::new(aws_sdk_s3::Client::new(&sdk), bucket.clone()),
                    Some(StsAdapter::new(aws_sdk_sts::Client::new(&sdk))),
                    None::<CloudFrontAdapter>,
                )
                .check(&target, &mut report)
                .await
            }
            Destination::Local { root, .. } => {
                DataSyncService::new(
                    fetcher,
                    FsStore::new(root.clone()),
                    None::<StsAdapter>,
                    None::<CloudFrontAdapter>,
                )
                .check(&target, &mut report)
                .await
            }
        }
    }
    cli::print_report(&report, json)
}

async fn sync(config: &DataSyncConfig, json: bool) -> anyhow::Result<ExitCode> {
    let target: SyncTarget = datasync::load_target(config)?;
    let fetcher = ReqwestFetcher::new(config.http_timeout).map_err(|e| anyhow::anyhow!(e))?;
    if !json {
        console::step(format!(
            "syncing {} sheet(s) to {}",
            target.sheets.len(),
            target.destination
        ));
    }

    let distribution_id = config.distribution_id.as_deref();
    let report = match &target.destination {
        Destination::S3 { bucket, .. } => {
            let sdk = aws::load_config(config.aws_profile.as_deref()).await;
            DataSyncService::new(
                fetcher,
                S3Adapter::new(aws_sdk_s3::Client::new(&sdk), bucket.clone()),
                None::<StsAdapter>,
                Some(CloudFrontAdapter::new(aws_sdk_cloudfront::Client::new(&sdk))),
            )
            .run(&target, &config.output_dir, distribution_id)
            .await?
        }
        Destination::Local { root, .. } => {
            DataSyncService::new(
                fetcher,
                FsStore::new(root.clone()),
                None::<StsAdapter>,
                None::<CloudFrontAdapter>,
            )
            .run(&target, &config.output_dir, distribution_id)
            .await?
        }
    };

    if json {
        cli::print_json(true, &report)?;
        return Ok(ExitCode::SUCCESS);
    }
    for sheet in &report.downloaded {
        console::ok(format!("{}: {} line(s)", sheet.name, sheet.rows));
    }
    console::ok(format!("{}: {}", target.destination, report.summary));
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

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    config::load_env_files(args.env_file.as_deref())?;
    let config = DataSyncConfig::from_env()?;
    match args.command {
        Command::Check => check(&config, args.json).await,
        Command::Run => sync(&config, args.json).await,
    }
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
