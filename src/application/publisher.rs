//! Addressables publishing: gate on the feature flag, mirror one platform's
//! build output to the object store, then invalidate the CDN path.

use crate::application::mirror::{invalidate, mirror, Invalidation, SyncSummary};
use crate::config::PublishConfig;
use crate::domain::destination::Destination;
use crate::domain::platform::Platform;
use crate::domain::sync_plan::{scan_local, LocalFile};
use crate::error::{ConfigError, PipelineError};
use crate::ports::cdn::CdnInvalidator;
use crate::ports::storage::ObjectStore;
use serde::Serialize;
use std::path::PathBuf;

/// Addressables bundles are content-hashed, so clients may cache them forever.
pub const BUNDLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// A publish that passed every local check and is ready to touch the network.
#[derive(Clone, Debug)]
pub struct PublishPlan {
    pub platform: Platform,
    pub source: PathBuf,
    pub destination: Destination,
    pub distribution_id: Option<String>,
    pub files: Vec<LocalFile>,
}

/// Result of the local checks. Only `Ready` leads to network calls.
#[derive(Debug)]
pub enum Preparation {
    Disabled,
    NothingToUpload { source: PathBuf },
    Ready(PublishPlan),
}

/// Runs the checks that need no network, in order: flag, platform,
/// destination, local source directory.
pub fn prepare(config: &PublishConfig, platform: &str) -> Result<Preparation, PipelineError> {
    if !config.enabled {
        tracing::info!(flag = PublishConfig::FLAG, "upload disabled, skipping");
        return Ok(Preparation::Disabled);
    }

    let platform: Platform = platform
        .parse()
        .map_err(|e: crate::domain::platform::UnknownPlatform| {
            ConfigError::invalid("platform", e.0.clone(), "expected android or ios")
        })?;

    let raw = config
        .s3_path
        .as_deref()
        .ok_or(ConfigError::Missing(PublishConfig::S3_PATH))?;
    let destination = Destination::parse(PublishConfig::S3_PATH, raw)?.child(platform.build_target());

    let source = config.build_root.join(platform.build_target());
    if !source.is_dir() {
        return Err(PipelineError::MissingPath {
            what: "build output directory",
            path: source,
        });
    }
    let files = scan_local(&source)?;
    if files.is_empty() {
        tracing::info!(source = %source.display(), "nothing to upload");
        return Ok(Preparation::NothingToUpload { source });
    }

    Ok(Preparation::Ready(PublishPlan {
        platform,
        source,
        destination,
        distribution_id: config.distribution_id.clone(),
        files,
    }))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub platform: Platform,
    pub destination: String,
    pub summary: SyncSummary,
    pub invalidation: Invalidation,
}

pub struct PublishService<S, C> {
    store: S,
    cdn: Option<C>,
}

impl<S, C> PublishService<S, C>
where
    S: ObjectStore,
    C: CdnInvalidator,
{
    /// `cdn` is `None` for destinations no CDN sits in front of.
    pub fn new(store: S, cdn: Option<C>) -> Self {
        Self { store, cdn }
    }

    pub async fn publish(&self, plan: &PublishPlan) -> Result<PublishReport, PipelineError> {
        tracing::info!(
            platform = %plan.platform,
            source = %plan.source.display(),
            destination = %plan.destination,
            files = plan.files.len(),
            "publishing"
        );
        let summary = mirror(
            &self.store,
            &plan.destination,
            &plan.files,
            BUNDLE_CACHE_CONTROL,
        )
        .await?;

        let invalidation = invalidate(
            self.cdn.as_ref(),
            plan.distribution_id.as_deref(),
            &plan.destination,
            PublishConfig::DISTRIBUTION_ID,
        )
        .await?;

        Ok(PublishReport {
            platform: plan.platform,
            destination: plan.destination.to_string(),
            summary,
            invalidation,
        })
    }
}
