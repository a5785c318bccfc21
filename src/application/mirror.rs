use crate::domain::destination::Destination;
use crate::domain::sync_plan::{content_type, plan, LocalFile};
use crate::error::PipelineError;
use crate::ports::cdn::CdnInvalidator;
use crate::ports::storage::{ObjectStore, PutOptions};
use serde::Serialize;

/// Counts reported after a mirror sync.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub uploaded: usize,
    pub unchanged: usize,
    pub deleted: usize,
}

impl std::fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} uploaded, {} unchanged, {} deleted",
            self.uploaded, self.unchanged, self.deleted
        )
    }
}

/// Key prefix that lists exactly the objects under `dest`.
fn list_prefix(dest: &Destination) -> String {
    if dest.prefix().is_empty() {
        String::new()
    } else {
        format!("{}/", dest.prefix())
    }
}

/// Makes the objects under `dest` equal to `local`: uploads new or changed
/// files, then deletes remote objects with no local counterpart.
///
/// Stops at the first failed request. Objects already written stay written.
pub async fn mirror<S>(
    store: &S,
    dest: &Destination,
    local: &[LocalFile],
    cache_control: &str,
) -> Result<SyncSummary, PipelineError>
where
    S: ObjectStore + ?Sized,
{
    let remote = store
        .list(&list_prefix(dest))
        .await
        .map_err(PipelineError::Storage)?;
    let plan = plan(dest, local, &remote);
    tracing::info!(
        destination = %dest,
        uploads = plan.uploads.len(),
        unchanged = plan.unchanged.len(),
        deletes = plan.deletes.len(),
        "sync planned"
    );

    for upload in &plan.uploads {
        let options = PutOptions {
            cache_control: cache_control.to_string(),
            content_type: content_type(&upload.file.path).to_string(),
        };
        tracing::debug!(key = %upload.key, size = upload.file.size, "upload");
        store
            .put(&upload.file.path, &upload.key, &options)
            .await
            .map_err(PipelineError::Storage)?;
    }

    for key in &plan.deletes {
        tracing::debug!(key = %key, "delete");
        store.delete(key).await.map_err(PipelineError::Storage)?;
    }

    Ok(SyncSummary {
        uploaded: plan.uploads.len(),
        unchanged: plan.unchanged.len(),
        deleted: plan.deletes.len(),
    })
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Invalidation {
    Created { path: String, id: String },
    Skipped { reason: String },
}

/// Invalidates every path under `dest` when a distribution id is configured
/// under `setting` and a CDN fronts the destination.
pub async fn invalidate<C>(
    cdn: Option<&C>,
    distribution_id: Option<&str>,
    dest: &Destination,
    setting: &str,
) -> Result<Invalidation, PipelineError>
where
    C: CdnInvalidator + ?Sized,
{
    let (distribution_id, cdn) = match (distribution_id, cdn) {
        (None, _) => {
            return Ok(Invalidation::Skipped {
                reason: format!("{} is not set", setting),
            })
        }
        (Some(_), None) => {
            return Ok(Invalidation::Skipped {
                reason: format!("no CDN in front of {}", dest),
            })
        }
        (Some(id), Some(cdn)) => (id, cdn),
    };

    let path = dest.invalidation_path();
    let id = cdn
        .invalidate(distribution_id, std::slice::from_ref(&path))
        .await
        .map_err(PipelineError::Cdn)?;
    tracing::info!(distribution_id = %distribution_id, path = %path, id = %id, "invalidation created");
    Ok(Invalidation::Created { path, id })
}
