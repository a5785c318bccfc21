//! In-place video re-encoding with a backup of every input.
//!
//! Each file is copied into the run's backup directory first, ffmpeg reads
//! the backup and overwrites the original path, and the result is probed.
//! Any failure copies the backup back so the original path always ends up
//! holding a playable file.

use crate::domain::media::{find_videos, BackupLayout, EncoderSettings};
use crate::error::PipelineError;
use crate::ports::command::{CommandRunner, Invocation};
use crate::ports::media::MediaProbe;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
pub struct ReencodeOptions {
    pub assets_dir: PathBuf,
    pub backup_root: PathBuf,
    /// `YYYYMMDD_HHMMSS` suffix of the backup directory.
    pub stamp: String,
    pub dry_run: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    Planned { command: String },
    Encoded { bytes_before: u64, bytes_after: u64 },
    Restored { reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ReencodeReport {
    pub backup_dir: PathBuf,
    pub files: Vec<FileReport>,
}

impl ReencodeReport {
    pub fn encoded(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Encoded { .. }))
            .count()
    }

    pub fn restored(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Restored { .. }))
            .count()
    }

    /// Total (before, after) size of the files that were re-encoded.
    pub fn bytes(&self) -> (u64, u64) {
        self.files.iter().fold((0, 0), |(before, after), f| match f.outcome {
            FileOutcome::Encoded {
                bytes_before,
                bytes_after,
            } => (before + bytes_before, after + bytes_after),
            _ => (before, after),
        })
    }

    pub fn exit_code(&self) -> u8 {
        if self.restored() == 0 {
            0
        } else {
            1
        }
    }
}

pub struct ReencodeService<R, P> {
    runner: R,
    probe: P,
    settings: EncoderSettings,
}

impl<R, P> ReencodeService<R, P>
where
    R: CommandRunner,
    P: MediaProbe,
{
    pub fn new(runner: R, probe: P, settings: EncoderSettings) -> Self {
        Self {
            runner,
            probe,
            settings,
        }
    }

    pub async fn run(&self, options: &ReencodeOptions) -> Result<ReencodeReport, PipelineError> {
        if self.runner.locate("ffmpeg").is_none() {
            return Err(PipelineError::MissingTool("ffmpeg".into()));
        }
        if !options.assets_dir.is_dir() {
            return Err(PipelineError::MissingPath {
                what: "assets directory",
                path: options.assets_dir.clone(),
            });
        }

        let layout = BackupLayout::new(&options.assets_dir, &options.backup_root, &options.stamp);
        let videos = find_videos(&options.assets_dir, &options.backup_root)?;
        tracing::info!(
            assets = %options.assets_dir.display(),
            backups = %layout.dir.display(),
            count = videos.len(),
            dry_run = options.dry_run,
            "videos found"
        );

        let mut report = ReencodeReport {
            backup_dir: layout.dir.clone(),
            files: Vec::with_capacity(videos.len()),
        };
        for original in videos {
            let backup = layout.backup_path(&original);
            let outcome = if options.dry_run {
                let invocation =
                    Invocation::new("ffmpeg").args(self.settings.ffmpeg_args(&backup, &original));
                FileOutcome::Planned {
                    command: invocation.display(),
                }
            } else {
                self.reencode_file(&original, &backup).await?
            };
            report.files.push(FileReport {
                path: original,
                outcome,
            });
        }
        Ok(report)
    }

    /// Errors only when the backup cannot be made or restored; encoder and
    /// probe failures are reported as `Restored`.
    async fn reencode_file(
        &self,
        original: &Path,
        backup: &Path,
    ) -> Result<FileOutcome, PipelineError> {
        if let Some(parent) = backup.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes_before = tokio::fs::copy(original, backup).await?;

        let invocation = Invocation::new("ffmpeg").args(self.settings.ffmpeg_args(backup, original));
        tracing::info!(file = %original.display(), "encoding");
        let failure = match self.runner.run(&invocation).await {
            Err(e) => Some(format!("ffmpeg could not start: {}", e)),
            Ok(output) if !output.status.success() => Some(
                PipelineError::command_failed("ffmpeg", &output).to_string(),
            ),
            Ok(_) => match self.probe.probe(original).await {
                Ok(info) if info.is_playable() => None,
                Ok(info) => Some(format!(
                    "output is not playable (video stream: {}, duration: {:.2}s)",
                    info.has_video, info.duration_secs
                )),
                Err(e) => Some(format!("probe failed: {}", e)),
            },
        };

        match failure {
            None => {
                let bytes_after = tokio::fs::metadata(original).await?.len();
                Ok(FileOutcome::Encoded {
                    bytes_before,
                    bytes_after,
                })
            }
            Some(reason) => {
                tracing::warn!(file = %original.display(), reason = %reason, "restoring original");
                tokio::fs::copy(backup, original).await?;
                Ok(FileOutcome::Restored { reason })
            }
        }
    }
}
