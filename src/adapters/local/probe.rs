use crate::error::BoxError;
use crate::ports::command::{CommandRunner, Invocation};
use crate::ports::media::{MediaInfo, MediaProbe};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

/// Reads stream and duration info by shelling out to `ffprobe`.
pub struct FfprobeProbe<R> {
    runner: R,
}

impl<R: CommandRunner> FfprobeProbe<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

/// Parses `ffprobe -of json -show_entries stream=codec_type:format=duration`.
pub fn parse_ffprobe_json(stdout: &str) -> Result<MediaInfo, BoxError> {
    let v: Value = serde_json::from_str(stdout)?;
    let has_video = v
        .get("streams")
        .and_then(|streams| streams.as_array())
        .map(|streams| {
            streams
                .iter()
                .any(|s| s.get("codec_type").and_then(|t| t.as_str()) == Some("video"))
        })
        .unwrap_or(false);
    let duration_secs = v
        .get("format")
        .and_then(|format| format.get("duration"))
        .and_then(|d| match d {
            Value::String(s) => s.parse::<f64>().ok(),
            other => other.as_f64(),
        })
        .unwrap_or(0.0);
    Ok(MediaInfo {
        has_video,
        duration_secs,
    })
}

#[async_trait]
impl<R: CommandRunner> MediaProbe for FfprobeProbe<R> {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, BoxError> {
        let invocation = Invocation::new("ffprobe").args([
            "-v".to_string(),
            "error".to_string(),
            "-show_entries".to_string(),
            "stream=codec_type:format=duration".to_string(),
            "-of".to_string(),
            "json".to_string(),
            path.display().to_string(),
        ]);
        let output = self.runner.run(&invocation).await?;
        if !output.status.success() {
            return Err(format!(
                "ffprobe failed for {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )
            .into());
        }
        parse_ffprobe_json(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Probes in-process through libav.
#[cfg(feature = "native-probe")]
pub struct NativeProbe;

#[cfg(feature = "native-probe")]
#[async_trait]
impl MediaProbe for NativeProbe {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, BoxError> {
        use ffmpeg_next as ffmpeg;

        const AV_TIME_BASE: f64 = 1_000_000.0;
        let path = path.to_path_buf();

        tokio::task::spawn_blocking(move || -> Result<MediaInfo, BoxError> {
            ffmpeg::init()?;
            let context = ffmpeg::format::input(&path)?;
            let has_video = context.streams().best(ffmpeg::media::Type::Video).is_some();
            let duration = context.duration();
            Ok(MediaInfo {
                has_video,
                duration_secs: if duration > 0 {
                    duration as f64 / AV_TIME_BASE
                } else {
                    0.0
                },
            })
        })
        .await?
    }
}
