//! Video re-encoding: which files qualify, where their backups go, and the
//! ffmpeg arguments used to rewrite them.

use crate::error::ConfigError;
use std::io;
use std::path::{Path, PathBuf};

pub const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "mov", "m4v", "webm"];

pub const X264_PRESETS: [&str; 10] = [
    "ultrafast",
    "superfast",
    "veryfast",
    "faster",
    "fast",
    "medium",
    "slow",
    "slower",
    "veryslow",
    "placebo",
];

/// Quality/bitrate/speed tradeoff for the encoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncoderSettings {
    pub crf: u8,
    pub preset: String,
    pub max_bitrate: String,
    pub audio_bitrate: String,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            crf: 28,
            preset: "slow".to_string(),
            max_bitrate: "2M".to_string(),
            audio_bitrate: "128k".to_string(),
        }
    }
}

fn valid_bitrate(value: &str) -> bool {
    let digits = value.trim_end_matches(|c: char| matches!(c, 'k' | 'K' | 'm' | 'M'));
    !digits.is_empty()
        && digits.len() + 1 >= value.len()
        && digits.chars().all(|c| c.is_ascii_digit())
        && digits.parse::<u64>().map(|n| n > 0).unwrap_or(false)
}

/// Doubles a bitrate string for the rate-control buffer (`2M` -> `4M`).
fn double_bitrate(value: &str) -> String {
    let split = value.find(|c: char| !c.is_ascii_digit()).unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);
    match digits.parse::<u64>() {
        Ok(n) => format!("{}{}", n * 2, unit),
        Err(_) => value.to_string(),
    }
}

impl EncoderSettings {
    /// Applies `VIDEO_*` overrides from `lookup` on top of the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        if let Some(raw) = lookup("VIDEO_CRF") {
            settings.crf = raw
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|crf| *crf <= 51)
                .ok_or_else(|| ConfigError::invalid("VIDEO_CRF", &raw, "expected 0-51"))?;
        }
        if let Some(raw) = lookup("VIDEO_PRESET") {
            let preset = raw.trim().to_ascii_lowercase();
            if !X264_PRESETS.contains(&preset.as_str()) {
                return Err(ConfigError::invalid("VIDEO_PRESET", raw, "not an x264 preset"));
            }
            settings.preset = preset;
        }
        if let Some(raw) = lookup("VIDEO_MAX_BITRATE") {
            if !valid_bitrate(raw.trim()) {
                return Err(ConfigError::invalid("VIDEO_MAX_BITRATE", raw, "expected e.g. 2M or 1500k"));
            }
            settings.max_bitrate = raw.trim().to_string();
        }
        if let Some(raw) = lookup("VIDEO_AUDIO_BITRATE") {
            if !valid_bitrate(raw.trim()) {
                return Err(ConfigError::invalid("VIDEO_AUDIO_BITRATE", raw, "expected e.g. 128k"));
            }
            settings.audio_bitrate = raw.trim().to_string();
        }
        Ok(settings)
    }

    /// ffmpeg arguments that read `input` and overwrite `output`.
    pub fn ffmpeg_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let webm = has_extension(output, "webm");
        let mut args = vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-y".to_string(),
            "-i".to_string(),
            input.display().to_string(),
        ];
        let crf = self.crf.to_string();
        let bufsize = double_bitrate(&self.max_bitrate);
        let codec_args: Vec<&str> = if webm {
            vec![
                "-c:v",
                "libvpx-vp9",
                "-crf",
                &crf,
                "-b:v",
                "0",
                "-maxrate",
                &self.max_bitrate,
                "-bufsize",
                &bufsize,
                "-c:a",
                "libopus",
                "-b:a",
                &self.audio_bitrate,
            ]
        } else {
            vec![
                "-c:v",
                "libx264",
                "-preset",
                &self.preset,
                "-crf",
                &crf,
                "-maxrate",
                &self.max_bitrate,
                "-bufsize",
                &bufsize,
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+faststart",
                "-c:a",
                "aac",
                "-b:a",
                &self.audio_bitrate,
            ]
        };
        args.extend(codec_args.into_iter().map(String::from));
        args.push(output.display().to_string());
        args
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

pub fn is_video(path: &Path) -> bool {
    VIDEO_EXTENSIONS.iter().any(|ext| has_extension(path, ext))
}

/// Finds video files under `root`, never descending into `exclude`.
///
/// Directories are compared by canonical path, so `VideoBackups` and
/// `./VideoBackups` are the same directory.
pub fn find_videos(root: &Path, exclude: &Path) -> io::Result<Vec<PathBuf>> {
    let exclude = exclude.canonicalize().ok();
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        if let (Some(exclude), Ok(canonical)) = (&exclude, dir.canonicalize()) {
            if canonical.starts_with(exclude) {
                continue;
            }
        }
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() && is_video(&path) {
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}

/// Timestamped backup directory for one run.
#[derive(Clone, Debug)]
pub struct BackupLayout {
    pub assets_root: PathBuf,
    pub dir: PathBuf,
}

impl BackupLayout {
    /// `stamp` is formatted as `YYYYMMDD_HHMMSS`.
    pub fn new(assets_root: &Path, backup_root: &Path, stamp: &str) -> Self {
        Self {
            assets_root: assets_root.to_path_buf(),
            dir: backup_root.join(format!("video_backup_{}", stamp)),
        }
    }

    /// Backup path for `original`, mirroring its place under the assets root.
    pub fn backup_path(&self, original: &Path) -> PathBuf {
        match original.strip_prefix(&self.assets_root) {
            Ok(relative) => self.dir.join(relative),
            Err(_) => self.dir.join(original.file_name().unwrap_or(original.as_os_str())),
        }
    }
}

/// Default backup root: a `VideoBackups` directory beside the assets dir, so
/// Unity never imports the copies. `.` resolves to its real parent.
pub fn default_backup_root(assets_root: &Path) -> PathBuf {
    let resolved = assets_root
        .canonicalize()
        .unwrap_or_else(|_| assets_root.to_path_buf());
    match resolved.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join("VideoBackups"),
        _ => PathBuf::from("VideoBackups"),
    }
}

pub fn backup_stamp(now: time::OffsetDateTime) -> String {
    let format = time::macros::format_description!("[year][month][day]_[hour][minute][second]");
    now.format(&format)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}
