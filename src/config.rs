//! Configuration for the individual utilities.
//!
//! Every struct is built from a `lookup` function so tests can feed values
//! without touching the process environment; `from_env()` wires the real one.

use crate::domain::media::EncoderSettings;
use crate::error::ConfigError;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Loads `.env` from the working directory when present, then `env_file`.
/// Variables already set in the environment are never overridden.
pub fn load_env_files(env_file: Option<&Path>) -> Result<(), ConfigError> {
    dotenv::dotenv().ok();
    if let Some(path) = env_file {
        dotenv::from_path(path).map_err(|e| ConfigError::EnvFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

/// Reads a variable, treating empty values as unset.
pub fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Feature flags are on only for `1`, `true`, `yes` or `on`.
pub fn flag_enabled(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

/// Configuration for the Addressables publisher. Values stay raw here: the
/// publisher validates them in a fixed order after checking the flag.
#[derive(Clone, Debug, Default)]
pub struct PublishConfig {
    pub enabled: bool,
    pub s3_path: Option<String>,
    pub distribution_id: Option<String>,
    pub aws_profile: Option<String>,
    pub build_root: PathBuf,
}

impl PublishConfig {
    pub const FLAG: &'static str = "ADDRESSABLES_UPLOAD_ENABLED";
    pub const S3_PATH: &'static str = "ADDRESSABLES_S3_PATH";
    pub const DISTRIBUTION_ID: &'static str = "ADDRESSABLES_CLOUDFRONT_DISTRIBUTION_ID";
    pub const BUILD_ROOT: &'static str = "ADDRESSABLES_BUILD_ROOT";

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            enabled: flag_enabled(lookup(Self::FLAG).as_deref()),
            s3_path: lookup(Self::S3_PATH),
            distribution_id: lookup(Self::DISTRIBUTION_ID),
            aws_profile: lookup("AWS_PROFILE"),
            build_root: lookup(Self::BUILD_ROOT)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("ServerData")),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }
}

/// Configuration for the video re-encoder.
#[derive(Clone, Debug)]
pub struct ReencodeConfig {
    pub settings: EncoderSettings,
}

impl ReencodeConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            settings: EncoderSettings::from_lookup(lookup)?,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }
}

/// Configuration for the spreadsheet data sync.
#[derive(Clone, Debug)]
pub struct DataSyncConfig {
    pub sheets_file: PathBuf,
    pub s3_path: Option<String>,
    pub distribution_id: Option<String>,
    pub aws_profile: Option<String>,
    pub output_dir: PathBuf,
    pub http_timeout: Duration,
}

impl DataSyncConfig {
    pub const SHEETS_FILE: &'static str = "SHEETS_FILE";
    pub const S3_PATH: &'static str = "CONFIG_S3_PATH";
    pub const DISTRIBUTION_ID: &'static str = "CONFIG_CLOUDFRONT_DISTRIBUTION_ID";
    pub const OUTPUT_DIR: &'static str = "DATASYNC_OUTPUT_DIR";
    pub const HTTP_TIMEOUT: &'static str = "DATASYNC_HTTP_TIMEOUT_SECS";

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let http_timeout = match lookup(Self::HTTP_TIMEOUT) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| {
                    ConfigError::invalid(Self::HTTP_TIMEOUT, &raw, "expected whole seconds > 0")
                })?,
            None => Duration::from_secs(10),
        };

        Ok(Self {
            sheets_file: lookup(Self::SHEETS_FILE)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("sheets.env")),
            s3_path: lookup(Self::S3_PATH),
            distribution_id: lookup(Self::DISTRIBUTION_ID),
            aws_profile: lookup("AWS_PROFILE"),
            output_dir: lookup(Self::OUTPUT_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("Assets/StreamingAssets/Config")),
            http_timeout,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }
}

/// Expands a leading `~/` with `$HOME`.
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), env_lookup("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}
