//! Remote locations the sync utilities mirror into.

use crate::error::ConfigError;
use std::fmt;
use std::path::PathBuf;

/// Where a mirror sync writes to.
///
/// `s3://bucket/prefix` and the shorthand `bucket/prefix` target S3;
/// `file:///abs/dir` mirrors into a local directory with the same semantics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Destination {
    S3 { bucket: String, prefix: String },
    Local { root: PathBuf, prefix: String },
}

fn normalize_prefix(raw: &str) -> String {
    raw.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

impl Destination {
    /// Parses a destination string read from configuration variable `key`.
    pub fn parse(key: &'static str, raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ConfigError::Missing(key));
        }

        if let Some(path) = raw.strip_prefix("file://") {
            if path.is_empty() {
                return Err(ConfigError::invalid(key, raw, "file:// needs a directory"));
            }
            return Ok(Destination::Local {
                root: PathBuf::from(path),
                prefix: String::new(),
            });
        }

        if raw.contains("://") && !raw.starts_with("s3://") {
            return Err(ConfigError::invalid(
                key,
                raw,
                "expected s3://bucket/prefix, bucket/prefix or file:///dir",
            ));
        }

        let rest = raw.strip_prefix("s3://").unwrap_or(raw);
        let (bucket, prefix) = match rest.split_once('/') {
            Some((bucket, prefix)) => (bucket, prefix),
            None => (rest, ""),
        };
        if bucket.is_empty() {
            return Err(ConfigError::invalid(key, raw, "bucket name is empty"));
        }

        Ok(Destination::S3 {
            bucket: bucket.to_string(),
            prefix: normalize_prefix(prefix),
        })
    }

    pub fn prefix(&self) -> &str {
        match self {
            Destination::S3 { prefix, .. } | Destination::Local { prefix, .. } => prefix,
        }
    }

    /// Returns the same destination one path segment deeper.
    pub fn child(&self, segment: &str) -> Destination {
        let joined = normalize_prefix(&format!("{}/{}", self.prefix(), segment));
        match self {
            Destination::S3 { bucket, .. } => Destination::S3 {
                bucket: bucket.clone(),
                prefix: joined,
            },
            Destination::Local { root, .. } => Destination::Local {
                root: root.clone(),
                prefix: joined,
            },
        }
    }

    /// Object key for a file at `relative` (slash-separated) under this destination.
    pub fn key_for(&self, relative: &str) -> String {
        let relative = relative.trim_start_matches('/');
        if self.prefix().is_empty() {
            relative.to_string()
        } else {
            format!("{}/{}", self.prefix(), relative)
        }
    }

    /// CDN path pattern covering every object under this destination.
    pub fn invalidation_path(&self) -> String {
        if self.prefix().is_empty() {
            "/*".to_string()
        } else {
            format!("/{}/*", self.prefix())
        }
    }

    pub fn is_s3(&self) -> bool {
        matches!(self, Destination::S3 { .. })
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::S3 { bucket, prefix } if prefix.is_empty() => write!(f, "s3://{}/", bucket),
            Destination::S3 { bucket, prefix } => write!(f, "s3://{}/{}/", bucket, prefix),
            Destination::Local { root, prefix } => {
                write!(f, "file://{}", root.join(prefix).display())
            }
        }
    }
}
