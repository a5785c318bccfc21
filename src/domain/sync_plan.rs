//! One-way mirror planning: which local files to upload and which remote
//! objects to delete so the remote side ends up equal to the local tree.

use super::destination::Destination;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalFile {
    /// Slash-separated path relative to the scanned root.
    pub relative: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified_secs: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteObject {
    pub key: String,
    pub size: u64,
    pub modified_secs: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Upload {
    pub key: String,
    pub file: LocalFile,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub uploads: Vec<Upload>,
    pub unchanged: Vec<String>,
    pub deletes: Vec<String>,
}

impl SyncPlan {
    pub fn is_noop(&self) -> bool {
        self.uploads.is_empty() && self.deletes.is_empty()
    }
}

/// Compares the local tree with what the remote side holds under `dest`.
///
/// A file is uploaded when the remote copy is missing, has a different size,
/// or is older than the local file. Remote objects without a local
/// counterpart are deleted.
pub fn plan(dest: &Destination, local: &[LocalFile], remote: &[RemoteObject]) -> SyncPlan {
    let remote_by_key: HashMap<&str, &RemoteObject> =
        remote.iter().map(|obj| (obj.key.as_str(), obj)).collect();
    let mut wanted = HashSet::new();
    let mut plan = SyncPlan::default();

    for file in local {
        let key = dest.key_for(&file.relative);
        let up_to_date = remote_by_key
            .get(key.as_str())
            .map(|obj| obj.size == file.size && obj.modified_secs >= file.modified_secs)
            .unwrap_or(false);
        if up_to_date {
            plan.unchanged.push(key.clone());
        } else {
            plan.uploads.push(Upload {
                key: key.clone(),
                file: file.clone(),
            });
        }
        wanted.insert(key);
    }

    plan.deletes = remote
        .iter()
        .filter(|obj| !wanted.contains(&obj.key))
        .map(|obj| obj.key.clone())
        .collect();
    plan.deletes.sort();
    plan
}

/// Lists every regular file under `root`, sorted by relative path.
pub fn scan_local(root: &Path) -> io::Result<Vec<LocalFile>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(path);
                continue;
            }
            if !file_type.is_file() {
                continue;
            }
            let metadata = entry.metadata()?;
            let modified_secs = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);
            files.push(LocalFile {
                relative: relative_key(root, &path),
                path,
                size: metadata.len(),
                modified_secs,
            });
        }
    }

    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(files)
}

fn relative_key(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Content type sent with uploads, keyed on extension.
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "json" => "application/json",
        "hash" | "txt" => "text/plain",
        "csv" => "text/csv",
        "xml" => "application/xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}
