#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SCRUBBED: [&str; 17] = [
    "ADDRESSABLES_UPLOAD_ENABLED",
    "ADDRESSABLES_S3_PATH",
    "ADDRESSABLES_CLOUDFRONT_DISTRIBUTION_ID",
    "ADDRESSABLES_BUILD_ROOT",
    "CONFIG_S3_PATH",
    "CONFIG_CLOUDFRONT_DISTRIBUTION_ID",
    "SHEETS_FILE",
    "DATASYNC_OUTPUT_DIR",
    "DATASYNC_HTTP_TIMEOUT_SECS",
    "VIDEO_CRF",
    "VIDEO_PRESET",
    "VIDEO_MAX_BITRATE",
    "VIDEO_AUDIO_BITRATE",
    "RUNNER_TOKEN",
    "RUNNER_URL",
    "UNITY_PATH",
    "AWS_PROFILE",
];

/// A scratch working directory plus a directory of fake tools.
pub struct TestEnv {
    _tmp: TempDir,
    pub work: PathBuf,
    pub fakebin: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let work = tmp.path().join("work");
        let fakebin = tmp.path().join("fakebin");
        fs::create_dir_all(&work).expect("create work dir");
        fs::create_dir_all(&fakebin).expect("create fakebin");
        Self {
            _tmp: tmp,
            work,
            fakebin,
        }
    }

    /// The binary `name`, run from the work directory with a clean
    /// environment and only the fake tools plus the system dirs on PATH.
    pub fn bin(&self, name: &str) -> Command {
        let mut cmd = Command::cargo_bin(name).expect("binary built");
        for key in SCRUBBED {
            cmd.env_remove(key);
        }
        cmd.current_dir(&self.work)
            .env("NO_COLOR", "1")
            .env("RUST_LOG", "warn")
            .env("PATH", format!("{}:/usr/bin:/bin", self.fakebin.display()));
        cmd
    }

    /// Writes an executable shell script into the fake tool dir.
    pub fn fake_tool(&self, name: &str, body: &str) -> PathBuf {
        write_script(&self.fakebin, name, body)
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.work.join(relative)
    }

    pub fn write(&self, relative: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, content).expect("write fixture");
        path
    }
}

pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod script");
    path
}

/// Relative paths of every file under `root`, sorted.
pub fn files_under(root: &Path) -> Vec<String> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let relative = path.strip_prefix(root).expect("under root");
                found.push(relative.display().to_string());
            }
        }
    }
    found.sort();
    found
}
