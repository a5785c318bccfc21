//! CocoaPods checks for the Unity-generated Xcode project.

use crate::domain::checks::{CheckOutcome, CheckReport};
use crate::domain::podfile::{self, PatchOutcome, Version};
use crate::error::PipelineError;
use crate::ports::command::{CommandRunner, Invocation};
use std::path::Path;

pub const MIN_POD_VERSION: Version = Version(1, 11, 0);
pub const DEFAULT_MIN_IOS: Version = Version(13, 0, 0);

pub struct CocoaPodsService<R> {
    runner: R,
}

impl<R: CommandRunner> CocoaPodsService<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    async fn check_pod_tool(&self) -> CheckOutcome {
        const NAME: &str = "pod tool";
        let Some(pod) = self.runner.locate("pod") else {
            return CheckOutcome::fail(NAME, "`pod` is not on PATH");
        };
        let invocation = Invocation::new(pod.display().to_string()).arg("--version");
        let output = match self.runner.run(&invocation).await {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                return CheckOutcome::fail(NAME, PipelineError::command_failed("pod", &output).to_string())
            }
            Err(e) => return CheckOutcome::fail(NAME, e.to_string()),
        };
        let raw = String::from_utf8_lossy(&output.stdout);
        let raw = raw.lines().last().unwrap_or_default().trim();
        match Version::parse(raw) {
            Some(version) if version >= MIN_POD_VERSION => {
                CheckOutcome::pass(NAME, format!("{} at {}", version, pod.display()))
            }
            Some(version) => CheckOutcome::fail(
                NAME,
                format!("version {} is older than {}", version, MIN_POD_VERSION),
            ),
            None => CheckOutcome::fail(NAME, format!("unrecognised version output {:?}", raw)),
        }
    }

    /// Runs every check against the iOS build directory `project`.
    pub async fn verify(&self, project: &Path, min_ios: Version) -> CheckReport {
        let mut report = CheckReport::default();
        report.push(self.check_pod_tool().await);

        let podfile_path = project.join("Podfile");
        let podfile = std::fs::read_to_string(&podfile_path).ok();
        report.push(match &podfile {
            Some(_) => CheckOutcome::pass("Podfile", podfile_path.display().to_string()),
            None => CheckOutcome::fail("Podfile", format!("{} not found", podfile_path.display())),
        });

        const TARGET: &str = "deployment target";
        report.push(match podfile.as_deref().map(podfile::ios_platform) {
            None => CheckOutcome::fail(TARGET, "no Podfile"),
            Some(None) => CheckOutcome::fail(TARGET, "Podfile has no `platform :ios` line"),
            Some(Some(None)) => CheckOutcome::fail(TARGET, "`platform :ios` has no version"),
            Some(Some(Some(version))) if version >= min_ios => {
                CheckOutcome::pass(TARGET, format!("iOS {}", version))
            }
            Some(Some(Some(version))) => CheckOutcome::fail(
                TARGET,
                format!("iOS {} is below the minimum {}", version, min_ios),
            ),
        });

        const LINKAGE: &str = "framework linkage";
        report.push(match podfile.as_deref() {
            None => CheckOutcome::fail(LINKAGE, "no Podfile"),
            Some(content) if podfile::uses_dynamic_frameworks(content) => CheckOutcome::fail(
                LINKAGE,
                "use_frameworks! without :linkage => :static",
            ),
            Some(_) => CheckOutcome::pass(LINKAGE, "static"),
        });

        let lock_path = project.join("Podfile.lock");
        let lock = std::fs::read(&lock_path).ok();
        report.push(match &lock {
            Some(_) => CheckOutcome::pass("Podfile.lock", ""),
            None => CheckOutcome::fail("Podfile.lock", "not found, run `pod install`"),
        });

        const MANIFEST: &str = "Pods/Manifest.lock";
        let manifest = std::fs::read(project.join(MANIFEST)).ok();
        report.push(match (&manifest, &lock) {
            (None, _) => CheckOutcome::fail(MANIFEST, "not found, run `pod install`"),
            (Some(_), None) => CheckOutcome::fail(MANIFEST, "no Podfile.lock to compare with"),
            (Some(manifest), Some(lock)) if manifest == lock => {
                CheckOutcome::pass(MANIFEST, "matches Podfile.lock")
            }
            (Some(_), Some(_)) => CheckOutcome::fail(
                MANIFEST,
                "differs from Podfile.lock, run `pod install`",
            ),
        });

        const WORKSPACE: &str = "Unity-iPhone.xcworkspace";
        report.push(if project.join(WORKSPACE).is_dir() {
            CheckOutcome::pass(WORKSPACE, "")
        } else {
            CheckOutcome::fail(WORKSPACE, "not found, open the workspace not the project")
        });

        report
    }
}

/// Raises the Podfile deployment target in place. Writes only when
/// something changed.
pub fn patch_podfile(project: &Path, min_ios: Version) -> Result<PatchOutcome, PipelineError> {
    let path = project.join("Podfile");
    let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PipelineError::MissingPath {
            what: "Podfile",
            path: path.clone(),
        },
        _ => PipelineError::Io(e),
    })?;
    let outcome = podfile::patch(&content, min_ios);
    if !outcome.changes.is_empty() {
        std::fs::write(&path, &outcome.content)?;
        tracing::info!(path = %path.display(), changes = outcome.changes.len(), "Podfile patched");
    }
    Ok(outcome)
}
