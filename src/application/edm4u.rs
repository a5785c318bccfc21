//! External Dependency Manager for Unity: verify the iOS resolver settings,
//! write them, and force a resolve through a batch-mode editor.

use crate::domain::checks::{CheckOutcome, CheckReport};
use crate::domain::edm4u::{
    apply_ios_integration, ios_pods, manifest_has_package, GvhSettings, IntegrationMethod,
    COCOAPODS_INSTALL_ENABLED, COCOAPODS_INTEGRATION_METHOD, LEGACY_PLUGIN_DIR, POD_TOOL_VIA_SHELL,
    SETTINGS_FILE,
};
use crate::error::{ConfigError, PipelineError};
use crate::ports::command::{CommandRunner, Invocation};
use std::path::{Path, PathBuf};

pub const RESOLVE_METHOD: &str = "GooglePlayServices.PlayServicesResolver.MenuForceResolve";

/// Install locations tried after `PATH`.
pub fn pod_candidates() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/opt/homebrew/bin/pod"),
        PathBuf::from("/usr/local/bin/pod"),
        crate::config::expand_home("~/.gem/bin/pod"),
    ]
}

/// `*Dependencies.xml` files under `root`, sorted.
fn dependency_files(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                pending.push(path);
            } else if path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with("Dependencies.xml"))
                .unwrap_or(false)
            {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

fn check_installed(project: &Path) -> CheckOutcome {
    const NAME: &str = "EDM4U installed";
    let manifest = project.join("Packages/manifest.json");
    if let Ok(content) = std::fs::read_to_string(&manifest) {
        match manifest_has_package(&content) {
            Ok(true) => return CheckOutcome::pass(NAME, "Packages/manifest.json"),
            Ok(false) => {}
            Err(e) => return CheckOutcome::fail(NAME, format!("Packages/manifest.json: {}", e)),
        }
    }
    if project.join(LEGACY_PLUGIN_DIR).is_dir() {
        CheckOutcome::pass(NAME, LEGACY_PLUGIN_DIR)
    } else {
        CheckOutcome::fail(
            NAME,
            "not in Packages/manifest.json and no Assets/ExternalDependencyManager",
        )
    }
}

fn check_flag(settings: Option<&GvhSettings>, name: &'static str, label: &str) -> CheckOutcome {
    match settings.map(|s| s.get_bool(name)) {
        None => CheckOutcome::fail(label, "no settings file"),
        Some(Some(true)) => CheckOutcome::pass(label, "enabled"),
        Some(Some(false)) => CheckOutcome::fail(label, format!("{} is False", name)),
        Some(None) => CheckOutcome::fail(label, format!("{} is not set", name)),
    }
}

fn check_pinned_pods(project: &Path) -> CheckOutcome {
    const NAME: &str = "iOS pods pinned";
    let assets = project.join("Assets");
    if !assets.is_dir() {
        return CheckOutcome::fail(NAME, "no Assets directory");
    }
    let files = match dependency_files(&assets) {
        Ok(files) => files,
        Err(e) => return CheckOutcome::fail(NAME, e.to_string()),
    };

    let mut declared = 0;
    let mut unpinned = Vec::new();
    for file in &files {
        let Ok(content) = std::fs::read_to_string(file) else {
            unpinned.push(format!("{} (unreadable)", file.display()));
            continue;
        };
        for pod in ios_pods(&content) {
            declared += 1;
            if pod.version.is_none() {
                let relative = file.strip_prefix(project).unwrap_or(file);
                unpinned.push(format!("{} in {}", pod.name, relative.display()));
            }
        }
    }

    if unpinned.is_empty() {
        CheckOutcome::pass(NAME, format!("{} pod(s) in {} file(s)", declared, files.len()))
    } else {
        CheckOutcome::fail(NAME, format!("no version for {}", unpinned.join(", ")))
    }
}

/// Runs every check against the Unity project at `project`.
pub fn verify(project: &Path) -> CheckReport {
    let mut report = CheckReport::default();
    report.push(check_installed(project));

    let settings_path = project.join(SETTINGS_FILE);
    let settings = std::fs::read_to_string(&settings_path)
        .ok()
        .map(|xml| GvhSettings::parse(&xml));
    report.push(match &settings {
        Some(s) => CheckOutcome::pass(SETTINGS_FILE, format!("{} setting(s)", s.len())),
        None => CheckOutcome::fail(SETTINGS_FILE, "not found, run `edm4u configure`"),
    });

    report.push(check_flag(
        settings.as_ref(),
        COCOAPODS_INSTALL_ENABLED,
        "CocoaPods install",
    ));

    const METHOD: &str = "integration method";
    report.push(
        match settings
            .as_ref()
            .map(|s| s.get(COCOAPODS_INTEGRATION_METHOD).map(IntegrationMethod::from_setting))
        {
            None => CheckOutcome::fail(METHOD, "no settings file"),
            Some(Some(Some(IntegrationMethod::Workspace))) => {
                CheckOutcome::pass(METHOD, "Workspace")
            }
            Some(Some(Some(other))) => {
                CheckOutcome::fail(METHOD, format!("{:?}, expected Workspace", other))
            }
            Some(Some(None)) => CheckOutcome::fail(METHOD, "unrecognised value"),
            Some(None) => CheckOutcome::fail(METHOD, format!("{} is not set", COCOAPODS_INTEGRATION_METHOD)),
        },
    );

    report.push(check_flag(
        settings.as_ref(),
        POD_TOOL_VIA_SHELL,
        "pod tool via shell",
    ));
    report.push(check_pinned_pods(project));
    report
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigureOutcome {
    pub settings_path: PathBuf,
    pub pod_tool: PathBuf,
    pub changed: Vec<&'static str>,
}

pub struct Edm4uService<R> {
    runner: R,
}

impl<R: CommandRunner> Edm4uService<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// The pod tool: `explicit` if given, then `PATH`, then the usual
    /// install locations.
    pub fn locate_pod(&self, explicit: Option<&Path>, candidates: &[PathBuf]) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return path.is_file().then(|| path.to_path_buf());
        }
        self.runner
            .locate("pod")
            .or_else(|| candidates.iter().find(|c| c.is_file()).cloned())
    }

    /// Upserts the iOS resolver settings, creating the file when missing.
    pub fn configure(
        &self,
        project: &Path,
        explicit_pod: Option<&Path>,
        candidates: &[PathBuf],
    ) -> Result<ConfigureOutcome, PipelineError> {
        let pod_tool = self
            .locate_pod(explicit_pod, candidates)
            .ok_or_else(|| PipelineError::MissingTool("pod".into()))?;

        let settings_path = project.join(SETTINGS_FILE);
        let mut settings = match std::fs::read_to_string(&settings_path) {
            Ok(xml) => GvhSettings::parse(&xml),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => GvhSettings::default(),
            Err(e) => return Err(e.into()),
        };
        let changed = apply_ios_integration(&mut settings, &pod_tool.display().to_string());
        if !changed.is_empty() {
            if let Some(parent) = settings_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&settings_path, settings.render())?;
            tracing::info!(path = %settings_path.display(), changed = ?changed, "settings written");
        }

        Ok(ConfigureOutcome {
            settings_path,
            pod_tool,
            changed,
        })
    }

    /// Forces a dependency resolve in a batch-mode editor.
    pub async fn resolve(&self, project: &Path, unity: Option<&Path>) -> Result<(), PipelineError> {
        let unity = unity.ok_or(ConfigError::Missing("UNITY_PATH"))?;
        if !unity.exists() {
            return Err(PipelineError::MissingPath {
                what: "Unity editor",
                path: unity.to_path_buf(),
            });
        }
        if !project.join("Assets").is_dir() {
            return Err(PipelineError::MissingPath {
                what: "Unity project",
                path: project.to_path_buf(),
            });
        }

        let invocation = Invocation::new(unity.display().to_string()).args([
            "-batchmode".to_string(),
            "-nographics".to_string(),
            "-quit".to_string(),
            "-projectPath".to_string(),
            project.display().to_string(),
            "-executeMethod".to_string(),
            RESOLVE_METHOD.to_string(),
            "-logFile".to_string(),
            "-".to_string(),
        ]);
        tracing::info!(command = %invocation.display(), "resolving");
        let output = self.runner.run(&invocation).await?;
        if !output.status.success() {
            // Unity writes its log to stdout with `-logFile -`.
            let log = String::from_utf8_lossy(&output.stdout);
            let tail: Vec<&str> = log.lines().rev().take(20).collect();
            return Err(PipelineError::CommandFailed {
                program: "Unity".into(),
                status: output.status.to_string(),
                stderr: tail.into_iter().rev().collect::<Vec<_>>().join("\n"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::edm4u::{AUTO_POD_TOOL_INSTALL, POD_TOOL_PATH};
    use crate::ports::command::MockCommandRunner;
    use std::fs;
    use std::os::unix::process::ExitStatusExt;
    use std::process::{ExitStatus, Output};
    use tempfile::tempdir;

    fn create_mock_std_output(stdout_str: &str, success: bool) -> Output {
        Output {
            status: if success {
                ExitStatus::from_raw(0)
            } else {
                ExitStatus::from_raw(256)
            },
            stdout: stdout_str.as_bytes().to_vec(),
            stderr: Vec::new(),
        }
    }

    fn unity_project() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("Packages")).unwrap();
        fs::write(
            root.join("Packages/manifest.json"),
            r#"{"dependencies":{"com.google.external-dependency-manager":"1.2.179","com.unity.addressables":"1.21.19"}}"#,
        )
        .unwrap();
        fs::create_dir_all(root.join("Assets/Firebase/Editor")).unwrap();
        fs::write(
            root.join("Assets/Firebase/Editor/AnalyticsDependencies.xml"),
            r#"<dependencies><iosPods><iosPod name="Firebase/Analytics" version="10.22.0" /></iosPods></dependencies>"#,
        )
        .unwrap();
        dir
    }

    fn pod_on_path() -> MockCommandRunner {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_locate()
            .returning(|_| Some(PathBuf::from("/opt/homebrew/bin/pod")));
        runner
    }

    #[test]
    fn configure_then_verify_passes() {
        let dir = unity_project();
        let service = Edm4uService::new(pod_on_path());

        let before = verify(dir.path());
        assert_eq!(before.checks.len(), 6);
        assert_eq!(before.failures(), 4);

        let outcome = service.configure(dir.path(), None, &[]).unwrap();
        assert_eq!(outcome.pod_tool, PathBuf::from("/opt/homebrew/bin/pod"));
        assert_eq!(outcome.changed.len(), 5);

        let after = verify(dir.path());
        assert_eq!(after.failures(), 0, "{:?}", after.checks);

        let settings =
            GvhSettings::parse(&fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap());
        assert_eq!(settings.get(POD_TOOL_PATH), Some("/opt/homebrew/bin/pod"));
        assert_eq!(settings.get_bool(AUTO_POD_TOOL_INSTALL), Some(false));

        assert!(service.configure(dir.path(), None, &[]).unwrap().changed.is_empty());
    }

    #[test]
    fn configure_keeps_unrelated_settings() {
        let dir = unity_project();
        fs::create_dir_all(dir.path().join("ProjectSettings")).unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"<?xml version="1.0" encoding="utf-8"?>
<projectSettings>
  <projectSetting name="Google.PackageManagerResolver.VerboseLoggingEnabled" value="True" />
</projectSettings>
"#,
        )
        .unwrap();

        Edm4uService::new(pod_on_path())
            .configure(dir.path(), None, &[])
            .unwrap();
        let settings =
            GvhSettings::parse(&fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap());
        assert_eq!(
            settings.get("Google.PackageManagerResolver.VerboseLoggingEnabled"),
            Some("True")
        );
    }

    #[test]
    fn locate_pod_falls_back_to_candidates() {
        let dir = tempdir().unwrap();
        let candidate = dir.path().join("pod");
        fs::write(&candidate, "#!/bin/sh\n").unwrap();

        let mut runner = MockCommandRunner::new();
        runner.expect_locate().returning(|_| None);
        let service = Edm4uService::new(runner);

        let missing = dir.path().join("missing-pod");
        assert_eq!(
            service.locate_pod(None, &[missing.clone(), candidate.clone()]),
            Some(candidate.clone())
        );
        assert_eq!(service.locate_pod(Some(missing.as_path()), &[candidate]), None);
        assert!(matches!(
            service.configure(dir.path(), None, &[missing]),
            Err(PipelineError::MissingTool(_))
        ));
    }

    #[test]
    fn unpinned_pods_fail_verification() {
        let dir = unity_project();
        fs::write(
            dir.path().join("Assets/Firebase/Editor/MessagingDependencies.xml"),
            r#"<dependencies><iosPods><iosPod name="Firebase/Messaging" /></iosPods></dependencies>"#,
        )
        .unwrap();
        let report = verify(dir.path());
        let last = report.checks.last().unwrap();
        assert!(!last.passed);
        assert!(last.detail.contains("Firebase/Messaging"));
    }

    #[test]
    fn legacy_plugin_directory_counts_as_installed() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(LEGACY_PLUGIN_DIR)).unwrap();
        assert!(check_installed(dir.path()).passed);
        assert!(!check_installed(tempdir().unwrap().path()).passed);
    }

    #[tokio::test]
    async fn resolve_runs_unity_in_batch_mode() {
        let dir = unity_project();
        let unity = dir.path().join("Unity");
        fs::write(&unity, "").unwrap();

        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|inv| {
                inv.args.contains(&"-batchmode".to_string())
                    && inv.args.contains(&RESOLVE_METHOD.to_string())
            })
            .times(1)
            .returning(|_| Ok(create_mock_std_output("Resolution Succeeded\n", true)));

        Edm4uService::new(runner)
            .resolve(dir.path(), Some(unity.as_path()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn resolve_failure_carries_the_log_tail() {
        let dir = unity_project();
        let unity = dir.path().join("Unity");
        fs::write(&unity, "").unwrap();

        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_| Ok(create_mock_std_output("Loading\nResolution Failed\n", false)));

        let err = Edm4uService::new(runner)
            .resolve(dir.path(), Some(unity.as_path()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Resolution Failed"));
    }

    #[tokio::test]
    async fn resolve_needs_a_unity_path() {
        let dir = unity_project();
        let mut runner = MockCommandRunner::new();
        runner.expect_run().never();
        assert!(matches!(
            Edm4uService::new(runner).resolve(dir.path(), None).await,
            Err(PipelineError::Config(ConfigError::Missing("UNITY_PATH")))
        ));
    }
}
