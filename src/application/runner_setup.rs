use crate::domain::runner::{adb_devices, RunnerRegistration, REDACTED};
use crate::error::PipelineError;
use crate::ports::command::{CommandRunner, Invocation};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
pub struct RunnerSetup {
    pub registration: RunnerRegistration,
    pub runner_dir: PathBuf,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SetupReport {
    /// `None` when `adb` is not installed.
    pub devices: Option<Vec<String>>,
}

pub struct RunnerSetupService<R> {
    runner: R,
}

impl<R: CommandRunner> RunnerSetupService<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Host name reported by `hostname`, used as the default runner name.
    pub async fn host_name(&self) -> Option<String> {
        let output = self.runner.run(&Invocation::new("hostname")).await.ok()?;
        if !output.status.success() {
            return None;
        }
        let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!name.is_empty()).then_some(name)
    }

    async fn run_step(
        &self,
        setup: &RunnerSetup,
        script: &str,
        args: Vec<String>,
    ) -> Result<(), PipelineError> {
        let token = &setup.registration.token;
        let invocation = Invocation::new(setup.runner_dir.join(script).display().to_string())
            .args(args)
            .current_dir(&setup.runner_dir)
            .with_secret(token.as_str());
        tracing::info!(command = %invocation.display(), "running");
        let output = self.runner.run(&invocation).await?;
        if !output.status.success() {
            return Err(PipelineError::CommandFailed {
                program: script.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr)
                    .trim()
                    .replace(token.as_str(), REDACTED),
            });
        }
        Ok(())
    }

    /// Validates the host, registers the runner and starts it as a service.
    pub async fn setup(&self, setup: &RunnerSetup) -> Result<SetupReport, PipelineError> {
        setup.registration.validate()?;

        if let Some(path) = missing_runner_script(&setup.runner_dir) {
            return Err(PipelineError::MissingPath {
                what: "runner script",
                path,
            });
        }
        if self.runner.locate("git").is_none() {
            return Err(PipelineError::MissingTool("git".into()));
        }

        let devices = self.list_devices().await;

        tracing::info!(args = ?setup.registration.redacted_args(), "registering runner");
        self.run_step(setup, "config.sh", setup.registration.config_args())
            .await?;
        for action in ["install", "start"] {
            self.run_step(setup, "svc.sh", vec![action.to_string()]).await?;
        }

        Ok(SetupReport { devices })
    }

    async fn list_devices(&self) -> Option<Vec<String>> {
        self.runner.locate("adb")?;
        match self.runner.run(&Invocation::new("adb").arg("devices")).await {
            Ok(output) if output.status.success() => {
                Some(adb_devices(&String::from_utf8_lossy(&output.stdout)))
            }
            Ok(output) => {
                tracing::warn!(stderr = %String::from_utf8_lossy(&output.stderr).trim(), "adb devices failed");
                Some(Vec::new())
            }
            Err(e) => {
                tracing::warn!(error = %e, "adb devices failed");
                Some(Vec::new())
            }
        }
    }
}

/// Default runner directory, `~/actions-runner`.
pub fn default_runner_dir() -> PathBuf {
    crate::config::expand_home("~/actions-runner")
}

/// First of `config.sh` and `svc.sh` missing from an unpacked runner package.
pub fn missing_runner_script(dir: &Path) -> Option<PathBuf> {
    ["config.sh", "svc.sh"]
        .iter()
        .map(|script| dir.join(script))
        .find(|path| !path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::runner::parse_labels;
    use crate::ports::command::MockCommandRunner;
    use mockall::Sequence;
    use std::fs;
    use std::os::unix::process::ExitStatusExt;
    use std::process::{ExitStatus, Output};
    use tempfile::tempdir;

    fn create_mock_std_output(stdout_str: &str, stderr_str: &str, success: bool) -> Output {
        Output {
            status: if success {
                ExitStatus::from_raw(0)
            } else {
                ExitStatus::from_raw(256)
            },
            stdout: stdout_str.as_bytes().to_vec(),
            stderr: stderr_str.as_bytes().to_vec(),
        }
    }

    fn runner_dir() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("config.sh"), "#!/bin/sh\n").unwrap();
        fs::write(dir.path().join("svc.sh"), "#!/bin/sh\n").unwrap();
        dir
    }

    fn setup(dir: &Path) -> RunnerSetup {
        RunnerSetup {
            registration: RunnerRegistration {
                url: "https://github.com/studio/game".into(),
                token: "SECRET123".into(),
                name: "build-mac".into(),
                labels: parse_labels("self-hosted,unity"),
                replace: false,
            },
            runner_dir: dir.to_path_buf(),
        }
    }

    #[tokio::test]
    async fn registers_then_installs_and_starts_the_service() {
        let dir = runner_dir();
        assert_eq!(missing_runner_script(dir.path()), None);
        let mut runner = MockCommandRunner::new();
        runner
            .expect_locate()
            .returning(|program| (program == "git").then(|| PathBuf::from("/usr/bin/git")));

        let mut seq = Sequence::new();
        runner
            .expect_run()
            .withf(|inv| inv.program.ends_with("config.sh") && inv.args.contains(&"SECRET123".to_string()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(create_mock_std_output("", "", true)));
        runner
            .expect_run()
            .withf(|inv| inv.program.ends_with("svc.sh") && inv.args == ["install"])
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(create_mock_std_output("", "", true)));
        runner
            .expect_run()
            .withf(|inv| inv.program.ends_with("svc.sh") && inv.args == ["start"])
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(create_mock_std_output("", "", true)));

        let report = RunnerSetupService::new(runner)
            .setup(&setup(dir.path()))
            .await
            .unwrap();
        assert_eq!(report.devices, None);
    }

    #[tokio::test]
    async fn lists_adb_devices_when_available() {
        let dir = runner_dir();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_locate()
            .returning(|program| Some(PathBuf::from("/usr/bin").join(program)));
        runner
            .expect_run()
            .withf(|inv| inv.program == "adb")
            .returning(|_| {
                Ok(create_mock_std_output(
                    "List of devices attached\nR58M123ABC\tdevice\n",
                    "",
                    true,
                ))
            });
        runner
            .expect_run()
            .withf(|inv| inv.program != "adb")
            .times(3)
            .returning(|_| Ok(create_mock_std_output("", "", true)));

        let report = RunnerSetupService::new(runner)
            .setup(&setup(dir.path()))
            .await
            .unwrap();
        assert_eq!(report.devices, Some(vec!["R58M123ABC".to_string()]));
    }

    #[tokio::test]
    async fn config_failure_redacts_the_token() {
        let dir = runner_dir();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_locate()
            .returning(|program| (program == "git").then(|| PathBuf::from("/usr/bin/git")));
        runner.expect_run().times(1).returning(|_| {
            Ok(create_mock_std_output(
                "",
                "Http response code: NotFound for token SECRET123",
                false,
            ))
        });

        let err = RunnerSetupService::new(runner)
            .setup(&setup(dir.path()))
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("config.sh"));
        assert!(!message.contains("SECRET123"));
    }

    #[tokio::test]
    async fn missing_scripts_or_git_fail_before_running_anything() {
        let empty = tempdir().unwrap();
        let mut runner = MockCommandRunner::new();
        runner.expect_run().never();
        let service = RunnerSetupService::new(runner);
        assert!(matches!(
            service.setup(&setup(empty.path())).await,
            Err(PipelineError::MissingPath { ref path, .. }) if path.ends_with("config.sh")
        ));

        fs::write(empty.path().join("config.sh"), "#!/bin/sh\n").unwrap();
        assert_eq!(
            missing_runner_script(empty.path()),
            Some(empty.path().join("svc.sh"))
        );

        let dir = runner_dir();
        let mut runner = MockCommandRunner::new();
        runner.expect_locate().returning(|_| None);
        runner.expect_run().never();
        assert!(matches!(
            RunnerSetupService::new(runner).setup(&setup(dir.path())).await,
            Err(PipelineError::MissingTool(ref tool)) if tool == "git"
        ));
    }

    #[tokio::test]
    async fn host_name_from_command() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|inv| inv.program == "hostname")
            .returning(|_| Ok(create_mock_std_output("mac-mini-02\n", "", true)));
        assert_eq!(
            RunnerSetupService::new(runner).host_name().await.as_deref(),
            Some("mac-mini-02")
        );
    }
}
