use crate::ports::command::{CommandRunner, Invocation};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command as TokioCommand;

/// Runs invocations as child processes.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Looks `program` up in the directories of `path_var`. Paths containing a
/// separator are checked as-is.
pub fn search_path(program: &str, path_var: Option<&std::ffi::OsStr>) -> Option<PathBuf> {
    if program.contains(std::path::MAIN_SEPARATOR) {
        let candidate = PathBuf::from(program);
        return is_executable(&candidate).then_some(candidate);
    }
    std::env::split_paths(path_var?)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> io::Result<Output> {
        let mut command = TokioCommand::new(&invocation.program);
        command.args(&invocation.args);
        if let Some(dir) = &invocation.cwd {
            command.current_dir(dir);
        }
        tracing::debug!(command = %invocation.display(), "spawning");
        command.output().await
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        search_path(program, std::env::var_os("PATH").as_deref())
    }
}
