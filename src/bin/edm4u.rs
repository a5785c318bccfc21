//! EDM4U Binary
//!
//! Verifies and writes the External Dependency Manager settings the iOS
//! build relies on, and forces a dependency resolve in batch mode.
//!
//! Environment Variables:
//! - UNITY_PATH: Unity editor executable used by `resolve`

use clap::{Parser, Subcommand};
use pipewright::adapters::local::SystemRunner;
use pipewright::application::edm4u::{self, pod_candidates, Edm4uService};
use pipewright::{cli, console, telemetry};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(version, about = "Verify and configure the External Dependency Manager for Unity")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Unity project root
    #[arg(long, default_value = ".", global = true)]
    project: PathBuf,

    /// Print the verify report as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a PASS/FAIL line per check, exit 1 if any failed
    Verify,
    /// Write the iOS resolver settings into GvhProjectSettings.xml
    Configure {
        /// Pod tool to record (default: found on PATH or in the usual install locations)
        #[arg(long)]
        pod: Option<PathBuf>,
    },
    /// Force a dependency resolve in a batch-mode editor
    Resolve {
        /// Unity editor executable
        #[arg(long, env = "UNITY_PATH")]
        unity: Option<PathBuf>,
    },
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let service = Edm4uService::new(SystemRunner);
    match args.command {
        Command::Verify => cli::print_report(&edm4u::verify(&args.project), args.json),
        Command::Configure { pod } => {
            let outcome = service.configure(&args.project, pod.as_deref(), &pod_candidates())?;
            if outcome.changed.is_empty() {
                console::ok(format!("{} already configured", outcome.settings_path.display()));
            } else {
                for setting in &outcome.changed {
                    console::ok(format!("set {}", setting));
                }
            }
            console::ok(format!("pod tool: {}", outcome.pod_tool.display()));
            Ok(ExitCode::SUCCESS)
        }
        Command::Resolve { unity } => {
            console::step(format!("resolving dependencies in {}", args.project.display()));
            service.resolve(&args.project, unity.as_deref()).await?;
            console::ok("dependencies resolved");
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args::<Args>() {
        Ok(args) => args,
        Err(code) => return code,
    };
    telemetry::init();
    cli::finish(run(args).await)
}
