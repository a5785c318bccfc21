//! CocoaPods Binary
//!
//! `verify` checks the Unity-generated Xcode project is ready for
//! `xcodebuild`; `patch` raises the Podfile deployment target.

use clap::{Args as ClapArgs, Parser, Subcommand};
use pipewright::adapters::local::SystemRunner;
use pipewright::application::cocoapods::{patch_podfile, CocoaPodsService};
use pipewright::domain::podfile::Version;
use pipewright::{cli, console, telemetry};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(version, about = "Verify and patch CocoaPods setup for the iOS build")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Print the verify report as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(ClapArgs, Debug)]
struct Target {
    /// Unity iOS build directory
    #[arg(long, default_value = "Builds/iOS")]
    project: PathBuf,

    /// Minimum iOS deployment target
    #[arg(long, default_value = "13.0", value_parser = parse_version)]
    min_ios: Version,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a PASS/FAIL line per check, exit 1 if any failed
    Verify(Target),
    /// Raise the Podfile deployment target and pin it on every pod target
    Patch(Target),
}

fn parse_version(raw: &str) -> Result<Version, String> {
    Version::parse(raw).ok_or_else(|| format!("not a version: {}", raw))
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    match args.command {
        Command::Verify(target) => {
            let report = CocoaPodsService::new(SystemRunner)
                .verify(&target.project, target.min_ios)
                .await;
            cli::print_report(&report, args.json)
        }
        Command::Patch(target) => {
            let outcome = patch_podfile(&target.project, target.min_ios)?;
            if outcome.changes.is_empty() {
                console::ok("Podfile already up to date");
            }
            for change in &outcome.changes {
                console::ok(change);
            }
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
