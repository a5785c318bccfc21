//! Runner Setup Binary
//!
//! Registers this host as a self-hosted CI runner and installs it as a
//! service. The runner package must already be unpacked in `--runner-dir`.

use clap::Parser;
use pipewright::adapters::local::SystemRunner;
use pipewright::application::runner_setup::{default_runner_dir, RunnerSetup, RunnerSetupService};
use pipewright::config;
use pipewright::domain::runner::{parse_labels, RunnerRegistration};
use pipewright::{cli, console, telemetry};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(version, about = "Register and start a self-hosted CI runner")]
struct Args {
    /// Registration token
    #[arg(long, env = "RUNNER_TOKEN", hide_env_values = true)]
    token: String,

    /// Repository or organization URL
    #[arg(long, env = "RUNNER_URL")]
    url: String,

    /// Runner name (default: host name)
    #[arg(long)]
    name: Option<String>,

    /// Comma-separated labels
    #[arg(long, default_value = "self-hosted,unity")]
    labels: String,

    /// Directory holding config.sh and svc.sh (default: ~/actions-runner)
    #[arg(long)]
    runner_dir: Option<PathBuf>,

    /// Replace an existing runner with the same name
    #[arg(long)]
    replace: bool,
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let service = RunnerSetupService::new(SystemRunner);

    let name = match args.name {
        Some(name) => name,
        None => service
            .host_name()
            .await
            .or_else(|| config::env_lookup("HOSTNAME"))
            .ok_or_else(|| anyhow::anyhow!("could not determine the host name, pass --name"))?,
    };
    let setup = RunnerSetup {
        registration: RunnerRegistration {
            url: args.url,
            token: args.token,
            name,
            labels: parse_labels(&args.labels),
            replace: args.replace,
        },
        runner_dir: args.runner_dir.unwrap_or_else(default_runner_dir),
    };

    console::step(format!(
        "registering {} at {} from {}",
        setup.registration.name,
        setup.registration.url,
        setup.runner_dir.display()
    ));
    let report = service.setup(&setup).await?;

    match &report.devices {
        None => console::warn("adb not found, Android device builds will not run on this host"),
        Some(devices) if devices.is_empty() => console::warn("adb found but no devices attached"),
        Some(devices) => console::ok(format!("attached devices: {}", devices.join(", "))),
    }
    console::ok(format!(
        "runner {} registered with labels {} and started",
        setup.registration.name,
        setup.registration.labels.join(",")
    ));
    Ok(ExitCode::SUCCESS)
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
