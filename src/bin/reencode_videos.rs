//! Re-encode Videos Binary
//!
//! Re-encodes every video under the Unity assets directory in place, keeping
//! a byte-identical backup of each input in a timestamped directory.
//!
//! Environment Variables:
//! - VIDEO_CRF: constant rate factor, 0-51 (default 28)
//! - VIDEO_PRESET: x264 preset (default slow)
//! - VIDEO_MAX_BITRATE: rate cap, e.g. 2M (default 2M)
//! - VIDEO_AUDIO_BITRATE: audio bitrate (default 128k)

use clap::Parser;
use pipewright::adapters::local::SystemRunner;
use pipewright::application::reencoder::{FileOutcome, ReencodeOptions, ReencodeService};
use pipewright::config::{self, ReencodeConfig};
use pipewright::domain::media::{backup_stamp, default_backup_root};
use pipewright::{cli, console, telemetry};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(version, about = "Re-encode video assets in place with a backup of every input")]
struct Args {
    /// Directory searched recursively for .mp4, .mov, .m4v and .webm files
    #[arg(long, default_value = "Assets")]
    assets_dir: PathBuf,

    /// Where timestamped backup directories are created (default: VideoBackups next to the assets dir)
    #[arg(long)]
    backup_root: Option<PathBuf>,

    /// List the files and the encoder command without running it
    #[arg(long)]
    dry_run: bool,

    /// Flat KEY=VALUE file loaded before reading the environment
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Print the per-file report as JSON
    #[arg(long)]
    json: bool,
}

fn mib(bytes: u64) -> String {
    format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
}

#[cfg(feature = "native-probe")]
fn probe() -> anyhow::Result<pipewright::adapters::local::probe::NativeProbe> {
    Ok(pipewright::adapters::local::probe::NativeProbe)
}

#[cfg(not(feature = "native-probe"))]
fn probe() -> anyhow::Result<pipewright::adapters::local::FfprobeProbe<SystemRunner>> {
    use pipewright::ports::command::CommandRunner;
    if SystemRunner.locate("ffprobe").is_none() {
        return Err(pipewright::PipelineError::MissingTool("ffprobe".into()).into());
    }
    Ok(pipewright::adapters::local::FfprobeProbe::new(SystemRunner))
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    config::load_env_files(args.env_file.as_deref())?;
    let config = ReencodeConfig::from_env()?;

    let options = ReencodeOptions {
        backup_root: args
            .backup_root
            .unwrap_or_else(|| default_backup_root(&args.assets_dir)),
        assets_dir: args.assets_dir,
        stamp: backup_stamp(time::OffsetDateTime::now_utc()),
        dry_run: args.dry_run,
    };
    tracing::info!(settings = ?config.settings, "encoder settings");

    let report = if options.dry_run {
        // ffprobe is only needed once files are actually encoded
        let service = ReencodeService::new(
            SystemRunner,
            pipewright::adapters::local::FfprobeProbe::new(SystemRunner),
            config.settings,
        );
        service.run(&options).await?
    } else {
        ReencodeService::new(SystemRunner, probe()?, config.settings)
            .run(&options)
            .await?
    };

    if args.json {
        cli::print_json(report.restored() == 0, &report)?;
        return Ok(ExitCode::from(report.exit_code()));
    }

    for file in &report.files {
        let path = file.path.display();
        match &file.outcome {
            FileOutcome::Planned { command } => console::step(format!("{}: {}", path, command)),
            FileOutcome::Encoded {
                bytes_before,
                bytes_after,
            } => console::ok(format!(
                "{}: {} -> {}",
                path,
                mib(*bytes_before),
                mib(*bytes_after)
            )),
            FileOutcome::Restored { reason } => {
                console::fail(format!("{}: original restored ({})", path, reason))
            }
        }
    }

    if report.files.is_empty() {
        console::ok(format!("no videos under {}", options.assets_dir.display()));
    } else if !options.dry_run {
        let (before, after) = report.bytes();
        console::print(
            if report.restored() == 0 {
                console::Level::Ok
            } else {
                console::Level::Warn
            },
            format!(
                "{} encoded, {} restored, {} -> {}, backups in {}",
                report.encoded(),
                report.restored(),
                mib(before),
                mib(after),
                report.backup_dir.display()
            ),
        );
    }
    Ok(ExitCode::from(report.exit_code()))
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
