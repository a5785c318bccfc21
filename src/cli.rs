//! Entry-point plumbing shared by the binaries.

use crate::console;
use crate::domain::checks::CheckReport;
use serde::Serialize;
use std::process::ExitCode;

#[derive(Serialize)]
struct JsonOut<'a, T> {
    ok: bool,
    data: &'a T,
}

/// Prints `{"ok": .., "data": ..}` on stdout for `--json` runs.
pub fn print_json<T: Serialize>(ok: bool, data: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&JsonOut { ok, data })?);
    Ok(())
}

/// Parses arguments. `--help` and `--version` exit 0, every other parse
/// error exits 1.
pub fn parse_args<P: clap::Parser>() -> Result<P, ExitCode> {
    P::try_parse().map_err(|e| {
        let code = if e.use_stderr() { 1 } else { 0 };
        let _ = e.print();
        ExitCode::from(code)
    })
}

/// Reports a failed run and maps it to exit code 1.
pub fn finish(result: anyhow::Result<ExitCode>) -> ExitCode {
    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(error = ?e, "run failed");
            console::fail(format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

/// Prints one `PASS`/`FAIL` line per check, or the whole report as JSON,
/// and returns the report's exit code.
pub fn print_report(report: &CheckReport, json: bool) -> anyhow::Result<ExitCode> {
    if json {
        print_json(report.failures() == 0, report)?;
    } else {
        for check in &report.checks {
            let level = if check.passed {
                console::Level::Ok
            } else {
                console::Level::Fail
            };
            console::print(level, check.line());
        }
    }
    if report.failures() > 0 {
        tracing::warn!(failures = report.failures(), "checks failed");
    }
    Ok(ExitCode::from(report.exit_code()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::checks::CheckOutcome;

    #[test]
    fn json_envelope_carries_ok_and_data() {
        let mut report = CheckReport::default();
        report.push(CheckOutcome::pass("Podfile", "Builds/iOS/Podfile"));
        report.push(CheckOutcome::fail("Podfile.lock", "not found"));

        let value = serde_json::to_value(JsonOut {
            ok: report.failures() == 0,
            data: &report,
        })
        .unwrap();
        assert_eq!(value["ok"], false);
        assert_eq!(value["data"]["checks"][1]["name"], "Podfile.lock");
        assert_eq!(value["data"]["checks"][1]["passed"], false);
    }
}
