//! Self-hosted CI runner registration.

use crate::error::ConfigError;

pub const REDACTED: &str = "***";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunnerRegistration {
    pub url: String,
    pub token: String,
    pub name: String,
    pub labels: Vec<String>,
    pub replace: bool,
}

/// Splits a comma-separated label list, dropping blanks and duplicates.
pub fn parse_labels(raw: &str) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for label in raw.split(',').map(str::trim).filter(|l| !l.is_empty()) {
        if !labels.iter().any(|l| l.eq_ignore_ascii_case(label)) {
            labels.push(label.to_string());
        }
    }
    labels
}

impl RunnerRegistration {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.trim().is_empty() {
            return Err(ConfigError::Missing("RUNNER_TOKEN"));
        }
        if !(self.url.starts_with("https://") || self.url.starts_with("http://")) {
            return Err(ConfigError::invalid(
                "RUNNER_URL",
                &self.url,
                "expected the repository or organization URL",
            ));
        }
        if self.name.trim().is_empty() || self.name.contains(char::is_whitespace) {
            return Err(ConfigError::invalid("--name", &self.name, "runner name must be one word"));
        }
        Ok(())
    }

    /// Arguments for `./config.sh`.
    pub fn config_args(&self) -> Vec<String> {
        let mut args = vec![
            "--unattended".to_string(),
            "--url".to_string(),
            self.url.clone(),
            "--token".to_string(),
            self.token.clone(),
            "--name".to_string(),
            self.name.clone(),
        ];
        if !self.labels.is_empty() {
            args.push("--labels".to_string());
            args.push(self.labels.join(","));
        }
        if self.replace {
            args.push("--replace".to_string());
        }
        args
    }

    /// The same arguments with the token masked, safe to log.
    pub fn redacted_args(&self) -> Vec<String> {
        self.config_args()
            .into_iter()
            .map(|arg| if arg == self.token { REDACTED.to_string() } else { arg })
            .collect()
    }
}

/// Serial numbers of devices in `adb devices` output that are ready.
pub fn adb_devices(output: &str) -> Vec<String> {
    output
        .lines()
        .skip_while(|line| !line.starts_with("List of devices"))
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(serial), Some("device")) => Some(serial.to_string()),
                _ => None,
            }
        })
        .collect()
}
