//! Published spreadsheet exports synced as CSV config data.

use crate::error::ConfigError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sheet {
    /// File stem of the downloaded CSV.
    pub name: String,
    pub url: String,
}

impl Sheet {
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.name)
    }
}

/// Parses a flat `name=url` list. Blank lines and `#` comments are ignored,
/// values may be quoted.
pub fn parse_sheet_list(content: &str) -> Result<Vec<Sheet>, ConfigError> {
    let mut sheets: Vec<Sheet> = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let (name, url) = line.split_once('=').ok_or_else(|| {
            ConfigError::invalid("SHEETS_FILE", raw, format!("line {}: expected name=url", index + 1))
        })?;
        let name = name.trim();
        let url = url.trim().trim_matches(|c| c == '"' || c == '\'');

        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            return Err(ConfigError::invalid(
                "SHEETS_FILE",
                raw,
                format!("line {}: sheet name must be a plain file stem", index + 1),
            ));
        }
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::invalid(
                "SHEETS_FILE",
                raw,
                format!("line {}: url must be http(s)", index + 1),
            ));
        }
        if sheets.iter().any(|s| s.name == name) {
            return Err(ConfigError::invalid(
                "SHEETS_FILE",
                raw,
                format!("line {}: duplicate sheet {}", index + 1, name),
            ));
        }

        sheets.push(Sheet {
            name: name.to_string(),
            url: url.to_string(),
        });
    }

    Ok(sheets)
}

#[derive(Debug, PartialEq, Eq)]
pub enum CsvProblem {
    Empty,
    Html,
}

impl std::fmt::Display for CsvProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CsvProblem::Empty => f.write_str("response body is empty"),
            CsvProblem::Html => {
                f.write_str("response is an HTML page (sheet not published or link wrong)")
            }
        }
    }
}

/// Rejects bodies that cannot be a CSV export. A sheet that is not
/// published to the web answers with an HTML sign-in page and a 200.
pub fn check_csv(body: &str) -> Result<usize, CsvProblem> {
    let trimmed = body.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Err(CsvProblem::Empty);
    }
    let head = trimmed
        .chars()
        .take(256)
        .collect::<String>()
        .to_ascii_lowercase();
    if head.starts_with("<!doctype html") || head.starts_with("<html") || head.contains("<head>") {
        return Err(CsvProblem::Html);
    }
    Ok(trimmed.lines().count())
}
