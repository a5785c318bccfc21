//! Published spreadsheet data: download each sheet as CSV, mirror the
//! output directory to the CDN origin, and a smoke test for the whole chain.

use crate::application::mirror::{invalidate, mirror, Invalidation, SyncSummary};
use crate::config::DataSyncConfig;
use crate::domain::checks::{CheckOutcome, CheckReport};
use crate::domain::destination::Destination;
use crate::domain::sheets::{check_csv, parse_sheet_list, Sheet};
use crate::domain::sync_plan::scan_local;
use crate::error::{ConfigError, PipelineError};
use crate::ports::cdn::CdnInvalidator;
use crate::ports::http::HttpFetcher;
use crate::ports::identity::IdentityProbe;
use crate::ports::storage::ObjectStore;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

/// Config data changes between builds, so edge caches keep it briefly.
pub const CONFIG_CACHE_CONTROL: &str = "public, max-age=60";

/// What a sync reads from and writes to, resolved without network access.
#[derive(Clone, Debug)]
pub struct SyncTarget {
    pub sheets: Vec<Sheet>,
    pub destination: Destination,
}

pub fn read_sheets(path: &Path) -> Result<Vec<Sheet>, PipelineError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PipelineError::MissingPath {
            what: "sheet list",
            path: path.to_path_buf(),
        },
        _ => PipelineError::Io(e),
    })?;
    let sheets = parse_sheet_list(&content)?;
    if sheets.is_empty() {
        return Err(PipelineError::Check(format!(
            "{} lists no sheets",
            path.display()
        )));
    }
    Ok(sheets)
}

pub fn destination(config: &DataSyncConfig) -> Result<Destination, ConfigError> {
    let raw = config
        .s3_path
        .as_deref()
        .ok_or(ConfigError::Missing(DataSyncConfig::S3_PATH))?;
    Destination::parse(DataSyncConfig::S3_PATH, raw)
}

pub fn load_target(config: &DataSyncConfig) -> Result<SyncTarget, PipelineError> {
    Ok(SyncTarget {
        sheets: read_sheets(&config.sheets_file)?,
        destination: destination(config)?,
    })
}

/// First two smoke-test checks. Returns the target when both pass.
pub fn preflight(config: &DataSyncConfig, report: &mut CheckReport) -> Option<SyncTarget> {
    let sheets = match read_sheets(&config.sheets_file) {
        Ok(sheets) => {
            report.push(CheckOutcome::pass(
                "sheet list",
                format!("{} sheet(s) in {}", sheets.len(), config.sheets_file.display()),
            ));
            sheets
        }
        Err(e) => {
            report.push(CheckOutcome::fail("sheet list", e.to_string()));
            return None;
        }
    };

    match destination(config) {
        Ok(destination) => {
            report.push(CheckOutcome::pass("destination", destination.to_string()));
            Some(SyncTarget {
                sheets,
                destination,
            })
        }
        Err(e) => {
            report.push(CheckOutcome::fail("destination", e.to_string()));
            None
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DownloadedSheet {
    pub name: String,
    /// Lines including the header.
    pub rows: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DataSyncReport {
    pub downloaded: Vec<DownloadedSheet>,
    pub summary: SyncSummary,
    pub invalidation: Invalidation,
}

pub struct DataSyncService<H, S, I, C> {
    fetcher: H,
    store: S,
    identity: Option<I>,
    cdn: Option<C>,
}

impl<H, S, I, C> DataSyncService<H, S, I, C>
where
    H: HttpFetcher,
    S: ObjectStore,
    I: IdentityProbe,
    C: CdnInvalidator,
{
    /// `identity` and `cdn` are `None` for local destinations.
    pub fn new(fetcher: H, store: S, identity: Option<I>, cdn: Option<C>) -> Self {
        Self {
            fetcher,
            store,
            identity,
            cdn,
        }
    }

    async fn fetch_csv(&self, sheet: &Sheet) -> Result<(String, usize), PipelineError> {
        let download_error = |source: crate::error::BoxError| PipelineError::Download {
            name: sheet.name.clone(),
            source,
        };
        let response = self
            .fetcher
            .get_text(&sheet.url)
            .await
            .map_err(download_error)?;
        if !response.is_success() {
            return Err(download_error(
                format!("HTTP {}", response.status).into(),
            ));
        }
        let rows = check_csv(&response.body).map_err(|p| download_error(p.to_string().into()))?;
        Ok((response.body, rows))
    }

    /// Remaining smoke-test checks after [`preflight`]. Stops at the first
    /// failure.
    pub async fn check(&self, target: &SyncTarget, report: &mut CheckReport) {
        match &self.identity {
            None => report.push(CheckOutcome::pass(
                "credentials",
                "skipped for local destination",
            )),
            Some(identity) => match identity.caller_identity().await {
                Ok(arn) => report.push(CheckOutcome::pass("credentials", arn)),
                Err(e) => {
                    report.push(CheckOutcome::fail("credentials", e.to_string()));
                    return;
                }
            },
        }

        let prefix = target.destination.prefix();
        if let Err(e) = self.store.probe(prefix).await {
            report.push(CheckOutcome::fail("bucket access", e.to_string()));
            return;
        }
        report.push(CheckOutcome::pass("bucket access", target.destination.to_string()));

        for sheet in &target.sheets {
            let name = format!("sheet {}", sheet.name);
            match self.fetch_csv(sheet).await {
                Ok((_, rows)) => report.push(CheckOutcome::pass(name, format!("{} line(s)", rows))),
                Err(e) => {
                    report.push(CheckOutcome::fail(name, e.to_string()));
                    return;
                }
            }
        }
    }

    /// Downloads every sheet into `output_dir`, mirrors the CSV files and
    /// invalidates the destination. Fails fast.
    pub async fn run(
        &self,
        target: &SyncTarget,
        output_dir: &Path,
        distribution_id: Option<&str>,
    ) -> Result<DataSyncReport, PipelineError> {
        tokio::fs::create_dir_all(output_dir).await?;

        let mut downloaded = Vec::with_capacity(target.sheets.len());
        for sheet in &target.sheets {
            let (body, rows) = self.fetch_csv(sheet).await?;
            let path = output_dir.join(sheet.file_name());
            tokio::fs::write(&path, body.as_bytes()).await?;
            tracing::info!(sheet = %sheet.name, rows, path = %path.display(), "downloaded");
            downloaded.push(DownloadedSheet {
                name: sheet.name.clone(),
                rows,
            });
        }

        let wanted: HashSet<String> = target.sheets.iter().map(Sheet::file_name).collect();
        let files: Vec<_> = scan_local(output_dir)?
            .into_iter()
            .filter(|file| wanted.contains(&file.relative))
            .collect();

        let summary = mirror(&self.store, &target.destination, &files, CONFIG_CACHE_CONTROL).await?;
        let invalidation = invalidate(
            self.cdn.as_ref(),
            distribution_id,
            &target.destination,
            DataSyncConfig::DISTRIBUTION_ID,
        )
        .await?;

        Ok(DataSyncReport {
            downloaded,
            summary,
            invalidation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::cdn::MockCdnInvalidator;
    use crate::ports::http::{HttpResponse, MockHttpFetcher};
    use crate::ports::identity::MockIdentityProbe;
    use crate::ports::storage::MockObjectStore;
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::tempdir;

    const SHEETS: &str = "# balance data\nitems=https://docs.example.com/items.csv\nlevels=https://docs.example.com/levels.csv\n";

    fn config(dir: &Path) -> DataSyncConfig {
        let sheets_file = dir.join("sheets.env");
        fs::write(&sheets_file, SHEETS).unwrap();
        DataSyncConfig {
            sheets_file,
            s3_path: Some("s3://game-config/live".into()),
            distribution_id: Some("E3CONFIG".into()),
            aws_profile: None,
            output_dir: dir.join("Config"),
            http_timeout: Duration::from_secs(10),
        }
    }

    fn csv_fetcher() -> MockHttpFetcher {
        let mut fetcher = MockHttpFetcher::new();
        fetcher.expect_get_text().returning(|_| {
            Ok(HttpResponse {
                status: 200,
                body: "id,name\n1,sword\n2,shield\n".into(),
            })
        });
        fetcher
    }

    fn identity_ok() -> MockIdentityProbe {
        let mut identity = MockIdentityProbe::new();
        identity
            .expect_caller_identity()
            .returning(|| Ok("arn:aws:iam::123456789012:user/ci".into()));
        identity
    }

    #[test]
    fn preflight_stops_at_missing_sheet_list() {
        let dir = tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.sheets_file = PathBuf::from("/nope/sheets.env");
        let mut report = CheckReport::default();
        assert!(preflight(&cfg, &mut report).is_none());
        assert_eq!(report.checks.len(), 1);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn preflight_requires_destination() {
        let dir = tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.s3_path = None;
        let mut report = CheckReport::default();
        assert!(preflight(&cfg, &mut report).is_none());
        assert!(report.checks[1].line().starts_with("FAIL destination"));
    }

    #[test]
    fn empty_sheet_list_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sheets.env");
        fs::write(&path, "# nothing yet\n").unwrap();
        assert!(matches!(read_sheets(&path), Err(PipelineError::Check(_))));
    }

    #[tokio::test]
    async fn check_passes_every_step() {
        let dir = tempdir().unwrap();
        let cfg = config(dir.path());
        let mut report = CheckReport::default();
        let target = preflight(&cfg, &mut report).unwrap();

        let mut store = MockObjectStore::new();
        store
            .expect_probe()
            .withf(|prefix| prefix == "live")
            .returning(|_| Ok(()));

        DataSyncService::new(csv_fetcher(), store, Some(identity_ok()), None::<MockCdnInvalidator>)
            .check(&target, &mut report)
            .await;

        assert_eq!(report.checks.len(), 6);
        assert_eq!(report.exit_code(), 0);
    }

    #[tokio::test]
    async fn check_stops_at_first_failure() {
        let dir = tempdir().unwrap();
        let cfg = config(dir.path());
        let mut report = CheckReport::default();
        let target = preflight(&cfg, &mut report).unwrap();

        let mut identity = MockIdentityProbe::new();
        identity
            .expect_caller_identity()
            .returning(|| Err("ExpiredToken".into()));
        let mut store = MockObjectStore::new();
        store.expect_probe().never();
        let mut fetcher = MockHttpFetcher::new();
        fetcher.expect_get_text().never();

        DataSyncService::new(fetcher, store, Some(identity), None::<MockCdnInvalidator>)
            .check(&target, &mut report)
            .await;

        let last = report.checks.last().unwrap();
        assert!(!last.passed);
        assert_eq!(last.name, "credentials");
        assert!(last.detail.contains("ExpiredToken"));
    }

    #[tokio::test]
    async fn check_rejects_html_sign_in_page() {
        let dir = tempdir().unwrap();
        let cfg = config(dir.path());
        let mut report = CheckReport::default();
        let target = preflight(&cfg, &mut report).unwrap();

        let mut fetcher = MockHttpFetcher::new();
        fetcher.expect_get_text().times(1).returning(|_| {
            Ok(HttpResponse {
                status: 200,
                body: "<!DOCTYPE html><html><head><title>Sign in</title></head></html>".into(),
            })
        });
        let mut store = MockObjectStore::new();
        store.expect_probe().returning(|_| Ok(()));

        DataSyncService::new(fetcher, store, None::<MockIdentityProbe>, None::<MockCdnInvalidator>)
            .check(&target, &mut report)
            .await;

        assert_eq!(report.failures(), 1);
        assert!(report.checks.last().unwrap().line().starts_with("FAIL sheet items"));
    }

    #[tokio::test]
    async fn run_downloads_mirrors_and_invalidates() {
        let dir = tempdir().unwrap();
        let cfg = config(dir.path());
        fs::create_dir_all(&cfg.output_dir).unwrap();
        fs::write(cfg.output_dir.join("README.md"), "not synced").unwrap();
        let target = load_target(&cfg).unwrap();

        let mut store = MockObjectStore::new();
        store
            .expect_list()
            .withf(|prefix| prefix == "live/")
            .returning(|_| Ok(Vec::new()));
        store
            .expect_put()
            .withf(|_, key, options| {
                key.starts_with("live/")
                    && key.ends_with(".csv")
                    && options.cache_control == CONFIG_CACHE_CONTROL
                    && options.content_type.starts_with("text/csv")
            })
            .times(2)
            .returning(|_, _, _| Ok(()));
        let mut cdn = MockCdnInvalidator::new();
        cdn.expect_invalidate()
            .withf(|id, paths| id == "E3CONFIG" && paths == ["/live/*".to_string()])
            .times(1)
            .returning(|_, _| Ok("I1".into()));

        let report = DataSyncService::new(csv_fetcher(), store, Some(identity_ok()), Some(cdn))
            .run(&target, &cfg.output_dir, cfg.distribution_id.as_deref())
            .await
            .unwrap();

        assert_eq!(report.downloaded.len(), 2);
        assert_eq!(report.downloaded[0].rows, 3);
        assert_eq!(report.summary.uploaded, 2);
        assert!(cfg.output_dir.join("levels.csv").is_file());
    }

    #[tokio::test]
    async fn run_fails_fast_on_http_error() {
        let dir = tempdir().unwrap();
        let cfg = config(dir.path());
        let target = load_target(&cfg).unwrap();

        let mut fetcher = MockHttpFetcher::new();
        fetcher.expect_get_text().times(1).returning(|_| {
            Ok(HttpResponse {
                status: 404,
                body: String::new(),
            })
        });
        let mut store = MockObjectStore::new();
        store.expect_list().never();

        let err = DataSyncService::new(fetcher, store, None::<MockIdentityProbe>, None::<MockCdnInvalidator>)
            .run(&target, &cfg.output_dir, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("HTTP 404"));
    }
}
