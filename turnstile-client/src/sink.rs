//! Report sinks shipped with the client.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;
use turnstile_license::{LicenseError, LicenseResult, ReportSink, UsageReport};

/// Writes reports as pretty JSON to a file, or to stdout.
#[derive(Debug, Clone, Default)]
pub struct JsonReportSink {
    path: Option<PathBuf>,
}

impl JsonReportSink {
    #[must_use]
    pub fn stdout() -> Self {
        Self { path: None }
    }

    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}

impl ReportSink for JsonReportSink {
    fn send(&self, report: &UsageReport) -> LicenseResult<()> {
        let json = report.to_json()?;
        match &self.path {
            Some(path) => {
                fs::write(path, json).map_err(|e| {
                    LicenseError::Storage(format!("writing {}: {e}", path.display()))
                })?;
                info!(path = %path.display(), "usage report written");
            }
            None => {
                let mut out = io::stdout().lock();
                writeln!(out, "{json}")
                    .map_err(|e| LicenseError::Storage(format!("writing report: {e}")))?;
            }
        }
        Ok(())
    }
}
