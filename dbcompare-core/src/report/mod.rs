//! Report rendering and export.
//!
//! A [`ComparisonReport`] renders as plain text, pretty JSON, CSV (one row per
//! count result) or a single-page HTML table.

mod csv;
mod html;
mod text;

use crate::compare::ComparisonReport;
use crate::error::CompareError;
use crate::Result;
use std::path::Path;
use std::str::FromStr;

pub use text::TextReport;

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// Pretty-printed JSON mirroring `ComparisonReport`
    Json,
    /// Count results, RFC 4180 quoting
    Csv,
    /// Styled HTML page
    Html,
    /// Plain-text summary
    Text,
}

impl ExportFormat {
    /// Conventional file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Html => "html",
            ExportFormat::Text => "txt",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "html" | "htm" => Ok(ExportFormat::Html),
            "txt" | "text" => Ok(ExportFormat::Text),
            _ => Err(CompareError::unsupported_format(s)),
        }
    }
}

/// Renders comparison reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReportGenerator;

impl ReportGenerator {
    /// Creates a generator.
    pub fn new() -> Self {
        Self
    }

    /// Plain-text summary with a count table and ✓/✗ markers.
    pub fn generate_report(&self, report: &ComparisonReport) -> String {
        TextReport::new(report).to_string()
    }

    /// Renders the report in the given format.
    pub fn export(&self, report: &ComparisonReport, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Json => {
                serde_json::to_string_pretty(report).map_err(|e| CompareError::Serialization {
                    context: format!("report {}", report.execution_id),
                    source: e,
                })
            }
            ExportFormat::Csv => Ok(csv::render(report)),
            ExportFormat::Html => html::render(report),
            ExportFormat::Text => Ok(self.generate_report(report)),
        }
    }

    /// Renders the report in a format given by name (`json`, `csv`, `html`, `txt`).
    ///
    /// # Errors
    ///
    /// Returns [`CompareError::UnsupportedFormat`] naming the format when it
    /// is not one of the above.
    pub fn export_results(&self, report: &ComparisonReport, format: &str) -> Result<String> {
        self.export(report, format.parse()?)
    }

    /// Renders the report and writes it to `path`.
    pub async fn write_report(
        &self,
        report: &ComparisonReport,
        format: ExportFormat,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let path = path.as_ref();
        let rendered = self.export(report, format)?;
        tokio::fs::write(path, rendered)
            .await
            .map_err(|e| CompareError::Io {
                context: format!("writing report {}", path.display()),
                source: e,
            })?;
        tracing::info!("Wrote {} report to {}", format, path.display());
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("txt".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert_eq!("text".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert_eq!("html".parse::<ExportFormat>().unwrap(), ExportFormat::Html);

        let err = "xml".parse::<ExportFormat>().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported export format: xml");
    }

    #[test]
    fn test_export_results_rejects_unknown_format() {
        let err = ReportGenerator::new()
            .export_results(&fixtures::report(), "pdf")
            .unwrap_err();
        assert!(err.to_string().contains("pdf"));
        assert_eq!(err.code(), "UNSUPPORTED_FORMAT");
    }

    #[test]
    fn test_json_export_round_trip() {
        let report = fixtures::report();
        let json = ReportGenerator::new().export(&report, ExportFormat::Json).unwrap();
        assert!(json.contains("\"executionId\": \"comp_1700000000000\""));
        assert!(!json.contains("password"));

        let parsed: ComparisonReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.execution_id, report.execution_id);
        assert_eq!(parsed.summary.total_tables, 2);
        assert_eq!(parsed.count_results, report.count_results);
    }

    #[test]
    fn test_text_export_matches_generate_report() {
        let generator = ReportGenerator::new();
        let report = fixtures::report();
        assert_eq!(
            generator.export(&report, ExportFormat::Text).unwrap(),
            generator.generate_report(&report)
        );
    }

    #[tokio::test]
    async fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");

        ReportGenerator::new()
            .write_report(&fixtures::report(), ExportFormat::Csv, &path)
            .await
            .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("Table,Source Count"));
    }
}
