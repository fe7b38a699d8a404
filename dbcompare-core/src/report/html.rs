//! HTML export rendered through the `report.html` askama template.

use crate::compare::ComparisonReport;
use crate::error::CompareError;
use crate::Result;
use askama::Template;

struct CountRow<'a> {
    table: &'a str,
    source: u64,
    target: u64,
    difference: u64,
    percentage: String,
    ok: bool,
}

struct ContentRow<'a> {
    table: &'a str,
    exact: usize,
    partial: usize,
    missing: usize,
    extra: usize,
    total: usize,
    strategy: String,
    ok: bool,
}

struct StructureRow<'a> {
    table: &'a str,
    missing: String,
    extra: String,
    column_differences: usize,
    ok: bool,
}

struct ErrorRow<'a> {
    code: &'a str,
    operation: &'a str,
    table: &'a str,
    message: &'a str,
}

#[derive(Template)]
#[template(path = "report.html")]
struct HtmlReport<'a> {
    execution_id: &'a str,
    timestamp: String,
    source: String,
    target: String,
    execution_time: u64,
    total_tables: usize,
    integrity: String,
    failed_tables: usize,
    critical_issues: usize,
    warnings: usize,
    counts: Vec<CountRow<'a>>,
    contents: Vec<ContentRow<'a>>,
    structures: Vec<StructureRow<'a>>,
    errors: Vec<ErrorRow<'a>>,
}

impl<'a> HtmlReport<'a> {
    fn from_report(report: &'a ComparisonReport) -> Self {
        Self {
            execution_id: &report.execution_id,
            timestamp: report.timestamp.to_rfc3339(),
            source: report.config.source_db.safe_description(),
            target: report.config.target_db.safe_description(),
            execution_time: report.execution_time,
            total_tables: report.summary.total_tables,
            integrity: format!("{:.1}", report.summary.overall_data_integrity),
            failed_tables: report.summary.tables_with_errors,
            critical_issues: report.summary.critical_issues,
            warnings: report.summary.warnings,
            counts: report
                .count_results
                .iter()
                .map(|c| CountRow {
                    table: &c.table_name,
                    source: c.source_count,
                    target: c.target_count,
                    difference: c.difference,
                    percentage: format!("{:.2}", c.percentage_diff),
                    ok: c.count_match,
                })
                .collect(),
            contents: report
                .content_results
                .iter()
                .map(|c| ContentRow {
                    table: &c.table_name,
                    exact: c.exact_matches,
                    partial: c.partial_matches,
                    missing: c.missing_in_target,
                    extra: c.extra_in_target,
                    total: c.total_records,
                    strategy: c.strategy_used.to_string(),
                    ok: !c.has_differences(),
                })
                .collect(),
            structures: report
                .structure_results
                .iter()
                .map(|s| StructureRow {
                    table: &s.table_name,
                    missing: s.missing_columns.join(", "),
                    extra: s.extra_columns.join(", "),
                    column_differences: s.column_differences.len(),
                    ok: s.structure_match,
                })
                .collect(),
            errors: report
                .errors
                .iter()
                .map(|e| ErrorRow {
                    code: &e.code,
                    operation: &e.operation,
                    table: e.table.as_deref().unwrap_or(""),
                    message: &e.message,
                })
                .collect(),
        }
    }
}

pub(super) fn render(report: &ComparisonReport) -> Result<String> {
    HtmlReport::from_report(report)
        .render()
        .map_err(|source| CompareError::Template { source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures;

    #[test]
    fn test_render_html() {
        let html = render(&fixtures::report()).unwrap();
        assert!(html.contains("<table"));
        assert!(html.contains("comp_1700000000000"));
        assert!(html.contains("<td>projects</td>"));
        assert!(html.contains("10.00"));
        assert!(html.contains("class=\"fail\""));
        assert!(html.contains("<tr><th>Failed tables</th><td class=\"num\">1</td></tr>"));
    }

    #[test]
    fn test_html_escapes_messages() {
        let html = render(&fixtures::report()).unwrap();
        assert!(!html.contains("<b>"));
        assert!(html.contains("&#60;b&#62;"));
        assert!(html.contains("&#34;quoted&#34;"));
    }
}
