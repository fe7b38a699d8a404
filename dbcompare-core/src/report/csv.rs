//! CSV export of the count results.

use crate::compare::ComparisonReport;

const HEADER: &str = "Table,Source Count,Target Count,Match,Difference,Percentage Diff";

pub(super) fn render(report: &ComparisonReport) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');

    for result in &report.count_results {
        let fields = [
            escape(&result.table_name),
            result.source_count.to_string(),
            result.target_count.to_string(),
            result.count_match.to_string(),
            result.difference.to_string(),
            format!("{:.2}", result.percentage_diff),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }

    out
}

/// RFC 4180 field quoting.
fn escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
