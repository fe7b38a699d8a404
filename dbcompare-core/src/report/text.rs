//! Plain-text report.

use crate::compare::ComparisonReport;
use std::fmt;

const PASS: &str = "✓";
const FAIL: &str = "✗";

fn marker(ok: bool) -> &'static str {
    if ok { PASS } else { FAIL }
}

/// Display adapter rendering a report as fixed-format text.
#[derive(Debug, Clone, Copy)]
pub struct TextReport<'a> {
    report: &'a ComparisonReport,
}

impl<'a> TextReport<'a> {
    /// Wraps a report for rendering.
    pub fn new(report: &'a ComparisonReport) -> Self {
        Self { report }
    }

    fn write_summary(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.report;
        let s = &r.summary;

        writeln!(f, "DATABASE COMPARISON REPORT")?;
        writeln!(f, "==========================")?;
        writeln!(f, "Execution ID:   {}", r.execution_id)?;
        writeln!(f, "Timestamp:      {}", r.timestamp.to_rfc3339())?;
        writeln!(f, "Source:         {}", r.config.source_db.safe_description())?;
        writeln!(f, "Target:         {}", r.config.target_db.safe_description())?;
        writeln!(f, "Execution time: {} ms", r.execution_time)?;
        writeln!(f)?;
        writeln!(f, "SUMMARY")?;
        writeln!(f, "-------")?;
        writeln!(f, "Total tables:          {}", s.total_tables)?;
        writeln!(f, "Count mismatches:      {}", s.tables_with_count_mismatch)?;
        writeln!(f, "Content differences:   {}", s.tables_with_content_differences)?;
        writeln!(f, "Structure differences: {}", s.tables_with_structure_differences)?;
        writeln!(f, "Failed tables:         {}", s.tables_with_errors)?;
        writeln!(f, "Data integrity:        {:.1}%", s.overall_data_integrity)?;
        writeln!(f, "Critical issues:       {}", s.critical_issues)?;
        writeln!(f, "Warnings:              {}", s.warnings)
    }

    fn write_counts(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.report.count_results.is_empty() {
            return Ok(());
        }

        writeln!(f)?;
        writeln!(f, "ROW COUNTS")?;
        writeln!(f, "----------")?;
        writeln!(
            f,
            "  {:<30} {:>12} {:>12} {:>10} {:>9}",
            "Table", "Source", "Target", "Diff", "Diff %"
        )?;
        for c in &self.report.count_results {
            writeln!(
                f,
                "{} {:<30} {:>12} {:>12} {:>10} {:>8.2}%",
                marker(c.count_match),
                c.table_name,
                c.source_count,
                c.target_count,
                c.difference,
                c.percentage_diff
            )?;
        }
        Ok(())
    }

    fn write_content(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.report.content_results.is_empty() {
            return Ok(());
        }

        writeln!(f)?;
        writeln!(f, "CONTENT (SAMPLED)")?;
        writeln!(f, "-----------------")?;
        for c in &self.report.content_results {
            writeln!(
                f,
                "{} {}: {} exact, {} partial, {} missing, {} extra of {} ({})",
                marker(!c.has_differences()),
                c.table_name,
                c.exact_matches,
                c.partial_matches,
                c.missing_in_target,
                c.extra_in_target,
                c.total_records,
                c.strategy_used
            )?;
            for d in &c.field_differences {
                writeln!(
                    f,
                    "    {} {}: {} != {}",
                    d.record_key, d.column, d.source_value, d.target_value
                )?;
            }
            if c.omitted_differences > 0 {
                writeln!(f, "    ... {} more field differences", c.omitted_differences)?;
            }
        }
        Ok(())
    }

    fn write_structure(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.report.structure_results.is_empty() {
            return Ok(());
        }

        writeln!(f)?;
        writeln!(f, "STRUCTURE")?;
        writeln!(f, "---------")?;
        for s in &self.report.structure_results {
            writeln!(f, "{} {}", marker(s.structure_match), s.table_name)?;
            if !s.missing_columns.is_empty() {
                writeln!(f, "    missing columns: {}", s.missing_columns.join(", "))?;
            }
            if !s.extra_columns.is_empty() {
                writeln!(f, "    extra columns:   {}", s.extra_columns.join(", "))?;
            }
            for d in &s.column_differences {
                writeln!(
                    f,
                    "    {} {}: {} vs {}",
                    d.column, d.property, d.source_value, d.target_value
                )?;
            }
            if !s.missing_indexes.is_empty() {
                writeln!(f, "    missing indexes: {}", s.missing_indexes.join("; "))?;
            }
            if !s.extra_indexes.is_empty() {
                writeln!(f, "    extra indexes:   {}", s.extra_indexes.join("; "))?;
            }
        }
        Ok(())
    }

    fn write_errors(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.report.errors.is_empty() {
            return Ok(());
        }

        writeln!(f)?;
        writeln!(f, "ERRORS")?;
        writeln!(f, "------")?;
        for e in &self.report.errors {
            match &e.table {
                Some(table) => writeln!(f, "[{}] {} ({}): {}", e.code, e.operation, table, e.message)?,
                None => writeln!(f, "[{}] {}: {}", e.code, e.operation, e.message)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_summary(f)?;
        self.write_counts(f)?;
        self.write_content(f)?;
        self.write_structure(f)?;
        self.write_errors(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures;

    #[test]
    fn test_text_report_sections() {
        let text = TextReport::new(&fixtures::report()).to_string();

        assert!(text.starts_with("DATABASE COMPARISON REPORT"));
        assert!(text.contains("Execution ID:   comp_1700000000000"));
        assert!(text.contains("Count mismatches:      1"));
        assert!(text.contains("Failed tables:         1"));
        assert!(text.contains("✓ users"));
        assert!(text.contains("✗ projects"));
        assert!(text.contains("10.00%"));
        assert!(text.contains("missing columns: budget"));
        assert!(text.contains("[TABLE_COMPARISON_FAILED] content (vendors)"));
    }

    #[test]
    fn test_text_report_never_shows_passwords() {
        let mut report = fixtures::report();
        report.config.source_db = report
            .config
            .source_db
            .clone()
            .with_credentials("postgres", "hunter2");
        let text = TextReport::new(&report).to_string();
        assert!(!text.contains("hunter2"));
    }
}
