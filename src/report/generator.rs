//! Markdown and JSON report generation.
//!
//! This module renders a combined analysis as a Markdown report, as the
//! JSON response body, or as a one-line-per-record history table.

use crate::history::HistoryRecord;
use crate::models::{DirtyFinding, FileInfo, FileType, PrimaryFinding, Report, ReportMetadata, ReviewFinding};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Dirty Data Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));

    let primary = report.result.primary();
    output.push_str(&generate_summary_section(&primary.summary));
    output.push_str(&generate_primary_section(primary));

    match report.result.review() {
        Some(review) => output.push_str(&generate_review_section(review)),
        None => output.push_str(
            "## Second Opinion\n\n*The review pass was unavailable for this analysis.*\n\n",
        ),
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();
    let file = &metadata.file;

    section.push_str("## File\n\n");
    section.push_str(&format!("- **Name:** {}\n", file.file_name));
    section.push_str(&format!(
        "- **Type:** {}\n",
        file.file_type.to_string().to_uppercase()
    ));
    section.push_str(&format!("- **Size:** {}\n", format_size(file.file_size)));
    if file.file_type != FileType::Pdf {
        section.push_str(&format!("- **Rows:** {}\n", file.row_count));
        section.push_str(&format!("- **Columns:** {}\n", file.col_count));
    }
    section.push_str(&format!(
        "- **Analyzed:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(ref model) = metadata.model_used {
        section.push_str(&format!("- **Model Used:** `{}`\n", model));
    }
    if let Some(ref id) = metadata.record_id {
        section.push_str(&format!("- **History ID:** `{}`\n", id));
    }
    section.push('\n');

    if file.truncated {
        section.push_str(&format!(
            "> Large file: only a sample of the {} rows was analyzed.\n\n",
            file.row_count
        ));
    }

    section
}

fn generate_summary_section(summary: &str) -> String {
    if summary.is_empty() {
        return String::new();
    }
    format!("## Summary\n\n{}\n\n", summary)
}

/// Generate the good / bad / dirty sections.
fn generate_primary_section(primary: &PrimaryFinding) -> String {
    let mut section = String::new();

    section.push_str(&generate_list("The Good", &primary.the_good));
    section.push_str(&generate_list("The Bad", &primary.the_bad));

    section.push_str("## The Dirty\n\n");
    if primary.the_dirty.is_empty() {
        section.push_str("*Nothing reported.*\n\n");
    }
    for item in &primary.the_dirty {
        section.push_str(&generate_dirty_block(item));
    }

    section
}

fn generate_list(title: &str, items: &[String]) -> String {
    let mut section = format!("## {}\n\n", title);

    if items.is_empty() {
        section.push_str("*Nothing reported.*\n");
    }
    for item in items {
        section.push_str(&format!("- {}\n", item));
    }
    section.push('\n');

    section
}

/// Generate a single `the_dirty` block.
fn generate_dirty_block(item: &DirtyFinding) -> String {
    let mut block = format!("- **{}**\n", item.text);
    if let Some(ref why) = item.why {
        block.push_str(&format!("  > Why: {}\n", why));
    }
    block.push('\n');
    block
}

/// Generate the reviewer section.
fn generate_review_section(review: &ReviewFinding) -> String {
    let mut section = String::new();

    section.push_str("## Second Opinion\n\n");
    section.push_str(&generate_list("Co-signs", &review.co_signs).replacen("## ", "### ", 1));
    if !review.watch_outs.is_empty() {
        section.push_str(&generate_list("Watch-outs", &review.watch_outs).replacen("## ", "### ", 1));
    }
    section.push_str(&format!("### Bottom Line\n\n{}\n\n", review.bottom_line));

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by dirtydata*\n".to_string()
}

/// Generate a JSON report in the response-body shape.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(&report.result).map_err(Into::into)
}

/// Generate a table of stored analyses.
pub fn generate_history_table(records: &[HistoryRecord]) -> String {
    if records.is_empty() {
        return "No saved analyses yet.\n".to_string();
    }

    let mut table = String::new();
    table.push_str("| ID | Date | File | Type | Size | Rows | Version |\n");
    table.push_str("|:---|:---|:---|:---:|---:|---:|:---:|\n");

    for record in records {
        table.push_str(&format!(
            "| `{}` | {} | {} | {} | {} | {} | v{} |\n",
            record.id,
            record.created_at.format("%Y-%m-%d %H:%M"),
            record.file.file_name,
            record.file.file_type,
            format_size(record.file.file_size),
            row_label(&record.file),
            record.result.version()
        ));
    }

    table
}

fn row_label(file: &FileInfo) -> String {
    match file.file_type {
        FileType::Pdf => "-".to_string(),
        _ => file.row_count.to_string(),
    }
}

/// Human-readable byte size.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CombinedResult;
    use chrono::Utc;

    fn primary() -> PrimaryFinding {
        PrimaryFinding {
            the_good: vec!["Dates are contiguous".to_string(), "No blanks".to_string()],
            the_bad: vec!["Only two rows".to_string()],
            the_dirty: vec![
                DirtyFinding {
                    text: "Row 3 is -50000000".to_string(),
                    why: Some("Six orders of magnitude off".to_string()),
                },
                DirtyFinding {
                    text: "No currency column".to_string(),
                    why: None,
                },
            ],
            summary: "A two-row ledger.".to_string(),
        }
    }

    fn review() -> ReviewFinding {
        ReviewFinding {
            co_signs: vec!["The outlier".to_string()],
            watch_outs: vec!["Sample is tiny".to_string()],
            bottom_line: "Fix row 3 first.".to_string(),
        }
    }

    fn create_test_report(review: Option<ReviewFinding>) -> Report {
        Report {
            metadata: ReportMetadata {
                file: FileInfo {
                    file_name: "ledger.csv".to_string(),
                    file_type: FileType::Csv,
                    file_size: 2048,
                    row_count: 2,
                    col_count: 2,
                    truncated: false,
                },
                analysis_date: Utc::now(),
                model_used: Some("test-model".to_string()),
                record_id: None,
            },
            result: CombinedResult::new(primary(), review),
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let markdown = generate_markdown_report(&create_test_report(Some(review())));

        assert!(markdown.contains("# Dirty Data Report"));
        assert!(markdown.contains("- **Name:** ledger.csv"));
        assert!(markdown.contains("- **Size:** 2.0 KB"));
        assert!(markdown.contains("## The Good\n\n- Dates are contiguous\n- No blanks\n"));
        assert!(markdown.contains("- **Row 3 is -50000000**\n  > Why: Six orders of magnitude off\n"));
        assert!(markdown.contains("- **No currency column**\n\n"));
        assert!(markdown.contains("### Co-signs"));
        assert!(markdown.contains("### Watch-outs"));
        assert!(markdown.contains("### Bottom Line\n\nFix row 3 first."));
        assert!(markdown.contains("`test-model`"));
    }

    #[test]
    fn test_markdown_without_review() {
        let markdown = generate_markdown_report(&create_test_report(None));

        assert!(markdown.contains("review pass was unavailable"));
        assert!(!markdown.contains("### Bottom Line"));
    }

    #[test]
    fn test_truncation_notice() {
        let mut report = create_test_report(None);
        report.metadata.file.truncated = true;
        report.metadata.file.row_count = 600;

        let markdown = generate_markdown_report(&report);
        assert!(markdown.contains("only a sample of the 600 rows"));
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&create_test_report(None)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["version"], 1);
        assert!(value["review"].is_null());
        assert_eq!(value["primary"]["the_dirty"][1]["why"], serde_json::Value::Null);
        assert_eq!(value["primary"]["the_dirty"][1]["text"], "No currency column");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_history_table() {
        assert_eq!(generate_history_table(&[]), "No saved analyses yet.\n");

        let report = create_test_report(Some(review()));
        let record = HistoryRecord::new(report.metadata.file.clone(), report.result.clone());
        let table = generate_history_table(&[record.clone()]);

        assert!(table.contains(&record.id));
        assert!(table.contains("| ledger.csv | csv | 2.0 KB | 2 | v2 |"));
    }
}
