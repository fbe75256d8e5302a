//! Result export and dashboard statistics
//!
//! This module renders stored data for humans:
//! - CSV export of cleaned results
//! - A formatted dashboard summary printed to stdout

use crate::storage::{DashboardStats, ResultRecord, Storage};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Exports cleaned results to a CSV file
///
/// # Arguments
///
/// * `storage` - The storage backend to read from
/// * `job_id` - Limits the export to one job; None exports everything
/// * `output_path` - Path where the CSV file should be written
///
/// # Returns
///
/// The number of data rows written.
pub fn export_csv(
    storage: &dyn Storage,
    job_id: Option<i64>,
    output_path: &Path,
) -> crate::Result<u64> {
    let records = storage.list_results(job_id)?;
    let csv = format_csv(&records);

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(output_path)?;
    file.write_all(csv.as_bytes())?;

    tracing::info!(
        "Exported {} results to {}",
        records.len(),
        output_path.display()
    );
    Ok(records.len() as u64)
}

/// Formats result records as CSV with a header row
///
/// Rows follow insertion order, which is pipeline output order.
pub fn format_csv(records: &[ResultRecord]) -> String {
    let mut csv = String::new();
    csv.push_str("source_url,data_type,cleaned_value\n");

    for record in records {
        csv.push_str(&format!(
            "{},{},{}\n",
            csv_field(&record.source_url),
            csv_field(&record.data_type),
            csv_field(&record.cleaned_value),
        ));
    }

    csv
}

/// Quotes a field only when it contains a delimiter, quote, or newline
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Prints the dashboard summary to stdout in a formatted manner
pub fn print_dashboard(stats: &DashboardStats) {
    println!("=== ScrapeMaster Dashboard ===\n");

    println!("Overview:");
    println!("  Jobs: {} ({} active)", stats.total_jobs, stats.active_jobs);
    println!("  Stored results: {}", stats.total_results);
    println!("  Total runs: {}", stats.total_runs);
    println!();

    println!("Recent Performance (last 100 runs):");
    println!("  Success rate: {:.1}%", stats.success_rate * 100.0);
    println!(
        "  Average execution time: {:.2}s",
        stats.avg_execution_time_secs
    );
    println!();

    if !stats.results_by_type.is_empty() {
        println!("Results by Type:");
        for (data_type, count) in &stats.results_by_type {
            let percentage = if stats.total_results > 0 {
                (*count as f64 / stats.total_results as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", data_type, count, percentage);
        }
        println!();
    }

    if !stats.media_usage.is_empty() {
        println!("Media Storage:");
        for (media_type, bytes, files) in &stats.media_usage {
            println!(
                "  {}: {} files, {:.1} MB",
                media_type,
                files,
                *bytes as f64 / (1024.0 * 1024.0)
            );
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{NewJob, NewResult, NewStat, SqliteStorage};

    fn sample_record(id: i64, cleaned: &str) -> ResultRecord {
        ResultRecord {
            id,
            job_id: 1,
            source_url: "https://example.com/page".to_string(),
            data_type: "Text".to_string(),
            raw_value: cleaned.to_string(),
            cleaned_value: cleaned.to_string(),
            metadata: None,
            created_at: "2024-03-01T12:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_csv_field_plain_values_unquoted() {
        assert_eq!(csv_field("hello"), "hello");
        assert_eq!(csv_field("https://example.com/a"), "https://example.com/a");
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("line1\nline2"), "\"line1\nline2\"");
    }

    #[test]
    fn test_format_csv_header_and_rows() {
        let csv = format_csv(&[sample_record(1, "First item"), sample_record(2, "a, b")]);
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "source_url,data_type,cleaned_value");
        assert_eq!(lines[1], "https://example.com/page,Text,First item");
        assert_eq!(lines[2], "https://example.com/page,Text,\"a, b\"");
    }

    #[test]
    fn test_export_csv_writes_file() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let job_id = storage
            .upsert_job(&NewJob {
                name: "news".to_string(),
                url: "https://example.com/news".to_string(),
                data_type: "Text".to_string(),
                keyword: None,
                download_images: false,
                download_videos: false,
                schedule_type: "manual".to_string(),
                schedule_value: "".to_string(),
            })
            .unwrap();

        storage
            .save_run(
                job_id,
                &[NewResult {
                    source_url: "https://example.com/news".to_string(),
                    data_type: "Text".to_string(),
                    raw_value: "Raw".to_string(),
                    cleaned_value: "Raw".to_string(),
                    metadata: None,
                }],
                &NewStat {
                    url: "https://example.com/news".to_string(),
                    data_type: "Text".to_string(),
                    items_scraped: 1,
                    items_cleaned: 1,
                    success: true,
                    error_message: None,
                    execution_time_secs: 0.5,
                },
            )
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv");
        let rows = export_csv(&storage, None, &path).unwrap();

        assert_eq!(rows, 1);
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("source_url,data_type,cleaned_value\n"));
        assert!(contents.contains("https://example.com/news,Text,Raw"));
    }
}
