//! Run statistics
//!
//! Counts are gathered from the values discovery tasks and consumers return
//! when they finish, then formatted for the end-of-run summary.

use chrono::{DateTime, Utc};
use std::fmt::Write;

/// Summary of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Valid index pages a discovery task was spawned for
    pub index_pages: usize,

    /// Article links enqueued across all letters
    pub articles_discovered: usize,

    pub extracted: usize,
    pub degraded: usize,
    pub failed: usize,

    /// Work items still queued after the consumers stopped
    pub leftover_items: usize,
}

impl RunReport {
    /// Number of articles that produced an outcome
    pub fn processed(&self) -> usize {
        self.extracted + self.degraded + self.failed
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// Formats a run report for display
pub fn format_report(report: &RunReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Harvest Statistics ===\n");
    let _ = writeln!(out, "Run:");
    let _ = writeln!(out, "  Started: {}", report.started_at.to_rfc3339());
    let _ = writeln!(out, "  Finished: {}", report.finished_at.to_rfc3339());
    let _ = writeln!(out, "  Duration: {}s", report.duration_seconds());
    let _ = writeln!(out);

    let _ = writeln!(out, "Discovery:");
    let _ = writeln!(out, "  Index pages: {}", report.index_pages);
    let _ = writeln!(out, "  Articles discovered: {}", report.articles_discovered);
    let _ = writeln!(out);

    let _ = writeln!(out, "Articles:");
    for (label, count) in [
        ("Extracted", report.extracted),
        ("Degraded", report.degraded),
        ("Failed", report.failed),
    ] {
        let percentage = if report.processed() > 0 {
            (count as f64 / report.processed() as f64) * 100.0
        } else {
            0.0
        };
        let _ = writeln!(out, "  {}: {} ({:.1}%)", label, count, percentage);
    }

    if report.leftover_items > 0 {
        let _ = writeln!(out);
        let _ = writeln!(out, "Left in queue: {}", report.leftover_items);
    }

    out
}

/// Prints run statistics to stdout
pub fn print_report(report: &RunReport) {
    print!("{}", format_report(report));
}
