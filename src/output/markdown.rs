//! Markdown summary generation
//!
//! This module generates a human-readable markdown summary of a crawl run:
//! run metadata, listing page outcomes and per-document counters.

use crate::crawler::{CrawlOutcome, CrawlReport};
use crate::output::stats::CrawlStats;
use crate::output::traits::OutputResult;
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Everything the summary reports on
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlSummary {
    pub start_url: String,
    pub config_hash: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: String,

    /// Page URL and reason, if the crawl halted
    pub failure: Option<(String, String)>,
    pub stats: CrawlStats,
}

impl CrawlSummary {
    /// Builds a summary from a finished crawl
    pub fn from_report(report: &CrawlReport, start_url: &str, config_hash: &str) -> Self {
        let (status, failure) = match &report.outcome {
            CrawlOutcome::Completed => ("completed".to_string(), None),
            CrawlOutcome::Failed { url, reason } => {
                ("halted".to_string(), Some((url.clone(), reason.clone())))
            }
        };

        Self {
            start_url: start_url.to_string(),
            config_hash: config_hash.to_string(),
            started_at: report.started_at,
            finished_at: report.finished_at,
            status,
            failure,
            stats: report.stats.clone(),
        }
    }

    /// Duration in whole seconds
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// Writes the markdown summary to `output_path`
pub fn generate_markdown_summary(summary: &CrawlSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl summary as markdown
pub fn format_markdown_summary(summary: &CrawlSummary) -> String {
    let stats = &summary.stats;
    let mut md = String::new();

    // Title
    md.push_str("# Condition Corpus Crawl Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Start URL**: {}\n", summary.start_url));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", summary.finished_at.to_rfc3339()));
    let duration = summary.duration_seconds();
    md.push_str(&format!(
        "- **Duration**: {} seconds ({:.2} minutes)\n",
        duration,
        duration as f64 / 60.0
    ));
    md.push_str(&format!("- **Status**: {}\n", summary.status));
    md.push_str(&format!("- **Config Hash**: {}\n\n", summary.config_hash));

    if let Some((url, reason)) = &summary.failure {
        md.push_str("## Halted\n\n");
        md.push_str(&format!("Listing page `{}` failed: {}\n\n", url, reason));
    }

    // Listing pages
    md.push_str("## Listing Pages\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Requested | {} |\n", stats.pages_requested));
    md.push_str(&format!("| Completed | {} |\n", stats.pages_completed));
    md.push_str(&format!("| Failed | {} |\n\n", stats.pages_failed));

    // Condition pages
    md.push_str("## Condition Pages\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Requested | {} |\n", stats.children_requested));
    md.push_str(&format!("| Fetch failures | {} |\n", stats.child_fetch_failures));
    md.push_str(&format!(
        "| Extraction failures | {} |\n",
        stats.extraction_failures
    ));
    md.push_str(&format!(
        "| Empty (dropped) | {} |\n",
        stats.empty_documents
    ));
    md.push_str(&format!("| Written | {} |\n\n", stats.documents_emitted));

    md.push_str(&format!(
        "**Emission rate**: {:.2}%\n",
        stats.emission_rate()
    ));

    md
}
