use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::job::{ConversionTask, TaskStatus};

/// Successful conversions listed by name when nothing needed a retry
const MAX_LISTED_SUCCESSES: usize = 10;

/// A file that could not be converted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailedItem {
    pub path: PathBuf,
    pub error: String,
}

/// Final outcome of a batch, in input order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub total: usize,
    pub succeeded_count: usize,
    pub retried_count: usize,
    pub failed_count: usize,
    pub succeeded_items: Vec<PathBuf>,
    pub retried_items: Vec<PathBuf>,
    pub failed_items: Vec<FailedItem>,
    pub duration: Duration,
    pub cancelled: bool,
}

impl Report {
    /// Aggregate terminal tasks; the result follows the order of `tasks`' indices
    pub fn build(tasks: &[ConversionTask], duration: Duration, cancelled: bool) -> Self {
        let mut ordered: Vec<&ConversionTask> = tasks.iter().collect();
        ordered.sort_by_key(|t| t.index);

        let mut report = Self {
            total: tasks.len(),
            succeeded_count: 0,
            retried_count: 0,
            failed_count: 0,
            succeeded_items: Vec::new(),
            retried_items: Vec::new(),
            failed_items: Vec::new(),
            duration,
            cancelled,
        };

        for task in ordered {
            match task.status() {
                TaskStatus::Succeeded => {
                    report.succeeded_count += 1;
                    report.succeeded_items.push(task.source_path.clone());
                }
                TaskStatus::SucceededViaRetry => {
                    report.retried_count += 1;
                    report.retried_items.push(task.source_path.clone());
                }
                // A task that never resolved is reported as failed rather than dropped
                TaskStatus::Failed | TaskStatus::Pending | TaskStatus::Converting => {
                    report.failed_count += 1;
                    report.failed_items.push(FailedItem {
                        path: task.source_path.clone(),
                        error: task
                            .error()
                            .map(|e| e.to_string())
                            .unwrap_or_else(|| "unknown error".to_string()),
                    });
                }
            }
        }

        report
    }

    /// Files that ended up as PDFs, with or without a retry
    pub fn converted_count(&self) -> usize {
        self.succeeded_count + self.retried_count
    }

    pub fn is_total_success(&self) -> bool {
        self.failed_count == 0 && !self.cancelled
    }

    /// Human-readable summary
    pub fn render(&self) -> String {
        let sep = "=".repeat(72);
        let sub = "-".repeat(72);
        let denom = self.total.max(1) as f64;
        let converted = self.converted_count();
        let secs = self.duration.as_secs();

        let mut lines = vec![
            sep.clone(),
            "DOCUMENT → PDF CONVERSION REPORT".to_string(),
            sep.clone(),
            String::new(),
            "📊 SUMMARY".to_string(),
            sub.clone(),
            format!("{:<35}{}", "Files processed:", self.total),
            format!(
                "{:<35}{} ({:.1}%)",
                "✓ Converted:",
                converted,
                converted as f64 / denom * 100.0
            ),
            format!(
                "{:<35}{} ({:.1}%)",
                "✗ Failed:",
                self.failed_count,
                self.failed_count as f64 / denom * 100.0
            ),
            format!("{:<35}{}", "🔄 Resolved by retry:", self.retried_count),
            format!("{:<35}{}m {}s", "⏱️  Total time:", secs / 60, secs % 60),
            String::new(),
        ];

        if !self.retried_items.is_empty() {
            lines.push("🔄 FILES RESOLVED BY THE ALTERNATE CONVERTER".to_string());
            lines.push(sub.clone());
            for path in &self.retried_items {
                lines.push(format!("  • {}", file_name(path)));
            }
            lines.push(String::new());
        }

        if self.succeeded_count > 0 && self.retried_items.is_empty() {
            lines.push("✓ FILES CONVERTED WITHOUT RETRIES".to_string());
            lines.push(sub.clone());
            for path in self.succeeded_items.iter().take(MAX_LISTED_SUCCESSES) {
                lines.push(format!("  ✓ {}", file_name(path)));
            }
            if self.succeeded_items.len() > MAX_LISTED_SUCCESSES {
                lines.push(format!(
                    "  ... and {} more",
                    self.succeeded_items.len() - MAX_LISTED_SUCCESSES
                ));
            }
            lines.push(String::new());
        }

        if !self.failed_items.is_empty() {
            lines.push("✗ UNRESOLVED FAILURES".to_string());
            lines.push(sub.clone());
            for item in &self.failed_items {
                lines.push(format!("  ✗ {}", file_name(&item.path)));
                lines.push(format!("    └─ Error: {}", item.error));
                lines.push("    └─ Suggestions:".to_string());
                lines.push("       • Check whether the document is corrupt".to_string());
                lines.push("       • Make sure LibreOffice (or MS Word) is installed".to_string());
                lines.push("       • Open the document and save it again".to_string());
            }
            lines.push(String::new());
        }

        lines.push(sep.clone());
        lines.push(self.verdict().to_string());
        lines.push(sep);

        lines.join("\n")
    }

    fn verdict(&self) -> &'static str {
        if self.cancelled {
            "🛑 CONVERSION CANCELLED"
        } else if self.failed_count == 0 {
            "✅ CONVERSION COMPLETED SUCCESSFULLY"
        } else if self.converted_count() > 0 {
            "⚠️  CONVERSION COMPLETED WITH ERRORS"
        } else {
            "❌ NO FILE COULD BE CONVERTED"
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Save the report; a `.json` extension selects JSON, anything else the text rendering
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let is_json = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let body = if is_json { self.to_json()? } else { self.render() };
        std::fs::write(path, body)?;
        Ok(())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
