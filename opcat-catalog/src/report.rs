//! Run-level reporting.
//!
//! Every operator ends the catalog stage with an explicit outcome; the
//! aggregated report is the run's visible end state. A partial catalog
//! (some operators loaded, one failed) is accepted and shown, not hidden.

use crate::extract::SkippedFile;
use serde::Serialize;
use tracing::{info, warn};

/// Outcome of the catalog stage for one operator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum OperatorOutcome {
    /// Definitions were generated and loaded.
    Loaded { definitions: usize },
    /// Nothing to load (no catalog file, or every file skipped).
    Skipped { reason: String },
    /// A statement batch failed; the transaction was rolled back.
    Failed { error: String },
}

/// Per-operator report entry.
#[derive(Debug, Clone, Serialize)]
pub struct OperatorReport {
    pub operator: String,
    #[serde(flatten)]
    pub outcome: OperatorOutcome,
    /// Catalog files skipped during extraction, if any.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_files: Vec<SkippedFile>,
}

/// Aggregated catalog-stage report for one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub entries: Vec<OperatorReport>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: chrono::Utc::now(),
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, entry: OperatorReport) {
        self.entries.push(entry);
    }

    pub fn loaded(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, OperatorOutcome::Loaded { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, OperatorOutcome::Skipped { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, OperatorOutcome::Failed { .. }))
            .count()
    }

    /// Log one line per operator plus the aggregate counts.
    pub fn log_summary(&self) {
        for entry in &self.entries {
            match &entry.outcome {
                OperatorOutcome::Loaded { definitions } => {
                    info!(operator = %entry.operator, definitions, "catalog loaded");
                }
                OperatorOutcome::Skipped { reason } => {
                    warn!(operator = %entry.operator, %reason, "catalog skipped");
                }
                OperatorOutcome::Failed { error } => {
                    warn!(operator = %entry.operator, %error, "catalog failed");
                }
            }
            for skipped in &entry.skipped_files {
                warn!(
                    operator = %entry.operator,
                    file = %skipped.path.display(),
                    reason = %skipped.reason,
                    "catalog file skipped"
                );
            }
        }
        info!(
            loaded = self.loaded(),
            skipped = self.skipped(),
            failed = self.failed(),
            "catalog run complete"
        );
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(operator: &str, outcome: OperatorOutcome) -> OperatorReport {
        OperatorReport {
            operator: operator.to_string(),
            outcome,
            skipped_files: Vec::new(),
        }
    }

    #[test]
    fn test_counts() {
        let mut report = RunReport::new();
        report.record(entry("ema", OperatorOutcome::Loaded { definitions: 2 }));
        report.record(entry(
            "cut",
            OperatorOutcome::Skipped {
                reason: "no catalog file".to_string(),
            },
        ));
        report.record(entry(
            "resample",
            OperatorOutcome::Failed {
                error: "constraint violation".to_string(),
            },
        ));
        assert_eq!(report.loaded(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn test_serializes_with_flattened_outcome() {
        let report = entry("ema", OperatorOutcome::Loaded { definitions: 1 });
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"outcome\":\"loaded\""));
        assert!(json.contains("\"definitions\":1"));
    }
}
