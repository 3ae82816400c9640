//! End-of-run summary.

use tracing::{info, warn};

use crate::record::UploadOutcome;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadReport {
    /// Unique ids of records that failed every attempt, in source order.
    pub failed_ids: Vec<String>,
    pub succeeded: usize,
    pub succeeded_after_simplification: usize,
    pub failed: usize,
    /// Rows without geometry.
    pub skipped: usize,
    /// The run stopped at a cancellation checkpoint.
    pub cancelled: bool,
}

impl UploadReport {
    pub fn record(&mut self, unique_id: &str, outcome: &UploadOutcome) {
        match outcome {
            UploadOutcome::Succeeded => self.succeeded += 1,
            UploadOutcome::SucceededAfterSimplification => self.succeeded_after_simplification += 1,
            UploadOutcome::Failed { .. } => {
                self.failed += 1;
                self.failed_ids.push(unique_id.to_string());
            }
        }
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    /// Rows that reached the remote layer (any outcome).
    pub fn attempted(&self) -> usize {
        self.succeeded + self.succeeded_after_simplification + self.failed
    }

    /// No permanently failed records.
    pub fn is_clean(&self) -> bool {
        self.failed_ids.is_empty()
    }

    pub fn log_summary(&self) {
        info!(
            attempted = self.attempted(),
            succeeded = self.succeeded,
            after_simplification = self.succeeded_after_simplification,
            failed = self.failed,
            skipped = self.skipped,
            cancelled = self.cancelled,
            "overwrite finished"
        );
        if self.is_clean() {
            info!("all records uploaded successfully");
        } else {
            warn!(failed_ids = ?self.failed_ids, "records failed after all attempts");
        }
    }
}
