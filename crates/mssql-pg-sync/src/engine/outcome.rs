//! Per-table result types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stages of the per-table protocol, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    ConnectSource,
    ConnectDestination,
    Extract,
    ReplaceDestination,
    LoadBatches,
    Commit,
}

impl SyncStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStage::ConnectSource => "connect_source",
            SyncStage::ConnectDestination => "connect_destination",
            SyncStage::Extract => "extract",
            SyncStage::ReplaceDestination => "replace_destination",
            SyncStage::LoadBatches => "load_batches",
            SyncStage::Commit => "commit",
        }
    }
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of syncing one table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub table_name: String,
    pub succeeded: bool,
    /// Rows committed to the destination; zero unless every batch and the commit succeeded.
    pub rows_transferred: u64,
    pub elapsed_seconds: f64,
    /// Destination count matched the extracted count. Advisory only.
    pub validation_passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<SyncStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_rows: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_rows: Option<i64>,
}

impl SyncOutcome {
    /// A not-yet-successful outcome, filled in as stages complete.
    pub fn pending(table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            succeeded: false,
            rows_transferred: 0,
            elapsed_seconds: 0.0,
            validation_passed: false,
            error: None,
            failed_stage: None,
            extracted_rows: None,
            destination_rows: None,
        }
    }

    /// A failed outcome for work that never reported back.
    pub fn failed(table_name: &str, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::pending(table_name)
        }
    }
}

/// Result of the connectivity check for one table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityOutcome {
    pub table_name: String,
    pub source_ok: bool,
    pub destination_ok: bool,
    pub overall_ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_rows: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_rows: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_error: Option<String>,
}

impl ConnectivityOutcome {
    pub fn new(table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            source_ok: false,
            destination_ok: false,
            overall_ok: false,
            source_rows: None,
            destination_rows: None,
            source_error: None,
            destination_error: None,
        }
    }

    /// Both sides failed because the check itself never completed.
    pub fn failed(table_name: &str, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            source_error: Some(error.clone()),
            destination_error: Some(error),
            ..Self::new(table_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_outcome() {
        let outcome = SyncOutcome::pending("customer");
        assert!(!outcome.succeeded);
        assert_eq!(outcome.rows_transferred, 0);
        assert!(!outcome.validation_passed);
    }

    #[test]
    fn test_stage_serializes_snake_case() {
        let mut outcome = SyncOutcome::failed("customer", "boom");
        outcome.failed_stage = Some(SyncStage::LoadBatches);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["failed_stage"], "load_batches");
        assert_eq!(json["error"], "boom");
        assert!(json.get("extracted_rows").is_none());
    }
}
