//! Multi-table orchestrator - runs the engine over an ordered table list.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::engine::{ConnectivityOutcome, SyncOutcome, TableSyncEngine};
use crate::error::Result;
use crate::registry::{TableDescriptor, TableRegistry};

/// Aggregate result of syncing several tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Unique run identifier.
    pub run_id: String,

    /// True only if every table succeeded.
    pub succeeded: bool,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,

    /// Per-table outcomes, in processing order.
    pub tables: Vec<SyncOutcome>,

    /// Rows transferred by succeeded tables.
    pub total_transferred: u64,

    pub processed_tables: usize,
    pub successful_tables: usize,
    pub failed_tables: usize,

    /// Total duration in seconds.
    pub elapsed_seconds: f64,

    /// Average throughput (rows/second).
    pub rows_per_second: u64,
}

impl BatchReport {
    fn from_outcomes(
        run_id: String,
        started_at: DateTime<Utc>,
        tables: Vec<SyncOutcome>,
        elapsed_seconds: f64,
    ) -> Self {
        let successful_tables = tables.iter().filter(|t| t.succeeded).count();
        let total_transferred: u64 = tables
            .iter()
            .filter(|t| t.succeeded)
            .map(|t| t.rows_transferred)
            .sum();
        let rows_per_second = if elapsed_seconds > 0.0 {
            (total_transferred as f64 / elapsed_seconds) as u64
        } else {
            0
        };

        Self {
            run_id,
            succeeded: successful_tables == tables.len(),
            started_at,
            completed_at: Utc::now(),
            total_transferred,
            processed_tables: tables.len(),
            successful_tables,
            failed_tables: tables.len() - successful_tables,
            elapsed_seconds,
            rows_per_second,
            tables,
        }
    }

    /// Names of tables that did not succeed.
    pub fn failed_table_names(&self) -> Vec<&str> {
        self.tables
            .iter()
            .filter(|t| !t.succeeded)
            .map(|t| t.table_name.as_str())
            .collect()
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn log_summary(&self) {
        info!(
            "Sync {}: {}/{} tables, {} rows in {:.1}s ({} rows/s)",
            if self.succeeded { "completed" } else { "failed" },
            self.successful_tables,
            self.processed_tables,
            self.total_transferred,
            self.elapsed_seconds,
            self.rows_per_second
        );
        for outcome in &self.tables {
            if outcome.succeeded {
                info!(
                    "  {}: {} rows, {:.2}s, validation {}",
                    outcome.table_name,
                    outcome.rows_transferred,
                    outcome.elapsed_seconds,
                    if outcome.validation_passed { "passed" } else { "FAILED" }
                );
            } else {
                error!(
                    "  {}: FAILED - {}",
                    outcome.table_name,
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }
}

/// Aggregate result of the connectivity check over several tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityReport {
    pub run_id: String,
    /// True only if every table passed on both sides.
    pub succeeded: bool,
    pub tables: Vec<ConnectivityOutcome>,
    pub tested_tables: usize,
    pub successful_connections: usize,
    pub failed_connections: usize,
    pub elapsed_seconds: f64,
}

impl ConnectivityReport {
    fn from_outcomes(run_id: String, tables: Vec<ConnectivityOutcome>, elapsed_seconds: f64) -> Self {
        let successful_connections = tables.iter().filter(|t| t.overall_ok).count();
        Self {
            run_id,
            succeeded: successful_connections == tables.len(),
            tested_tables: tables.len(),
            successful_connections,
            failed_connections: tables.len() - successful_connections,
            elapsed_seconds,
            tables,
        }
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs tables one after another and aggregates their outcomes.
#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<TableRegistry>,
    engine: TableSyncEngine,
}

impl Orchestrator {
    pub fn new(registry: Arc<TableRegistry>, engine: TableSyncEngine) -> Self {
        Self { registry, engine }
    }

    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &TableSyncEngine {
        &self.engine
    }

    /// Sync a single table by name.
    pub async fn sync_table(&self, name: &str) -> Result<SyncOutcome> {
        let table = self.registry.get(name)?.clone();
        Ok(self.run_sync(table).await)
    }

    /// Run one table on its own task and wait for it, so a panic stays
    /// contained to that table's outcome.
    async fn run_sync(&self, table: TableDescriptor) -> SyncOutcome {
        let name = table.name.clone();
        let engine = self.engine.clone();

        let handle = tokio::spawn(async move { engine.sync(&table).await });
        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("{}: sync task panicked - {}", name, e);
                SyncOutcome::failed(&name, format!("sync task panicked: {}", e))
            }
        }
    }

    /// Sync the named tables in order, or the default order when `names` is
    /// `None` or empty.
    ///
    /// Fails only for unknown table names, before any connection is opened.
    /// Table failures are reported in the returned report.
    pub async fn sync_tables(&self, names: Option<&[String]>) -> Result<BatchReport> {
        let tables = self.registry.resolve(names)?;
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let start = Instant::now();
        let total = tables.len();

        info!("Starting sync run {}: {} tables", run_id, total);

        let mut outcomes = Vec::with_capacity(total);
        for (i, table) in tables.into_iter().enumerate() {
            info!("[{}/{}] Syncing {}", i + 1, total, table.name);
            outcomes.push(self.run_sync(table).await);
        }

        let report = BatchReport::from_outcomes(
            run_id,
            started_at,
            outcomes,
            start.elapsed().as_secs_f64(),
        );
        report.log_summary();
        if !report.succeeded {
            warn!("Failed tables: {}", report.failed_table_names().join(", "));
        }
        Ok(report)
    }

    /// Check connectivity for the named tables, or the default order.
    pub async fn test_tables(&self, names: Option<&[String]>) -> Result<ConnectivityReport> {
        let tables = self.registry.resolve(names)?;
        let run_id = uuid::Uuid::new_v4().to_string();
        let start = Instant::now();
        let total = tables.len();

        info!("Testing connectivity for {} tables", total);

        let mut outcomes = Vec::with_capacity(total);
        for (i, table) in tables.into_iter().enumerate() {
            info!("[{}/{}] Testing {}", i + 1, total, table.name);
            let name = table.name.clone();
            let engine = self.engine.clone();

            let handle = tokio::spawn(async move { engine.check_connectivity(&table).await });
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("{}: connectivity task panicked - {}", name, e);
                    ConnectivityOutcome::failed(&name, format!("connectivity task panicked: {}", e))
                }
            };
            outcomes.push(outcome);
        }

        let report =
            ConnectivityReport::from_outcomes(run_id, outcomes, start.elapsed().as_secs_f64());
        info!(
            "Connectivity: {}/{} tables reachable",
            report.successful_connections, report.tested_tables
        );
        Ok(report)
    }
}
