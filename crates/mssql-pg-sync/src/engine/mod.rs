//! Per-table full-replace sync engine.
//!
//! One call to [`TableSyncEngine::sync`] runs the whole protocol for a single
//! table: connect both sides, read the snapshot, truncate and reload the
//! destination inside one transaction, commit, then compare row counts.
//! Every failure is caught here and reported in the returned [`SyncOutcome`];
//! nothing escapes as an error.

mod outcome;

pub use outcome::{ConnectivityOutcome, SyncOutcome, SyncStage};

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::core::{Connector, DestinationSession, SourceSession};
use crate::error::{Result, SyncError};
use crate::registry::TableDescriptor;

/// An error tagged with the stage that produced it.
#[derive(Debug)]
struct StageFailure {
    stage: SyncStage,
    error: SyncError,
}

trait AtStage<T> {
    fn at(self, stage: SyncStage) -> std::result::Result<T, StageFailure>;
}

impl<T> AtStage<T> for Result<T> {
    fn at(self, stage: SyncStage) -> std::result::Result<T, StageFailure> {
        self.map_err(|error| StageFailure { stage, error })
    }
}

/// Connections opened during one sync, closed on every exit path.
#[derive(Default)]
struct Sessions {
    source: Option<Box<dyn SourceSession>>,
    destination: Option<Box<dyn DestinationSession>>,
    transaction_open: bool,
}

impl Sessions {
    async fn rollback_if_open(&mut self, table: &str) {
        if !self.transaction_open {
            return;
        }
        if let Some(destination) = self.destination.as_mut() {
            match destination.rollback().await {
                Ok(()) => info!("{}: destination changes rolled back", table),
                Err(e) => warn!("{}: rollback failed: {}", table, e),
            }
        }
        self.transaction_open = false;
    }

    async fn teardown(&mut self) {
        if let Some(source) = self.source.take() {
            if let Err(e) = source.close().await {
                debug!("Error closing source connection: {}", e);
            }
        }
        if let Some(destination) = self.destination.take() {
            if let Err(e) = destination.close().await {
                debug!("Error closing destination connection: {}", e);
            }
        }
    }
}

/// Runs the sync protocol for one table at a time.
///
/// Cheap to clone; clones share the connector.
#[derive(Clone)]
pub struct TableSyncEngine {
    connector: Arc<dyn Connector>,
}

impl TableSyncEngine {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }

    /// Replace the destination table with the current source snapshot.
    pub async fn sync(&self, table: &TableDescriptor) -> SyncOutcome {
        let span = info_span!("sync_table", table = %table.name);
        self.sync_inner(table).instrument(span).await
    }

    async fn sync_inner(&self, table: &TableDescriptor) -> SyncOutcome {
        let started = Instant::now();
        let mut outcome = SyncOutcome::pending(&table.name);
        let mut sessions = Sessions::default();

        info!(
            "Starting sync: {} -> {}",
            table.source_object, table.destination_object
        );

        match self.run_stages(table, &mut sessions, &mut outcome).await {
            Ok(()) => outcome.succeeded = true,
            Err(failure) => {
                error!(
                    "{}: failed during {}: {}",
                    table.name, failure.stage, failure.error
                );
                outcome.error = Some(failure.error.to_string());
                outcome.failed_stage = Some(failure.stage);
                outcome.rows_transferred = 0;
                sessions.rollback_if_open(&table.name).await;
            }
        }

        sessions.teardown().await;
        outcome.elapsed_seconds = started.elapsed().as_secs_f64();

        if outcome.succeeded {
            let rate = if outcome.elapsed_seconds > 0.0 {
                (outcome.rows_transferred as f64 / outcome.elapsed_seconds) as u64
            } else {
                0
            };
            info!(
                "{}: completed ({} rows in {:.2}s, {} rows/s, validation {})",
                table.name,
                outcome.rows_transferred,
                outcome.elapsed_seconds,
                rate,
                if outcome.validation_passed { "passed" } else { "FAILED" }
            );
        }

        outcome
    }

    async fn run_stages(
        &self,
        table: &TableDescriptor,
        sessions: &mut Sessions,
        outcome: &mut SyncOutcome,
    ) -> std::result::Result<(), StageFailure> {
        let source = sessions.source.insert(
            self.connector
                .connect_source(table)
                .await
                .at(SyncStage::ConnectSource)?,
        );
        let destination = sessions.destination.insert(
            self.connector
                .connect_destination()
                .await
                .at(SyncStage::ConnectDestination)?,
        );

        // Extract
        let extract_start = Instant::now();
        let rows = source.fetch_all(table).await.at(SyncStage::Extract)?;
        if let Some(bad) = rows.iter().position(|row| row.len() != table.width()) {
            return Err::<(), _>(SyncError::extraction(
                &table.name,
                format!(
                    "row {} has {} columns, expected {}",
                    bad,
                    rows[bad].len(),
                    table.width()
                ),
            ))
            .at(SyncStage::Extract);
        }
        outcome.extracted_rows = Some(rows.len() as u64);
        info!(
            "Extracted {} rows from {} in {:.2}s",
            rows.len(),
            table.source_object,
            extract_start.elapsed().as_secs_f64()
        );

        if rows.is_empty() {
            warn!(
                "{}: source is empty, leaving {} untouched",
                table.name, table.destination_object
            );
            outcome.validation_passed = true;
            return Ok(());
        }

        // Replace
        destination.begin().await.at(SyncStage::ReplaceDestination)?;
        sessions.transaction_open = true;
        destination
            .truncate(table)
            .await
            .at(SyncStage::ReplaceDestination)?;
        debug!("Truncated {}", table.destination_object);

        // Load
        let total_batches = rows.len().div_ceil(table.batch_size);
        let mut loaded: u64 = 0;
        for (i, chunk) in rows.chunks(table.batch_size).enumerate() {
            destination
                .insert_rows(table, chunk)
                .await
                .at(SyncStage::LoadBatches)?;
            loaded += chunk.len() as u64;
            info!(
                "Batch {}/{}: {} rows ({}/{} loaded)",
                i + 1,
                total_batches,
                chunk.len(),
                loaded,
                rows.len()
            );
        }

        // Commit
        destination.commit().await.at(SyncStage::Commit)?;
        sessions.transaction_open = false;
        outcome.rows_transferred = loaded;

        // Validate (advisory)
        match destination.count_rows(table).await {
            Ok(count) => {
                outcome.destination_rows = Some(count);
                if count == rows.len() as i64 {
                    outcome.validation_passed = true;
                    info!("{}: {} rows (match)", table.name, count);
                } else {
                    warn!(
                        "{}: row count mismatch (extracted={}, destination={})",
                        table.name,
                        rows.len(),
                        count
                    );
                }
            }
            Err(e) => {
                warn!("{}: validation count failed: {}", table.name, e);
            }
        }

        Ok(())
    }

    /// Check that both sides are reachable and the table is readable on each.
    ///
    /// Never writes to the destination. A source failure does not skip the
    /// destination probe.
    pub async fn check_connectivity(&self, table: &TableDescriptor) -> ConnectivityOutcome {
        let span = info_span!("test_table", table = %table.name);
        self.check_inner(table).instrument(span).await
    }

    async fn check_inner(&self, table: &TableDescriptor) -> ConnectivityOutcome {
        let mut outcome = ConnectivityOutcome::new(&table.name);

        match self.connector.connect_source(table).await {
            Ok(mut source) => {
                match source.count_rows(table).await {
                    Ok(count) => {
                        outcome.source_ok = true;
                        outcome.source_rows = Some(count);
                        info!("{}: source reachable ({} rows)", table.name, count);
                    }
                    Err(e) => outcome.source_error = Some(e.to_string()),
                }
                if let Err(e) = source.close().await {
                    debug!("Error closing source connection: {}", e);
                }
            }
            Err(e) => outcome.source_error = Some(e.to_string()),
        }

        match self.connector.connect_destination().await {
            Ok(mut destination) => {
                match destination.count_rows(table).await {
                    Ok(count) => {
                        outcome.destination_ok = true;
                        outcome.destination_rows = Some(count);
                        info!("{}: destination reachable ({} rows)", table.name, count);
                    }
                    Err(e) => outcome.destination_error = Some(e.to_string()),
                }
                if let Err(e) = destination.close().await {
                    debug!("Error closing destination connection: {}", e);
                }
            }
            Err(e) => outcome.destination_error = Some(e.to_string()),
        }

        outcome.overall_ok = outcome.source_ok && outcome.destination_ok;
        if let Some(e) = &outcome.source_error {
            error!("{}: source check failed: {}", table.name, e);
        }
        if let Some(e) = &outcome.destination_error {
            error!("{}: destination check failed: {}", table.name, e);
        }
        outcome
    }
}
