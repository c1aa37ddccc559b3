//! Connection seams between the sync engine and the databases.
//!
//! - [`Connector`]: opens one source and one destination session per table
//! - [`SourceSession`]: snapshot reads and count probes on the source
//! - [`DestinationSession`]: transactional replace and count probes on the destination
//!
//! The engine only talks to these traits; `drivers` provides the tiberius and
//! tokio-postgres implementations and tests use an in-memory one.

use async_trait::async_trait;

use crate::error::Result;
use crate::registry::TableDescriptor;

use super::value::Row;

/// Opens fresh connections for a single table sync.
///
/// Nothing is pooled: every call returns a new session that the caller owns
/// and must close.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a session against the source system the table belongs to.
    async fn connect_source(&self, table: &TableDescriptor) -> Result<Box<dyn SourceSession>>;

    /// Open a session against the destination database.
    async fn connect_destination(&self) -> Result<Box<dyn DestinationSession>>;
}

/// An open connection to the source database.
#[async_trait]
pub trait SourceSession: Send {
    /// Read every row of the table in ordering-key order.
    async fn fetch_all(&mut self, table: &TableDescriptor) -> Result<Vec<Row>>;

    /// Count the rows of the source table without locking it.
    async fn count_rows(&mut self, table: &TableDescriptor) -> Result<i64>;

    /// Close the connection.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// An open connection to the destination database.
#[async_trait]
pub trait DestinationSession: Send {
    /// Start the transaction that spans truncate and all inserts.
    async fn begin(&mut self) -> Result<()>;

    /// Remove every row of the destination table.
    async fn truncate(&mut self, table: &TableDescriptor) -> Result<()>;

    /// Insert one chunk of rows as a single statement, returning rows affected.
    async fn insert_rows(&mut self, table: &TableDescriptor, rows: &[Row]) -> Result<u64>;

    /// Commit the open transaction.
    async fn commit(&mut self) -> Result<()>;

    /// Roll back the open transaction.
    async fn rollback(&mut self) -> Result<()>;

    /// Count the rows currently visible in the destination table.
    async fn count_rows(&mut self, table: &TableDescriptor) -> Result<i64>;

    /// Close the connection.
    async fn close(self: Box<Self>) -> Result<()>;
}
