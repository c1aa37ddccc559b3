//! # mssql-pg-sync
//!
//! Full-snapshot table sync from Microsoft SQL Server to PostgreSQL.
//!
//! Each registered table is read in full from its SQL Server source and
//! written to its PostgreSQL destination inside a single transaction that
//! truncates the destination first. Readers of the destination see either
//! the previous snapshot or the new one, never a mix.
//!
//! - [`registry`]: the tables that can be synced and their column mappings
//! - [`config`]: connection profiles resolved from environment variables
//! - [`engine`]: the per-table sync protocol
//! - [`orchestrator`]: sequential multi-table runs and their reports
//! - [`dispatch`]: the request/response contract used by the CLI
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mssql_pg_sync::{
//!     ConnectionResolver, DatabaseConnector, Dispatcher, Orchestrator, Settings,
//!     SyncRequest, TableRegistry, TableSyncEngine,
//! };
//!
//! #[tokio::main]
//! async fn main() -> mssql_pg_sync::Result<()> {
//!     let resolver = ConnectionResolver::new(Settings::from_env());
//!     let engine = TableSyncEngine::new(Arc::new(DatabaseConnector::new(resolver)));
//!     let orchestrator = Orchestrator::new(Arc::new(TableRegistry::builtin()?), engine);
//!
//!     let response = Dispatcher::new(orchestrator)
//!         .handle(SyncRequest::default())
//!         .await;
//!     println!("{}", response.to_json()?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod dialect;
pub mod dispatch;
pub mod drivers;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenient access
pub use config::{ConnectionResolver, DestinationProfile, Settings, SourceProfile, SslMode};
pub use dispatch::{DispatchResult, Dispatcher, Mode, SyncRequest, SyncResponse};
pub use drivers::DatabaseConnector;
pub use engine::{ConnectivityOutcome, SyncOutcome, SyncStage, TableSyncEngine};
pub use error::{Result, SyncError};
pub use orchestrator::{BatchReport, ConnectivityReport, Orchestrator};
pub use registry::{Catalog, TableDescriptor, TableRegistry};
