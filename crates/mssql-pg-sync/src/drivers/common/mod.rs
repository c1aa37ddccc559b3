//! Helpers shared by the database drivers.
//!
//! - [`tls`]: rustls setup for PostgreSQL connections

pub mod tls;

pub use tls::TlsBuilder;
