//! Database drivers.
//!
//! - [`mssql`]: SQL Server source sessions (tiberius)
//! - [`postgres`]: PostgreSQL destination sessions (tokio-postgres)
//! - [`common`]: TLS setup shared by the drivers
//!
//! [`DatabaseConnector`] ties them to the connection resolver and is the
//! production [`Connector`].

pub mod common;
pub mod mssql;
pub mod postgres;

use async_trait::async_trait;

use crate::config::ConnectionResolver;
use crate::core::{Connector, DestinationSession, SourceSession};
use crate::error::Result;
use crate::registry::TableDescriptor;

pub use mssql::MssqlSession;
pub use postgres::PgSession;

/// Opens real SQL Server and PostgreSQL connections.
///
/// Profiles are resolved on every call, so a missing variable fails only the
/// table that needs it.
#[derive(Debug, Clone)]
pub struct DatabaseConnector {
    resolver: ConnectionResolver,
}

impl DatabaseConnector {
    pub fn new(resolver: ConnectionResolver) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl Connector for DatabaseConnector {
    async fn connect_source(&self, table: &TableDescriptor) -> Result<Box<dyn SourceSession>> {
        let profile = self.resolver.source_profile_for(table)?;
        let session = MssqlSession::connect(&profile).await?;
        Ok(Box::new(session))
    }

    async fn connect_destination(&self) -> Result<Box<dyn DestinationSession>> {
        let profile = self.resolver.destination_profile()?;
        let session = PgSession::connect(&profile).await?;
        Ok(Box::new(session))
    }
}
