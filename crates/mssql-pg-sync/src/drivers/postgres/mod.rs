//! PostgreSQL destination sessions over tokio-postgres.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, info};

use crate::config::DestinationProfile;
use crate::core::{DestinationSession, Row};
use crate::dialect::postgres;
use crate::drivers::common::TlsBuilder;
use crate::error::{Result, SyncError};
use crate::registry::TableDescriptor;

fn build_config(profile: &DestinationProfile, tls: &TlsBuilder) -> tokio_postgres::Config {
    let mut config = tokio_postgres::Config::new();
    config
        .host(&profile.host)
        .port(profile.port)
        .dbname(&profile.database)
        .user(&profile.user)
        .password(&profile.password)
        .application_name("mssql-pg-sync")
        .connect_timeout(Duration::from_secs(profile.connect_timeout_secs))
        .ssl_mode(tls.driver_mode());
    config
}

fn spawn_connection<F>(connection: F) -> JoinHandle<()>
where
    F: Future<Output = std::result::Result<(), tokio_postgres::Error>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            debug!("PostgreSQL connection closed with error: {}", e);
        }
    })
}

/// One open connection to the PostgreSQL destination.
pub struct PgSession {
    client: Client,
    connection: JoinHandle<()>,
}

impl PgSession {
    /// Connect, negotiating TLS according to the profile's sslmode.
    pub async fn connect(profile: &DestinationProfile) -> Result<Self> {
        let tls = TlsBuilder::new(profile.ssl_mode);
        let config = build_config(profile, &tls);

        let (client, connection) = match tls.build()? {
            None => {
                let (client, conn) = config
                    .connect(NoTls)
                    .await
                    .map_err(|e| SyncError::connection("destination", e.to_string()))?;
                (client, spawn_connection(conn))
            }
            Some(connector) => {
                let (client, conn) = config
                    .connect(connector)
                    .await
                    .map_err(|e| SyncError::connection("destination", e.to_string()))?;
                (client, spawn_connection(conn))
            }
        };

        info!(
            "Connected to PostgreSQL: {} (sslmode={})",
            profile.endpoint(),
            profile.ssl_mode
        );

        Ok(Self { client, connection })
    }
}

#[async_trait]
impl DestinationSession for PgSession {
    async fn begin(&mut self) -> Result<()> {
        self.client.batch_execute("BEGIN").await?;
        Ok(())
    }

    async fn truncate(&mut self, table: &TableDescriptor) -> Result<()> {
        let sql = postgres::truncate(table);
        debug!("{}", sql);
        self.client
            .batch_execute(&sql)
            .await
            .map_err(|e| SyncError::load(&table.name, e.to_string()))
    }

    async fn insert_rows(&mut self, table: &TableDescriptor, rows: &[Row]) -> Result<u64> {
        let sql = postgres::insert_rows(table, rows);
        debug!(
            "Insert {} rows into {}: {:.120}",
            rows.len(),
            table.destination_object,
            sql
        );
        self.client
            .execute(sql.as_str(), &[])
            .await
            .map_err(|e| SyncError::load(&table.name, e.to_string()))
    }

    async fn commit(&mut self) -> Result<()> {
        self.client.batch_execute("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.client.batch_execute("ROLLBACK").await?;
        Ok(())
    }

    async fn count_rows(&mut self, table: &TableDescriptor) -> Result<i64> {
        let row = self
            .client
            .query_one(postgres::count_rows(table).as_str(), &[])
            .await?;
        Ok(row.get::<_, i64>(0))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let PgSession { client, connection } = *self;
        drop(client);
        if let Err(e) = connection.await {
            debug!("PostgreSQL connection task ended abnormally: {}", e);
        }
        Ok(())
    }
}
