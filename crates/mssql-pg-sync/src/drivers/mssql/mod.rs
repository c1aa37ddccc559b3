//! SQL Server source sessions over tiberius.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, FromSql};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

use crate::config::SourceProfile;
use crate::core::{Row, SourceSession, SqlNullType, SqlValue};
use crate::dialect::mssql;
use crate::error::{Result, SyncError};
use crate::registry::TableDescriptor;

fn build_config(profile: &SourceProfile) -> Config {
    let mut config = Config::new();
    config.host(&profile.host);
    config.port(profile.port);
    config.database(&profile.database);
    config.application_name("mssql-pg-sync");
    config.authentication(AuthMethod::sql_server(&profile.user, &profile.password));

    if profile.encrypt {
        if profile.trust_server_cert {
            config.trust_cert();
        }
        config.encryption(EncryptionLevel::Required);
    } else {
        config.encryption(EncryptionLevel::NotSupported);
    }

    config
}

async fn open_client(config: Config) -> std::result::Result<Client<Compat<TcpStream>>, tiberius::error::Error> {
    let tcp = TcpStream::connect(config.get_addr())
        .await
        .map_err(|e| tiberius::error::Error::Io {
            kind: e.kind(),
            message: e.to_string(),
        })?;

    tcp.set_nodelay(true).ok();

    Client::connect(config, tcp.compat_write()).await
}

/// One open connection to a SQL Server source.
pub struct MssqlSession {
    client: Client<Compat<TcpStream>>,
    query_timeout: Duration,
}

impl MssqlSession {
    /// Connect and log in, bounded by the profile's login timeout.
    pub async fn connect(profile: &SourceProfile) -> Result<Self> {
        let login_timeout = profile.login_timeout_secs;
        debug!(
            "Connecting to MSSQL {} (charset={}, encrypt={})",
            profile.endpoint(),
            profile.charset,
            profile.encrypt
        );

        let client = tokio::time::timeout(
            Duration::from_secs(login_timeout),
            open_client(build_config(profile)),
        )
        .await
        .map_err(|_| SyncError::timeout(format!("MSSQL login to {}", profile.endpoint()), login_timeout))?
        .map_err(|e| SyncError::connection("source", e.to_string()))?;

        info!("Connected to MSSQL: {}", profile.endpoint());

        Ok(Self {
            client,
            query_timeout: Duration::from_secs(profile.query_timeout_secs),
        })
    }
}

#[async_trait]
impl SourceSession for MssqlSession {
    async fn fetch_all(&mut self, table: &TableDescriptor) -> Result<Vec<Row>> {
        let sql = mssql::select_all(table);
        debug!("Extract query: {}", sql);

        let started = Instant::now();
        let timeout = self.query_timeout;
        let client = &mut self.client;
        let rows = tokio::time::timeout(timeout, async {
            let stream = client
                .simple_query(sql)
                .await
                .map_err(|e| SyncError::extraction(&table.name, e.to_string()))?;
            stream
                .into_first_result()
                .await
                .map_err(|e| SyncError::extraction(&table.name, e.to_string()))
        })
        .await
        .map_err(|_| SyncError::timeout(format!("extraction of {}", table.name), timeout.as_secs()))??;

        let rows: Vec<Row> = rows
            .into_iter()
            .map(|row| row.into_iter().map(convert_column).collect())
            .collect();

        debug!(
            "Fetched {} rows from {} in {:.2}s",
            rows.len(),
            table.source_object,
            started.elapsed().as_secs_f64()
        );
        Ok(rows)
    }

    async fn count_rows(&mut self, table: &TableDescriptor) -> Result<i64> {
        let sql = mssql::count_rows(table);
        let operation = format!("source count of {}", table.name);
        let timeout = self.query_timeout;
        let client = &mut self.client;

        let count = tokio::time::timeout(timeout, async {
            let row = client.simple_query(sql).await?.into_row().await?;
            Ok::<_, SyncError>(row.and_then(|r| r.get::<i64, _>(0)).unwrap_or(0))
        })
        .await
        .map_err(|_| SyncError::timeout(operation, timeout.as_secs()))??;

        Ok(count)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }
}

/// Convert one tiberius cell to an owned value.
fn convert_column(data: ColumnData<'static>) -> SqlValue {
    match data {
        ColumnData::Bit(v) => v.map(SqlValue::Bool).unwrap_or(SqlValue::Null(SqlNullType::Bool)),
        ColumnData::U8(v) => v
            .map(|n| SqlValue::I16(i16::from(n)))
            .unwrap_or(SqlValue::Null(SqlNullType::I16)),
        ColumnData::I16(v) => v.map(SqlValue::I16).unwrap_or(SqlValue::Null(SqlNullType::I16)),
        ColumnData::I32(v) => v.map(SqlValue::I32).unwrap_or(SqlValue::Null(SqlNullType::I32)),
        ColumnData::I64(v) => v.map(SqlValue::I64).unwrap_or(SqlValue::Null(SqlNullType::I64)),
        ColumnData::F32(v) => v.map(SqlValue::F32).unwrap_or(SqlValue::Null(SqlNullType::F32)),
        ColumnData::F64(v) => v.map(SqlValue::F64).unwrap_or(SqlValue::Null(SqlNullType::F64)),
        ColumnData::String(v) => v
            .map(|s| SqlValue::Text(s.into_owned()))
            .unwrap_or(SqlValue::Null(SqlNullType::String)),
        ColumnData::Guid(v) => v.map(SqlValue::Uuid).unwrap_or(SqlValue::Null(SqlNullType::Uuid)),
        ColumnData::Binary(v) => v
            .map(|b| SqlValue::Bytes(b.into_owned()))
            .unwrap_or(SqlValue::Null(SqlNullType::Bytes)),
        ColumnData::Numeric(v) => v
            .map(|n| SqlValue::Decimal(Decimal::from_i128_with_scale(n.value(), u32::from(n.scale()))))
            .unwrap_or(SqlValue::Null(SqlNullType::Decimal)),
        ColumnData::Xml(v) => v
            .map(|x| SqlValue::Text(x.into_owned().into_string()))
            .unwrap_or(SqlValue::Null(SqlNullType::String)),
        temporal @ (ColumnData::DateTime(_)
        | ColumnData::SmallDateTime(_)
        | ColumnData::DateTime2(_)) => chrono::NaiveDateTime::from_sql(&temporal)
            .ok()
            .flatten()
            .map(SqlValue::DateTime)
            .unwrap_or(SqlValue::Null(SqlNullType::DateTime)),
        date @ ColumnData::Date(_) => chrono::NaiveDate::from_sql(&date)
            .ok()
            .flatten()
            .map(SqlValue::Date)
            .unwrap_or(SqlValue::Null(SqlNullType::Date)),
        time @ ColumnData::Time(_) => chrono::NaiveTime::from_sql(&time)
            .ok()
            .flatten()
            .map(SqlValue::Time)
            .unwrap_or(SqlValue::Null(SqlNullType::Time)),
        offset @ ColumnData::DateTimeOffset(_) => {
            chrono::DateTime::<chrono::FixedOffset>::from_sql(&offset)
                .ok()
                .flatten()
                .map(SqlValue::DateTimeOffset)
                .unwrap_or(SqlValue::Null(SqlNullType::DateTimeOffset))
        }
    }
}
