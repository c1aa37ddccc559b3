//! Resolved connection profiles.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::{Result, SyncError};

/// Default SQL Server port.
pub const DEFAULT_MSSQL_PORT: u16 = 1433;
/// Default PostgreSQL port.
pub const DEFAULT_PG_PORT: u16 = 5432;
/// Default source query timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 60;
/// Default source login timeout in seconds.
pub const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 30;
/// Default destination connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
/// Default client charset reported for source connections.
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// SSL verification modes for PostgreSQL connections.
///
/// These modes match PostgreSQL's standard `sslmode` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    /// No SSL/TLS (plain TCP connection).
    Disable,
    /// Try TLS without certificate verification, fall back to plain TCP.
    #[default]
    Prefer,
    /// Use SSL but don't verify server certificate.
    /// **Security Warning**: Vulnerable to man-in-the-middle attacks.
    Require,
    /// Verify server certificate against CA but not hostname.
    VerifyCa,
    /// Full certificate and hostname verification.
    VerifyFull,
}

impl SslMode {
    /// Parse an SSL mode from a string.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "prefer" | "" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            "verify-ca" => Ok(SslMode::VerifyCa),
            "verify-full" => Ok(SslMode::VerifyFull),
            other => Err(SyncError::Config(format!(
                "Invalid PG_SSLMODE '{}'. Valid values: disable, prefer, require, verify-ca, verify-full",
                other
            ))),
        }
    }

    /// Check if this mode may negotiate TLS.
    pub fn uses_tls(&self) -> bool {
        !matches!(self, SslMode::Disable)
    }

    /// Check if a plain connection is unacceptable.
    pub fn requires_tls(&self) -> bool {
        matches!(
            self,
            SslMode::Require | SslMode::VerifyCa | SslMode::VerifyFull
        )
    }
}

impl fmt::Display for SslMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SslMode::Disable => "disable",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
            SslMode::VerifyCa => "verify-ca",
            SslMode::VerifyFull => "verify-full",
        };
        f.write_str(s)
    }
}

fn mask_password<S: Serializer>(password: &str, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    if password.is_empty() {
        serializer.serialize_str("")
    } else {
        serializer.serialize_str("***")
    }
}

/// Connection parameters for one SQL Server source system.
#[derive(Clone, Serialize)]
pub struct SourceProfile {
    /// Source system identifier (e.g. `mctm`).
    pub system_id: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(serialize_with = "mask_password")]
    pub password: String,
    /// Timeout applied to extraction and count queries.
    pub query_timeout_secs: u64,
    /// Timeout applied to TCP connect plus login.
    pub login_timeout_secs: u64,
    pub charset: String,
    pub encrypt: bool,
    pub trust_server_cert: bool,
}

impl SourceProfile {
    /// Same profile pointed at another database on the same server.
    pub fn with_database(mut self, database: Option<&str>) -> Self {
        if let Some(db) = database {
            self.database = db.to_string();
        }
        self
    }

    /// `host:port/database`, safe to log.
    pub fn endpoint(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

impl fmt::Debug for SourceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceProfile")
            .field("system_id", &self.system_id)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("query_timeout_secs", &self.query_timeout_secs)
            .field("login_timeout_secs", &self.login_timeout_secs)
            .field("charset", &self.charset)
            .field("encrypt", &self.encrypt)
            .field("trust_server_cert", &self.trust_server_cert)
            .finish()
    }
}

/// Connection parameters for the PostgreSQL destination.
#[derive(Clone, Serialize)]
pub struct DestinationProfile {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(serialize_with = "mask_password")]
    pub password: String,
    pub connect_timeout_secs: u64,
    pub ssl_mode: SslMode,
}

impl DestinationProfile {
    /// `host:port/database`, safe to log.
    pub fn endpoint(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

impl fmt::Debug for DestinationProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestinationProfile")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}
