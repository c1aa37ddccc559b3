//! Turns the settings snapshot into connection profiles.

use serde::Serialize;
use tracing::{debug, info};

use super::types::*;
use super::Settings;
use crate::error::Result;
use crate::registry::{TableDescriptor, TableRegistry};

/// Every profile a registry needs, resolved up front by `check-config`.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigReport {
    pub sources: Vec<SourceProfile>,
    pub destination: DestinationProfile,
}

/// Resolves source and destination profiles from a [`Settings`] snapshot.
///
/// Lookups are repeated on every call so each sync attempt sees the
/// snapshot taken at start-up and nothing else.
#[derive(Debug, Clone)]
pub struct ConnectionResolver {
    settings: Settings,
}

impl ConnectionResolver {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Resolve the profile for a source system such as `mctm` or `voipdb`.
    pub fn source_profile(&self, system_id: &str) -> Result<SourceProfile> {
        let prefix = format!("SQL_SERVER_{}", system_id.to_uppercase());
        let key = |suffix: &str| format!("{}_{}", prefix, suffix);
        let s = &self.settings;

        Ok(SourceProfile {
            system_id: system_id.to_string(),
            host: s.require(&key("HOST"))?,
            database: s.require(&key("DB"))?,
            user: s.require(&key("USER"))?,
            password: s.require(&key("PASSWORD"))?,
            port: s.port_or(&key("PORT"), DEFAULT_MSSQL_PORT)?,
            query_timeout_secs: s.u64_or(&key("TIMEOUT"), DEFAULT_QUERY_TIMEOUT_SECS)?,
            login_timeout_secs: s.u64_or(&key("LOGIN_TIMEOUT"), DEFAULT_LOGIN_TIMEOUT_SECS)?,
            charset: s.string_or(&key("CHARSET"), DEFAULT_CHARSET),
            encrypt: s.bool_or(&key("ENCRYPT"), false),
            trust_server_cert: s.bool_or(&key("TRUST_SERVER_CERT"), false),
        })
    }

    /// Resolve the source profile for a table, applying its database override.
    pub fn source_profile_for(&self, table: &TableDescriptor) -> Result<SourceProfile> {
        let profile = self
            .source_profile(&table.source_system)?
            .with_database(table.source_database.as_deref());
        debug!(
            "Resolved {} source for {}: {}",
            profile.system_id,
            table.name,
            profile.endpoint()
        );
        Ok(profile)
    }

    /// Resolve the PostgreSQL destination profile.
    pub fn destination_profile(&self) -> Result<DestinationProfile> {
        let s = &self.settings;
        let ssl_mode = match s.get("PG_SSLMODE") {
            Some(raw) => SslMode::parse(raw)?,
            None => SslMode::default(),
        };

        Ok(DestinationProfile {
            host: s.require("PG_HOST")?,
            database: s.require("PG_DB")?,
            user: s.require("PG_USER")?,
            password: s.require("PG_PASSWORD")?,
            port: s.port_or("PG_PORT", DEFAULT_PG_PORT)?,
            connect_timeout_secs: s.u64_or("PG_CONNECT_TIMEOUT", DEFAULT_CONNECT_TIMEOUT_SECS)?,
            ssl_mode,
        })
    }

    /// Resolve every profile the registry needs, failing on the first problem.
    pub fn validate_all(&self, registry: &TableRegistry) -> Result<ConfigReport> {
        let sources = registry
            .source_systems()
            .into_iter()
            .map(|system| self.source_profile(system))
            .collect::<Result<Vec<_>>>()?;
        let destination = self.destination_profile()?;

        for source in &sources {
            info!("Source {} -> {}", source.system_id, source.endpoint());
        }
        info!(
            "Destination -> {} (sslmode={})",
            destination.endpoint(),
            destination.ssl_mode
        );

        Ok(ConfigReport {
            sources,
            destination,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;

    const BASE: &[(&str, &str)] = &[
        ("SQL_SERVER_MCTM_HOST", "sql-mctm"),
        ("SQL_SERVER_MCTM_DB", "McTM"),
        ("SQL_SERVER_MCTM_USER", "reader"),
        ("SQL_SERVER_MCTM_PASSWORD", "mctm-secret"),
        ("SQL_SERVER_VOIPDB_HOST", "sql-voip"),
        ("SQL_SERVER_VOIPDB_DB", "VoipDB"),
        ("SQL_SERVER_VOIPDB_USER", "reader"),
        ("SQL_SERVER_VOIPDB_PASSWORD", "voip-secret"),
        ("SQL_SERVER_VOIPDB_PORT", "14330"),
        ("SQL_SERVER_VOIPDB_ENCRYPT", "yes"),
        ("PG_HOST", "pg01"),
        ("PG_DB", "replica"),
        ("PG_USER", "loader"),
        ("PG_PASSWORD", "pg-secret"),
    ];

    fn settings_with(extra: &[(&str, &str)]) -> Settings {
        Settings::from_pairs(BASE.iter().chain(extra).copied())
    }

    fn full_settings() -> Settings {
        settings_with(&[])
    }

    #[test]
    fn test_source_profile_defaults() {
        let resolver = ConnectionResolver::new(full_settings());
        let profile = resolver.source_profile("mctm").unwrap();
        assert_eq!(profile.host, "sql-mctm");
        assert_eq!(profile.port, 1433);
        assert_eq!(profile.query_timeout_secs, 60);
        assert_eq!(profile.login_timeout_secs, 30);
        assert_eq!(profile.charset, "UTF-8");
        assert!(!profile.encrypt);
        assert!(!profile.trust_server_cert);
    }

    #[test]
    fn test_source_profile_overrides() {
        let resolver = ConnectionResolver::new(full_settings());
        let profile = resolver.source_profile("voipdb").unwrap();
        assert_eq!(profile.port, 14330);
        assert!(profile.encrypt);
    }

    #[test]
    fn test_missing_source_key_is_named() {
        let resolver = ConnectionResolver::new(Settings::from_pairs([
            ("SQL_SERVER_MCTM_HOST", "sql-mctm"),
            ("SQL_SERVER_MCTM_DB", "McTM"),
            ("SQL_SERVER_MCTM_USER", "reader"),
        ]));
        let err = resolver.source_profile("mctm").unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
        assert!(err.to_string().contains("SQL_SERVER_MCTM_PASSWORD"));
    }

    #[test]
    fn test_bad_integer_rejected() {
        let resolver = ConnectionResolver::new(settings_with(&[("PG_CONNECT_TIMEOUT", "soon")]));
        let err = resolver.destination_profile().unwrap_err();
        assert!(err.to_string().contains("PG_CONNECT_TIMEOUT"));
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn test_destination_profile_defaults() {
        let resolver = ConnectionResolver::new(full_settings());
        let profile = resolver.destination_profile().unwrap();
        assert_eq!(profile.port, 5432);
        assert_eq!(profile.connect_timeout_secs, 30);
        assert_eq!(profile.ssl_mode, SslMode::Prefer);
    }

    #[test]
    fn test_invalid_sslmode_rejected() {
        let resolver = ConnectionResolver::new(settings_with(&[("PG_SSLMODE", "sometimes")]));
        assert!(resolver.destination_profile().is_err());
    }

    #[test]
    fn test_table_database_override() {
        let resolver = ConnectionResolver::new(full_settings());
        let registry = TableRegistry::builtin().unwrap();
        let table = registry.get("voipdb_useragent").unwrap();
        let profile = resolver.source_profile_for(table).unwrap();
        assert_eq!(profile.host, "sql-voip");
        assert_eq!(profile.database, "VoipDB");
    }

    #[test]
    fn test_validate_all_covers_every_system() {
        let resolver = ConnectionResolver::new(full_settings());
        let registry = TableRegistry::builtin().unwrap();
        let report = resolver.validate_all(&registry).unwrap();
        let systems: Vec<&str> = report.sources.iter().map(|s| s.system_id.as_str()).collect();
        assert_eq!(systems, vec!["mctm", "voipdb"]);

        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("mctm-secret"));
        assert!(!json.contains("pg-secret"));
    }

    #[test]
    fn test_validate_all_fails_without_destination() {
        let resolver = ConnectionResolver::new(Settings::from_pairs([
            ("SQL_SERVER_MCTM_HOST", "h"),
            ("SQL_SERVER_MCTM_DB", "d"),
            ("SQL_SERVER_MCTM_USER", "u"),
            ("SQL_SERVER_MCTM_PASSWORD", "p"),
            ("SQL_SERVER_VOIPDB_HOST", "h"),
            ("SQL_SERVER_VOIPDB_DB", "d"),
            ("SQL_SERVER_VOIPDB_USER", "u"),
            ("SQL_SERVER_VOIPDB_PASSWORD", "p"),
        ]));
        let registry = TableRegistry::builtin().unwrap();
        let err = resolver.validate_all(&registry).unwrap_err();
        assert!(err.to_string().contains("PG_HOST"));
    }
}
