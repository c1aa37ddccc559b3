//! Configuration snapshot and connection profile resolution.

mod resolver;
mod types;

pub use resolver::{ConfigReport, ConnectionResolver};
pub use types::*;

use std::collections::HashMap;
use std::fmt;

use crate::error::{Result, SyncError};

/// Immutable snapshot of process configuration.
///
/// Built once at start-up from the environment (after an optional `.env`
/// file has been loaded) and handed to the resolver. Business logic never
/// reads the environment directly.
#[derive(Clone, Default)]
pub struct Settings {
    values: HashMap<String, String>,
}

impl Settings {
    /// Snapshot the current process environment.
    pub fn from_env() -> Self {
        Self::from_pairs(std::env::vars())
    }

    /// Build settings from explicit key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up a key. Empty values count as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Look up a key that must be present.
    pub fn require(&self, key: &str) -> Result<String> {
        self.get(key).map(str::to_string).ok_or_else(|| {
            SyncError::Config(format!("Missing required environment variable: {}", key))
        })
    }

    /// Look up a string with a default.
    pub fn string_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    /// Look up an unsigned integer with a default.
    pub fn u64_or(&self, key: &str, default: u64) -> Result<u64> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|_| {
                SyncError::Config(format!("Invalid integer value for {}: '{}'", key, raw))
            }),
        }
    }

    /// Look up a port number with a default.
    pub fn port_or(&self, key: &str, default: u16) -> Result<u16> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|_| {
                SyncError::Config(format!("Invalid integer value for {}: '{}'", key, raw))
            }),
        }
    }

    /// Look up a boolean with a default. `true`, `1`, `yes` and `on` are true.
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            None => default,
            Some(raw) => matches!(
                raw.to_lowercase().as_str(),
                "true" | "1" | "yes" | "on"
            ),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("Settings").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_names_missing_key() {
        let settings = Settings::default();
        let err = settings.require("PG_HOST").unwrap_err();
        assert!(err.to_string().contains("PG_HOST"));
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let settings = Settings::from_pairs([("PG_HOST", "  ")]);
        assert!(settings.get("PG_HOST").is_none());
        assert!(settings.require("PG_HOST").is_err());
    }

    #[test]
    fn test_integer_parsing() {
        let settings = Settings::from_pairs([("A", "42"), ("B", "forty")]);
        assert_eq!(settings.u64_or("A", 1).unwrap(), 42);
        assert_eq!(settings.u64_or("MISSING", 7).unwrap(), 7);
        let err = settings.u64_or("B", 1).unwrap_err();
        assert!(err.to_string().contains("B"));
        assert!(err.to_string().contains("forty"));
    }

    #[test]
    fn test_port_out_of_range_rejected() {
        let settings = Settings::from_pairs([("PG_PORT", "70000")]);
        assert!(settings.port_or("PG_PORT", 5432).is_err());
    }

    #[test]
    fn test_bool_parsing() {
        let settings = Settings::from_pairs([
            ("A", "TRUE"),
            ("B", "1"),
            ("C", "yes"),
            ("D", "On"),
            ("E", "false"),
            ("F", "maybe"),
        ]);
        for key in ["A", "B", "C", "D"] {
            assert!(settings.bool_or(key, false), "{} should be true", key);
        }
        assert!(!settings.bool_or("E", true));
        assert!(!settings.bool_or("F", true));
        assert!(settings.bool_or("MISSING", true));
    }

    #[test]
    fn test_debug_lists_keys_only() {
        let settings = Settings::from_pairs([("PG_PASSWORD", "hunter2")]);
        let debug_output = format!("{:?}", settings);
        assert!(debug_output.contains("PG_PASSWORD"));
        assert!(!debug_output.contains("hunter2"));
    }
}
