//! Table registry: the fixed set of tables this tool knows how to sync.
//!
//! Descriptors are validated once when the registry is built, so the engine
//! can rely on aligned column lists and a usable ordering key.

pub mod builtin;

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

fn default_batch_size() -> usize {
    10_000
}

/// Everything needed to sync one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDescriptor {
    /// Logical name, unique within the registry.
    pub name: String,
    /// Source system identifier selecting the connection profile.
    pub source_system: String,
    /// Database overriding the profile's database for this table.
    pub source_database: Option<String>,
    /// Source table, e.g. `[McTM].[dbo].[Customer]`.
    pub source_object: String,
    /// Destination table, optionally `schema.table`.
    pub destination_object: String,
    /// Projection order of the extraction query.
    pub source_columns: Vec<String>,
    /// Destination columns, positionally aligned with `source_columns`.
    pub destination_columns: Vec<String>,
    /// Column used for `ORDER BY`; not assumed unique.
    pub ordering_key: String,
    /// Rows per insert statement.
    pub batch_size: usize,
    pub description: String,
}

impl TableDescriptor {
    /// Number of columns in each row.
    pub fn width(&self) -> usize {
        self.source_columns.len()
    }

    fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(SyncError::Config(format!("table '{}': {}", self.name, msg)));

        if self.name.trim().is_empty() {
            return Err(SyncError::Config("table name is required".into()));
        }
        if self.source_system.trim().is_empty() {
            return fail("source_system is required".into());
        }
        if self.source_object.trim().is_empty() {
            return fail("source_object is required".into());
        }
        if self.destination_object.trim().is_empty() {
            return fail("destination_object is required".into());
        }
        if self.source_columns.is_empty() {
            return fail("at least one column is required".into());
        }
        if self.source_columns.len() != self.destination_columns.len() {
            return fail(format!(
                "source_columns has {} entries but destination_columns has {}",
                self.source_columns.len(),
                self.destination_columns.len()
            ));
        }
        if let Some(blank) = self
            .source_columns
            .iter()
            .chain(&self.destination_columns)
            .position(|c| c.trim().is_empty())
        {
            return fail(format!("column name at position {} is empty", blank));
        }
        if !self.source_columns.contains(&self.ordering_key) {
            return fail(format!(
                "ordering_key '{}' is not one of source_columns",
                self.ordering_key
            ));
        }
        if self.batch_size == 0 {
            return fail("batch_size must be at least 1".into());
        }
        Ok(())
    }
}

/// One table entry of a registry YAML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTableConfig {
    pub name: String,
    pub source_system: String,
    #[serde(default)]
    pub source_database: Option<String>,
    pub source_object: String,
    pub destination_object: String,
    pub source_columns: Vec<String>,
    pub destination_columns: Vec<String>,
    pub ordering_key: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub description: String,
}

impl From<RawTableConfig> for TableDescriptor {
    fn from(raw: RawTableConfig) -> Self {
        TableDescriptor {
            name: raw.name,
            source_system: raw.source_system,
            source_database: raw.source_database.filter(|db| !db.trim().is_empty()),
            source_object: raw.source_object,
            destination_object: raw.destination_object,
            source_columns: raw.source_columns,
            destination_columns: raw.destination_columns,
            ordering_key: raw.ordering_key,
            batch_size: raw.batch_size,
            description: raw.description,
        }
    }
}

/// Root of a registry YAML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryFile {
    #[serde(default)]
    pub default_order: Option<Vec<String>>,
    pub tables: Vec<RawTableConfig>,
}

/// Summary of one table, as returned by `describe`.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    pub description: String,
    pub source_object: String,
    pub destination_object: String,
    pub column_count: usize,
    pub source_system: String,
    pub source_database: Option<String>,
    pub batch_size: usize,
    pub ordering_key: String,
}

/// Everything the registry knows, without touching a database.
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    pub available_tables: Vec<String>,
    pub default_order: Vec<String>,
    pub tables: Vec<CatalogEntry>,
}

/// Validated, immutable set of table descriptors.
#[derive(Debug, Clone)]
pub struct TableRegistry {
    tables: Vec<TableDescriptor>,
    index: HashMap<String, usize>,
    default_order: Vec<String>,
}

impl TableRegistry {
    /// Build a registry, validating every descriptor.
    ///
    /// Without an explicit default order, registry order is used.
    pub fn new(tables: Vec<TableDescriptor>, default_order: Option<Vec<String>>) -> Result<Self> {
        if tables.is_empty() {
            return Err(SyncError::Config("registry contains no tables".into()));
        }

        let mut index = HashMap::with_capacity(tables.len());
        for (i, table) in tables.iter().enumerate() {
            table.validate()?;
            if index.insert(table.name.clone(), i).is_some() {
                return Err(SyncError::Config(format!(
                    "duplicate table name '{}' in registry",
                    table.name
                )));
            }
        }

        let default_order =
            default_order.unwrap_or_else(|| tables.iter().map(|t| t.name.clone()).collect());
        let mut seen = HashSet::new();
        for name in &default_order {
            if !index.contains_key(name) {
                return Err(SyncError::Config(format!(
                    "default_order references unknown table '{}'",
                    name
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(SyncError::Config(format!(
                    "default_order lists '{}' more than once",
                    name
                )));
            }
        }

        Ok(Self {
            tables,
            index,
            default_order,
        })
    }

    /// The registry shipped with the tool.
    pub fn builtin() -> Result<Self> {
        Self::new(
            builtin::tables(),
            Some(builtin::DEFAULT_ORDER.iter().map(|s| s.to_string()).collect()),
        )
    }

    /// Load a registry from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a registry from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: RegistryFile = serde_yaml::from_str(yaml)?;
        let tables = file.tables.into_iter().map(TableDescriptor::from).collect();
        Self::new(tables, file.default_order)
    }

    /// Look up a table by logical name.
    pub fn get(&self, name: &str) -> Result<&TableDescriptor> {
        self.index
            .get(name)
            .map(|&i| &self.tables[i])
            .ok_or_else(|| SyncError::UnknownTable {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    /// Whether a table with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Table names in registry order.
    pub fn names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Names processed when a caller does not choose tables.
    pub fn default_order(&self) -> &[String] {
        &self.default_order
    }

    /// All descriptors in registry order.
    pub fn tables(&self) -> &[TableDescriptor] {
        &self.tables
    }

    /// Resolve requested names to descriptors, in request order.
    ///
    /// `None` or an empty list selects the default order. The first unknown
    /// name fails the whole request.
    pub fn resolve(&self, names: Option<&[String]>) -> Result<Vec<TableDescriptor>> {
        let names = match names {
            Some(names) if !names.is_empty() => names,
            _ => self.default_order.as_slice(),
        };
        names
            .iter()
            .map(|name| self.get(name).cloned())
            .collect()
    }

    /// Distinct source systems, in first-use order.
    pub fn source_systems(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.tables
            .iter()
            .map(|t| t.source_system.as_str())
            .filter(|s| seen.insert(*s))
            .collect()
    }

    /// Describe every table.
    pub fn catalog(&self) -> Catalog {
        Catalog {
            available_tables: self.names().iter().map(|s| s.to_string()).collect(),
            default_order: self.default_order.clone(),
            tables: self
                .tables
                .iter()
                .map(|t| CatalogEntry {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    source_object: t.source_object.clone(),
                    destination_object: t.destination_object.clone(),
                    column_count: t.width(),
                    source_system: t.source_system.clone(),
                    source_database: t.source_database.clone(),
                    batch_size: t.batch_size,
                    ordering_key: t.ordering_key.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
default_order: [b, a]
tables:
  - name: a
    source_system: mctm
    source_object: "[McTM].[dbo].[A]"
    destination_object: mctm_a
    source_columns: [ID, Name]
    destination_columns: [id, name]
    ordering_key: ID
  - name: b
    source_system: voipdb
    source_database: VoipDB
    source_object: VoipDB.dbo.B
    destination_object: staging.voip_b
    source_columns: [Cd]
    destination_columns: [cd]
    ordering_key: Cd
    batch_size: 500
    description: B rows
"#;

    fn descriptor(name: &str) -> TableDescriptor {
        TableDescriptor {
            name: name.into(),
            source_system: "mctm".into(),
            source_database: None,
            source_object: "[McTM].[dbo].[T]".into(),
            destination_object: "t".into(),
            source_columns: vec!["ID".into(), "Name".into()],
            destination_columns: vec!["id".into(), "name".into()],
            ordering_key: "ID".into(),
            batch_size: 10,
            description: String::new(),
        }
    }

    #[test]
    fn test_builtin_registry() {
        let registry = TableRegistry::builtin().unwrap();
        assert_eq!(
            registry.default_order(),
            &["customer", "mctm_module", "voipdb_customer", "voipdb_useragent"]
        );

        let widths: Vec<usize> = registry.tables().iter().map(|t| t.width()).collect();
        assert_eq!(widths, vec![7, 21, 28, 28]);

        let customer = registry.get("customer").unwrap();
        assert_eq!(customer.source_object, "[McTM].[dbo].[Customer]");
        assert_eq!(customer.destination_object, "mctm_customer");
        assert_eq!(customer.ordering_key, "CD");
        assert_eq!(customer.batch_size, 10_000);
        assert_eq!(customer.destination_columns[3], "dairiten_id");

        let useragent = registry.get("voipdb_useragent").unwrap();
        assert_eq!(useragent.source_system, "voipdb");
        assert_eq!(useragent.source_database.as_deref(), Some("VoipDB"));
        assert_eq!(useragent.ordering_key, "Id");
    }

    #[test]
    fn test_unknown_table_lists_available() {
        let registry = TableRegistry::builtin().unwrap();
        match registry.get("nope") {
            Err(SyncError::UnknownTable { name, available }) => {
                assert_eq!(name, "nope");
                assert!(available.contains("customer"));
                assert!(available.contains("voipdb_useragent"));
            }
            other => panic!("expected UnknownTable, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_defaults_and_order() {
        let registry = TableRegistry::builtin().unwrap();
        assert_eq!(registry.resolve(None).unwrap().len(), 4);
        assert_eq!(registry.resolve(Some(Vec::<String>::new().as_slice())).unwrap().len(), 4);

        let picked = registry
            .resolve(Some(["voipdb_customer".to_string(), "customer".to_string()].as_slice()))
            .unwrap();
        let names: Vec<&str> = picked.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["voipdb_customer", "customer"]);

        assert!(registry
            .resolve(Some(["customer".to_string(), "missing".to_string()].as_slice()))
            .is_err());
    }

    #[test]
    fn test_from_yaml() {
        let registry = TableRegistry::from_yaml(YAML).unwrap();
        assert_eq!(registry.names(), vec!["a", "b"]);
        assert_eq!(registry.default_order(), &["b", "a"]);
        assert_eq!(registry.get("a").unwrap().batch_size, 10_000);
        assert_eq!(registry.get("b").unwrap().batch_size, 500);
        assert_eq!(registry.source_systems(), vec!["mctm", "voipdb"]);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tables.yaml");
        std::fs::write(&path, YAML).unwrap();

        let registry = TableRegistry::load(&path).unwrap();
        assert_eq!(registry.default_order(), &["b".to_string(), "a".to_string()]);

        let missing = TableRegistry::load(dir.path().join("missing.yaml"));
        assert!(matches!(missing, Err(SyncError::Io(_))));
    }

    #[test]
    fn test_yaml_without_default_order_uses_registry_order() {
        let yaml = YAML.replace("default_order: [b, a]\n", "");
        let registry = TableRegistry::from_yaml(&yaml).unwrap();
        assert_eq!(registry.default_order(), &["a", "b"]);
    }

    #[test]
    fn test_mismatched_columns_rejected() {
        let mut t = descriptor("t");
        t.destination_columns.pop();
        let err = TableRegistry::new(vec![t], None).unwrap_err();
        assert!(err.to_string().contains("destination_columns"));
    }

    #[test]
    fn test_ordering_key_must_be_a_column() {
        let mut t = descriptor("t");
        t.ordering_key = "Missing".into();
        let err = TableRegistry::new(vec![t], None).unwrap_err();
        assert!(err.to_string().contains("ordering_key"));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut t = descriptor("t");
        t.batch_size = 0;
        assert!(TableRegistry::new(vec![t], None).is_err());
    }

    #[test]
    fn test_empty_columns_rejected() {
        let mut t = descriptor("t");
        t.source_columns.clear();
        t.destination_columns.clear();
        assert!(TableRegistry::new(vec![t], None).is_err());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = TableRegistry::new(vec![descriptor("t"), descriptor("t")], None).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_default_order_must_reference_known_tables() {
        let err =
            TableRegistry::new(vec![descriptor("t")], Some(vec!["other".into()])).unwrap_err();
        assert!(err.to_string().contains("other"));
    }

    #[test]
    fn test_unknown_yaml_field_rejected() {
        let yaml = YAML.replace("batch_size: 500", "batch_size: 500\n    bogus: 1");
        assert!(matches!(
            TableRegistry::from_yaml(&yaml),
            Err(SyncError::Yaml(_))
        ));
    }

    #[test]
    fn test_catalog() {
        let catalog = TableRegistry::builtin().unwrap().catalog();
        assert_eq!(catalog.available_tables.len(), 4);
        assert_eq!(catalog.tables[1].name, "mctm_module");
        assert_eq!(catalog.tables[1].column_count, 21);
        assert_eq!(catalog.tables[1].source_system, "mctm");
    }
}
