//! Configuration for pair stores and the `pairs` CLI

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_TABLE: &str = "pairs";
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Column types and indexes of a pair table.
///
/// Textual form is `KEY TYPE|VALUE TYPE|INDEX KEY|INDEX VALUE`, e.g. the
/// default `INTEGER PRIMARY KEY|TEXT UNIQUE|0|0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeSpec {
    pub key_type: String,
    pub value_type: String,
    pub index_key: bool,
    pub index_value: bool,
}

impl Default for TypeSpec {
    fn default() -> Self {
        Self {
            key_type: "INTEGER PRIMARY KEY".to_string(),
            value_type: "TEXT UNIQUE".to_string(),
            index_key: false,
            index_value: false,
        }
    }
}

impl TypeSpec {
    pub fn new(key_type: &str, value_type: &str) -> Self {
        Self {
            key_type: key_type.to_string(),
            value_type: value_type.to_string(),
            index_key: false,
            index_value: false,
        }
    }

    pub fn with_key_index(mut self, index: bool) -> Self {
        self.index_key = index;
        self
    }

    pub fn with_value_index(mut self, index: bool) -> Self {
        self.index_value = index;
        self
    }

    /// Whether the value column carries a `UNIQUE` constraint
    pub fn value_is_unique(&self) -> bool {
        self.value_type.to_ascii_uppercase().contains("UNIQUE")
    }

    /// Whether `value → key` lookups may be cached for a table created
    /// from this spec
    pub fn caches_values(&self) -> bool {
        self.index_value || self.value_is_unique()
    }
}

impl FromStr for TypeSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let fields: Vec<&str> = s.split('|').map(str::trim).collect();
        let &[key_type, value_type, index_key, index_value] = fields.as_slice() else {
            return Err(Error::InvalidTypeSpec(format!(
                "expected 4 '|'-separated fields, got {}: {}",
                fields.len(),
                s
            )));
        };
        Ok(Self {
            key_type: key_type.to_string(),
            value_type: value_type.to_string(),
            index_key: parse_flag(index_key)?,
            index_value: parse_flag(index_value)?,
        })
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.key_type, self.value_type, self.index_key as u8, self.index_value as u8
        )
    }
}

fn parse_flag(flag: &str) -> Result<bool> {
    match flag.to_lowercase().as_str() {
        "" | "0" | "false" | "no" => Ok(false),
        "1" | "true" | "yes" => Ok(true),
        other => Err(Error::InvalidTypeSpec(format!("invalid index flag: {}", other))),
    }
}

/// Everything needed to bind a `PairStore` to a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairsConfig {
    /// Table name; must be a plain SQL identifier
    pub table: String,
    /// Run schema bootstrap (pragmas, table, indexes) on open. Only a
    /// writable store caches `value → key` lookups.
    pub writable: bool,
    /// Trusted as the table's actual column definition when `writable`
    pub types: TypeSpec,
    /// Maximum key-side cache entries before a bulk flush
    pub cache_capacity: usize,
}

impl Default for PairsConfig {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            writable: false,
            types: TypeSpec::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl PairsConfig {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn writable(mut self, writable: bool) -> Self {
        self.writable = writable;
        self
    }

    pub fn types(mut self, types: TypeSpec) -> Self {
        self.types = types;
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }
}

/// Contents of `pairs.toml`; command-line flags take precedence.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CliConfig {
    pub database: Option<String>,
    pub table: Option<String>,
    pub types: Option<String>,
    pub cache_size: Option<usize>,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("pairs.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<CliConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: CliConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &CliConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_type_spec() {
        let spec = TypeSpec::default();
        assert_eq!(spec.to_string(), "INTEGER PRIMARY KEY|TEXT UNIQUE|0|0");
        assert!(spec.value_is_unique());
        assert!(spec.caches_values());
    }

    #[test]
    fn test_parse_type_spec() {
        let spec: TypeSpec = "TEXT PRIMARY KEY|BLOB|0|1".parse().unwrap();
        assert_eq!(spec.key_type, "TEXT PRIMARY KEY");
        assert_eq!(spec.value_type, "BLOB");
        assert!(!spec.index_key);
        assert!(spec.index_value);
        assert!(spec.caches_values());

        let plain: TypeSpec = "INTEGER|TEXT|1|0".parse().unwrap();
        assert!(!plain.caches_values());

        assert!("INTEGER|TEXT".parse::<TypeSpec>().is_err());
        assert!("INTEGER|TEXT|maybe|0".parse::<TypeSpec>().is_err());
    }

    #[test]
    fn test_config_toml() {
        let config: CliConfig = toml::from_str(
            r#"
            database = "data/ids.db"
            table = "ids"
            types = "INTEGER PRIMARY KEY|TEXT UNIQUE|0|0"
            cache_size = 64
            "#,
        )
        .unwrap();
        assert_eq!(config.database.as_deref(), Some("data/ids.db"));
        assert_eq!(config.cache_size, Some(64));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairs.toml");
        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());
        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded.table.as_deref(), Some("ids"));
    }

    #[test]
    fn test_pairs_config_builder() {
        let config = PairsConfig::new("ids").writable(true).cache_capacity(16);
        assert_eq!(config.table, "ids");
        assert!(config.writable);
        assert_eq!(config.cache_capacity, 16);
        assert_eq!(config.types, TypeSpec::default());
    }
}
