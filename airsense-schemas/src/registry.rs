//! Schema Registry for Version Management
//!
//! Centralised, thread-safe lookup of the Avro schemas outputs are written
//! with. Schemas are registered under a qualified name `<name>_v<N>`; the
//! registry tracks every version of a name and which one is the latest.

use apache_avro::Schema;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{schemas, SchemaError};

/// Schema metadata for registry entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMetadata {
    /// Schema name (e.g., "output_value")
    pub name: String,

    /// Schema version (e.g., "v1", "v2")
    pub version: String,

    /// Full qualified name (e.g., "output_value_v1")
    pub qualified_name: String,

    /// Schema namespace
    pub namespace: String,

    /// Whether this schema is deprecated
    pub deprecated: bool,

    /// Replacement schema if deprecated
    pub replacement: Option<String>,
}

/// Thread-safe schema registry with version management
pub struct SchemaRegistry {
    /// Schemas indexed by qualified name
    schemas: RwLock<HashMap<String, (Schema, SchemaMetadata)>>,

    /// Version mappings (name -> [versions])
    versions: RwLock<HashMap<String, Vec<String>>>,

    /// Latest version for each schema name
    latest: RwLock<HashMap<String, String>>,
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, SchemaError> {
    lock.read().map_err(|_| SchemaError::ParseError("Lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, SchemaError> {
    lock.write().map_err(|_| SchemaError::ParseError("Lock poisoned".to_string()))
}

/// Numeric part of a version tag, `v10` sorts after `v9`
fn version_number(version: &str) -> u32 {
    version.trim_start_matches('v').parse().unwrap_or(0)
}

impl SchemaRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            schemas: RwLock::new(HashMap::new()),
            versions: RwLock::new(HashMap::new()),
            latest: RwLock::new(HashMap::new()),
        }
    }

    /// Registry holding all AirSense schemas
    pub fn with_defaults() -> Result<Self, SchemaError> {
        let registry = Self::new();
        registry.load_defaults()?;
        Ok(registry)
    }

    /// Register a schema with metadata
    pub fn register_with_metadata(&self, schema: Schema, metadata: SchemaMetadata) -> Result<(), SchemaError> {
        let qualified_name = metadata.qualified_name.clone();
        let base_name = metadata.name.clone();
        let version = metadata.version.clone();

        if self.get(&qualified_name).is_ok() {
            return Err(SchemaError::ValidationError(format!(
                "Schema {} already registered",
                qualified_name
            )));
        }

        write(&self.schemas)?.insert(qualified_name, (schema, metadata));

        write(&self.versions)?
            .entry(base_name.clone())
            .or_default()
            .push(version.clone());

        let mut latest = write(&self.latest)?;
        let newer = latest
            .get(&base_name)
            .map_or(true, |current| version_number(&version) > version_number(current));
        if newer {
            latest.insert(base_name, version);
        }

        Ok(())
    }

    /// Register a schema, deriving base name and version from `name`
    pub fn register(&self, name: &str, schema: Schema) -> Result<(), SchemaError> {
        let (base_name, version) = match name.rfind("_v") {
            Some(pos) => (name[..pos].to_string(), name[pos + 1..].to_string()),
            None => (name.to_string(), "v1".to_string()),
        };

        let metadata = SchemaMetadata {
            name: base_name,
            version,
            qualified_name: name.to_string(),
            namespace: schemas::NAMESPACE.to_string(),
            deprecated: false,
            replacement: None,
        };

        self.register_with_metadata(schema, metadata)
    }

    /// Get a schema by qualified name
    pub fn get(&self, name: &str) -> Result<Schema, SchemaError> {
        read(&self.schemas)?
            .get(name)
            .map(|(schema, _)| schema.clone())
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))
    }

    /// Get the latest version of a schema
    pub fn get_latest(&self, base_name: &str) -> Result<Schema, SchemaError> {
        let version = read(&self.latest)?
            .get(base_name)
            .cloned()
            .ok_or_else(|| SchemaError::NotFound(format!("No versions of {}", base_name)))?;

        self.get(&format!("{}_{}", base_name, version))
    }

    /// Get all versions of a schema
    pub fn get_versions(&self, base_name: &str) -> Result<Vec<String>, SchemaError> {
        Ok(read(&self.versions)?.get(base_name).cloned().unwrap_or_default())
    }

    /// Get schema metadata
    pub fn get_metadata(&self, name: &str) -> Result<SchemaMetadata, SchemaError> {
        read(&self.schemas)?
            .get(name)
            .map(|(_, metadata)| metadata.clone())
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))
    }

    /// Mark a schema as deprecated
    pub fn deprecate(&self, name: &str, replacement: Option<String>) -> Result<(), SchemaError> {
        let mut schemas = write(&self.schemas)?;
        let (_schema, metadata) = schemas
            .get_mut(name)
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))?;

        metadata.deprecated = true;
        metadata.replacement = replacement;

        Ok(())
    }

    /// Load all AirSense schemas
    pub fn load_defaults(&self) -> Result<(), SchemaError> {
        self.register("output_value_v1", schemas::output_value_v1()?)?;
        self.register("record_outcome_v1", schemas::record_outcome_v1()?)?;
        Ok(())
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
