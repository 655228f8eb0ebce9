//! Named schema lookup with a read-mostly cache.
//!
//! Schemas come from pluggable [`SchemaSource`]s. The built-in response
//! schemas are embedded in the binary; a [`DirectorySource`] adds or
//! overrides schemas from `{dir}/{name}.json`.
//!
//! # Example
//!
//! ```
//! use docanchor::schema::SchemaStore;
//! use serde_json::json;
//!
//! let store = SchemaStore::with_defaults();
//! let report = store
//!     .validate(&json!({"summary": "All clear"}), "general_response")
//!     .unwrap();
//! assert!(report.valid);
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use rand::Rng;
use serde_json::Value;

use super::definition::SchemaDef;
use super::sample::generate_sample_with_rng;
use super::validate::{validate_data_against_schema, ValidationReport};
use crate::error::{Error, Result};

/// Built-in schemas as `(name, json)` pairs.
const BUILTIN_SCHEMAS: &[(&str, &str)] = &[
    (
        "translation_response",
        include_str!("../../schemas/translation_response.json"),
    ),
    (
        "contradiction_response",
        include_str!("../../schemas/contradiction_response.json"),
    ),
    (
        "ambiguity_response",
        include_str!("../../schemas/ambiguity_response.json"),
    ),
    (
        "general_response",
        include_str!("../../schemas/general_response.json"),
    ),
];

/// A place schema documents can be loaded from.
pub trait SchemaSource: Send + Sync {
    /// Name of this source, for logging.
    fn name(&self) -> &str;

    /// Load the JSON text of a schema, or `None` if this source lacks it.
    fn load(&self, schema_name: &str) -> Result<Option<String>>;

    /// Names of every schema this source can provide.
    fn list(&self) -> Result<Vec<String>>;
}

/// Schemas compiled into the library.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedSchemas;

impl SchemaSource for EmbeddedSchemas {
    fn name(&self) -> &str {
        "embedded"
    }

    fn load(&self, schema_name: &str) -> Result<Option<String>> {
        Ok(BUILTIN_SCHEMAS
            .iter()
            .find(|(name, _)| *name == schema_name)
            .map(|(_, text)| text.to_string()))
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(BUILTIN_SCHEMAS
            .iter()
            .map(|(name, _)| name.to_string())
            .collect())
    }
}

/// Schemas stored as `{dir}/{name}.json` files.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    /// Create a source reading from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory this source reads from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SchemaSource for DirectorySource {
    fn name(&self) -> &str {
        "directory"
    }

    fn load(&self, schema_name: &str) -> Result<Option<String>> {
        // Names are plain identifiers, never paths.
        if schema_name.is_empty()
            || schema_name.contains(['/', '\\'])
            || schema_name.starts_with('.')
        {
            return Ok(None);
        }
        let path = self.dir.join(format!("{}.json", schema_name));
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Registry of schema sources with a memoizing cache.
///
/// Sources registered later take precedence. The cache is only written
/// after a schema parsed completely; two threads racing on a cold entry may
/// both parse it, and the first insert wins.
pub struct SchemaStore {
    sources: Vec<Arc<dyn SchemaSource>>,
    cache: RwLock<HashMap<String, Arc<SchemaDef>>>,
}

impl SchemaStore {
    /// Create a store with no sources.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store serving the built-in schemas.
    pub fn with_defaults() -> Self {
        let mut store = Self::new();
        store.register(Arc::new(EmbeddedSchemas));
        store
    }

    /// Create a store serving the built-in schemas, overridden by `dir`.
    pub fn with_directory(dir: impl Into<PathBuf>) -> Self {
        let mut store = Self::with_defaults();
        store.register(Arc::new(DirectorySource::new(dir)));
        store
    }

    /// Register a source; it takes precedence over earlier ones.
    pub fn register(&mut self, source: Arc<dyn SchemaSource>) {
        self.sources.push(source);
        self.clear_cache();
    }

    /// Load a schema by name, parsing it at most once per cache lifetime.
    pub fn get_schema(&self, name: &str) -> Result<Arc<SchemaDef>> {
        if let Some(schema) = self.read_cache().get(name) {
            log::debug!("Schema cache hit: {}", name);
            return Ok(schema.clone());
        }

        for source in self.sources.iter().rev() {
            let Some(text) = source.load(name)? else {
                continue;
            };
            let schema = Arc::new(SchemaDef::from_json(name, &text)?);
            log::debug!("Loaded schema '{}' from {} source", name, source.name());

            let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
            let entry = cache.entry(name.to_string()).or_insert(schema);
            return Ok(entry.clone());
        }

        Err(Error::SchemaNotFound(name.to_string()))
    }

    /// Names of every schema any source can provide, sorted.
    pub fn list_schemas(&self) -> Vec<String> {
        let mut names = Vec::new();
        for source in &self.sources {
            match source.list() {
                Ok(found) => names.extend(found),
                Err(e) => log::warn!("Cannot list schemas from {} source: {}", source.name(), e),
            }
        }
        names.sort();
        names.dedup();
        names
    }

    /// Validate `data` against the named schema.
    pub fn validate(&self, data: &Value, name: &str) -> Result<ValidationReport> {
        let schema = self.get_schema(name)?;
        Ok(validate_data_against_schema(data, &schema))
    }

    /// Generate a sample response for the named schema.
    pub fn generate_sample_response(&self, name: &str) -> Result<Value> {
        self.generate_sample_with_rng(name, &mut rand::thread_rng())
    }

    /// Generate a sample response with a caller-supplied RNG.
    pub fn generate_sample_with_rng<R: Rng + ?Sized>(
        &self,
        name: &str,
        rng: &mut R,
    ) -> Result<Value> {
        let schema = self.get_schema(name)?;
        Ok(generate_sample_with_rng(&schema, rng))
    }

    /// Number of cached schemas.
    pub fn cached_count(&self) -> usize {
        self.read_cache().len()
    }

    /// Drop every cached schema.
    pub fn clear_cache(&self) {
        self.cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn read_cache(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<SchemaDef>>> {
        self.cache.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for SchemaStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for SchemaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sources: Vec<&str> = self.sources.iter().map(|s| s.name()).collect();
        f.debug_struct("SchemaStore")
            .field("sources", &sources)
            .field("cached", &self.cached_count())
            .finish()
    }
}
