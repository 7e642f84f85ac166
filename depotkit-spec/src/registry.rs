//! The process-wide, replaceable table of document schemas.

use crate::catalog::BUILTIN_SCHEMAS;
use crate::document::{self, Validation};
use crate::schema::SpecSchema;
use crate::{SpecError, SpecResult};
use depotkit_types::{SpecRecord, TagMap};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};
use tracing::{debug, warn};

/// Registry of document schemas, keyed by document type name.
///
/// Registration replaces any previous schema for the type — servers may
/// supply a newer definition the first time a type is seen, and the last
/// writer wins. The table is internally synchronized; sessions share one
/// instance per process unless given their own.
pub struct SchemaRegistry {
    table: RwLock<HashMap<String, Arc<SpecSchema>>>,
}

impl SchemaRegistry {
    /// An empty registry with no schemas at all.
    pub fn new() -> Self {
        Self {
            table: RwLock::new(HashMap::new()),
        }
    }

    /// A registry pre-loaded with the built-in catalog.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.load_builtins();
        registry
    }

    /// The process-wide shared registry, created on first use.
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<SchemaRegistry>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(Self::with_builtins())))
    }

    fn load_builtins(&self) {
        for (doc_type, text) in BUILTIN_SCHEMAS {
            // The catalog is compile-time data; a parse failure here is a
            // packaging defect, not a runtime condition.
            match SpecSchema::parse(text) {
                Ok(schema) => {
                    self.table
                        .write()
                        .unwrap_or_else(|e| e.into_inner())
                        .insert((*doc_type).to_string(), Arc::new(schema));
                }
                Err(e) => warn!(doc_type, error = %e, "skipping builtin schema"),
            }
        }
    }

    /// Whether a schema is registered for `doc_type`.
    pub fn has_schema(&self, doc_type: &str) -> bool {
        self.table
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(doc_type)
    }

    /// Parses and registers a schema, replacing any existing one.
    pub fn register(&self, doc_type: &str, schema_text: &str) -> SpecResult<()> {
        let schema = SpecSchema::parse(schema_text)?;
        debug!(doc_type, "registering schema");
        self.table
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(doc_type.to_string(), Arc::new(schema));
        Ok(())
    }

    /// Drops every registered schema and reloads the built-in catalog.
    pub fn reset(&self) {
        self.table
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.load_builtins();
    }

    /// The schema for `doc_type`, if registered.
    pub fn schema(&self, doc_type: &str) -> Option<Arc<SpecSchema>> {
        self.table
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(doc_type)
            .cloned()
    }

    fn require(&self, doc_type: &str) -> SpecResult<Arc<SpecSchema>> {
        self.schema(doc_type)
            .ok_or_else(|| SpecError::schema_missing(doc_type))
    }

    /// Maps lowercase field names to canonical tags for `doc_type`.
    pub fn field_names(&self, doc_type: &str) -> SpecResult<TagMap> {
        Ok(self.require(doc_type)?.field_names())
    }

    /// Parses caller-supplied form text into a flattened record,
    /// validating it against the schema.
    pub fn parse_document(&self, doc_type: &str, form_text: &str) -> SpecResult<SpecRecord> {
        let schema = self.require(doc_type)?;
        document::parse(&schema, form_text, Validation::Strict)
    }

    /// Renders a flattened record back to canonical form text.
    pub fn render_document(&self, doc_type: &str, record: &SpecRecord) -> SpecResult<String> {
        let schema = self.require(doc_type)?;
        document::render(&schema, record)
    }

    /// Converts a tagged server record into a spec record, normalizing the
    /// list numbering through a render/parse pass and capturing the
    /// `extraTag<n>` indirection. Returns `None` when the type has no
    /// schema or the record does not shape up as a form.
    pub fn convert_record(&self, doc_type: &str, record: &TagMap) -> Option<SpecRecord> {
        let schema = self.schema(doc_type)?;
        let form = document::render_known(&schema, record);
        match document::parse(&schema, &form, Validation::Lenient) {
            Ok(mut spec) => {
                capture_extras(&mut spec, record);
                Some(spec)
            }
            Err(e) => {
                debug!(doc_type, error = %e, "tagged record did not convert");
                None
            }
        }
    }

    /// Parses a server-supplied textual form (old-style `data` output)
    /// into a spec record without validating, capturing extras from the
    /// surrounding record.
    pub fn convert_form_text(
        &self,
        doc_type: &str,
        form_text: &str,
        record: &TagMap,
    ) -> SpecResult<SpecRecord> {
        let schema = self.require(doc_type)?;
        let mut spec = document::parse(&schema, form_text, Validation::Lenient)?;
        capture_extras(&mut spec, record);
        Ok(spec)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Follows the `extraTag<n>` indirection: `extraTag0 = "name"` plus
/// `name = value` exposes `name`/`value` as an extra field.
fn capture_extras(spec: &mut SpecRecord, record: &TagMap) {
    for n in 0.. {
        let Some(target) = record.get(&format!("extraTag{n}")) else {
            break;
        };
        if let Some(value) = record.get(target) {
            spec.insert_extra(target.clone(), value.clone());
        }
    }
}
