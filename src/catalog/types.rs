//! Catalog serialization types

use crate::error::{Error, Result};
use crate::fields::FieldDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// The discovered catalog: one entry per report stream
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub streams: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::catalog(format!("could not read catalog {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(Error::JsonParse)
    }

    pub fn get_stream(&self, tap_stream_id: &str) -> Option<&CatalogEntry> {
        self.streams
            .iter()
            .find(|entry| entry.tap_stream_id == tap_stream_id)
    }
}

/// One stream entry: schema plus a flat metadata list keyed by breadcrumb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub tap_stream_id: String,
    pub stream: String,
    pub key_properties: Vec<String>,
    pub schema: StreamSchema,
    pub metadata: Vec<MetadataEntry>,
}

/// JSON Schema for a stream's records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: BTreeMap<String, Value>,
}

impl Default for StreamSchema {
    fn default() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: BTreeMap::new(),
        }
    }
}

/// One `{breadcrumb, metadata}` pair. The stream-level entry has an
/// empty breadcrumb; field entries use `["properties", <field id>]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub breadcrumb: Vec<String>,
    pub metadata: Map<String, Value>,
}

impl MetadataEntry {
    pub fn stream_level(metadata: Map<String, Value>) -> Self {
        Self {
            breadcrumb: Vec::new(),
            metadata,
        }
    }

    pub fn for_field(field_id: &str, metadata: Map<String, Value>) -> Self {
        Self {
            breadcrumb: vec!["properties".to_string(), field_id.to_string()],
            metadata,
        }
    }

    /// The field id this entry annotates, if it is a field entry
    pub fn field_id(&self) -> Option<&str> {
        match self.breadcrumb.as_slice() {
            [first, id] if first == "properties" => Some(id),
            _ => None,
        }
    }
}

/// The metric and dimension ids a sync run should request for a stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedFields {
    pub metrics: Vec<String>,
    pub dimensions: Vec<String>,
}

impl CatalogEntry {
    /// Metadata map for one field, if present
    pub fn field_metadata(&self, field_id: &str) -> Option<&Map<String, Value>> {
        self.metadata
            .iter()
            .find(|entry| entry.field_id() == Some(field_id))
            .map(|entry| &entry.metadata)
    }

    /// Whether the stream itself is selected for sync. An explicit
    /// stream-level `selected` wins; absent means not selected.
    pub fn is_selected(&self) -> bool {
        self.metadata
            .iter()
            .find(|entry| entry.breadcrumb.is_empty())
            .and_then(|entry| entry.metadata.get("selected"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Resolve the field selection: an explicit `selected` wins, else
    /// `selected-by-default`, else the field is left out. Base automatic
    /// fields are injected by the sync engine, not requested.
    pub fn selected_fields(&self) -> SelectedFields {
        let mut selected = SelectedFields::default();
        for entry in &self.metadata {
            let Some(field_id) = entry.field_id() else {
                continue;
            };
            let by_default = entry
                .metadata
                .get("selected-by-default")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let include = entry
                .metadata
                .get("selected")
                .and_then(Value::as_bool)
                .unwrap_or(by_default);
            if !include {
                continue;
            }
            match entry.metadata.get("behavior").and_then(Value::as_str) {
                Some("METRIC") => selected.metrics.push(field_id.to_string()),
                Some("DIMENSION") => selected.dimensions.push(field_id.to_string()),
                _ => {}
            }
        }
        selected
    }
}

/// A field ready for catalog assembly: descriptor plus its resolved
/// compatibility annotation. `cubes` is `None` when the compatibility
/// dataset records no restriction for the field.
#[derive(Debug, Clone)]
pub struct ResolvedField {
    pub field: FieldDescriptor,
    pub cubes: Option<BTreeSet<String>>,
    /// Accounts where selecting this custom field would fail
    pub unsupported_accounts: BTreeSet<String>,
}

impl ResolvedField {
    pub fn standard(field: FieldDescriptor, cubes: Option<BTreeSet<String>>) -> Self {
        Self {
            field,
            cubes,
            unsupported_accounts: BTreeSet::new(),
        }
    }
}
