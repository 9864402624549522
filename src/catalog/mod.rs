//! Catalog generation
//!
//! Assembles normalized, expanded, compatibility-annotated fields into
//! one schema + metadata entry per report stream: every user-configured
//! report definition plus the premade report library.

mod reports;
mod schema;
mod types;

pub use reports::{
    premade_reports, stream_id_for, ReportSpec, MAX_DIMENSIONS_PER_REQUEST,
    MAX_METRICS_PER_REQUEST,
};
pub use schema::{
    type_to_schema, types_to_schema, DATETIME_FIELD_OVERRIDES, FLOAT_FIELD_OVERRIDES,
    INTEGER_FIELD_OVERRIDES,
};
pub use types::{Catalog, CatalogEntry, MetadataEntry, ResolvedField, SelectedFields, StreamSchema};

use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

/// Primary key of every stream
pub const RECORD_HASH_FIELD: &str = "_sdc_record_hash";

/// Base fields injected into every record, in schema order
pub const BASE_FIELDS: [&str; 6] = [
    RECORD_HASH_FIELD,
    "start_date",
    "end_date",
    "account_id",
    "web_property_id",
    "profile_id",
];

const BASE_FIELD_GROUP: &str = "Report Fields";

const CUBES_KEY: &str = "ga_tap.cubes";
const GROUP_KEY: &str = "ga_tap.group";
const ALL_CUBES_KEY: &str = "ga_tap.all_cubes";
const UNSUPPORTED_ACCOUNTS_KEY: &str = "ga_tap.unsupported_accounts";

fn base_field_schema(field_id: &str) -> Value {
    match field_id {
        "start_date" | "end_date" => json!({"type": "string", "format": "date-time"}),
        _ => json!({"type": "string"}),
    }
}

/// Build one catalog entry for a report stream
pub fn generate_entry(
    spec: &ReportSpec,
    fields: &[ResolvedField],
    all_cubes: &BTreeSet<String>,
) -> CatalogEntry {
    let mut stream_schema = StreamSchema::default();
    let mut metadata = Vec::with_capacity(fields.len() + BASE_FIELDS.len() + 1);

    let mut stream_mdata = Map::new();
    stream_mdata.insert("inclusion".to_string(), json!("available"));
    stream_mdata.insert("table-key-properties".to_string(), json!([RECORD_HASH_FIELD]));
    stream_mdata.insert(ALL_CUBES_KEY.to_string(), json!(all_cubes));
    metadata.push(MetadataEntry::stream_level(stream_mdata));

    for field_id in BASE_FIELDS {
        stream_schema
            .properties
            .insert(field_id.to_string(), base_field_schema(field_id));
        let mut mdata = Map::new();
        mdata.insert("inclusion".to_string(), json!("automatic"));
        mdata.insert(GROUP_KEY.to_string(), json!(BASE_FIELD_GROUP));
        metadata.push(MetadataEntry::for_field(field_id, mdata));
    }

    let default_metrics: Vec<&str> = spec.default_metrics.iter().map(String::as_str).collect();
    let default_dimensions: Vec<&str> =
        spec.default_dimensions.iter().map(String::as_str).collect();

    for resolved in fields {
        let field = &resolved.field;
        stream_schema.properties.insert(
            field.id.clone(),
            types_to_schema(&field.data_types, &field.id),
        );

        let mut mdata = Map::new();
        mdata.insert("inclusion".to_string(), json!("available"));
        mdata.insert("behavior".to_string(), json!(field.category.as_str()));
        mdata.insert(GROUP_KEY.to_string(), json!(field.group));
        if let Some(cubes) = &resolved.cubes {
            mdata.insert(CUBES_KEY.to_string(), json!(cubes));
        }
        if !resolved.unsupported_accounts.is_empty() {
            mdata.insert(
                UNSUPPORTED_ACCOUNTS_KEY.to_string(),
                json!(resolved.unsupported_accounts),
            );
        }
        let id = field.id.as_str();
        if default_metrics.contains(&id) || default_dimensions.contains(&id) {
            mdata.insert("selected-by-default".to_string(), json!(true));
        }
        metadata.push(MetadataEntry::for_field(&field.id, mdata));
    }

    CatalogEntry {
        tap_stream_id: spec.tap_stream_id.clone(),
        stream: spec.name.clone(),
        key_properties: vec![RECORD_HASH_FIELD.to_string()],
        schema: stream_schema,
        metadata,
    }
}

/// Build the full catalog: one entry per spec over the same field set
pub fn generate_catalog(
    specs: &[ReportSpec],
    fields: &[ResolvedField],
    all_cubes: &BTreeSet<String>,
) -> Catalog {
    Catalog {
        streams: specs
            .iter()
            .map(|spec| generate_entry(spec, fields, all_cubes))
            .collect(),
    }
}
