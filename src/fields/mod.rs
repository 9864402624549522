//! Field metadata normalization
//!
//! Standard columns from the Metadata API and custom metrics/dimensions
//! from the Management API are normalized into [`FieldDescriptor`]s, the
//! one shape the compatibility engine and catalog builder work with.

mod types;

pub use types::{FieldCategory, FieldDescriptor, FieldScope, FieldType};

use crate::client::{CustomFieldItem, RawColumn};
use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};

/// Placeholder ids the connector never supports: legacy custom variables
/// and calculated metrics, whose ids cannot be expanded mechanically.
const UNSUPPORTED_FIELD_IDS: [&str; 3] = [
    "ga:customVarValueXX",
    "ga:customVarNameXX",
    "ga:calcMetric_<NAME>",
];

const CUSTOM_METRIC_KIND: &str = "analytics#customMetric";
const CUSTOM_DIMENSION_KIND: &str = "analytics#customDimension";

/// Group label assigned to every custom field
const CUSTOM_FIELD_GROUP: &str = "Custom Variables or Columns";

/// Normalize the standard column listing, dropping the fixed set of
/// unsupported placeholder ids.
pub fn normalize_standard_fields(columns: &[RawColumn]) -> Result<Vec<FieldDescriptor>> {
    let mut fields = Vec::with_capacity(columns.len());
    for column in columns {
        if UNSUPPORTED_FIELD_IDS.contains(&column.id.as_str()) {
            continue;
        }
        let attr = |key: &str| column.attributes.get(key).map(String::as_str);

        let category = FieldCategory::parse(attr("type").ok_or_else(|| {
            Error::discovery(format!("column {} has no type attribute", column.id))
        })?)?;
        let data_type = FieldType::parse(attr("dataType").unwrap_or("STRING"))?;

        fields.push(FieldDescriptor {
            id: column.id.clone(),
            name: attr("uiName").unwrap_or(&column.id).to_string(),
            category,
            data_types: BTreeSet::from([data_type]),
            deprecated: attr("status") == Some("DEPRECATED"),
            group: attr("group").unwrap_or("").to_string(),
            scope: FieldScope::Standard,
        });
    }
    Ok(fields)
}

/// Normalize one property's custom field listing.
///
/// Custom dimensions carry no declared type and are always strings;
/// custom metrics use their declared type.
pub fn normalize_custom_fields(
    account_id: &str,
    items: &[CustomFieldItem],
) -> Result<Vec<FieldDescriptor>> {
    let mut fields = Vec::with_capacity(items.len());
    for item in items {
        let (category, data_type) = match item.kind.as_str() {
            CUSTOM_METRIC_KIND => {
                let declared = item.data_type.as_deref().ok_or_else(|| {
                    Error::discovery(format!("custom metric {} has no declared type", item.id))
                })?;
                (FieldCategory::Metric, FieldType::parse(declared)?)
            }
            CUSTOM_DIMENSION_KIND => (FieldCategory::Dimension, FieldType::String),
            other => {
                return Err(Error::UnknownCustomFieldKind {
                    kind: other.to_string(),
                })
            }
        };

        fields.push(FieldDescriptor {
            id: item.id.clone(),
            name: item.name.clone(),
            category,
            data_types: BTreeSet::from([data_type]),
            deprecated: false,
            group: CUSTOM_FIELD_GROUP.to_string(),
            scope: FieldScope::Custom {
                accounts: BTreeSet::from([account_id.to_string()]),
            },
        });
    }
    Ok(fields)
}

/// Merge custom fields collected across accounts.
///
/// The same slot id (e.g. `ga:dimension3`) can be defined in several
/// accounts, possibly with different declared types. Accounts union, and
/// so do the declared types; the schema generator widens a multi-typed
/// field to the union schema.
pub fn merge_custom_fields(fields: Vec<FieldDescriptor>) -> Vec<FieldDescriptor> {
    let mut merged: BTreeMap<String, FieldDescriptor> = BTreeMap::new();
    for field in fields {
        match merged.get_mut(&field.id) {
            None => {
                merged.insert(field.id.clone(), field);
            }
            Some(existing) => {
                existing.data_types.extend(field.data_types.iter().copied());
                if let (
                    FieldScope::Custom { accounts },
                    FieldScope::Custom {
                        accounts: new_accounts,
                    },
                ) = (&mut existing.scope, &field.scope)
                {
                    accounts.extend(new_accounts.iter().cloned());
                }
            }
        }
    }
    merged.into_values().collect()
}
