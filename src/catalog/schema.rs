//! Declared-type to JSON Schema mapping
//!
//! An ordered rule table: the first rule whose predicate matches wins.
//! Overrides come first because the Metadata API declares some fields
//! with types that do not survive contact with real responses (dates as
//! STRING, counters as STRING, coordinates as STRING).

use crate::fields::FieldType;
use serde_json::{json, Value};
use std::collections::BTreeSet;

/// Fields emitted as compact date strings, reformatted to date-times
pub const DATETIME_FIELD_OVERRIDES: [&str; 2] = ["ga:date", "ga:dateHour"];

/// Declared STRING but always integral in practice. Some accounts still
/// return these as text, so the schema keeps a string fallback.
pub const INTEGER_FIELD_OVERRIDES: [&str; 18] = [
    "ga:cohortNthDay",
    "ga:cohortNthMonth",
    "ga:cohortNthWeek",
    "ga:daysSinceLastSession",
    "ga:daysToTransaction",
    "ga:nthDay",
    "ga:nthHour",
    "ga:nthMinute",
    "ga:nthMonth",
    "ga:nthWeek",
    "ga:pageDepth",
    "ga:screenDepth",
    "ga:sessionCount",
    "ga:sessionsToTransaction",
    "ga:subContinentCode",
    "ga:visitCount",
    "ga:visitLength",
    "ga:visitsToTransaction",
];

/// Declared STRING or TIME but always numeric in practice
pub const FLOAT_FIELD_OVERRIDES: [&str; 12] = [
    "ga:latitude",
    "ga:longitude",
    "ga:avgScreenviewDuration",
    "ga:avgSearchDuration",
    "ga:avgSessionDuration",
    "ga:avgTimeOnPage",
    "ga:cohortSessionDurationPerUser",
    "ga:cohortSessionDurationPerUserWithLifetimeCriteria",
    "ga:searchDuration",
    "ga:sessionDuration",
    "ga:timeOnPage",
    "ga:timeOnScreen",
];

struct MappingRule {
    applies: fn(FieldType, &str) -> bool,
    schema: fn(&str) -> Value,
}

static TYPE_RULES: [MappingRule; 6] = [
    MappingRule {
        applies: |_, id| DATETIME_FIELD_OVERRIDES.contains(&id),
        schema: |_| json!({"type": ["string", "null"], "format": "date-time"}),
    },
    MappingRule {
        applies: |t, _| matches!(t, FieldType::Currency | FieldType::Percent),
        schema: |_| json!({"type": ["number", "null"]}),
    },
    MappingRule {
        applies: |t, _| t == FieldType::Time,
        schema: |_| json!({"type": ["string", "null"]}),
    },
    MappingRule {
        applies: |t, id| t == FieldType::Integer || INTEGER_FIELD_OVERRIDES.contains(&id),
        schema: |id| {
            if INTEGER_FIELD_OVERRIDES.contains(&id) {
                json!({"type": ["integer", "string", "null"]})
            } else {
                json!({"type": ["integer", "null"]})
            }
        },
    },
    MappingRule {
        applies: |t, id| t == FieldType::Float || FLOAT_FIELD_OVERRIDES.contains(&id),
        schema: |_| json!({"type": ["number", "null"]}),
    },
    MappingRule {
        applies: |t, _| t == FieldType::String,
        schema: |_| json!({"type": ["string", "null"]}),
    },
];

/// Map one declared type to its schema. Total over [`FieldType`]: the
/// string rule catches everything the earlier rules do not.
pub fn type_to_schema(declared: FieldType, field_id: &str) -> Value {
    for rule in &TYPE_RULES {
        if (rule.applies)(declared, field_id) {
            return (rule.schema)(field_id);
        }
    }
    unreachable!("every declared field type has a mapping rule")
}

/// Map a unioned type set to a schema: one distinct mapping yields the
/// bare schema, several yield a sorted `anyOf` of the alternatives.
pub fn types_to_schema(declared: &BTreeSet<FieldType>, field_id: &str) -> Value {
    let mut schemas: Vec<Value> = declared
        .iter()
        .map(|t| type_to_schema(*t, field_id))
        .collect();
    schemas.sort_by_key(Value::to_string);
    schemas.dedup();
    if schemas.len() == 1 {
        schemas.remove(0)
    } else {
        json!({ "anyOf": schemas })
    }
}
