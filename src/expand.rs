//! Placeholder field expansion
//!
//! Metadata API ids can carry a numeric `XX` token. Three shapes exist:
//!
//! - custom slots (`ga:metricXX`, `ga:dimensionXX`), filled from the
//!   Management API's custom field listings and handled elsewhere;
//! - dynamic fields, whose `XX` form appears verbatim in the cube
//!   dataset and expands with the profiles' configured goal numbers
//!   (e.g. `ga:goalXXStarts`);
//! - static fields, whose concrete numbered forms appear in the cube
//!   dataset instead (e.g. `ga:productCategoryLevel1` through `5`).

use crate::cubes::CubesLookup;
use crate::error::{Error, Result};
use crate::fields::FieldDescriptor;
use regex::Regex;

const PLACEHOLDER: &str = "XX";

/// Custom field slots never expand here
const CUSTOM_SLOT_IDS: [&str; 2] = ["ga:metricXX", "ga:dimensionXX"];

/// The dynamic families whose numeric suffixes are goal numbers. Other
/// dynamic ids have no known enumeration and expand to nothing.
const GOAL_FIELD_IDS: [&str; 7] = [
    "ga:goalXXStarts",
    "ga:goalXXCompletions",
    "ga:goalXXValue",
    "ga:goalXXConversionRate",
    "ga:goalXXAbandons",
    "ga:goalXXAbandonRate",
    "ga:searchGoalXXConversionRate",
];

/// How a placeholder id expands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// Concrete numbered ids exist in the cube dataset
    Static,
    /// The placeholder form itself is in the dataset; expands per goal
    Dynamic,
    /// `ga:metricXX` / `ga:dimensionXX`, filled from custom field listings
    CustomSlot,
}

/// Classify an id, or `None` when it carries no placeholder
pub fn classify(id: &str, lookup: &CubesLookup) -> Option<Placeholder> {
    if !id.contains(PLACEHOLDER) {
        return None;
    }
    if CUSTOM_SLOT_IDS.contains(&id) {
        Some(Placeholder::CustomSlot)
    } else if lookup.contains(id) {
        Some(Placeholder::Dynamic)
    } else {
        Some(Placeholder::Static)
    }
}

/// Expand a static placeholder against the cube dataset.
///
/// The placeholder becomes a one-or-two-digit pattern anchored at the
/// start of the id; every dataset field the pattern matches yields one
/// concrete descriptor, with the number substituted into the name too.
pub fn expand_static(
    field: &FieldDescriptor,
    lookup: &CubesLookup,
) -> Result<Vec<FieldDescriptor>> {
    let pattern = format!("^{}", field.id.replace(PLACEHOLDER, r"(\d\d?)"));
    let matcher = Regex::new(&pattern)
        .map_err(|e| Error::discovery(format!("bad placeholder pattern for {}: {e}", field.id)))?;

    let mut expanded = Vec::new();
    for (candidate, number) in lookup
        .all_fields()
        .filter_map(|id| Some((id, matcher.captures(id)?.get(1)?.as_str())))
    {
        expanded.push(FieldDescriptor {
            id: candidate.to_string(),
            name: field.name.replace(PLACEHOLDER, number),
            ..field.clone()
        });
    }
    Ok(expanded)
}

/// Expand a dynamic placeholder with the profiles' goal numbers. Ids
/// outside the known goal families, and profiles without goals, expand
/// to nothing.
pub fn expand_dynamic(field: &FieldDescriptor, goal_ids: &[String]) -> Vec<FieldDescriptor> {
    if !GOAL_FIELD_IDS.contains(&field.id.as_str()) {
        return Vec::new();
    }
    goal_ids
        .iter()
        .map(|goal| FieldDescriptor {
            id: field.id.replace(PLACEHOLDER, goal),
            name: field.name.replace(PLACEHOLDER, goal),
            ..field.clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RawCubes;
    use crate::fields::{FieldCategory, FieldScope, FieldType};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn lookup() -> CubesLookup {
        let mut raw = RawCubes::new();
        raw.insert(
            "per_session".to_string(),
            BTreeSet::from([
                "ga:goalXXStarts".to_string(),
                "ga:metricXX".to_string(),
                "ga:dimensionXX".to_string(),
                "ga:productCategoryLevel1".to_string(),
                "ga:productCategoryLevel2".to_string(),
                "ga:productCategoryLevel15".to_string(),
            ]),
        );
        CubesLookup::from_raw(&raw)
    }

    fn field(id: &str, name: &str) -> FieldDescriptor {
        FieldDescriptor {
            id: id.to_string(),
            name: name.to_string(),
            category: FieldCategory::Dimension,
            data_types: BTreeSet::from([FieldType::String]),
            deprecated: false,
            group: "Ecommerce".to_string(),
            scope: FieldScope::Standard,
        }
    }

    #[test]
    fn test_classification_is_total_over_placeholder_ids() {
        let lookup = lookup();
        assert_eq!(
            classify("ga:metricXX", &lookup),
            Some(Placeholder::CustomSlot)
        );
        assert_eq!(
            classify("ga:dimensionXX", &lookup),
            Some(Placeholder::CustomSlot)
        );
        assert_eq!(
            classify("ga:goalXXStarts", &lookup),
            Some(Placeholder::Dynamic)
        );
        assert_eq!(
            classify("ga:productCategoryLevelXX", &lookup),
            Some(Placeholder::Static)
        );
        assert_eq!(classify("ga:sessions", &lookup), None);
    }

    #[test]
    fn test_static_expansion_matches_numbered_forms() {
        let expanded = expand_static(
            &field("ga:productCategoryLevelXX", "Product Category Level XX"),
            &lookup(),
        )
        .unwrap();

        let ids: Vec<&str> = expanded.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "ga:productCategoryLevel1",
                "ga:productCategoryLevel15",
                "ga:productCategoryLevel2",
            ]
        );
        assert_eq!(expanded[0].name, "Product Category Level 1");
        assert_eq!(expanded[1].name, "Product Category Level 15");
    }

    #[test]
    fn test_static_expansion_with_no_matches_is_empty() {
        let expanded = expand_static(&field("ga:contentGroupXX", "Content Group XX"), &lookup())
            .unwrap();
        assert!(expanded.is_empty());
    }

    #[test]
    fn test_dynamic_expansion_substitutes_goal_numbers() {
        let descriptor = field("ga:goalXXStarts", "Goal XX Starts");
        let expanded =
            expand_dynamic(&descriptor, &["1".to_string(), "12".to_string()]);
        assert_eq!(expanded.len(), 2);
        assert_eq!(expanded[0].id, "ga:goal1Starts");
        assert_eq!(expanded[0].name, "Goal 1 Starts");
        assert_eq!(expanded[1].id, "ga:goal12Starts");
    }

    #[test]
    fn test_dynamic_expansion_without_goals_is_empty() {
        assert!(expand_dynamic(&field("ga:goalXXStarts", "Goal XX Starts"), &[]).is_empty());
    }

    #[test]
    fn test_unknown_dynamic_family_expands_to_nothing() {
        let descriptor = field("ga:mysteryXXThing", "Mystery XX Thing");
        assert!(expand_dynamic(&descriptor, &["1".to_string()]).is_empty());
    }

    #[test]
    fn test_expanded_fields_keep_descriptor_attributes() {
        let mut descriptor = field("ga:goalXXValue", "Goal XX Value");
        descriptor.category = FieldCategory::Metric;
        descriptor.data_types = BTreeSet::from([FieldType::Currency]);
        let expanded = expand_dynamic(&descriptor, &["3".to_string()]);
        assert_eq!(expanded[0].category, FieldCategory::Metric);
        assert_eq!(expanded[0].single_type(), Some(FieldType::Currency));
        assert_eq!(expanded[0].group, "Ecommerce");
    }
}
