//! Cube compatibility lookup
//!
//! Two fields can appear in the same report only when at least one cube
//! contains both. The lookup inverts the published cube dataset into a
//! field-to-cubes map; a field absent from the dataset is treated as
//! unrestricted.

use crate::client::RawCubes;
use std::collections::{BTreeMap, BTreeSet};

/// Inverted cube dataset
#[derive(Debug, Clone, Default)]
pub struct CubesLookup {
    field_cubes: BTreeMap<String, BTreeSet<String>>,
    all_cubes: BTreeSet<String>,
}

impl CubesLookup {
    pub fn from_raw(raw: &RawCubes) -> Self {
        let mut field_cubes: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut all_cubes = BTreeSet::new();
        for (cube, fields) in raw {
            all_cubes.insert(cube.clone());
            for field in fields {
                field_cubes
                    .entry(field.clone())
                    .or_default()
                    .insert(cube.clone());
            }
        }
        Self {
            field_cubes,
            all_cubes,
        }
    }

    /// All cube names seen in the dataset
    pub fn all_cubes(&self) -> &BTreeSet<String> {
        &self.all_cubes
    }

    /// The cubes a field belongs to, or `None` when the dataset does not
    /// mention it (unrestricted)
    pub fn cubes_for(&self, field_id: &str) -> Option<&BTreeSet<String>> {
        self.field_cubes.get(field_id)
    }

    /// True when the dataset mentions the field at all
    pub fn contains(&self, field_id: &str) -> bool {
        self.field_cubes.contains_key(field_id)
    }

    /// Every field id the dataset mentions
    pub fn all_fields(&self) -> impl Iterator<Item = &str> {
        self.field_cubes.keys().map(String::as_str)
    }

    /// Whether two fields can appear in the same report. Either field
    /// being unrestricted makes the pair compatible.
    pub fn compatible(&self, field_a: &str, field_b: &str) -> bool {
        match (self.field_cubes.get(field_a), self.field_cubes.get(field_b)) {
            (Some(a), Some(b)) => !a.is_disjoint(b),
            _ => true,
        }
    }
}

/// For a custom field, the accounts where selecting it would fail: every
/// account that defines any custom field, minus the accounts defining
/// this one. Accounts without custom fields never surface the field, so
/// they need no exclusion.
pub fn custom_field_exclusions(
    accounts_with_custom_fields: &BTreeSet<String>,
    field_accounts: &BTreeSet<String>,
) -> BTreeSet<String> {
    accounts_with_custom_fields
        .difference(field_accounts)
        .cloned()
        .collect()
}
