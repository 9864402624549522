//! Field descriptor types

use crate::error::{Error, Result};
use std::collections::BTreeSet;

/// Declared data type of a reportable field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Currency,
    Percent,
    Time,
}

impl FieldType {
    /// Parse a declared type. Unknown types are a hard discovery-time
    /// error: an unmapped type means the mapping table needs updating.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "STRING" => Ok(Self::String),
            "INTEGER" => Ok(Self::Integer),
            "FLOAT" => Ok(Self::Float),
            "CURRENCY" => Ok(Self::Currency),
            "PERCENT" => Ok(Self::Percent),
            "TIME" => Ok(Self::Time),
            other => Err(Error::UnknownFieldType {
                field_type: other.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Integer => "INTEGER",
            Self::Float => "FLOAT",
            Self::Currency => "CURRENCY",
            Self::Percent => "PERCENT",
            Self::Time => "TIME",
        }
    }
}

/// Whether a field is a metric or a dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldCategory {
    Metric,
    Dimension,
}

impl FieldCategory {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "METRIC" => Ok(Self::Metric),
            "DIMENSION" => Ok(Self::Dimension),
            other => Err(Error::discovery(format!(
                "unknown field category: {other}"
            ))),
        }
    }

    /// The `behavior` metadata value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metric => "METRIC",
            Self::Dimension => "DIMENSION",
        }
    }
}

/// Where a field is defined
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldScope {
    /// Global standard field from the Metadata API
    Standard,
    /// Per-account custom field; carries the accounts that define it
    Custom { accounts: BTreeSet<String> },
}

/// One reportable field (metric or dimension)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Canonical id; may contain the `XX` placeholder token
    pub id: String,
    /// Human-readable name
    pub name: String,
    pub category: FieldCategory,
    /// Declared data types. A single entry for standard fields; custom
    /// fields defined with divergent types across accounts union here.
    pub data_types: BTreeSet<FieldType>,
    pub deprecated: bool,
    /// Grouping label (e.g. "Session", "Custom Variables or Columns")
    pub group: String,
    pub scope: FieldScope,
}

impl FieldDescriptor {
    /// True if the id contains the numeric placeholder token
    pub fn has_placeholder(&self) -> bool {
        self.id.contains("XX")
    }

    /// The single declared type, when there is exactly one
    pub fn single_type(&self) -> Option<FieldType> {
        if self.data_types.len() == 1 {
            self.data_types.iter().next().copied()
        } else {
            None
        }
    }

    /// The accounts a custom field is defined under (empty for standard)
    pub fn accounts(&self) -> BTreeSet<String> {
        match &self.scope {
            FieldScope::Standard => BTreeSet::new(),
            FieldScope::Custom { accounts } => accounts.clone(),
        }
    }
}
