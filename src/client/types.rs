//! Wire types for the Metadata, Management, and Reporting APIs

use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Raw cube dataset: cube name to the set of field ids it contains
pub type RawCubes = BTreeMap<String, BTreeSet<String>>;

/// One column from the Metadata API listing
#[derive(Debug, Clone, Deserialize)]
pub struct RawColumn {
    /// Canonical field id (e.g. `ga:sessions`)
    pub id: String,
    /// Column attributes: `uiName`, `type`, `dataType`, `group`, `status`, ...
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

/// One custom metric or dimension from the Management API
#[derive(Debug, Clone, Deserialize)]
pub struct CustomFieldItem {
    /// Field id (e.g. `ga:dimension3`)
    pub id: String,
    /// Display name
    pub name: String,
    /// Resource kind: `analytics#customMetric` or `analytics#customDimension`
    pub kind: String,
    /// Declared data type; only present for custom metrics
    #[serde(rename = "type", default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// One entry from the Account Summaries listing
#[derive(Debug, Clone, Deserialize)]
pub struct AccountSummary {
    pub id: String,
    #[serde(rename = "webProperties", default)]
    pub web_properties: Vec<WebPropertySummary>,
}

/// A web property within an account summary
#[derive(Debug, Clone, Deserialize)]
pub struct WebPropertySummary {
    pub id: String,
    #[serde(default)]
    pub profiles: Vec<ProfileSummary>,
}

/// A profile (view) within a web property summary
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileSummary {
    pub id: String,
}

/// Ownership info for a profile, resolved from account summaries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileInfo {
    pub account_id: String,
    pub web_property_id: String,
}

/// One report request: a single stream, profile, and calendar day
#[derive(Debug, Clone)]
pub struct ReportRequest {
    /// Stream identifier the report is being run for
    pub stream_id: String,
    /// Profile (view) id
    pub profile_id: String,
    /// Day to request, YYYY-MM-DD
    pub date: String,
    /// Metric expressions (`ga:` ids)
    pub metrics: Vec<String>,
    /// Dimension names (`ga:` ids)
    pub dimensions: Vec<String>,
    /// Rows per page
    pub page_size: usize,
}

/// Metric column header: name plus the declared column type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricHeader {
    pub name: String,
    pub column_type: String,
}

/// One data row: dimension values zip with the dimension headers,
/// metric values with the metric headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportRow {
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
}

/// One page of a report response
#[derive(Debug, Clone, Default)]
pub struct ReportPage {
    pub dimension_headers: Vec<String>,
    pub metric_headers: Vec<MetricHeader>,
    pub rows: Vec<ReportRow>,
    /// True once the day's data is final and will not change on re-request.
    /// Absent in the response means not golden.
    pub is_data_golden: bool,
    pub next_page_token: Option<String>,
}

impl ReportPage {
    /// Parse a `reports:batchGet` response body.
    ///
    /// One report request is issued per call, so only the first report in
    /// the response is read.
    pub fn from_response(body: &Value) -> crate::error::Result<Self> {
        let report = body
            .get("reports")
            .and_then(Value::as_array)
            .and_then(|r| r.first())
            .ok_or_else(|| crate::error::Error::report_shape("response has no reports"))?;

        let column_header = report.get("columnHeader").unwrap_or(&Value::Null);

        let dimension_headers = column_header
            .get("dimensions")
            .and_then(Value::as_array)
            .map(|dims| {
                dims.iter()
                    .filter_map(Value::as_str)
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let metric_headers = column_header
            .get("metricHeader")
            .and_then(|mh| mh.get("metricHeaderEntries"))
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| MetricHeader {
                        name: entry
                            .get("name")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        column_type: entry
                            .get("type")
                            .and_then(Value::as_str)
                            .unwrap_or("STRING")
                            .to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let data = report.get("data").unwrap_or(&Value::Null);

        let rows = data
            .get("rows")
            .and_then(Value::as_array)
            .map(|rows| rows.iter().map(parse_row).collect())
            .unwrap_or_default();

        let is_data_golden = data
            .get("isDataGolden")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let next_page_token = report
            .get("nextPageToken")
            .and_then(Value::as_str)
            .map(ToString::to_string);

        Ok(Self {
            dimension_headers,
            metric_headers,
            rows,
            is_data_golden,
            next_page_token,
        })
    }
}

fn parse_row(row: &Value) -> ReportRow {
    let dimensions = row
        .get("dimensions")
        .and_then(Value::as_array)
        .map(|dims| {
            dims.iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();

    // Metric values come nested per date range; a single range is
    // requested, so the first entry holds all values
    let metrics = row
        .get("metrics")
        .and_then(Value::as_array)
        .and_then(|m| m.first())
        .and_then(|m| m.get("values"))
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();

    ReportRow {
        dimensions,
        metrics,
    }
}

/// Parse the cube dataset, tolerating both published shapes:
/// cube → list of field ids, and cube → object keyed by field id.
pub fn parse_raw_cubes(body: &Value) -> crate::error::Result<RawCubes> {
    let obj = body
        .as_object()
        .ok_or_else(|| crate::error::Error::discovery("cube dataset is not a JSON object"))?;

    let mut cubes = RawCubes::new();
    for (cube, fields) in obj {
        let field_ids: BTreeSet<String> = match fields {
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect(),
            Value::Object(map) => map.keys().cloned().collect(),
            _ => {
                return Err(crate::error::Error::discovery(format!(
                    "unexpected cube entry shape for '{cube}'"
                )))
            }
        };
        cubes.insert(cube.clone(), field_ids);
    }
    Ok(cubes)
}
