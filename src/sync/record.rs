//! Report row to record transformation

use crate::client::{ProfileInfo, ReportPage, ReportRow};
use crate::error::Result;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use tracing::warn;

/// Dimensions returned in compact non-ISO formats
const DATETIME_DIMENSION_FORMATS: [(&str, &str); 2] =
    [("ga:date", "%Y%m%d"), ("ga:dateHour", "%Y%m%d%H")];

/// Primary key for one report row: SHA-256 over the row's identity as a
/// compact JSON array of ownership ids, sorted raw dimension pairs, and
/// the report date range.
///
/// Any change to the inputs, sorting, or serialization invalidates every
/// previously emitted primary key and requires a major version bump.
pub fn record_hash(
    account_id: &str,
    web_property_id: &str,
    profile_id: &str,
    dimensions: &[(&str, &str)],
    start_date: &str,
    end_date: &str,
) -> Result<String> {
    let mut pairs: Vec<(&str, &str)> = dimensions.to_vec();
    pairs.sort_unstable();

    let source = serde_json::to_string(&json!([
        account_id,
        web_property_id,
        profile_id,
        pairs,
        start_date,
        end_date,
    ]))?;

    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Reformat a compact datetime dimension value, or `None` when the value
/// does not match its documented format (the "(other)" overflow sentinel
/// among others)
fn reformat_datetime(field_id: &str, raw: &str) -> Option<String> {
    let parsed = match field_id {
        "ga:date" => NaiveDate::parse_from_str(raw, "%Y%m%d")
            .ok()?
            .and_hms_opt(0, 0, 0)?,
        "ga:dateHour" => {
            NaiveDateTime::parse_from_str(&format!("{raw}0000"), "%Y%m%d%H%M%S").ok()?
        }
        _ => return None,
    };
    Some(parsed.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string())
}

fn transform_dimension(field_id: &str, raw: &str) -> Value {
    let is_datetime = DATETIME_DIMENSION_FORMATS
        .iter()
        .any(|(id, _)| *id == field_id);
    if !is_datetime {
        return json!(raw);
    }
    match reformat_datetime(field_id, raw) {
        Some(formatted) => json!(formatted),
        None => {
            warn!("Unexpected value for {field_id}: {raw}, passing through unmodified");
            json!(raw)
        }
    }
}

/// Coerce a metric value to its declared column type, falling back to
/// the raw string when the value does not parse
fn coerce_metric(column_type: &str, raw: &str) -> Value {
    let coerced = match column_type {
        "INTEGER" => raw.parse::<i64>().ok().map(|n| json!(n)),
        "FLOAT" | "CURRENCY" | "PERCENT" | "TIME" => raw.parse::<f64>().ok().map(|n| json!(n)),
        _ => return json!(raw),
    };
    coerced.unwrap_or_else(|| {
        warn!("Could not parse {column_type} metric value {raw:?}, emitting as string");
        json!(raw)
    })
}

/// Build one record from a report row: zipped dimension and metric
/// headers, injected ownership fields, and the content-derived hash.
/// The hash covers the raw dimension values, before reformatting.
pub fn build_record(
    page: &ReportPage,
    row: &ReportRow,
    profile_id: &str,
    info: &ProfileInfo,
    date: &str,
) -> Result<Map<String, Value>> {
    let dimension_pairs: Vec<(&str, &str)> = page
        .dimension_headers
        .iter()
        .map(String::as_str)
        .zip(row.dimensions.iter().map(String::as_str))
        .collect();

    let hash = record_hash(
        &info.account_id,
        &info.web_property_id,
        profile_id,
        &dimension_pairs,
        date,
        date,
    )?;

    let mut record = Map::new();
    for (name, value) in &dimension_pairs {
        record.insert(name.to_string(), transform_dimension(name, value));
    }
    for (header, value) in page.metric_headers.iter().zip(row.metrics.iter()) {
        record.insert(
            header.name.clone(),
            coerce_metric(&header.column_type, value),
        );
    }

    record.insert("_sdc_record_hash".to_string(), json!(hash));
    record.insert("start_date".to_string(), json!(date));
    record.insert("end_date".to_string(), json!(date));
    record.insert("account_id".to_string(), json!(info.account_id));
    record.insert("web_property_id".to_string(), json!(info.web_property_id));
    record.insert("profile_id".to_string(), json!(profile_id));
    Ok(record)
}
