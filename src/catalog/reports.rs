//! Premade report library
//!
//! A fixed set of report definitions mirroring the web UI's standard
//! reports. Their declared metrics and dimensions become the
//! selected-by-default subset, capped at the Reporting API's per-request
//! maxima.

use crate::config::ReportDefinition;

/// Reporting API cap on metrics per request
pub const MAX_METRICS_PER_REQUEST: usize = 10;

/// Reporting API cap on dimensions per request
pub const MAX_DIMENSIONS_PER_REQUEST: usize = 7;

/// One report stream to expose in the catalog
#[derive(Debug, Clone)]
pub struct ReportSpec {
    pub tap_stream_id: String,
    pub name: String,
    /// Metrics marked selected-by-default (already capped)
    pub default_metrics: Vec<String>,
    /// Dimensions marked selected-by-default (already capped)
    pub default_dimensions: Vec<String>,
}

impl ReportSpec {
    /// A user-configured custom report: no default selection
    pub fn custom(definition: &ReportDefinition) -> Self {
        Self {
            tap_stream_id: definition.id.clone(),
            name: definition.name.clone(),
            default_metrics: Vec::new(),
            default_dimensions: Vec::new(),
        }
    }
}

struct PremadeReport {
    name: &'static str,
    metrics: &'static [&'static str],
    dimensions: &'static [&'static str],
}

const PREMADE_REPORTS: [PremadeReport; 6] = [
    PremadeReport {
        name: "Audience Overview",
        metrics: &[
            "ga:users",
            "ga:newUsers",
            "ga:sessions",
            "ga:sessionsPerUser",
            "ga:pageviews",
            "ga:pageviewsPerSession",
            "ga:avgSessionDuration",
            "ga:bounceRate",
        ],
        dimensions: &[
            "ga:date",
            "ga:language",
            "ga:country",
            "ga:city",
            "ga:browser",
            "ga:operatingSystem",
            "ga:screenResolution",
            "ga:year",
            "ga:month",
            "ga:hour",
            "ga:minute",
        ],
    },
    PremadeReport {
        name: "Audience Geo Location",
        metrics: &[
            "ga:users",
            "ga:newUsers",
            "ga:sessions",
            "ga:pageviewsPerSession",
            "ga:avgSessionDuration",
            "ga:bounceRate",
        ],
        dimensions: &[
            "ga:date",
            "ga:year",
            "ga:month",
            "ga:hour",
            "ga:minute",
            "ga:country",
            "ga:city",
            "ga:continent",
            "ga:subContinent",
        ],
    },
    PremadeReport {
        name: "Audience Technology",
        metrics: &[
            "ga:users",
            "ga:newUsers",
            "ga:sessions",
            "ga:pageviewsPerSession",
            "ga:avgSessionDuration",
            "ga:bounceRate",
        ],
        dimensions: &[
            "ga:date",
            "ga:year",
            "ga:month",
            "ga:hour",
            "ga:minute",
            "ga:browser",
            "ga:operatingSystem",
            "ga:screenResolution",
            "ga:screenColors",
            "ga:flashVersion",
            "ga:javaEnabled",
            "ga:hostname",
        ],
    },
    PremadeReport {
        name: "Acquisition Overview",
        metrics: &[
            "ga:users",
            "ga:newUsers",
            "ga:sessions",
            "ga:pageviewsPerSession",
            "ga:avgSessionDuration",
            "ga:bounceRate",
        ],
        dimensions: &[
            "ga:acquisitionTrafficChannel",
            "ga:channelGrouping",
            "ga:acquisitionSource",
            "ga:acquisitionSourceMedium",
            "ga:acquisitionMedium",
            "ga:date",
            "ga:year",
            "ga:month",
            "ga:hour",
            "ga:minute",
        ],
    },
    PremadeReport {
        name: "Behavior Overview",
        metrics: &[
            "ga:pageviews",
            "ga:uniquePageviews",
            "ga:avgTimeOnPage",
            "ga:bounceRate",
            "ga:exitRate",
            "ga:exits",
        ],
        dimensions: &[
            "ga:date",
            "ga:year",
            "ga:month",
            "ga:hour",
            "ga:minute",
            "ga:pagePath",
            "ga:pageTitle",
            "ga:searchKeyword",
            "ga:eventCategory",
        ],
    },
    PremadeReport {
        name: "Ecommerce Overview",
        metrics: &["ga:transactions"],
        dimensions: &[
            "ga:transactionId",
            "ga:campaign",
            "ga:source",
            "ga:medium",
            "ga:keyword",
            "ga:socialNetwork",
        ],
    },
];

/// Stream id for a report name: lowercased, non-alphanumerics collapsed
/// to underscores
pub fn stream_id_for(name: &str) -> String {
    let mut id = String::with_capacity(name.len());
    let mut last_was_separator = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            id.push(c.to_ascii_lowercase());
            last_was_separator = false;
        } else if !last_was_separator && !id.is_empty() {
            id.push('_');
            last_was_separator = true;
        }
    }
    if id.ends_with('_') {
        id.pop();
    }
    id
}

/// The premade report specs with their capped default selections
pub fn premade_reports() -> Vec<ReportSpec> {
    PREMADE_REPORTS
        .iter()
        .map(|report| ReportSpec {
            tap_stream_id: stream_id_for(report.name),
            name: report.name.to_string(),
            default_metrics: report
                .metrics
                .iter()
                .take(MAX_METRICS_PER_REQUEST)
                .map(ToString::to_string)
                .collect(),
            default_dimensions: report
                .dimensions
                .iter()
                .take(MAX_DIMENSIONS_PER_REQUEST)
                .map(ToString::to_string)
                .collect(),
        })
        .collect()
}
