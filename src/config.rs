//! Tap configuration
//!
//! The config file is a JSON object holding the reporting date window, the
//! view (profile) ids to extract, credentials, and optional report
//! definitions. Credentials decide the auth method: a `refresh_token`
//! selects OAuth2, otherwise service-account keys are required.

use crate::error::{Error, Result};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Default report page size when `page_size` is absent or unusable
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// A user-supplied report definition (one catalog stream each)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportDefinition {
    /// Stable stream identifier
    pub id: String,
    /// Display name
    pub name: String,
}

/// How the tap authenticates against the Google APIs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// OAuth2 refresh-token flow
    Oauth2,
    /// Service-account JWT-bearer flow
    ServiceAccount,
}

/// Complete tap configuration loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// First day of data to request, YYYY-MM-DD
    pub start_date: String,

    /// Optional last day of data to request; defaults to today (UTC)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,

    /// Single view (profile) id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_id: Option<String>,

    /// Multiple view (profile) ids; takes precedence over `view_id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_ids: Option<Vec<String>>,

    // OAuth2 credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    // Service-account credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,

    /// Value for the `quotaUser` request parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_user: Option<String>,

    /// User-Agent header override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Report page size; strings and floats are tolerated (see `page_size`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<Value>,

    /// User-defined report streams
    #[serde(default)]
    pub report_definitions: Vec<ReportDefinition>,
}

impl Config {
    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config from a JSON string and validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate required keys and credential consistency
    pub fn validate(&self) -> Result<()> {
        if self.start_date.is_empty() {
            return Err(Error::missing_field("start_date"));
        }
        parse_date(&self.start_date)?;
        if let Some(end) = &self.end_date {
            parse_date(end)?;
        }

        if self.view_ids().is_empty() {
            return Err(Error::missing_field("view_id or view_ids"));
        }

        match self.auth_method() {
            AuthMethod::Oauth2 => {
                for (field, value) in [
                    ("client_id", &self.client_id),
                    ("client_secret", &self.client_secret),
                ] {
                    if value.is_none() {
                        return Err(Error::missing_field(field));
                    }
                }
            }
            AuthMethod::ServiceAccount => {
                for (field, value) in [
                    ("client_email", &self.client_email),
                    ("private_key", &self.private_key),
                ] {
                    if value.is_none() {
                        return Err(Error::missing_field(field));
                    }
                }
            }
        }

        Ok(())
    }

    /// Auth method inferred from the credentials present
    pub fn auth_method(&self) -> AuthMethod {
        if self.refresh_token.is_some() {
            AuthMethod::Oauth2
        } else {
            AuthMethod::ServiceAccount
        }
    }

    /// The configured view ids, in declaration order
    pub fn view_ids(&self) -> Vec<String> {
        if let Some(ids) = &self.view_ids {
            ids.clone()
        } else if let Some(id) = &self.view_id {
            vec![id.clone()]
        } else {
            Vec::new()
        }
    }

    /// Parsed start date
    pub fn start_date(&self) -> Result<NaiveDate> {
        parse_date(&self.start_date)
    }

    /// Parsed end date, defaulting to today (UTC) when unset
    pub fn end_date(&self) -> Result<NaiveDate> {
        match &self.end_date {
            Some(end) => parse_date(end),
            None => Ok(Utc::now().date_naive()),
        }
    }

    /// Resolved report page size.
    ///
    /// Positive numeric values (including numeric strings and floats)
    /// truncate to their integer floor; anything else falls back to
    /// [`DEFAULT_PAGE_SIZE`].
    pub fn page_size(&self) -> usize {
        resolve_page_size(self.page_size.as_ref())
    }
}

/// Parse a config date, accepting bare dates and RFC 3339 timestamps
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    value
        .parse::<chrono::DateTime<Utc>>()
        .map(|dt| dt.date_naive())
        .map_err(|_| Error::InvalidDate {
            value: value.to_string(),
        })
}

fn resolve_page_size(raw: Option<&Value>) -> usize {
    let parsed = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(n) if n >= 1.0 => n.trunc() as usize,
        _ => DEFAULT_PAGE_SIZE,
    }
}
