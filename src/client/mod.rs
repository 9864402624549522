//! Google Analytics API client
//!
//! [`AnalyticsApi`] is the capability interface the discovery and sync
//! engines are written against; [`GaClient`] implements it over the
//! retrying HTTP transport. Tests substitute deterministic fakes.

mod types;

pub use types::{
    parse_raw_cubes, AccountSummary, CustomFieldItem, MetricHeader, ProfileInfo, ProfileSummary,
    RawColumn, RawCubes, ReportPage, ReportRequest, ReportRow, WebPropertySummary,
};

use crate::auth::{Authenticator, Credentials};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Management/Metadata API base
const MANAGEMENT_BASE: &str = "https://www.googleapis.com/analytics/v3";

/// Reporting API endpoint
const REPORTING_URL: &str = "https://analyticsreporting.googleapis.com/v4/reports:batchGet";

/// Metrics & Dimensions Explorer cube dataset
const CUBES_URL: &str = "https://ga-dev-tools.appspot.com/ga_cubes.json";

/// Offline snapshot of the cube dataset, used when the fetch fails
const BUNDLED_CUBES: &str = include_str!("ga_cubes.json");

/// Capability interface over the Analytics APIs.
///
/// Discovery and sync consume this trait so they can be tested with
/// deterministic fakes; retry/backoff lives entirely behind it.
#[async_trait]
pub trait AnalyticsApi: Send + Sync {
    /// List all standard columns from the Metadata API
    async fn field_metadata(&self) -> Result<Vec<RawColumn>>;

    /// Fetch the cube compatibility dataset (with offline fallback)
    async fn raw_cubes(&self) -> Result<RawCubes>;

    /// List custom metrics for a web property
    async fn custom_metrics(
        &self,
        account_id: &str,
        web_property_id: &str,
    ) -> Result<Vec<CustomFieldItem>>;

    /// List custom dimensions for a web property
    async fn custom_dimensions(
        &self,
        account_id: &str,
        web_property_id: &str,
    ) -> Result<Vec<CustomFieldItem>>;

    /// List goal ids configured for a profile
    async fn goal_ids(
        &self,
        account_id: &str,
        web_property_id: &str,
        profile_id: &str,
    ) -> Result<Vec<String>>;

    /// Request a single page of a one-day report
    async fn report_page(
        &self,
        request: &ReportRequest,
        page_token: Option<&str>,
    ) -> Result<ReportPage>;

    /// Ownership info for a configured profile id
    fn profile_info(&self, profile_id: &str) -> Option<&ProfileInfo>;
}

/// Client-side pager over one day's report pages.
///
/// Pagination is token-based and strictly ordered; the caller consumes
/// however many pages the API yields for the one requested day.
pub struct ReportPager<'a, C: AnalyticsApi + ?Sized> {
    client: &'a C,
    request: ReportRequest,
    next_token: Option<String>,
    started: bool,
}

impl<'a, C: AnalyticsApi + ?Sized> ReportPager<'a, C> {
    /// Create a pager for one report request
    pub fn new(client: &'a C, request: ReportRequest) -> Self {
        Self {
            client,
            request,
            next_token: None,
            started: false,
        }
    }

    /// Fetch the next page, or `None` once the day is exhausted
    pub async fn next_page(&mut self) -> Result<Option<ReportPage>> {
        if self.started && self.next_token.is_none() {
            return Ok(None);
        }
        let page = self
            .client
            .report_page(&self.request, self.next_token.as_deref())
            .await?;
        self.started = true;
        self.next_token = page.next_page_token.clone();
        Ok(Some(page))
    }
}

/// The production client over HTTP
pub struct GaClient {
    http: HttpClient,
    profile_lookup: HashMap<String, ProfileInfo>,
    management_base: String,
    reporting_url: String,
    cubes_url: String,
}

impl GaClient {
    /// Build a client from config: authenticate and resolve the profile
    /// lookup from Account Summaries, keeping only configured view ids.
    pub async fn connect(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let reqwest_client = builder.build().map_err(Error::Http)?;

        let authenticator = Arc::new(Authenticator::new(
            Credentials::from_config(config)?,
            reqwest_client.clone(),
        ));
        let http = HttpClient::new(reqwest_client)
            .with_authenticator(authenticator)
            .with_quota_user(config.quota_user.clone());

        let mut client = Self::with_transport(http);
        client.populate_profile_lookup(&config.view_ids()).await?;
        Ok(client)
    }

    /// Build a client over an existing transport (tests use this with
    /// overridden base URLs)
    pub fn with_transport(http: HttpClient) -> Self {
        Self {
            http,
            profile_lookup: HashMap::new(),
            management_base: MANAGEMENT_BASE.to_string(),
            reporting_url: REPORTING_URL.to_string(),
            cubes_url: CUBES_URL.to_string(),
        }
    }

    /// Override endpoint bases (tests)
    #[must_use]
    pub fn with_base_urls(
        mut self,
        management_base: impl Into<String>,
        reporting_url: impl Into<String>,
        cubes_url: impl Into<String>,
    ) -> Self {
        self.management_base = management_base.into();
        self.reporting_url = reporting_url.into();
        self.cubes_url = cubes_url.into();
        self
    }

    /// Associate every configured view id with its account and web
    /// property so they can be looked up during discovery and sync.
    pub async fn populate_profile_lookup(&mut self, view_ids: &[String]) -> Result<()> {
        let summaries = self.account_summaries().await?;
        for account in &summaries {
            for web_property in &account.web_properties {
                for profile in &web_property.profiles {
                    if view_ids.contains(&profile.id) {
                        self.profile_lookup.insert(
                            profile.id.clone(),
                            ProfileInfo {
                                account_id: account.id.clone(),
                                web_property_id: web_property.id.clone(),
                            },
                        );
                    }
                }
            }
        }

        for view_id in view_ids {
            if !self.profile_lookup.contains_key(view_id) {
                return Err(Error::discovery(format!(
                    "view id {view_id} was not found in the account summaries this token can access"
                )));
            }
        }
        info!("Resolved {} profile(s)", self.profile_lookup.len());
        Ok(())
    }

    /// List account summaries (the full hierarchy the token can access)
    pub async fn account_summaries(&self) -> Result<Vec<AccountSummary>> {
        let body = self
            .http
            .get(
                &format!("{}/management/accountSummaries", self.management_base),
                &[],
            )
            .await?;
        items_from(body)
    }

    async fn custom_field_listing(
        &self,
        account_id: &str,
        web_property_id: &str,
        resource: &str,
    ) -> Result<Vec<CustomFieldItem>> {
        let url = format!(
            "{}/management/accounts/{account_id}/webproperties/{web_property_id}/{resource}",
            self.management_base
        );
        let body = self.http.get(&url, &[]).await?;
        items_from(body)
    }
}

/// Deserialize the `items` array of a Management API listing
fn items_from<T: serde::de::DeserializeOwned>(body: Value) -> Result<Vec<T>> {
    let items = body.get("items").cloned().unwrap_or_else(|| json!([]));
    serde_json::from_value(items).map_err(Error::JsonParse)
}

#[async_trait]
impl AnalyticsApi for GaClient {
    async fn field_metadata(&self) -> Result<Vec<RawColumn>> {
        let body = self
            .http
            .get(&format!("{}/metadata/ga/columns", self.management_base), &[])
            .await?;
        items_from(body)
    }

    async fn raw_cubes(&self) -> Result<RawCubes> {
        match self.http.get(&self.cubes_url, &[]).await {
            Ok(body) => parse_raw_cubes(&body),
            Err(e) => {
                warn!("Error fetching raw cubes, falling back to bundled copy: {e}");
                let body: Value = serde_json::from_str(BUNDLED_CUBES)?;
                parse_raw_cubes(&body)
            }
        }
    }

    async fn custom_metrics(
        &self,
        account_id: &str,
        web_property_id: &str,
    ) -> Result<Vec<CustomFieldItem>> {
        self.custom_field_listing(account_id, web_property_id, "customMetrics")
            .await
    }

    async fn custom_dimensions(
        &self,
        account_id: &str,
        web_property_id: &str,
    ) -> Result<Vec<CustomFieldItem>> {
        self.custom_field_listing(account_id, web_property_id, "customDimensions")
            .await
    }

    async fn goal_ids(
        &self,
        account_id: &str,
        web_property_id: &str,
        profile_id: &str,
    ) -> Result<Vec<String>> {
        let url = format!(
            "{}/management/accounts/{account_id}/webproperties/{web_property_id}/profiles/{profile_id}/goals",
            self.management_base
        );
        let body = self.http.get(&url, &[]).await?;
        let items: Vec<Value> = items_from(body)?;
        Ok(items
            .iter()
            .filter_map(|g| g.get("id").and_then(Value::as_str))
            .map(ToString::to_string)
            .collect())
    }

    async fn report_page(
        &self,
        request: &ReportRequest,
        page_token: Option<&str>,
    ) -> Result<ReportPage> {
        info!(
            "Making report request for profile ID {} and date {} (pageToken: {:?})",
            request.profile_id, request.date, page_token
        );

        let mut report_request = json!({
            "viewId": request.profile_id,
            "dateRanges": [{"startDate": request.date, "endDate": request.date}],
            "metrics": request.metrics.iter().map(|m| json!({"expression": m})).collect::<Vec<_>>(),
            "dimensions": request.dimensions.iter().map(|d| json!({"name": d})).collect::<Vec<_>>(),
            "pageSize": request.page_size,
        });
        if let Some(token) = page_token {
            report_request["pageToken"] = json!(token);
        }
        let body = json!({ "reportRequests": [report_request] });

        let response = self.http.post(&self.reporting_url, &body).await?;
        ReportPage::from_response(&response)
    }

    fn profile_info(&self, profile_id: &str) -> Option<&ProfileInfo> {
        self.profile_lookup.get(profile_id)
    }
}

impl std::fmt::Debug for GaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GaClient")
            .field("profiles", &self.profile_lookup.len())
            .finish_non_exhaustive()
    }
}
