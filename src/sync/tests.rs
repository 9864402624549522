use super::*;
use crate::client::{CustomFieldItem, RawColumn, RawCubes, ReportPage, ReportRow};
use crate::writer::RecordingWriter;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;

/// Serves canned report pages per day, with an optional failure point
struct FakeReporting {
    pages: HashMap<String, Vec<ReportPage>>,
    profile: (String, ProfileInfo),
    calls: Mutex<usize>,
    error_after: Option<usize>,
}

impl FakeReporting {
    fn new(days: Vec<(&str, Vec<ReportPage>)>) -> Self {
        Self {
            pages: days
                .into_iter()
                .map(|(date, pages)| (date.to_string(), pages))
                .collect(),
            profile: (
                "12345".to_string(),
                ProfileInfo {
                    account_id: "111".to_string(),
                    web_property_id: "UA-111-1".to_string(),
                },
            ),
            calls: Mutex::new(0),
            error_after: None,
        }
    }

    fn failing_after(mut self, successful_calls: usize) -> Self {
        self.error_after = Some(successful_calls);
        self
    }

    fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl AnalyticsApi for FakeReporting {
    async fn field_metadata(&self) -> Result<Vec<RawColumn>> {
        unimplemented!("not used by sync tests")
    }

    async fn raw_cubes(&self) -> Result<RawCubes> {
        unimplemented!("not used by sync tests")
    }

    async fn custom_metrics(&self, _: &str, _: &str) -> Result<Vec<CustomFieldItem>> {
        unimplemented!("not used by sync tests")
    }

    async fn custom_dimensions(&self, _: &str, _: &str) -> Result<Vec<CustomFieldItem>> {
        unimplemented!("not used by sync tests")
    }

    async fn goal_ids(&self, _: &str, _: &str, _: &str) -> Result<Vec<String>> {
        unimplemented!("not used by sync tests")
    }

    async fn report_page(
        &self,
        request: &ReportRequest,
        page_token: Option<&str>,
    ) -> Result<ReportPage> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        if let Some(limit) = self.error_after {
            if *calls > limit {
                return Err(Error::report_shape("Report failed!"));
            }
        }

        let pages = self
            .pages
            .get(&request.date)
            .unwrap_or_else(|| panic!("no fixture for date {}", request.date));
        let index: usize = page_token.map_or(0, |t| t.parse().unwrap());
        Ok(pages[index].clone())
    }

    fn profile_info(&self, profile_id: &str) -> Option<&ProfileInfo> {
        (self.profile.0 == profile_id).then_some(&self.profile.1)
    }
}

fn page(golden: bool) -> ReportPage {
    ReportPage {
        is_data_golden: golden,
        ..Default::default()
    }
}

fn job<'a>(
    profile: &'a ProfileInfo,
    fields: &'a SelectedFields,
    start: &str,
    end: &str,
    historical: bool,
) -> ReportSync<'a> {
    ReportSync {
        stream_id: "123",
        profile_id: "12345",
        info: profile,
        fields,
        start: parse_date(start).unwrap(),
        end: parse_date(end).unwrap(),
        historical,
    }
}

fn bookmark_of(state: &State) -> Option<&str> {
    state.get_bookmark("123", "12345")
}

#[tokio::test]
async fn test_bookmarking_stops_at_first_non_golden_day() {
    let client = FakeReporting::new(vec![
        ("2019-11-01", vec![page(true)]),
        ("2019-11-02", vec![page(true)]),
        ("2019-11-03", vec![page(false)]),
        ("2019-11-04", vec![page(true)]),
    ]);
    let mut writer = RecordingWriter::default();
    let mut state = State::default();
    let profile = client.profile.1.clone();
    let fields = SelectedFields::default();

    SyncEngine::new(&client, &mut writer, 1000)
        .sync_report(
            &job(&profile, &fields, "2019-11-01", "2019-11-04", false),
            &mut state,
        )
        .await
        .unwrap();

    // Bookmark froze at the first uncertain day, but every day was requested
    assert_eq!(bookmark_of(&state), Some("2019-11-03"));
    assert_eq!(client.call_count(), 4);
}

#[tokio::test]
async fn test_bookmark_is_saved_if_first_day_is_non_golden() {
    let client = FakeReporting::new(vec![("2019-11-03", vec![page(false)])]);
    let mut writer = RecordingWriter::default();
    let mut state = State::default();
    let profile = client.profile.1.clone();
    let fields = SelectedFields::default();

    SyncEngine::new(&client, &mut writer, 1000)
        .sync_report(
            &job(&profile, &fields, "2019-11-03", "2019-11-03", false),
            &mut state,
        )
        .await
        .unwrap();

    assert_eq!(bookmark_of(&state), Some("2019-11-03"));
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_historical_sync_skips_non_golden_then_stops_at_first_non_golden() {
    // Google returns no isDataGolden field at all for days with no
    // historical data; those days must not pin the bookmark
    let client = FakeReporting::new(vec![
        ("2019-10-30", vec![page(false)]),
        ("2019-10-31", vec![page(false)]),
        ("2019-11-01", vec![page(true)]),
        ("2019-11-02", vec![page(true)]),
        ("2019-11-03", vec![page(false)]),
        ("2019-11-04", vec![page(true)]),
    ]);
    let mut writer = RecordingWriter::default();
    let mut state = State::default();
    let profile = client.profile.1.clone();
    let fields = SelectedFields::default();

    SyncEngine::new(&client, &mut writer, 1000)
        .sync_report(
            &job(&profile, &fields, "2019-10-30", "2019-11-04", true),
            &mut state,
        )
        .await
        .unwrap();

    assert_eq!(bookmark_of(&state), Some("2019-11-03"));
    assert_eq!(client.call_count(), 6);
}

#[tokio::test]
async fn test_interrupted_historical_sync_leaves_state_empty() {
    let client = FakeReporting::new(vec![
        ("2019-10-30", vec![page(false)]),
        ("2019-10-31", vec![page(false)]),
        ("2019-11-01", vec![page(false)]),
        ("2019-11-02", vec![page(false)]),
    ])
    .failing_after(3);
    let mut writer = RecordingWriter::default();
    let mut state = State::default();
    let profile = client.profile.1.clone();
    let fields = SelectedFields::default();

    let result = SyncEngine::new(&client, &mut writer, 1000)
        .sync_report(
            &job(&profile, &fields, "2019-10-30", "2019-11-02", true),
            &mut state,
        )
        .await;

    assert!(result.is_err());
    assert_eq!(state, State::default());
    assert_eq!(client.call_count(), 4);
}

fn data_page(golden: bool, next_page_token: Option<&str>, sessions: &[&str]) -> ReportPage {
    ReportPage {
        dimension_headers: vec!["ga:date".to_string()],
        metric_headers: vec![crate::client::MetricHeader {
            name: "ga:sessions".to_string(),
            column_type: "INTEGER".to_string(),
        }],
        rows: sessions
            .iter()
            .map(|s| ReportRow {
                dimensions: vec!["20191101".to_string()],
                metrics: vec![s.to_string()],
            })
            .collect(),
        is_data_golden: golden,
        next_page_token: next_page_token.map(ToString::to_string),
    }
}

#[tokio::test]
async fn test_all_pages_of_a_day_are_emitted_with_one_bookmark() {
    let client = FakeReporting::new(vec![(
        "2019-11-01",
        vec![
            data_page(true, Some("1"), &["10", "20"]),
            data_page(true, None, &["30"]),
        ],
    )]);
    let mut writer = RecordingWriter::default();
    let mut state = State::default();
    let profile = client.profile.1.clone();
    let fields = SelectedFields {
        metrics: vec!["ga:sessions".to_string()],
        dimensions: vec!["ga:date".to_string()],
    };

    SyncEngine::new(&client, &mut writer, 1000)
        .sync_report(
            &job(&profile, &fields, "2019-11-01", "2019-11-01", false),
            &mut state,
        )
        .await
        .unwrap();

    let records = writer.records_for("123");
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["ga:sessions"], json!(10));
    assert_eq!(records[2]["ga:sessions"], json!(30));
    assert_eq!(records[0]["ga:date"], json!("2019-11-01T00:00:00.000000Z"));
    assert_eq!(records[0]["account_id"], json!("111"));
    assert_eq!(records[0]["profile_id"], json!("12345"));
    assert_eq!(bookmark_of(&state), Some("2019-11-01"));
    assert_eq!(client.call_count(), 2);
}

#[test]
fn test_record_hash_canary() {
    // Constant digest; a change here means the primary key has been
    // invalidated and a major version bump is required
    let dimensions = [
        ("ga:dim1", "5.23"),
        ("ga:dim2", "a string value"),
        ("ga:apples", "123"),
        ("ga:visitDateThing", "2019-04-03T00:11:40.04836Z"),
    ];
    let hash = record_hash(
        "12345",
        "AA-TESTID",
        "67890",
        &dimensions,
        "2019-11-20",
        "2019-11-25",
    )
    .unwrap();
    assert_eq!(
        hash,
        "235e72e407d6f5ba75bf99f5ebe19a03e424e3848007db4d9be1ae165fb4ca5b"
    );
}

#[test]
fn test_record_hash_canary_without_dimensions() {
    let hash = record_hash("1", "UA-1-1", "100", &[], "2021-01-01", "2021-01-01").unwrap();
    assert_eq!(
        hash,
        "7aa5cea6e805d7998f47a392ec2cd1679d6a0606cd4b3c80f2ddebaf28745bfd"
    );
}

#[test]
fn test_record_hash_is_order_insensitive() {
    let forward = [("ga:a", "1"), ("ga:b", "2")];
    let reversed = [("ga:b", "2"), ("ga:a", "1")];
    assert_eq!(
        record_hash("1", "UA-1-1", "100", &forward, "2021-01-01", "2021-01-01").unwrap(),
        record_hash("1", "UA-1-1", "100", &reversed, "2021-01-01", "2021-01-01").unwrap()
    );
}

#[test]
fn test_build_record_transforms_values() {
    let page = ReportPage {
        dimension_headers: vec![
            "ga:date".to_string(),
            "ga:dateHour".to_string(),
            "ga:country".to_string(),
        ],
        metric_headers: vec![
            crate::client::MetricHeader {
                name: "ga:sessions".to_string(),
                column_type: "INTEGER".to_string(),
            },
            crate::client::MetricHeader {
                name: "ga:bounceRate".to_string(),
                column_type: "PERCENT".to_string(),
            },
        ],
        ..Default::default()
    };
    let row = ReportRow {
        dimensions: vec![
            "20210401".to_string(),
            "2021040113".to_string(),
            "Denmark".to_string(),
        ],
        metrics: vec!["42".to_string(), "21.5".to_string()],
    };
    let info = ProfileInfo {
        account_id: "111".to_string(),
        web_property_id: "UA-111-1".to_string(),
    };

    let record = build_record(&page, &row, "900", &info, "2021-04-01").unwrap();
    assert_eq!(record["ga:date"], json!("2021-04-01T00:00:00.000000Z"));
    assert_eq!(record["ga:dateHour"], json!("2021-04-01T13:00:00.000000Z"));
    assert_eq!(record["ga:country"], json!("Denmark"));
    assert_eq!(record["ga:sessions"], json!(42));
    assert_eq!(record["ga:bounceRate"], json!(21.5));
    assert_eq!(record["start_date"], json!("2021-04-01"));
    assert_eq!(record["end_date"], json!("2021-04-01"));
    assert_eq!(record["account_id"], json!("111"));
    assert_eq!(record["web_property_id"], json!("UA-111-1"));
    assert_eq!(record["profile_id"], json!("900"));

    // The hash covers the raw compact dimension values
    let expected = record_hash(
        "111",
        "UA-111-1",
        "900",
        &[
            ("ga:date", "20210401"),
            ("ga:dateHour", "2021040113"),
            ("ga:country", "Denmark"),
        ],
        "2021-04-01",
        "2021-04-01",
    )
    .unwrap();
    assert_eq!(record["_sdc_record_hash"], json!(expected));
}

#[test]
fn test_build_record_passes_overflow_sentinel_through() {
    let page = ReportPage {
        dimension_headers: vec!["ga:date".to_string()],
        ..Default::default()
    };
    let row = ReportRow {
        dimensions: vec!["(other)".to_string()],
        metrics: vec![],
    };
    let info = ProfileInfo {
        account_id: "111".to_string(),
        web_property_id: "UA-111-1".to_string(),
    };

    let record = build_record(&page, &row, "900", &info, "2021-04-01").unwrap();
    assert_eq!(record["ga:date"], json!("(other)"));
}

#[test]
fn test_build_record_keeps_unparseable_metric_as_string() {
    let page = ReportPage {
        metric_headers: vec![crate::client::MetricHeader {
            name: "ga:sessions".to_string(),
            column_type: "INTEGER".to_string(),
        }],
        ..Default::default()
    };
    let row = ReportRow {
        dimensions: vec![],
        metrics: vec!["not-a-number".to_string()],
    };
    let info = ProfileInfo {
        account_id: "111".to_string(),
        web_property_id: "UA-111-1".to_string(),
    };

    let record = build_record(&page, &row, "900", &info, "2021-04-01").unwrap();
    assert_eq!(record["ga:sessions"], json!("not-a-number"));
}

fn selected_catalog(stream_id: &str) -> Catalog {
    let spec = crate::catalog::ReportSpec {
        tap_stream_id: stream_id.to_string(),
        name: stream_id.to_string(),
        default_metrics: Vec::new(),
        default_dimensions: Vec::new(),
    };
    let mut catalog =
        crate::catalog::generate_catalog(&[spec], &[], &std::collections::BTreeSet::new());
    for entry in &mut catalog.streams[0].metadata {
        if entry.breadcrumb.is_empty() {
            entry.metadata.insert("selected".to_string(), json!(true));
        }
    }
    catalog
}

fn sync_config(start: &str, end: &str) -> Config {
    Config {
        start_date: start.to_string(),
        end_date: Some(end.to_string()),
        view_ids: Some(vec!["12345".to_string()]),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_sync_writes_schema_and_clears_cursor() {
    let client = FakeReporting::new(vec![
        ("2019-11-01", vec![page(true)]),
        ("2019-11-02", vec![page(true)]),
    ]);
    let mut writer = RecordingWriter::default();

    let state = SyncEngine::new(&client, &mut writer, 1000)
        .sync(
            &sync_config("2019-11-01", "2019-11-02"),
            &selected_catalog("123"),
            State::default(),
        )
        .await
        .unwrap();

    assert_eq!(writer.schema_count(), 1);
    assert_eq!(state.get_bookmark("123", "12345"), Some("2019-11-02"));
    assert!(state.currently_syncing.is_none());
    assert!(state.currently_syncing_view.is_none());

    // The cursor was set while the pair was in flight
    let states = writer.states();
    assert_eq!(states[0]["currently_syncing"], json!("123"));
    assert_eq!(states[0]["currently_syncing_view"], json!("12345"));
    let last = writer.last_state().unwrap();
    assert_eq!(last["currently_syncing"], json!(null));
}

#[tokio::test]
async fn test_sync_resumes_past_streams_before_cursor() {
    let client = FakeReporting::new(vec![("2019-11-01", vec![page(true)])]);
    let mut writer = RecordingWriter::default();

    let mut catalog = selected_catalog("first");
    catalog
        .streams
        .extend(selected_catalog("second").streams);

    let mut state = State::default();
    state.set_currently_syncing(Some("second"), Some("12345"));

    let state = SyncEngine::new(&client, &mut writer, 1000)
        .sync(
            &sync_config("2019-11-01", "2019-11-01"),
            &catalog,
            state,
        )
        .await
        .unwrap();

    // Only the resumed stream ran
    assert_eq!(writer.schema_count(), 1);
    assert!(state.bookmarks.contains_key("second"));
    assert!(!state.bookmarks.contains_key("first"));
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_sync_resumes_from_bookmark_in_steady_mode() {
    // Bookmark past the start date: resume at the bookmarked day itself
    let client = FakeReporting::new(vec![
        ("2019-11-03", vec![page(true)]),
        ("2019-11-04", vec![page(true)]),
    ]);
    let mut writer = RecordingWriter::default();

    let mut state = State::default();
    state.set_bookmark("123", "12345", "2019-11-03");

    let state = SyncEngine::new(&client, &mut writer, 1000)
        .sync(
            &sync_config("2019-11-01", "2019-11-04"),
            &selected_catalog("123"),
            state,
        )
        .await
        .unwrap();

    assert_eq!(state.get_bookmark("123", "12345"), Some("2019-11-04"));
    assert_eq!(client.call_count(), 2);
}
