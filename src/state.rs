//! Persisted sync state
//!
//! Bookmarks nest stream id, then profile id, down to a single
//! `last_report_date`. The `currently_syncing` cursor pair lets an
//! interrupted multi-stream, multi-profile run resume where it stopped.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Bookmark for one (stream, profile) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileBookmark {
    pub last_report_date: String,
}

/// Profile id to bookmark
pub type StreamBookmarks = BTreeMap<String, ProfileBookmark>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub bookmarks: BTreeMap<String, StreamBookmarks>,
    #[serde(default)]
    pub currently_syncing: Option<String>,
    #[serde(default)]
    pub currently_syncing_view: Option<String>,
}

impl State {
    /// Load state from a file, migrating the legacy flat bookmark shape
    pub fn load(path: &Path, view_ids: &[String]) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::state(format!("could not read state {}: {e}", path.display())))?;
        let value: Value = serde_json::from_str(&raw)?;
        Self::from_value(value, view_ids)
    }

    /// Parse a state value. Early versions bookmarked per stream only
    /// (`{stream: {"last_report_date": ...}}`); those dates fan out to
    /// every configured view id so no view loses its position.
    pub fn from_value(mut value: Value, view_ids: &[String]) -> Result<Self> {
        if let Some(bookmarks) = value.get_mut("bookmarks").and_then(Value::as_object_mut) {
            for stream_value in bookmarks.values_mut() {
                let legacy_date = stream_value
                    .get("last_report_date")
                    .and_then(Value::as_str)
                    .map(ToString::to_string);
                if let Some(date) = legacy_date {
                    let fanned: BTreeMap<&String, ProfileBookmark> = view_ids
                        .iter()
                        .map(|view_id| {
                            (
                                view_id,
                                ProfileBookmark {
                                    last_report_date: date.clone(),
                                },
                            )
                        })
                        .collect();
                    *stream_value = serde_json::to_value(fanned)?;
                }
            }
        }
        serde_json::from_value(value).map_err(Error::JsonParse)
    }

    pub fn get_bookmark(&self, stream_id: &str, profile_id: &str) -> Option<&str> {
        self.bookmarks
            .get(stream_id)?
            .get(profile_id)
            .map(|b| b.last_report_date.as_str())
    }

    pub fn set_bookmark(&mut self, stream_id: &str, profile_id: &str, date: &str) {
        self.bookmarks
            .entry(stream_id.to_string())
            .or_default()
            .insert(
                profile_id.to_string(),
                ProfileBookmark {
                    last_report_date: date.to_string(),
                },
            );
    }

    pub fn set_currently_syncing(&mut self, stream_id: Option<&str>, profile_id: Option<&str>) {
        self.currently_syncing = stream_id.map(ToString::to_string);
        self.currently_syncing_view = profile_id.map(ToString::to_string);
    }
}
