//! Incremental sync engine
//!
//! Day-by-day report extraction with golden-data bookmarking. A day's
//! data is "golden" once the API guarantees it will not change; only
//! golden days are safe resume points. Two modes per (stream, profile)
//! pair:
//!
//! - historical (no bookmark yet, or the bookmark still sits on the
//!   configured start date): non-golden days are synced but never
//!   bookmarked, and the first golden day flips the pair to steady;
//! - steady: every day is bookmarked through the first non-golden day,
//!   after which bookmarking halts for the rest of the run while records
//!   keep flowing.
//!
//! State is flushed after every bookmark write, so a crash loses at most
//! one day's advancement and a rerun resumes at the first uncertain day.

mod record;

pub use record::{build_record, record_hash};

use crate::catalog::{Catalog, CatalogEntry, SelectedFields};
use crate::client::{AnalyticsApi, ProfileInfo, ReportPager, ReportRequest};
use crate::config::{parse_date, Config};
use crate::error::{Error, Result};
use crate::state::State;
use crate::writer::MessageWriter;
use chrono::{NaiveDate, Utc};
use tracing::info;

/// One (stream, profile) sync assignment
#[derive(Debug, Clone)]
pub struct ReportSync<'a> {
    pub stream_id: &'a str,
    pub profile_id: &'a str,
    pub info: &'a ProfileInfo,
    pub fields: &'a SelectedFields,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// True until the pair has seen its first golden day
    pub historical: bool,
}

pub struct SyncEngine<'a, C: AnalyticsApi + ?Sized, W: MessageWriter> {
    client: &'a C,
    writer: &'a mut W,
    page_size: usize,
}

impl<'a, C: AnalyticsApi + ?Sized, W: MessageWriter> SyncEngine<'a, C, W> {
    pub fn new(client: &'a C, writer: &'a mut W, page_size: usize) -> Self {
        Self {
            client,
            writer,
            page_size,
        }
    }

    /// Sync every selected stream in the catalog, resuming at the
    /// `currently_syncing` cursor pair when one is set.
    pub async fn sync(&mut self, config: &Config, catalog: &Catalog, mut state: State) -> Result<State> {
        let view_ids = config.view_ids();
        let start = config.start_date()?;
        let end = config.end_date()?;

        let resume_stream = state.currently_syncing.clone();
        let mut resume_view = state.currently_syncing_view.clone();
        let mut skipping = resume_stream.is_some();

        for entry in catalog.streams.iter().filter(|e| e.is_selected()) {
            if skipping {
                if resume_stream.as_deref() == Some(entry.tap_stream_id.as_str()) {
                    skipping = false;
                } else {
                    info!("Skipping stream {} (before resume point)", entry.tap_stream_id);
                    continue;
                }
            }
            self.sync_stream(entry, &view_ids, start, end, resume_view.take(), &mut state)
                .await?;
        }

        state.set_currently_syncing(None, None);
        self.writer.write_state(&state)?;
        Ok(state)
    }

    async fn sync_stream(
        &mut self,
        entry: &CatalogEntry,
        view_ids: &[String],
        start: NaiveDate,
        end: NaiveDate,
        resume_view: Option<String>,
        state: &mut State,
    ) -> Result<()> {
        info!("Syncing stream {}", entry.tap_stream_id);
        self.writer.write_schema(entry)?;
        let fields = entry.selected_fields();

        let mut skipping = resume_view.is_some();
        for profile_id in view_ids {
            if skipping {
                if resume_view.as_deref() == Some(profile_id.as_str()) {
                    skipping = false;
                } else {
                    info!("Skipping view {profile_id} (before resume point)");
                    continue;
                }
            }

            let info = self
                .client
                .profile_info(profile_id)
                .ok_or_else(|| {
                    Error::discovery(format!("view id {profile_id} is not resolvable"))
                })?
                .clone();

            state.set_currently_syncing(Some(&entry.tap_stream_id), Some(profile_id));
            self.writer.write_state(state)?;

            let bookmark = state
                .get_bookmark(&entry.tap_stream_id, profile_id)
                .map(ToString::to_string);
            let day_start = match &bookmark {
                Some(date) => parse_date(date)?,
                None => start,
            };
            let historical = match &bookmark {
                None => true,
                Some(date) => parse_date(date)? == start,
            };

            let job = ReportSync {
                stream_id: &entry.tap_stream_id,
                profile_id,
                info: &info,
                fields: &fields,
                start: day_start,
                end,
                historical,
            };
            self.sync_report(&job, state).await?;
        }
        Ok(())
    }

    /// Run one (stream, profile) pair through its day range, applying
    /// the golden-data bookmark protocol.
    pub async fn sync_report(&mut self, job: &ReportSync<'_>, state: &mut State) -> Result<()> {
        let mut historical = job.historical;
        let mut bookmarking = true;

        let mut date = job.start;
        while date <= job.end {
            let day = date.format("%Y-%m-%d").to_string();
            let request = ReportRequest {
                stream_id: job.stream_id.to_string(),
                profile_id: job.profile_id.to_string(),
                date: day.clone(),
                metrics: job.fields.metrics.clone(),
                dimensions: job.fields.dimensions.clone(),
                page_size: self.page_size,
            };

            let mut pager = ReportPager::new(self.client, request);
            while let Some(page) = pager.next_page().await? {
                for row in &page.rows {
                    let rec = build_record(&page, row, job.profile_id, job.info, &day)?;
                    self.writer.write_record(job.stream_id, &rec, Utc::now())?;
                }

                let golden = page.is_data_golden;
                if historical && !golden {
                    continue;
                }
                if historical {
                    historical = false;
                }
                if bookmarking {
                    state.set_bookmark(job.stream_id, job.profile_id, &day);
                    self.writer.write_state(state)?;
                    if !golden {
                        bookmarking = false;
                    }
                }
            }

            date = date + chrono::Duration::days(1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
