//! Protocol message output
//!
//! Records flow downstream as JSON lines: one SCHEMA declaration per
//! stream before its records, RECORD messages with an extraction
//! timestamp, and a STATE message after every bookmark update.

use crate::catalog::CatalogEntry;
use crate::error::Result;
use crate::state::State;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use std::io::Write;

/// Sink for protocol messages. The sync and discovery engines only see
/// this trait; tests substitute [`RecordingWriter`].
pub trait MessageWriter {
    fn write_schema(&mut self, entry: &CatalogEntry) -> Result<()>;

    fn write_record(
        &mut self,
        stream_id: &str,
        record: &Map<String, Value>,
        time_extracted: DateTime<Utc>,
    ) -> Result<()>;

    fn write_state(&mut self, state: &State) -> Result<()>;
}

/// Writes one JSON message per line to any byte sink
pub struct JsonLinesWriter<W: Write> {
    out: W,
}

impl JsonLinesWriter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn write_line(&mut self, message: &Value) -> Result<()> {
        serde_json::to_writer(&mut self.out, message)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> MessageWriter for JsonLinesWriter<W> {
    fn write_schema(&mut self, entry: &CatalogEntry) -> Result<()> {
        self.write_line(&json!({
            "type": "SCHEMA",
            "stream": entry.tap_stream_id,
            "schema": entry.schema,
            "key_properties": entry.key_properties,
        }))
    }

    fn write_record(
        &mut self,
        stream_id: &str,
        record: &Map<String, Value>,
        time_extracted: DateTime<Utc>,
    ) -> Result<()> {
        self.write_line(&json!({
            "type": "RECORD",
            "stream": stream_id,
            "record": record,
            "time_extracted": time_extracted.to_rfc3339_opts(SecondsFormat::Micros, true),
        }))
    }

    fn write_state(&mut self, state: &State) -> Result<()> {
        self.write_line(&json!({
            "type": "STATE",
            "value": state,
        }))
    }
}

/// Captures messages in memory for assertions
#[derive(Debug, Default)]
pub struct RecordingWriter {
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Schema {
        stream_id: String,
        schema: Value,
    },
    Record {
        stream_id: String,
        record: Map<String, Value>,
        time_extracted: DateTime<Utc>,
    },
    State(Value),
}

impl RecordingWriter {
    pub fn records_for(&self, stream_id: &str) -> Vec<&Map<String, Value>> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::Record {
                    stream_id: id,
                    record,
                    ..
                } if id == stream_id => Some(record),
                _ => None,
            })
            .collect()
    }

    pub fn states(&self) -> Vec<&Value> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::State(value) => Some(value),
                _ => None,
            })
            .collect()
    }

    pub fn last_state(&self) -> Option<&Value> {
        self.states().last().copied()
    }

    pub fn schema_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| matches!(m, Message::Schema { .. }))
            .count()
    }
}

impl MessageWriter for RecordingWriter {
    fn write_schema(&mut self, entry: &CatalogEntry) -> Result<()> {
        self.messages.push(Message::Schema {
            stream_id: entry.tap_stream_id.clone(),
            schema: serde_json::to_value(&entry.schema)?,
        });
        Ok(())
    }

    fn write_record(
        &mut self,
        stream_id: &str,
        record: &Map<String, Value>,
        time_extracted: DateTime<Utc>,
    ) -> Result<()> {
        self.messages.push(Message::Record {
            stream_id: stream_id.to_string(),
            record: record.clone(),
            time_extracted,
        });
        Ok(())
    }

    fn write_state(&mut self, state: &State) -> Result<()> {
        self.messages.push(Message::State(serde_json::to_value(state)?));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{generate_entry, ReportSpec};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn sample_entry() -> CatalogEntry {
        let spec = ReportSpec {
            tap_stream_id: "report".to_string(),
            name: "report".to_string(),
            default_metrics: Vec::new(),
            default_dimensions: Vec::new(),
        };
        generate_entry(&spec, &[], &BTreeSet::new())
    }

    fn lines(buffer: &[u8]) -> Vec<Value> {
        std::str::from_utf8(buffer)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_schema_message_shape() {
        let mut buffer = Vec::new();
        JsonLinesWriter::new(&mut buffer)
            .write_schema(&sample_entry())
            .unwrap();

        let messages = lines(&buffer);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["type"], "SCHEMA");
        assert_eq!(messages[0]["stream"], "report");
        assert_eq!(messages[0]["key_properties"], json!(["_sdc_record_hash"]));
        assert_eq!(messages[0]["schema"]["type"], "object");
    }

    #[test]
    fn test_record_message_shape() {
        let mut buffer = Vec::new();
        let mut record = Map::new();
        record.insert("ga:sessions".to_string(), json!(12));
        let extracted = DateTime::parse_from_rfc3339("2021-04-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        JsonLinesWriter::new(&mut buffer)
            .write_record("report", &record, extracted)
            .unwrap();

        let messages = lines(&buffer);
        assert_eq!(messages[0]["type"], "RECORD");
        assert_eq!(messages[0]["record"]["ga:sessions"], json!(12));
        assert_eq!(
            messages[0]["time_extracted"],
            "2021-04-01T12:00:00.000000Z"
        );
    }

    #[test]
    fn test_state_message_shape() {
        let mut buffer = Vec::new();
        let mut state = State::default();
        state.set_bookmark("report", "900", "2021-04-01");
        JsonLinesWriter::new(&mut buffer)
            .write_state(&state)
            .unwrap();

        let messages = lines(&buffer);
        assert_eq!(messages[0]["type"], "STATE");
        assert_eq!(
            messages[0]["value"]["bookmarks"]["report"]["900"]["last_report_date"],
            "2021-04-01"
        );
    }
}
