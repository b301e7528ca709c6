//! Output Sinks
//!
//! Writing is the only phase that touches storage. Each source's stream is
//! partitioned by calendar day of the simulation clock and written as
//! newline-delimited JSON, optionally gzip-compressed; the incident index
//! is written exactly once after all streams. Failures here are fatal.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::Value;

use faultline_core::{IncidentIndex, Source, WireRecord, WriteError};

/// Where a finished run lands. `DirectorySink` is the production
/// implementation; `MemorySink` keeps everything addressable for tests.
pub trait OutputSink {
    fn write_stream(
        &mut self,
        source: Source,
        day: NaiveDate,
        records: &[WireRecord],
    ) -> Result<(), WriteError>;

    fn write_index(&mut self, index: &IncidentIndex) -> Result<(), WriteError>;
}

/// Filesystem sink: `<root>/<source>/logs_<YYYY-MM-DD>.jsonl[.gz]` plus
/// `<root>/correlation/incidents.json`.
pub struct DirectorySink {
    root: PathBuf,
    compress: bool,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>, compress: bool) -> Self {
        Self {
            root: root.into(),
            compress,
        }
    }

    fn encode_ndjson(records: &[WireRecord], path: &Path) -> Result<Vec<u8>, WriteError> {
        let mut buffer = Vec::new();
        for record in records {
            let line = serde_json::to_vec(&record.payload).map_err(|cause| {
                WriteError::Encode {
                    path: path.to_path_buf(),
                    cause,
                }
            })?;
            buffer.extend_from_slice(&line);
            buffer.push(b'\n');
        }
        Ok(buffer)
    }

    fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> WriteError + '_ {
        move |cause| WriteError::Io {
            path: path.to_path_buf(),
            cause,
        }
    }
}

impl OutputSink for DirectorySink {
    fn write_stream(
        &mut self,
        source: Source,
        day: NaiveDate,
        records: &[WireRecord],
    ) -> Result<(), WriteError> {
        let dir = self.root.join(source.as_str());
        fs::create_dir_all(&dir).map_err(Self::io_err(&dir))?;

        let suffix = if self.compress { ".jsonl.gz" } else { ".jsonl" };
        let path = dir.join(format!("logs_{day}{suffix}"));
        let buffer = Self::encode_ndjson(records, &path)?;

        if self.compress {
            let file = fs::File::create(&path).map_err(Self::io_err(&path))?;
            let mut encoder = GzEncoder::new(file, Compression::default());
            encoder.write_all(&buffer).map_err(Self::io_err(&path))?;
            encoder.finish().map_err(Self::io_err(&path))?;
        } else {
            fs::write(&path, buffer).map_err(Self::io_err(&path))?;
        }
        Ok(())
    }

    fn write_index(&mut self, index: &IncidentIndex) -> Result<(), WriteError> {
        let dir = self.root.join("correlation");
        fs::create_dir_all(&dir).map_err(Self::io_err(&dir))?;

        let path = dir.join("incidents.json");
        let body = serde_json::to_vec_pretty(index).map_err(|cause| WriteError::Encode {
            path: path.clone(),
            cause,
        })?;
        fs::write(&path, body).map_err(Self::io_err(&path))?;
        Ok(())
    }
}

/// In-memory sink for assertions on partitioning, ordering, and the index.
#[derive(Default)]
pub struct MemorySink {
    pub streams: BTreeMap<Source, BTreeMap<NaiveDate, Vec<WireRecord>>>,
    pub index: Option<IncidentIndex>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All payloads of one source in write order (days ascending).
    pub fn payloads(&self, source: Source) -> Vec<&Value> {
        self.streams
            .get(&source)
            .into_iter()
            .flat_map(|days| days.values())
            .flatten()
            .map(|record| &record.payload)
            .collect()
    }

    /// All records of one source in write order.
    pub fn records(&self, source: Source) -> Vec<&WireRecord> {
        self.streams
            .get(&source)
            .into_iter()
            .flat_map(|days| days.values())
            .flatten()
            .collect()
    }
}

impl OutputSink for MemorySink {
    fn write_stream(
        &mut self,
        source: Source,
        day: NaiveDate,
        records: &[WireRecord],
    ) -> Result<(), WriteError> {
        self.streams
            .entry(source)
            .or_default()
            .entry(day)
            .or_default()
            .extend(records.iter().cloned());
        Ok(())
    }

    fn write_index(&mut self, index: &IncidentIndex) -> Result<(), WriteError> {
        self.index = Some(index.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use flate2::read::GzDecoder;
    use serde_json::json;
    use std::io::Read;

    fn sample_records() -> Vec<WireRecord> {
        let t = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        vec![
            WireRecord::new(t, json!({"a": 1})),
            WireRecord::new(t, json!({"b": 2})),
        ]
    }

    #[test]
    fn test_plain_stream_layout_and_content() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path(), false);
        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

        sink.write_stream(Source::Kubernetes, day, &sample_records())
            .unwrap();

        let path = dir.path().join("kubernetes/logs_2024-03-05.jsonl");
        let body = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"a":1}"#);
    }

    #[test]
    fn test_gzip_stream_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path(), true);
        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

        sink.write_stream(Source::Grafana, day, &sample_records())
            .unwrap();

        let path = dir.path().join("grafana/logs_2024-03-05.jsonl.gz");
        let mut decoder = GzDecoder::new(fs::File::open(path).unwrap());
        let mut body = String::new();
        decoder.read_to_string(&mut body).unwrap();
        assert_eq!(body.lines().count(), 2);
    }

    #[test]
    fn test_index_written_once_under_correlation_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path(), false);

        sink.write_index(&IncidentIndex { incidents: vec![] }).unwrap();

        let body =
            fs::read_to_string(dir.path().join("correlation/incidents.json")).unwrap();
        let parsed: Value = serde_json::from_str(&body).unwrap();
        assert!(parsed["incidents"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_unwritable_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("occupied");
        fs::write(&blocker, b"not a directory").unwrap();

        let mut sink = DirectorySink::new(&blocker, false);
        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let result = sink.write_stream(Source::Sentry, day, &sample_records());
        assert!(matches!(result, Err(WriteError::Io { .. })));
    }
}
