//! Append-only text logs for sales leads and feature requests.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local, TimeZone};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to prepare record directory {path}: {source}")]
    Prepare { path: PathBuf, source: std::io::Error },
    #[error("failed to append record to {path}: {source}")]
    Append { path: PathBuf, source: std::io::Error },
}

pub trait RecordSink: Send + Sync {
    fn append(&self, content: &str) -> Result<(), RecordError>;

    fn describe(&self) -> String;
}

/// `\n[YYYY-MM-DD HH:MM]\n<content>\n`, with the content trimmed.
pub fn format_entry<Tz>(timestamp: &DateTime<Tz>, content: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("\n[{}]\n{}\n", timestamp.format("%Y-%m-%d %H:%M"), content.trim())
}

#[derive(Clone, Debug)]
pub struct FileRecordSink {
    path: PathBuf,
}

impl FileRecordSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for FileRecordSink {
    fn append(&self, content: &str) -> Result<(), RecordError> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| RecordError::Prepare { path: parent.to_path_buf(), source })?;
        }

        let entry = format_entry(&Local::now(), content);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| RecordError::Append { path: self.path.clone(), source })?;
        file.write_all(entry.as_bytes())
            .map_err(|source| RecordError::Append { path: self.path.clone(), source })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryRecordSink {
    entries: Arc<Mutex<Vec<String>>>,
}

impl InMemoryRecordSink {
    pub fn entries(&self) -> Vec<String> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl RecordSink for InMemoryRecordSink {
    fn append(&self, content: &str) -> Result<(), RecordError> {
        let entry = content.trim().to_owned();
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    use crate::records::{format_entry, FileRecordSink, InMemoryRecordSink, RecordSink};

    #[test]
    fn entry_format_wraps_trimmed_content_with_timestamp() {
        let timestamp = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 59).single().expect("timestamp");
        assert_eq!(
            format_entry(&timestamp, "  Feature Request: dark mode \n"),
            "\n[2024-03-09 14:05]\nFeature Request: dark mode\n"
        );
    }

    #[test]
    fn file_sink_appends_and_creates_parent_directories() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = temp_dir.path().join("logs").join("features.txt");
        let sink = FileRecordSink::new(&path);

        sink.append("Feature Request: first").expect("first append");
        sink.append("Feature Request: second").expect("second append");

        let contents = fs::read_to_string(&path).expect("read log");
        let first = contents.find("Feature Request: first").expect("first entry present");
        let second = contents.find("Feature Request: second").expect("second entry present");
        assert!(first < second);
        assert!(contents.starts_with("\n["));
        assert_eq!(contents.matches("]\n").count(), 2);
        assert_eq!(sink.describe(), path.display().to_string());
    }

    #[test]
    fn file_sink_reports_unwritable_path() {
        let temp_dir = TempDir::new().expect("temp dir");
        let sink = FileRecordSink::new(temp_dir.path());

        let error = sink.append("Name: John").expect_err("directory is not appendable");
        assert!(error.to_string().contains("failed to append record"));
    }

    #[test]
    fn in_memory_sink_keeps_trimmed_entries() {
        let sink = InMemoryRecordSink::default();
        sink.append("  Name: John\nCompany: Acme  ").expect("append");
        assert_eq!(sink.entries(), vec!["Name: John\nCompany: Acme".to_owned()]);
    }
}
