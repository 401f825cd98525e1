//! JSONL event journal - append-only writer

use crate::error::EventError;
use crate::event::{EventEnvelope, LedgerEvent};
use crate::reader::EventReader;
use chrono::Utc;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Append-only JSONL journal with date-rotated files
pub struct EventJournal {
    base_path: PathBuf,
    current_file: Option<BufWriter<File>>,
    current_date: Option<String>,
    next_sequence: u64,
}

impl EventJournal {
    /// Open (or create) a journal, resuming the sequence from disk
    pub fn open(base_path: impl AsRef<Path>) -> Result<Self, EventError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;

        let last = EventReader::from_directory(&base_path)?.last_sequence()?;

        Ok(Self {
            base_path,
            current_file: None,
            current_date: None,
            next_sequence: last.unwrap_or(0) + 1,
        })
    }

    /// Append an event, assigning the next sequence number.
    /// The line is flushed before the envelope is returned.
    pub fn append(&mut self, event: LedgerEvent) -> Result<EventEnvelope, EventError> {
        let envelope = EventEnvelope {
            sequence: self.next_sequence,
            recorded_at: Utc::now(),
            event,
        };

        let date = envelope.recorded_at.format("%Y-%m-%d").to_string();
        if self.current_date.as_ref() != Some(&date) {
            self.rotate_file(&date)?;
        }

        if let Some(ref mut writer) = self.current_file {
            let json = serde_json::to_string(&envelope)?;
            writeln!(writer, "{}", json)?;
            writer.flush()?;
        }

        debug!(sequence = envelope.sequence, event = envelope.event.name(), "journaled");
        self.next_sequence += 1;
        Ok(envelope)
    }

    /// Rotate to a new file for the given date
    fn rotate_file(&mut self, date: &str) -> Result<(), EventError> {
        if let Some(ref mut writer) = self.current_file {
            writer.flush()?;
        }

        let file_path = self.base_path.join(format!("{}.jsonl", date));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)?;

        self.current_file = Some(BufWriter::new(file));
        self.current_date = Some(date.to_string());

        Ok(())
    }

    /// Next sequence number to be assigned
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Flush and close the current file
    pub fn close(&mut self) -> Result<(), EventError> {
        if let Some(ref mut writer) = self.current_file {
            writer.flush()?;
        }
        self.current_file = None;
        self.current_date = None;
        Ok(())
    }
}

impl Drop for EventJournal {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
