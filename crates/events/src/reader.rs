//! JSONL event reader - sequential reader for replay

use crate::error::EventError;
use crate::event::EventEnvelope;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Sequential event reader over the journal files
pub struct EventReader {
    files: Vec<std::path::PathBuf>,
}

impl EventReader {
    /// Create a new reader from a journal directory
    pub fn from_directory(path: impl AsRef<Path>) -> Result<Self, EventError> {
        let path = path.as_ref();
        let mut files = Vec::new();

        if path.exists() {
            for entry in std::fs::read_dir(path)? {
                let entry = entry?;
                let file_path = entry.path();
                if file_path.extension().map_or(false, |ext| ext == "jsonl") {
                    files.push(file_path);
                }
            }
        }

        files.sort();

        Ok(Self { files })
    }

    /// Read all envelopes from all files in order
    pub fn read_all(&self) -> Result<Vec<EventEnvelope>, EventError> {
        let mut envelopes = Vec::new();

        for file_path in &self.files {
            let file = File::open(file_path)?;
            let reader = BufReader::new(file);

            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let envelope: EventEnvelope = serde_json::from_str(&line)?;
                envelopes.push(envelope);
            }
        }

        Ok(envelopes)
    }

    /// Last sequence number present in the journal
    pub fn last_sequence(&self) -> Result<Option<u64>, EventError> {
        let Some(last_file) = self.files.last() else {
            return Ok(None);
        };

        let file = File::open(last_file)?;
        let reader = BufReader::new(file);

        let mut last_seq = None;
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let envelope: EventEnvelope = serde_json::from_str(&line)?;
            last_seq = Some(envelope.sequence);
        }

        Ok(last_seq)
    }

    /// Count total envelopes across all files
    pub fn count(&self) -> Result<usize, EventError> {
        let mut count = 0;

        for file_path in &self.files {
            let file = File::open(file_path)?;
            let reader = BufReader::new(file);

            for line in reader.lines() {
                let line = line?;
                if !line.trim().is_empty() {
                    count += 1;
                }
            }
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::LedgerEvent;
    use crate::store::EventJournal;
    use tempfile::TempDir;

    #[test]
    fn test_roundtrip_through_journal() {
        let dir = TempDir::new().unwrap();
        let mut journal = EventJournal::open(dir.path()).unwrap();
        for i in 0..3 {
            journal
                .append(LedgerEvent::MatchConfirmed {
                    match_id: format!("m-{}", i),
                })
                .unwrap();
        }

        let reader = EventReader::from_directory(dir.path()).unwrap();
        let envelopes = reader.read_all().unwrap();
        assert_eq!(envelopes.len(), 3);
        assert_eq!(reader.count().unwrap(), 3);
        assert_eq!(reader.last_sequence().unwrap(), Some(3));

        for (i, envelope) in envelopes.iter().enumerate() {
            assert_eq!(envelope.sequence, (i + 1) as u64);
        }
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        let reader = EventReader::from_directory(dir.path()).unwrap();
        assert!(reader.read_all().unwrap().is_empty());
        assert_eq!(reader.last_sequence().unwrap(), None);
    }
}
