//! Durable append-only storage: one JSON-encoded [`PinRecord`] per line.
//!
//! A record is committed once its terminating newline is on disk. A final
//! line without one is a write torn by a crash: it is dropped and truncated
//! away on load. Unparseable terminated lines are reported as corrupt.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::record::PinRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt record at line {line}: {source}")]
    Corrupt {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("encode record: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every persisted record in commit order.
    pub fn load(&self) -> Result<Vec<PinRecord>, StoreError> {
        let mut bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let committed = bytes.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
        if committed < bytes.len() {
            tracing::warn!(
                path = %self.path.display(),
                dropped_bytes = bytes.len() - committed,
                "Dropping unterminated trailing record"
            );
            OpenOptions::new()
                .write(true)
                .open(&self.path)?
                .set_len(committed as u64)?;
            bytes.truncate(committed);
        }

        let mut records = Vec::new();
        for (i, line) in bytes.split(|&b| b == b'\n').enumerate() {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let record = serde_json::from_slice(line)
                .map_err(|source| StoreError::Corrupt { line: i + 1, source })?;
            records.push(record);
        }

        tracing::debug!(path = %self.path.display(), count = records.len(), "Ledger loaded");
        Ok(records)
    }

    /// Persist one committed record.
    pub fn append(&self, record: &PinRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(record).map_err(StoreError::Encode)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&line)?;
        file.sync_data()?;
        Ok(())
    }
}
