//! Append-only record log.
//!
//! The ledger exclusively owns its records. Appends are serialized through a
//! single write lock; readers get `Arc` handles to records that can no longer
//! change, so a snapshot stays valid while later appends proceed.

use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Mutex, RwLock};

use crate::event::BatchPinEvent;
use crate::record::PinRecord;

#[derive(Debug, Default)]
pub struct Ledger {
    records: RwLock<Vec<Arc<PinRecord>>>,
    subscribers: Mutex<Vec<Sender<BatchPinEvent>>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a ledger from previously committed records, in order.
    ///
    /// No events are emitted for restored records.
    pub fn from_records(records: impl IntoIterator<Item = PinRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().map(Arc::new).collect()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Add a record at the end of the log and return its index.
    ///
    /// Never fails: validation happens before a record is built.
    pub fn append(&self, record: PinRecord) -> usize {
        let mut records = self.records.write();
        let index = records.len();
        let record = Arc::new(record);
        records.push(Arc::clone(&record));

        // Notify while holding the write lock so listeners observe append order.
        let mut subscribers = self.subscribers.lock();
        if !subscribers.is_empty() {
            let event = BatchPinEvent::new(index as u64, &record);
            subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        }

        tracing::debug!(index, namespace = record.namespace(), "Record appended");
        index
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Arc<PinRecord>> {
        self.records.read().get(index).cloned()
    }

    pub fn last(&self) -> Option<Arc<PinRecord>> {
        self.records.read().last().cloned()
    }

    /// Point-in-time view of every record appended so far.
    pub fn snapshot(&self) -> Vec<Arc<PinRecord>> {
        self.records.read().clone()
    }

    /// Receive a [`BatchPinEvent`] for every subsequent append.
    pub fn subscribe(&self) -> Receiver<BatchPinEvent> {
        let (tx, rx) = channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }
}
