//! Notification surfaced to external listeners for every appended record.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_with::{hex::Hex, serde_as};

use crate::record::{PayloadRef, PinRecord};

/// Event name used by listeners to route pin notifications.
pub const BATCH_PIN_EVENT: &str = "BatchPin";

/// Flattened view of a committed record, as relayed to listeners.
#[serde_as]
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchPinEvent {
    /// Insertion index of the record in the ledger.
    pub sequence: u64,
    pub signer: String,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    #[serde_as(as = "Hex")]
    pub uuids: Vec<u8>,
    #[serde_as(as = "Hex")]
    pub batch_hash: Vec<u8>,
    pub payload_ref: PayloadRef,
    #[serde_as(as = "Vec<Hex>")]
    pub contexts: Vec<Vec<u8>>,
}

impl BatchPinEvent {
    pub fn new(sequence: u64, record: &PinRecord) -> Self {
        Self {
            sequence,
            signer: record.author().to_string(),
            timestamp: record.timestamp(),
            action: record.namespace().to_owned(),
            uuids: record.uuids().to_vec(),
            batch_hash: record.batch_hash().to_vec(),
            payload_ref: record.payload_ref().clone(),
            contexts: record.contexts().to_vec(),
        }
    }

    pub fn name(&self) -> &'static str {
        BATCH_PIN_EVENT
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
