//! The immutable unit of the ledger and the builder that assembles it.
//!
//! A [`PinRecord`] binds caller-supplied batch fields to the identity and
//! commit time provided by the host. Records have no public constructor other
//! than [`build`] (and deserialization from a persisted ledger), and expose
//! read-only accessors only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use crate::error::PinError;

/// Namespace for records produced by `pinBatch`.
pub const BATCH_PIN_NAMESPACE: &str = "firefly:batch_pin";

/// Namespace for records produced by `pinBatchData`.
pub const CONTRACT_INVOKE_PIN_NAMESPACE: &str = "firefly:contract_invoke_pin";

/// Authenticated caller identity, opaque to the ledger.
///
/// Never empty: every record is attributed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Author(String);

impl Author {
    pub fn new(id: impl Into<String>) -> Result<Self, PinError> {
        let id = id.into();
        if id.is_empty() {
            return Err(PinError::EmptyAuthor);
        }
        Ok(Self(id))
    }

    /// Signer string for permissioned networks: `"<msp_id>::<id>"`.
    pub fn from_msp(msp_id: &str, id: &str) -> Result<Self, PinError> {
        if msp_id.is_empty() || id.is_empty() {
            return Err(PinError::EmptyAuthor);
        }
        Ok(Self(format!("{msp_id}::{id}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Author {
    type Error = PinError;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<Author> for String {
    fn from(author: Author) -> Self {
        author.0
    }
}

impl std::fmt::Display for Author {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pointer to the off-chain payload.
///
/// Batch pins carry a location string; network actions reuse the slot for an
/// arbitrary list of byte strings.
#[serde_as]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum PayloadRef {
    Location(String),
    Opaque(#[serde_as(as = "Vec<Hex>")] Vec<Vec<u8>>),
}

impl From<String> for PayloadRef {
    fn from(location: String) -> Self {
        PayloadRef::Location(location)
    }
}

impl From<&str> for PayloadRef {
    fn from(location: &str) -> Self {
        PayloadRef::Location(location.to_owned())
    }
}

impl From<Vec<Vec<u8>>> for PayloadRef {
    fn from(payload: Vec<Vec<u8>>) -> Self {
        PayloadRef::Opaque(payload)
    }
}

/// A single attested entry in the ledger.
#[serde_as]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PinRecord {
    author: Author,
    timestamp: DateTime<Utc>,
    namespace: String,
    #[serde_as(as = "Hex")]
    uuids: Vec<u8>,
    #[serde_as(as = "Hex")]
    batch_hash: Vec<u8>,
    payload_ref: PayloadRef,
    #[serde_as(as = "Vec<Hex>")]
    contexts: Vec<Vec<u8>>,
}

impl PinRecord {
    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn uuids(&self) -> &[u8] {
        &self.uuids
    }

    pub fn batch_hash(&self) -> &[u8] {
        &self.batch_hash
    }

    pub fn payload_ref(&self) -> &PayloadRef {
        &self.payload_ref
    }

    pub fn contexts(&self) -> &[Vec<u8>] {
        &self.contexts
    }
}

/// Assemble a record from host-supplied attribution and caller fields.
///
/// Pure: fields are stored exactly as given. Hashes and contexts are opaque
/// here and are neither normalized nor checked.
pub fn build(
    author: Author,
    timestamp: DateTime<Utc>,
    namespace: impl Into<String>,
    uuids: Vec<u8>,
    batch_hash: Vec<u8>,
    payload_ref: PayloadRef,
    contexts: Vec<Vec<u8>>,
) -> PinRecord {
    PinRecord {
        author,
        timestamp,
        namespace: namespace.into(),
        uuids,
        batch_hash,
        payload_ref,
        contexts,
    }
}
