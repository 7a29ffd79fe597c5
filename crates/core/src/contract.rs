//! Entry operations: `pinBatchData`, `pinBatch`, `networkAction`, `networkVersion`.
//!
//! Each mutating operation sources the logical fields its own way, hands them
//! to the record builder with the host-supplied context, and appends exactly
//! one record. Every failure happens before the append.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use crate::codec::{self, DEFAULT_MAX_PAYLOAD_BYTES};
use crate::context::RequestContext;
use crate::error::PinError;
use crate::ledger::Ledger;
use crate::record::{self, PayloadRef, BATCH_PIN_NAMESPACE, CONTRACT_INVOKE_PIN_NAMESPACE};

/// Protocol revision reported by `networkVersion`.
pub const NETWORK_VERSION: u32 = 2;

/// One request against the pin ledger, as delivered by a host transport.
///
/// Fields an operation does not take are rejected rather than dropped:
/// `pinBatchData` only carries its encoded payload, so a request still
/// sending standalone `uuids` or `batchHash` fails to parse.
#[serde_as]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "camelCase", deny_unknown_fields)]
pub enum Invocation {
    #[serde(rename_all = "camelCase")]
    PinBatchData {
        #[serde_as(as = "Hex")]
        payload: Vec<u8>,
    },
    #[serde(rename_all = "camelCase")]
    PinBatch {
        #[serde_as(as = "Hex")]
        uuids: Vec<u8>,
        #[serde_as(as = "Hex")]
        batch_hash: Vec<u8>,
        payload_ref: String,
        #[serde_as(as = "Vec<Hex>")]
        contexts: Vec<Vec<u8>>,
    },
    NetworkAction {
        action: String,
        #[serde_as(as = "Vec<Hex>")]
        payload: Vec<Vec<u8>>,
    },
    NetworkVersion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A record was committed at this ledger index.
    Appended(usize),
    Version(u32),
}

/// The pinning contract: owns a handle to its ledger and dispatches requests.
#[derive(Debug, Clone)]
pub struct BatchPin {
    ledger: Arc<Ledger>,
    max_payload_bytes: usize,
}

impl BatchPin {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self {
            ledger,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }

    /// Upper bound on `pinBatchData` payload blobs.
    pub fn with_max_payload_bytes(mut self, limit: usize) -> Self {
        self.max_payload_bytes = limit;
        self
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Decode an encoded `(uuids, batch_hash, payload_ref, contexts)` blob and
    /// pin it under the contract-invoke namespace.
    pub fn pin_batch_data(&self, ctx: &RequestContext, payload: &[u8]) -> Result<usize, PinError> {
        tracing::debug!(author = %ctx.author(), len = payload.len(), "pinBatchData: started");
        let decoded = codec::decode_payload(payload, self.max_payload_bytes).inspect_err(|e| {
            tracing::warn!(author = %ctx.author(), error = %e, "pinBatchData: rejected payload");
        })?;

        let record = record::build(
            ctx.author().clone(),
            ctx.timestamp(),
            CONTRACT_INVOKE_PIN_NAMESPACE,
            decoded.uuids,
            decoded.batch_hash,
            PayloadRef::Location(decoded.payload_ref),
            decoded.contexts,
        );
        tracing::debug!("pinBatchData: record built");
        Ok(self.ledger.append(record))
    }

    pub fn pin_batch(
        &self,
        ctx: &RequestContext,
        uuids: Vec<u8>,
        batch_hash: Vec<u8>,
        payload_ref: String,
        contexts: Vec<Vec<u8>>,
    ) -> Result<usize, PinError> {
        tracing::debug!(author = %ctx.author(), contexts = contexts.len(), "pinBatch: started");
        let record = record::build(
            ctx.author().clone(),
            ctx.timestamp(),
            BATCH_PIN_NAMESPACE,
            uuids,
            batch_hash,
            PayloadRef::Location(payload_ref),
            contexts,
        );
        tracing::debug!("pinBatch: record built");
        Ok(self.ledger.append(record))
    }

    /// Record a caller-tagged network event. The action string is unconstrained.
    pub fn network_action(
        &self,
        ctx: &RequestContext,
        action: String,
        payload: Vec<Vec<u8>>,
    ) -> Result<usize, PinError> {
        tracing::debug!(author = %ctx.author(), %action, "networkAction: started");
        let record = record::build(
            ctx.author().clone(),
            ctx.timestamp(),
            action,
            Vec::new(),
            Vec::new(),
            PayloadRef::Opaque(payload),
            Vec::new(),
        );
        Ok(self.ledger.append(record))
    }

    pub fn network_version(&self) -> u32 {
        NETWORK_VERSION
    }

    pub fn invoke(&self, ctx: &RequestContext, invocation: Invocation) -> Result<Outcome, PinError> {
        match invocation {
            Invocation::PinBatchData { payload } => {
                self.pin_batch_data(ctx, &payload).map(Outcome::Appended)
            }
            Invocation::PinBatch {
                uuids,
                batch_hash,
                payload_ref,
                contexts,
            } => self
                .pin_batch(ctx, uuids, batch_hash, payload_ref, contexts)
                .map(Outcome::Appended),
            Invocation::NetworkAction { action, payload } => self
                .network_action(ctx, action, payload)
                .map(Outcome::Appended),
            Invocation::NetworkVersion => Ok(Outcome::Version(self.network_version())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_payload, PinPayload};
    use crate::record::Author;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn ctx(who: &str, secs: i64) -> RequestContext {
        RequestContext::new(Author::new(who).unwrap(), at(secs))
    }

    fn make_contract() -> BatchPin {
        BatchPin::new(Arc::new(Ledger::new()))
    }

    #[test]
    fn test_pin_batch_field_fidelity() {
        let contract = make_contract();
        let index = contract
            .pin_batch(
                &ctx("alice", 10),
                b"01".to_vec(),
                b"ab".to_vec(),
                "ipfs://x".into(),
                vec![b"c1".to_vec(), b"c2".to_vec()],
            )
            .unwrap();

        let record = contract.ledger().get(index).unwrap();
        assert_eq!(record.namespace(), "firefly:batch_pin");
        assert_eq!(record.uuids(), b"01");
        assert_eq!(record.batch_hash(), b"ab");
        assert_eq!(
            record.payload_ref(),
            &PayloadRef::Location("ipfs://x".into())
        );
        assert_eq!(record.contexts(), &[b"c1".to_vec(), b"c2".to_vec()]);
        assert_eq!(record.author().as_str(), "alice");
        assert_eq!(record.timestamp(), at(10));
    }

    #[test]
    fn test_network_action_generality() {
        let contract = make_contract();
        let index = contract
            .network_action(&ctx("bob", 5), "firefly:custom".into(), vec![b"p1".to_vec()])
            .unwrap();

        let record = contract.ledger().get(index).unwrap();
        assert_eq!(record.namespace(), "firefly:custom");
        assert!(record.uuids().is_empty());
        assert!(record.batch_hash().is_empty());
        assert!(record.contexts().is_empty());
        assert_eq!(
            record.payload_ref(),
            &PayloadRef::Opaque(vec![b"p1".to_vec()])
        );
    }

    #[test]
    fn test_pin_batch_data_uses_decoded_fields() {
        let contract = make_contract();
        let payload = PinPayload {
            uuids: vec![0x11; 32],
            batch_hash: vec![0x22; 32],
            payload_ref: "Qm123".into(),
            contexts: vec![vec![0x33; 32]],
        };
        let blob = encode_payload(&payload).unwrap();

        let index = contract.pin_batch_data(&ctx("carol", 1), &blob).unwrap();
        let record = contract.ledger().get(index).unwrap();
        assert_eq!(record.namespace(), "firefly:contract_invoke_pin");
        assert_eq!(record.uuids(), payload.uuids.as_slice());
        assert_eq!(record.batch_hash(), payload.batch_hash.as_slice());
        assert_eq!(record.payload_ref(), &PayloadRef::Location("Qm123".into()));
        assert_eq!(record.contexts(), payload.contexts.as_slice());
    }

    #[test]
    fn test_malformed_payload_appends_nothing() {
        let contract = make_contract();
        let rx = contract.ledger().subscribe();
        contract
            .pin_batch(&ctx("a", 1), vec![1], vec![2], "r".into(), Vec::new())
            .unwrap();
        rx.try_recv().unwrap();

        let result = contract.pin_batch_data(&ctx("a", 2), &[0xde, 0xad, 0xbe, 0xef]);
        assert!(matches!(result, Err(PinError::Decode(_))));
        assert_eq!(contract.ledger().len(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_payload_limit_applies() {
        let contract = make_contract().with_max_payload_bytes(16);
        let blob = encode_payload(&PinPayload::default()).unwrap();
        let result = contract.pin_batch_data(&ctx("a", 1), &blob);
        assert!(matches!(result, Err(PinError::Decode(_))));
        assert!(contract.ledger().is_empty());
    }

    #[test]
    fn test_resubmission_creates_distinct_record() {
        let contract = make_contract();
        let first = contract
            .pin_batch(&ctx("a", 1), vec![1], vec![2], "r".into(), Vec::new())
            .unwrap();
        let second = contract
            .pin_batch(&ctx("a", 2), vec![1], vec![2], "r".into(), Vec::new())
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(contract.ledger().get(second).unwrap().timestamp(), at(2));
    }

    #[test]
    fn test_invoke_dispatch() {
        let contract = make_contract();
        let c = ctx("a", 1);

        assert_eq!(
            contract.invoke(&c, Invocation::NetworkVersion).unwrap(),
            Outcome::Version(2)
        );
        assert!(contract.ledger().is_empty());

        let outcome = contract
            .invoke(
                &c,
                Invocation::NetworkAction {
                    action: "firefly:publish".into(),
                    payload: Vec::new(),
                },
            )
            .unwrap();
        assert_eq!(outcome, Outcome::Appended(0));
    }

    #[test]
    fn test_invocation_json() {
        let json = serde_json::json!({
            "op": "pinBatch",
            "uuids": "01",
            "batchHash": "ab",
            "payloadRef": "ipfs://x",
            "contexts": ["c1"]
        });
        let invocation: Invocation = serde_json::from_value(json).unwrap();
        assert_eq!(
            invocation,
            Invocation::PinBatch {
                uuids: vec![0x01],
                batch_hash: vec![0xab],
                payload_ref: "ipfs://x".into(),
                contexts: vec![vec![0xc1]],
            }
        );

        let version: Invocation =
            serde_json::from_value(serde_json::json!({ "op": "networkVersion" })).unwrap();
        assert_eq!(version, Invocation::NetworkVersion);
    }

    #[test]
    fn test_pin_batch_data_rejects_standalone_fields() {
        let json = serde_json::json!({
            "op": "pinBatchData",
            "uuids": "deadbeef",
            "batchHash": "cafe",
            "payload": "00"
        });
        assert!(serde_json::from_value::<Invocation>(json).is_err());

        let json = serde_json::json!({ "op": "pinBatchData", "payload": "00" });
        assert_eq!(
            serde_json::from_value::<Invocation>(json).unwrap(),
            Invocation::PinBatchData { payload: vec![0x00] }
        );
    }

    #[test]
    fn test_network_action_rejects_batch_fields() {
        let json = serde_json::json!({
            "op": "networkAction",
            "action": "firefly:custom",
            "payload": [],
            "contexts": ["c1"]
        });
        assert!(serde_json::from_value::<Invocation>(json).is_err());
    }
}
