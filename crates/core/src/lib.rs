//! Firefly pin ledger: an append-only, timestamped record of batch pins and
//! network actions.
//!
//! Callers submit a content hash and a pointer to off-chain data; the ledger
//! binds them to the caller's authenticated identity and the commit time so the
//! association can be verified later.
//!
//! ```text
//! host (identity + clock) ──► BatchPin entry operations ──► record::build ──► Ledger::append
//! ```
//!
//! Identity and time arrive through a [`RequestContext`] built by the host
//! boundary ([`HostEnvironment`]); they are never taken from call arguments.

pub mod codec;
pub mod config;
pub mod context;
pub mod contract;
pub mod error;
pub mod event;
pub mod ledger;
#[cfg(feature = "trace")]
pub mod logging;
pub mod record;
pub mod store;

pub use codec::{decode_payload, encode_payload, DecodeError, PinPayload};
pub use config::{LogFormat, PinConfig, RejectedVar};
pub use context::{HostEnvironment, MonotonicTimeSource, RequestContext, SystemTimeSource, TimeSource};
pub use contract::{BatchPin, Invocation, Outcome, NETWORK_VERSION};
pub use error::PinError;
pub use event::BatchPinEvent;
pub use ledger::Ledger;
pub use record::{Author, PayloadRef, PinRecord, BATCH_PIN_NAMESPACE, CONTRACT_INVOKE_PIN_NAMESPACE};
pub use store::LedgerStore;

#[cfg(any(test, feature = "testing"))]
pub use context::MockTimeSource;
