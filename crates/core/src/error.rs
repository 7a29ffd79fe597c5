use thiserror::Error;

use crate::codec::DecodeError;
use crate::config::ConfigError;
use crate::store::StoreError;

/// Errors surfaced by the pin ledger and its host boundary.
///
/// Any error returned from an entry operation means nothing was appended.
#[derive(Debug, Error)]
pub enum PinError {
    #[error("payload decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("caller identity must not be empty")]
    EmptyAuthor,
    /// The host could not supply an authenticated caller identity.
    #[error("no caller identity available for this invocation")]
    MissingIdentity,
    #[error("ledger store: {0}")]
    Store(#[from] StoreError),
    #[error("config: {0}")]
    Config(#[from] ConfigError),
}
