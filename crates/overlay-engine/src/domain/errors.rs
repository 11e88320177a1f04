//! Engine and storage error taxonomy.
//!
//! Two classes exist. Surfaced errors (`EngineError`) abort the calling
//! operation: unknown topics, SPV failures, schema faults. Swallowed
//! classes, topic manager failures and lookup notification failures and
//! gossip faults, are logged where they occur and never cross the engine
//! boundary.

use thiserror::Error;

use overlay_primitives::{BeefError, Outpoint, Txid};

/// Opaque error type plug-in implementations are free to return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures inside a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no output {outpoint} under topic {topic}")]
    OutputNotFound { outpoint: Outpoint, topic: String },

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    #[error("transaction failed SPV verification")]
    SpvInvalid,

    #[error("unknown lookup service: {0}")]
    UnknownService(String),

    #[error("no outputs found for transaction {0}")]
    NoMatchingOutputs(Txid),

    #[error("lookup service failure")]
    LookupService(#[source] BoxError),

    #[error("advertiser failure")]
    Advertiser(#[source] BoxError),

    #[error("history rehydration failed")]
    HistoryRehydration(#[source] BoxError),

    #[error("stale output pruning failed")]
    StalePrune(#[source] BoxError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Beef(#[from] BeefError),
}
