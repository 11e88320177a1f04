//! Error types for the primitive codecs.

use thiserror::Error;

use crate::chain_tracker::ChainTrackerError;

/// Errors raised while encoding or decoding transactions, proofs and
/// BEEF envelopes.
#[derive(Debug, Error)]
pub enum BeefError {
    #[error("input truncated: needed {needed} more byte(s) at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("bad BEEF magic: {0:#010x}")]
    BadMagic(u32),

    #[error("non-canonical or oversized varint at offset {0}")]
    BadVarint(usize),

    #[error("transaction references BUMP index {index} but only {count} present")]
    UnknownBumpIndex { index: usize, count: usize },

    #[error("envelope contains no transactions")]
    EmptyEnvelope,

    #[error("trailing {0} byte(s) after envelope")]
    TrailingBytes(usize),

    #[error("txid {0} not present among the proof's leaves")]
    TxidNotInProof(String),

    #[error("proof level {level} is missing the sibling at offset {offset}")]
    MissingSibling { level: usize, offset: u64 },

    #[error("proof leaf at level {level}, offset {offset} carries no hash")]
    LeafWithoutHash { level: usize, offset: u64 },

    #[error("invalid txid hex: {0}")]
    BadTxidHex(String),

    #[error(transparent)]
    ChainTracker(#[from] ChainTrackerError),
}
