//! # Overlay Primitives
//!
//! Bitcoin-family transaction primitives shared by the overlay services
//! engine: the raw transaction wire codec, BUMP Merkle inclusion proofs,
//! and the BEEF envelope format that carries a transaction together with
//! enough ancestry to verify it by SPV alone.
//!
//! ## Layout
//!
//! - `hash`: double-SHA256 and the 32-byte digest alias.
//! - `wire`: varint-aware byte reader/writer used by every codec here.
//! - `transaction`: `Transaction`, `TxInput`, `TxOutput`, `Txid`, `Outpoint`.
//! - `merkle_path`: BUMP proofs and root computation.
//! - `beef`: the envelope codec plus ancestry linking (`Beef::subject`,
//!   `Transaction::to_beef`).
//! - `chain_tracker`: the async SPV oracle seam and `Transaction::verify`.
//!
//! ## Invariants
//!
//! - A decoded envelope lists parents before children; the subject
//!   transaction is always last.
//! - `Transaction::to_beef` deduplicates ancestors by txid and shares
//!   identical proofs by index, so re-encoding an enlarged ancestry never
//!   duplicates envelope entries.
//! - `Transaction::verify` accepts a transaction iff every reachable
//!   ancestor either carries a proof whose root the chain tracker accepts
//!   for its height, or embeds source transactions for all of its inputs.

pub mod beef;
pub mod chain_tracker;
pub mod errors;
pub mod hash;
pub mod merkle_path;
pub mod transaction;
pub mod wire;

pub use beef::{Beef, BeefTx, BEEF_VERSION};
pub use chain_tracker::{ChainTracker, ChainTrackerError};
pub use errors::BeefError;
pub use hash::{sha256d, Hash32};
pub use merkle_path::{MerklePath, PathLeaf};
pub use transaction::{Outpoint, Transaction, TxInput, TxOutput, Txid};
