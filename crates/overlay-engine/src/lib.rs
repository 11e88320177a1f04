//! # Overlay Services Engine
//!
//! Accepts transactions tagged with one or more *topics*, verifies them
//! by SPV against a chain tracker, lets per-topic managers decide which
//! outputs become topic members, maintains the topic-scoped UTXO graph,
//! notifies lookup services, and gossips admitted transactions to peer
//! overlay nodes discovered through SHIP advertisements.
//!
//! ## Architecture
//!
//! Hexagonal layering:
//!
//! - **Domain** (`domain/`): entities (`Output`, `Steak`, advertisements,
//!   lookup types) and errors. No I/O.
//! - **Ports** (`ports/`): trait seams. Inbound: `OverlayApi`, the engine
//!   surface. Outbound: `OverlayStorage`, `TopicManager`, `LookupService`,
//!   `Advertiser`, `Broadcaster`, `PeerTransport`.
//! - **Service** (`service/`): `OverlayEngine`, the orchestrator behind
//!   `OverlayApi`.
//! - **Adapters** (`adapters/`): in-memory storage and a reqwest-backed
//!   peer transport.
//!
//! ## Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Consumption symmetry: a retained ancestor's `consumed_by` names every admitted output that consumed it | `service/submit.rs` linkage step |
//! | `consumed_by` is a set | `BTreeSet<Outpoint>` in `domain/entities.rs` |
//! | Applied `(txid, topic)` pairs are never re-processed | dedup gate in `service/submit.rs` |
//! | An output exists only if its transaction verified by SPV at admission | preflight in `service/submit.rs` |
//! | Deep deletion only removes nodes no descendant depends on | guard in `service/graph.rs` |
//!
//! ## Topic isolation
//!
//! One topic's manager must never poison another topic's processing, and
//! one lookup service's notification hook must never abort an admission.
//! Those failure classes are logged and swallowed; SPV and schema faults
//! abort the whole submission.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use domain::*;
pub use ports::*;
pub use service::{EngineConfig, OverlayEngine, OverlayEngineBuilder};

pub use overlay_primitives::{
    Beef, BeefError, ChainTracker, ChainTrackerError, MerklePath, Outpoint, Transaction, Txid,
};
