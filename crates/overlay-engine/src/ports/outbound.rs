//! Outbound ports: the capabilities the engine is composed from.
//!
//! Storage is the only seam with a dedicated error type; the plug-in
//! contracts (managers, lookup services, advertiser, broadcaster, peer
//! transport) return opaque `BoxError`s because the engine either
//! swallows or wraps them wholesale.

use std::collections::BTreeSet;

use async_trait::async_trait;

use overlay_primitives::{Outpoint, Transaction, Txid};

use crate::domain::{
    AdmittanceInstructions, Advertisement, AppliedTransaction, BoxError, LookupQuestion,
    LookupResolution, Output, ShipAdvertisement, SlapAdvertisement, StorageError, TaggedBeef,
};

/// Persistence for outputs, applied-transaction markers and graph edges.
#[async_trait]
pub trait OverlayStorage: Send + Sync {
    /// Finds one output. With `topic` absent, any topic's node matches.
    /// With `spent` supplied, only nodes in that spend state match.
    async fn find_output(
        &self,
        outpoint: &Outpoint,
        topic: Option<&str>,
        spent: Option<bool>,
    ) -> Result<Option<Output>, StorageError>;

    /// All nodes created by `txid`, across topics.
    async fn find_outputs_for_transaction(&self, txid: &Txid)
        -> Result<Vec<Output>, StorageError>;

    async fn insert_output(&self, output: Output) -> Result<(), StorageError>;

    /// Removing an absent node is a no-op.
    async fn delete_output(&self, outpoint: &Outpoint, topic: &str) -> Result<(), StorageError>;

    async fn mark_utxo_as_spent(
        &self,
        outpoint: &Outpoint,
        topic: &str,
    ) -> Result<(), StorageError>;

    /// Replaces a node's descendant set.
    async fn update_consumed_by(
        &self,
        outpoint: &Outpoint,
        topic: &str,
        consumed_by: &BTreeSet<Outpoint>,
    ) -> Result<(), StorageError>;

    /// Rewrites a node's envelope.
    async fn update_output_beef(
        &self,
        outpoint: &Outpoint,
        topic: &str,
        beef: &[u8],
    ) -> Result<(), StorageError>;

    async fn does_applied_transaction_exist(
        &self,
        applied: &AppliedTransaction,
    ) -> Result<bool, StorageError>;

    /// Inserting an existing marker is an idempotent no-op.
    async fn insert_applied_transaction(
        &self,
        applied: &AppliedTransaction,
    ) -> Result<(), StorageError>;
}

/// Per-topic admission policy.
#[async_trait]
pub trait TopicManager: Send + Sync {
    /// From the submitted envelope and the input indices that spent prior
    /// topic members, decide which outputs to admit and which prior coins
    /// to retain.
    async fn identify_admissible_outputs(
        &self,
        beef: &[u8],
        previous_coins: &[u32],
    ) -> Result<AdmittanceInstructions, BoxError>;

    /// Optional human-readable documentation.
    fn documentation(&self) -> Option<String> {
        None
    }
}

/// Indexer hook receiving graph events and answering questions.
///
/// The notification hooks default to no-ops; implementations override
/// only what they index. Hook failures are swallowed per service and
/// must be idempotent under re-delivery.
#[async_trait]
pub trait LookupService: Send + Sync {
    async fn lookup(&self, question: &LookupQuestion) -> Result<LookupResolution, BoxError>;

    async fn output_added(
        &self,
        _outpoint: &Outpoint,
        _locking_script: &[u8],
        _topic: &str,
    ) -> Result<(), BoxError> {
        Ok(())
    }

    async fn output_spent(&self, _outpoint: &Outpoint, _topic: &str) -> Result<(), BoxError> {
        Ok(())
    }

    async fn output_deleted(&self, _outpoint: &Outpoint, _topic: &str) -> Result<(), BoxError> {
        Ok(())
    }

    /// Optional human-readable documentation.
    fn documentation(&self) -> Option<String> {
        None
    }
}

/// Mints, revokes and parses SHIP/SLAP advertisements.
#[async_trait]
pub trait Advertiser: Send + Sync {
    async fn find_all_ship_advertisements(&self) -> Result<Vec<ShipAdvertisement>, BoxError>;

    async fn find_all_slap_advertisements(&self) -> Result<Vec<SlapAdvertisement>, BoxError>;

    /// Mints a SHIP advertisement ready for submission.
    async fn create_ship_advertisement(&self, topic: &str) -> Result<TaggedBeef, BoxError>;

    /// Mints a SLAP advertisement ready for submission.
    async fn create_slap_advertisement(&self, service: &str) -> Result<TaggedBeef, BoxError>;

    /// Mints a revocation of an existing advertisement.
    async fn revoke_advertisement(
        &self,
        advertisement: &Advertisement,
    ) -> Result<TaggedBeef, BoxError>;

    /// Parses an advertisement out of a locking script, `None` when the
    /// script is not one.
    fn parse_advertisement(&self, locking_script: &[u8]) -> Option<Advertisement>;
}

/// Hands admitted transactions to the base network.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast(&self, tx: &Transaction) -> Result<(), BoxError>;
}

/// Delivers a tagged envelope to one peer overlay node.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn submit(&self, domain: &str, beef: &[u8], topics: &[String]) -> Result<(), BoxError>;
}
