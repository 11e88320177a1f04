//! Core entities of the overlay UTXO graph.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use overlay_primitives::Outpoint;
use overlay_primitives::Txid;

/// Reserved topic hosting SHIP advertisements.
pub const TOPIC_SHIP: &str = "tm_ship";
/// Reserved topic hosting SLAP advertisements.
pub const TOPIC_SLAP: &str = "tm_slap";
/// Reserved lookup service resolving SHIP advertisements.
pub const SERVICE_SHIP: &str = "ls_ship";
/// Reserved lookup service resolving SLAP advertisements.
pub const SERVICE_SLAP: &str = "ls_slap";

/// Returned by the documentation getters when a hook is absent.
pub const NO_DOCUMENTATION: &str = "No documentation found!";

/// A topic-scoped UTXO: one node of the graph.
///
/// The same `(txid, vout)` may exist under several topics as independent
/// nodes; `(outpoint, topic)` is the identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub outpoint: Outpoint,
    /// Partitioning key.
    pub topic: String,
    pub locking_script: Vec<u8>,
    pub satoshis: u64,
    /// BEEF envelope proving the creating transaction. Grows during
    /// history rehydration and is rewritten when new proofs arrive.
    pub beef: Vec<u8>,
    /// Whether a later transaction consumed this output within the topic.
    pub spent: bool,
    /// Prior topic members the creating transaction consumed, ancestor
    /// edge set. Ordered as admitted.
    pub outputs_consumed: Vec<Outpoint>,
    /// Descendants whose creating transaction spent this output.
    pub consumed_by: BTreeSet<Outpoint>,
}

impl Output {
    /// A freshly admitted, unspent member with the given ancestry.
    pub fn admitted(
        outpoint: Outpoint,
        topic: impl Into<String>,
        locking_script: Vec<u8>,
        satoshis: u64,
        beef: Vec<u8>,
        outputs_consumed: Vec<Outpoint>,
    ) -> Self {
        Self {
            outpoint,
            topic: topic.into(),
            locking_script,
            satoshis,
            beef,
            spent: false,
            outputs_consumed,
            consumed_by: BTreeSet::new(),
        }
    }
}

/// Marker recording that a transaction has been processed under a topic.
/// Its presence suppresses re-processing on re-submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppliedTransaction {
    pub txid: Txid,
    pub topic: String,
}

impl AppliedTransaction {
    pub fn new(txid: Txid, topic: impl Into<String>) -> Self {
        Self {
            txid,
            topic: topic.into(),
        }
    }
}

/// Submission unit: a BEEF envelope tagged with topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedBeef {
    pub beef: Vec<u8>,
    pub topics: Vec<String>,
}

/// A topic manager's verdict for one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmittanceInstructions {
    /// Output indices of the submitted transaction to admit as members.
    pub outputs_to_admit: Vec<u32>,
    /// Input indices whose previous coins stay in the graph as ancestors.
    pub coins_to_retain: Vec<u32>,
}

/// Submitted Transaction Execution AcKnowledgment: the per-topic record
/// returned to the submitter.
pub type Steak = BTreeMap<String, AdmittanceInstructions>;

/// Assertion that `domain` hosts `topic`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipAdvertisement {
    pub domain: String,
    pub topic: String,
}

/// Assertion that `domain` hosts a lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlapAdvertisement {
    pub domain: String,
    pub service: String,
}

/// Either advertisement kind, as parsed from a locking script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "protocol")]
pub enum Advertisement {
    #[serde(rename = "SHIP")]
    Ship(ShipAdvertisement),
    #[serde(rename = "SLAP")]
    Slap(SlapAdvertisement),
}
