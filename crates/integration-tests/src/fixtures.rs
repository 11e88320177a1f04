//! Shared fixtures: deterministic transaction builders and minimal
//! plug-in stubs wired around the in-memory storage adapter.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use overlay_engine::adapters::MemoryStorage;
use overlay_engine::{
    AdmittanceInstructions, BoxError, LookupAnswer, LookupQuestion, LookupResolution,
    LookupService, TaggedBeef, TopicManager,
};
use overlay_primitives::{
    ChainTracker, ChainTrackerError, Hash32, MerklePath, Outpoint, PathLeaf, Transaction,
    TxInput, TxOutput, Txid,
};

/// A proof-carrying root transaction with one output per script byte.
pub fn proven_tx(tag: u8, output_scripts: &[u8]) -> Transaction {
    let mut tx = Transaction {
        version: 1,
        inputs: vec![],
        outputs: output_scripts
            .iter()
            .map(|script| TxOutput {
                satoshis: 10_000,
                locking_script: vec![*script],
            })
            .collect(),
        lock_time: u32::from(tag),
        merkle_path: None,
    };
    tx.merkle_path = Some(proof_at(800_000 + u32::from(tag), &tx));
    tx
}

/// A one-pair proof binding `tx` at `block_height`.
pub fn proof_at(block_height: u32, tx: &Transaction) -> MerklePath {
    MerklePath {
        block_height,
        path: vec![vec![
            PathLeaf::txid(0, tx.txid()),
            PathLeaf::duplicate(1),
        ]],
    }
}

/// A spend of `(parent, vout)` pairs with the parents embedded, so the
/// envelope proves the spend through its ancestry.
pub fn spend_embedding(parents: &[(&Transaction, u32)], output_scripts: &[u8]) -> Transaction {
    let mut tx = spend_referencing(parents, output_scripts);
    for (input, (parent, _)) in tx.inputs.iter_mut().zip(parents) {
        input.source_transaction = Some(Box::new((*parent).clone()));
    }
    tx
}

/// A spend that only references its parents by outpoint. Unprovable on
/// its own; give it a proof with [`with_proof`] before submitting.
pub fn spend_referencing(parents: &[(&Transaction, u32)], output_scripts: &[u8]) -> Transaction {
    Transaction {
        version: 1,
        inputs: parents
            .iter()
            .map(|(parent, vout)| TxInput {
                source_txid: parent.txid(),
                source_vout: *vout,
                unlocking_script: vec![],
                sequence: 0xFFFF_FFFF,
                source_transaction: None,
            })
            .collect(),
        outputs: output_scripts
            .iter()
            .map(|script| TxOutput {
                satoshis: 9_000,
                locking_script: vec![*script],
            })
            .collect(),
        lock_time: 0,
        merkle_path: None,
    }
}

/// Attaches a fresh proof at `block_height` to the transaction.
pub fn with_proof(mut tx: Transaction, block_height: u32) -> Transaction {
    let proof = proof_at(block_height, &tx);
    tx.merkle_path = Some(proof);
    tx
}

/// Wraps a transaction for submission under the given topics.
pub fn tagged(tx: &Transaction, topics: &[&str]) -> TaggedBeef {
    TaggedBeef {
        beef: tx.to_beef().expect("fixture envelopes always encode"),
        topics: topics.iter().map(|topic| topic.to_string()).collect(),
    }
}

pub fn admit(outputs: &[u32], retain: &[u32]) -> AdmittanceInstructions {
    AdmittanceInstructions {
        outputs_to_admit: outputs.to_vec(),
        coins_to_retain: retain.to_vec(),
    }
}

/// Accepts every Merkle root.
pub struct AcceptAllTracker;

#[async_trait]
impl ChainTracker for AcceptAllTracker {
    async fn is_valid_root_for_height(
        &self,
        _root: Hash32,
        _height: u32,
    ) -> Result<bool, ChainTrackerError> {
        Ok(true)
    }
}

/// Replays a queue of admittance verdicts, then admits nothing.
pub struct QueueManager {
    steps: Mutex<VecDeque<AdmittanceInstructions>>,
}

impl QueueManager {
    pub fn new(steps: Vec<AdmittanceInstructions>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
        })
    }
}

#[async_trait]
impl TopicManager for QueueManager {
    async fn identify_admissible_outputs(
        &self,
        _beef: &[u8],
        _previous_coins: &[u32],
    ) -> Result<AdmittanceInstructions, BoxError> {
        Ok(self.steps.lock().pop_front().unwrap_or_default())
    }
}

/// Records graph notifications in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphEvent {
    Added(Outpoint, String),
    Spent(Outpoint, String),
    Deleted(Outpoint, String),
}

#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<GraphEvent>>,
    resolution: Mutex<Option<LookupResolution>>,
}

impl EventLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_resolution(resolution: LookupResolution) -> Arc<Self> {
        let log = Self::default();
        *log.resolution.lock() = Some(resolution);
        Arc::new(log)
    }

    pub fn set_resolution(&self, resolution: LookupResolution) {
        *self.resolution.lock() = Some(resolution);
    }

    pub fn drain(&self) -> Vec<GraphEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

#[async_trait]
impl LookupService for EventLog {
    async fn lookup(&self, _question: &LookupQuestion) -> Result<LookupResolution, BoxError> {
        Ok(self.resolution.lock().clone().unwrap_or(
            LookupResolution::Answer(LookupAnswer::Freeform { data: json!(null) }),
        ))
    }

    async fn output_added(
        &self,
        outpoint: &Outpoint,
        _locking_script: &[u8],
        topic: &str,
    ) -> Result<(), BoxError> {
        self.events
            .lock()
            .push(GraphEvent::Added(*outpoint, topic.to_string()));
        Ok(())
    }

    async fn output_spent(&self, outpoint: &Outpoint, topic: &str) -> Result<(), BoxError> {
        self.events
            .lock()
            .push(GraphEvent::Spent(*outpoint, topic.to_string()));
        Ok(())
    }

    async fn output_deleted(&self, outpoint: &Outpoint, topic: &str) -> Result<(), BoxError> {
        self.events
            .lock()
            .push(GraphEvent::Deleted(*outpoint, topic.to_string()));
        Ok(())
    }
}

/// Short-hand for the `(txid, vout)` of a transaction's output.
pub fn outpoint_of(tx: &Transaction, vout: u32) -> Outpoint {
    Outpoint::new(tx.txid(), vout)
}

/// Convenience for pulling an output out of storage in assertions.
pub async fn stored_output(
    storage: &MemoryStorage,
    txid: Txid,
    vout: u32,
    topic: &str,
) -> Option<overlay_engine::Output> {
    use overlay_engine::OverlayStorage;
    storage
        .find_output(&Outpoint::new(txid, vout), Some(topic), None)
        .await
        .expect("memory storage reads cannot fail")
}
