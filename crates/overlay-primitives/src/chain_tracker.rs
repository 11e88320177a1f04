//! SPV oracle seam and envelope verification.

use async_trait::async_trait;
use thiserror::Error;

use crate::errors::BeefError;
use crate::hash::Hash32;
use crate::transaction::Transaction;

/// Failure while querying the chain tracker.
#[derive(Debug, Error)]
#[error("chain tracker query failed: {0}")]
pub struct ChainTrackerError(pub String);

/// Answers whether a Merkle root is the canonical root for a block
/// height. The sole consensus question the engine ever asks.
#[async_trait]
pub trait ChainTracker: Send + Sync {
    async fn is_valid_root_for_height(
        &self,
        root: Hash32,
        height: u32,
    ) -> Result<bool, ChainTrackerError>;
}

impl Transaction {
    /// SPV-verifies this transaction against a chain tracker.
    ///
    /// Every transaction reachable through `source_transaction` links must
    /// either carry a Merkle path whose computed root the tracker accepts
    /// for its height, or embed funding transactions for all of its
    /// inputs. A proven transaction anchors its whole subtree, so the walk
    /// stops there. Script and signature checking is not performed here.
    ///
    /// Returns `Ok(false)` for structurally unprovable envelopes; errors
    /// are reserved for malformed proofs and tracker failures.
    pub async fn verify(&self, tracker: &dyn ChainTracker) -> Result<bool, BeefError> {
        let mut pending: Vec<&Transaction> = vec![self];
        while let Some(tx) = pending.pop() {
            match &tx.merkle_path {
                Some(path) => {
                    let root = path.compute_root(&tx.txid())?;
                    if !tracker
                        .is_valid_root_for_height(root, path.block_height)
                        .await?
                    {
                        return Ok(false);
                    }
                }
                None => {
                    if tx.inputs.is_empty() {
                        // Nothing anchors this transaction to the chain.
                        return Ok(false);
                    }
                    for input in &tx.inputs {
                        match &input.source_transaction {
                            Some(source) => pending.push(source),
                            None => return Ok(false),
                        }
                    }
                }
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256d;
    use crate::merkle_path::{MerklePath, PathLeaf};
    use crate::transaction::{TxInput, TxOutput, Txid};

    /// Accepts or rejects every root, and remembers the heights asked.
    struct FixedTracker {
        accept: bool,
        asked: std::sync::Mutex<Vec<u32>>,
    }

    impl FixedTracker {
        fn new(accept: bool) -> Self {
            Self {
                accept,
                asked: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChainTracker for FixedTracker {
        async fn is_valid_root_for_height(
            &self,
            _root: Hash32,
            height: u32,
        ) -> Result<bool, ChainTrackerError> {
            self.asked.lock().unwrap().push(height);
            Ok(self.accept)
        }
    }

    fn proven(tag: u8) -> Transaction {
        let mut tx = Transaction {
            version: 1,
            inputs: vec![],
            outputs: vec![TxOutput {
                satoshis: 1,
                locking_script: vec![tag],
            }],
            lock_time: 0,
            merkle_path: None,
        };
        tx.merkle_path = Some(MerklePath {
            block_height: 700_000,
            path: vec![vec![
                PathLeaf::txid(0, tx.txid()),
                PathLeaf::node(1, sha256d(&[tag])),
            ]],
        });
        tx
    }

    fn spend(parent: Option<Transaction>, source_txid: Txid) -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![TxInput {
                source_txid,
                source_vout: 0,
                unlocking_script: vec![],
                sequence: 0,
                source_transaction: parent.map(Box::new),
            }],
            outputs: vec![],
            lock_time: 0,
            merkle_path: None,
        }
    }

    #[tokio::test]
    async fn test_proven_ancestry_verifies() {
        let parent = proven(1);
        let child = spend(Some(parent.clone()), parent.txid());
        let tracker = FixedTracker::new(true);
        assert!(child.verify(&tracker).await.unwrap());
        assert_eq!(tracker.asked.lock().unwrap().as_slice(), &[700_000]);
    }

    #[tokio::test]
    async fn test_rejected_root_fails_verification() {
        let parent = proven(1);
        let child = spend(Some(parent.clone()), parent.txid());
        let tracker = FixedTracker::new(false);
        assert!(!child.verify(&tracker).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_source_transaction_fails() {
        let parent = proven(1);
        let child = spend(None, parent.txid());
        let tracker = FixedTracker::new(true);
        assert!(!child.verify(&tracker).await.unwrap());
    }

    #[tokio::test]
    async fn test_unanchored_leaf_fails() {
        let tx = Transaction {
            version: 1,
            inputs: vec![],
            outputs: vec![],
            lock_time: 0,
            merkle_path: None,
        };
        let tracker = FixedTracker::new(true);
        assert!(!tx.verify(&tracker).await.unwrap());
    }

    #[tokio::test]
    async fn test_proof_anchors_subtree_without_descending() {
        // A proven middle transaction shields its (absent) ancestry.
        let middle = {
            let mut tx = spend(None, Txid([9u8; 32]));
            tx.merkle_path = Some(MerklePath {
                block_height: 1,
                path: vec![vec![
                    PathLeaf::txid(0, tx.txid()),
                    PathLeaf::duplicate(1),
                ]],
            });
            tx
        };
        let child = spend(Some(middle.clone()), middle.txid());
        let tracker = FixedTracker::new(true);
        assert!(child.verify(&tracker).await.unwrap());
    }
}
