//! UTXO graph operations: deep stale pruning, history rehydration and
//! Merkle-proof back-fill.
//!
//! The ancestor relation is a DAG (transactions reference earlier ones),
//! so the recursions terminate: pruning either deletes a node or strictly
//! shrinks an ancestor's descendant set, rehydration and back-fill follow
//! acyclic edges.

use futures::future::BoxFuture;
use tracing::{debug, warn};

use overlay_primitives::{Beef, MerklePath, Outpoint, Transaction, Txid};

use crate::domain::{BoxError, EngineError, HistorySelector, Output, StorageError};

use super::core::OverlayEngine;

impl OverlayEngine {
    /// Recursively removes a stale output and every ancestor left
    /// unreferenced by the removal.
    ///
    /// A node still named in some descendant's ancestry (`consumed_by`
    /// non-empty) is pinned: it is neither deleted nor unlinked from its
    /// own ancestors. Recursion is fully awaited, so when this returns
    /// the prune is complete.
    pub(crate) fn delete_utxo_deep<'a>(
        &'a self,
        output: &'a Output,
    ) -> BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(async move {
            if !output.consumed_by.is_empty() {
                return Ok(());
            }

            self.storage
                .delete_output(&output.outpoint, &output.topic)
                .await?;
            self.notify_output_deleted(&output.outpoint, &output.topic)
                .await;

            for ancestor_id in &output.outputs_consumed {
                let found = self
                    .storage
                    .find_output(ancestor_id, Some(&output.topic), None)
                    .await?;
                let Some(mut ancestor) = found else {
                    continue;
                };
                // Strict match on the full (txid, vout) pair.
                if ancestor.consumed_by.remove(&output.outpoint) {
                    self.storage
                        .update_consumed_by(ancestor_id, &ancestor.topic, &ancestor.consumed_by)
                        .await?;
                }
                if ancestor.consumed_by.is_empty() {
                    self.delete_utxo_deep(&ancestor).await?;
                }
            }
            Ok(())
        })
    }

    /// Returns a copy of `output` whose envelope embeds ancestor
    /// transactions down to the depth the selector permits.
    ///
    /// Ancestors are looked up across all topics; a missing ancestor
    /// simply leaves that branch unembedded.
    pub(crate) fn get_utxo_history<'a>(
        &'a self,
        output: Output,
        selector: &'a HistorySelector,
        depth: u32,
    ) -> BoxFuture<'a, Result<Output, EngineError>> {
        Box::pin(async move {
            if !selector.descend(&output.beef, output.outpoint.vout, depth)
                || output.outputs_consumed.is_empty()
            {
                return Ok(output);
            }

            let mut children: Vec<Output> = Vec::new();
            for ancestor_id in &output.outputs_consumed {
                let found = self
                    .storage
                    .find_output(ancestor_id, None, None)
                    .await
                    .map_err(rehydration_failure)?;
                let Some(child) = found else {
                    continue;
                };
                children.push(self.get_utxo_history(child, selector, depth + 1).await?);
            }

            let mut tx = decode_subject(&output.beef).map_err(rehydration_failure)?;
            for child in &children {
                let child_tx = decode_subject(&child.beef).map_err(rehydration_failure)?;
                if let Some(input) = tx
                    .inputs
                    .iter_mut()
                    .find(|input| input.source_outpoint() == child.outpoint)
                {
                    input.source_transaction = Some(Box::new(child_tx));
                }
            }
            let beef = tx.to_beef().map_err(rehydration_failure)?;
            Ok(Output { beef, ..output })
        })
    }

    /// Embeds `proof` into every stored output whose envelope transitively
    /// contains `txid`.
    pub(crate) async fn handle_new_merkle_proof_inner(
        &self,
        txid: &Txid,
        proof: &MerklePath,
    ) -> Result<(), EngineError> {
        let outputs = self.storage.find_outputs_for_transaction(txid).await?;
        if outputs.is_empty() {
            return Err(EngineError::NoMatchingOutputs(*txid));
        }
        for output in &outputs {
            self.update_merkle_proof(output, proof, Vec::new()).await?;
        }
        Ok(())
    }

    /// Walks one output and its descendants, stamping the proof into each
    /// envelope at the position the recursion path points at.
    ///
    /// `recursion_path` is the trail of outpoint crumbs from the proven
    /// output down to the current one; it is extended, never reset, when
    /// descending into `consumed_by`. At the proven output itself the
    /// proof lands on the envelope's subject transaction; further down it
    /// lands on the embedded ancestor the crumbs lead to.
    pub(crate) fn update_merkle_proof<'a>(
        &'a self,
        output: &'a Output,
        proof: &'a MerklePath,
        recursion_path: Vec<Outpoint>,
    ) -> BoxFuture<'a, Result<(), EngineError>> {
        Box::pin(async move {
            let mut path = recursion_path;
            path.push(output.outpoint);

            let mut tx = decode_subject(&output.beef)?;
            let stamped = if output.outpoint.txid == path[0].txid {
                tx.merkle_path = Some(proof.clone());
                true
            } else {
                match path.len().checked_sub(2) {
                    Some(hop) => stamp_embedded_proof(&mut tx, &path, hop, proof),
                    None => false,
                }
            };

            if stamped {
                let beef = tx.to_beef()?;
                self.storage
                    .update_output_beef(&output.outpoint, &output.topic, &beef)
                    .await?;
            } else {
                // This envelope does not embed the proven ancestry that
                // deep; descendants carry their own copies, so keep going.
                debug!(output = %output.outpoint, "proof walk found no embedding here");
            }

            for consumer in &output.consumed_by {
                let descendants = self
                    .storage
                    .find_outputs_for_transaction(&consumer.txid)
                    .await?;
                for descendant in &descendants {
                    if let Err(err) = self
                        .update_merkle_proof(descendant, proof, path.clone())
                        .await
                    {
                        // One descendant's malformed envelope must not
                        // block the others.
                        warn!(descendant = %descendant.outpoint, "proof back-fill failed: {err}");
                    }
                }
            }
            Ok(())
        })
    }
}

/// Follows the crumb trail from the current transaction down to hop 0 and
/// sets the proof on that hop's embedded source transaction. Returns
/// whether the stamp landed.
fn stamp_embedded_proof(
    tx: &mut Transaction,
    path: &[Outpoint],
    hop: usize,
    proof: &MerklePath,
) -> bool {
    let crumb = path[hop];
    let Some(input) = tx
        .inputs
        .iter_mut()
        .find(|input| input.source_outpoint() == crumb)
    else {
        return false;
    };
    let Some(source) = input.source_transaction.as_deref_mut() else {
        return false;
    };
    if hop == 0 {
        source.merkle_path = Some(proof.clone());
        true
    } else {
        stamp_embedded_proof(source, path, hop - 1, proof)
    }
}

fn decode_subject(beef: &[u8]) -> Result<Transaction, overlay_primitives::BeefError> {
    Beef::from_binary(beef)?.subject()
}

fn rehydration_failure<E: Into<BoxError>>(err: E) -> EngineError {
    EngineError::HistoryRehydration(err.into())
}
