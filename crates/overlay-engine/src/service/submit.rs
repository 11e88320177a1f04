//! The admission pipeline.
//!
//! `submit` runs: preflight (topic registration, envelope decode, SPV)
//! then per-topic processing, then the acknowledgment callback, then
//! broadcast and peer gossip. Topics are processed independently; there
//! is no cross-topic rollback.
//!
//! Within one topic the notification order is fixed: `output_spent` for
//! discovered previous coins, `output_added` for admissions, then
//! `output_deleted` for pruned stale ancestors.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use overlay_primitives::{Beef, Outpoint, Transaction, Txid};

use crate::domain::{
    AdmittanceInstructions, AppliedTransaction, EngineError, Output, Steak, TaggedBeef,
};
use crate::ports::SteakCallback;

use super::core::OverlayEngine;

impl OverlayEngine {
    pub(crate) async fn submit_inner(
        &self,
        tagged: TaggedBeef,
        on_steak_ready: Option<SteakCallback>,
    ) -> Result<Steak, EngineError> {
        for topic in &tagged.topics {
            if !self.managers.contains_key(topic) {
                return Err(EngineError::UnknownTopic(topic.clone()));
            }
        }

        let tx = Beef::from_binary(&tagged.beef)?.subject()?;
        let txid = tx.txid();
        if !tx.verify(self.chain_tracker.as_ref()).await? {
            return Err(EngineError::SpvInvalid);
        }
        debug!(%txid, topics = tagged.topics.len(), "submission passed SPV");

        let mut steak = Steak::new();
        for topic in &tagged.topics {
            let entry = self.apply_to_topic(&tagged, &tx, txid, topic).await?;
            steak.insert(topic.clone(), entry);
        }

        // Acknowledgment fast-path: the submitter gets the STEAK before
        // broadcast and gossip work begins.
        if let Some(callback) = on_steak_ready {
            callback(&steak);
        }

        let admitted_any = steak
            .values()
            .any(|entry| !entry.outputs_to_admit.is_empty());
        if admitted_any {
            if let Some(broadcaster) = &self.broadcaster {
                if let Err(err) = broadcaster.broadcast(&tx).await {
                    warn!(%txid, "broadcast failed: {err}");
                }
            }
        }

        self.propagate_to_peers(&tagged, &steak).await;

        Ok(steak)
    }

    /// One topic's pass over the transaction.
    async fn apply_to_topic(
        &self,
        tagged: &TaggedBeef,
        tx: &Transaction,
        txid: Txid,
        topic: &str,
    ) -> Result<AdmittanceInstructions, EngineError> {
        let applied = AppliedTransaction::new(txid, topic);
        if self.storage.does_applied_transaction_exist(&applied).await? {
            // Already processed: no mutation, no notifications, and no
            // echo of the historical admissions.
            debug!(%txid, topic, "duplicate submission suppressed");
            return Ok(AdmittanceInstructions::default());
        }

        // Previous-coin discovery: inputs that spend current topic
        // members flip those members to spent, whatever the manager later
        // decides.
        let mut previous_coins: Vec<u32> = Vec::new();
        let mut previous_outputs: Vec<(u32, Output)> = Vec::new();
        for (index, input) in tx.inputs.iter().enumerate() {
            let source = input.source_outpoint();
            if let Some(prev) = self.storage.find_output(&source, Some(topic), None).await? {
                let index = index as u32;
                previous_coins.push(index);
                self.storage.mark_utxo_as_spent(&source, topic).await?;
                self.notify_output_spent(&source, topic).await;
                previous_outputs.push((index, prev));
            }
        }

        let manager = &self.managers[topic];
        let instructions = match manager
            .identify_admissible_outputs(&tagged.beef, &previous_coins)
            .await
        {
            Ok(instructions) => instructions,
            Err(err) => {
                // The manager only poisons its own topic; the spends
                // recorded above stand.
                warn!(%txid, topic, "topic manager failed: {err}");
                return Ok(AdmittanceInstructions::default());
            }
        };

        // Partition previous coins into retained ancestors and stale
        // coins to prune.
        let mut retained: Vec<Outpoint> = Vec::new();
        let mut stale: Vec<Output> = Vec::new();
        for (index, mut prev) in previous_outputs {
            if instructions.coins_to_retain.contains(&index) {
                retained.push(prev.outpoint);
            } else {
                prev.spent = true;
                stale.push(prev);
            }
        }

        // Admit.
        let mut admitted: BTreeSet<Outpoint> = BTreeSet::new();
        for vout in &instructions.outputs_to_admit {
            let Some(out) = tx.outputs.get(*vout as usize) else {
                warn!(%txid, topic, vout, "manager admitted a nonexistent output index");
                continue;
            };
            let outpoint = Outpoint::new(txid, *vout);
            self.storage
                .insert_output(Output::admitted(
                    outpoint,
                    topic,
                    out.locking_script.clone(),
                    out.satoshis,
                    tagged.beef.clone(),
                    retained.clone(),
                ))
                .await?;
            self.notify_output_added(&outpoint, &out.locking_script, topic)
                .await;
            admitted.insert(outpoint);
        }

        // Link each retained ancestor to its new descendants.
        for ancestor in &retained {
            if let Some(prev) = self.storage.find_output(ancestor, Some(topic), None).await? {
                let mut consumed_by = prev.consumed_by;
                consumed_by.extend(admitted.iter().copied());
                self.storage
                    .update_consumed_by(ancestor, topic, &consumed_by)
                    .await?;
            }
        }

        // Prune stale coins and their newly unreferenced ancestors.
        for coin in &stale {
            self.delete_utxo_deep(coin)
                .await
                .map_err(|err| EngineError::StalePrune(Box::new(err)))?;
        }

        self.storage.insert_applied_transaction(&applied).await?;
        Ok(instructions)
    }
}
