//! In-memory storage adapter.
//!
//! Backs the engine with `RwLock`-guarded maps. Keys mirror the storage
//! contract's identity: `(txid, vout, topic)` for outputs and
//! `(txid, topic)` for applied-transaction markers, so the uniqueness
//! constraints hold structurally and duplicate inserts degrade to no-ops.

use std::collections::{BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use overlay_primitives::{Outpoint, Txid};

use crate::domain::{AppliedTransaction, Output, StorageError};
use crate::ports::OverlayStorage;

type OutputKey = (Txid, u32, String);

#[derive(Default)]
struct Tables {
    outputs: HashMap<OutputKey, Output>,
    applied: HashSet<(Txid, String)>,
}

/// `OverlayStorage` over process memory.
#[derive(Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored outputs, across topics.
    pub fn output_count(&self) -> usize {
        self.tables.read().outputs.len()
    }

    fn key(outpoint: &Outpoint, topic: &str) -> OutputKey {
        (outpoint.txid, outpoint.vout, topic.to_string())
    }
}

fn spent_matches(output: &Output, spent: Option<bool>) -> bool {
    spent.is_none_or(|wanted| output.spent == wanted)
}

#[async_trait]
impl OverlayStorage for MemoryStorage {
    async fn find_output(
        &self,
        outpoint: &Outpoint,
        topic: Option<&str>,
        spent: Option<bool>,
    ) -> Result<Option<Output>, StorageError> {
        let tables = self.tables.read();
        let found = match topic {
            Some(topic) => tables.outputs.get(&Self::key(outpoint, topic)),
            None => tables
                .outputs
                .values()
                .find(|output| output.outpoint == *outpoint),
        };
        Ok(found
            .filter(|output| spent_matches(output, spent))
            .cloned())
    }

    async fn find_outputs_for_transaction(
        &self,
        txid: &Txid,
    ) -> Result<Vec<Output>, StorageError> {
        let tables = self.tables.read();
        let mut outputs: Vec<Output> = tables
            .outputs
            .values()
            .filter(|output| output.outpoint.txid == *txid)
            .cloned()
            .collect();
        outputs.sort_by(|a, b| {
            (a.outpoint.vout, &a.topic).cmp(&(b.outpoint.vout, &b.topic))
        });
        Ok(outputs)
    }

    async fn insert_output(&self, output: Output) -> Result<(), StorageError> {
        let mut tables = self.tables.write();
        let key = Self::key(&output.outpoint, &output.topic);
        tables.outputs.entry(key).or_insert(output);
        Ok(())
    }

    async fn delete_output(&self, outpoint: &Outpoint, topic: &str) -> Result<(), StorageError> {
        self.tables
            .write()
            .outputs
            .remove(&Self::key(outpoint, topic));
        Ok(())
    }

    async fn mark_utxo_as_spent(
        &self,
        outpoint: &Outpoint,
        topic: &str,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.write();
        let output = tables
            .outputs
            .get_mut(&Self::key(outpoint, topic))
            .ok_or_else(|| StorageError::OutputNotFound {
                outpoint: *outpoint,
                topic: topic.to_string(),
            })?;
        output.spent = true;
        Ok(())
    }

    async fn update_consumed_by(
        &self,
        outpoint: &Outpoint,
        topic: &str,
        consumed_by: &BTreeSet<Outpoint>,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.write();
        let output = tables
            .outputs
            .get_mut(&Self::key(outpoint, topic))
            .ok_or_else(|| StorageError::OutputNotFound {
                outpoint: *outpoint,
                topic: topic.to_string(),
            })?;
        output.consumed_by = consumed_by.clone();
        Ok(())
    }

    async fn update_output_beef(
        &self,
        outpoint: &Outpoint,
        topic: &str,
        beef: &[u8],
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.write();
        let output = tables
            .outputs
            .get_mut(&Self::key(outpoint, topic))
            .ok_or_else(|| StorageError::OutputNotFound {
                outpoint: *outpoint,
                topic: topic.to_string(),
            })?;
        output.beef = beef.to_vec();
        Ok(())
    }

    async fn does_applied_transaction_exist(
        &self,
        applied: &AppliedTransaction,
    ) -> Result<bool, StorageError> {
        Ok(self
            .tables
            .read()
            .applied
            .contains(&(applied.txid, applied.topic.clone())))
    }

    async fn insert_applied_transaction(
        &self,
        applied: &AppliedTransaction,
    ) -> Result<(), StorageError> {
        self.tables
            .write()
            .applied
            .insert((applied.txid, applied.topic.clone()));
        Ok(())
    }
}
