//! BEEF envelope codec.
//!
//! An envelope bundles a subject transaction with the ancestor
//! transactions and Merkle proofs needed to verify it offline. On the
//! wire: a magic version, a table of proofs, then the transactions in
//! topological order (parents first, subject last), each optionally
//! pointing at a proof by index.

use std::collections::BTreeMap;

use crate::errors::BeefError;
use crate::merkle_path::MerklePath;
use crate::transaction::{Transaction, Txid};
use crate::wire::{Reader, Writer};

/// Envelope magic, `01 00 BE EF` on the wire.
pub const BEEF_VERSION: u32 = 4_022_206_465;

/// One envelope entry: a raw transaction and its optional proof index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeefTx {
    pub tx: Transaction,
    pub bump_index: Option<usize>,
}

/// A decoded envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Beef {
    pub bumps: Vec<MerklePath>,
    /// Topological order, subject last.
    pub txs: Vec<BeefTx>,
}

impl Beef {
    /// Decodes an envelope, rejecting trailing bytes and out-of-range
    /// proof references.
    pub fn from_binary(bytes: &[u8]) -> Result<Self, BeefError> {
        let mut r = Reader::new(bytes);
        let magic = r.read_u32()?;
        if magic != BEEF_VERSION {
            return Err(BeefError::BadMagic(magic));
        }
        let bump_count = r.read_count()?;
        let mut bumps = Vec::with_capacity(bump_count);
        for _ in 0..bump_count {
            bumps.push(MerklePath::read(&mut r)?);
        }
        let tx_count = r.read_count()?;
        if tx_count == 0 {
            return Err(BeefError::EmptyEnvelope);
        }
        let mut txs = Vec::with_capacity(tx_count);
        for _ in 0..tx_count {
            let tx = Transaction::from_wire(&mut r)?;
            let has_bump = r.read_u8()? != 0;
            let bump_index = if has_bump {
                let index = r.read_varint()? as usize;
                if index >= bumps.len() {
                    return Err(BeefError::UnknownBumpIndex {
                        index,
                        count: bumps.len(),
                    });
                }
                Some(index)
            } else {
                None
            };
            txs.push(BeefTx { tx, bump_index });
        }
        if r.remaining() != 0 {
            return Err(BeefError::TrailingBytes(r.remaining()));
        }
        Ok(Self { bumps, txs })
    }

    /// Serializes the envelope.
    pub fn to_binary(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_u32(BEEF_VERSION);
        w.write_varint(self.bumps.len() as u64);
        for bump in &self.bumps {
            bump.write(&mut w);
        }
        w.write_varint(self.txs.len() as u64);
        for entry in &self.txs {
            w.write_bytes(&entry.tx.to_wire());
            match entry.bump_index {
                Some(index) => {
                    w.write_u8(1);
                    w.write_varint(index as u64);
                }
                None => w.write_u8(0),
            }
        }
        w.into_bytes()
    }

    /// The subject transaction with ancestry resolved: every input whose
    /// funding transaction is present in the envelope gets it embedded as
    /// `source_transaction`, recursively, and proofs are attached from the
    /// proof table.
    pub fn subject(&self) -> Result<Transaction, BeefError> {
        let mut linked: BTreeMap<Txid, Transaction> = BTreeMap::new();
        let mut subject = None;
        for entry in &self.txs {
            let mut tx = entry.tx.clone();
            if let Some(index) = entry.bump_index {
                tx.merkle_path = Some(self.bumps[index].clone());
            }
            for input in &mut tx.inputs {
                if let Some(parent) = linked.get(&input.source_txid) {
                    input.source_transaction = Some(Box::new(parent.clone()));
                }
            }
            let txid = tx.txid();
            linked.insert(txid, tx.clone());
            subject = Some(tx);
        }
        subject.ok_or(BeefError::EmptyEnvelope)
    }
}

impl Transaction {
    /// Packs this transaction and its embedded ancestry into an envelope.
    ///
    /// Ancestors are collected by walking `source_transaction` links,
    /// deduplicated by txid, and written parents-first. Identical proofs
    /// are stored once and shared by index.
    pub fn to_beef(&self) -> Result<Vec<u8>, BeefError> {
        let mut order: Vec<&Transaction> = Vec::new();
        let mut seen: BTreeMap<Txid, ()> = BTreeMap::new();
        collect_ancestry(self, &mut seen, &mut order);

        let mut bumps: Vec<MerklePath> = Vec::new();
        let mut txs = Vec::with_capacity(order.len());
        for tx in order {
            let bump_index = match &tx.merkle_path {
                Some(path) => Some(intern_bump(&mut bumps, path)),
                None => None,
            };
            txs.push(BeefTx {
                tx: strip_links(tx),
                bump_index,
            });
        }
        Ok(Beef { bumps, txs }.to_binary())
    }
}

/// Post-order walk so parents always precede children; the starting
/// transaction lands last.
fn collect_ancestry<'a>(
    tx: &'a Transaction,
    seen: &mut BTreeMap<Txid, ()>,
    order: &mut Vec<&'a Transaction>,
) {
    let txid = tx.txid();
    if seen.contains_key(&txid) {
        return;
    }
    seen.insert(txid, ());
    for input in &tx.inputs {
        if let Some(parent) = &input.source_transaction {
            collect_ancestry(parent, seen, order);
        }
    }
    order.push(tx);
}

fn intern_bump(bumps: &mut Vec<MerklePath>, path: &MerklePath) -> usize {
    match bumps.iter().position(|existing| existing == path) {
        Some(index) => index,
        None => {
            bumps.push(path.clone());
            bumps.len() - 1
        }
    }
}

/// Copies the consensus fields only; envelope entries never nest.
fn strip_links(tx: &Transaction) -> Transaction {
    Transaction {
        version: tx.version,
        inputs: tx
            .inputs
            .iter()
            .map(|input| crate::transaction::TxInput {
                source_txid: input.source_txid,
                source_vout: input.source_vout,
                unlocking_script: input.unlocking_script.clone(),
                sequence: input.sequence,
                source_transaction: None,
            })
            .collect(),
        outputs: tx.outputs.clone(),
        lock_time: tx.lock_time,
        merkle_path: None,
    }
}
