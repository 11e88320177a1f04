//! Transaction model and raw wire codec.
//!
//! `Transaction` carries two kinds of state: the consensus fields that
//! participate in the wire encoding (and therefore the txid), and the
//! envelope-only fields `merkle_path` and `TxInput::source_transaction`
//! that exist to make a transaction verifiable without external lookups.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::BeefError;
use crate::hash::{sha256d, Hash32};
use crate::merkle_path::MerklePath;
use crate::wire::{Reader, Writer};

/// A transaction id. Stored in natural digest order; displayed reversed,
/// following the Bitcoin hex convention.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Txid(pub Hash32);

impl Txid {
    /// Parses the conventional reversed-hex form.
    pub fn from_hex(s: &str) -> Result<Self, BeefError> {
        let mut bytes: Vec<u8> =
            hex::decode(s).map_err(|_| BeefError::BadTxidHex(s.to_string()))?;
        if bytes.len() != 32 {
            return Err(BeefError::BadTxidHex(s.to_string()));
        }
        bytes.reverse();
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }

    /// Renders the conventional reversed-hex form.
    pub fn to_hex(&self) -> String {
        let mut bytes = self.0;
        bytes.reverse();
        hex::encode(bytes)
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txid({})", self.to_hex())
    }
}

impl Serialize for Txid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Txid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Txid::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A reference to a specific transaction output.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Outpoint {
    pub txid: Txid,
    pub vout: u32,
}

impl Outpoint {
    pub fn new(txid: Txid, vout: u32) -> Self {
        Self { txid, vout }
    }
}

impl fmt::Display for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

impl fmt::Debug for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Outpoint({self})")
    }
}

/// A transaction input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    pub source_txid: Txid,
    pub source_vout: u32,
    pub unlocking_script: Vec<u8>,
    pub sequence: u32,
    /// The funding transaction, when embedded by an envelope. Not part of
    /// the wire encoding.
    pub source_transaction: Option<Box<Transaction>>,
}

impl TxInput {
    /// The outpoint this input spends.
    pub fn source_outpoint(&self) -> Outpoint {
        Outpoint::new(self.source_txid, self.source_vout)
    }
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub satoshis: u64,
    pub locking_script: Vec<u8>,
}

/// A Bitcoin-family transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
    /// Inclusion proof for this transaction, when known. Not part of the
    /// wire encoding.
    pub merkle_path: Option<MerklePath>,
}

impl Transaction {
    /// Serializes the consensus fields.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_u32(self.version);
        w.write_varint(self.inputs.len() as u64);
        for input in &self.inputs {
            w.write_bytes(&input.source_txid.0);
            w.write_u32(input.source_vout);
            w.write_varint(input.unlocking_script.len() as u64);
            w.write_bytes(&input.unlocking_script);
            w.write_u32(input.sequence);
        }
        w.write_varint(self.outputs.len() as u64);
        for output in &self.outputs {
            w.write_u64(output.satoshis);
            w.write_varint(output.locking_script.len() as u64);
            w.write_bytes(&output.locking_script);
        }
        w.write_u32(self.lock_time);
        w.into_bytes()
    }

    /// Parses the consensus fields from a reader positioned at the start
    /// of a transaction. `source_transaction` and `merkle_path` are left
    /// unset; envelopes fill them in.
    pub fn from_wire(r: &mut Reader<'_>) -> Result<Self, BeefError> {
        let version = r.read_u32()?;
        let input_count = r.read_count()?;
        let mut inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            let source_txid = Txid(r.read_hash()?);
            let source_vout = r.read_u32()?;
            let script_len = r.read_count()?;
            let unlocking_script = r.read_bytes(script_len)?.to_vec();
            let sequence = r.read_u32()?;
            inputs.push(TxInput {
                source_txid,
                source_vout,
                unlocking_script,
                sequence,
                source_transaction: None,
            });
        }
        let output_count = r.read_count()?;
        let mut outputs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            let satoshis = r.read_u64()?;
            let script_len = r.read_count()?;
            let locking_script = r.read_bytes(script_len)?.to_vec();
            outputs.push(TxOutput {
                satoshis,
                locking_script,
            });
        }
        let lock_time = r.read_u32()?;
        Ok(Self {
            version,
            inputs,
            outputs,
            lock_time,
            merkle_path: None,
        })
    }

    /// The canonical transaction id: double-SHA256 of the wire bytes.
    pub fn txid(&self) -> Txid {
        Txid(sha256d(&self.to_wire()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn dummy_tx(lock_time: u32) -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![TxInput {
                source_txid: Txid([7u8; 32]),
                source_vout: 3,
                unlocking_script: vec![0xAB, 0xCD],
                sequence: 0xFFFF_FFFF,
                source_transaction: None,
            }],
            outputs: vec![TxOutput {
                satoshis: 1_234,
                locking_script: vec![0x51],
            }],
            lock_time,
            merkle_path: None,
        }
    }

    #[test]
    fn test_wire_round_trip() {
        let tx = dummy_tx(42);
        let bytes = tx.to_wire();
        let mut r = Reader::new(&bytes);
        let back = Transaction::from_wire(&mut r).unwrap();
        assert_eq!(back, tx);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_txid_depends_on_consensus_fields_only() {
        let mut a = dummy_tx(0);
        let mut b = dummy_tx(0);
        a.merkle_path = Some(MerklePath {
            block_height: 1,
            path: vec![],
        });
        b.inputs[0].source_transaction = Some(Box::new(dummy_tx(99)));
        assert_eq!(a.txid(), b.txid());

        b.lock_time = 1;
        assert_ne!(a.txid(), b.txid());
    }

    #[test]
    fn test_txid_hex_round_trip() {
        let txid = dummy_tx(9).txid();
        let hex = txid.to_hex();
        assert_eq!(Txid::from_hex(&hex).unwrap(), txid);
        assert_eq!(hex.len(), 64);
    }

    #[test]
    fn test_outpoint_display_pairs_txid_and_vout() {
        let outpoint = Outpoint::new(Txid([0u8; 32]), 7);
        let shown = outpoint.to_string();
        assert!(shown.ends_with(":7"));
        assert_eq!(shown.len(), 64 + 2);
    }
}
