//! BUMP-style Merkle inclusion proofs.
//!
//! A proof carries one level of leaves per tree level. Level 0 holds the
//! transactions of interest and their immediate siblings; each higher
//! level holds only the siblings the climb needs. A leaf flagged as a
//! duplicate stands for "hash the working node with itself", the rule for
//! odd-width levels.

use crate::errors::BeefError;
use crate::hash::{merkle_parent, Hash32};
use crate::transaction::Txid;
use crate::wire::{Reader, Writer};

const LEAF_FLAG_DUPLICATE: u8 = 0x01;
const LEAF_FLAG_TXID: u8 = 0x02;

/// One leaf of one proof level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathLeaf {
    /// Position within the level, level-local granularity.
    pub offset: u64,
    /// The node hash; `None` for duplicate markers.
    pub hash: Option<Hash32>,
    /// Set when the hash is a subject txid rather than a plain node.
    pub is_txid: bool,
    /// Set when this position mirrors its sibling.
    pub is_duplicate: bool,
}

impl PathLeaf {
    /// A plain sibling node.
    pub fn node(offset: u64, hash: Hash32) -> Self {
        Self {
            offset,
            hash: Some(hash),
            is_txid: false,
            is_duplicate: false,
        }
    }

    /// A level-0 leaf naming a subject transaction.
    pub fn txid(offset: u64, txid: Txid) -> Self {
        Self {
            offset,
            hash: Some(txid.0),
            is_txid: true,
            is_duplicate: false,
        }
    }

    /// A duplicate marker.
    pub fn duplicate(offset: u64) -> Self {
        Self {
            offset,
            hash: None,
            is_txid: false,
            is_duplicate: true,
        }
    }
}

/// A Merkle inclusion proof anchored at a block height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerklePath {
    pub block_height: u32,
    /// Levels from the leaves upward; `path.len()` is the tree height.
    pub path: Vec<Vec<PathLeaf>>,
}

impl MerklePath {
    /// Climbs the tree from `txid` to the root.
    ///
    /// # Errors
    /// Fails when `txid` is not among the level-0 leaves, or when a level
    /// on the climb lacks the required sibling.
    pub fn compute_root(&self, txid: &Txid) -> Result<Hash32, BeefError> {
        let leaves = self.path.first().ok_or_else(|| {
            BeefError::TxidNotInProof(txid.to_hex())
        })?;
        let start = leaves
            .iter()
            .find(|leaf| leaf.hash == Some(txid.0))
            .ok_or_else(|| BeefError::TxidNotInProof(txid.to_hex()))?;

        let mut offset = start.offset;
        let mut digest = txid.0;
        for (level_index, level) in self.path.iter().enumerate() {
            let sibling_offset = offset ^ 1;
            let sibling = level
                .iter()
                .find(|leaf| leaf.offset == sibling_offset)
                .ok_or(BeefError::MissingSibling {
                    level: level_index,
                    offset: sibling_offset,
                })?;
            let sibling_hash = if sibling.is_duplicate {
                digest
            } else {
                sibling.hash.ok_or(BeefError::LeafWithoutHash {
                    level: level_index,
                    offset: sibling_offset,
                })?
            };
            digest = if offset & 1 == 1 {
                merkle_parent(&sibling_hash, &digest)
            } else {
                merkle_parent(&digest, &sibling_hash)
            };
            offset >>= 1;
        }
        Ok(digest)
    }

    pub fn write(&self, w: &mut Writer) {
        w.write_varint(u64::from(self.block_height));
        w.write_u8(self.path.len() as u8);
        for level in &self.path {
            w.write_varint(level.len() as u64);
            for leaf in level {
                w.write_varint(leaf.offset);
                let mut flags = 0u8;
                if leaf.is_duplicate {
                    flags |= LEAF_FLAG_DUPLICATE;
                }
                if leaf.is_txid {
                    flags |= LEAF_FLAG_TXID;
                }
                w.write_u8(flags);
                if !leaf.is_duplicate {
                    // Serialization demands a hash for every non-duplicate
                    // leaf; constructors uphold this.
                    w.write_bytes(&leaf.hash.unwrap_or([0u8; 32]));
                }
            }
        }
    }

    pub fn read(r: &mut Reader<'_>) -> Result<Self, BeefError> {
        let block_height = r.read_varint()? as u32;
        let tree_height = r.read_u8()? as usize;
        let mut path = Vec::with_capacity(tree_height);
        for _ in 0..tree_height {
            let leaf_count = r.read_count()?;
            let mut level = Vec::with_capacity(leaf_count);
            for _ in 0..leaf_count {
                let offset = r.read_varint()?;
                let flags = r.read_u8()?;
                let is_duplicate = flags & LEAF_FLAG_DUPLICATE != 0;
                let is_txid = flags & LEAF_FLAG_TXID != 0;
                let hash = if is_duplicate {
                    None
                } else {
                    Some(r.read_hash()?)
                };
                level.push(PathLeaf {
                    offset,
                    hash,
                    is_txid,
                    is_duplicate,
                });
            }
            path.push(level);
        }
        Ok(Self { block_height, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256d;

    /// Builds a two-level proof for `txid` at offset 0 of a four-leaf tree
    /// and returns the expected root alongside it.
    fn proof_for(txid: Txid) -> (MerklePath, Hash32) {
        let sibling = sha256d(b"sibling");
        let uncle = sha256d(b"uncle");
        let parent = merkle_parent(&txid.0, &sibling);
        let root = merkle_parent(&parent, &uncle);
        let path = MerklePath {
            block_height: 850_000,
            path: vec![
                vec![PathLeaf::txid(0, txid), PathLeaf::node(1, sibling)],
                vec![PathLeaf::node(1, uncle)],
            ],
        };
        (path, root)
    }

    #[test]
    fn test_compute_root_climbs_both_sides() {
        let txid = Txid(sha256d(b"tx"));
        let (path, root) = proof_for(txid);
        assert_eq!(path.compute_root(&txid).unwrap(), root);
    }

    #[test]
    fn test_compute_root_with_duplicate_sibling() {
        let txid = Txid(sha256d(b"lonely"));
        let path = MerklePath {
            block_height: 1,
            path: vec![vec![
                PathLeaf::txid(0, txid),
                PathLeaf::duplicate(1),
            ]],
        };
        let expected = merkle_parent(&txid.0, &txid.0);
        assert_eq!(path.compute_root(&txid).unwrap(), expected);
    }

    #[test]
    fn test_unknown_txid_is_rejected() {
        let txid = Txid(sha256d(b"tx"));
        let (path, _) = proof_for(txid);
        let other = Txid(sha256d(b"other"));
        assert!(matches!(
            path.compute_root(&other),
            Err(BeefError::TxidNotInProof(_))
        ));
    }

    #[test]
    fn test_missing_sibling_is_rejected() {
        let txid = Txid(sha256d(b"tx"));
        let (mut path, _) = proof_for(txid);
        path.path[1].clear();
        assert!(matches!(
            path.compute_root(&txid),
            Err(BeefError::MissingSibling { level: 1, .. })
        ));
    }

    #[test]
    fn test_wire_round_trip() {
        let txid = Txid(sha256d(b"tx"));
        let (path, _) = proof_for(txid);
        let mut w = Writer::new();
        path.write(&mut w);
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        let back = MerklePath::read(&mut r).unwrap();
        assert_eq!(back, path);
        assert_eq!(r.remaining(), 0);
    }
}
