//! Double-SHA256, the hash family used for txids and Merkle nodes.

use sha2::{Digest, Sha256};

/// A 32-byte digest in natural (digest) byte order.
pub type Hash32 = [u8; 32];

/// Computes SHA256(SHA256(data)).
pub fn sha256d(data: &[u8]) -> Hash32 {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    out
}

/// Hashes the concatenation of two nodes, the Merkle parent rule.
pub fn merkle_parent(left: &Hash32, right: &Hash32) -> Hash32 {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left);
    buf[32..].copy_from_slice(right);
    sha256d(&buf)
}
