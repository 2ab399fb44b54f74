//! Transaction Merkle trees, including the BIP 37 partial Merkle tree used
//! by `merkleblock` messages.

use std::fmt;

use crate::serialization::{sha256d, BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// The Merkle root of a block's transactions, as carried in its header.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Root(pub [u8; 32]);

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        f.write_str(&hex::encode(&reversed))
    }
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        f.debug_tuple("merkle::Root").field(&hex::encode(&reversed)).finish()
    }
}

impl BitcoinSerialize for Root {
    fn bitcoin_serialize<W: std::io::Write>(&self, target: W) -> Result<(), std::io::Error> {
        self.0.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for Root {
    fn bitcoin_deserialize<R: std::io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(Root(<[u8; 32]>::bitcoin_deserialize(reader)?))
    }
}

/// Combine two child Merkle node hashes into their parent, Bitcoin-style: a
/// single SHA256d of the two 32-byte hashes concatenated in order.
fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    use std::io::Write;
    let mut writer = sha256d::Writer::default();
    writer.write_all(left).expect("Sha256dWriter is infallible");
    writer.write_all(right).expect("Sha256dWriter is infallible");
    writer.finish()
}

/// Compute the Merkle root of a full list of transaction hashes.
///
/// Bitcoin's classic (CVE-2012-2459-prone) algorithm: at each level, an odd
/// node out is duplicated and hashed with itself. An empty list roots to
/// the all-zero hash, matching a coinbase-only block's behavior of one leaf.
pub fn root_from_hashes(hashes: &[[u8; 32]]) -> Root {
    if hashes.is_empty() {
        return Root([0u8; 32]);
    }
    let mut level: Vec<[u8; 32]> = hashes.to_vec();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            let last = *level.last().unwrap();
            level.push(last);
        }
        level = level
            .chunks(2)
            .map(|pair| hash_pair(&pair[0], &pair[1]))
            .collect();
    }
    Root(level[0])
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PartialMerkleError {
    #[error("partial merkle tree claimed {0} transactions but the tree only supports up to {1}")]
    TooManyTransactions(u32, u32),
    #[error("partial merkle tree has no hashes")]
    NoHashes,
    #[error("partial merkle tree consumed {used} of {total} flag bits, or left hashes unused")]
    UnbalancedTree { used: usize, total: usize },
    #[error("partial merkle tree root {computed} does not match header root {expected}")]
    RootMismatch { computed: String, expected: String },
}

/// A reconstructed partial Merkle tree, as received in a `merkleblock`
/// message: a compact proof of which transactions (identified by their
/// hashes) are included in a block, without transmitting the whole block.
///
/// Reconstruction walks the implied binary tree depth-first, consuming one
/// flag bit per internal node to decide whether to descend (and consuming a
/// hash at each leaf or pruned subtree), exactly mirroring the encoder.
pub struct PartialMerkleTree {
    hash_index: usize,
    flag_index: usize,
}

impl PartialMerkleTree {
    /// Reconstruct the tree, returning the transaction hashes proven to be
    /// included (in tree order) along with the root the reconstruction
    /// computed, which the caller must compare against the block header.
    pub fn reconstruct(
        total_transactions: u32,
        hashes: &[[u8; 32]],
        flags: &[bool],
    ) -> Result<(Root, Vec<[u8; 32]>), PartialMerkleError> {
        if hashes.is_empty() {
            return Err(PartialMerkleError::NoHashes);
        }
        // A degenerate but safe ceiling: a tree can never have more leaves
        // than transactions, and the proof can never need more hashes than
        // that (each leaf contributes at most one hash).
        if total_transactions == 0 || hashes.len() as u32 > total_transactions {
            return Err(PartialMerkleError::TooManyTransactions(
                hashes.len() as u32,
                total_transactions,
            ));
        }

        let height = merkle_height(total_transactions);
        let mut tree = PartialMerkleTree {
            hash_index: 0,
            flag_index: 0,
        };
        let mut matched = Vec::new();
        let root = tree.traverse(height, 0, total_transactions, hashes, flags, &mut matched)?;

        if tree.hash_index != hashes.len() {
            return Err(PartialMerkleError::UnbalancedTree {
                used: tree.hash_index,
                total: hashes.len(),
            });
        }

        Ok((root, matched))
    }

    fn traverse(
        &mut self,
        height: u32,
        position: u32,
        total_transactions: u32,
        hashes: &[[u8; 32]],
        flags: &[bool],
        matched: &mut Vec<[u8; 32]>,
    ) -> Result<Root, PartialMerkleError> {
        let flag = *flags.get(self.flag_index).unwrap_or(&false);
        self.flag_index += 1;

        if height == 0 || !flag {
            let hash = *hashes.get(self.hash_index).ok_or(PartialMerkleError::NoHashes)?;
            self.hash_index += 1;
            if height == 0 && flag {
                matched.push(hash);
            }
            return Ok(Root(hash));
        }

        let left = self.traverse(
            height - 1,
            position * 2,
            total_transactions,
            hashes,
            flags,
            matched,
        )?;
        let right_position = position * 2 + 1;
        let right = if right_position < node_count_at_height(height - 1, total_transactions) {
            self.traverse(
                height - 1,
                right_position,
                total_transactions,
                hashes,
                flags,
                matched,
            )?
        } else {
            left
        };

        Ok(Root(hash_pair(&left.0, &right.0)))
    }
}

fn merkle_height(total_transactions: u32) -> u32 {
    let mut height = 0;
    let mut width = total_transactions;
    while width > 1 {
        width = (width + 1) / 2;
        height += 1;
    }
    height
}

fn node_count_at_height(height: u32, total_transactions: u32) -> u32 {
    let mut width = total_transactions;
    for _ in 0..height {
        width = (width + 1) / 2;
    }
    width
}

pub fn verify_against_header(
    total_transactions: u32,
    hashes: &[[u8; 32]],
    flags: &[bool],
    header_root: Root,
) -> Result<Vec<[u8; 32]>, PartialMerkleError> {
    let (computed, matched) =
        PartialMerkleTree::reconstruct(total_transactions, hashes, flags)?;
    if computed != header_root {
        return Err(PartialMerkleError::RootMismatch {
            computed: computed.to_string(),
            expected: header_root.to_string(),
        });
    }
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_of(byte: u8) -> [u8; 32] {
        [byte; 32]
    }

    #[test]
    fn single_leaf_root_is_coinbase_hash() {
        let coinbase = hash_of(1);
        assert_eq!(root_from_hashes(&[coinbase]).0, coinbase);
    }

    #[test]
    fn odd_leaf_count_duplicates_last() {
        let leaves = vec![hash_of(1), hash_of(2), hash_of(3)];
        let with_duplicate = vec![hash_of(1), hash_of(2), hash_of(3), hash_of(3)];
        assert_eq!(root_from_hashes(&leaves), root_from_hashes(&with_duplicate));
    }

    #[test]
    fn full_tree_reconstructs_to_its_own_root() {
        let leaves = vec![hash_of(1), hash_of(2), hash_of(3), hash_of(4)];
        let root = root_from_hashes(&leaves);

        // Every flag bit set to 1, all four leaf hashes present: this is
        // the degenerate "everything matched" proof.
        let flags = vec![true, true, true, true, true, true, true];
        let (computed, matched) =
            PartialMerkleTree::reconstruct(4, &leaves, &flags).unwrap();
        assert_eq!(computed, root);
        assert_eq!(matched.len(), 4);
    }

    #[test]
    fn root_mismatch_is_rejected() {
        let leaves = vec![hash_of(1), hash_of(2)];
        let bogus_root = Root(hash_of(0xAA));
        let flags = vec![true, true, true];
        let result = verify_against_header(2, &leaves, &flags, bogus_root);
        assert!(matches!(result, Err(PartialMerkleError::RootMismatch { .. })));
    }
}
