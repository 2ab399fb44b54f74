//! Processes an incoming `merkleblock` message: verifies the header's
//! proof-of-work, reconstructs the partial Merkle tree to confirm which
//! transaction hashes are actually proven to be in the block, and hands
//! the header to the chain engine.

use chrono::Utc;

use wallet_chain::block::merkle;
use wallet_chain::parameters::Network;
use wallet_chain::WalletError;

use wallet_network::protocol::MerkleBlock;
use wallet_state::WalletStore;

use crate::chain::{self, ConnectOutcome, OrphanPool};
use crate::check;

/// Unpacks the bit-per-flag byte array a `merkleblock` carries on the wire
/// into one bool per flag, most-significant-bit-first within each byte,
/// per BIP 37's bit ordering.
fn unpack_flags(bytes: &[u8]) -> Vec<bool> {
    let mut flags = Vec::with_capacity(bytes.len() * 8);
    for byte in bytes {
        for bit in 0..8 {
            flags.push((byte >> bit) & 1 == 1);
        }
    }
    flags
}

pub fn process(
    store: &dyn WalletStore,
    orphans: &mut OrphanPool,
    network: Network,
    merkle_block: MerkleBlock,
) -> Result<ConnectOutcome, WalletError> {
    let header = merkle_block.block_header;
    let hash = header.hash();

    check::difficulty_is_valid(&header, &hash)
        .map_err(|e| WalletError::Verification(e.to_string()))?;

    let flags = unpack_flags(&merkle_block.flags);
    let hashes: Vec<[u8; 32]> = merkle_block.hashes.iter().map(|h| h.0).collect();
    let matched = merkle::verify_against_header(
        merkle_block.transaction_count,
        &hashes,
        &flags,
        header.merkle_root,
    )
    .map_err(|e| WalletError::Verification(e.to_string()))?
    .into_iter()
    .map(wallet_chain::transaction::Hash)
    .collect();

    chain::connect(store, orphans, network, header, matched, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpacks_flags_lsb_first_within_byte() {
        // 0b0000_0101 => bits 0 and 2 set.
        let flags = unpack_flags(&[0b0000_0101]);
        assert_eq!(
            flags,
            vec![true, false, true, false, false, false, false, false]
        );
    }
}
