//! Coin selection: choosing spendable outputs to cover an amount plus fee.

use wallet_chain::WalletError;
use wallet_state::{ReceiveOutput, WalletStore};

/// Outputs need this many confirmations before they're spendable.
pub const MIN_CONFIRMATIONS: u32 = 6;
/// Coinbase outputs need this many before they mature enough to spend.
pub const COINBASE_MIN_CONFIRMATIONS: u32 = 120;

fn is_spendable(store: &dyn WalletStore, output: &ReceiveOutput) -> Result<bool, WalletError> {
    if output.is_spent || output.is_deleted || output.is_safe {
        return Ok(false);
    }
    let required = if output.is_coinbase {
        COINBASE_MIN_CONFIRMATIONS
    } else {
        MIN_CONFIRMATIONS
    };
    Ok(store.get_tx_depth(output.tx_hash)? >= required)
}

/// Greedily selects spendable outputs, smallest value first, until their
/// sum reaches `target` (the payment amount plus the current fee).
///
/// Fails with [`WalletError::InsufficientFee`] if every spendable output
/// combined still falls short.
pub fn select_coins(store: &dyn WalletStore, target: u64) -> Result<Vec<ReceiveOutput>, WalletError> {
    let mut candidates = Vec::new();
    for output in store.get_receive_tx_list()? {
        if is_spendable(store, &output)? {
            candidates.push(output);
        }
    }
    candidates.sort_by_key(|output| output.value);

    let mut selected = Vec::new();
    let mut total = 0u64;
    for candidate in candidates {
        if total >= target {
            break;
        }
        total += candidate.value;
        selected.push(candidate);
    }

    if total < target {
        return Err(WalletError::InsufficientFee);
    }

    Ok(selected)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use wallet_chain::block;
    use wallet_chain::parameters::Network;
    use wallet_chain::transaction;
    use wallet_chain::transparent::Address;
    use wallet_chain::work::difficulty::CompactDifficulty;
    use wallet_state::{ChainHead, Config, SledStore, StoredHeader};

    pub(crate) fn temp_store(label: &str) -> (tempdir::TempDir, SledStore) {
        let dir = tempdir::TempDir::new(label).unwrap();
        let config = Config::with_data_dir(Network::Mainnet, dir.path().to_path_buf());
        let store = SledStore::open(&config).unwrap();
        (dir, store)
    }

    /// Stores a header at height 100 and advances the chain head so that
    /// header sits exactly `depth` confirmations deep, returning its hash.
    pub(crate) fn confirm_at_depth(store: &SledStore, depth: u32) -> block::Hash {
        let header = block::Header::new(
            1,
            block::Hash([0u8; 32]),
            block::merkle::Root([0u8; 32]),
            chrono::Utc::now(),
            CompactDifficulty(0x1d00_ffff),
            0,
        );
        let hash = header.hash();
        store
            .store_header(StoredHeader {
                header,
                height: block::Height(100),
                chain_work: primitive_types::U256::zero(),
                on_chain: true,
                matched_transactions: vec![],
            })
            .unwrap();
        store
            .set_chain_head(ChainHead {
                hash: block::Hash([0xCDu8; 32]),
                height: block::Height(100 + depth - 1),
                chain_work: primitive_types::U256::zero(),
            })
            .unwrap();
        hash
    }

    fn receive_output(
        tx_hash: transaction::Hash,
        value: u64,
        block_hash: Option<block::Hash>,
        is_coinbase: bool,
    ) -> ReceiveOutput {
        ReceiveOutput {
            tx_hash,
            vout: 0,
            value,
            address: Address::PayToPublicKeyHash {
                network: Network::Mainnet,
                pub_key_hash: [1u8; 20],
            },
            is_change: false,
            is_spent: false,
            is_safe: false,
            is_deleted: false,
            is_coinbase,
            block_hash,
        }
    }

    #[test]
    fn excludes_outputs_below_confirmation_threshold() {
        let (_dir, store) = temp_store("wallet-tx-select-shallow");
        let block_hash = confirm_at_depth(&store, 3);
        let output = receive_output(transaction::Hash([1u8; 32]), 100_000, Some(block_hash), false);
        store.store_receive_tx(output).unwrap();

        let result = select_coins(&store, 50_000);
        assert!(matches!(result, Err(WalletError::InsufficientFee)));
    }

    #[test]
    fn includes_confirmed_outputs_smallest_first() {
        let (_dir, store) = temp_store("wallet-tx-select-smallest-first");
        let block_hash = confirm_at_depth(&store, 10);

        store
            .store_receive_tx(receive_output(transaction::Hash([1u8; 32]), 30_000, Some(block_hash), false))
            .unwrap();
        store
            .store_receive_tx(receive_output(transaction::Hash([2u8; 32]), 10_000, Some(block_hash), false))
            .unwrap();
        store
            .store_receive_tx(receive_output(transaction::Hash([3u8; 32]), 20_000, Some(block_hash), false))
            .unwrap();

        let selected = select_coins(&store, 25_000).unwrap();
        let values: Vec<u64> = selected.iter().map(|o| o.value).collect();
        assert_eq!(values, vec![10_000, 20_000]);
    }

    #[test]
    fn coinbase_output_needs_deeper_confirmation() {
        let (_dir, store) = temp_store("wallet-tx-select-coinbase");
        let block_hash = confirm_at_depth(&store, 10);
        let output = receive_output(transaction::Hash([4u8; 32]), 100_000, Some(block_hash), true);
        store.store_receive_tx(output).unwrap();

        let result = select_coins(&store, 50_000);
        assert!(matches!(result, Err(WalletError::InsufficientFee)));
    }
}
