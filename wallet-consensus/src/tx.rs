//! Processes an incoming `tx` message: records any output paying one of
//! the wallet's own addresses, and flags any owned output it spends.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use wallet_chain::parameters::Network;
use wallet_chain::transaction::Transaction;
use wallet_chain::transparent::{Address, Input};
use wallet_chain::WalletError;

use wallet_state::{ReceiveOutput, WalletStore};

pub fn process(store: &dyn WalletStore, network: Network, tx: Arc<Transaction>) -> Result<(), WalletError> {
    let hash = tx.hash();
    if !store.is_new_transaction(hash)? {
        return Ok(());
    }
    debug!(%hash, normalized = %tx.normalized_hash(), "processing incoming transaction");

    let owned: HashMap<[u8; 20], bool> = store
        .get_address_list()?
        .into_iter()
        .filter_map(|stored| match stored.address {
            Address::PayToPublicKeyHash { pub_key_hash, .. } => Some((pub_key_hash, stored.is_change)),
            Address::PayToScriptHash { .. } => None,
        })
        .collect();

    let is_coinbase = tx.is_coinbase();

    for (vout, output) in tx.outputs.iter().enumerate() {
        if let Some(pub_key_hash) = output.lock_script.as_p2pkh_hash() {
            if let Some(&is_change) = owned.get(&pub_key_hash) {
                store.store_receive_tx(ReceiveOutput {
                    tx_hash: hash,
                    vout: vout as u32,
                    value: output.value,
                    address: Address::PayToPublicKeyHash { network, pub_key_hash },
                    is_change,
                    is_spent: false,
                    is_safe: false,
                    is_deleted: false,
                    is_coinbase,
                    block_hash: None,
                })?;
            }
        }
    }

    for input in &tx.inputs {
        if let Input::PrevOut { outpoint, .. } = input {
            store.set_tx_spent(outpoint.hash, outpoint.index, true)?;
        }
    }

    Ok(())
}
