//! Assembles, fee-escalates, and signs a spend transaction.

use std::collections::HashMap;

use tracing::debug;

use wallet_chain::parameters::Network;
use wallet_chain::transaction::{LockTime, Transaction};
use wallet_chain::transparent::{Address, EcKey, Input, OutPoint, Output, Script};
use wallet_chain::WalletError;
use wallet_state::{ReceiveOutput, WalletStore};

use crate::select::select_coins;
use crate::sighash::sign_input;

/// The fee charged per kilobyte (rounded up) of a transaction's serialized
/// length, and the amount assumed before a transaction's final size is
/// known.
pub const MIN_TX_FEE: u64 = 10_000;

/// The smallest change amount worth returning to the wallet; anything
/// below this is left as extra fee rather than creating a change output.
pub const DUST: u64 = 5_460;

/// A transaction ready to broadcast, with the fee it ultimately paid.
pub struct SpendPlan {
    pub transaction: Transaction,
    pub fee: u64,
}

/// Builds, fee-escalates to a fixed point, and signs a transaction paying
/// `amount` satoshis to `recipient` out of the wallet's own spendable
/// outputs (see [`crate::select::select_coins`]).
///
/// `change_key` receives any leftover value at or above [`DUST`]; `keys`
/// must map the hash160 of every candidate input's address to the `EcKey`
/// that owns it, since signing needs the matching private scalar.
pub fn build_and_sign(
    store: &dyn WalletStore,
    network: Network,
    recipient: Address,
    amount: u64,
    change_key: &EcKey,
    keys: &HashMap<[u8; 20], EcKey>,
) -> Result<SpendPlan, WalletError> {
    let recipient_hash = p2pkh_hash(&recipient, network)?;

    let mut fee = MIN_TX_FEE;
    loop {
        let selected = select_coins(store, amount.saturating_add(fee))?;
        let total: u64 = selected.iter().map(|output| output.value).sum();
        let change = total - amount - fee;

        let mut outputs = vec![Output {
            value: amount,
            lock_script: Script::new_p2pkh(&recipient_hash),
        }];
        if change >= DUST {
            outputs.push(Output {
                value: change,
                lock_script: Script::new_p2pkh(&change_key.hash160()),
            });
        }

        let inputs: Vec<Input> = selected
            .iter()
            .map(|output| Input::PrevOut {
                outpoint: OutPoint { hash: output.tx_hash, index: output.vout },
                unlock_script: Script(Vec::new()),
                sequence: 0xFFFF_FFFF,
            })
            .collect();

        let unsigned = Transaction::new(1, inputs, outputs, LockTime::unlocked());

        let mut signed_inputs = Vec::with_capacity(selected.len());
        for (index, output) in selected.iter().enumerate() {
            let pub_key_hash = p2pkh_hash(&output.address, network)?;
            let key = keys.get(&pub_key_hash).ok_or(WalletError::Key)?;
            let subscript = Script::new_p2pkh(&pub_key_hash);
            signed_inputs.push(sign_input(&unsigned, index, &subscript, key)?);
        }

        let signed = Transaction::new(
            unsigned.version,
            signed_inputs,
            unsigned.outputs.clone(),
            unsigned.locktime,
        );

        let length = signed.len() as u64;
        let required_fee = MIN_TX_FEE * ((length + 999) / 1000);
        if required_fee > fee {
            debug!(old_fee = fee, new_fee = required_fee, length, "escalating fee after measuring serialized size");
            fee = required_fee;
            continue;
        }

        return Ok(SpendPlan { transaction: signed, fee });
    }
}

fn p2pkh_hash(address: &Address, network: Network) -> Result<[u8; 20], WalletError> {
    match address {
        Address::PayToPublicKeyHash { network: address_network, pub_key_hash } => {
            if *address_network != network {
                return Err(WalletError::Address("address does not match the active network"));
            }
            Ok(*pub_key_hash)
        }
        Address::PayToScriptHash { .. } => Err(WalletError::Address("pay-to-script-hash is not supported")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use wallet_chain::transaction;

    use crate::select::tests::{confirm_at_depth, temp_store};

    #[test]
    fn builds_transaction_with_recipient_and_change_outputs() {
        let (_dir, store) = temp_store("wallet-tx-build-change");
        let source_key = EcKey::generate(false, None);
        let block_hash = confirm_at_depth(&store, 10);
        store
            .store_receive_tx(ReceiveOutput {
                tx_hash: transaction::Hash([9u8; 32]),
                vout: 0,
                value: 1_000_000,
                address: source_key.address(Network::Mainnet),
                is_change: false,
                is_spent: false,
                is_safe: false,
                is_deleted: false,
                is_coinbase: false,
                block_hash: Some(block_hash),
            })
            .unwrap();

        let mut keys = HashMap::new();
        keys.insert(source_key.hash160(), source_key);

        let change_key = EcKey::generate(true, None);
        let recipient = Address::PayToPublicKeyHash {
            network: Network::Mainnet,
            pub_key_hash: [0x22u8; 20],
        };

        let plan = build_and_sign(&store, Network::Mainnet, recipient, 50_000, &change_key, &keys).unwrap();

        assert_eq!(plan.transaction.inputs.len(), 1);
        assert_eq!(plan.transaction.outputs.len(), 2);
        assert_eq!(plan.transaction.outputs[0].value, 50_000);
        assert_eq!(plan.fee, MIN_TX_FEE);
        assert_eq!(plan.transaction.outputs[1].value, 1_000_000 - 50_000 - MIN_TX_FEE);
    }

    #[test]
    fn insufficient_funds_bubbles_up() {
        let (_dir, store) = temp_store("wallet-tx-build-insufficient");
        let keys = HashMap::new();
        let change_key = EcKey::generate(true, None);
        let recipient = Address::PayToPublicKeyHash {
            network: Network::Mainnet,
            pub_key_hash: [0x22u8; 20],
        };

        let result = build_and_sign(&store, Network::Mainnet, recipient, 50_000, &change_key, &keys);
        assert!(matches!(result, Err(WalletError::InsufficientFee)));
    }
}
