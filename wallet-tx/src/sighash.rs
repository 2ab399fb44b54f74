//! Legacy (pre-SegWit) signature hashing and per-input ECDSA signing.

use secp256k1::{Message, Secp256k1};

use wallet_chain::serialization::sha256d;
use wallet_chain::transaction::Transaction;
use wallet_chain::transparent::{EcKey, Input, Script};
use wallet_chain::BitcoinSerialize;
use wallet_chain::WalletError;

/// `SIGHASH_ALL`, the only sighash type this wallet ever produces.
const SIGHASH_ALL: u32 = 1;

/// Computes the legacy sighash for spending input `index`, whose referenced
/// output is gated by `subscript`: every other input's unlocking script is
/// emptied, the input being signed has its script replaced by `subscript`,
/// and the 4-byte hash type is appended before hashing.
fn signature_hash(tx: &Transaction, index: usize, subscript: &Script) -> [u8; 32] {
    let inputs = tx
        .inputs
        .iter()
        .enumerate()
        .map(|(i, input)| {
            if i == index {
                match input {
                    Input::PrevOut { outpoint, sequence, .. } => Input::PrevOut {
                        outpoint: *outpoint,
                        unlock_script: subscript.clone(),
                        sequence: *sequence,
                    },
                    Input::Coinbase { .. } => input.with_cleared_script(),
                }
            } else {
                input.with_cleared_script()
            }
        })
        .collect();

    let stripped = Transaction::new(tx.version, inputs, tx.outputs.clone(), tx.locktime);

    let mut bytes = stripped
        .bitcoin_serialize_to_vec()
        .expect("serializing to a Vec<u8> is infallible");
    bytes.extend_from_slice(&SIGHASH_ALL.to_le_bytes());

    sha256d::digest(&bytes)
}

/// Signs input `index` of `tx` against `subscript` (the scriptPubKey of the
/// output it spends) with `key`, returning the `<sig> <pubkey>` scriptSig
/// that unlocks it.
pub fn sign_input(tx: &Transaction, index: usize, subscript: &Script, key: &EcKey) -> Result<Input, WalletError> {
    let (outpoint, sequence) = match &tx.inputs[index] {
        Input::PrevOut { outpoint, sequence, .. } => (*outpoint, *sequence),
        Input::Coinbase { .. } => return Err(WalletError::Key),
    };

    let digest = signature_hash(tx, index, subscript);
    let message = Message::from_slice(&digest).map_err(|_| WalletError::Key)?;

    let secp = Secp256k1::signing_only();
    let signature = secp.sign(&message, &key.secret_key()?);

    let mut sig_bytes = signature.serialize_der().to_vec();
    sig_bytes.push(SIGHASH_ALL as u8);

    let mut script = Vec::new();
    push_data(&mut script, &sig_bytes);
    push_data(&mut script, &key.public_key().serialize());

    Ok(Input::PrevOut {
        outpoint,
        unlock_script: Script(script),
        sequence,
    })
}

/// Encodes `data` as a script push: a one-byte length prefix for anything
/// up to 75 bytes (every signature or compressed pubkey this wallet ever
/// pushes), `OP_PUSHDATA1` beyond that.
fn push_data(script: &mut Vec<u8>, data: &[u8]) {
    if data.len() <= 75 {
        script.push(data.len() as u8);
    } else {
        script.push(0x4c); // OP_PUSHDATA1
        script.push(data.len() as u8);
    }
    script.extend_from_slice(data);
}

#[cfg(test)]
mod tests {
    use super::*;

    use wallet_chain::transaction::{Hash as TxHash, LockTime};
    use wallet_chain::transparent::{OutPoint, Output};

    fn sample_tx() -> Transaction {
        Transaction::new(
            1,
            vec![Input::PrevOut {
                outpoint: OutPoint { hash: TxHash([7u8; 32]), index: 0 },
                unlock_script: Script(Vec::new()),
                sequence: 0xFFFF_FFFF,
            }],
            vec![Output { value: 50_000, lock_script: Script::new_p2pkh(&[0x11u8; 20]) }],
            LockTime::unlocked(),
        )
    }

    /// Splits a script made only of push opcodes back into its pushed byte
    /// strings, inverse of [`push_data`].
    fn parse_pushes(script: &[u8]) -> Vec<Vec<u8>> {
        let mut pushes = Vec::new();
        let mut i = 0;
        while i < script.len() {
            let op = script[i];
            if op == 0x4c {
                let len = script[i + 1] as usize;
                pushes.push(script[i + 2..i + 2 + len].to_vec());
                i += 2 + len;
            } else {
                let len = op as usize;
                pushes.push(script[i + 1..i + 1 + len].to_vec());
                i += 1 + len;
            }
        }
        pushes
    }

    #[test]
    fn signed_input_verifies_against_its_own_sighash() {
        let key = EcKey::generate(false, None);
        let subscript = Script::new_p2pkh(&key.hash160());
        let tx = sample_tx();

        let signed_input = sign_input(&tx, 0, &subscript, &key).unwrap();
        let unlock_script = match &signed_input {
            Input::PrevOut { unlock_script, .. } => unlock_script.clone(),
            _ => panic!("expected a PrevOut input"),
        };

        let pushes = parse_pushes(&unlock_script.0);
        assert_eq!(pushes.len(), 2);
        let der_with_hash_type = &pushes[0];
        let der_signature = &der_with_hash_type[..der_with_hash_type.len() - 1];
        assert_eq!(*der_with_hash_type.last().unwrap(), SIGHASH_ALL as u8);
        let public_key_bytes = &pushes[1];

        let signed_tx = Transaction::new(tx.version, vec![signed_input], tx.outputs.clone(), tx.locktime);
        let digest = signature_hash(&signed_tx, 0, &subscript);

        let secp = Secp256k1::verification_only();
        let message = Message::from_slice(&digest).unwrap();
        let signature = secp256k1::Signature::from_der(der_signature).unwrap();
        let public_key = secp256k1::PublicKey::from_slice(public_key_bytes).unwrap();

        assert!(secp.verify(&message, &signature, &public_key).is_ok());
    }
}
