//! Decrypts the wallet's stored keys into memory for signing, and picks
//! the change key a spend should return leftover value to.

use std::collections::HashMap;

use secp256k1::PublicKey;

use wallet_chain::transparent::{EcKey, EncryptedKey};
use wallet_chain::WalletError;
use wallet_state::{StoredKey, WalletStore};

fn to_encrypted_key(stored: &StoredKey) -> Result<EncryptedKey, WalletError> {
    let record = &stored.encrypted;
    let public = PublicKey::from_slice(&record.public).map_err(|_| WalletError::Key)?;
    Ok(EncryptedKey {
        public,
        salt: record.salt,
        nonce: record.nonce,
        ciphertext: record.ciphertext.clone(),
        label: stored.label.clone(),
        is_change: record.is_change,
        creation_time: record.creation_time,
    })
}

/// Decrypts every key in the store with `passphrase`, keyed by the
/// hash160 of its public point, for use as input-signing material.
pub fn load_keys(store: &dyn WalletStore, passphrase: &str) -> Result<HashMap<[u8; 20], EcKey>, WalletError> {
    let mut keys = HashMap::new();
    for stored in store.get_key_list()? {
        let encrypted = to_encrypted_key(&stored)?;
        let key = encrypted.decrypt(passphrase)?;
        keys.insert(key.hash160(), key);
    }
    Ok(keys)
}

/// The most recently created change key, generating and persisting a
/// fresh one if the wallet has none yet.
pub fn change_key(store: &dyn WalletStore, passphrase: &str) -> Result<EcKey, WalletError> {
    let mut newest: Option<(chrono::DateTime<chrono::Utc>, StoredKey)> = None;
    for stored in store.get_key_list()? {
        if !stored.encrypted.is_change {
            continue;
        }
        let created = stored.encrypted.creation_time;
        if newest.as_ref().map(|(time, _)| created > *time).unwrap_or(true) {
            newest = Some((created, stored));
        }
    }

    if let Some((_, stored)) = newest {
        return to_encrypted_key(&stored)?.decrypt(passphrase);
    }

    let key = EcKey::generate(true, None);
    let encrypted = key.encrypt(passphrase)?;
    store.store_key(StoredKey {
        encrypted: wallet_state::EncryptedKeyRecord::from_encrypted(&encrypted),
        label: None,
    })?;
    Ok(key)
}
