//! Wallet-owned EC keypairs: the private scalar, its derived address, and
//! the metadata the wallet tracks per key (label, change flag, creation
//! time), plus passphrase-based encryption at rest.

use chrono::{DateTime, Utc};
use rand_core::OsRng;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use zeroize::{Zeroize, Zeroizing};

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::Argon2;

use crate::error::WalletError;
use crate::parameters::Network;

use super::Address;

/// A wallet-owned keypair: a private scalar and its public point, with the
/// bookkeeping the wallet needs to track how and when it was created.
///
/// The private scalar is wrapped so that dropping an `EcKey` scrubs it from
/// memory; nothing here ever implements `Debug`/`Display` for the private
/// half.
pub struct EcKey {
    private: Zeroizing<[u8; 32]>,
    public: PublicKey,
    /// A user-assigned label for this key's address, if any.
    pub label: Option<String>,
    /// Whether this key was generated internally to receive change from a
    /// spend, rather than handed out as a receive address.
    pub is_change: bool,
    pub creation_time: DateTime<Utc>,
}

impl EcKey {
    /// Generate a fresh keypair.
    pub fn generate(is_change: bool, label: Option<String>) -> EcKey {
        let secp = Secp256k1::new();
        let secret = SecretKey::new(&mut OsRng);
        let public = PublicKey::from_secret_key(&secp, &secret);
        EcKey {
            private: Zeroizing::new(secret.secret_bytes()),
            public,
            label,
            is_change,
            creation_time: Utc::now(),
        }
    }

    /// Reconstruct a keypair from a known private scalar, verifying that it
    /// produces the claimed public point.
    pub fn from_private_and_public(
        private: [u8; 32],
        public: PublicKey,
        is_change: bool,
        label: Option<String>,
        creation_time: DateTime<Utc>,
    ) -> Result<EcKey, WalletError> {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(&private).map_err(|_| WalletError::Key)?;
        let derived = PublicKey::from_secret_key(&secp, &secret);
        if derived != public {
            return Err(WalletError::Key);
        }
        Ok(EcKey {
            private: Zeroizing::new(private),
            public,
            label,
            is_change,
            creation_time,
        })
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn secret_key(&self) -> Result<SecretKey, WalletError> {
        SecretKey::from_slice(&self.private[..]).map_err(|_| WalletError::Key)
    }

    pub fn hash160(&self) -> [u8; 20] {
        Address::hash_payload(&self.public.serialize()[..])
    }

    pub fn address(&self, network: Network) -> Address {
        Address::PayToPublicKeyHash {
            network,
            pub_key_hash: self.hash160(),
        }
    }

    /// Encrypt the private scalar with a passphrase, for durable storage.
    ///
    /// The passphrase is stretched with Argon2id into a 256-bit AES key;
    /// the scalar is sealed under AES-256-GCM with a freshly drawn nonce.
    pub fn encrypt(&self, passphrase: &str) -> Result<EncryptedKey, WalletError> {
        use rand_core::RngCore;

        let mut salt = [0u8; 16];
        OsRng.fill_bytes(&mut salt);
        let key = derive_key(passphrase, &salt)?;

        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| WalletError::Key)?;
        let ciphertext = cipher
            .encrypt(nonce, self.private.as_slice())
            .map_err(|_| WalletError::Key)?;

        Ok(EncryptedKey {
            public: self.public,
            salt,
            nonce: nonce_bytes,
            ciphertext,
            label: self.label.clone(),
            is_change: self.is_change,
            creation_time: self.creation_time,
        })
    }
}

impl Drop for EcKey {
    fn drop(&mut self) {
        self.private.zeroize();
    }
}

/// An `EcKey` with its private scalar sealed under a passphrase, as stored
/// in the wallet store.
pub struct EncryptedKey {
    pub public: PublicKey,
    pub salt: [u8; 16],
    pub nonce: [u8; 12],
    pub ciphertext: Vec<u8>,
    pub label: Option<String>,
    pub is_change: bool,
    pub creation_time: DateTime<Utc>,
}

impl EncryptedKey {
    /// Unseal the private scalar, reconstructing a usable `EcKey`.
    pub fn decrypt(&self, passphrase: &str) -> Result<EcKey, WalletError> {
        let key = derive_key(passphrase, &self.salt)?;
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| WalletError::Key)?;
        let nonce = Nonce::from_slice(&self.nonce);
        let plaintext = cipher
            .decrypt(nonce, self.ciphertext.as_slice())
            .map_err(|_| WalletError::Key)?;

        let mut private = [0u8; 32];
        if plaintext.len() != 32 {
            return Err(WalletError::Key);
        }
        private.copy_from_slice(&plaintext);

        EcKey::from_private_and_public(
            private,
            self.public,
            self.is_change,
            self.label.clone(),
            self.creation_time,
        )
    }
}

fn derive_key(passphrase: &str, salt: &[u8; 16]) -> Result<[u8; 32], WalletError> {
    let mut key = [0u8; 32];
    Argon2::default()
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|_| WalletError::Key)?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypted_key_roundtrips() {
        let key = EcKey::generate(false, Some("receiving #1".into()));
        let original_hash160 = key.hash160();

        let encrypted = key.encrypt("correct horse battery staple").unwrap();
        let recovered = encrypted.decrypt("correct horse battery staple").unwrap();

        assert_eq!(recovered.hash160(), original_hash160);
        assert_eq!(recovered.label.as_deref(), Some("receiving #1"));
    }

    #[test]
    fn wrong_passphrase_fails_to_decrypt() {
        let key = EcKey::generate(true, None);
        let encrypted = key.encrypt("hunter2").unwrap();
        assert!(encrypted.decrypt("wrong passphrase").is_err());
    }
}
