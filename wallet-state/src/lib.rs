//! Durable storage for the wallet: headers, owned transactions, addresses,
//! and encrypted keys, behind the [`WalletStore`] trait.

pub mod config;
pub mod sled_store;
pub mod store;

pub use config::Config;
pub use sled_store::SledStore;
pub use store::{
    ChainHead, EncryptedKeyRecord, ReceiveOutput, SendTransaction, StoredAddress, StoredHeader,
    StoredKey, WalletStore,
};
