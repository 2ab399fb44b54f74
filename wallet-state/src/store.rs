//! The wallet store contract: a header/transaction/address/key database
//! kept behind a single trait so the rest of the workspace never depends
//! on the storage backend directly.

use chrono::{DateTime, Utc};
use primitive_types::U256;

use wallet_chain::block;
use wallet_chain::transaction;
use wallet_chain::transparent::{Address, EcKey, EncryptedKey};
use wallet_chain::WalletError;

/// A header as tracked by the wallet: the wire header plus the chain
/// bookkeeping the store needs (height, cumulative work, parent linkage,
/// on-chain flag, and which owned transactions it's known to match).
#[derive(Clone, Debug)]
pub struct StoredHeader {
    pub header: block::Header,
    pub height: block::Height,
    pub chain_work: U256,
    pub on_chain: bool,
    /// Hashes of owned transactions whose merkle proof matched this block.
    pub matched_transactions: Vec<transaction::Hash>,
}

/// A wallet-owned output observed in a received transaction.
#[derive(Clone, Debug)]
pub struct ReceiveOutput {
    pub tx_hash: transaction::Hash,
    pub vout: u32,
    pub value: u64,
    pub address: Address,
    pub is_change: bool,
    pub is_spent: bool,
    pub is_safe: bool,
    pub is_deleted: bool,
    pub is_coinbase: bool,
    pub block_hash: Option<block::Hash>,
}

/// A transaction built and broadcast by this wallet.
#[derive(Clone, Debug)]
pub struct SendTransaction {
    pub tx_hash: transaction::Hash,
    pub raw: Vec<u8>,
    pub fee: u64,
    pub block_hash: Option<block::Hash>,
    pub is_deleted: bool,
}

/// A wallet-tracked receive address, with its optional user label.
#[derive(Clone, Debug)]
pub struct StoredAddress {
    pub address: Address,
    pub label: Option<String>,
    pub is_change: bool,
}

/// A wallet-owned keypair as held in the store: always encrypted at rest.
#[derive(Clone, Debug)]
pub struct StoredKey {
    pub encrypted: EncryptedKeyRecord,
    pub label: Option<String>,
}

/// The durable form of an [`EncryptedKey`] (the store never keeps one in
/// memory, only the sealed bytes).
#[derive(Clone, Debug)]
pub struct EncryptedKeyRecord {
    pub public: Vec<u8>,
    pub salt: [u8; 16],
    pub nonce: [u8; 12],
    pub ciphertext: Vec<u8>,
    pub is_change: bool,
    pub creation_time: DateTime<Utc>,
}

impl EncryptedKeyRecord {
    pub fn from_encrypted(key: &EncryptedKey) -> EncryptedKeyRecord {
        EncryptedKeyRecord {
            public: key.public.serialize().to_vec(),
            salt: key.salt,
            nonce: key.nonce,
            ciphertext: key.ciphertext.clone(),
            is_change: key.is_change,
            creation_time: key.creation_time,
        }
    }
}

/// Current chain head: hash, height, and cumulative work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainHead {
    pub hash: block::Hash,
    pub height: block::Height,
    pub chain_work: U256,
}

/// The operation contract every wallet store backend must implement.
///
/// All write operations are serialized by a single store-wide mutex in the
/// backend; read operations may run concurrently with each other.
pub trait WalletStore {
    /// The current chain head, or `None` for an empty store.
    fn chain_head(&self) -> Result<Option<ChainHead>, WalletError>;
    fn set_chain_head(&self, head: ChainHead) -> Result<(), WalletError>;

    /// Whether `hash` has not already been persisted as a header.
    fn is_new_block(&self, hash: block::Hash) -> Result<bool, WalletError>;

    fn store_header(&self, header: StoredHeader) -> Result<(), WalletError>;
    fn get_header(&self, hash: block::Hash) -> Result<Option<StoredHeader>, WalletError>;
    fn get_child_header(&self, parent: block::Hash) -> Result<Option<StoredHeader>, WalletError>;
    fn get_block_hash(&self, height: block::Height) -> Result<Option<block::Hash>, WalletError>;

    /// Append `tx_hashes` to a header's matched-transaction list.
    fn update_matches(
        &self,
        hash: block::Hash,
        tx_hashes: &[transaction::Hash],
    ) -> Result<(), WalletError>;

    /// Up to `max` block hashes starting at `start_height`, stopping early
    /// at `stop_hash` if given.
    fn get_chain_list(
        &self,
        start_height: block::Height,
        stop_hash: Option<block::Hash>,
        max: usize,
    ) -> Result<Vec<block::Hash>, WalletError>;

    /// The height from which a rescan covering `since` must begin.
    fn get_rescan_height(&self, since: DateTime<Utc>) -> Result<block::Height, WalletError>;

    /// Ancestors of `hash`, ascending, up to (but not including) the first
    /// on-chain ancestor. Fails with `WalletError::BlockNotFound` if a
    /// parent pointer is missing before an on-chain header is reached.
    fn get_junction(&self, hash: block::Hash) -> Result<Vec<StoredHeader>, WalletError>;

    /// Atomically flip `onChain` for `segment` (ascending) and rewrite the
    /// confirmation status of affected receive/send transactions.
    fn set_chain_segment(
        &self,
        unwind: &[block::Hash],
        segment: &[StoredHeader],
    ) -> Result<(), WalletError>;

    fn store_receive_tx(&self, output: ReceiveOutput) -> Result<(), WalletError>;
    fn get_receive_tx_list(&self) -> Result<Vec<ReceiveOutput>, WalletError>;

    fn store_send_tx(&self, tx: SendTransaction) -> Result<(), WalletError>;
    fn get_send_tx_list(&self) -> Result<Vec<SendTransaction>, WalletError>;
    fn get_send_tx(&self, hash: transaction::Hash) -> Result<Option<SendTransaction>, WalletError>;

    fn store_address(&self, address: StoredAddress) -> Result<(), WalletError>;
    fn get_address_list(&self) -> Result<Vec<StoredAddress>, WalletError>;
    fn delete_address(&self, address: &Address) -> Result<(), WalletError>;
    fn set_address_label(&self, address: &Address, label: Option<String>) -> Result<(), WalletError>;

    fn store_key(&self, key: StoredKey) -> Result<(), WalletError>;
    fn get_key_list(&self) -> Result<Vec<StoredKey>, WalletError>;
    fn set_key_label(&self, public: &[u8], label: Option<String>) -> Result<(), WalletError>;

    fn is_new_transaction(&self, hash: transaction::Hash) -> Result<bool, WalletError>;
    fn set_tx_spent(&self, tx_hash: transaction::Hash, vout: u32, spent: bool) -> Result<(), WalletError>;
    fn set_tx_safe(&self, tx_hash: transaction::Hash, vout: u32, safe: bool) -> Result<(), WalletError>;
    fn set_receive_tx_delete(&self, tx_hash: transaction::Hash, vout: u32, deleted: bool) -> Result<(), WalletError>;
    fn set_send_tx_delete(&self, tx_hash: transaction::Hash, deleted: bool) -> Result<(), WalletError>;

    /// `currentHeight - blockHeight + 1`, or 0 if the transaction is
    /// unconfirmed or unknown.
    fn get_tx_depth(&self, tx_hash: transaction::Hash) -> Result<u32, WalletError>;
}
