//! A sled-backed [`WalletStore`].
//!
//! Each concern gets its own [`sled::Tree`], mirroring the teacher's
//! per-concern-tree layout; records are serialized with `bincode` over a
//! small on-disk DTO, since the wallet's own domain types (`Address`,
//! `EcKey`) aren't `serde`-derivable without leaking their internal
//! representation onto the wire.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

use wallet_chain::block;
use wallet_chain::transaction;
use wallet_chain::transparent::Address;
use wallet_chain::{BitcoinDeserialize, BitcoinSerialize, WalletError};

use crate::config::Config;
use crate::store::{
    ChainHead, EncryptedKeyRecord, ReceiveOutput, SendTransaction, StoredAddress, StoredHeader,
    StoredKey, WalletStore,
};

fn store_err<E: std::fmt::Display>(e: E) -> WalletError {
    WalletError::Store(e.to_string())
}

#[derive(Serialize, Deserialize)]
struct ChainHeadRecord {
    hash: [u8; 32],
    height: u32,
    chain_work: [u8; 32],
}

#[derive(Serialize, Deserialize)]
struct HeaderRecord {
    header: Vec<u8>,
    height: u32,
    chain_work: [u8; 32],
    on_chain: bool,
    matched_transactions: Vec<[u8; 32]>,
}

#[derive(Serialize, Deserialize)]
struct ReceiveOutputRecord {
    tx_hash: [u8; 32],
    vout: u32,
    value: u64,
    address: Vec<u8>,
    is_change: bool,
    is_spent: bool,
    is_safe: bool,
    is_deleted: bool,
    is_coinbase: bool,
    block_hash: Option<[u8; 32]>,
}

#[derive(Serialize, Deserialize)]
struct SendTransactionRecord {
    raw: Vec<u8>,
    fee: u64,
    block_hash: Option<[u8; 32]>,
    is_deleted: bool,
}

#[derive(Serialize, Deserialize)]
struct AddressRecord {
    address: Vec<u8>,
    label: Option<String>,
    is_change: bool,
}

#[derive(Serialize, Deserialize)]
struct KeyRecord {
    public: Vec<u8>,
    salt: [u8; 16],
    nonce: [u8; 12],
    ciphertext: Vec<u8>,
    is_change: bool,
    creation_time: DateTime<Utc>,
    label: Option<String>,
}

fn u256_to_bytes(value: U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    value.to_big_endian(&mut out);
    out
}

fn u256_from_bytes(bytes: &[u8; 32]) -> U256 {
    U256::from_big_endian(bytes)
}

/// The sled-backed wallet store.
///
/// All writes go through `write_lock` to serialize them, per the store's
/// single-writer contract; reads run directly against sled's own
/// concurrency, which is safe without the lock.
pub struct SledStore {
    write_lock: Mutex<()>,
    headers: sled::Tree,
    hash_by_height: sled::Tree,
    chain_head: sled::Tree,
    receive_outputs: sled::Tree,
    send_transactions: sled::Tree,
    addresses: sled::Tree,
    keys: sled::Tree,
}

const CHAIN_HEAD_KEY: &[u8] = b"head";

impl SledStore {
    pub fn open(config: &Config) -> Result<SledStore, WalletError> {
        let db = sled::open(config.data_dir.join("wallet.sled")).map_err(store_err)?;
        Ok(SledStore {
            write_lock: Mutex::new(()),
            headers: db.open_tree("headers").map_err(store_err)?,
            hash_by_height: db.open_tree("hash_by_height").map_err(store_err)?,
            chain_head: db.open_tree("chain_head").map_err(store_err)?,
            receive_outputs: db.open_tree("receive_outputs").map_err(store_err)?,
            send_transactions: db.open_tree("send_transactions").map_err(store_err)?,
            addresses: db.open_tree("addresses").map_err(store_err)?,
            keys: db.open_tree("keys").map_err(store_err)?,
        })
    }

    fn header_record_to_stored(&self, record: HeaderRecord) -> Result<StoredHeader, WalletError> {
        Ok(StoredHeader {
            header: block::Header::bitcoin_deserialize(std::io::Cursor::new(record.header))
                .map_err(WalletError::from)?,
            height: block::Height(record.height),
            chain_work: u256_from_bytes(&record.chain_work),
            on_chain: record.on_chain,
            matched_transactions: record
                .matched_transactions
                .into_iter()
                .map(transaction::Hash)
                .collect(),
        })
    }

    fn stored_to_header_record(header: &StoredHeader) -> Result<HeaderRecord, WalletError> {
        Ok(HeaderRecord {
            header: header.header.bitcoin_serialize_to_vec(),
            height: header.height.0,
            chain_work: u256_to_bytes(header.chain_work),
            on_chain: header.on_chain,
            matched_transactions: header.matched_transactions.iter().map(|h| h.0).collect(),
        })
    }
}

impl WalletStore for SledStore {
    fn chain_head(&self) -> Result<Option<ChainHead>, WalletError> {
        match self.chain_head.get(CHAIN_HEAD_KEY).map_err(store_err)? {
            Some(bytes) => {
                let record: ChainHeadRecord = bincode::deserialize(&bytes).map_err(store_err)?;
                Ok(Some(ChainHead {
                    hash: block::Hash(record.hash),
                    height: block::Height(record.height),
                    chain_work: u256_from_bytes(&record.chain_work),
                }))
            }
            None => Ok(None),
        }
    }

    fn set_chain_head(&self, head: ChainHead) -> Result<(), WalletError> {
        let _guard = self.write_lock.lock().expect("write lock poisoned");
        let record = ChainHeadRecord {
            hash: head.hash.0,
            height: head.height.0,
            chain_work: u256_to_bytes(head.chain_work),
        };
        let bytes = bincode::serialize(&record).map_err(store_err)?;
        self.chain_head
            .insert(CHAIN_HEAD_KEY, bytes)
            .map_err(store_err)?;
        Ok(())
    }

    fn is_new_block(&self, hash: block::Hash) -> Result<bool, WalletError> {
        Ok(!self.headers.contains_key(hash.0).map_err(store_err)?)
    }

    fn store_header(&self, header: StoredHeader) -> Result<(), WalletError> {
        let _guard = self.write_lock.lock().expect("write lock poisoned");
        let hash = header.header.hash();
        let record = Self::stored_to_header_record(&header)?;
        let bytes = bincode::serialize(&record).map_err(store_err)?;
        self.headers.insert(hash.0, bytes).map_err(store_err)?;
        self.hash_by_height
            .insert(header.height.0.to_be_bytes(), hash.0.to_vec())
            .map_err(store_err)?;
        Ok(())
    }

    fn get_header(&self, hash: block::Hash) -> Result<Option<StoredHeader>, WalletError> {
        match self.headers.get(hash.0).map_err(store_err)? {
            Some(bytes) => {
                let record: HeaderRecord = bincode::deserialize(&bytes).map_err(store_err)?;
                Ok(Some(self.header_record_to_stored(record)?))
            }
            None => Ok(None),
        }
    }

    fn get_child_header(&self, parent: block::Hash) -> Result<Option<StoredHeader>, WalletError> {
        for entry in self.headers.iter() {
            let (_, bytes) = entry.map_err(store_err)?;
            let record: HeaderRecord = bincode::deserialize(&bytes).map_err(store_err)?;
            let stored = self.header_record_to_stored(record)?;
            if stored.header.previous_block_hash == parent {
                return Ok(Some(stored));
            }
        }
        Ok(None)
    }

    fn get_block_hash(&self, height: block::Height) -> Result<Option<block::Hash>, WalletError> {
        match self
            .hash_by_height
            .get(height.0.to_be_bytes())
            .map_err(store_err)?
        {
            Some(bytes) => {
                let mut hash = [0u8; 32];
                hash.copy_from_slice(&bytes);
                Ok(Some(block::Hash(hash)))
            }
            None => Ok(None),
        }
    }

    fn update_matches(
        &self,
        hash: block::Hash,
        tx_hashes: &[transaction::Hash],
    ) -> Result<(), WalletError> {
        let _guard = self.write_lock.lock().expect("write lock poisoned");
        let bytes = self
            .headers
            .get(hash.0)
            .map_err(store_err)?
            .ok_or(WalletError::BlockNotFound)?;
        let mut record: HeaderRecord = bincode::deserialize(&bytes).map_err(store_err)?;
        for tx_hash in tx_hashes {
            if !record.matched_transactions.contains(&tx_hash.0) {
                record.matched_transactions.push(tx_hash.0);
            }
        }
        let bytes = bincode::serialize(&record).map_err(store_err)?;
        self.headers.insert(hash.0, bytes).map_err(store_err)?;
        Ok(())
    }

    fn get_chain_list(
        &self,
        start_height: block::Height,
        stop_hash: Option<block::Hash>,
        max: usize,
    ) -> Result<Vec<block::Hash>, WalletError> {
        let mut out = Vec::new();
        let mut height = start_height.0;
        loop {
            if out.len() >= max {
                break;
            }
            match self.get_block_hash(block::Height(height))? {
                Some(hash) => {
                    out.push(hash);
                    if Some(hash) == stop_hash {
                        break;
                    }
                    height += 1;
                }
                None => break,
            }
        }
        Ok(out)
    }

    fn get_rescan_height(&self, since: DateTime<Utc>) -> Result<block::Height, WalletError> {
        let mut earliest = block::Height(0);
        for entry in self.headers.iter() {
            let (_, bytes) = entry.map_err(store_err)?;
            let record: HeaderRecord = bincode::deserialize(&bytes).map_err(store_err)?;
            let stored = self.header_record_to_stored(record)?;
            if stored.header.time >= since && (earliest.0 == 0 || stored.height.0 < earliest.0) {
                earliest = stored.height;
            }
        }
        Ok(earliest)
    }

    fn get_junction(&self, hash: block::Hash) -> Result<Vec<StoredHeader>, WalletError> {
        let mut segment = Vec::new();
        let mut current = self.get_header(hash)?.ok_or(WalletError::BlockNotFound)?;
        loop {
            if current.on_chain {
                break;
            }
            let parent_hash = current.header.previous_block_hash;
            segment.push(current.clone());
            current = self
                .get_header(parent_hash)?
                .ok_or(WalletError::BlockNotFound)?;
        }
        segment.reverse();
        Ok(segment)
    }

    fn set_chain_segment(
        &self,
        unwind: &[block::Hash],
        segment: &[StoredHeader],
    ) -> Result<(), WalletError> {
        let _guard = self.write_lock.lock().expect("write lock poisoned");
        for hash in unwind {
            if let Some(bytes) = self.headers.get(hash.0).map_err(store_err)? {
                let mut record: HeaderRecord = bincode::deserialize(&bytes).map_err(store_err)?;
                record.on_chain = false;
                let bytes = bincode::serialize(&record).map_err(store_err)?;
                self.headers.insert(hash.0, bytes).map_err(store_err)?;
            }
        }
        for header in segment {
            let hash = header.header.hash();
            let mut record = Self::stored_to_header_record(header)?;
            record.on_chain = true;
            let bytes = bincode::serialize(&record).map_err(store_err)?;
            self.headers.insert(hash.0, bytes).map_err(store_err)?;
            self.hash_by_height
                .insert(header.height.0.to_be_bytes(), hash.0.to_vec())
                .map_err(store_err)?;
        }
        Ok(())
    }

    fn store_receive_tx(&self, output: ReceiveOutput) -> Result<(), WalletError> {
        let _guard = self.write_lock.lock().expect("write lock poisoned");
        let key = receive_key(output.tx_hash, output.vout);
        let record = ReceiveOutputRecord {
            tx_hash: output.tx_hash.0,
            vout: output.vout,
            value: output.value,
            address: output
                .address
                .bitcoin_serialize_to_vec()
                .map_err(|e| WalletError::Store(e.to_string()))?,
            is_change: output.is_change,
            is_spent: output.is_spent,
            is_safe: output.is_safe,
            is_deleted: output.is_deleted,
            is_coinbase: output.is_coinbase,
            block_hash: output.block_hash.map(|h| h.0),
        };
        let bytes = bincode::serialize(&record).map_err(store_err)?;
        self.receive_outputs.insert(key, bytes).map_err(store_err)?;
        Ok(())
    }

    fn get_receive_tx_list(&self) -> Result<Vec<ReceiveOutput>, WalletError> {
        let mut out = Vec::new();
        for entry in self.receive_outputs.iter() {
            let (_, bytes) = entry.map_err(store_err)?;
            out.push(receive_output_from_record(
                bincode::deserialize(&bytes).map_err(store_err)?,
            )?);
        }
        Ok(out)
    }

    fn store_send_tx(&self, tx: SendTransaction) -> Result<(), WalletError> {
        let _guard = self.write_lock.lock().expect("write lock poisoned");
        let record = SendTransactionRecord {
            raw: tx.raw,
            fee: tx.fee,
            block_hash: tx.block_hash.map(|h| h.0),
            is_deleted: tx.is_deleted,
        };
        let bytes = bincode::serialize(&record).map_err(store_err)?;
        self.send_transactions
            .insert(tx.tx_hash.0, bytes)
            .map_err(store_err)?;
        Ok(())
    }

    fn get_send_tx_list(&self) -> Result<Vec<SendTransaction>, WalletError> {
        let mut out = Vec::new();
        for entry in self.send_transactions.iter() {
            let (key, bytes) = entry.map_err(store_err)?;
            let record: SendTransactionRecord = bincode::deserialize(&bytes).map_err(store_err)?;
            out.push(send_tx_from_record(&key, record)?);
        }
        Ok(out)
    }

    fn get_send_tx(&self, hash: transaction::Hash) -> Result<Option<SendTransaction>, WalletError> {
        match self.send_transactions.get(hash.0).map_err(store_err)? {
            Some(bytes) => {
                let record: SendTransactionRecord = bincode::deserialize(&bytes).map_err(store_err)?;
                Ok(Some(send_tx_from_record(&hash.0, record)?))
            }
            None => Ok(None),
        }
    }

    fn store_address(&self, address: StoredAddress) -> Result<(), WalletError> {
        let _guard = self.write_lock.lock().expect("write lock poisoned");
        let key = address
            .address
            .bitcoin_serialize_to_vec()
            .map_err(|e| WalletError::Store(e.to_string()))?;
        let record = AddressRecord {
            address: key.clone(),
            label: address.label,
            is_change: address.is_change,
        };
        let bytes = bincode::serialize(&record).map_err(store_err)?;
        self.addresses.insert(key, bytes).map_err(store_err)?;
        Ok(())
    }

    fn get_address_list(&self) -> Result<Vec<StoredAddress>, WalletError> {
        let mut out = Vec::new();
        for entry in self.addresses.iter() {
            let (_, bytes) = entry.map_err(store_err)?;
            let record: AddressRecord = bincode::deserialize(&bytes).map_err(store_err)?;
            out.push(StoredAddress {
                address: Address::bitcoin_deserialize(std::io::Cursor::new(record.address))
                    .map_err(WalletError::from)?,
                label: record.label,
                is_change: record.is_change,
            });
        }
        Ok(out)
    }

    fn delete_address(&self, address: &Address) -> Result<(), WalletError> {
        let _guard = self.write_lock.lock().expect("write lock poisoned");
        let key = address
            .bitcoin_serialize_to_vec()
            .map_err(|e| WalletError::Store(e.to_string()))?;
        self.addresses.remove(key).map_err(store_err)?;
        Ok(())
    }

    fn set_address_label(&self, address: &Address, label: Option<String>) -> Result<(), WalletError> {
        let _guard = self.write_lock.lock().expect("write lock poisoned");
        let key = address
            .bitcoin_serialize_to_vec()
            .map_err(|e| WalletError::Store(e.to_string()))?;
        if let Some(bytes) = self.addresses.get(&key).map_err(store_err)? {
            let mut record: AddressRecord = bincode::deserialize(&bytes).map_err(store_err)?;
            record.label = label;
            let bytes = bincode::serialize(&record).map_err(store_err)?;
            self.addresses.insert(key, bytes).map_err(store_err)?;
        }
        Ok(())
    }

    fn store_key(&self, key: StoredKey) -> Result<(), WalletError> {
        let _guard = self.write_lock.lock().expect("write lock poisoned");
        let record = key_record(&key);
        let bytes = bincode::serialize(&record).map_err(store_err)?;
        self.keys
            .insert(key.encrypted.public.clone(), bytes)
            .map_err(store_err)?;
        Ok(())
    }

    fn get_key_list(&self) -> Result<Vec<StoredKey>, WalletError> {
        let mut out = Vec::new();
        for entry in self.keys.iter() {
            let (_, bytes) = entry.map_err(store_err)?;
            let record: KeyRecord = bincode::deserialize(&bytes).map_err(store_err)?;
            out.push(stored_key_from_record(record));
        }
        Ok(out)
    }

    fn set_key_label(&self, public: &[u8], label: Option<String>) -> Result<(), WalletError> {
        let _guard = self.write_lock.lock().expect("write lock poisoned");
        if let Some(bytes) = self.keys.get(public).map_err(store_err)? {
            let mut record: KeyRecord = bincode::deserialize(&bytes).map_err(store_err)?;
            record.label = label;
            let bytes = bincode::serialize(&record).map_err(store_err)?;
            self.keys.insert(public, bytes).map_err(store_err)?;
        }
        Ok(())
    }

    fn is_new_transaction(&self, hash: transaction::Hash) -> Result<bool, WalletError> {
        let has_receive = self
            .receive_outputs
            .scan_prefix(hash.0)
            .next()
            .is_some();
        let has_send = self.send_transactions.contains_key(hash.0).map_err(store_err)?;
        Ok(!has_receive && !has_send)
    }

    fn set_tx_spent(&self, tx_hash: transaction::Hash, vout: u32, spent: bool) -> Result<(), WalletError> {
        self.update_receive_flag(tx_hash, vout, |r| r.is_spent = spent)
    }

    fn set_tx_safe(&self, tx_hash: transaction::Hash, vout: u32, safe: bool) -> Result<(), WalletError> {
        self.update_receive_flag(tx_hash, vout, |r| r.is_safe = safe)
    }

    fn set_receive_tx_delete(&self, tx_hash: transaction::Hash, vout: u32, deleted: bool) -> Result<(), WalletError> {
        self.update_receive_flag(tx_hash, vout, |r| r.is_deleted = deleted)
    }

    fn set_send_tx_delete(&self, tx_hash: transaction::Hash, deleted: bool) -> Result<(), WalletError> {
        let _guard = self.write_lock.lock().expect("write lock poisoned");
        if let Some(bytes) = self.send_transactions.get(tx_hash.0).map_err(store_err)? {
            let mut record: SendTransactionRecord = bincode::deserialize(&bytes).map_err(store_err)?;
            record.is_deleted = deleted;
            let bytes = bincode::serialize(&record).map_err(store_err)?;
            self.send_transactions
                .insert(tx_hash.0, bytes)
                .map_err(store_err)?;
        }
        Ok(())
    }

    fn get_tx_depth(&self, tx_hash: transaction::Hash) -> Result<u32, WalletError> {
        let current_height = match self.chain_head()? {
            Some(head) => head.height.0,
            None => return Ok(0),
        };
        for entry in self.receive_outputs.scan_prefix(tx_hash.0) {
            let (_, bytes) = entry.map_err(store_err)?;
            let record: ReceiveOutputRecord = bincode::deserialize(&bytes).map_err(store_err)?;
            if let Some(block_hash) = record.block_hash {
                if let Some(header) = self.get_header(block::Hash(block_hash))? {
                    if header.on_chain && header.height.0 <= current_height {
                        return Ok(current_height - header.height.0 + 1);
                    }
                }
            }
        }
        Ok(0)
    }
}

impl SledStore {
    fn update_receive_flag(
        &self,
        tx_hash: transaction::Hash,
        vout: u32,
        apply: impl FnOnce(&mut ReceiveOutputRecord),
    ) -> Result<(), WalletError> {
        let _guard = self.write_lock.lock().expect("write lock poisoned");
        let key = receive_key(tx_hash, vout);
        if let Some(bytes) = self.receive_outputs.get(&key).map_err(store_err)? {
            let mut record: ReceiveOutputRecord = bincode::deserialize(&bytes).map_err(store_err)?;
            apply(&mut record);
            let bytes = bincode::serialize(&record).map_err(store_err)?;
            self.receive_outputs.insert(key, bytes).map_err(store_err)?;
        }
        Ok(())
    }
}

fn receive_key(tx_hash: transaction::Hash, vout: u32) -> Vec<u8> {
    let mut key = tx_hash.0.to_vec();
    key.extend_from_slice(&vout.to_be_bytes());
    key
}

fn receive_output_from_record(record: ReceiveOutputRecord) -> Result<ReceiveOutput, WalletError> {
    Ok(ReceiveOutput {
        tx_hash: transaction::Hash(record.tx_hash),
        vout: record.vout,
        value: record.value,
        address: Address::bitcoin_deserialize(std::io::Cursor::new(record.address))
            .map_err(WalletError::from)?,
        is_change: record.is_change,
        is_spent: record.is_spent,
        is_safe: record.is_safe,
        is_deleted: record.is_deleted,
        is_coinbase: record.is_coinbase,
        block_hash: record.block_hash.map(block::Hash),
    })
}

fn send_tx_from_record(
    key: &[u8],
    record: SendTransactionRecord,
) -> Result<SendTransaction, WalletError> {
    let mut hash = [0u8; 32];
    hash.copy_from_slice(key);
    Ok(SendTransaction {
        tx_hash: transaction::Hash(hash),
        raw: record.raw,
        fee: record.fee,
        block_hash: record.block_hash.map(block::Hash),
        is_deleted: record.is_deleted,
    })
}

fn key_record(key: &StoredKey) -> KeyRecord {
    KeyRecord {
        public: key.encrypted.public.clone(),
        salt: key.encrypted.salt,
        nonce: key.encrypted.nonce,
        ciphertext: key.encrypted.ciphertext.clone(),
        is_change: key.encrypted.is_change,
        creation_time: key.encrypted.creation_time,
        label: key.label.clone(),
    }
}

fn stored_key_from_record(record: KeyRecord) -> StoredKey {
    StoredKey {
        encrypted: EncryptedKeyRecord {
            public: record.public,
            salt: record.salt,
            nonce: record.nonce,
            ciphertext: record.ciphertext,
            is_change: record.is_change,
            creation_time: record.creation_time,
        },
        label: record.label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use chrono::TimeZone;
    use wallet_chain::parameters::Network;
    use wallet_chain::work::difficulty::CompactDifficulty;

    fn temp_store() -> SledStore {
        let dir = tempdir::TempDir::new("wallet-state-test").unwrap();
        let config = Config {
            data_dir: dir.into_path(),
            network: Network::Testnet,
        };
        SledStore::open(&config).unwrap()
    }

    fn sample_header(prev: block::Hash) -> block::Header {
        block::Header::new(
            1,
            prev,
            wallet_chain::block::merkle::Root([3u8; 32]),
            Utc.timestamp(1_600_000_000, 0),
            CompactDifficulty(0x1d00_ffff),
            0,
        )
    }

    #[test]
    fn stores_and_retrieves_chain_head() {
        let store = temp_store();
        assert!(store.chain_head().unwrap().is_none());

        let head = ChainHead {
            hash: block::Hash([1u8; 32]),
            height: block::Height(10),
            chain_work: U256::from(100u64),
        };
        store.set_chain_head(head).unwrap();
        assert_eq!(store.chain_head().unwrap(), Some(head));
    }

    #[test]
    fn stores_and_retrieves_headers_by_hash_and_height() {
        let store = temp_store();
        let header = sample_header(block::Hash([0u8; 32]));
        let hash = header.hash();

        store
            .store_header(StoredHeader {
                header,
                height: block::Height(1),
                chain_work: U256::from(1u64),
                on_chain: true,
                matched_transactions: Vec::new(),
            })
            .unwrap();

        assert!(!store.is_new_block(hash).unwrap());
        assert_eq!(store.get_block_hash(block::Height(1)).unwrap(), Some(hash));
        assert!(store.get_header(hash).unwrap().is_some());
    }

    #[test]
    fn receive_output_spent_flag_round_trips() {
        let store = temp_store();
        let tx_hash = transaction::Hash([9u8; 32]);
        store
            .store_receive_tx(ReceiveOutput {
                tx_hash,
                vout: 0,
                value: 1000,
                address: Address::PayToPublicKeyHash {
                    network: Network::Testnet,
                    pub_key_hash: [2u8; 20],
                },
                is_change: false,
                is_spent: false,
                is_safe: true,
                is_deleted: false,
                is_coinbase: false,
                block_hash: None,
            })
            .unwrap();

        store.set_tx_spent(tx_hash, 0, true).unwrap();
        let list = store.get_receive_tx_list().unwrap();
        assert_eq!(list.len(), 1);
        assert!(list[0].is_spent);
    }
}
