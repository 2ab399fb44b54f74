//! The Chain Engine: maintains the best header chain by cumulative work,
//! handling reorgs and the orphan headers they can produce.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use wallet_chain::block;
use wallet_chain::parameters::Network;
use wallet_chain::transaction;
use wallet_chain::WalletError;

use wallet_state::{ChainHead, StoredHeader, WalletStore};

use crate::check;

/// What `connect` did with a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// The header (and any matched transactions) were already known.
    AlreadyKnown,
    /// The header's parent isn't stored yet; it was queued as an orphan.
    /// The caller should request `parent` from a peer.
    NeedsParent(block::Hash),
    /// The header extended a side branch without becoming the best chain.
    Extended,
    /// The header became part of a new best chain.
    NewBestChain,
}

/// Headers received out of order, queued by the parent hash they're
/// waiting on. An SPV wallet has no way to backfill history itself, so
/// orphans just wait for the missing parent to arrive from a peer.
#[derive(Default)]
pub struct OrphanPool {
    by_parent: HashMap<block::Hash, Vec<(block::Header, Vec<transaction::Hash>)>>,
}

impl OrphanPool {
    pub fn new() -> OrphanPool {
        OrphanPool::default()
    }

    fn insert(&mut self, header: block::Header, matched: Vec<transaction::Hash>) {
        self.by_parent
            .entry(header.previous_block_hash)
            .or_insert_with(Vec::new)
            .push((header, matched));
    }

    fn take_children(&mut self, parent: block::Hash) -> Vec<(block::Header, Vec<transaction::Hash>)> {
        self.by_parent.remove(&parent).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_parent.values().map(Vec::len).sum()
    }
}

/// Connects `header` (with any transaction hashes a `merkleblock` proof
/// already matched to it) to the wallet's header chain, per the Chain
/// Engine's `connect` entry point.
pub fn connect(
    store: &dyn WalletStore,
    orphans: &mut OrphanPool,
    network: Network,
    header: block::Header,
    matched: Vec<transaction::Hash>,
    now: DateTime<Utc>,
) -> Result<ConnectOutcome, WalletError> {
    let hash = header.hash();

    if !store.is_new_block(hash)? {
        store.update_matches(hash, &matched)?;
        return Ok(ConnectOutcome::AlreadyKnown);
    }

    let parent_hash = header.previous_block_hash;
    let parent = match store.get_header(parent_hash)? {
        Some(parent) => parent,
        None => {
            orphans.insert(header, matched);
            return Ok(ConnectOutcome::NeedsParent(parent_hash));
        }
    };

    let height = parent.height.next();
    let work = header
        .difficulty_threshold
        .to_expanded()
        .map_err(|_| WalletError::Verification(format!("unparseable target at height {:?}", height)))?
        .work();
    let chain_work = parent.chain_work + work;

    store.store_header(StoredHeader {
        header,
        height,
        chain_work,
        on_chain: false,
        matched_transactions: matched,
    })?;

    let outcome = maybe_reorganize(store, network, hash, chain_work, now)?;

    let mut queue = vec![hash];
    while let Some(parent_hash) = queue.pop() {
        for (child_header, child_matched) in orphans.take_children(parent_hash) {
            let child_hash = child_header.hash();
            match connect(store, orphans, network, child_header, child_matched, now) {
                Ok(_) => queue.push(child_hash),
                Err(e) => warn!(error = %e, hash = %child_hash, "failed to connect drained orphan"),
            }
        }
    }

    Ok(outcome)
}

fn maybe_reorganize(
    store: &dyn WalletStore,
    network: Network,
    hash: block::Hash,
    chain_work: primitive_types::U256,
    now: DateTime<Utc>,
) -> Result<ConnectOutcome, WalletError> {
    let best_chain_work = store
        .chain_head()?
        .map(|head| head.chain_work)
        .unwrap_or_default();

    if chain_work <= best_chain_work {
        return Ok(ConnectOutcome::Extended);
    }

    let junction = store.get_junction(hash)?;
    let fork_point_height = junction
        .first()
        .expect("junction for a newly-stored, not-yet-on-chain header is never empty")
        .height
        .previous()
        .unwrap_or(block::Height(0));

    for candidate in &junction {
        let candidate_hash = candidate.header.hash();
        if let Err(e) = check::difficulty_is_valid(&candidate.header, &candidate_hash) {
            debug!(error = %e, hash = %candidate_hash, "reorg candidate failed difficulty check");
            return Ok(ConnectOutcome::Extended);
        }
        if let Err(e) = check::checkpoint_is_valid(network, candidate.height, candidate_hash) {
            debug!(error = %e, hash = %candidate_hash, "reorg candidate failed checkpoint check");
            return Ok(ConnectOutcome::Extended);
        }
        if let Err(e) = check::time_is_valid_at(&candidate.header, now) {
            debug!(error = %e, hash = %candidate_hash, "reorg candidate failed time check");
            return Ok(ConnectOutcome::Extended);
        }
    }

    let old_head_height = store
        .chain_head()?
        .map(|head| head.height)
        .unwrap_or(fork_point_height);

    let mut unwind = Vec::new();
    let mut height = fork_point_height.next();
    while height.0 <= old_head_height.0 {
        if let Some(old_hash) = store.get_block_hash(height)? {
            unwind.push(old_hash);
        }
        height = height.next();
    }

    store.set_chain_segment(&unwind, &junction)?;

    let new_head = junction
        .last()
        .expect("junction is non-empty")
        .clone();
    store.set_chain_head(ChainHead {
        hash: new_head.header.hash(),
        height: new_head.height,
        chain_work: new_head.chain_work,
    })?;

    Ok(ConnectOutcome::NewBestChain)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use wallet_chain::work::difficulty::CompactDifficulty;
    use wallet_state::{Config, SledStore};

    fn temp_store() -> (tempdir::TempDir, SledStore) {
        let dir = tempdir::TempDir::new("wallet-consensus-chain").unwrap();
        let config = Config::with_data_dir(Network::Mainnet, dir.path().to_path_buf());
        let store = SledStore::open(&config).unwrap();
        (dir, store)
    }

    fn header(previous_block_hash: block::Hash, nonce: u32) -> block::Header {
        block::Header::new(
            1,
            previous_block_hash,
            block::merkle::Root([0u8; 32]),
            Utc::now(),
            CompactDifficulty(0x1d00_ffff),
            nonce,
        )
    }

    /// Seeds a store with a lone on-chain header whose own stored
    /// `chain_work` is zero, while the recorded chain head carries an
    /// artificially large `chain_work`. Every header that extends it then
    /// has `chain_work` far below the head's, so `connect` always takes the
    /// `Extended` branch without ever reaching the proof-of-work check
    /// (which needs a genuinely mined header to pass).
    fn seeded_store_with_unreachable_head() -> (tempdir::TempDir, SledStore, block::Hash) {
        let (dir, store) = temp_store();
        let root = header(block::Hash([0u8; 32]), 0);
        let root_hash = root.hash();
        store
            .store_header(StoredHeader {
                header: root,
                height: block::Height(0),
                chain_work: primitive_types::U256::zero(),
                on_chain: true,
                matched_transactions: vec![],
            })
            .unwrap();
        store
            .set_chain_head(ChainHead {
                hash: root_hash,
                height: block::Height(0),
                chain_work: primitive_types::U256::from(u64::MAX),
            })
            .unwrap();
        (dir, store, root_hash)
    }

    #[test]
    fn unknown_parent_is_queued_as_orphan() {
        let (_dir, store) = temp_store();
        let mut orphans = OrphanPool::new();
        let missing_parent = block::Hash([0xAAu8; 32]);
        let child = header(missing_parent, 1);

        let outcome = connect(&store, &mut orphans, Network::Mainnet, child, vec![], Utc::now()).unwrap();

        assert_eq!(outcome, ConnectOutcome::NeedsParent(missing_parent));
        assert_eq!(orphans.len(), 1);
    }

    #[test]
    fn extending_header_with_insufficient_work_does_not_replace_head() {
        let (_dir, store, root_hash) = seeded_store_with_unreachable_head();
        let mut orphans = OrphanPool::new();
        let next = header(root_hash, 1);

        let outcome = connect(&store, &mut orphans, Network::Mainnet, next, vec![], Utc::now()).unwrap();

        assert_eq!(outcome, ConnectOutcome::Extended);
        assert_eq!(store.chain_head().unwrap().unwrap().hash, root_hash);
    }

    #[test]
    fn orphan_pool_drains_once_missing_parent_arrives() {
        let (_dir, store, root_hash) = seeded_store_with_unreachable_head();
        let mut orphans = OrphanPool::new();

        let parent = header(root_hash, 1);
        let parent_hash = parent.hash();
        let child = header(parent_hash, 2);
        let child_hash = child.hash();

        let outcome = connect(&store, &mut orphans, Network::Mainnet, child, vec![], Utc::now()).unwrap();
        assert_eq!(outcome, ConnectOutcome::NeedsParent(parent_hash));
        assert_eq!(orphans.len(), 1);

        connect(&store, &mut orphans, Network::Mainnet, parent, vec![], Utc::now()).unwrap();

        assert_eq!(orphans.len(), 0);
        assert!(store.get_header(child_hash).unwrap().is_some());
    }
}
